use std::sync::Once;

use ethip::core::repr::{
    eth_types,
    ipv4_protocols,
    EthernetRepr,
    Header,
    Ipv4Address,
    Ipv4Repr,
};
use ethip::core::service::{
    EngineBuilder,
    Interface,
    UserPort,
};
use ethip::examples::env::{
    self,
    DefaultEngine,
};

lazy_static! {
    /// The payload of the end to end example.
    pub static ref EIGHT_BYTES: Vec<u8> = vec![0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03, 0x04];
}

static LOGGER: Once = Once::new();

/// A client and a server engine attached back to back.
pub struct Context {
    pub client: DefaultEngine,
    pub server: DefaultEngine,
    /// UDP port of the client.
    pub client_udp: UserPort,
    /// ICMP port of the client.
    pub client_icmp: UserPort,
    /// UDP port of the server.
    pub server_udp: UserPort,
    /// ICMP port of the server.
    pub server_icmp: UserPort,
}

/// Runs a function f against a fresh client/server pair.
pub fn run<F, R>(f: F) -> R
where
    F: FnOnce(&mut Context) -> R,
{
    LOGGER.call_once(|| {
        let _ = env_logger::try_init();
    });

    let mut builder = EngineBuilder::new(env::default_interface());
    let client_udp = builder.register(ipv4_protocols::UDP).unwrap();
    let client_icmp = builder.register(ipv4_protocols::ICMP).unwrap();
    let client = env::engine(builder, &[env::peer_interface()]).unwrap();

    let mut builder = EngineBuilder::new(env::peer_interface());
    let server_udp = builder.register(ipv4_protocols::UDP).unwrap();
    let server_icmp = builder.register(ipv4_protocols::ICMP).unwrap();
    let server = env::engine(builder, &[env::default_interface()]).unwrap();

    f(&mut Context {
        client,
        server,
        client_udp,
        client_icmp,
        server_udp,
        server_icmp,
    })
}

/// Builds a well formed frame carrying an IPv4 packet from one interface to
/// another.
pub fn frame(src: &Interface, dst: &Interface, protocol: u8, payload: &[u8]) -> Vec<u8> {
    frame_to(src, dst, dst.ipv4_addr, protocol, payload)
}

/// Builds a well formed frame to dst's Ethernet address, but with an
/// arbitrary IPv4 destination.
pub fn frame_to(
    src: &Interface,
    dst: &Interface,
    dst_addr: Ipv4Address,
    protocol: u8,
    payload: &[u8],
) -> Vec<u8> {
    let eth_repr = EthernetRepr {
        dst_addr: dst.ethernet_addr,
        src_addr: src.ethernet_addr,
        payload_type: eth_types::IPV4,
    };
    let mut ipv4_repr = Ipv4Repr::new(src.ipv4_addr, dst_addr, protocol, src.ttl, payload.len());
    ipv4_repr.fill_checksum().unwrap();

    let mut frame = eth_repr.to_bytes().unwrap();
    frame.extend(ipv4_repr.to_bytes().unwrap());
    frame.extend_from_slice(payload);
    frame
}
