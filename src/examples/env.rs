use crate::core::arp::ArpTable;
use crate::core::link::Pipe;
use crate::core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use crate::core::service::{
    Engine,
    EngineBuilder,
    Event,
    Interface,
};
use crate::core::time::SystemClock;
use crate::Result;

/// Octets a link buffers in each direction.
pub static LINK_CAPACITY: usize = 2048;

/// Seconds before an ARP table entry expires.
pub static ARP_EXPIRATION_SECS: u64 = 60;

pub type DefaultEngine = Engine<Pipe, ArpTable<SystemClock>>;

lazy_static! {
    /// Default interface IPv4 address.
    pub static ref DEFAULT_IPV4_ADDR: Ipv4Address = {
        Ipv4Address::new([10, 0, 0, 1])
    };

    /// Default interface MAC address.
    pub static ref DEFAULT_ETH_ADDR: EthernetAddress = {
        EthernetAddress::new([0x06, 0x11, 0x22, 0x33, 0x44, 0x01])
    };

    /// IPv4 address of the peer on the other end of the link.
    pub static ref PEER_IPV4_ADDR: Ipv4Address = {
        Ipv4Address::new([10, 0, 0, 2])
    };

    /// MAC address of the peer on the other end of the link.
    pub static ref PEER_ETH_ADDR: EthernetAddress = {
        EthernetAddress::new([0x06, 0x11, 0x22, 0x33, 0x44, 0x02])
    };

    /// An IPv4 address not assigned to any hosts on the network.
    pub static ref NO_HOST_IPV4_ADDR: Ipv4Address = {
        Ipv4Address::new([10, 0, 0, 64])
    };
}

/// Creates the default network interface.
pub fn default_interface() -> Interface {
    Interface::new(*DEFAULT_ETH_ADDR, *DEFAULT_IPV4_ADDR)
}

/// Creates the interface of the peer.
pub fn peer_interface() -> Interface {
    Interface::new(*PEER_ETH_ADDR, *PEER_IPV4_ADDR)
}

/// Creates an ARP table which knows about the given interfaces.
pub fn arp_table(neighbors: &[Interface]) -> ArpTable<SystemClock> {
    let mut arp_table = ArpTable::new(ARP_EXPIRATION_SECS, SystemClock);
    for neighbor in neighbors {
        arp_table.set_eth_addr_for_ip(neighbor.ipv4_addr, neighbor.ethernet_addr);
    }
    arp_table
}

/// Builds an engine for an interface on a fresh link, resolving addresses of
/// the neighbors only.
pub fn engine(builder: EngineBuilder, neighbors: &[Interface]) -> Result<DefaultEngine> {
    builder.build(Pipe::new(LINK_CAPACITY), arp_table(neighbors))
}

/// Polls two engines attached back to back until neither has anything left
/// to do, returning the events each one observed.
pub fn tick(a: &mut DefaultEngine, b: &mut DefaultEngine) -> (Vec<Event>, Vec<Event>) {
    let mut events = (vec![], vec![]);

    loop {
        let a_events = a.poll();
        let a_moved = a.link_mut().forward(b.link_mut());
        let b_events = b.poll();
        let b_moved = b.link_mut().forward(a.link_mut());

        let idle = a_events.is_empty() && b_events.is_empty() && a_moved == 0 && b_moved == 0;

        events.0.extend(a_events);
        events.1.extend(b_events);

        if idle {
            return events;
        }
    }
}
