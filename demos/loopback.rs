#[macro_use]
extern crate clap;
extern crate env_logger;
extern crate ethip;
extern crate rand;

use rand::Rng;

use ethip::core::repr::ipv4_protocols;
use ethip::core::service::EngineBuilder;
use ethip::examples::*;

/// Bounces payloads between two engines connected back to back, the second
/// one echoing everything it receives.
fn main() {
    env_logger::init();

    let matches = clap_app!(loopback =>
        (@arg COUNT: -c --count +takes_value "Number of payloads to send")
        (@arg LEN: -l --len +takes_value "Payload length in bytes")
        (@arg TTL: --ttl +takes_value "Time to live of sent packets")
        (@arg UNREACHABLE: --unreachable "Also send to an address no host owns")
    ).get_matches();

    let count = value_t!(matches, "COUNT", usize).unwrap_or(4);
    let len = value_t!(matches, "LEN", usize).unwrap_or(32);

    let mut interface = env::default_interface();
    if let Ok(ttl) = value_t!(matches, "TTL", u8) {
        interface.ttl = ttl;
    }

    let mut builder = EngineBuilder::new(interface);
    builder.port_depth(count + 1);
    let client = builder.register(ipv4_protocols::UDP).unwrap();
    let mut client_engine = env::engine(builder, &[env::peer_interface()]).unwrap();

    let mut builder = EngineBuilder::new(env::peer_interface());
    builder.port_depth(count + 1);
    let server = builder.register(ipv4_protocols::UDP).unwrap();
    let mut server_engine = env::engine(builder, &[interface]).unwrap();

    println!(
        "Client: (MAC = {}, IPv4 = {}), Server: (MAC = {}, IPv4 = {})",
        interface.ethernet_addr,
        interface.ipv4_addr,
        *env::PEER_ETH_ADDR,
        *env::PEER_IPV4_ADDR,
    );

    let mut rng = rand::thread_rng();
    let payloads: Vec<Vec<u8>> = (0 .. count)
        .map(|_| (0 .. len).map(|_| rng.gen::<u8>()).collect())
        .collect();

    for payload in &payloads {
        client.send(*env::PEER_IPV4_ADDR, payload.clone()).unwrap();
    }
    if matches.is_present("UNREACHABLE") {
        client.send(*env::NO_HOST_IPV4_ADDR, vec![0; len]).unwrap();
    }

    env::tick(&mut client_engine, &mut server_engine);
    println!("Server echoed {} payload(s).", echo(&server));
    env::tick(&mut client_engine, &mut server_engine);

    let mut matched = 0;
    for payload in &payloads {
        match client.recv() {
            Some(ref reply) if reply.payload == *payload => matched += 1,
            Some(reply) => println!("Mismatched reply from {}!", reply.src_addr),
            None => println!("Missing reply!"),
        }
    }

    println!("{}/{} replies matched.", matched, count);
    println!("Client: {:?}", client_engine.stats());
    println!("Server: {:?}", server_engine.stats());
}
