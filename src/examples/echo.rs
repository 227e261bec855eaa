use crate::core::service::UserPort;

/// Sends every payload received on a port back to where it came from,
/// returning how many payloads were echoed. Payloads which arrived damaged
/// are skipped.
///
/// Stops early, leaving the remaining payloads queued, once the port's
/// outbound queue is full.
pub fn echo(port: &UserPort) -> usize {
    let mut echoed = 0;

    while let Some(delivery) = port.recv() {
        if delivery.error {
            debug!("Not echoing damaged payload from {}.", delivery.src_addr);
            continue;
        }

        if port.send(delivery.src_addr, delivery.payload).is_err() {
            warn!("Echo queue full, dropping payload for {}.", delivery.src_addr);
            break;
        }

        echoed += 1;
    }

    echoed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::service::EngineBuilder;
    use crate::examples::env;

    #[test]
    fn test_echo_round_trip() {
        let mut builder = EngineBuilder::new(env::default_interface());
        let client = builder.register(17).unwrap();
        let mut client_engine = env::engine(builder, &[env::peer_interface()]).unwrap();

        let mut builder = EngineBuilder::new(env::peer_interface());
        let server = builder.register(17).unwrap();
        let mut server_engine = env::engine(builder, &[env::default_interface()]).unwrap();

        client.send(*env::PEER_IPV4_ADDR, b"hello".to_vec()).unwrap();
        env::tick(&mut client_engine, &mut server_engine);

        assert_eq!(1, echo(&server));
        env::tick(&mut client_engine, &mut server_engine);

        let reply = client.recv().unwrap();
        assert_eq!(*env::PEER_IPV4_ADDR, reply.src_addr);
        assert_eq!(b"hello".to_vec(), reply.payload);
        assert_eq!(0, echo(&server));
    }
}
