//! IPv4 transmit pipeline.
//!
//! A submitted datagram gets an IPv4 header with a freshly computed checksum.
//! The pipeline then asks the resolver for the Ethernet address of the
//! destination and either streams the framed packet to the link, or drains and
//! discards it if the destination turns out to be unreachable.

use std::mem;

use crate::core::arp::{
    Resolution,
    Resolver,
};
use crate::core::link::Link;
use crate::core::packetizer::Packetizer;
use crate::core::repr::{
    eth_types,
    EthernetRepr,
    Ipv4Address,
    Ipv4Repr,
};
use crate::core::service::{
    Datagram,
    Interface,
};
use crate::core::stream::{
    Payload,
    Source,
};
use crate::{
    Error,
    Result,
};

/// Largest payload an IPv4 packet without options can carry.
pub const MAX_PAYLOAD_LEN: usize = 0xFFFF - Ipv4Repr::HEADER_LEN;

/// States of the transmit pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    RequestAddress,
    AwaitAddress,
    Send,
    Drop,
}

/// Outcome of a call to `Transmitter::poll(...)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Nothing could be done until the resolver or link makes progress, or a
    /// new datagram is submitted.
    Blocked,
    /// The pipeline moved forward.
    Busy,
    /// The last octet of a frame for the address was accepted by the link.
    Sent(Ipv4Address),
    /// A packet that could not be sent was discarded.
    Dropped,
}

/// An IPv4 packet waiting for its destination to be resolved.
#[derive(Debug)]
struct Pending {
    dst_addr: Ipv4Address,
    packet: Packetizer<Payload>,
}

#[derive(Debug)]
enum Stage {
    Idle,
    RequestAddress(Pending),
    AwaitAddress(Pending),
    Send(Ipv4Address),
    Drop(Packetizer<Payload>),
}

/// Turns datagrams into Ethernet frames, one packet at a time.
#[derive(Debug)]
pub struct Transmitter {
    interface: Interface,
    stage: Stage,
    frame: Packetizer<Packetizer<Payload>>,
}

impl Transmitter {
    pub fn new(interface: Interface) -> Transmitter {
        Transmitter {
            interface,
            stage: Stage::Idle,
            frame: Packetizer::new(),
        }
    }

    pub fn state(&self) -> State {
        match self.stage {
            Stage::Idle => State::Idle,
            Stage::RequestAddress(_) => State::RequestAddress,
            Stage::AwaitAddress(_) => State::AwaitAddress,
            Stage::Send(_) => State::Send,
            Stage::Drop(_) => State::Drop,
        }
    }

    /// Indicates the pipeline can accept a new datagram.
    pub fn is_idle(&self) -> bool {
        self.state() == State::Idle
    }

    /// Builds the IPv4 header for a datagram and queues the packet for
    /// address resolution.
    ///
    /// # Errors
    ///
    /// Returns Error::Exhausted if another packet occupies the pipeline, or
    /// Error::Malformed if the payload does not fit in a single packet.
    pub fn submit(&mut self, datagram: Datagram) -> Result<()> {
        if !self.is_idle() {
            return Err(Error::Exhausted);
        }

        if datagram.len() > MAX_PAYLOAD_LEN {
            debug!(
                "Refusing {} byte payload for {}.",
                datagram.len(),
                datagram.dst_addr
            );
            return Err(Error::Malformed);
        }

        let mut ipv4_repr = Ipv4Repr::new(
            self.interface.ipv4_addr,
            datagram.dst_addr,
            datagram.protocol,
            self.interface.ttl,
            datagram.len(),
        );
        ipv4_repr.fill_checksum()?;

        let mut packet = Packetizer::new();
        packet.begin(&ipv4_repr, Payload::new(datagram.payload, false))?;

        debug!(
            "Queued IPv4 packet with protocol {} and {} byte payload for {}.",
            datagram.protocol,
            ipv4_repr.total_len,
            datagram.dst_addr
        );

        self.stage = Stage::RequestAddress(Pending {
            dst_addr: datagram.dst_addr,
            packet,
        });
        Ok(())
    }

    /// Advances the pipeline by one step.
    ///
    /// # Errors
    ///
    /// Returns Error::Unreachable once when the resolver fails to resolve the
    /// destination of the current packet, or the resolver's or link's error
    /// once if either refuses the packet outright. The packet is discarded by
    /// the following calls.
    ///
    /// A busy resolver or link is not an error; the call reports
    /// Status::Blocked and the step is retried on the next call.
    pub fn poll<R, L>(&mut self, resolver: &mut R, link: &mut L) -> Result<Status>
    where
        R: Resolver + ?Sized,
        L: Link + ?Sized,
    {
        match mem::replace(&mut self.stage, Stage::Idle) {
            Stage::Idle => Ok(Status::Blocked),
            Stage::RequestAddress(pending) => match resolver.request(pending.dst_addr) {
                Ok(()) => {
                    self.stage = Stage::AwaitAddress(pending);
                    Ok(Status::Busy)
                }
                Err(Error::Exhausted) => {
                    self.stage = Stage::RequestAddress(pending);
                    Ok(Status::Blocked)
                }
                Err(err) => {
                    warn!(
                        "Resolver refused {}: {:?}, dropping packet.",
                        pending.dst_addr, err
                    );
                    self.stage = Stage::Drop(pending.packet);
                    Err(err)
                }
            },
            Stage::AwaitAddress(pending) => match resolver.response() {
                None => {
                    self.stage = Stage::AwaitAddress(pending);
                    Ok(Status::Blocked)
                }
                Some(Resolution::Resolved(eth_addr)) => {
                    let eth_repr = EthernetRepr {
                        dst_addr: eth_addr,
                        src_addr: self.interface.ethernet_addr,
                        payload_type: eth_types::IPV4,
                    };
                    debug!("Resolved {} to {}.", pending.dst_addr, eth_addr);
                    let mut frame = Packetizer::new();
                    if let Err(err) = frame.begin(&eth_repr, pending.packet) {
                        // Nothing reached the link, so the packet is simply gone.
                        warn!("Can't frame packet for {}: {:?}.", pending.dst_addr, err);
                        return Err(err);
                    }
                    self.frame = frame;
                    self.stage = Stage::Send(pending.dst_addr);
                    Ok(Status::Busy)
                }
                Some(Resolution::Failed) => {
                    warn!("{} is unreachable, dropping packet.", pending.dst_addr);
                    self.stage = Stage::Drop(pending.packet);
                    Err(Error::Unreachable(pending.dst_addr))
                }
            },
            Stage::Send(dst_addr) => self.send(dst_addr, link),
            Stage::Drop(mut packet) => {
                while let Some(octet) = packet.peek() {
                    packet.ack();
                    if octet.eop {
                        break;
                    }
                }
                Ok(Status::Dropped)
            }
        }
    }

    fn send<L: Link + ?Sized>(&mut self, dst_addr: Ipv4Address, link: &mut L) -> Result<Status> {
        let octet = match self.frame.peek() {
            Some(octet) => octet,
            None => return Ok(Status::Sent(dst_addr)),
        };

        if !link.ready() {
            self.stage = Stage::Send(dst_addr);
            return Ok(Status::Blocked);
        }

        match link.send(octet) {
            Ok(()) => {}
            Err(Error::Exhausted) => {
                self.stage = Stage::Send(dst_addr);
                return Ok(Status::Blocked);
            }
            Err(err) => {
                warn!("Link refused frame for {}: {:?}, dropping it.", dst_addr, err);
                self.frame = Packetizer::new();
                return Err(err);
            }
        }

        self.frame.ack();

        if octet.eop {
            debug!("Sent IPv4 packet to {}.", dst_addr);
            Ok(Status::Sent(dst_addr))
        } else {
            self.stage = Stage::Send(dst_addr);
            Ok(Status::Busy)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::check;
    use crate::core::link::Pipe;
    use crate::core::repr::{
        EthernetAddress,
        Header,
    };
    use crate::core::stream::Octet;

    /// Resolver answering from a script, optionally refusing requests.
    #[derive(Default)]
    struct MockResolver {
        busy: bool,
        refuse: Option<Error>,
        requests: Vec<Ipv4Address>,
        responses: Vec<Resolution>,
        outstanding: bool,
    }

    impl Resolver for MockResolver {
        fn request(&mut self, ipv4_addr: Ipv4Address) -> Result<()> {
            if let Some(ref err) = self.refuse {
                return Err(err.clone());
            }
            if self.busy || self.outstanding {
                return Err(Error::Exhausted);
            }
            self.outstanding = true;
            self.requests.push(ipv4_addr);
            Ok(())
        }

        fn response(&mut self) -> Option<Resolution> {
            if !self.outstanding || self.responses.is_empty() {
                return None;
            }
            self.outstanding = false;
            Some(self.responses.remove(0))
        }
    }

    fn interface() -> Interface {
        Interface::new(
            EthernetAddress::new([0x06, 0, 0, 0, 0, 1]),
            Ipv4Address::new([10, 0, 0, 1]),
        )
    }

    fn dst_addr() -> Ipv4Address {
        Ipv4Address::new([10, 0, 0, 2])
    }

    fn dst_eth_addr() -> EthernetAddress {
        EthernetAddress::new([0x06, 0, 0, 0, 0, 2])
    }

    fn datagram(payload: Vec<u8>) -> Datagram {
        Datagram {
            dst_addr: dst_addr(),
            protocol: 17,
            payload,
        }
    }

    fn run<R: Resolver, L: Link>(tx: &mut Transmitter, resolver: &mut R, link: &mut L) -> Vec<Result<Status>> {
        let mut results = vec![];
        loop {
            let result = tx.poll(resolver, link);
            let done = match result {
                Ok(Status::Blocked) => true,
                _ => false,
            };
            results.push(result);
            if done {
                return results;
            }
        }
    }

    #[test]
    fn test_send_frame() {
        let mut tx = Transmitter::new(interface());
        let mut resolver = MockResolver {
            responses: vec![Resolution::Resolved(dst_eth_addr())],
            ..MockResolver::default()
        };
        let mut link = Pipe::new(128);

        tx.submit(datagram(vec![1, 2, 3, 4, 5, 6, 7, 8])).unwrap();
        assert_eq!(State::RequestAddress, tx.state());

        let results = run(&mut tx, &mut resolver, &mut link);
        assert_matches!(results[results.len() - 2], Ok(Status::Sent(addr)) if addr == dst_addr());
        assert!(tx.is_idle());
        assert_eq!(vec![dst_addr()], resolver.requests);

        let (frame, error) = link.take_frame().unwrap();
        assert!(!error);
        assert_eq!(42, frame.len());

        let eth_repr = EthernetRepr::deserialize(&frame).unwrap();
        assert_eq!(dst_eth_addr(), eth_repr.dst_addr);
        assert_eq!(interface().ethernet_addr, eth_repr.src_addr);
        assert_eq!(eth_types::IPV4, eth_repr.payload_type);

        let ipv4_repr = Ipv4Repr::deserialize(&frame[14 ..]).unwrap();
        assert_eq!(4, ipv4_repr.version);
        assert_eq!(5, ipv4_repr.ihl);
        assert_eq!(28, ipv4_repr.total_len);
        assert_eq!(0, ipv4_repr.identification);
        assert_eq!(0x80, ipv4_repr.ttl);
        assert_eq!(17, ipv4_repr.protocol);
        assert_eq!(interface().ipv4_addr, ipv4_repr.src_addr);
        assert_eq!(dst_addr(), ipv4_repr.dst_addr);
        assert_eq!(0, check::ipv4_checksum(&frame[14 .. 34], false));
        assert_eq!(&[1, 2, 3, 4, 5, 6, 7, 8], &frame[34 ..]);
    }

    #[test]
    fn test_refuses_submission_while_busy() {
        let mut tx = Transmitter::new(interface());
        tx.submit(datagram(vec![1])).unwrap();
        assert_matches!(tx.submit(datagram(vec![2])), Err(Error::Exhausted));
    }

    #[test]
    fn test_refuses_oversized_payload() {
        let mut tx = Transmitter::new(interface());
        assert_matches!(
            tx.submit(datagram(vec![0; MAX_PAYLOAD_LEN + 1])),
            Err(Error::Malformed)
        );
        assert!(tx.is_idle());
    }

    #[test]
    fn test_waits_for_resolver() {
        let mut tx = Transmitter::new(interface());
        let mut resolver = MockResolver {
            busy: true,
            ..MockResolver::default()
        };
        let mut link = Pipe::new(128);

        tx.submit(datagram(vec![1])).unwrap();
        assert_matches!(tx.poll(&mut resolver, &mut link), Ok(Status::Blocked));
        assert_eq!(State::RequestAddress, tx.state());

        resolver.busy = false;
        assert_matches!(tx.poll(&mut resolver, &mut link), Ok(Status::Busy));
        assert_eq!(State::AwaitAddress, tx.state());
        assert_matches!(tx.poll(&mut resolver, &mut link), Ok(Status::Blocked));
        assert_eq!(State::AwaitAddress, tx.state());

        resolver.responses.push(Resolution::Resolved(dst_eth_addr()));
        assert_matches!(tx.poll(&mut resolver, &mut link), Ok(Status::Busy));
        assert_eq!(State::Send, tx.state());
    }

    #[test]
    fn test_unreachable_destination() {
        let mut tx = Transmitter::new(interface());
        let mut resolver = MockResolver {
            responses: vec![Resolution::Failed],
            ..MockResolver::default()
        };
        let mut link = Pipe::new(128);

        tx.submit(datagram(vec![1, 2, 3])).unwrap();
        let results = run(&mut tx, &mut resolver, &mut link);

        let unreachable: Vec<_> = results
            .iter()
            .filter(|result| **result == Err(Error::Unreachable(dst_addr())))
            .collect();
        assert_eq!(1, unreachable.len());
        assert!(results.contains(&Ok(Status::Dropped)));
        assert!(tx.is_idle());
        assert_eq!(0, link.tx_len());

        // The pipeline is ready for the next packet.
        resolver.responses.push(Resolution::Resolved(dst_eth_addr()));
        tx.submit(datagram(vec![4])).unwrap();
        run(&mut tx, &mut resolver, &mut link);
        assert_eq!(35, link.take_frame().unwrap().0.len());
    }

    #[test]
    fn test_resolver_refusal_drops_packet() {
        let mut tx = Transmitter::new(interface());
        let mut resolver = MockResolver {
            refuse: Some(Error::Malformed),
            ..MockResolver::default()
        };
        let mut link = Pipe::new(128);

        tx.submit(datagram(vec![1, 2, 3])).unwrap();
        let results = run(&mut tx, &mut resolver, &mut link);
        assert_eq!(
            vec![Err(Error::Malformed), Ok(Status::Dropped), Ok(Status::Blocked)],
            results
        );
        assert!(tx.is_idle());
        assert!(resolver.requests.is_empty());
        assert_eq!(0, link.tx_len());

        resolver.refuse = None;
        resolver.responses.push(Resolution::Resolved(dst_eth_addr()));
        tx.submit(datagram(vec![4])).unwrap();
        run(&mut tx, &mut resolver, &mut link);
        assert_eq!(35, link.take_frame().unwrap().0.len());
    }

    /// Link that takes a few octets and then fails for good.
    struct BrokenLink {
        budget: usize,
    }

    impl Link for BrokenLink {
        fn ready(&self) -> bool {
            true
        }

        fn send(&mut self, _: Octet) -> Result<()> {
            if self.budget == 0 {
                return Err(Error::Ignored);
            }
            self.budget -= 1;
            Ok(())
        }

        fn recv(&mut self) -> Option<Octet> {
            None
        }
    }

    #[test]
    fn test_link_failure_abandons_frame() {
        let mut tx = Transmitter::new(interface());
        let mut resolver = MockResolver {
            responses: vec![Resolution::Resolved(dst_eth_addr())],
            ..MockResolver::default()
        };
        let mut link = BrokenLink { budget: 5 };

        tx.submit(datagram(vec![1, 2, 3])).unwrap();
        let results = run(&mut tx, &mut resolver, &mut link);
        let errors: Vec<_> = results.into_iter().filter_map(|result| result.err()).collect();
        assert_eq!(vec![Error::Ignored], errors);
        assert!(tx.is_idle());

        // The next frame starts from its first octet.
        let mut link = Pipe::new(64);
        resolver.responses.push(Resolution::Resolved(dst_eth_addr()));
        tx.submit(datagram(vec![4])).unwrap();
        run(&mut tx, &mut resolver, &mut link);
        let (frame, _) = link.take_frame().unwrap();
        assert_eq!(35, frame.len());
        assert_eq!(dst_eth_addr(), EthernetRepr::deserialize(&frame).unwrap().dst_addr);
    }

    #[test]
    fn test_link_backpressure() {
        let mut tx = Transmitter::new(interface());
        let mut resolver = MockResolver {
            responses: vec![Resolution::Resolved(dst_eth_addr())],
            ..MockResolver::default()
        };
        let mut link = Pipe::new(10);

        tx.submit(datagram(vec![9; 16])).unwrap();
        run(&mut tx, &mut resolver, &mut link);
        assert_eq!(State::Send, tx.state());
        assert_eq!(10, link.tx_len());

        let mut frame = vec![];
        let mut sink = Pipe::new(64);
        while !tx.is_idle() {
            link.forward(&mut sink);
            run(&mut tx, &mut resolver, &mut link);
        }
        link.forward(&mut sink);
        while let Some(octet) = sink.recv() {
            frame.push(octet.data);
        }
        assert_eq!(50, frame.len());
        assert_eq!(&[9; 16], &frame[34 ..]);
    }

    #[test]
    fn test_empty_payload() {
        let mut tx = Transmitter::new(interface());
        let mut resolver = MockResolver {
            responses: vec![Resolution::Resolved(dst_eth_addr())],
            ..MockResolver::default()
        };
        let mut link = Pipe::new(64);

        tx.submit(datagram(vec![])).unwrap();
        run(&mut tx, &mut resolver, &mut link);
        let (frame, _) = link.take_frame().unwrap();
        assert_eq!(34, frame.len());
        assert_eq!(20, Ipv4Repr::deserialize(&frame[14 ..]).unwrap().total_len);
    }
}
