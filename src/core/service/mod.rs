//! Packet processing services.
//!
//! The `service` module holds the IPv4 transmit and receive pipelines, the
//! crossbar multiplexing upper layer protocols over them, and the engine
//! wiring everything to a link and an address resolver.

pub mod crossbar;
pub mod engine;
pub mod rx;
pub mod tx;

pub use self::crossbar::{
    Crossbar,
    CrossbarBuilder,
    UserPort,
    DEFAULT_PORT_DEPTH,
};
pub use self::engine::{
    Engine,
    EngineBuilder,
};
pub use self::rx::Receiver;
pub use self::tx::Transmitter;

use crate::core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use crate::Error;

/// Time to live stamped on every transmitted packet unless configured
/// otherwise.
pub const DEFAULT_TTL: u8 = 0x80;

/// Addresses and settings of the network interface served by an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interface {
    /// Ethernet address used as the source of every transmitted frame.
    pub ethernet_addr: EthernetAddress,
    /// IPv4 address used as the source of every transmitted packet. Received
    /// packets for other destinations are dropped.
    pub ipv4_addr: Ipv4Address,
    /// Time to live of transmitted packets.
    pub ttl: u8,
}

impl Interface {
    pub fn new(ethernet_addr: EthernetAddress, ipv4_addr: Ipv4Address) -> Interface {
        Interface {
            ethernet_addr,
            ipv4_addr,
            ttl: DEFAULT_TTL,
        }
    }
}

/// A payload submitted for transmission by an upper layer protocol.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Datagram {
    pub dst_addr: Ipv4Address,
    pub protocol: u8,
    pub payload: Vec<u8>,
}

impl Datagram {
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// A received payload handed to an upper layer protocol.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    pub src_addr: Ipv4Address,
    pub protocol: u8,
    /// Payload length advertised by the IPv4 header.
    pub len: usize,
    /// Set if the transport flagged an error on the frame, or the frame ended
    /// before the advertised payload length. The payload then holds only the
    /// bytes that were received.
    pub error: bool,
    pub payload: Vec<u8>,
}

/// Something noteworthy that happened while polling an engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A frame carrying a packet for the address was handed to the link.
    Sent(Ipv4Address),
    /// A payload was queued on the port of the protocol.
    Delivered(u8),
    /// A packet was dropped because its destination could not be resolved.
    Unreachable(Ipv4Address),
    /// A packet was dropped for the given reason.
    Dropped(Error),
}

/// Counters of the events an engine observed over its lifetime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub sent: usize,
    pub delivered: usize,
    pub unreachable: usize,
    pub malformed: usize,
    pub checksum: usize,
    pub ignored: usize,
    pub unregistered: usize,
    /// Drops for any other reason, e.g. oversized submissions.
    pub other: usize,
}

impl Stats {
    /// Accounts for an event.
    pub fn record(&mut self, event: &Event) {
        match *event {
            Event::Sent(_) => self.sent += 1,
            Event::Delivered(_) => self.delivered += 1,
            Event::Unreachable(_) => self.unreachable += 1,
            Event::Dropped(Error::Malformed) => self.malformed += 1,
            Event::Dropped(Error::Checksum) => self.checksum += 1,
            Event::Dropped(Error::Ignored) => self.ignored += 1,
            Event::Dropped(Error::Unregistered(_)) => self.unregistered += 1,
            Event::Dropped(_) => self.other += 1,
        }
    }
}
