//! Wires the pipelines and the crossbar to a link and a resolver.

use crate::core::arp::Resolver;
use crate::core::link::Link;
use crate::core::service::tx::Status;
use crate::core::service::{
    Crossbar,
    CrossbarBuilder,
    Event,
    Interface,
    Receiver,
    Stats,
    Transmitter,
    UserPort,
};
use crate::{
    Error,
    Result,
};

/// Configures an engine before any traffic flows.
#[derive(Debug)]
pub struct EngineBuilder {
    interface: Interface,
    crossbar: CrossbarBuilder,
}

impl EngineBuilder {
    pub fn new(interface: Interface) -> EngineBuilder {
        EngineBuilder {
            interface,
            crossbar: CrossbarBuilder::default(),
        }
    }

    /// Sets how many datagrams and deliveries ports registered afterwards
    /// buffer in each direction.
    pub fn port_depth(&mut self, depth: usize) -> &mut EngineBuilder {
        self.crossbar.depth(depth);
        self
    }

    /// Registers a port for an upper layer protocol.
    ///
    /// # Errors
    ///
    /// Returns Error::InUse if the protocol number is already registered, in
    /// which case the engine can not be built.
    pub fn register(&mut self, protocol: u8) -> Result<UserPort> {
        self.crossbar.register(protocol)
    }

    /// Creates an engine serving the interface over a link.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failed registration, if any.
    pub fn build<L, R>(self, link: L, resolver: R) -> Result<Engine<L, R>>
    where
        L: Link,
        R: Resolver,
    {
        let crossbar = self.crossbar.build()?;

        debug!(
            "Starting engine for {} ({}) with protocols {:?}.",
            self.interface.ipv4_addr,
            self.interface.ethernet_addr,
            crossbar.protocols()
        );

        Ok(Engine {
            interface: self.interface,
            link,
            resolver,
            tx: Transmitter::new(self.interface),
            rx: Receiver::new(self.interface),
            crossbar,
            stats: Stats::default(),
        })
    }
}

/// An IPv4 engine bound to a link and an address resolver.
///
/// The engine does nothing on its own. Each call to `poll()` moves packets
/// through both pipelines for as long as the link, the resolver and the user
/// ports allow.
#[derive(Debug)]
pub struct Engine<L, R> {
    interface: Interface,
    link: L,
    resolver: R,
    tx: Transmitter,
    rx: Receiver,
    crossbar: Crossbar,
    stats: Stats,
}

impl<L: Link, R: Resolver> Engine<L, R> {
    /// Processes traffic until no further progress can be made, returning
    /// the events observed along the way.
    pub fn poll(&mut self) -> Vec<Event> {
        let mut events = Vec::new();

        loop {
            let tx_progress = self.poll_tx(&mut events);
            let rx_progress = self.poll_rx(&mut events);
            if !tx_progress && !rx_progress {
                break;
            }
        }

        for event in &events {
            self.stats.record(event);
        }

        events
    }

    fn poll_tx(&mut self, events: &mut Vec<Event>) -> bool {
        let mut progress = false;

        if self.tx.is_idle() {
            if let Some(datagram) = self.crossbar.arbitrate() {
                let dst_addr = datagram.dst_addr;
                if let Err(err) = self.tx.submit(datagram) {
                    warn!("Dropping datagram for {}: {:?}.", dst_addr, err);
                    events.push(Event::Dropped(err));
                }
                progress = true;
            }
        }

        match self.tx.poll(&mut self.resolver, &mut self.link) {
            Ok(Status::Blocked) => {}
            Ok(Status::Busy) | Ok(Status::Dropped) => progress = true,
            Ok(Status::Sent(dst_addr)) => {
                events.push(Event::Sent(dst_addr));
                progress = true;
            }
            Err(Error::Unreachable(dst_addr)) => {
                events.push(Event::Unreachable(dst_addr));
                progress = true;
            }
            Err(err) => {
                events.push(Event::Dropped(err));
                progress = true;
            }
        }

        progress
    }

    fn poll_rx(&mut self, events: &mut Vec<Event>) -> bool {
        let mut progress = false;

        let protocol = self.rx.delivery().map(|delivery| delivery.protocol);
        if let Some(protocol) = protocol {
            if self.crossbar.is_ready(protocol) {
                if let Some(delivery) = self.rx.take_delivery() {
                    match self.crossbar.route(delivery) {
                        Ok(()) => events.push(Event::Delivered(protocol)),
                        Err(err) => events.push(Event::Dropped(err)),
                    }
                    progress = true;
                }
            }
        }

        if self.rx.is_ready() {
            if let Some(octet) = self.link.recv() {
                if let Err(err) = self.rx.input(octet) {
                    events.push(Event::Dropped(err));
                }
                progress = true;
            }
        }

        progress
    }

    /// Returns counters of every event observed so far.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }
}
