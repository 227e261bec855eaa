//! Multiplexes upper layer protocols over a single pair of pipelines.
//!
//! Each protocol number is owned by exactly one `UserPort`, created while the
//! crossbar is being configured. Ports exchange whole datagrams and
//! deliveries with the crossbar, so a datagram handed to the transmit
//! pipeline is always sent in one piece and never mixed with another port's.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::repr::Ipv4Address;
use crate::core::service::{
    Datagram,
    Delivery,
};
use crate::core::storage::Ring;
use crate::{
    Error,
    Result,
};

/// Number of datagrams and deliveries each port buffers by default.
pub const DEFAULT_PORT_DEPTH: usize = 8;

#[derive(Debug)]
struct Queues {
    outbound: Ring<Datagram>,
    inbound: Ring<Delivery>,
}

/// An upper layer protocol's handle on the crossbar.
#[derive(Debug)]
pub struct UserPort {
    protocol: u8,
    queues: Rc<RefCell<Queues>>,
}

impl UserPort {
    /// Returns the protocol number the port was registered for.
    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    /// Queues a payload for transmission to an address, under the port's
    /// protocol number.
    ///
    /// # Errors
    ///
    /// Returns Error::Exhausted if the outbound queue is full.
    pub fn send(&self, dst_addr: Ipv4Address, payload: Vec<u8>) -> Result<()> {
        self.queues.borrow_mut().outbound.enqueue(Datagram {
            dst_addr,
            protocol: self.protocol,
            payload,
        })
    }

    /// Dequeues the oldest payload received for the port, if any.
    pub fn recv(&self) -> Option<Delivery> {
        self.queues.borrow_mut().inbound.dequeue().ok()
    }

    /// Number of datagrams waiting to be transmitted.
    pub fn pending(&self) -> usize {
        self.queues.borrow().outbound.len()
    }
}

/// Registers user ports before traffic flows.
#[derive(Debug)]
pub struct CrossbarBuilder {
    ports: Vec<(u8, Rc<RefCell<Queues>>)>,
    depth: usize,
    failure: Option<Error>,
}

impl Default for CrossbarBuilder {
    fn default() -> Self {
        CrossbarBuilder::new(DEFAULT_PORT_DEPTH)
    }
}

impl CrossbarBuilder {
    /// Creates a builder whose ports buffer up to depth datagrams and
    /// deliveries in each direction.
    pub fn new(depth: usize) -> CrossbarBuilder {
        CrossbarBuilder {
            ports: Vec::new(),
            depth,
            failure: None,
        }
    }

    /// Sets the queue depth of ports registered afterwards.
    pub fn depth(&mut self, depth: usize) -> &mut CrossbarBuilder {
        self.depth = depth;
        self
    }

    /// Registers a port for a protocol number.
    ///
    /// # Errors
    ///
    /// Returns Error::InUse if the protocol number is already registered.
    /// The failure is remembered, and the crossbar can not be built
    /// afterwards.
    pub fn register(&mut self, protocol: u8) -> Result<UserPort> {
        if self.ports.iter().any(|&(registered, _)| registered == protocol) {
            warn!("Protocol {} is already registered.", protocol);
            self.failure = Some(Error::InUse(protocol));
            return Err(Error::InUse(protocol));
        }

        let queues = Rc::new(RefCell::new(Queues {
            outbound: Ring::with_capacity(self.depth),
            inbound: Ring::with_capacity(self.depth),
        }));
        self.ports.push((protocol, queues.clone()));

        debug!("Registered port for protocol {}.", protocol);
        Ok(UserPort { protocol, queues })
    }

    /// Finishes the configuration.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failed registration, if any.
    pub fn build(self) -> Result<Crossbar> {
        if let Some(err) = self.failure {
            return Err(err);
        }

        Ok(Crossbar {
            ports: self.ports,
            next: 0,
        })
    }
}

/// Routes datagrams and deliveries between the pipelines and user ports.
#[derive(Debug)]
pub struct Crossbar {
    ports: Vec<(u8, Rc<RefCell<Queues>>)>,
    next: usize,
}

impl Crossbar {
    /// Returns the protocol numbers with registered ports.
    pub fn protocols(&self) -> Vec<u8> {
        self.ports.iter().map(|&(protocol, _)| protocol).collect()
    }

    /// Takes the next datagram to transmit, visiting ports in round robin
    /// order so a busy port can't starve the others.
    pub fn arbitrate(&mut self) -> Option<Datagram> {
        for i in 0 .. self.ports.len() {
            let index = (self.next + i) % self.ports.len();
            let datagram = self.ports[index].1.borrow_mut().outbound.dequeue();
            if let Ok(datagram) = datagram {
                self.next = (index + 1) % self.ports.len();
                return Some(datagram);
            }
        }
        None
    }

    /// Indicates a delivery for the protocol can be routed without waiting.
    /// Deliveries for unregistered protocols are always accepted since they
    /// are discarded.
    pub fn is_ready(&self, protocol: u8) -> bool {
        match self.port(protocol) {
            Some(queues) => !queues.borrow().inbound.is_full(),
            None => true,
        }
    }

    /// Queues a delivery on the port owning its protocol number.
    ///
    /// # Errors
    ///
    /// Returns Error::Unregistered if no port owns the protocol, in which
    /// case the delivery is discarded, or Error::Exhausted if the port's
    /// inbound queue is full.
    pub fn route(&mut self, delivery: Delivery) -> Result<()> {
        let protocol = delivery.protocol;
        match self.port(protocol) {
            Some(queues) => queues.borrow_mut().inbound.enqueue(delivery),
            None => {
                debug!(
                    "Discarding payload from {} for unregistered protocol {}.",
                    delivery.src_addr, protocol
                );
                Err(Error::Unregistered(protocol))
            }
        }
    }

    fn port(&self, protocol: u8) -> Option<&Rc<RefCell<Queues>>> {
        self.ports
            .iter()
            .find(|&&(registered, _)| registered == protocol)
            .map(|&(_, ref queues)| queues)
    }
}
