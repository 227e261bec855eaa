//! IPv4 receive pipeline.
//!
//! Frames arrive from the link one octet at a time. The Ethernet header is
//! stripped, the IPv4 header is buffered while its checksum is accumulated,
//! and once the whole header is in, the packet is either accepted and its
//! payload collected into a `Delivery`, or dropped through to the end of the
//! frame.

use crate::core::check::Checksum;
use crate::core::depacketizer::{
    Depacketizer,
    Extract,
};
use crate::core::repr::{
    eth_types,
    EthernetRepr,
    Ipv4Repr,
};
use crate::core::service::{
    Delivery,
    Interface,
};
use crate::core::stream::Octet;
use crate::{
    Error,
    Result,
};

/// States of the receive pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Check,
    Present,
    Drop,
}

/// Turns Ethernet frames into deliveries for upper layer protocols, one
/// packet at a time.
#[derive(Debug)]
pub struct Receiver {
    interface: Interface,
    state: State,
    eth: Depacketizer<EthernetRepr>,
    ipv4: Depacketizer<Ipv4Repr>,
    checksum: Checksum,
    header: Option<Ipv4Repr>,
    payload: Vec<u8>,
    remaining: usize,
    error: bool,
    delivery: Option<Delivery>,
}

impl Receiver {
    pub fn new(interface: Interface) -> Receiver {
        Receiver {
            interface,
            state: State::Idle,
            eth: Depacketizer::new(),
            ipv4: Depacketizer::new(),
            checksum: Checksum::new(false),
            header: None,
            payload: Vec::new(),
            remaining: 0,
            error: false,
            delivery: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Indicates the pipeline can accept another octet, i.e. no completed
    /// delivery is waiting to be taken.
    pub fn is_ready(&self) -> bool {
        self.delivery.is_none()
    }

    /// Returns the completed delivery waiting to be taken, if any.
    pub fn delivery(&self) -> Option<&Delivery> {
        self.delivery.as_ref()
    }

    /// Takes the completed delivery, making the pipeline ready again.
    pub fn take_delivery(&mut self) -> Option<Delivery> {
        self.delivery.take()
    }

    /// Consumes one octet of a frame.
    ///
    /// # Errors
    ///
    /// Returns Error::Exhausted without consuming the octet if a delivery is
    /// waiting to be taken. Otherwise an error is the reason the current
    /// packet is dropped, reported by the octet that decided the drop. The
    /// rest of the frame is then consumed silently.
    pub fn input(&mut self, octet: Octet) -> Result<()> {
        if !self.is_ready() {
            return Err(Error::Exhausted);
        }

        if octet.sop {
            if self.state != State::Idle {
                debug!("Abandoning packet interrupted by a new frame.");
            }
            self.begin();
        }

        match self.state {
            State::Idle => {
                trace!("Discarding octet {:?} outside of a frame.", octet);
                return Ok(());
            }
            State::Drop => {
                if octet.eop {
                    self.state = State::Idle;
                }
                return Ok(());
            }
            State::Check | State::Present => {}
        }

        self.error |= octet.error;

        match self.eth.input(octet)? {
            Extract::Partial | Extract::Discarded => Ok(()),
            Extract::Truncated => self.discard(Error::Malformed, true),
            Extract::Header { header, eop } => {
                if header.payload_type != eth_types::IPV4 {
                    self.discard(Error::Ignored, eop)
                } else if eop {
                    self.discard(Error::Malformed, eop)
                } else {
                    Ok(())
                }
            }
            Extract::Payload(octet) => self.input_ipv4(octet),
        }
    }

    fn input_ipv4(&mut self, octet: Octet) -> Result<()> {
        if self.state == State::Present {
            if self.remaining > 0 {
                self.payload.push(octet.data);
                self.remaining -= 1;
            }
            if octet.eop {
                self.complete();
            }
            return Ok(());
        }

        self.checksum.input(octet.data);

        match self.ipv4.input(octet)? {
            Extract::Header { header, eop } => {
                let payload_len = match self.check(&header) {
                    Ok(payload_len) => payload_len,
                    Err(err) => return self.discard(err, eop),
                };

                self.header = Some(header);
                self.remaining = payload_len;
                self.payload.reserve(payload_len);
                self.state = State::Present;

                if eop {
                    self.complete();
                }
                Ok(())
            }
            Extract::Truncated => self.discard(Error::Malformed, true),
            Extract::Partial | Extract::Discarded | Extract::Payload(_) => Ok(()),
        }
    }

    /// Validates a fully buffered header, returning the length of the
    /// payload it advertises.
    fn check(&self, header: &Ipv4Repr) -> Result<usize> {
        if !self.checksum.done() {
            return Err(Error::Malformed);
        }

        if header.version != Ipv4Repr::VERSION || header.ihl != Ipv4Repr::IHL {
            return Err(Error::Malformed);
        }

        if self.checksum.value() != 0 {
            return Err(Error::Checksum);
        }

        if header.dst_addr != self.interface.ipv4_addr {
            return Err(Error::Ignored);
        }

        header.payload_len().ok_or(Error::Malformed)
    }

    fn begin(&mut self) {
        self.state = State::Check;
        self.ipv4.reset();
        self.checksum.reset();
        self.header = None;
        self.payload = Vec::new();
        self.remaining = 0;
        self.error = false;
    }

    fn discard(&mut self, err: Error, eop: bool) -> Result<()> {
        debug!("Dropping packet: {:?}.", err);
        self.state = if eop { State::Idle } else { State::Drop };
        self.header = None;
        self.payload = Vec::new();
        Err(err)
    }

    fn complete(&mut self) {
        self.state = State::Idle;

        let header = match self.header.take() {
            Some(header) => header,
            None => return,
        };

        if self.remaining > 0 {
            debug!(
                "Frame from {} ended {} bytes short of its payload.",
                header.src_addr, self.remaining
            );
        }

        let payload_len = self.payload.len() + self.remaining;
        self.delivery = Some(Delivery {
            src_addr: header.src_addr,
            protocol: header.protocol,
            len: payload_len,
            error: self.error || self.remaining > 0,
            payload: std::mem::take(&mut self.payload),
        });
        self.remaining = 0;
    }
}
