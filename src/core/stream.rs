//! Byte streams with packet boundaries.
//!
//! Packets travel between pipeline stages as a sequence of octets. The first
//! octet of a packet carries a start-of-packet marker and the last one an
//! end-of-packet marker, so a consumer always knows where a packet begins and
//! ends without looking at its contents.

/// A single byte of a packet travelling through a pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Octet {
    pub data: u8,
    /// Marks the first octet of a packet.
    pub sop: bool,
    /// Marks the last octet of a packet.
    pub eop: bool,
    /// Set by the transport on physical layer errors.
    pub error: bool,
}

impl Octet {
    pub fn new(data: u8) -> Octet {
        Octet {
            data,
            ..Octet::default()
        }
    }
}

/// A pull based producer of octets.
///
/// A consumer looks at the octet on offer with `peek()` and calls `ack()` once
/// it has accepted it, so a producer never advances past an octet its
/// consumer was not ready for.
pub trait Source {
    /// Returns the octet on offer without consuming it.
    fn peek(&self) -> Option<Octet>;

    /// Consumes the octet on offer. Does nothing if no octet is on offer.
    fn ack(&mut self);

    /// Indicates there is nothing left to offer for the current packet.
    fn is_drained(&self) -> bool;
}

/// A packet held in an owned buffer, offered one octet at a time.
#[derive(Clone, Debug, Default)]
pub struct Payload {
    buffer: Vec<u8>,
    index: usize,
    error: bool,
}

impl Payload {
    /// Creates a payload source. Every octet carries the error flag.
    pub fn new(buffer: Vec<u8>, error: bool) -> Payload {
        Payload {
            buffer,
            index: 0,
            error,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Source for Payload {
    fn peek(&self) -> Option<Octet> {
        self.buffer.get(self.index).map(|data| Octet {
            data: *data,
            sop: self.index == 0,
            eop: self.index + 1 == self.buffer.len(),
            error: self.error,
        })
    }

    fn ack(&mut self) {
        if self.index < self.buffer.len() {
            self.index += 1;
        }
    }

    fn is_drained(&self) -> bool {
        self.index == self.buffer.len()
    }
}

impl Iterator for Payload {
    type Item = Octet;

    fn next(&mut self) -> Option<Octet> {
        let octet = self.peek()?;
        self.ack();
        Some(octet)
    }
}

/// Reassembles octets into whole packets.
#[derive(Clone, Debug, Default)]
pub struct Assembler {
    buffer: Vec<u8>,
    error: bool,
    started: bool,
}

impl Assembler {
    pub fn new() -> Assembler {
        Assembler::default()
    }

    /// Consumes an octet, returning the packet and its error flag once the
    /// end-of-packet octet arrives. Octets outside of a packet are discarded.
    pub fn input(&mut self, octet: Octet) -> Option<(Vec<u8>, bool)> {
        if octet.sop {
            self.buffer.clear();
            self.error = false;
            self.started = true;
        }

        if !self.started {
            trace!("Discarding octet {:?} outside of a packet.", octet);
            return None;
        }

        self.buffer.push(octet.data);
        self.error |= octet.error;

        if octet.eop {
            self.started = false;
            Some((self.buffer.split_off(0), self.error))
        } else {
            None
        }
    }
}
