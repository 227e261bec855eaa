//! The Ethernet transport the engine sends and receives frames through.

use crate::core::storage::Ring;
use crate::core::stream::{
    Assembler,
    Octet,
    Payload,
};
use crate::{
    Error,
    Result,
};

/// A low level, octet at a time interface to an Ethernet port.
///
/// Frames are delimited by start and end of packet markers on their octets.
/// The port is dedicated to a single ethertype, though a link may still hand
/// over frames of other types which the engine ignores.
pub trait Link {
    /// Indicates the link can accept another octet.
    fn ready(&self) -> bool;

    /// Sends one octet of an outgoing frame.
    ///
    /// # Errors
    ///
    /// Returns Error::Exhausted if the link is not ready.
    fn send(&mut self, octet: Octet) -> Result<()>;

    /// Receives one octet of an incoming frame, if one is available.
    fn recv(&mut self) -> Option<Octet>;
}

/// An in memory link with bounded queues in both directions.
#[derive(Debug)]
pub struct Pipe {
    tx: Ring<Octet>,
    rx: Ring<Octet>,
    sent: Assembler,
}

impl Pipe {
    /// Creates a pipe buffering up to capacity octets in each direction.
    pub fn new(capacity: usize) -> Pipe {
        Pipe {
            tx: Ring::with_capacity(capacity),
            rx: Ring::with_capacity(capacity),
            sent: Assembler::new(),
        }
    }

    /// Queues a whole frame for reception.
    ///
    /// # Errors
    ///
    /// Returns Error::Exhausted if the frame does not fit, in which case
    /// nothing is queued.
    pub fn inject(&mut self, frame: &[u8], error: bool) -> Result<()> {
        if self.rx.capacity() - self.rx.len() < frame.len() {
            return Err(Error::Exhausted);
        }

        for octet in Payload::new(frame.to_vec(), error) {
            self.rx.enqueue(octet)?;
        }
        Ok(())
    }

    /// Takes the next complete frame sent across the link, along with its
    /// error flag.
    pub fn take_frame(&mut self) -> Option<(Vec<u8>, bool)> {
        while let Ok(octet) = self.tx.dequeue() {
            if let Some(frame) = self.sent.input(octet) {
                return Some(frame);
            }
        }
        None
    }

    /// Moves as many sent octets as possible into the receive queue of
    /// another pipe, returning how many were moved.
    pub fn forward(&mut self, other: &mut Pipe) -> usize {
        let mut moved = 0;
        while self
            .tx
            .dequeue_maybe(|octet| other.rx.enqueue(*octet))
            .is_ok()
        {
            moved += 1;
        }
        moved
    }

    /// Number of octets sent but not yet taken off the link.
    pub fn tx_len(&self) -> usize {
        self.tx.len()
    }

    /// Number of octets waiting to be received.
    pub fn rx_len(&self) -> usize {
        self.rx.len()
    }
}

impl Link for Pipe {
    fn ready(&self) -> bool {
        !self.tx.is_full()
    }

    fn send(&mut self, octet: Octet) -> Result<()> {
        trace!("Sending {:?}.", octet);
        self.tx.enqueue(octet)
    }

    fn recv(&mut self) -> Option<Octet> {
        self.rx.dequeue().ok()
    }
}
