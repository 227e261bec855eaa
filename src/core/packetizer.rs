//! Prepends a structured header to a packet stream.

use crate::core::repr::Header;
use crate::core::stream::{
    Octet,
    Source,
};
use crate::{
    Error,
    Result,
};

/// Frames a payload stream behind a header.
///
/// The serialized header is offered first, its first octet marked as the
/// start of the packet, followed by the payload with the payload's own
/// end-of-packet marker ending the packet. A packetizer holds one packet at a
/// time and becomes idle again once the end-of-packet octet was acknowledged.
#[derive(Debug)]
pub struct Packetizer<S> {
    header: Vec<u8>,
    index: usize,
    payload: Option<S>,
}

impl<S: Source> Default for Packetizer<S> {
    fn default() -> Self {
        Packetizer::new()
    }
}

impl<S: Source> Packetizer<S> {
    pub fn new() -> Packetizer<S> {
        Packetizer {
            header: Vec::new(),
            index: 0,
            payload: None,
        }
    }

    /// Starts framing a packet.
    ///
    /// # Errors
    ///
    /// Returns Error::Exhausted if the previous packet has not been fully
    /// consumed yet.
    pub fn begin<H: Header>(&mut self, header: &H, payload: S) -> Result<()> {
        if self.payload.is_some() {
            return Err(Error::Exhausted);
        }

        self.header = header.to_bytes()?;
        self.index = 0;
        self.payload = Some(payload);
        Ok(())
    }

    /// Indicates no packet is being framed.
    pub fn is_idle(&self) -> bool {
        self.payload.is_none()
    }
}

impl<S: Source> Source for Packetizer<S> {
    fn peek(&self) -> Option<Octet> {
        let payload = self.payload.as_ref()?;

        if self.index < self.header.len() {
            let last = self.index + 1 == self.header.len();
            Some(Octet {
                data: self.header[self.index],
                sop: self.index == 0,
                eop: last && payload.is_drained(),
                error: false,
            })
        } else {
            payload.peek().map(|octet| Octet {
                sop: false,
                ..octet
            })
        }
    }

    fn ack(&mut self) {
        let octet = match self.peek() {
            Some(octet) => octet,
            None => return,
        };

        if self.index < self.header.len() {
            self.index += 1;
        } else if let Some(ref mut payload) = self.payload {
            payload.ack();
        }

        if octet.eop {
            self.payload = None;
        }
    }

    fn is_drained(&self) -> bool {
        self.payload.is_none()
    }
}
