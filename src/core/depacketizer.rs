//! Extracts a structured header from the front of a packet stream.

use crate::core::repr::Header;
use crate::core::stream::Octet;
use crate::Result;

/// What happened to an octet fed into a depacketizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extract<H> {
    /// The octet was buffered into the still incomplete header.
    Partial,
    /// The octet completed the header. `eop` is set if the packet ended
    /// right after its header.
    Header { header: H, eop: bool },
    /// The octet belongs to the payload and is passed through. The first
    /// payload octet carries the start-of-packet marker.
    Payload(Octet),
    /// The packet ended before its header was complete.
    Truncated,
    /// The octet arrived outside of a packet and was discarded.
    Discarded,
}

/// Buffers the first H::LEN bytes of each packet into a header and passes
/// the remaining bytes through.
#[derive(Debug)]
pub struct Depacketizer<H> {
    buffer: Vec<u8>,
    header: Option<H>,
    in_packet: bool,
    first_payload: bool,
}

impl<H: Header + Clone> Default for Depacketizer<H> {
    fn default() -> Self {
        Depacketizer::new()
    }
}

impl<H: Header + Clone> Depacketizer<H> {
    pub fn new() -> Depacketizer<H> {
        Depacketizer {
            buffer: Vec::with_capacity(H::LEN),
            header: None,
            in_packet: false,
            first_payload: true,
        }
    }

    /// Returns the header of the current packet once fully buffered.
    pub fn header(&self) -> Option<&H> {
        self.header.as_ref()
    }

    /// Forgets the current packet.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.header = None;
        self.in_packet = false;
        self.first_payload = true;
    }

    /// Consumes one octet of a packet.
    ///
    /// A start-of-packet octet always begins a new packet, abandoning any
    /// packet that did not end properly.
    pub fn input(&mut self, octet: Octet) -> Result<Extract<H>> {
        if octet.sop {
            self.reset();
            self.in_packet = true;
        } else if !self.in_packet {
            return Ok(Extract::Discarded);
        }

        if self.header.is_some() {
            let payload = Octet {
                sop: self.first_payload,
                ..octet
            };
            self.first_payload = false;
            if octet.eop {
                self.reset();
            }
            return Ok(Extract::Payload(payload));
        }

        self.buffer.push(octet.data);

        if self.buffer.len() < H::LEN {
            if octet.eop {
                self.reset();
                return Ok(Extract::Truncated);
            }
            return Ok(Extract::Partial);
        }

        let header = H::deserialize(&self.buffer)?;
        if octet.eop {
            self.reset();
        } else {
            self.header = Some(header.clone());
        }

        Ok(Extract::Header {
            header,
            eop: octet.eop,
        })
    }
}
