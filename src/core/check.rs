//! IPv4 header checksum engine.
//!
//! The checksum is the one's complement of the one's complement sum of the
//! header's 16 bit words, see [RFC1071](https://tools.ietf.org/html/rfc1071).

use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use crate::core::repr::Ipv4Repr;

/// Byte offset of the checksum field within an IPv4 header.
const CHECKSUM_BYTE: usize = 10;

/// Adds a 16 bit word to a one's complement sum, folding the carry bit back
/// into the low 16 bits.
fn fold(acc: u16, word: u16) -> u16 {
    let sum = acc as u32 + word as u32;
    ((sum & 0xFFFF) + (sum >> 16)) as u16
}

/// Calculates the checksum of an IPv4 header.
///
/// When skip_checksum is set, the word holding the checksum field is left out
/// of the sum, which is how the checksum of an outgoing header is produced.
/// Without it, a header with a valid checksum sums to zero.
///
/// The result is meant to be written to the header in network byte order.
pub fn ipv4_checksum(header: &[u8], skip_checksum: bool) -> u16 {
    let mut checksum = Checksum::new(skip_checksum);
    for byte in header.iter().take(Ipv4Repr::HEADER_LEN) {
        checksum.input(*byte);
    }
    checksum.value()
}

/// Streaming checksum over an IPv4 header.
///
/// Header bytes are fed one at a time as they pass through a pipeline; the
/// result is available once all bytes of the header have been consumed.
#[derive(Clone, Debug)]
pub struct Checksum {
    skip_checksum: bool,
    acc: u16,
    word: [u8; 2],
    consumed: usize,
}

impl Checksum {
    pub fn new(skip_checksum: bool) -> Checksum {
        Checksum {
            skip_checksum,
            acc: 0,
            word: [0; 2],
            consumed: 0,
        }
    }

    /// Consumes the next header byte. Bytes beyond the header are ignored.
    pub fn input(&mut self, byte: u8) {
        if self.done() {
            return;
        }

        self.word[self.consumed % 2] = byte;
        self.consumed += 1;

        if self.consumed % 2 == 0 {
            let skip = self.skip_checksum && self.consumed == CHECKSUM_BYTE + 2;
            if !skip {
                self.acc = fold(self.acc, NetworkEndian::read_u16(&self.word));
            }
        }
    }

    /// Indicates the whole header has been consumed.
    pub fn done(&self) -> bool {
        self.consumed == Ipv4Repr::HEADER_LEN
    }

    /// Returns the checksum of the words consumed so far.
    pub fn value(&self) -> u16 {
        let mut acc = self.acc;
        if self.consumed % 2 == 1 {
            acc = fold(acc, NetworkEndian::read_u16(&[self.word[0], 0]));
        }
        !acc
    }

    /// Clears the accumulator so the next header can be consumed.
    pub fn reset(&mut self) {
        self.acc = 0;
        self.word = [0; 2];
        self.consumed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // https://en.wikipedia.org/wiki/IPv4_header_checksum
    const HEADER: [u8; 20] = [
        0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 0xc0, 0xa8, 0x00,
        0x01, 0xc0, 0xa8, 0x00, 0xc7,
    ];

    fn header_with_checksum() -> [u8; 20] {
        let mut header = HEADER;
        NetworkEndian::write_u16(&mut header[10 .. 12], 0xB861);
        header
    }

    #[test]
    fn test_ipv4_checksum() {
        assert_eq!(0xB861, ipv4_checksum(&HEADER, false));
        assert_eq!(0xB861, ipv4_checksum(&HEADER, true));
    }

    #[test]
    fn test_skip_checksum_ignores_stale_checksum() {
        let mut header = HEADER;
        header[10] = 0xDE;
        header[11] = 0xAD;
        assert_eq!(0xB861, ipv4_checksum(&header, true));
        assert_ne!(0xB861, ipv4_checksum(&header, false));
    }

    #[test]
    fn test_valid_header_sums_to_zero() {
        assert_eq!(0, ipv4_checksum(&header_with_checksum(), false));
    }

    #[test]
    fn test_single_bit_errors_are_detected() {
        let header = header_with_checksum();
        for bit in 0 .. 160 {
            let mut corrupt = header;
            corrupt[bit / 8] ^= 0x80 >> (bit % 8);
            assert_ne!(0, ipv4_checksum(&corrupt, false), "bit {} flipped", bit);
        }
    }

    #[test]
    fn test_fold_is_order_independent() {
        let words: Vec<u16> = HEADER
            .chunks(2)
            .map(|word| NetworkEndian::read_u16(word))
            .collect();
        let forward = words.iter().fold(0, |acc, word| fold(acc, *word));
        let backward = words.iter().rev().fold(0, |acc, word| fold(acc, *word));
        assert_eq!(forward, backward);
        assert_eq!(0xB861, !forward);
    }

    #[test]
    fn test_fold_carries_into_low_bits() {
        assert_eq!(0x0002, fold(0xFFFF, 0x0002));
        assert_eq!(0xFFFF, fold(0xFFFF, 0x0000));
    }

    #[test]
    fn test_streaming_done_and_reset() {
        let mut checksum = Checksum::new(false);
        for (i, byte) in header_with_checksum().iter().enumerate() {
            assert!(!checksum.done(), "done after {} bytes", i);
            checksum.input(*byte);
        }
        assert!(checksum.done());
        assert_eq!(0, checksum.value());

        // Bytes past the header don't affect the result.
        checksum.input(0xFF);
        assert_eq!(0, checksum.value());

        checksum.reset();
        assert!(!checksum.done());
        assert_eq!(0xFFFF, checksum.value());
    }
}
