use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};
use std::result::Result as StdResult;
use std::str::FromStr;

use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use crate::core::check;
use crate::core::repr::field::{
    check_len,
    Header,
};
use crate::Result;

/// [IPv4 address](https://en.wikipedia.org/wiki/IPv4) in network byte order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Address([u8; 4]);

impl Address {
    /// Creates an IPv4 address from a network byte order buffer.
    pub fn new(addr: [u8; 4]) -> Address {
        Address(addr)
    }

    /// Returns a reference to the network byte order representation of the address.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn from_field(value: u64) -> Address {
        let mut addr = [0; 4];
        NetworkEndian::write_u32(&mut addr, value as u32);
        Address(addr)
    }

    fn to_field(&self) -> u64 {
        NetworkEndian::read_u32(&self.0) as u64
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl FromStr for Address {
    type Err = ();

    /// Parses an Ipv4 address from an A.B.C.D style string.
    fn from_str(addr: &str) -> StdResult<Address, Self::Err> {
        let bytes = addr
            .split('.')
            .map(|token| token.parse::<u8>())
            .collect::<StdResult<Vec<_>, _>>()
            .map_err(|_| ())?;

        if bytes.len() != 4 {
            return Err(());
        }

        let mut ipv4: [u8; 4] = [0; 4];
        ipv4.clone_from_slice(&bytes);

        Ok(Address::new(ipv4))
    }
}

/// [https://www.iana.org/assignments/protocol-numbers/protocol-numbers.xhtml](https://www.iana.org/assignments/protocol-numbers/protocol-numbers.xhtml)
pub mod protocols {
    pub const ICMP: u8 = 1;

    pub const TCP: u8 = 6;

    pub const UDP: u8 = 17;
}

mod fields {
    use crate::core::repr::field::Field;

    pub const VERSION: Field = Field::new(0, 4, 4);

    pub const IHL: Field = Field::new(0, 0, 4);

    pub const TOTAL_LEN: Field = Field::new(2, 0, 16);

    pub const IDENTIFICATION: Field = Field::new(4, 0, 16);

    pub const TTL: Field = Field::new(8, 0, 8);

    pub const PROTOCOL: Field = Field::new(9, 0, 8);

    pub const CHECKSUM: Field = Field::new(10, 0, 16);

    pub const SRC_ADDR: Field = Field::new(12, 0, 32);

    pub const DST_ADDR: Field = Field::new(16, 0, 32);
}

/// An IPv4 header without options.
///
/// Fields not listed here (type of service, flags and fragment offset) are
/// always serialized as zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repr {
    pub version: u8,
    /// Header length in 32 bit words.
    pub ihl: u8,
    /// Length of the header and payload in bytes.
    pub total_len: u16,
    pub identification: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub src_addr: Address,
    pub dst_addr: Address,
}

impl Repr {
    pub const HEADER_LEN: usize = 20;

    pub const VERSION: u8 = 4;

    /// Header length in words for a header without options.
    pub const IHL: u8 = 5;

    /// Creates a header for a packet carrying payload_len bytes, with the
    /// checksum left at zero.
    pub fn new(
        src_addr: Address,
        dst_addr: Address,
        protocol: u8,
        ttl: u8,
        payload_len: usize,
    ) -> Repr {
        Repr {
            version: Self::VERSION,
            ihl: Self::IHL,
            total_len: Self::buffer_len(payload_len) as u16,
            identification: 0,
            ttl,
            protocol,
            checksum: 0,
            src_addr,
            dst_addr,
        }
    }

    /// Returns the length of a IPv4 packet with no options and the payload size.
    pub fn buffer_len(payload_len: usize) -> usize {
        Self::HEADER_LEN + payload_len
    }

    /// Returns the payload length advertised by the header, or None if the
    /// total length doesn't even cover the header.
    pub fn payload_len(&self) -> Option<usize> {
        (self.total_len as usize).checked_sub(Self::HEADER_LEN)
    }

    /// Computes the checksum over the header, excluding the current value of
    /// the checksum field, and stores it in the header.
    pub fn fill_checksum(&mut self) -> Result<()> {
        let header = self.to_bytes()?;
        self.checksum = check::ipv4_checksum(&header, true);
        Ok(())
    }
}

impl Header for Repr {
    const LEN: usize = Repr::HEADER_LEN;

    fn serialize(&self, buffer: &mut [u8]) -> Result<()> {
        check_len(buffer, Self::LEN)?;
        for byte in buffer[.. Self::LEN].iter_mut() {
            *byte = 0;
        }
        fields::VERSION.write(buffer, self.version as u64);
        fields::IHL.write(buffer, self.ihl as u64);
        fields::TOTAL_LEN.write(buffer, self.total_len as u64);
        fields::IDENTIFICATION.write(buffer, self.identification as u64);
        fields::TTL.write(buffer, self.ttl as u64);
        fields::PROTOCOL.write(buffer, self.protocol as u64);
        fields::CHECKSUM.write(buffer, self.checksum as u64);
        fields::SRC_ADDR.write(buffer, self.src_addr.to_field());
        fields::DST_ADDR.write(buffer, self.dst_addr.to_field());
        Ok(())
    }

    fn deserialize(buffer: &[u8]) -> Result<Repr> {
        check_len(buffer, Self::LEN)?;
        Ok(Repr {
            version: fields::VERSION.read(buffer) as u8,
            ihl: fields::IHL.read(buffer) as u8,
            total_len: fields::TOTAL_LEN.read(buffer) as u16,
            identification: fields::IDENTIFICATION.read(buffer) as u16,
            ttl: fields::TTL.read(buffer) as u8,
            protocol: fields::PROTOCOL.read(buffer) as u8,
            checksum: fields::CHECKSUM.read(buffer) as u16,
            src_addr: Address::from_field(fields::SRC_ADDR.read(buffer)),
            dst_addr: Address::from_field(fields::DST_ADDR.read(buffer)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_parse_address() {
        assert_eq!(
            Address::from_str("10.0.0.1").unwrap(),
            Address::new([10, 0, 0, 1])
        );
        assert_eq!("192.168.0.199", Address::new([192, 168, 0, 199]).to_string());
        assert_matches!(Address::from_str("10.0.0"), Err(()));
        assert_matches!(Address::from_str("10.0.0.256"), Err(()));
        assert_matches!(Address::from_str("10.0.0.1.2"), Err(()));
    }

    #[test]
    fn test_deserialize_header() {
        let buffer: [u8; 20] = [
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0xb8, 0x61, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];

        let repr = Repr::deserialize(&buffer[..]).unwrap();
        assert_eq!(4, repr.version);
        assert_eq!(5, repr.ihl);
        assert_eq!(0x73, repr.total_len);
        assert_eq!(0, repr.identification);
        assert_eq!(0x40, repr.ttl);
        assert_eq!(protocols::UDP, repr.protocol);
        assert_eq!(0xB861, repr.checksum);
        assert_eq!(Address::new([192, 168, 0, 1]), repr.src_addr);
        assert_eq!(Address::new([192, 168, 0, 199]), repr.dst_addr);
        assert_eq!(Some(0x73 - 20), repr.payload_len());
    }

    #[test]
    fn test_serialize_header() {
        let repr = Repr::new(
            Address::new([10, 0, 0, 1]),
            Address::new([10, 0, 0, 2]),
            protocols::UDP,
            0x80,
            8,
        );
        let buffer = repr.to_bytes().unwrap();
        assert_eq!(
            &buffer[..],
            &[
                0x45, 0x00, 0x00, 0x1C, 0x00, 0x00, 0x00, 0x00, 0x80, 0x11, 0x00, 0x00, 0x0A,
                0x00, 0x00, 0x01, 0x0A, 0x00, 0x00, 0x02,
            ]
        );
        assert_eq!(Repr::deserialize(&buffer).unwrap(), repr);
    }

    #[test]
    fn test_fill_checksum_verifies_to_zero() {
        let mut repr = Repr::new(
            Address::new([10, 0, 0, 1]),
            Address::new([10, 0, 0, 2]),
            protocols::UDP,
            0x80,
            8,
        );
        repr.checksum = 0x1234;
        repr.fill_checksum().unwrap();
        assert_ne!(0, repr.checksum);
        assert_eq!(0, check::ipv4_checksum(&repr.to_bytes().unwrap(), false));
    }

    #[test]
    fn test_payload_len_shorter_than_header() {
        let mut repr = Repr::new(Address::default(), Address::default(), 0, 0, 0);
        assert_eq!(Some(0), repr.payload_len());
        repr.total_len = 19;
        assert_eq!(None, repr.payload_len());
    }

    #[test]
    fn test_deserialize_short_buffer() {
        assert_matches!(Repr::deserialize(&[0x45; 19]), Err(Error::Exhausted));
    }
}
