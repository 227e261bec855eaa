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

use crate::core::repr::field::{
    check_len,
    Header,
};
use crate::Result;

/// [MAC address](https://en.wikipedia.org/wiki/MAC_address) in network byte order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Address([u8; 6]);

impl Address {
    pub const BROADCAST: Address = Address([0xFF; 6]);

    /// Creates a MAC address from a network byte order buffer.
    pub fn new(addr: [u8; 6]) -> Address {
        Address(addr)
    }

    /// Returns a reference to the network byte order representation of the
    /// address.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn from_field(value: u64) -> Address {
        let mut addr = [0; 6];
        NetworkEndian::write_uint(&mut addr, value, 6);
        Address(addr)
    }

    fn to_field(&self) -> u64 {
        NetworkEndian::read_uint(&self.0, 6)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5],
        )
    }
}

impl FromStr for Address {
    type Err = ();

    /// Parses a MAC address from an A:B:C:D:E:F style string.
    fn from_str(addr: &str) -> StdResult<Address, Self::Err> {
        let bytes = addr
            .split(':')
            .map(|token| u8::from_str_radix(token, 16))
            .collect::<StdResult<Vec<_>, _>>()
            .map_err(|_| ())?;

        if bytes.len() != 6 {
            return Err(());
        }

        let mut mac: [u8; 6] = [0; 6];
        mac.clone_from_slice(&bytes);

        Ok(Address::new(mac))
    }
}

/// [https://en.wikipedia.org/wiki/EtherType](https://en.wikipedia.org/wiki/EtherType)
pub mod eth_types {
    pub const IPV4: u16 = 0x800;

    pub const ARP: u16 = 0x806;
}

mod fields {
    use crate::core::repr::field::Field;

    pub const DST_ADDR: Field = Field::new(0, 0, 48);

    pub const SRC_ADDR: Field = Field::new(6, 0, 48);

    pub const PAYLOAD_TYPE: Field = Field::new(12, 0, 16);
}

/// The header of an Ethernet frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repr {
    pub dst_addr: Address,
    pub src_addr: Address,
    pub payload_type: u16,
}

impl Repr {
    pub const HEADER_LEN: usize = 14;
}

impl Header for Repr {
    const LEN: usize = Repr::HEADER_LEN;

    fn serialize(&self, buffer: &mut [u8]) -> Result<()> {
        check_len(buffer, Self::LEN)?;
        fields::DST_ADDR.write(buffer, self.dst_addr.to_field());
        fields::SRC_ADDR.write(buffer, self.src_addr.to_field());
        fields::PAYLOAD_TYPE.write(buffer, self.payload_type as u64);
        Ok(())
    }

    fn deserialize(buffer: &[u8]) -> Result<Repr> {
        check_len(buffer, Self::LEN)?;
        Ok(Repr {
            dst_addr: Address::from_field(fields::DST_ADDR.read(buffer)),
            src_addr: Address::from_field(fields::SRC_ADDR.read(buffer)),
            payload_type: fields::PAYLOAD_TYPE.read(buffer) as u16,
        })
    }
}
