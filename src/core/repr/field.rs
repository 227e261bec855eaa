use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use crate::{
    Error,
    Result,
};

/// Location of a header field: the byte it starts at, and the bit offset and
/// width of the value within the big endian word starting at that byte.
///
/// For example the IPv4 version lives in the high nibble of byte 0, so it is
/// described as `Field::new(0, 4, 4)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    pub byte: usize,
    pub offset: usize,
    pub width: usize,
}

impl Field {
    pub const fn new(byte: usize, offset: usize, width: usize) -> Field {
        Field {
            byte,
            offset,
            width,
        }
    }

    /// Number of bytes spanned by the field.
    fn span(&self) -> usize {
        (self.offset + self.width + 7) / 8
    }

    /// Index of the first byte past the field.
    pub fn end(&self) -> usize {
        self.byte + self.span()
    }

    fn mask(&self) -> u64 {
        if self.width >= 64 {
            !0
        } else {
            (1u64 << self.width) - 1
        }
    }

    /// Reads the field from a header buffer.
    ///
    /// # Panics
    ///
    /// Causes a panic if the buffer is shorter than the end of the field.
    pub fn read(&self, buffer: &[u8]) -> u64 {
        let word = NetworkEndian::read_uint(&buffer[self.byte .. self.end()], self.span());
        (word >> self.offset) & self.mask()
    }

    /// Writes the field to a header buffer, leaving the other bits of the
    /// bytes it shares with neighbouring fields untouched. Bits of value
    /// beyond the field width are discarded.
    ///
    /// # Panics
    ///
    /// Causes a panic if the buffer is shorter than the end of the field.
    pub fn write(&self, buffer: &mut [u8], value: u64) {
        let bytes = &mut buffer[self.byte .. self.byte + self.span()];
        let word = NetworkEndian::read_uint(bytes, self.span());
        let word = (word & !(self.mask() << self.offset)) | ((value & self.mask()) << self.offset);
        NetworkEndian::write_uint(bytes, word, self.span());
    }
}

/// A fixed length header described by a set of fields.
pub trait Header: Sized {
    /// Length of the serialized header in bytes.
    const LEN: usize;

    /// Serializes the header into the first LEN bytes of a buffer.
    fn serialize(&self, buffer: &mut [u8]) -> Result<()>;

    /// Deserializes the header from the first LEN bytes of a buffer.
    fn deserialize(buffer: &[u8]) -> Result<Self>;

    /// Serializes the header into a freshly allocated buffer.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = vec![0; Self::LEN];
        self.serialize(&mut buffer)?;
        Ok(buffer)
    }
}

/// Checks a buffer can hold a header of header_len bytes.
pub fn check_len(buffer: &[u8], header_len: usize) -> Result<()> {
    if buffer.len() < header_len {
        Err(Error::Exhausted)
    } else {
        Ok(())
    }
}
