#[cfg(test)]
#[macro_use]
extern crate assert_matches;
extern crate byteorder;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub mod core;
pub mod examples;

use crate::core::repr::Ipv4Address;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Indicates an error where a buffer, queue, etc. is full or empty, or a
    /// pipeline stage is busy with another packet.
    Exhausted,
    /// Indicates an error where a packet or frame is malformed.
    Malformed,
    /// Indicates an error where a checksum is invalid.
    Checksum,
    /// Indicates a packet or frame that was not meant for this interface.
    Ignored,
    /// Indicates an error where a destination address could not be resolved.
    Unreachable(Ipv4Address),
    /// Indicates a payload for a protocol with no registered port.
    Unregistered(u8),
    /// Indicates an error where a protocol number is already registered.
    InUse(u8),
}

pub type Result<T> = std::result::Result<T, Error>;
