//! Serialization and deserialization of network headers.
//!
//! The `repr` module provides abstractions for serializing and deserializing
//! headers at different network layers to/from byte buffers. Each header is
//! described by a schema of fields located by byte, bit offset and width.

pub mod ethernet;
pub mod field;
pub mod ipv4;

pub use self::ethernet::{
    eth_types,
    Address as EthernetAddress,
    Repr as EthernetRepr,
};
pub use self::field::{
    Field,
    Header,
};
pub use self::ipv4::{
    protocols as ipv4_protocols,
    Address as Ipv4Address,
    Repr as Ipv4Repr,
};
