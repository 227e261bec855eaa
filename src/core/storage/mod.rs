//! Bounded storage used for queue handoffs between pipeline stages.

pub mod ring;

pub use self::ring::Ring;
