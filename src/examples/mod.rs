//! Sample programs.

pub mod echo;
pub mod env;

pub use self::echo::echo;
