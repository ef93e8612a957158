//! Resource definitions
//!
//! Each resource is a plain record: once declared it is never mutated, a
//! changed desired state produces a new record.

mod cidr;
mod firewall;
mod instance;
mod network;
mod stack;

pub use cidr::*;
pub use firewall::*;
pub use instance::*;
pub use network::*;
pub use stack::*;
