#[macro_use]
extern crate static_assertions;

pub mod address_map;
pub mod address_range;
pub mod board;
pub mod bus;
pub mod core;
pub mod driver;
pub mod engine;
pub mod firmware;
pub mod harness;
pub mod isa;
pub mod memory;
pub mod regs;
pub mod resources;
pub mod system_bus;

/// Re-export of [`AddressRange`] for convenience.
pub use address_range::AddressRange;
