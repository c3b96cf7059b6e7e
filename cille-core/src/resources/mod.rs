//! Provides the memory and I/O devices attached to the simulated system bus.

pub mod counter;
pub mod mem_area;
pub mod multiplier;
pub mod sim_ctrl;
pub mod timer;
