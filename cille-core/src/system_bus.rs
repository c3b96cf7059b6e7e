use crate::bus::Bus;
use std::fmt::Debug;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AccessType {
    /// Regular reads.
    Read,
    /// Regular writes.
    Write,
}

/// Master-side view of the system interconnect, as seen by the core's load/store unit.
///
/// Unlike [`Bus`], addresses are absolute physical addresses.
pub trait SystemBus: Bus {
    /// Returns `true` if a slave decodes the access `(address, size)` of type `access_type`.
    ///
    /// Accesses that are not accepted still complete on the bus (reads return zero), but the core
    /// treats them as a fault.
    fn accepts(&self, address: u32, size: usize, access_type: AccessType) -> bool;
}
