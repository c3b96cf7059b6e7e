//! Defines the byte-addressed bus interface shared by memories and peripherals.

use std::fmt::Debug;

/// A simplified slave bus interface, without the hardware handshake details.
///
/// Accesses are `(address, size)` pairs where the size is `buf.len()`. Addresses are offsets
/// within the slave's own window; routing absolute addresses to slaves is the job of the system
/// bus. Values are serialized in little-endian byte order.
///
/// Slaves decide which access sizes and alignments they support. Unsupported accesses must not
/// panic: reads leave `buf` zeroed and writes are ignored, just like a register file that ignores
/// the strobe lines it does not decode.
pub trait Bus: Debug {
    /// Invoke a read access for `address` with size `buf.len()`, writing the result to `buf`.
    fn read(&mut self, buf: &mut [u8], address: u32);

    /// Invoke a write access for `address` with size `buf.len()`, reading the data from `buf`.
    fn write(&mut self, address: u32, buf: &[u8]);
}

/// Decode a naturally aligned 32-bit register access.
///
/// Returns `None` for anything other than a 4-byte access to a word-aligned offset.
pub(crate) fn word_offset(address: u32, len: usize) -> Option<u32> {
    (len == 4 && address & 0b11 == 0).then_some(address)
}
