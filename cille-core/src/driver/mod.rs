//! Firmware-side drivers for the SoC peripherals and the core's control registers.
//!
//! Drivers never fail: misuse (for example reading a counter before enabling it) yields stale or
//! unspecified values, exactly like poking the registers directly would. Every driver is written
//! against the [`RegisterAccess`] and [`PrivilegedRegisters`] capabilities, so it runs unchanged
//! on the simulated hart and on the fake register file used in tests.

pub mod console;
pub mod counter;
pub mod multiplier;
pub mod pcount;
pub mod timer;

#[cfg(test)]
pub(crate) mod testing;

use crate::core::csr::{CsrSpecifier, CPUCTRL};

/// `mstatus.MIE`, the global machine interrupt enable.
pub const MSTATUS_MIE: u32 = 1 << 3;
/// `mie.MTIE`, the machine timer interrupt enable.
pub const MIE_MTIE: u32 = 1 << 7;
/// `mie` bit of fast interrupt 0, driven by the counter peripheral.
pub const MIE_FAST0: u32 = 1 << 16;

/// Size of a memory access.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Width {
    Byte,
    Halfword,
    Word,
}

impl Width {
    pub fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Halfword => 2,
            Self::Word => 4,
        }
    }
}

/// Load/store access to the physical address space.
pub trait RegisterAccess {
    /// Load `width` bytes from `address`, zero-extended.
    fn read(&mut self, address: u32, width: Width) -> u32;

    /// Store the low `width` bytes of `value` to `address`.
    fn write(&mut self, address: u32, width: Width, value: u32);

    fn read_u32(&mut self, address: u32) -> u32 {
        self.read(address, Width::Word)
    }

    fn write_u32(&mut self, address: u32, value: u32) {
        self.write(address, Width::Word, value)
    }
}

/// A CSR instruction.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CsrOp {
    Read,
    Write(u32),
    Set(u32),
    Clear(u32),
}

impl CsrOp {
    /// Returns the `(value, mask)` pair this operation writes, or `None` if it only reads.
    ///
    /// Setting or clearing no bits does not write, like `csrrs`/`csrrc` with `rs1 = x0`.
    pub fn value_mask(self) -> Option<(u32, u32)> {
        match self {
            Self::Read | Self::Set(0) | Self::Clear(0) => None,
            Self::Write(value) => Some((value, u32::MAX)),
            Self::Set(bits) => Some((u32::MAX, bits)),
            Self::Clear(bits) => Some((0, bits)),
        }
    }
}

/// Access to the machine-mode control and status registers.
pub trait PrivilegedRegisters {
    /// Perform `op` on `csr`, returning the value the register held before.
    fn csr(&mut self, csr: CsrSpecifier, op: CsrOp) -> u32;

    fn csr_read(&mut self, csr: CsrSpecifier) -> u32 {
        self.csr(csr, CsrOp::Read)
    }

    fn csr_write(&mut self, csr: CsrSpecifier, value: u32) {
        self.csr(csr, CsrOp::Write(value));
    }

    fn csr_set(&mut self, csr: CsrSpecifier, bits: u32) {
        self.csr(csr, CsrOp::Set(bits));
    }

    fn csr_clear(&mut self, csr: CsrSpecifier, bits: u32) {
        self.csr(csr, CsrOp::Clear(bits));
    }
}

/// Everything firmware can do to the machine it runs on.
pub trait Hart: RegisterAccess + PrivilegedRegisters {}

impl<T: RegisterAccess + PrivilegedRegisters + ?Sized> Hart for T {}

/// Enable or disable the instruction cache.
///
/// Safe on configurations without an instruction cache, where the bit has no effect.
pub fn icache_enable<H: PrivilegedRegisters + ?Sized>(hart: &mut H, enable: bool) {
    if enable {
        hart.csr_set(CPUCTRL, 1);
    } else {
        hart.csr_clear(CPUCTRL, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RegisterFile;
    use super::*;

    #[test]
    fn test_value_mask() {
        assert_eq!(None, CsrOp::Read.value_mask());
        assert_eq!(None, CsrOp::Set(0).value_mask());
        assert_eq!(Some((7, u32::MAX)), CsrOp::Write(7).value_mask());
        assert_eq!(Some((u32::MAX, 0x80)), CsrOp::Set(0x80).value_mask());
        assert_eq!(Some((0, 0x80)), CsrOp::Clear(0x80).value_mask());
    }

    #[test]
    fn test_icache_enable() {
        let mut regs = RegisterFile::new();
        regs.set_csr(CPUCTRL, 0x6);
        icache_enable(&mut regs, true);
        assert_eq!(0x7, regs.csr_value(CPUCTRL));
        icache_enable(&mut regs, false);
        assert_eq!(0x6, regs.csr_value(CPUCTRL));
    }
}
