//! Specifiers for the CSRs implemented by the core, and the plain registers among them.
//!
//! Counter CSRs live in [`super::counters`].

use crate::isa::{CoreConfig, Rv32b};
use bitvec::{order::Lsb0, view::BitView};

/// General 12-bit value representing a CSR specifier.
pub type CsrSpecifier = u16;

//
// Unprivileged counter shadows (`0xC00..=0xC1F`, `0xC80..=0xC9F`). Read-only.
//
pub const CYCLE: CsrSpecifier = 0xC00;
pub const INSTRET: CsrSpecifier = 0xC02;
pub const HPMCOUNTER3: CsrSpecifier = 0xC03;
pub const HPMCOUNTER31: CsrSpecifier = 0xC1F;
pub const CYCLEH: CsrSpecifier = 0xC80;
pub const INSTRETH: CsrSpecifier = 0xC82;
pub const HPMCOUNTER3H: CsrSpecifier = 0xC83;
pub const HPMCOUNTER31H: CsrSpecifier = 0xC9F;

//
// Machine trap setup and handling.
//
/// Machine status register.
pub const MSTATUS: CsrSpecifier = 0x300;
/// ISA and extensions.
pub const MISA: CsrSpecifier = 0x301;
/// Machine interrupt-enable register.
pub const MIE: CsrSpecifier = 0x304;
/// Machine interrupt pending.
pub const MIP: CsrSpecifier = 0x344;

/// Machine counter-inhibit register.
pub const MCOUNTINHIBIT: CsrSpecifier = 0x320;

//
// Machine counters (`0xB00..=0xB1F`, `0xB80..=0xB9F`).
//
/// Machine cycle counter.
pub const MCYCLE: CsrSpecifier = 0xB00;
/// Machine instructions-retired counter.
pub const MINSTRET: CsrSpecifier = 0xB02;
/// Machine performance-monitoring counter.
pub const MHPMCOUNTER3: CsrSpecifier = 0xB03;
/// Machine performance-monitoring counter.
pub const MHPMCOUNTER31: CsrSpecifier = 0xB1F;
/// Upper 32 bits of [`MCYCLE`], RV32 only.
pub const MCYCLEH: CsrSpecifier = 0xB80;
/// Upper 32 bits of [`MINSTRET`], RV32 only.
pub const MINSTRETH: CsrSpecifier = 0xB82;
/// Upper 32 bits of [`MHPMCOUNTER3`], RV32 only.
pub const MHPMCOUNTER3H: CsrSpecifier = 0xB83;
/// Upper 32 bits of [`MHPMCOUNTER31`], RV32 only.
pub const MHPMCOUNTER31H: CsrSpecifier = 0xB9F;

/// Hardware thread ID.
pub const MHARTID: CsrSpecifier = 0xF14;

/// Custom CPU control register. Bit 0 enables the instruction cache.
pub const CPUCTRL: CsrSpecifier = 0x7C0;

/// Returns `true` if the CSR specifier encodes a read-only register (bits 11:10 are `0b11`).
pub fn is_read_only(specifier: CsrSpecifier) -> bool {
    specifier >> 10 == 0b11
}

/// The mstatus register. Only the interrupt-enable fields are implemented, the rest is read-only
/// zero (a single privilege level is supported).
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Mstatus(u32);

impl Mstatus {
    const MIE: usize = 3;
    const MPIE: usize = 7;
    const WRITABLE: u32 = 1 << Self::MIE | 1 << Self::MPIE;

    pub fn new() -> Self {
        Self(0)
    }

    /// Global machine-mode interrupt enable.
    pub fn mie(&self) -> bool {
        self.0.view_bits::<Lsb0>()[Self::MIE]
    }

    pub fn read(&self) -> u32 {
        self.0
    }

    pub fn write(&mut self, value: u32, mask: u32) {
        let mask = mask & Self::WRITABLE;
        self.0 = self.0 & !mask | value & mask;
    }
}

/// Machine trap registers that are not counters.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CsrFile {
    pub mstatus: Mstatus,
    pub misa: u32,
    pub cpuctrl: u32,
}

impl CsrFile {
    /// Only the instruction-cache enable bit of cpuctrl is writable.
    pub const CPUCTRL_WRITABLE: u32 = 0b1;

    pub fn new(config: &CoreConfig) -> Self {
        Self {
            mstatus: Mstatus::new(),
            misa: misa(config),
            cpuctrl: 0,
        }
    }

    pub fn write_cpuctrl(&mut self, value: u32, mask: u32) {
        let mask = mask & Self::CPUCTRL_WRITABLE;
        self.cpuctrl = self.cpuctrl & !mask | value & mask;
    }

    pub fn icache_enabled(&self) -> bool {
        self.cpuctrl.view_bits::<Lsb0>()[0]
    }
}

/// Value of the read-only misa register for `config`: MXL = 1 (32-bit) and one bit per extension.
fn misa(config: &CoreConfig) -> u32 {
    let extension = |c: u8| 1u32 << (c - b'A');
    let mut misa = 1 << 30 | extension(b'C');
    misa |= if config.rv32e {
        extension(b'E')
    } else {
        extension(b'I')
    };
    if config.rv32m {
        misa |= extension(b'M');
    }
    if config.rv32b != Rv32b::None {
        misa |= extension(b'B');
    }
    misa
}
