//! Performance counter control.
//!
//! To measure a region of code without counting the setup cycles, disable the counters, reset
//! them, and only then enable them again.

use super::PrivilegedRegisters;
use crate::core::csr::{
    CsrSpecifier, MCOUNTINHIBIT, MCYCLE, MCYCLEH, MHPMCOUNTER3, MHPMCOUNTER31, MHPMCOUNTER31H,
    MHPMCOUNTER3H, MINSTRET, MINSTRETH,
};

/// Enable (`true`) or disable (`false`) every counter, including the cycle counter.
pub fn pcount_enable<H: PrivilegedRegisters + ?Sized>(hart: &mut H, enable: bool) {
    let inhibit = if enable { 0x0 } else { 0xFFFF_FFFF };
    hart.csr_write(MCOUNTINHIBIT, inhibit);
}

/// Zero every counter, low halves first.
pub fn pcount_reset<H: PrivilegedRegisters + ?Sized>(hart: &mut H) {
    hart.csr_write(MINSTRET, 0);
    hart.csr_write(MCYCLE, 0);
    for csr in MHPMCOUNTER3..=MHPMCOUNTER31 {
        hart.csr_write(csr, 0);
    }
    hart.csr_write(MINSTRETH, 0);
    hart.csr_write(MCYCLEH, 0);
    for csr in MHPMCOUNTER3H..=MHPMCOUNTER31H {
        hart.csr_write(csr, 0);
    }
}

/// Read the 64-bit counter whose low half is `csr` (for example [`MCYCLE`]).
///
/// The high half is read before and after the low half, and the read is retried if it changed in
/// between, so a carry out of the low half cannot produce a torn value.
pub fn pcount_read<H: PrivilegedRegisters + ?Sized>(hart: &mut H, csr: CsrSpecifier) -> u64 {
    let csr_high = csr + (MCYCLEH - MCYCLE);
    loop {
        let high = hart.csr_read(csr_high);
        let low = hart.csr_read(csr);
        if hart.csr_read(csr_high) == high {
            return (high as u64) << 32 | low as u64;
        }
    }
}
