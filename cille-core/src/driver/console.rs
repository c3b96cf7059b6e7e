//! Character output to the simulator log, and simulation halt.

use super::RegisterAccess;
use crate::regs::{SIM_CTRL_BASE, SIM_CTRL_CTRL, SIM_CTRL_OUT};

/// Write one character to the simulator log. Never fails; returns `c`.
pub fn putchar<H: RegisterAccess + ?Sized>(hart: &mut H, c: u8) -> u8 {
    hart.write_u32(SIM_CTRL_BASE + SIM_CTRL_OUT, c as u32);
    c
}

/// Write a string to the simulator log, byte by byte. No newline is appended.
pub fn puts<H: RegisterAccess + ?Sized>(hart: &mut H, s: &str) {
    for c in s.bytes() {
        putchar(hart, c);
    }
}

/// Write `h` as exactly eight upper-case hex digits.
pub fn puthex<H: RegisterAccess + ?Sized>(hart: &mut H, mut h: u32) {
    for _ in 0..8 {
        let digit = (h >> 28) as u8;
        putchar(hart, if digit < 10 { b'0' + digit } else { b'A' - 10 + digit });
        h <<= 4;
    }
}

/// Immediately halt the simulation.
pub fn sim_halt<H: RegisterAccess + ?Sized>(hart: &mut H) {
    hart.write_u32(SIM_CTRL_BASE + SIM_CTRL_CTRL, 1);
}
