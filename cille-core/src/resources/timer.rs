//! Machine timer with a 64-bit `mtime` and `mtimecmp`, split over 32-bit registers.

use crate::bus::{word_offset, Bus};
use crate::regs::{TIMER_MTIME, TIMER_MTIMECMP, TIMER_MTIMECMPH, TIMER_MTIMEH};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Timer {
    mtime: u64,
    mtimecmp: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a timer in reset state.
    ///
    /// `mtimecmp` resets to all-ones so no interrupt is pending until firmware arms the timer.
    pub fn new() -> Self {
        Self {
            mtime: 0,
            mtimecmp: u64::MAX,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Advance `mtime` by one tick.
    pub fn tick(&mut self) {
        self.mtime = self.mtime.wrapping_add(1);
    }

    pub fn mtime(&self) -> u64 {
        self.mtime
    }

    pub fn mtimecmp(&self) -> u64 {
        self.mtimecmp
    }

    /// Level of the timer interrupt line.
    pub fn irq_pending(&self) -> bool {
        self.mtime >= self.mtimecmp
    }

    fn set_mtime_higher(&mut self, value: u32) {
        self.mtime = (value as u64) << 32 | (self.mtime & 0xffff_ffff);
    }

    fn set_mtime_lower(&mut self, value: u32) {
        self.mtime = (self.mtime & 0xffff_ffff_0000_0000) | value as u64;
    }

    fn set_mtimecmp_higher(&mut self, value: u32) {
        self.mtimecmp = (value as u64) << 32 | (self.mtimecmp & 0xffff_ffff);
    }

    fn set_mtimecmp_lower(&mut self, value: u32) {
        self.mtimecmp = (self.mtimecmp & 0xffff_ffff_0000_0000) | value as u64;
    }

    /// Read a register. Offsets that do not decode to a register read as zero.
    pub fn read_u32(&self, offset: u32) -> u32 {
        match offset {
            TIMER_MTIME => self.mtime as u32,
            TIMER_MTIMEH => (self.mtime >> 32) as u32,
            TIMER_MTIMECMP => self.mtimecmp as u32,
            TIMER_MTIMECMPH => (self.mtimecmp >> 32) as u32,
            _ => 0,
        }
    }

    pub fn write_u32(&mut self, offset: u32, value: u32) {
        match offset {
            TIMER_MTIME => self.set_mtime_lower(value),
            TIMER_MTIMEH => self.set_mtime_higher(value),
            TIMER_MTIMECMP => self.set_mtimecmp_lower(value),
            TIMER_MTIMECMPH => self.set_mtimecmp_higher(value),
            _ => {}
        }
    }
}

impl Bus for Timer {
    fn read(&mut self, buf: &mut [u8], address: u32) {
        if let Some(offset) = word_offset(address, buf.len()) {
            buf.copy_from_slice(&self.read_u32(offset).to_le_bytes());
        }
    }

    fn write(&mut self, address: u32, buf: &[u8]) {
        if let (Some(offset), Ok(bytes)) = (word_offset(address, buf.len()), buf.try_into()) {
            self.write_u32(offset, u32::from_le_bytes(bytes));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_state_has_no_pending_interrupt() {
        let mut timer = Timer::new();
        for _ in 0..1000 {
            timer.tick();
        }
        assert_eq!(1000, timer.mtime());
        assert!(!timer.irq_pending());
    }

    #[test]
    fn test_split_registers() {
        let mut timer = Timer::new();
        timer.write_u32(TIMER_MTIMECMP, 0x1234_5678);
        assert_eq!(0xFFFF_FFFF_1234_5678, timer.mtimecmp());
        timer.write_u32(TIMER_MTIMECMPH, 0);
        assert_eq!(0x1234_5678, timer.mtimecmp());
        timer.write_u32(TIMER_MTIMEH, 0xA);
        timer.write_u32(TIMER_MTIME, 0xB);
        assert_eq!(0xA_0000_000B, timer.mtime());
        assert_eq!(0xA, timer.read_u32(TIMER_MTIMEH));
        assert_eq!(0xB, timer.read_u32(TIMER_MTIME));
        assert_eq!(0, timer.read_u32(0x10));
    }

    #[test]
    fn test_interrupt_is_level_triggered() {
        let mut timer = Timer::new();
        timer.write_u32(TIMER_MTIMECMPH, 0);
        timer.write_u32(TIMER_MTIMECMP, 3);
        timer.tick();
        timer.tick();
        assert!(!timer.irq_pending());
        timer.tick();
        assert!(timer.irq_pending());
        timer.tick();
        assert!(timer.irq_pending());
        timer.write_u32(TIMER_MTIMECMP, 10);
        assert!(!timer.irq_pending());
    }

    #[test]
    fn test_bus_ignores_narrow_access() {
        let mut timer = Timer::new();
        timer.write(TIMER_MTIMECMPH, &[0, 0]);
        assert_eq!(u64::MAX, timer.mtimecmp());
        let mut buf = [0u8; 4];
        timer.read(&mut buf, TIMER_MTIMECMP);
        assert_eq!([0xFF; 4], buf);
    }
}
