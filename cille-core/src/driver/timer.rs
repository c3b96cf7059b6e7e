//! Periodic machine timer interrupt.

use super::{Hart, PrivilegedRegisters, RegisterAccess, MIE_MTIE, MSTATUS_MIE};
use crate::core::csr::{MIE, MIP, MSTATUS};
use crate::regs::{TIMER_BASE, TIMER_MTIME, TIMER_MTIMECMP, TIMER_MTIMECMPH, TIMER_MTIMEH};

/// Elapsed-time bookkeeping for a periodic timer interrupt.
///
/// Each interrupt moves the compare value `increment` ticks past the current time and bumps the
/// elapsed count by one.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TimerDriver {
    increment: u64,
    elapsed: u64,
}

impl TimerDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a periodic interrupt every `time_base` ticks and enable interrupts globally.
    pub fn enable<H: Hart + ?Sized>(&mut self, hart: &mut H, time_base: u64) {
        self.elapsed = 0;
        self.increment = time_base;
        increment_timecmp(hart, time_base);
        hart.csr_set(MIE, MIE_MTIE);
        hart.csr_set(MSTATUS, MSTATUS_MIE);
    }

    /// Number of timer interrupts handled since [`enable`](Self::enable).
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn increment(&self) -> u64 {
        self.increment
    }

    /// Timer interrupt handler.
    pub fn handle_interrupt<H: RegisterAccess + ?Sized>(&mut self, hart: &mut H) {
        increment_timecmp(hart, self.increment);
        self.elapsed += 1;
    }

    /// Mask the timer interrupt. The elapsed count is kept.
    pub fn disable<H: PrivilegedRegisters + ?Sized>(&mut self, hart: &mut H) {
        timer_disable(hart);
    }
}

/// Mask the timer interrupt. Time keeps running.
pub fn timer_disable<H: PrivilegedRegisters + ?Sized>(hart: &mut H) {
    hart.csr_clear(MIE, MIE_MTIE);
}

/// Read the 64-bit `mtime`, retrying if the high word changed while reading the low word.
pub fn timer_read<H: RegisterAccess + ?Sized>(hart: &mut H) -> u64 {
    loop {
        let high = hart.read_u32(TIMER_BASE + TIMER_MTIMEH);
        let low = hart.read_u32(TIMER_BASE + TIMER_MTIME);
        if hart.read_u32(TIMER_BASE + TIMER_MTIMEH) == high {
            return (high as u64) << 32 | low as u64;
        }
    }
}

/// Set `mtimecmp` to `new_time` without ever passing through a smaller value.
///
/// The low word is first set to all-ones, so the intermediate compare value is never below both
/// the old and the new one and no spurious interrupt is raised.
pub fn timecmp_update<H: RegisterAccess + ?Sized>(hart: &mut H, new_time: u64) {
    hart.write_u32(TIMER_BASE + TIMER_MTIMECMP, u32::MAX);
    hart.write_u32(TIMER_BASE + TIMER_MTIMECMPH, (new_time >> 32) as u32);
    hart.write_u32(TIMER_BASE + TIMER_MTIMECMP, new_time as u32);
}

fn increment_timecmp<H: RegisterAccess + ?Sized>(hart: &mut H, time_base: u64) {
    let now = timer_read(hart);
    timecmp_update(hart, now.wrapping_add(time_base));
}

/// Returns `true` if the timer interrupt is pending, enabled or not.
pub fn timer_irq_pending<H: PrivilegedRegisters + ?Sized>(hart: &mut H) -> bool {
    hart.csr_read(MIP) & MIE_MTIE != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testing::RegisterFile;

    const MTIME: u32 = TIMER_BASE + TIMER_MTIME;
    const MTIMEH: u32 = TIMER_BASE + TIMER_MTIMEH;
    const MTIMECMP: u32 = TIMER_BASE + TIMER_MTIMECMP;
    const MTIMECMPH: u32 = TIMER_BASE + TIMER_MTIMECMPH;

    #[test]
    fn test_timecmp_update_order() {
        let mut regs = RegisterFile::new();
        timecmp_update(&mut regs, 0x1_0000_0010);
        assert_eq!(
            vec![(MTIMECMP, u32::MAX), (MTIMECMPH, 0x1), (MTIMECMP, 0x10)],
            regs.writes()
        );
    }

    #[test]
    fn test_timer_read_retries_on_rollover() {
        let mut regs = RegisterFile::new();
        regs.script(MTIMEH, [0, 1, 1, 1]);
        regs.script(MTIME, [0xFFFF_FFFF, 0x2]);
        assert_eq!(0x1_0000_0002, timer_read(&mut regs));
    }

    #[test]
    fn test_enable_arms_relative_to_now() {
        let mut regs = RegisterFile::new();
        regs.set(MTIME, 500);
        let mut timer = TimerDriver::new();
        timer.enable(&mut regs, 2000);
        assert_eq!(2500, regs.value(MTIMECMP));
        assert_eq!(0, regs.value(MTIMECMPH));
        assert_eq!(MIE_MTIE, regs.csr_value(MIE));
        assert_eq!(MSTATUS_MIE, regs.csr_value(MSTATUS));
        assert_eq!(0, timer.elapsed());

        regs.set(MTIME, 2600);
        timer.handle_interrupt(&mut regs);
        assert_eq!(4600, regs.value(MTIMECMP));
        assert_eq!(1, timer.elapsed());

        timer_disable(&mut regs);
        assert_eq!(0, regs.csr_value(MIE));
        assert_eq!(1, timer.elapsed());
    }

    #[test]
    fn test_irq_pending_reads_mip() {
        let mut regs = RegisterFile::new();
        assert!(!timer_irq_pending(&mut regs));
        regs.set_csr(MIP, MIE_MTIE);
        assert!(timer_irq_pending(&mut regs));
    }
}
