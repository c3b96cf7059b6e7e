//! Counter peripheral with a periodic compare interrupt on fast interrupt line 0.
//!
//! Mirrors [`super::timer`] but uses its own registers and interrupt line.

use super::{Hart, RegisterAccess, MIE_FAST0, MSTATUS_MIE};
use crate::core::csr::{MIE, MSTATUS};
use crate::regs::{COUNTER_BASE, COUNTER_COMPARE, COUNTER_COUNT, COUNTER_CTRL, COUNTER_STATUS};

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CounterDriver {
    increment: u32,
    elapsed: u32,
}

impl CounterDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting and arm a compare interrupt every `count_base` counts.
    ///
    /// With a `count_base` of zero the interrupt fires once and is then masked by the handler.
    pub fn enable<H: Hart + ?Sized>(&mut self, hart: &mut H, count_base: u32) {
        self.elapsed = 0;
        self.increment = count_base;
        let now = counter_read(hart);
        count_update(hart, now.wrapping_add(count_base));
        hart.write_u32(COUNTER_BASE + COUNTER_CTRL, 1);
        hart.csr_set(MIE, MIE_FAST0);
        hart.csr_set(MSTATUS, MSTATUS_MIE);
    }

    /// Number of counter interrupts handled since [`enable`](Self::enable).
    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    /// Counter interrupt handler.
    pub fn handle_interrupt<H: Hart + ?Sized>(&mut self, hart: &mut H) {
        if self.increment == 0 {
            hart.csr_clear(MIE, MIE_FAST0);
        } else {
            let now = counter_read(hart);
            count_update(hart, now.wrapping_add(self.increment));
        }
        self.elapsed += 1;
    }

    /// Stop counting and mask the interrupt. The count is kept.
    pub fn disable<H: Hart + ?Sized>(&mut self, hart: &mut H) {
        hart.csr_clear(MIE, MIE_FAST0);
        hart.write_u32(COUNTER_BASE + COUNTER_CTRL, 0);
    }
}

/// Current count.
pub fn counter_read<H: RegisterAccess + ?Sized>(hart: &mut H) -> u32 {
    hart.read_u32(COUNTER_BASE + COUNTER_COUNT)
}

/// Set the compare value.
pub fn count_update<H: RegisterAccess + ?Sized>(hart: &mut H, new_count: u32) {
    hart.write_u32(COUNTER_BASE + COUNTER_COMPARE, new_count);
}

/// Returns `true` if the counter has reached its compare value while enabled.
pub fn counter_irq_pending<H: RegisterAccess + ?Sized>(hart: &mut H) -> bool {
    hart.read_u32(COUNTER_BASE + COUNTER_STATUS) & 1 != 0
}
