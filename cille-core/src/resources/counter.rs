//! Free-running counter peripheral with a compare interrupt.
//!
//! The counter lives in its own address window and shares no state with the machine timer. Its
//! interrupt drives the core's fast interrupt line 0.

use crate::bus::{word_offset, Bus};
use crate::regs::{COUNTER_COMPARE, COUNTER_COUNT, COUNTER_CTRL, COUNTER_STATUS};

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Counter {
    count: u32,
    compare: u32,
    enabled: bool,
}

impl Counter {
    /// Create a disabled counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Advance the count by one if counting is enabled.
    pub fn tick(&mut self) {
        if self.enabled {
            self.count = self.count.wrapping_add(1);
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn compare(&self) -> u32 {
        self.compare
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Level of the counter interrupt line.
    pub fn irq_pending(&self) -> bool {
        self.enabled && self.count >= self.compare
    }

    pub fn read_u32(&self, offset: u32) -> u32 {
        match offset {
            COUNTER_COUNT => self.count,
            COUNTER_COMPARE => self.compare,
            COUNTER_CTRL => self.enabled as u32,
            COUNTER_STATUS => self.irq_pending() as u32,
            _ => 0,
        }
    }

    pub fn write_u32(&mut self, offset: u32, value: u32) {
        match offset {
            COUNTER_COUNT => self.count = value,
            COUNTER_COMPARE => self.compare = value,
            COUNTER_CTRL => self.enabled = value & 1 != 0,
            // STATUS is read-only
            _ => {}
        }
    }
}

impl Bus for Counter {
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
