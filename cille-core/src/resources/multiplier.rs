//! 16x16 bit multiplier peripheral with a configurable latency.
//!
//! Polling STATUS while a multiplication is in flight stalls the load until the multiplier has
//! advanced one cycle, so a busy-wait always terminates after `latency` polls. Every such stall is
//! a full clock cycle of the system; the board collects them with
//! [`take_stall_cycles`](Multiplier::take_stall_cycles) and advances the rest of the SoC.

use crate::bus::{word_offset, Bus};
use crate::regs::{MULTIPLIER_OPERANDS, MULTIPLIER_RESULT, MULTIPLIER_STATUS};

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MultiplierConfig {
    /// Number of cycles between writing the operands and the product becoming visible.
    ///
    /// A latency of zero models a combinational multiplier.
    pub latency: u32,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Multiplier {
    latency: u32,
    operands: u32,
    result: u32,
    /// Product of the in-flight multiplication and the number of cycles left until it completes.
    in_flight: Option<(u32, u32)>,
    /// Busy cycles not yet collected by [`take_wait_cycles`](Self::take_wait_cycles).
    wait_cycles: u64,
    /// Cycles the bus was stalled by STATUS polls, a subset of `wait_cycles`.
    stall_cycles: u64,
}

impl Multiplier {
    pub fn new(config: &MultiplierConfig) -> Self {
        Self {
            latency: config.latency,
            operands: 0,
            result: 0,
            in_flight: None,
            wait_cycles: 0,
            stall_cycles: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self {
            latency: self.latency,
            ..Self::new(&MultiplierConfig::default())
        };
    }

    pub fn latency(&self) -> u32 {
        self.latency
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn result(&self) -> u32 {
        self.result
    }

    /// Returns the number of cycles spent busy since the last call, stalls included.
    pub fn take_wait_cycles(&mut self) -> u64 {
        std::mem::take(&mut self.wait_cycles)
    }

    /// Returns the number of cycles the bus was stalled by STATUS polls since the last call.
    pub fn take_stall_cycles(&mut self) -> u64 {
        std::mem::take(&mut self.stall_cycles)
    }

    /// Advance an in-flight multiplication by one cycle.
    pub fn tick(&mut self) {
        if self.is_busy() {
            self.wait_cycles += 1;
        }
        self.advance();
    }

    /// Hold a STATUS read for one cycle of an in-flight multiplication.
    fn stall(&mut self) {
        if self.is_busy() {
            self.stall_cycles += 1;
            self.tick();
        }
    }

    fn advance(&mut self) {
        match self.in_flight {
            Some((product, 0 | 1)) => {
                self.result = product;
                self.in_flight = None;
            }
            Some((product, remaining)) => self.in_flight = Some((product, remaining - 1)),
            None => {}
        }
    }

    fn start(&mut self, operands: u32) {
        self.operands = operands;
        let a = operands & 0xFFFF;
        let b = operands >> 16;
        let product = a * b;
        if self.latency == 0 {
            self.result = product;
        } else {
            self.in_flight = Some((product, self.latency));
        }
    }

    pub fn read_u32(&self, offset: u32) -> u32 {
        match offset {
            MULTIPLIER_OPERANDS => self.operands,
            MULTIPLIER_RESULT => self.result,
            MULTIPLIER_STATUS => self.is_busy() as u32,
            _ => 0,
        }
    }

    pub fn write_u32(&mut self, offset: u32, value: u32) {
        if offset == MULTIPLIER_OPERANDS {
            self.start(value);
        }
    }
}

impl Bus for Multiplier {
    fn read(&mut self, buf: &mut [u8], address: u32) {
        if let Some(offset) = word_offset(address, buf.len()) {
            buf.copy_from_slice(&self.read_u32(offset).to_le_bytes());
            if offset == MULTIPLIER_STATUS {
                self.stall();
            }
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
    fn test_combinational_product() {
        let mut multiplier = Multiplier::new(&MultiplierConfig::default());
        multiplier.write_u32(MULTIPLIER_OPERANDS, 0xFFFF << 16 | 0xFFFF);
        assert!(!multiplier.is_busy());
        assert_eq!(0xFFFE_0001, multiplier.read_u32(MULTIPLIER_RESULT));
    }

    #[test]
    fn test_latency() {
        let mut multiplier = Multiplier::new(&MultiplierConfig { latency: 3 });
        multiplier.write_u32(MULTIPLIER_OPERANDS, 6 << 16 | 7);
        multiplier.tick();
        multiplier.tick();
        assert_eq!(1, multiplier.read_u32(MULTIPLIER_STATUS));
        assert_eq!(0, multiplier.read_u32(MULTIPLIER_RESULT));
        multiplier.tick();
        assert_eq!(0, multiplier.read_u32(MULTIPLIER_STATUS));
        assert_eq!(42, multiplier.read_u32(MULTIPLIER_RESULT));

        multiplier.write_u32(MULTIPLIER_OPERANDS, 2 << 16 | 2);
        assert!(multiplier.is_busy());
        assert_eq!(42, multiplier.result());
        multiplier.reset();
        assert_eq!(3, multiplier.latency());
        assert!(!multiplier.is_busy());
    }

    #[test]
    fn test_status_poll_stalls() {
        let mut multiplier = Multiplier::new(&MultiplierConfig { latency: 2 });
        multiplier.write(MULTIPLIER_OPERANDS, &(3u32 << 16 | 5).to_le_bytes());
        let mut polls = 0;
        let mut status = [0u8; 4];
        loop {
            multiplier.read(&mut status, MULTIPLIER_STATUS);
            polls += 1;
            if status[0] & 1 == 0 {
                break;
            }
        }
        assert_eq!(3, polls);
        assert_eq!(15, multiplier.result());
        assert_eq!(2, multiplier.take_wait_cycles());
        assert_eq!(0, multiplier.take_wait_cycles());
        assert_eq!(2, multiplier.take_stall_cycles());

        // Polling an idle multiplier does not stall.
        multiplier.read(&mut status, MULTIPLIER_STATUS);
        assert_eq!(0, multiplier.take_stall_cycles());
    }
}
