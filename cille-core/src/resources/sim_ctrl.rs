//! Simulation control device: a character sink and a halt register.

use crate::bus::{word_offset, Bus};
use crate::regs::{SIM_CTRL_CTRL, SIM_CTRL_OUT};
use log::debug;
use std::io::Write;

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SimCtrlDevice {
    /// Every character written by the firmware, in order.
    output: Vec<u8>,
    halted: bool,
    /// Also forward characters to the host's stdout.
    echo: bool,
}

impl SimCtrlDevice {
    pub fn new(echo: bool) -> Self {
        Self {
            output: Vec::new(),
            halted: false,
            echo,
        }
    }

    pub fn reset(&mut self) {
        self.output.clear();
        self.halted = false;
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    fn putchar(&mut self, c: u8) {
        self.output.push(c);
        if self.echo {
            let mut stdout = std::io::stdout().lock();
            // The sink never fails towards the firmware.
            let _ = stdout.write_all(&[c]);
            if c == b'\n' {
                let _ = stdout.flush();
            }
        }
    }

    pub fn write_u32(&mut self, offset: u32, value: u32) {
        match offset {
            SIM_CTRL_OUT => self.putchar(value as u8),
            SIM_CTRL_CTRL if value & 1 != 0 => {
                debug!("Halt requested through simulation control");
                self.halted = true;
            }
            _ => {}
        }
    }

    pub fn read_u32(&self, offset: u32) -> u32 {
        match offset {
            SIM_CTRL_CTRL => self.halted as u32,
            _ => 0,
        }
    }
}

impl Bus for SimCtrlDevice {
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
    fn test_output_and_halt() {
        let mut sim_ctrl = SimCtrlDevice::new(false);
        for c in b"Tick!\n" {
            sim_ctrl.write(SIM_CTRL_OUT, &(*c as u32).to_le_bytes());
        }
        assert_eq!(b"Tick!\n", sim_ctrl.output());
        assert!(!sim_ctrl.is_halted());
        sim_ctrl.write_u32(SIM_CTRL_CTRL, 0);
        assert!(!sim_ctrl.is_halted());
        sim_ctrl.write_u32(SIM_CTRL_CTRL, 1);
        assert!(sim_ctrl.is_halted());
        sim_ctrl.reset();
        assert!(sim_ctrl.output().is_empty());
    }
}
