//! Fake hart that records every register access, for checking driver sequencing.

use super::{CsrOp, PrivilegedRegisters, RegisterAccess, Width};
use crate::core::csr::CsrSpecifier;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Access {
    Read { address: u32, width: Width },
    Write { address: u32, width: Width, value: u32 },
    Csr { csr: CsrSpecifier, op: CsrOp },
}

/// Plain memory-backed registers and CSRs with no side effects.
#[derive(Debug, Default)]
pub struct RegisterFile {
    registers: HashMap<u32, u32>,
    csrs: HashMap<CsrSpecifier, u32>,
    /// Values returned by upcoming reads of an address, ahead of the stored register value.
    scripted: HashMap<u32, VecDeque<u32>>,
    log: Vec<Access>,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, address: u32, value: u32) {
        self.registers.insert(address, value);
    }

    pub fn value(&self, address: u32) -> u32 {
        self.registers.get(&address).copied().unwrap_or(0)
    }

    pub fn set_csr(&mut self, csr: CsrSpecifier, value: u32) {
        self.csrs.insert(csr, value);
    }

    pub fn csr_value(&self, csr: CsrSpecifier) -> u32 {
        self.csrs.get(&csr).copied().unwrap_or(0)
    }

    /// Make the next reads of `address` return `values`, in order.
    pub fn script(&mut self, address: u32, values: impl IntoIterator<Item = u32>) {
        self.scripted.entry(address).or_default().extend(values);
    }

    pub fn log(&self) -> &[Access] {
        &self.log
    }

    /// Only the writes in the log, as `(address, value)` pairs.
    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.log
            .iter()
            .filter_map(|access| match *access {
                Access::Write { address, value, .. } => Some((address, value)),
                _ => None,
            })
            .collect()
    }

    /// Only the CSR operations in the log.
    pub fn csr_ops(&self) -> Vec<(CsrSpecifier, CsrOp)> {
        self.log
            .iter()
            .filter_map(|access| match *access {
                Access::Csr { csr, op } => Some((csr, op)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}

impl RegisterAccess for RegisterFile {
    fn read(&mut self, address: u32, width: Width) -> u32 {
        self.log.push(Access::Read { address, width });
        self.scripted
            .get_mut(&address)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.value(address))
    }

    fn write(&mut self, address: u32, width: Width, value: u32) {
        self.log.push(Access::Write {
            address,
            width,
            value,
        });
        self.registers.insert(address, value);
    }
}

impl PrivilegedRegisters for RegisterFile {
    fn csr(&mut self, csr: CsrSpecifier, op: CsrOp) -> u32 {
        self.log.push(Access::Csr { csr, op });
        let previous = self.csr_value(csr);
        if let Some((value, mask)) = op.value_mask() {
            self.csrs.insert(csr, previous & !mask | value & mask);
        }
        previous
    }
}
