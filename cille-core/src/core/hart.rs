use super::counters::PerfEvent;
use super::csr::CsrSpecifier;
use super::{Core, Fault};
use crate::driver::{CsrOp, PrivilegedRegisters, RegisterAccess, Width};
use crate::system_bus::{AccessType, SystemBus};

/// The hart as seen by firmware during a single step.
pub(super) struct HartContext<'a, B: SystemBus + ?Sized> {
    core: &'a mut Core,
    bus: &'a mut B,
}

impl<'a, B: SystemBus + ?Sized> HartContext<'a, B> {
    pub fn new(core: &'a mut Core, bus: &'a mut B) -> Self {
        Self { core, bus }
    }
}

impl<B: SystemBus + ?Sized> RegisterAccess for HartContext<'_, B> {
    fn read(&mut self, address: u32, width: Width) -> u32 {
        let size = width.bytes();
        self.core.counters.increment(PerfEvent::Load);
        self.core.counters.increment(PerfEvent::LsuBusy);
        if !self.bus.accepts(address, size, AccessType::Read) {
            self.core.raise(Fault::LoadAccess { address, size });
            return 0;
        }
        let mut buf = [0u8; 4];
        self.bus.read(&mut buf[..size], address);
        u32::from_le_bytes(buf)
    }

    fn write(&mut self, address: u32, width: Width, value: u32) {
        let size = width.bytes();
        self.core.counters.increment(PerfEvent::Store);
        self.core.counters.increment(PerfEvent::LsuBusy);
        if !self.bus.accepts(address, size, AccessType::Write) {
            self.core.raise(Fault::StoreAccess { address, size });
            return;
        }
        self.bus.write(address, &value.to_le_bytes()[..size]);
    }
}

impl<B: SystemBus + ?Sized> PrivilegedRegisters for HartContext<'_, B> {
    fn csr(&mut self, csr: CsrSpecifier, op: CsrOp) -> u32 {
        self.core.csr_access(csr, op).unwrap_or_else(|fault| {
            self.core.raise(fault);
            0
        })
    }
}
