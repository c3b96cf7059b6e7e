//! Behavioral model of the core.
//!
//! The processor pipeline itself is not modelled. Instead the hart runs a [`Firmware`] program
//! one step per clock cycle. Each step, or each invocation of the interrupt handler, retires one
//! instruction. Every load, store and CSR access the program performs goes through the same
//! machine state a real hart would touch: the system bus, the CSR file, and the counters.

pub mod counters;
pub mod csr;
mod hart;
pub mod interrupts;

use crate::driver::{console, CsrOp, Hart};
use crate::isa::CoreConfig;
use crate::system_bus::SystemBus;
use counters::{PerfEvent, PerformanceCounterSet};
use csr::*;
use hart::HartContext;
use interrupts::{Interrupt, Interrupts};
use log::{debug, trace, warn};
use std::fmt::Debug;
use thiserror::Error;

/// Outcome of one firmware step.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Step {
    Continue,
    /// Suspend until an enabled interrupt is pending (`wfi`).
    WaitForInterrupt,
    /// Return from `main` with the given exit code.
    Exit(i32),
}

/// Program executed by the behavioral hart.
pub trait Firmware: Debug {
    fn name(&self) -> &str;

    /// Execute the next step of the program.
    fn step(&mut self, hart: &mut dyn Hart) -> Step;

    /// Handle an interrupt. Called instead of [`step`](Self::step) when interrupts are globally
    /// enabled and `cause` is pending and enabled.
    fn interrupt(&mut self, hart: &mut dyn Hart, cause: Interrupt);
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum HartState {
    Running,
    /// Waiting for an interrupt.
    Sleeping,
    /// The program returned from `main`.
    Exited(i32),
    /// The program hit a fatal trap. Exceptions are not delegated to firmware.
    Faulted(Fault),
}

/// Exceptions raised by the program's accesses.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum Fault {
    #[error("load access fault at {address:#010x} ({size} bytes)")]
    LoadAccess { address: u32, size: usize },
    #[error("store access fault at {address:#010x} ({size} bytes)")]
    StoreAccess { address: u32, size: usize },
    #[error("illegal instruction: access to CSR {0:#05x}")]
    IllegalCsr(CsrSpecifier),
}

#[derive(Debug, Clone)]
pub struct Core {
    config: CoreConfig,
    state: HartState,
    csrs: CsrFile,
    interrupts: Interrupts,
    counters: PerformanceCounterSet,
    /// First fault raised during the current step.
    fault: Option<Fault>,
}

impl Core {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            state: HartState::Running,
            csrs: CsrFile::new(&config),
            interrupts: Interrupts::new(),
            counters: PerformanceCounterSet::new(),
            fault: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn state(&self) -> &HartState {
        &self.state
    }

    pub fn csrs(&self) -> &CsrFile {
        &self.csrs
    }

    pub fn interrupts(&self) -> &Interrupts {
        &self.interrupts
    }

    pub fn counters(&self) -> &PerformanceCounterSet {
        &self.counters
    }

    pub fn counters_mut(&mut self) -> &mut PerformanceCounterSet {
        &mut self.counters
    }

    /// Drive the level of an interrupt line into mip.
    pub fn set_irq(&mut self, interrupt: Interrupt, level: bool) {
        self.interrupts.set_pending(interrupt, level);
    }

    /// Advance the hart by one clock cycle.
    ///
    /// Call [`end_cycle`](Self::end_cycle) once every device has reported its events for this
    /// cycle.
    pub fn tick<B: SystemBus + ?Sized>(&mut self, firmware: &mut dyn Firmware, bus: &mut B) {
        let retired = match self.state {
            HartState::Exited(_) | HartState::Faulted(_) => false,
            HartState::Sleeping if self.interrupts.pending_enabled() == 0 => false,
            HartState::Running | HartState::Sleeping => {
                self.state = HartState::Running;
                self.execute(firmware, bus);
                true
            }
        };

        self.counters.increment(PerfEvent::Cycle);
        if retired {
            self.counters.increment(PerfEvent::InstructionRetired);
        }
    }

    pub fn end_cycle(&mut self) {
        self.counters.end_cycle();
    }

    fn execute<B: SystemBus + ?Sized>(&mut self, firmware: &mut dyn Firmware, bus: &mut B) {
        let interrupt = if self.csrs.mstatus.mie() {
            Interrupt::highest_priority(self.interrupts.pending_enabled())
        } else {
            None
        };

        let step = {
            let mut hart = HartContext::new(self, bus);
            match interrupt {
                Some(cause) => {
                    trace!("Taking {cause}");
                    firmware.interrupt(&mut hart, cause);
                    Step::Continue
                }
                None => firmware.step(&mut hart),
            }
        };

        if let Some(fault) = self.fault.take() {
            warn!("{}: {fault}", firmware.name());
            self.state = HartState::Faulted(fault);
            return;
        }

        match step {
            Step::Continue => {}
            Step::WaitForInterrupt => self.state = HartState::Sleeping,
            Step::Exit(code) => {
                debug!("{} returned {code}", firmware.name());
                if code == 0 {
                    console::sim_halt(&mut HartContext::new(self, bus));
                }
                self.state = HartState::Exited(code);
            }
        }
    }

    fn raise(&mut self, fault: Fault) {
        if self.fault.is_none() {
            self.fault = Some(fault);
        }
    }

    /// Execute a CSR instruction, returning the previous value of the register.
    fn csr_access(&mut self, csr: CsrSpecifier, op: CsrOp) -> Result<u32, Fault> {
        let write = op.value_mask();
        if write.is_some() && is_read_only(csr) {
            return Err(Fault::IllegalCsr(csr));
        }
        let previous = self.read_csr(csr)?;
        if let Some((value, mask)) = write {
            self.write_csr(csr, value, mask);
        }
        Ok(previous)
    }

    fn read_csr(&self, csr: CsrSpecifier) -> Result<u32, Fault> {
        Ok(match csr {
            MSTATUS => self.csrs.mstatus.read(),
            MISA => self.csrs.misa,
            MIE => self.interrupts.read_mie(),
            MIP => self.interrupts.read_mip(),
            MCOUNTINHIBIT => self.counters.mcountinhibit().read(),
            CPUCTRL => self.csrs.cpuctrl,
            MHARTID => 0,
            MCYCLE..=MHPMCOUNTER31 => self.counters.read_low((csr - MCYCLE) as usize),
            MCYCLEH..=MHPMCOUNTER31H => self.counters.read_high((csr - MCYCLEH) as usize),
            CYCLE..=HPMCOUNTER31 => self.counters.read_low((csr - CYCLE) as usize),
            CYCLEH..=HPMCOUNTER31H => self.counters.read_high((csr - CYCLEH) as usize),
            _ => return Err(Fault::IllegalCsr(csr)),
        })
    }

    fn write_csr(&mut self, csr: CsrSpecifier, value: u32, mask: u32) {
        match csr {
            MSTATUS => self.csrs.mstatus.write(value, mask),
            MIE => self.interrupts.write_mie(value, mask),
            MCOUNTINHIBIT => self.counters.write_mcountinhibit(value, mask),
            CPUCTRL => {
                self.csrs.write_cpuctrl(value, mask);
                trace!("icache enabled: {}", self.csrs.icache_enabled());
            }
            MCYCLE..=MHPMCOUNTER31 => {
                self.counters.write_low((csr - MCYCLE) as usize, value, mask)
            }
            MCYCLEH..=MHPMCOUNTER31H => {
                self.counters.write_high((csr - MCYCLEH) as usize, value, mask)
            }
            // misa and mip are WARL with no writable fields
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Bus;
    use crate::driver::{PrivilegedRegisters, RegisterAccess, MIE_MTIE, MSTATUS_MIE};
    use crate::regs::{SIM_CTRL_BASE, SIM_CTRL_CTRL};
    use crate::system_bus::AccessType;
    use std::collections::HashMap;

    /// Flat word-addressed bus that rejects everything at or above `limit`.
    #[derive(Debug, Default)]
    struct FlatBus {
        words: HashMap<u32, u32>,
        limit: u32,
    }

    impl Bus for FlatBus {
        fn read(&mut self, buf: &mut [u8], address: u32) {
            let word = self.words.get(&address).copied().unwrap_or(0).to_le_bytes();
            buf.copy_from_slice(&word[..buf.len()]);
        }

        fn write(&mut self, address: u32, buf: &[u8]) {
            let mut word = [0u8; 4];
            word[..buf.len()].copy_from_slice(buf);
            self.words.insert(address, u32::from_le_bytes(word));
        }
    }

    impl SystemBus for FlatBus {
        fn accepts(&self, address: u32, _size: usize, _access_type: AccessType) -> bool {
            address < self.limit
        }
    }

    fn bus() -> FlatBus {
        FlatBus {
            words: HashMap::new(),
            limit: 0x1000_0000,
        }
    }

    /// Replays a fixed list of closures, one per step, then exits with `exit`.
    #[derive(Default)]
    struct Script {
        steps: Vec<Box<dyn FnMut(&mut dyn Hart) -> Step>>,
        next: usize,
        interrupts: Vec<Interrupt>,
    }

    impl Debug for Script {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Script").field("next", &self.next).finish()
        }
    }

    impl Firmware for Script {
        fn name(&self) -> &str {
            "script"
        }

        fn step(&mut self, hart: &mut dyn Hart) -> Step {
            let step = self.steps.get_mut(self.next).map_or(Step::Exit(0), |f| f(hart));
            self.next += 1;
            step
        }

        fn interrupt(&mut self, hart: &mut dyn Hart, cause: Interrupt) {
            self.interrupts.push(cause);
            // Acknowledge by masking the line.
            hart.csr_clear(MIE, 1 << cause.code());
        }
    }

    fn script(steps: Vec<Box<dyn FnMut(&mut dyn Hart) -> Step>>) -> Script {
        Script {
            steps,
            ..Script::default()
        }
    }

    #[test]
    fn test_exit_zero_halts_through_sim_ctrl() {
        let mut core = Core::new(CoreConfig::default());
        let mut bus = bus();
        let mut firmware = script(vec![]);
        core.tick(&mut firmware, &mut bus);
        assert_eq!(&HartState::Exited(0), core.state());
        assert_eq!(Some(&1), bus.words.get(&(SIM_CTRL_BASE + SIM_CTRL_CTRL)));
        assert_eq!(1, core.counters().get(PerfEvent::Store));
    }

    #[test]
    fn test_nonzero_exit_does_not_halt() {
        let mut core = Core::new(CoreConfig::default());
        let mut bus = bus();
        let mut firmware = script(vec![Box::new(|_| Step::Exit(3))]);
        core.tick(&mut firmware, &mut bus);
        assert_eq!(&HartState::Exited(3), core.state());
        assert!(bus.words.is_empty());
    }

    #[test]
    fn test_bus_fault_is_fatal() {
        let mut core = Core::new(CoreConfig::default());
        let mut bus = bus();
        let mut firmware = script(vec![Box::new(|hart| {
            assert_eq!(0, hart.read_u32(0x2000_0000));
            Step::Continue
        })]);
        core.tick(&mut firmware, &mut bus);
        assert_eq!(
            &HartState::Faulted(Fault::LoadAccess {
                address: 0x2000_0000,
                size: 4
            }),
            core.state()
        );
        core.tick(&mut firmware, &mut bus);
        assert_eq!(1, firmware.next);
    }

    #[test]
    fn test_illegal_csr() {
        let mut core = Core::new(CoreConfig::default());
        let mut bus = bus();
        let mut firmware = script(vec![Box::new(|hart| {
            hart.csr_write(MHARTID, 1);
            Step::Continue
        })]);
        core.tick(&mut firmware, &mut bus);
        assert_eq!(&HartState::Faulted(Fault::IllegalCsr(MHARTID)), core.state());
    }

    #[test]
    fn test_wfi_sleeps_until_enabled_interrupt() {
        let mut core = Core::new(CoreConfig::default());
        let mut bus = bus();
        let mut firmware = script(vec![
            Box::new(|hart| {
                hart.csr_set(MIE, MIE_MTIE);
                hart.csr_set(MSTATUS, MSTATUS_MIE);
                Step::WaitForInterrupt
            }),
            Box::new(|_| Step::Continue),
        ]);
        core.tick(&mut firmware, &mut bus);
        core.end_cycle();
        core.set_irq(Interrupt::Fast(0), true);
        core.tick(&mut firmware, &mut bus);
        core.end_cycle();
        assert_eq!(&HartState::Sleeping, core.state());

        core.set_irq(Interrupt::MachineTimer, true);
        core.tick(&mut firmware, &mut bus);
        core.end_cycle();
        assert_eq!(vec![Interrupt::MachineTimer], firmware.interrupts);
        assert_eq!(1, firmware.next);

        core.tick(&mut firmware, &mut bus);
        assert_eq!(2, firmware.next);
        assert_eq!(4, core.counters().get(PerfEvent::Cycle));
        assert_eq!(3, core.counters().get(PerfEvent::InstructionRetired));
    }

    #[test]
    fn test_interrupts_need_global_enable() {
        let mut core = Core::new(CoreConfig::default());
        let mut bus = bus();
        let mut firmware = script(vec![
            Box::new(|hart| {
                hart.csr_set(MIE, MIE_MTIE);
                Step::Continue
            }),
            Box::new(|_| Step::Continue),
        ]);
        core.set_irq(Interrupt::MachineTimer, true);
        core.tick(&mut firmware, &mut bus);
        core.tick(&mut firmware, &mut bus);
        assert!(firmware.interrupts.is_empty());
        assert_eq!(2, firmware.next);
    }

    #[test]
    fn test_counter_csrs() {
        let mut core = Core::new(CoreConfig::default());
        let mut bus = bus();
        let mut firmware = script(vec![
            Box::new(|_| Step::Continue),
            Box::new(|hart| {
                assert_eq!(1, hart.csr_read(MCYCLE));
                assert_eq!(1, hart.csr_read(CYCLE));
                hart.csr_write(MINSTRET, 100);
                assert_eq!(0, hart.csr_read(MHPMCOUNTER3 + 10));
                Step::Continue
            }),
        ]);
        core.tick(&mut firmware, &mut bus);
        core.end_cycle();
        core.tick(&mut firmware, &mut bus);
        core.end_cycle();
        assert_eq!(100, core.counters().get(PerfEvent::InstructionRetired));
        assert_eq!(2, core.counters().get(PerfEvent::Cycle));
    }
}
