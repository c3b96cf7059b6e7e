//! Provides the simple system SoC: one behavioral core, a timer, a counter, a multiplier, and a
//! simulation control device on a shared system bus.

mod system_bus;

use crate::address_map::AddressMap;
use crate::core::counters::PerfEvent;
use crate::core::interrupts::Interrupt;
use crate::core::{Core, Firmware, HartState};
use crate::engine::{Completion, Ports, TopLevel};
use crate::isa::{CoreConfig, IsaDescriptor};
use crate::memory::MemoryRegistry;
use crate::regs::{
    COUNTER_BASE, DEVICE_WINDOW_SIZE, MULTIPLIER_BASE, SIM_CTRL_BASE, TIMER_BASE,
};
use crate::resources::counter::Counter;
use crate::resources::multiplier::{Multiplier, MultiplierConfig};
use crate::resources::sim_ctrl::SimCtrlDevice;
use crate::resources::timer::Timer;
use crate::AddressRange;
use log::debug;
use system_bus::{Devices, Resource, SystemBus};

#[derive(Debug, Clone)]
pub struct Config {
    pub core: CoreConfig,
    pub multiplier: MultiplierConfig,
    /// Forward characters written by the firmware to stdout.
    pub console_echo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            multiplier: MultiplierConfig::default(),
            console_echo: true,
        }
    }
}

/// Single-core SoC running a firmware program.
///
/// Memory is not part of the board: the regions are owned by the simulation engine and lent to
/// the board on every clock edge.
#[derive(Debug)]
pub struct Board {
    core: Core,
    devices: Devices,
    firmware: Box<dyn Firmware>,
}

impl Board {
    pub fn new(config: Config, firmware: Box<dyn Firmware>) -> Self {
        let window = |base| {
            AddressRange::from_base_size(base, DEVICE_WINDOW_SIZE as usize)
                .expect("device windows lie within the address space")
        };
        let device_map = AddressMap::try_from(vec![
            (window(SIM_CTRL_BASE), Resource::SimCtrl),
            (window(TIMER_BASE), Resource::Timer),
            (window(COUNTER_BASE), Resource::Counter),
            (window(MULTIPLIER_BASE), Resource::Multiplier),
        ])
        .expect("device windows do not overlap");

        Self {
            core: Core::new(config.core),
            devices: Devices {
                device_map,
                sim_ctrl: SimCtrlDevice::new(config.console_echo),
                timer: Timer::new(),
                counter: Counter::new(),
                multiplier: Multiplier::new(&config.multiplier),
            },
            firmware,
        }
    }

    /// Address windows of all memory-mapped devices, with their names.
    pub fn device_windows(&self) -> impl Iterator<Item = (&'static str, AddressRange)> + '_ {
        self.devices
            .device_map
            .iter()
            .map(|(range, resource)| (resource.name(), range))
    }

    pub fn isa(&self) -> IsaDescriptor {
        IsaDescriptor::new(self.core.config())
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn firmware(&self) -> &dyn Firmware {
        &*self.firmware
    }

    pub fn timer(&self) -> &Timer {
        &self.devices.timer
    }

    pub fn counter(&self) -> &Counter {
        &self.devices.counter
    }

    pub fn multiplier(&self) -> &Multiplier {
        &self.devices.multiplier
    }

    /// Everything the firmware wrote to the character sink so far.
    pub fn output(&self) -> &[u8] {
        self.devices.sim_ctrl.output()
    }

    /// Bring the core and the devices back to their reset state. Memory is left untouched.
    pub fn reset(&mut self) {
        self.core.reset();
        self.devices.sim_ctrl.reset();
        self.devices.timer.reset();
        self.devices.counter.reset();
        self.devices.multiplier.reset();
    }

    /// Advance the board by one clock cycle.
    pub fn tick(&mut self, memory: &mut MemoryRegistry) {
        let Self {
            core,
            devices,
            firmware,
        } = self;

        core.set_irq(Interrupt::MachineTimer, devices.timer.irq_pending());
        core.set_irq(Interrupt::Fast(0), devices.counter.irq_pending());

        let mut bus = SystemBus {
            devices: &mut *devices,
            memory,
        };
        core.tick(firmware.as_mut(), &mut bus);

        // Cycles the core spent stalled on the multiplier pass for the rest of the SoC too.
        for _ in 0..devices.multiplier.take_stall_cycles() {
            devices.timer.tick();
            devices.counter.tick();
            core.counters_mut().increment(PerfEvent::Cycle);
        }

        devices.timer.tick();
        devices.counter.tick();
        devices.multiplier.tick();
        for _ in 0..devices.multiplier.take_wait_cycles() {
            core.counters_mut().increment(PerfEvent::MultiplyWait);
        }
        core.end_cycle();
    }

    /// Returns `Some` once the firmware halted the simulation or the core can make no progress.
    pub fn completion(&self) -> Option<Completion> {
        match self.core.state() {
            HartState::Faulted(fault) => Some(Completion::Failed(format!("fatal trap: {fault}"))),
            HartState::Exited(code) if *code != 0 => Some(Completion::Failed(format!(
                "{} returned {code}",
                self.firmware.name()
            ))),
            _ if self.devices.sim_ctrl.is_halted() => Some(Completion::Halted),
            _ => None,
        }
    }
}

/// Top-level design wrapping a [`Board`], with a clock input and an active-low reset input.
#[derive(Debug)]
pub struct SocTop {
    name: String,
    board: Board,
    clock: bool,
}

impl SocTop {
    pub const CLOCK: &'static str = "IO_CLK";
    pub const RESET: &'static str = "IO_RST_N";

    pub fn new(name: impl Into<String>, board: Board) -> Self {
        Self {
            name: name.into(),
            board,
            clock: false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }
}

impl TopLevel for SocTop {
    fn name(&self) -> &str {
        &self.name
    }

    fn eval(&mut self, ports: Ports, memory: &mut MemoryRegistry) {
        let rising_edge = ports.clock && !self.clock;
        self.clock = ports.clock;
        if !rising_edge {
            return;
        }

        // Synchronous, active-low reset.
        if !ports.reset {
            self.board.reset();
        } else {
            self.board.tick(memory);
        }
    }

    fn completion(&self) -> Option<Completion> {
        let completion = self.board.completion();
        if let Some(completion) = &completion {
            debug!("{} completed: {completion:?}", self.name);
        }
        completion
    }
}
