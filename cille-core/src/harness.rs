//! Lifecycle of a simple system: set up the engine, run the design, report its counters.

use crate::board::{self, Board, SocTop};
use crate::core::counters::PcountReport;
use crate::core::Firmware;
use crate::engine::{EngineError, ResetPolarity, SetupOutcome, SimCtrl, TopLevel, TopSignals};
use crate::isa::CoreConfig;
use crate::memory::MemoryRegistry;
use crate::regs::{RAM_BASE, RAM_REGION};
use crate::resources::mem_area::MemArea;
use crate::resources::multiplier::MultiplierConfig;
use log::{error, info};
use std::cell::RefCell;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use std::{fs, io};
use thiserror::Error;

/// Design parameters of a simple system.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    /// Name of the design root. Also names the counter record file.
    pub name: String,
    /// Hierarchical location of the RAM instance.
    pub ram_location: String,
    /// RAM size in 32-bit words.
    pub ram_size_words: usize,
    pub core: CoreConfig,
    pub multiplier: MultiplierConfig,
    /// Forward the firmware's console output to stdout.
    pub console_echo: bool,
    /// Where [`SimpleSystem::finish`] writes the counter records. Defaults to
    /// `<name>_pcount.csv` in the working directory.
    pub pcount_csv: Option<PathBuf>,
}

impl SystemConfig {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            ram_location: format!("TOP.{name}.u_ram.u_ram.gen_generic.u_impl_generic"),
            name,
            ram_size_words: 1024 * 1024,
            core: CoreConfig::default(),
            multiplier: MultiplierConfig::default(),
            console_echo: true,
            pcount_csv: None,
        }
    }

    pub fn pcount_csv_path(&self) -> PathBuf {
        self.pcount_csv
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}_pcount.csv", self.name)))
    }
}

/// Progress of a [`SimpleSystem`] through its lifecycle. Transitions only move forward.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RunState {
    Created,
    Configured,
    Running,
    FinishedSuccess,
    FinishedFailure,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Configured => "configured",
            Self::Running => "running",
            Self::FinishedSuccess => "finished successfully",
            Self::FinishedFailure => "finished unsuccessfully",
        })
    }
}

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("cannot {operation} a system that is {state}")]
    InvalidState {
        operation: &'static str,
        state: RunState,
    },
    #[error("RAM of {0} words does not fit in the address space")]
    RamSize(usize),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to write performance counters to {path:?}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A simple system: one [`SocTop`] with a RAM region, driven by a [`SimCtrl`].
#[derive(Debug)]
pub struct SimpleSystem {
    config: SystemConfig,
    top: Rc<RefCell<SocTop>>,
    state: RunState,
}

impl SimpleSystem {
    pub fn new(config: SystemConfig, firmware: Box<dyn Firmware>) -> Self {
        let board = Board::new(
            board::Config {
                core: config.core,
                multiplier: config.multiplier.clone(),
                console_echo: config.console_echo,
            },
            firmware,
        );
        let top = Rc::new(RefCell::new(SocTop::new(config.name.clone(), board)));
        Self {
            config,
            top,
            state: RunState::Created,
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Register the design and its memory with `sim`, and process the command line.
    ///
    /// Returns [`SetupOutcome::Exit`] if the command line asks for help or is invalid. The system
    /// then stays in [`RunState::Created`].
    ///
    /// # Panics
    ///
    /// Panics if the RAM region overlaps a device window.
    pub fn setup<I, T>(&mut self, sim: &mut SimCtrl, args: I) -> Result<SetupOutcome, HarnessError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        self.expect_state("set up", RunState::Created)?;

        let top: Rc<RefCell<dyn TopLevel>> = self.top.clone();
        sim.set_top(
            top,
            TopSignals {
                clock: SocTop::CLOCK.to_owned(),
                reset: SocTop::RESET.to_owned(),
                polarity: ResetPolarity::Negative,
            },
        );

        let ram = MemArea::new(&self.config.ram_location, self.config.ram_size_words, 4)
            .ok_or(HarnessError::RamSize(self.config.ram_size_words))?;
        let mut memory = MemoryRegistry::new();
        memory.register(RAM_REGION, RAM_BASE, ram);
        for (device, window) in self.top.borrow().board().device_windows() {
            if let Some(region) = memory.find_overlap(window) {
                panic!(
                    "memory region {:?} {} overlaps the {device} window {window}",
                    region.name(),
                    region.range()
                );
            }
        }
        sim.register_memory(memory);

        let outcome = sim.parse_command_args(args);
        if outcome == SetupOutcome::Run {
            info!("{}: ISA {}", self.config.name, self.isa_string());
            self.state = RunState::Configured;
        }
        Ok(outcome)
    }

    /// Run the simulation until the design halts, fails, or times out.
    pub fn run(&mut self, sim: &mut SimCtrl) -> Result<(), HarnessError> {
        self.expect_state("run", RunState::Configured)?;
        self.state = RunState::Running;

        println!("Simulation of Ibex");
        println!("==================");
        println!();

        let result = sim.run_simulation();
        self.state = if result.is_ok() && sim.was_simulation_successful() {
            RunState::FinishedSuccess
        } else {
            RunState::FinishedFailure
        };
        info!("{}: simulation {}", self.config.name, self.state);
        Ok(result?)
    }

    /// Report the performance counters of a successful run.
    ///
    /// Returns `Ok(false)` without reporting anything if the run was not successful.
    pub fn finish(&mut self, sim: &SimCtrl) -> Result<bool, HarnessError> {
        if !matches!(
            self.state,
            RunState::FinishedSuccess | RunState::FinishedFailure
        ) {
            return Err(HarnessError::InvalidState {
                operation: "finish",
                state: self.state,
            });
        }
        if self.state == RunState::FinishedFailure || !sim.was_simulation_successful() {
            return Ok(false);
        }

        let report = self.pcount_report();
        println!();
        println!("Performance Counters");
        println!("====================");
        print!("{}", report.to_text());

        let path = self.config.pcount_csv_path();
        fs::write(&path, report.to_csv()).map_err(|source| HarnessError::Report {
            path: path.clone(),
            source,
        })?;
        info!("Wrote performance counters to {path:?}");
        Ok(true)
    }

    /// Set up, run and finish the system, returning the process exit code.
    pub fn main<I, T>(&mut self, sim: &mut SimCtrl, args: I) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let result = self.setup(sim, args).and_then(|outcome| match outcome {
            SetupOutcome::Exit(code) => Ok(code),
            SetupOutcome::Run => {
                self.run(sim)?;
                Ok(if self.finish(sim)? { 0 } else { 1 })
            }
        });
        match result {
            Ok(code) => code,
            Err(err) => {
                error!("{}: {err}", self.config.name);
                1
            }
        }
    }

    /// ISA implemented by the core, e.g. `rv32imc`.
    pub fn isa_string(&self) -> String {
        self.top.borrow().board().isa().to_string()
    }

    /// Current values of the performance counters.
    pub fn pcount_report(&self) -> PcountReport {
        self.top.borrow().board().core().counters().report()
    }

    /// Console output of the firmware.
    pub fn output(&self) -> Vec<u8> {
        self.top.borrow().board().output().to_vec()
    }

    fn expect_state(&self, operation: &'static str, expected: RunState) -> Result<(), HarnessError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(HarnessError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}
