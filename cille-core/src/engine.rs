//! Clock and reset driven execution of a top-level design.
//!
//! [`SimCtrl`] plays the role of the simulation engine: it owns the memory regions of the design,
//! parses the simulator's command line, and toggles the clock of the registered [`TopLevel`] until
//! the design reports completion or the cycle limit is reached.

use crate::memory::{MemInit, MemoryRegistry};
use clap::Parser;
use log::{error, info, warn};
use std::cell::RefCell;
use std::ffi::OsString;
use std::fmt::Debug;
use std::rc::Rc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Level at which a reset signal is asserted.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResetPolarity {
    Positive,
    Negative,
}

impl ResetPolarity {
    /// Signal level that asserts reset.
    pub fn asserted(self) -> bool {
        matches!(self, Self::Positive)
    }
}

/// Names of the top-level clock and reset inputs, and the polarity of the reset.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TopSignals {
    pub clock: String,
    pub reset: String,
    pub polarity: ResetPolarity,
}

/// Levels driven onto the top-level inputs for one evaluation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Ports {
    pub clock: bool,
    /// Raw level of the reset input, see [`TopSignals::polarity`].
    pub reset: bool,
}

/// How a design ended its run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Completion {
    /// The design requested a regular halt.
    Halted,
    /// The design hit a fatal condition.
    Failed(String),
}

/// A design that can be driven by [`SimCtrl`].
pub trait TopLevel: Debug {
    /// Hierarchical name of the design root.
    fn name(&self) -> &str;

    /// Evaluate the design with new input levels. `memory` backs every memory region.
    fn eval(&mut self, ports: Ports, memory: &mut MemoryRegistry);

    /// Returns `Some` once the design has finished.
    fn completion(&self) -> Option<Completion>;
}

/// Simulator command line.
#[derive(Parser, Debug, Clone, Eq, PartialEq)]
#[command(version, about = "Cycle-based simulation of an Ibex system", long_about = None)]
pub struct SimArgs {
    /// Terminate the simulation after this many cycles. 0 runs without a limit.
    #[arg(short = 'c', long, value_name = "N")]
    pub term_after_cycles: Option<u64>,
    /// Initialize a memory region from a file. TYPE is one of elf, vmem or bin, and is derived
    /// from the file when omitted.
    #[arg(short, long, value_name = "NAME,FILE[,TYPE]")]
    pub meminit: Vec<MemInit>,
    /// Number of cycles the reset signal is held asserted.
    #[arg(short, long, value_name = "N", default_value_t = 2)]
    pub reset_cycles: u64,
    /// List the memory regions that can be initialized and exit.
    #[arg(short, long)]
    pub list_memory: bool,
}

impl Default for SimArgs {
    fn default() -> Self {
        Self {
            term_after_cycles: None,
            meminit: Vec::new(),
            reset_cycles: 2,
            list_memory: false,
        }
    }
}

/// Result of command line processing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SetupOutcome {
    /// Proceed with the simulation.
    Run,
    /// Do not simulate; terminate the process with this exit code.
    Exit(i32),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no top-level design registered")]
    NoTop,
}

/// Simulation control: drives one registered top-level design.
#[derive(Debug)]
pub struct SimCtrl {
    top: Option<(Rc<RefCell<dyn TopLevel>>, TopSignals)>,
    memory: MemoryRegistry,
    args: SimArgs,
    cycles: u64,
    wall_time: Duration,
    success: bool,
}

impl Default for SimCtrl {
    fn default() -> Self {
        Self::new()
    }
}

impl SimCtrl {
    pub fn new() -> Self {
        Self {
            top: None,
            memory: MemoryRegistry::new(),
            args: SimArgs::default(),
            cycles: 0,
            wall_time: Duration::ZERO,
            success: false,
        }
    }

    /// Register the design to simulate, replacing any previous one.
    pub fn set_top(&mut self, top: Rc<RefCell<dyn TopLevel>>, signals: TopSignals) {
        info!(
            "Top-level {} (clock {}, reset {} active {})",
            top.borrow().name(),
            signals.clock,
            signals.reset,
            if signals.polarity.asserted() { "high" } else { "low" },
        );
        self.top = Some((top, signals));
    }

    /// Hand over the memory regions of the design.
    pub fn register_memory(&mut self, memory: MemoryRegistry) {
        self.memory = memory;
    }

    pub fn memory(&self) -> &MemoryRegistry {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryRegistry {
        &mut self.memory
    }

    pub fn args(&self) -> &SimArgs {
        &self.args
    }

    /// Parse the simulator command line, including the program name, and initialize memories.
    ///
    /// Help and version requests, invalid arguments, and failing memory initialization all
    /// return [`SetupOutcome::Exit`].
    pub fn parse_command_args<I, T>(&mut self, args: I) -> SetupOutcome
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args = match SimArgs::try_parse_from(args) {
            Ok(args) => args,
            Err(err) => {
                let _ = err.print();
                return SetupOutcome::Exit(if err.use_stderr() { 1 } else { 0 });
            }
        };

        if args.list_memory {
            println!("Memory regions:");
            for region in self.memory.iter() {
                println!(
                    "  {:<8} {} {} x {} bytes ({})",
                    region.name(),
                    region.range(),
                    region.size_words(),
                    region.word_size(),
                    region.area().location(),
                );
            }
            return SetupOutcome::Exit(0);
        }

        for init in &args.meminit {
            if let Err(err) = self.memory.load_file(init) {
                error!("Failed to initialize memory region {:?} from {:?}: {err}", init.region, init.path);
                return SetupOutcome::Exit(1);
            }
            info!("Initialized memory region {:?} from {:?}", init.region, init.path);
        }

        self.args = args;
        SetupOutcome::Run
    }

    /// Run the registered design until it completes or the cycle limit is hit, then print
    /// statistics.
    pub fn run_simulation(&mut self) -> Result<(), EngineError> {
        let (top, signals) = self.top.as_ref().ok_or(EngineError::NoTop)?;
        let top = Rc::clone(top);
        let reset_asserted = signals.polarity.asserted();
        let mut top = top.borrow_mut();

        info!("Simulation running");
        let start = Instant::now();
        self.cycles = 0;
        self.success = false;

        for _ in 0..self.args.reset_cycles {
            self.clock_cycle(&mut *top, reset_asserted);
        }

        let outcome = loop {
            if let Some(completion) = top.completion() {
                break completion;
            }
            if let Some(limit) = self.args.term_after_cycles.filter(|&limit| limit > 0) {
                if self.cycles >= limit {
                    println!("Simulation timeout of {limit} cycles reached, shutting down simulation.");
                    break Completion::Failed(format!("timeout after {limit} cycles"));
                }
            }
            self.clock_cycle(&mut *top, !reset_asserted);
        };
        self.wall_time = start.elapsed();

        match outcome {
            Completion::Halted => self.success = true,
            Completion::Failed(reason) => warn!("Simulation failed: {reason}"),
        }
        self.print_statistics();
        Ok(())
    }

    /// One full clock period: falling edge, then rising edge.
    fn clock_cycle(&mut self, top: &mut dyn TopLevel, reset: bool) {
        top.eval(Ports { clock: false, reset }, &mut self.memory);
        top.eval(Ports { clock: true, reset }, &mut self.memory);
        self.cycles += 1;
    }

    fn print_statistics(&self) {
        let seconds = self.wall_time.as_secs_f64();
        println!();
        println!("Simulation statistics");
        println!("=====================");
        println!("Executed cycles:  {}", self.cycles);
        println!("Wallclock time:   {seconds:.3} s");
        if seconds > 0.0 {
            let speed = self.cycles as f64 / seconds;
            println!("Simulation speed: {speed:.0} cycles/s ({:.3} kHz)", speed / 1000.0);
        }
    }

    /// Returns `true` if the last run ended with a regular halt.
    pub fn was_simulation_successful(&self) -> bool {
        self.success
    }

    /// Clock cycles executed by the last run, including reset cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}
