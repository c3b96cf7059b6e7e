//! Machine performance counters, modelled after the Ibex counter bank.
//!
//! Slot `n` of the bank is accessible through `mcycle`/`minstret`/`mhpmcounterN` (low half) and
//! the matching `...h` CSR (high half). Slot 1 is reserved (it would be `time`) and reads as zero.
//! Slots past [`PCOUNT_SLOTS`] are not implemented: they read as zero and ignore writes.

use bitvec::{array::BitArray, order::Lsb0, view::BitView};
use std::fmt::Write;

/// Number of implemented counter slots.
pub const PCOUNT_SLOTS: usize = 13;

/// Display names of the counter slots. The reserved slot is named `NONE`.
pub const PCOUNT_NAMES: [&str; PCOUNT_SLOTS] = [
    "Cycles",
    "NONE",
    "Instructions Retired",
    "LSU Busy",
    "Fetch Wait",
    "Loads",
    "Stores",
    "Jumps",
    "Conditional Branches",
    "Taken Conditional Branches",
    "Compressed Instructions",
    "Multiply Wait",
    "Divide Wait",
];

const RESERVED_SLOT: usize = 1;

/// Event counted by one slot of the [`PerformanceCounterSet`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PerfEvent {
    Cycle = 0,
    InstructionRetired = 2,
    LsuBusy = 3,
    FetchWait = 4,
    Load = 5,
    Store = 6,
    Jump = 7,
    ConditionalBranch = 8,
    TakenConditionalBranch = 9,
    CompressedInstruction = 10,
    MultiplyWait = 11,
    DivideWait = 12,
}

impl PerfEvent {
    pub fn slot(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        PCOUNT_NAMES[self.slot()]
    }
}

/// The mcountinhibit register is **WARL**. Only bits of implemented counters are writable, and bit
/// 1 is a read-only zero.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Mcountinhibit(u32);

impl Mcountinhibit {
    const WRITABLE: u32 = ((1 << PCOUNT_SLOTS) - 1) & !(1 << RESERVED_SLOT);

    pub fn new() -> Self {
        Self(0x0000_0000)
    }

    /// Returns `true` if counting is inhibited for slot `n`.
    pub fn inhibits(&self, n: usize) -> bool {
        n < PCOUNT_SLOTS && self.0.view_bits::<Lsb0>()[n]
    }

    pub fn read(&self) -> u32 {
        self.0
    }

    pub fn write(&mut self, value: u32, mask: u32) {
        let mask = mask & Self::WRITABLE;
        self.0 = self.0 & !mask | value & mask;
    }
}

/// Bank of 64-bit event counters gated by [`Mcountinhibit`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PerformanceCounterSet {
    counters: [u64; PCOUNT_SLOTS],
    /// Slots written by software during the current cycle. Their increment for this cycle is
    /// dropped, so a written value is observed exactly.
    skip_increment: BitArray<[u16; 1], Lsb0>,
    mcountinhibit: Mcountinhibit,
}

impl Default for PerformanceCounterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceCounterSet {
    pub fn new() -> Self {
        Self {
            counters: [0; PCOUNT_SLOTS],
            skip_increment: BitArray::ZERO,
            mcountinhibit: Mcountinhibit::new(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Returns `true` unless counting is inhibited for the cycle counter.
    pub fn is_enabled(&self) -> bool {
        !self.mcountinhibit.inhibits(PerfEvent::Cycle.slot())
    }

    pub fn increment(&mut self, event: PerfEvent) {
        let n = event.slot();
        if self.mcountinhibit.inhibits(n) || self.skip_increment[n] {
            return;
        }
        self.counters[n] = self.counters[n].wrapping_add(1);
    }

    /// Close the current cycle: software writes no longer suppress increments.
    pub fn end_cycle(&mut self) {
        self.skip_increment = BitArray::ZERO;
    }

    /// Returns the full 64-bit value of slot `n`, or zero if the slot is not implemented.
    pub fn value(&self, n: usize) -> u64 {
        if n == RESERVED_SLOT {
            return 0;
        }
        self.counters.get(n).copied().unwrap_or(0)
    }

    pub fn get(&self, event: PerfEvent) -> u64 {
        self.value(event.slot())
    }

    /// Low half of slot `n`, as seen through `mcycle`/`minstret`/`mhpmcounterN`.
    pub fn read_low(&self, n: usize) -> u32 {
        self.value(n) as u32
    }

    /// High half of slot `n`, as seen through `mcycleh`/`minstreth`/`mhpmcounterNh`.
    pub fn read_high(&self, n: usize) -> u32 {
        (self.value(n) >> 32) as u32
    }

    pub fn write_low(&mut self, n: usize, value: u32, mask: u32) {
        if let Some(counter) = self.slot_mut(n) {
            let low = *counter as u32 & !mask | value & mask;
            *counter = *counter & 0xffff_ffff_0000_0000 | low as u64;
        }
    }

    pub fn write_high(&mut self, n: usize, value: u32, mask: u32) {
        if let Some(counter) = self.slot_mut(n) {
            let high = (*counter >> 32) as u32 & !mask | value & mask;
            *counter = (high as u64) << 32 | *counter & 0xffff_ffff;
        }
    }

    fn slot_mut(&mut self, n: usize) -> Option<&mut u64> {
        if n == RESERVED_SLOT || n >= PCOUNT_SLOTS {
            return None;
        }
        self.skip_increment.set(n, true);
        Some(&mut self.counters[n])
    }

    pub fn mcountinhibit(&self) -> &Mcountinhibit {
        &self.mcountinhibit
    }

    pub fn write_mcountinhibit(&mut self, value: u32, mask: u32) {
        self.mcountinhibit.write(value, mask);
    }

    /// Snapshot of all named counters, for reporting.
    pub fn report(&self) -> PcountReport {
        PcountReport {
            entries: PCOUNT_NAMES
                .iter()
                .enumerate()
                .filter(|&(n, _)| n != RESERVED_SLOT)
                .map(|(n, &name)| (name, self.value(n)))
                .collect(),
        }
    }
}

/// Named counter values extracted at the end of a run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PcountReport {
    entries: Vec<(&'static str, u64)>,
}

impl PcountReport {
    pub fn entries(&self) -> &[(&'static str, u64)] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, value)| value)
    }

    /// Human-readable table: `name:` left-aligned in a column three wider than the longest name,
    /// followed by the value. One line per counter.
    pub fn to_text(&self) -> String {
        let width = self.entries.iter().map(|(n, _)| n.len()).max().unwrap_or(0) + 3;
        let mut text = String::new();
        for (name, value) in &self.entries {
            let label = format!("{name}:");
            let _ = writeln!(text, "{label:<width$}{value}");
        }
        text
    }

    /// `name,value` records, one per line.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();
        for (name, value) in &self.entries {
            let _ = writeln!(csv, "{name},{value}");
        }
        csv
    }
}
