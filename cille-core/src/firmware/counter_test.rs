use crate::core::interrupts::Interrupt;
use crate::core::{Firmware, Step};
use crate::driver::console::{puthex, puts};
use crate::driver::counter::{count_update, counter_read, CounterDriver};
use crate::driver::pcount::{pcount_enable, pcount_reset};
use crate::driver::timer::TimerDriver;
use crate::driver::Hart;

/// Timer ticks between two timer interrupts.
const TIME_BASE: u64 = 2000;
/// The program ends once this many timer periods have elapsed.
const LAST_TICK: u64 = 4;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Phase {
    ResetCounters,
    Banner,
    Arm,
    ReadCount,
    UpdateCompare,
    Loop,
    Report,
}

/// Exercises the timer and the counter peripheral.
///
/// Arms a periodic timer interrupt and the counter peripheral, prints the count around an update
/// of the compare value, and then alternates between printing `Tick!` and `Tock!` on every timer
/// period until enough time has elapsed.
#[derive(Debug)]
pub struct CounterTest {
    phase: Phase,
    timer: TimerDriver,
    counter: CounterDriver,
    last_elapsed_time: u64,
}

impl Default for CounterTest {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterTest {
    pub fn new() -> Self {
        Self {
            phase: Phase::ResetCounters,
            timer: TimerDriver::new(),
            counter: CounterDriver::new(),
            last_elapsed_time: 0,
        }
    }

    pub fn elapsed_time(&self) -> u64 {
        self.timer.elapsed()
    }

    pub fn counter_interrupts(&self) -> u32 {
        self.counter.elapsed()
    }
}

impl Firmware for CounterTest {
    fn name(&self) -> &str {
        "counter_test"
    }

    fn step(&mut self, hart: &mut dyn Hart) -> Step {
        match self.phase {
            Phase::ResetCounters => {
                pcount_enable(hart, false);
                pcount_reset(hart);
                pcount_enable(hart, true);
                self.phase = Phase::Banner;
            }
            Phase::Banner => {
                puts(
                    hart,
                    "\nThis is a simple test to check the implementation of the counter.sv module\n",
                );
                puts(hart, "Check the value is correct in GTKWave on the counter_d signal\n");
                puts(hart, "Use cmd: gtkwave sim.fst in root\n");
                self.phase = Phase::Arm;
            }
            Phase::Arm => {
                pcount_enable(hart, false);
                self.timer.enable(hart, TIME_BASE);
                self.counter.enable(hart, 0);
                self.phase = Phase::ReadCount;
            }
            Phase::ReadCount => {
                let count = counter_read(hart);
                puts(hart, "Initial elapsed count: ");
                puthex(hart, count);
                self.phase = Phase::UpdateCompare;
            }
            Phase::UpdateCompare => {
                count_update(hart, 100);
                let count = counter_read(hart);
                puts(hart, "\nInitial elapsed count: ");
                puthex(hart, count);
                puts(hart, "\n");
                self.last_elapsed_time = self.timer.elapsed();
                self.phase = Phase::Loop;
            }
            Phase::Loop => {
                if self.last_elapsed_time > LAST_TICK {
                    self.phase = Phase::Report;
                    return Step::Continue;
                }
                let cur_time = self.timer.elapsed();
                if cur_time != self.last_elapsed_time {
                    self.last_elapsed_time = cur_time;
                    if self.last_elapsed_time & 1 != 0 {
                        puts(hart, "Tick!\n");
                    } else {
                        puts(hart, "Tock!\n");
                    }
                }
                return Step::WaitForInterrupt;
            }
            Phase::Report => {
                puts(hart, "Final elapsed time: ");
                puthex(hart, self.timer.elapsed() as u32);
                puts(hart, "\n");
                return Step::Exit(0);
            }
        }
        Step::Continue
    }

    fn interrupt(&mut self, hart: &mut dyn Hart, cause: Interrupt) {
        match cause {
            Interrupt::MachineTimer => self.timer.handle_interrupt(hart),
            Interrupt::Fast(0) => self.counter.handle_interrupt(hart),
            Interrupt::Fast(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Config};
    use crate::engine::Completion;
    use crate::memory::MemoryRegistry;

    #[test]
    fn test_ticks_until_elapsed_time_passes_four() {
        let config = Config {
            console_echo: false,
            ..Config::default()
        };
        let mut board = Board::new(config, Box::new(CounterTest::new()));
        let mut memory = MemoryRegistry::new();
        let mut cycles = 0;
        while board.completion().is_none() {
            board.tick(&mut memory);
            cycles += 1;
            assert!(cycles < 20_000, "counter test did not finish");
        }
        assert_eq!(Some(Completion::Halted), board.completion());

        let output = String::from_utf8(board.output().to_vec()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!("", lines[0]);
        assert!(lines[1].ends_with("counter.sv module"));
        assert!(lines[4].starts_with("Initial elapsed count: 0000000"));
        assert!(lines[5].starts_with("Initial elapsed count: 0000000"));
        assert_eq!(
            vec!["Tick!", "Tock!", "Tick!", "Tock!", "Tick!", "Final elapsed time: 00000006"],
            lines[6..]
        );
        // Counters were stopped before arming the timer.
        assert!(board.core().counters().report().get("Cycles").unwrap() < 10);
    }
}
