//! Fixed physical register map shared by the simulated SoC and the firmware drivers.
//!
//! All device registers are 32-bit words. Every device window is [`DEVICE_WINDOW_SIZE`] bytes.

/// Size in bytes of every memory-mapped device window.
pub const DEVICE_WINDOW_SIZE: u32 = 0x400;

/// Simulation control: character sink and halt.
pub const SIM_CTRL_BASE: u32 = 0x0002_0000;
/// Writing the low byte emits one character on the simulator log.
pub const SIM_CTRL_OUT: u32 = 0x0;
/// Writing bit 0 halts the simulation.
pub const SIM_CTRL_CTRL: u32 = 0x8;

/// Machine timer.
pub const TIMER_BASE: u32 = 0x0003_0000;
pub const TIMER_MTIME: u32 = 0x0;
pub const TIMER_MTIMEH: u32 = 0x4;
pub const TIMER_MTIMECMP: u32 = 0x8;
pub const TIMER_MTIMECMPH: u32 = 0xC;

/// Counter peripheral.
pub const COUNTER_BASE: u32 = 0x0004_0000;
pub const COUNTER_COUNT: u32 = 0x0;
pub const COUNTER_COMPARE: u32 = 0x4;
/// Bit 0 enables counting.
pub const COUNTER_CTRL: u32 = 0x8;
/// Bit 0 reflects the pending interrupt. Read-only.
pub const COUNTER_STATUS: u32 = 0xC;

/// 16x16 multiplier.
pub const MULTIPLIER_BASE: u32 = 0x0005_0000;
/// Operand a in bits 15:0, operand b in bits 31:16.
pub const MULTIPLIER_OPERANDS: u32 = 0x0;
pub const MULTIPLIER_RESULT: u32 = 0x4;
/// Bit 0 is set while a multiplication is in flight.
pub const MULTIPLIER_STATUS: u32 = 0x8;

/// Base address of the main RAM region.
pub const RAM_BASE: u32 = 0x0010_0000;
/// Name under which the main RAM region is registered.
pub const RAM_REGION: &str = "ram";

/// Base addresses of all device windows, in ascending order.
pub const DEVICE_BASES: [u32; 4] = [SIM_CTRL_BASE, TIMER_BASE, COUNTER_BASE, MULTIPLIER_BASE];

const_assert!(SIM_CTRL_BASE + DEVICE_WINDOW_SIZE <= TIMER_BASE);
const_assert!(TIMER_BASE + DEVICE_WINDOW_SIZE <= COUNTER_BASE);
const_assert!(COUNTER_BASE + DEVICE_WINDOW_SIZE <= MULTIPLIER_BASE);
const_assert!(MULTIPLIER_BASE + DEVICE_WINDOW_SIZE <= RAM_BASE);
const_assert!(TIMER_MTIMECMPH < DEVICE_WINDOW_SIZE);
const_assert!(COUNTER_STATUS < DEVICE_WINDOW_SIZE);
