use bitvec::{array::BitArray, field::BitField, order::Lsb0};
use std::fmt;

const MACHINE_SOFTWARE_INTERRUPT: usize = 3;
const MACHINE_TIMER_INTERRUPT: usize = 7;
const MACHINE_EXTERNAL_INTERRUPT: usize = 11;
const FAST_INTERRUPT_BASE: usize = 16;
/// Number of fast local interrupt lines.
pub const FAST_INTERRUPTS: u8 = 15;

#[allow(clippy::identity_op)]
const VALID_INTERRUPTS_MASK: u32 = 0
    | (1 << MACHINE_SOFTWARE_INTERRUPT)
    | (1 << MACHINE_TIMER_INTERRUPT)
    | (1 << MACHINE_EXTERNAL_INTERRUPT)
    | (((1 << FAST_INTERRUPTS) - 1) << FAST_INTERRUPT_BASE);

/// Interrupt causes that a device can raise.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Interrupt {
    MachineTimer,
    /// Fast local interrupt `0..FAST_INTERRUPTS`.
    Fast(u8),
}

impl Interrupt {
    /// Bit index of this interrupt in mip/mie, which is also its exception code.
    pub fn code(self) -> usize {
        match self {
            Self::MachineTimer => MACHINE_TIMER_INTERRUPT,
            Self::Fast(n) => FAST_INTERRUPT_BASE + n as usize,
        }
    }

    /// Select the interrupt to take from a set of pending and enabled interrupts.
    ///
    /// The timer interrupt is taken before any fast interrupt, and lower-numbered fast interrupts
    /// before higher-numbered ones.
    pub fn highest_priority(pending: u32) -> Option<Self> {
        let bits = BitArray::<[u32; 1], Lsb0>::new([pending]);
        if bits[MACHINE_TIMER_INTERRUPT] {
            return Some(Self::MachineTimer);
        }
        (0..FAST_INTERRUPTS).find(|&n| bits[FAST_INTERRUPT_BASE + n as usize]).map(Self::Fast)
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MachineTimer => f.write_str("machine timer interrupt"),
            Self::Fast(n) => write!(f, "fast interrupt {n}"),
        }
    }
}

/// The mip and mie registers.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Interrupts {
    /// The pending lines as driven by the devices. Read-only for software.
    mip: BitArray<[u32; 1], Lsb0>,
    mie: BitArray<[u32; 1], Lsb0>,
}

impl Interrupts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive the level of an interrupt line.
    pub fn set_pending(&mut self, interrupt: Interrupt, level: bool) {
        self.mip.set(interrupt.code(), level);
    }

    pub fn is_pending(&self, interrupt: Interrupt) -> bool {
        self.mip[interrupt.code()]
    }

    pub fn is_enabled(&self, interrupt: Interrupt) -> bool {
        self.mie[interrupt.code()]
    }

    pub fn read_mip(&self) -> u32 {
        self.mip.load_le()
    }

    pub fn read_mie(&self) -> u32 {
        self.mie.load_le()
    }

    pub fn write_mie(&mut self, value: u32, mask: u32) {
        let mask = mask & VALID_INTERRUPTS_MASK;
        let mie = self.read_mie() & !mask | value & mask;
        self.mie.store_le(mie);
    }

    /// Interrupts that are both pending and enabled.
    pub fn pending_enabled(&self) -> u32 {
        self.read_mip() & self.read_mie()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority() {
        assert_eq!(None, Interrupt::highest_priority(0));
        assert_eq!(None, Interrupt::highest_priority(1 << 3));
        assert_eq!(
            Some(Interrupt::MachineTimer),
            Interrupt::highest_priority(1 << 7 | 1 << 16)
        );
        assert_eq!(
            Some(Interrupt::Fast(2)),
            Interrupt::highest_priority(1 << 18 | 1 << 20)
        );
    }

    #[test]
    fn test_mie_is_warl() {
        let mut interrupts = Interrupts::new();
        interrupts.write_mie(0xFFFF_FFFF, 0xFFFF_FFFF);
        assert_eq!(0x7FFF_0888, interrupts.read_mie());
        interrupts.write_mie(0, 1 << 7);
        assert!(!interrupts.is_enabled(Interrupt::MachineTimer));
        assert!(interrupts.is_enabled(Interrupt::Fast(0)));
    }

    #[test]
    fn test_pending_enabled() {
        let mut interrupts = Interrupts::new();
        interrupts.set_pending(Interrupt::MachineTimer, true);
        interrupts.set_pending(Interrupt::Fast(0), true);
        assert_eq!(1 << 7 | 1 << 16, interrupts.read_mip());
        assert_eq!(0, interrupts.pending_enabled());
        interrupts.write_mie(1 << 16, 1 << 16);
        assert_eq!(1 << 16, interrupts.pending_enabled());
        interrupts.set_pending(Interrupt::Fast(0), false);
        assert_eq!(0, interrupts.pending_enabled());
    }
}
