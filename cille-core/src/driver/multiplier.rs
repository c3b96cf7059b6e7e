//! 16x16 bit hardware multiplier.

use super::RegisterAccess;
use crate::regs::{MULTIPLIER_BASE, MULTIPLIER_OPERANDS, MULTIPLIER_RESULT, MULTIPLIER_STATUS};

/// Start multiplying `a` by `b`.
pub fn multer_start<H: RegisterAccess + ?Sized>(hart: &mut H, a: u16, b: u16) {
    hart.write_u32(
        MULTIPLIER_BASE + MULTIPLIER_OPERANDS,
        (b as u32) << 16 | a as u32,
    );
}

/// Returns `true` while a multiplication is in flight.
pub fn multer_busy<H: RegisterAccess + ?Sized>(hart: &mut H) -> bool {
    hart.read_u32(MULTIPLIER_BASE + MULTIPLIER_STATUS) & 1 != 0
}

/// Product of the last completed multiplication.
pub fn multer_result<H: RegisterAccess + ?Sized>(hart: &mut H) -> u32 {
    hart.read_u32(MULTIPLIER_BASE + MULTIPLIER_RESULT)
}

/// Multiply `a` by `b` on the peripheral, polling until the product is available.
pub fn multer_compute<H: RegisterAccess + ?Sized>(hart: &mut H, a: u16, b: u16) -> u32 {
    multer_start(hart, a, b);
    while multer_busy(hart) {}
    multer_result(hart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testing::RegisterFile;
    use crate::driver::testing::Access;
    use crate::driver::Width;

    #[test]
    fn test_compute_packs_operands_and_polls() {
        let mut regs = RegisterFile::new();
        regs.script(MULTIPLIER_BASE + MULTIPLIER_STATUS, [1, 1, 0]);
        regs.set(MULTIPLIER_BASE + MULTIPLIER_RESULT, 1200);
        assert_eq!(1200, multer_compute(&mut regs, 30, 40));
        assert_eq!(
            vec![(MULTIPLIER_BASE + MULTIPLIER_OPERANDS, 40 << 16 | 30)],
            regs.writes()
        );
        let polls = regs
            .log()
            .iter()
            .filter(|&&access| {
                access
                    == Access::Read {
                        address: MULTIPLIER_BASE + MULTIPLIER_STATUS,
                        width: Width::Word,
                    }
            })
            .count();
        assert_eq!(3, polls);
    }
}
