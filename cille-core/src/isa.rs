//! Rendering of the core's enabled instruction-set extensions.
//!
//! The ISA string is derived once from the elaborated core parameters and never changes
//! afterwards. Its exact spelling is consumed by external tooling (disassemblers, co-simulation),
//! so the token tables below are fixed.

use std::fmt;

/// Bit-manipulation configuration of the core (a 2-bit design parameter).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Rv32b {
    #[default]
    None = 0,
    Balanced = 1,
    OtEarlGrey = 2,
    Full = 3,
}

impl Rv32b {
    /// Convert a 2-bit value into a [`Rv32b`] configuration.
    /// Panics if the value doesn't fit in 2 bits (`0..=3`).
    pub fn from_u2(value_u2: u8) -> Self {
        match value_u2 {
            0 => Self::None,
            1 => Self::Balanced,
            2 => Self::OtEarlGrey,
            3 => Self::Full,
            _ => panic!("out of range u2 used"),
        }
    }

    /// Extension suffix appended to the ISA string for this configuration.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Balanced => "_Zba_Zbb_Zbs_XZbf_XZbt",
            Self::OtEarlGrey => "_Zba_Zbb_Zbc_Zbs_XZbf_XZbp_XZbr_XZbt",
            Self::Full => "_Zba_Zbb_Zbc_Zbs_XZbe_XZbf_XZbp_XZbr_XZbt",
        }
    }
}

/// Elaborated configuration bits of the core that affect its ISA.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CoreConfig {
    /// Reduced register file (16 registers).
    pub rv32e: bool,
    /// Hardware multiply/divide.
    pub rv32m: bool,
    pub rv32b: Rv32b,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            rv32e: false,
            rv32m: true,
            rv32b: Rv32b::None,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BaseIsa {
    Rv32e,
    Rv32i,
}

impl BaseIsa {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rv32e => "rv32e",
            Self::Rv32i => "rv32i",
        }
    }
}

/// Immutable description of the ISA implemented by a core.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IsaDescriptor {
    base: BaseIsa,
    /// Extension tokens in rendering order.
    extensions: Vec<&'static str>,
}

impl IsaDescriptor {
    pub fn new(config: &CoreConfig) -> Self {
        let base = if config.rv32e {
            BaseIsa::Rv32e
        } else {
            BaseIsa::Rv32i
        };

        let mut extensions = Vec::with_capacity(3);
        if config.rv32m {
            extensions.push("m");
        }
        // The compressed extension cannot be disabled on this core.
        extensions.push("c");
        if config.rv32b != Rv32b::None {
            extensions.push(config.rv32b.suffix());
        }

        Self { base, extensions }
    }

    pub fn base(&self) -> BaseIsa {
        self.base
    }

    pub fn extensions(&self) -> &[&'static str] {
        &self.extensions
    }
}

impl fmt::Display for IsaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base.as_str())?;
        for extension in &self.extensions {
            f.write_str(extension)?;
        }
        Ok(())
    }
}

/// Render the ISA string for `config`, e.g. `rv32imc_Zba_Zbb_Zbs_XZbf_XZbt`.
pub fn isa_string(config: &CoreConfig) -> String {
    IsaDescriptor::new(config).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rv32e: bool, rv32m: bool, rv32b: u8) -> CoreConfig {
        CoreConfig {
            rv32e,
            rv32m,
            rv32b: Rv32b::from_u2(rv32b),
        }
    }

    #[test]
    fn test_all_configurations() {
        let expected = [
            ((false, false, 0), "rv32ic"),
            ((false, false, 1), "rv32ic_Zba_Zbb_Zbs_XZbf_XZbt"),
            ((false, false, 2), "rv32ic_Zba_Zbb_Zbc_Zbs_XZbf_XZbp_XZbr_XZbt"),
            ((false, false, 3), "rv32ic_Zba_Zbb_Zbc_Zbs_XZbe_XZbf_XZbp_XZbr_XZbt"),
            ((false, true, 0), "rv32imc"),
            ((false, true, 1), "rv32imc_Zba_Zbb_Zbs_XZbf_XZbt"),
            ((false, true, 2), "rv32imc_Zba_Zbb_Zbc_Zbs_XZbf_XZbp_XZbr_XZbt"),
            ((false, true, 3), "rv32imc_Zba_Zbb_Zbc_Zbs_XZbe_XZbf_XZbp_XZbr_XZbt"),
            ((true, false, 0), "rv32ec"),
            ((true, false, 1), "rv32ec_Zba_Zbb_Zbs_XZbf_XZbt"),
            ((true, false, 2), "rv32ec_Zba_Zbb_Zbc_Zbs_XZbf_XZbp_XZbr_XZbt"),
            ((true, false, 3), "rv32ec_Zba_Zbb_Zbc_Zbs_XZbe_XZbf_XZbp_XZbr_XZbt"),
            ((true, true, 0), "rv32emc"),
            ((true, true, 1), "rv32emc_Zba_Zbb_Zbs_XZbf_XZbt"),
            ((true, true, 2), "rv32emc_Zba_Zbb_Zbc_Zbs_XZbf_XZbp_XZbr_XZbt"),
            ((true, true, 3), "rv32emc_Zba_Zbb_Zbc_Zbs_XZbe_XZbf_XZbp_XZbr_XZbt"),
        ];
        for ((rv32e, rv32m, rv32b), isa) in expected {
            assert_eq!(isa, isa_string(&config(rv32e, rv32m, rv32b)));
        }
    }

    #[test]
    fn test_descriptor_tokens() {
        let descriptor = IsaDescriptor::new(&config(true, false, 1));
        assert_eq!(BaseIsa::Rv32e, descriptor.base());
        assert_eq!(&["c", "_Zba_Zbb_Zbs_XZbf_XZbt"], descriptor.extensions());
    }

    #[test]
    #[should_panic(expected = "out of range u2 used")]
    fn test_rv32b_out_of_range() {
        Rv32b::from_u2(4);
    }
}
