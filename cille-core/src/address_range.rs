use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::{Range, RangeInclusive};
use thiserror::Error;

/// A non-empty range in the 32-bit physical address space, bounded inclusively below and above.
///
/// Enforces the invariant that `self.start() <= self.end()`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AddressRange {
    start: u32,
    end: u32,
}

impl Display for AddressRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#010x}, {:#010x}]", self.start, self.end)
    }
}

impl AddressRange {
    pub fn new(start: u32, end: u32) -> Result<Self, InvalidBoundsError> {
        (start <= end)
            .then_some(Self { start, end })
            .ok_or(InvalidBoundsError::Inverted { start, end })
    }

    /// Create the range of `size` bytes starting at `base`.
    ///
    /// Fails if `size` is zero or if the range would run past the end of the address space.
    pub fn from_base_size(base: u32, size: usize) -> Result<Self, InvalidBoundsError> {
        let delta = size
            .checked_sub(1)
            .and_then(|delta| u32::try_from(delta).ok())
            .ok_or(InvalidBoundsError::Size { base, size })?;
        let end = base
            .checked_add(delta)
            .ok_or(InvalidBoundsError::Size { base, size })?;
        Ok(Self { start: base, end })
    }

    pub fn start(self) -> u32 {
        self.start
    }

    pub fn end(self) -> u32 {
        self.end
    }

    /// Check if an address is contained within this address range.
    pub fn contains(self, address: u32) -> bool {
        self.start <= address && address <= self.end
    }

    /// Returns `true` if at least one address lies in both `self` and `other`.
    pub fn overlaps(self, other: Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Returns `self.end() - self.start()`, which is the size minus 1.
    ///
    /// This value is always within the range `0..=u32::MAX`.
    pub fn delta(self) -> u32 {
        self.end - self.start
    }

    /// Returns the size of this address range if it is representable by a `usize`, or `None`
    /// otherwise.
    pub fn size(self) -> Option<usize> {
        usize::try_from(self.delta())
            .ok()
            .and_then(|n| n.checked_add(1))
    }

    /// Returns `true` if the whole access `address..address + len` falls within this range.
    ///
    /// Zero-length accesses are only accepted when `address` itself is contained.
    pub fn contains_access(self, address: u32, len: usize) -> bool {
        if !self.contains(address) {
            return false;
        }
        match len.checked_sub(1).map(u32::try_from) {
            None => true,
            Some(Ok(delta)) => self.end - address >= delta,
            Some(Err(_)) => false,
        }
    }
}

impl TryFrom<RangeInclusive<u32>> for AddressRange {
    type Error = InvalidBoundsError;

    fn try_from(value: RangeInclusive<u32>) -> Result<Self, Self::Error> {
        Self::new(*value.start(), *value.end())
    }
}

impl TryFrom<Range<u32>> for AddressRange {
    type Error = InvalidBoundsError;

    fn try_from(value: Range<u32>) -> Result<Self, Self::Error> {
        match value.end.checked_sub(1) {
            Some(end) => Self::new(value.start, end),
            None => Err(InvalidBoundsError::Inverted {
                start: value.start,
                end: value.end,
            }),
        }
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum InvalidBoundsError {
    #[error("bounds [{start:#x}, {end:#x}] do not form a valid 32-bit address range")]
    Inverted { start: u32, end: u32 },
    #[error("{size} bytes at {base:#x} do not fit in the 32-bit address space")]
    Size { base: u32, size: usize },
}

#[macro_export]
macro_rules! address_range {
    ($start:expr, $end:expr) => {
        $crate::address_range::AddressRange::new($start, $end).unwrap()
    };
}
