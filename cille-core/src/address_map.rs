use crate::AddressRange;
use std::cmp::Ordering;
use thiserror::Error;

/// Generic map of 32-bit address ranges to values of type `T`.
///
/// The ranges cannot overlap. Entries are kept ordered by start address so lookups are a binary
/// search.
#[derive(Debug, Clone)]
pub struct AddressMap<T> {
    ordered_ranges: Vec<(AddressRange, T)>,
}

impl<T> Default for AddressMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AddressMap<T> {
    /// Create new empty map.
    pub fn new() -> Self {
        Self {
            ordered_ranges: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.ordered_ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_ranges.is_empty()
    }

    /// Add a new `range => value` mapping.
    ///
    /// Fails without modifying the map if `range` overlaps any range that is already mapped.
    pub fn insert(&mut self, range: AddressRange, value: T) -> Result<(), AddressMapError> {
        let index = self
            .ordered_ranges
            .partition_point(|(r, _)| r.start() < range.start());

        // Only the direct neighbours can overlap, since the existing ranges are disjoint.
        let neighbours = index
            .checked_sub(1)
            .and_then(|i| self.ordered_ranges.get(i))
            .into_iter()
            .chain(self.ordered_ranges.get(index));
        for (existing, _) in neighbours {
            if existing.overlaps(range) {
                return Err(AddressMapError::OverlappingAddressRanges {
                    new: range,
                    existing: *existing,
                });
            }
        }

        self.ordered_ranges.insert(index, (range, value));
        Ok(())
    }

    /// Returns the mapped range that contains `address`, and the value that it maps to.
    ///
    /// Returns `None` if `address` lies in a vacant region.
    pub fn range_value(&self, address: u32) -> Option<(AddressRange, &T)> {
        self.ordered_ranges
            .binary_search_by(|(range, _)| {
                if address < range.start() {
                    Ordering::Greater
                } else if address <= range.end() {
                    Ordering::Equal
                } else {
                    Ordering::Less
                }
            })
            .ok()
            .map(|index| {
                let (range, value) = &self.ordered_ranges[index];
                (*range, value)
            })
    }

    /// Returns the value that the address range containing `address` maps to, or `None` if that
    /// address range is vacant.
    pub fn value(&self, address: u32) -> Option<&T> {
        self.range_value(address).map(|(_, value)| value)
    }

    /// Returns the first mapped range that overlaps `range`, if any.
    pub fn find_overlap(&self, range: AddressRange) -> Option<(AddressRange, &T)> {
        self.ordered_ranges
            .iter()
            .find(|(r, _)| r.overlaps(range))
            .map(|(r, value)| (*r, value))
    }

    /// Iterate over all mappings in order of increasing address.
    pub fn iter(&self) -> impl Iterator<Item = (AddressRange, &T)> {
        self.ordered_ranges.iter().map(|(range, value)| (*range, value))
    }
}

impl<T> TryFrom<Vec<(AddressRange, T)>> for AddressMap<T> {
    type Error = AddressMapError;

    fn try_from(value: Vec<(AddressRange, T)>) -> Result<Self, Self::Error> {
        let mut map = Self::new();
        for (range, v) in value {
            map.insert(range, v)?;
        }
        Ok(map)
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum AddressMapError {
    /// Attempt to add an address range that overlaps with a previously added address range.
    #[error("address range {new} overlaps with previously added address range {existing}")]
    OverlappingAddressRanges {
        new: AddressRange,
        existing: AddressRange,
    },
}

#[macro_export]
macro_rules! addr_map {
    ($([$start:expr, $end:expr] => $value:expr,)*) => {
        $crate::address_map::AddressMap::try_from(vec![
            $(($crate::address_range![$start, $end], $value)),*
        ]).unwrap()
    };
}
