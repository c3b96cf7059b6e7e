use crate::bus::Bus;
use crate::AddressRange;

/// Byte-based backing store for a memory region, with support for misaligned access.
///
/// A memory area is described the way the design instantiates it: a hierarchical location, a
/// number of words, and the width of a word in bytes.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MemArea {
    /// Hierarchical path of the memory inside the design.
    location: String,
    size_words: usize,
    word_size: usize,
    data: Vec<u8>,
}

impl MemArea {
    /// Create a new zero-initialized memory area of `size_words` words of `word_size` bytes.
    ///
    /// The total size must be at least one byte, and at most `1 << 32` bytes (since it must be
    /// addressable by `u32`). If it does not satisfy these conditions, `None` is returned.
    pub fn new(location: impl Into<String>, size_words: usize, word_size: usize) -> Option<Self> {
        let size = size_words.checked_mul(word_size)?;
        if size == 0 || (usize::BITS > 32 && size > (1 << 32)) {
            None
        } else {
            Some(Self {
                location: location.into(),
                size_words,
                word_size,
                data: vec![0; size],
            })
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn size_words(&self) -> usize {
        self.size_words
    }

    pub fn word_size(&self) -> usize {
        self.word_size
    }

    /// Returns the size expressed in bytes. Guaranteed to be at least one.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns the range of addresses this area occupies when placed at `base`.
    pub fn range_at(&self, base: u32) -> Option<AddressRange> {
        AddressRange::from_base_size(base, self.len()).ok()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Force the area back to its reset state, which is all-zeros.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Reads a range of bytes into `buf`. Does not have side effects.
    ///
    /// Elements in `buf` corresponding to offsets past the end of the area are left untouched.
    pub fn read(&self, buf: &mut [u8], offset: u32) {
        let Some(available) = self.data.get(offset as usize..) else {
            return;
        };
        let size = buf.len().min(available.len());
        buf[..size].copy_from_slice(&available[..size]);
    }

    /// Writes a range of bytes from `buf`.
    ///
    /// Bytes that would land past the end of the area are ignored.
    pub fn write(&mut self, offset: u32, buf: &[u8]) {
        let Some(available) = self.data.get_mut(offset as usize..) else {
            return;
        };
        let size = buf.len().min(available.len());
        available[..size].copy_from_slice(&buf[..size]);
    }
}

impl Bus for MemArea {
    fn read(&mut self, buf: &mut [u8], address: u32) {
        MemArea::read(self, buf, address);
    }

    fn write(&mut self, address: u32, buf: &[u8]) {
        MemArea::write(self, address, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty() {
        assert!(MemArea::new("TOP.ram", 0, 4).is_none());
        assert!(MemArea::new("TOP.ram", 16, 0).is_none());
        assert_eq!(64, MemArea::new("TOP.ram", 16, 4).unwrap().len());
    }

    #[test]
    fn test_misaligned_read_write() {
        let mut area = MemArea::new("TOP.ram", 4, 4).unwrap();
        area.write(3, &[0xAA, 0xBB, 0xCC]);
        let mut buf = [0u8; 4];
        area.read(&mut buf, 2);
        assert_eq!([0x00, 0xAA, 0xBB, 0xCC], buf);
    }

    #[test]
    fn test_access_past_end_is_truncated() {
        let mut area = MemArea::new("TOP.ram", 2, 4).unwrap();
        area.write(6, &[1, 2, 3, 4]);
        assert_eq!(&[0, 0, 0, 0, 0, 0, 1, 2], area.as_bytes());

        let mut buf = [0xFFu8; 4];
        area.read(&mut buf, 6);
        assert_eq!([1, 2, 0xFF, 0xFF], buf);

        area.write(100, &[9]);
        area.reset();
        assert!(area.as_bytes().iter().all(|&b| b == 0));
    }
}
