//! Named memory regions exposed to the simulated design.
//!
//! The [`MemoryRegistry`] owns the backing store of every region for the lifetime of a harness.
//! Regions are identified by a unique name and occupy disjoint ranges of the physical address
//! space. Registration is append-only.

use crate::address_map::{AddressMap, AddressMapError};
use crate::resources::mem_area::MemArea;
use crate::AddressRange;
use goblin::elf::program_header::PT_LOAD;
use log::{debug, trace};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// A named memory area placed at a base address.
#[derive(Debug)]
pub struct MemoryRegion {
    name: String,
    range: AddressRange,
    area: MemArea,
}

impl MemoryRegion {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_address(&self) -> u32 {
        self.range.start()
    }

    pub fn range(&self) -> AddressRange {
        self.range
    }

    pub fn size_words(&self) -> usize {
        self.area.size_words()
    }

    pub fn word_size(&self) -> usize {
        self.area.word_size()
    }

    pub fn area(&self) -> &MemArea {
        &self.area
    }

    pub fn area_mut(&mut self) -> &mut MemArea {
        &mut self.area
    }

    /// Write `data` at absolute `address`, which must fall entirely within this region.
    fn load_at(&mut self, address: u32, data: &[u8]) -> Result<(), MemInitError> {
        if !self.range.contains_access(address, data.len()) {
            return Err(MemInitError::OutOfBounds {
                region: self.name.clone(),
                address,
                len: data.len(),
            });
        }
        self.area.write(address - self.range.start(), data);
        Ok(())
    }
}

/// Registry of all memory regions reachable by the simulated core's memory interface.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    regions: Vec<MemoryRegion>,
    /// Maps every region's address range to its index in `regions`.
    map: AddressMap<usize>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `area` under `name` at `base_address`.
    ///
    /// Fails if `name` is already registered, or if the new region would overlap a registered one.
    pub fn try_register(
        &mut self,
        name: &str,
        base_address: u32,
        area: MemArea,
    ) -> Result<(), RegistryError> {
        if self.region(name).is_some() {
            return Err(RegistryError::DuplicateName(name.to_owned()));
        }

        let range = area
            .range_at(base_address)
            .ok_or_else(|| RegistryError::Unaddressable {
                name: name.to_owned(),
                base_address,
                size: area.len(),
            })?;

        self.map
            .insert(range, self.regions.len())
            .map_err(|AddressMapError::OverlappingAddressRanges { existing, .. }| {
                RegistryError::Overlap {
                    name: name.to_owned(),
                    range,
                    existing: self
                        .map
                        .value(existing.start())
                        .map(|&i| self.regions[i].name.clone())
                        .unwrap_or_default(),
                    existing_range: existing,
                }
            })?;

        debug!(
            "Registered memory region {name:?} ({}) @ {range}, {} words of {} bytes",
            area.location(),
            area.size_words(),
            area.word_size()
        );
        self.regions.push(MemoryRegion {
            name: name.to_owned(),
            range,
            area,
        });
        Ok(())
    }

    /// Register `area` under `name` at `base_address`.
    ///
    /// # Panics
    ///
    /// Panics if the name is already taken or the region overlaps a registered one. Both indicate
    /// that the memory map the design was built with is inconsistent.
    pub fn register(&mut self, name: &str, base_address: u32, area: MemArea) {
        if let Err(err) = self.try_register(name, base_address, area) {
            panic!("invalid memory region registration: {err}");
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn region(&self, name: &str) -> Option<&MemoryRegion> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn region_mut(&mut self, name: &str) -> Option<&mut MemoryRegion> {
        self.regions.iter_mut().find(|r| r.name == name)
    }

    /// Returns the region that contains `address`.
    pub fn region_at(&self, address: u32) -> Option<&MemoryRegion> {
        self.map.value(address).map(|&i| &self.regions[i])
    }

    /// Returns the first registered region that overlaps `range`.
    pub fn find_overlap(&self, range: AddressRange) -> Option<&MemoryRegion> {
        self.map.find_overlap(range).map(|(_, &i)| &self.regions[i])
    }

    /// Iterate over all regions in order of increasing base address.
    pub fn iter(&self) -> impl Iterator<Item = &MemoryRegion> {
        self.map.iter().map(|(_, &i)| &self.regions[i])
    }

    /// Bus read at absolute `address`.
    ///
    /// Returns `false`, leaving `buf` untouched, if the access does not fall entirely within a
    /// single region.
    pub fn read(&self, buf: &mut [u8], address: u32) -> bool {
        match self.map.range_value(address) {
            Some((range, &i)) if range.contains_access(address, buf.len()) => {
                self.regions[i].area.read(buf, address - range.start());
                trace!("Memory read {:#010x} ({} bytes)", address, buf.len());
                true
            }
            _ => false,
        }
    }

    /// Bus write at absolute `address`.
    ///
    /// Returns `false`, ignoring the write, if the access does not fall entirely within a single
    /// region.
    pub fn write(&mut self, address: u32, buf: &[u8]) -> bool {
        match self.map.range_value(address) {
            Some((range, &i)) if range.contains_access(address, buf.len()) => {
                self.regions[i].area.write(address - range.start(), buf);
                trace!("Memory write {:#010x} ({} bytes)", address, buf.len());
                true
            }
            _ => false,
        }
    }

    /// Initialise region `name` from an in-memory image. Returns the number of bytes written.
    pub fn load(
        &mut self,
        name: &str,
        image: &[u8],
        kind: MemImageKind,
    ) -> Result<usize, MemInitError> {
        let region = self
            .region_mut(name)
            .ok_or_else(|| MemInitError::UnknownRegion(name.to_owned()))?;

        let loaded = match kind {
            MemImageKind::Elf => load_elf(region, image)?,
            MemImageKind::Vmem => load_vmem(region, image)?,
            MemImageKind::Binary => {
                region.load_at(region.base_address(), image)?;
                image.len()
            }
        };

        debug!("Loaded {loaded} bytes into memory region {name:?} from {kind} image");
        Ok(loaded)
    }

    /// Initialise a region from a file, as requested on the command line.
    pub fn load_file(&mut self, init: &MemInit) -> Result<usize, MemInitError> {
        let image = fs::read(&init.path).map_err(|source| MemInitError::Io {
            path: init.path.clone(),
            source,
        })?;
        let kind = init
            .kind
            .unwrap_or_else(|| MemImageKind::detect(&init.path, &image));
        self.load(&init.region, &image, kind)
    }
}

fn load_elf(region: &mut MemoryRegion, image: &[u8]) -> Result<usize, MemInitError> {
    let elf = goblin::elf::Elf::parse(image)?;

    let segments = elf
        .program_headers
        .iter()
        .filter(|h| h.p_type == PT_LOAD && h.p_filesz > 0);

    let mut loaded = 0;
    for h in segments {
        let address = u32::try_from(h.p_paddr).map_err(|_| MemInitError::OutOfBounds {
            region: region.name.clone(),
            address: u32::MAX,
            len: h.p_filesz as usize,
        })?;
        let data = image
            .get(h.file_range())
            .ok_or(MemInitError::TruncatedElf)?;
        debug!(
            "Loading segment [{:#010x}..{:#010x}] into {:?}",
            address,
            u64::from(address) + h.p_filesz,
            region.name
        );
        region.load_at(address, data)?;
        loaded += data.len();
    }
    Ok(loaded)
}

fn load_vmem(region: &mut MemoryRegion, image: &[u8]) -> Result<usize, MemInitError> {
    let text = std::str::from_utf8(image).map_err(|_| MemInitError::Vmem {
        line: 0,
        message: "image is not valid UTF-8".to_owned(),
    })?;

    let word_size = region.word_size();
    let base = region.base_address();
    let mut word_address: u64 = 0;
    let mut loaded = 0;

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = line.split("//").next().unwrap_or_default();
        for token in line.split_whitespace() {
            let vmem_error = |message: String| MemInitError::Vmem {
                line: line_number,
                message,
            };
            if let Some(address) = token.strip_prefix('@') {
                word_address = u64::from_str_radix(address, 16)
                    .map_err(|e| vmem_error(format!("bad address {token:?}: {e}")))?;
                continue;
            }

            let value = u64::from_str_radix(token, 16)
                .map_err(|e| vmem_error(format!("bad data word {token:?}: {e}")))?;
            let bytes = value.to_le_bytes();
            let word = bytes
                .get(..word_size)
                .ok_or_else(|| vmem_error(format!("unsupported word size {word_size}")))?;

            let address = word_address
                .checked_mul(word_size as u64)
                .and_then(|offset| offset.checked_add(u64::from(base)))
                .and_then(|address| u32::try_from(address).ok())
                .ok_or_else(|| vmem_error(format!("word address {word_address:#x} overflows")))?;
            region.load_at(address, word)?;
            loaded += word_size;
            word_address += 1;
        }
    }
    Ok(loaded)
}

/// Format of a memory initialisation image.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MemImageKind {
    Elf,
    /// Verilog hex: whitespace-separated hex words with `@<word address>` directives.
    Vmem,
    /// Raw bytes, loaded at the start of the region.
    Binary,
}

impl MemImageKind {
    /// Guess the image format from the file extension, falling back to the ELF magic.
    pub fn detect(path: &Path, image: &[u8]) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
        {
            Some(kind) => kind,
            None if image.starts_with(b"\x7fELF") => Self::Elf,
            None => Self::Binary,
        }
    }
}

impl FromStr for MemImageKind {
    type Err = MemInitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "elf" => Ok(Self::Elf),
            "vmem" => Ok(Self::Vmem),
            "bin" => Ok(Self::Binary),
            _ => Err(MemInitError::UnknownKind(s.to_owned())),
        }
    }
}

impl fmt::Display for MemImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Elf => "elf",
            Self::Vmem => "vmem",
            Self::Binary => "bin",
        })
    }
}

/// A `NAME,FILE[,TYPE]` memory initialisation request.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MemInit {
    pub region: String,
    pub path: PathBuf,
    pub kind: Option<MemImageKind>,
}

impl FromStr for MemInit {
    type Err = MemInitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',');
        let (Some(region), Some(path)) = (parts.next(), parts.next()) else {
            return Err(MemInitError::Syntax(s.to_owned()));
        };
        if region.is_empty() || path.is_empty() {
            return Err(MemInitError::Syntax(s.to_owned()));
        }
        let kind = parts.next().map(str::parse).transpose()?;
        if parts.next().is_some() {
            return Err(MemInitError::Syntax(s.to_owned()));
        }
        Ok(Self {
            region: region.to_owned(),
            path: PathBuf::from(path),
            kind,
        })
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("memory region {0:?} is already registered")]
    DuplicateName(String),
    #[error("memory region {name:?} at {range} overlaps region {existing:?} at {existing_range}")]
    Overlap {
        name: String,
        range: AddressRange,
        existing: String,
        existing_range: AddressRange,
    },
    #[error("memory region {name:?} of {size} bytes at {base_address:#x} is not addressable")]
    Unaddressable {
        name: String,
        base_address: u32,
        size: usize,
    },
}

#[derive(Error, Debug)]
pub enum MemInitError {
    #[error("expected NAME,FILE[,TYPE] but got {0:?}")]
    Syntax(String),
    #[error("unknown memory image type {0:?} (expected elf, vmem or bin)")]
    UnknownKind(String),
    #[error("no memory region named {0:?}")]
    UnknownRegion(String),
    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid ELF image")]
    Elf(#[from] goblin::error::Error),
    #[error("ELF segment extends past the end of the file")]
    TruncatedElf,
    #[error("vmem line {line}: {message}")]
    Vmem { line: usize, message: String },
    #[error("{len} bytes at {address:#010x} do not fit in memory region {region:?}")]
    OutOfBounds {
        region: String,
        address: u32,
        len: usize,
    },
}
