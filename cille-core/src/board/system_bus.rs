use crate::address_map::AddressMap;
use crate::bus::{word_offset, Bus};
use crate::memory::MemoryRegistry;
use crate::resources::counter::Counter;
use crate::resources::multiplier::Multiplier;
use crate::resources::sim_ctrl::SimCtrlDevice;
use crate::resources::timer::Timer;
use crate::system_bus::AccessType;

/// Enum that uniquely identifies every device attached to a [`SystemBus`] (as a slave).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(super) enum Resource {
    SimCtrl,
    Timer,
    Counter,
    Multiplier,
}

impl Resource {
    pub fn name(self) -> &'static str {
        match self {
            Resource::SimCtrl => "sim_ctrl",
            Resource::Timer => "timer",
            Resource::Counter => "counter",
            Resource::Multiplier => "multiplier",
        }
    }
}

/// Slave interface an accepted access is forwarded to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Target {
    /// A device, addressed by the offset into its window.
    Device(Resource, u32),
    /// A region of the memory registry, addressed by absolute address.
    Memory,
}

/// Memory-mapped devices of the SoC.
#[derive(Debug)]
pub(super) struct Devices {
    pub device_map: AddressMap<Resource>,
    pub sim_ctrl: SimCtrlDevice,
    pub timer: Timer,
    pub counter: Counter,
    pub multiplier: Multiplier,
}

/// Abstraction of the SoC's main bus connecting the devices and the memory regions to the core.
///
/// Accesses are always in the form of `(address, size)` pairs. The access request is forwarded to
/// the *slave* interface that `address` maps to, if and only if the entire address range
/// `address..(address+size)` is contained within the window that `address` is in. Device windows
/// only decode naturally aligned word accesses. Anything else is not accepted: reads return zero
/// and writes do nothing.
#[derive(Debug)]
pub(super) struct SystemBus<'a> {
    pub devices: &'a mut Devices,
    pub memory: &'a mut MemoryRegistry,
}

impl SystemBus<'_> {
    /// Validates the `(address, size)` pair, returning the [`Target`] of the access if it is
    /// accepted, and `None` otherwise.
    fn check_access(&self, address: u32, size: usize) -> Option<Target> {
        if let Some((range, &resource)) = self.devices.device_map.range_value(address) {
            if !range.contains_access(address, size) {
                return None;
            }
            return word_offset(address - range.start(), size)
                .map(|offset| Target::Device(resource, offset));
        }

        self.memory
            .region_at(address)
            .filter(|region| region.range().contains_access(address, size))
            .map(|_| Target::Memory)
    }

    fn bus_of(&mut self, resource: Resource) -> &mut dyn Bus {
        match resource {
            Resource::SimCtrl => &mut self.devices.sim_ctrl,
            Resource::Timer => &mut self.devices.timer,
            Resource::Counter => &mut self.devices.counter,
            Resource::Multiplier => &mut self.devices.multiplier,
        }
    }
}

impl crate::system_bus::SystemBus for SystemBus<'_> {
    fn accepts(&self, address: u32, size: usize, _access_type: AccessType) -> bool {
        self.check_access(address, size).is_some()
    }
}

impl Bus for SystemBus<'_> {
    fn read(&mut self, buf: &mut [u8], address: u32) {
        // If no region is being accessed, or the access is not valid, nothing happens.
        match self.check_access(address, buf.len()) {
            Some(Target::Memory) => {
                self.memory.read(buf, address);
            }
            Some(Target::Device(resource, offset)) => self.bus_of(resource).read(buf, offset),
            None => {}
        }
    }

    fn write(&mut self, address: u32, buf: &[u8]) {
        // If no region is being accessed, or the access is not valid, nothing happens.
        match self.check_access(address, buf.len()) {
            Some(Target::Memory) => {
                self.memory.write(address, buf);
            }
            Some(Target::Device(resource, offset)) => self.bus_of(resource).write(offset, buf),
            None => {}
        }
    }
}
