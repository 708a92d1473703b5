//! The 64KB address space and the PORTB controlled bank switching of the XL memory map.
//!
//! Two parallel arrays are kept: `ram` is what the CPU sees, `shadow` holds the RAM contents
//! hidden underneath a ROM while that ROM is banked in. Each address is tagged with a
//! [MemoryKind] that is resolved with a single match on every access.
mod rom;

use std::ops::Range;

use anyhow::ensure;
use anyhow::Result;
use bitcode::Decode;
use bitcode::Encode;
use intbits::Bits;
use log::debug;
use strum::IntoEnumIterator;

pub use self::rom::RomImages;
use crate::common::constants::IO_END;
use crate::common::constants::IO_START;

const ADDRESS_SPACE_SIZE: usize = 0x10000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub enum MemoryKind {
    Ram,
    /// Reads return the mapped ROM, writes are ignored.
    Rom,
    /// Hardware registers, dispatched by the machine.
    Device,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumIter)]
enum BankedRegion {
    Os,
    FloatingPoint,
    Basic,
    SelfTest,
}

impl BankedRegion {
    fn range(self) -> Range<usize> {
        match self {
            Self::Os => 0xC000..0xD000,
            Self::FloatingPoint => 0xD800..0x10000,
            Self::Basic => 0xA000..0xC000,
            Self::SelfTest => 0x5000..0x5800,
        }
    }

    /// Whether PORTB maps the ROM into this region. OS and BASIC/self-test bits have
    /// opposite polarity.
    fn rom_enabled(self, portb: u8) -> bool {
        match self {
            Self::Os | Self::FloatingPoint => portb.bit(0),
            Self::Basic => !portb.bit(1),
            Self::SelfTest => !portb.bit(7),
        }
    }

    fn image(self, roms: &RomImages) -> Option<&[u8]> {
        match self {
            Self::Os => roms.os.as_deref(),
            Self::FloatingPoint => roms.floating_point.as_deref(),
            Self::Basic => roms.basic.as_deref(),
            Self::SelfTest => roms.self_test.as_deref(),
        }
    }
}

#[derive(Clone, Encode, Decode)]
pub struct MemoryState {
    ram: Vec<u8>,
    shadow: Vec<u8>,
    kinds: Vec<MemoryKind>,
    portb: u8,
}

impl Default for MemoryState {
    fn default() -> Self {
        let mut kinds = vec![MemoryKind::Ram; ADDRESS_SPACE_SIZE];
        kinds[IO_START as usize..=IO_END as usize].fill(MemoryKind::Device);
        Self {
            ram: vec![0; ADDRESS_SPACE_SIZE],
            shadow: vec![0; ADDRESS_SPACE_SIZE],
            kinds,
            portb: 0xFF,
        }
    }
}

#[cfg(test)]
impl MemoryState {
    pub(crate) fn truncate_ram(&mut self, len: usize) {
        self.ram.truncate(len);
    }
}

#[derive(Default)]
pub struct Memory {
    state: MemoryState,
    roms: RomImages,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roms(&self) -> &RomImages {
        &self.roms
    }

    /// Validates and stores a 16KB OS ROM, then maps it according to the current PORTB value.
    pub fn load_os_rom(&mut self, data: &[u8]) -> Result<()> {
        self.roms.set_os_rom(data)?;
        debug!("Loaded OS ROM");
        self.install(self.state.portb);
        Ok(())
    }

    pub fn load_basic_rom(&mut self, data: &[u8]) -> Result<()> {
        self.roms.set_basic_rom(data)?;
        debug!("Loaded BASIC ROM");
        self.install(self.state.portb);
        Ok(())
    }

    #[inline]
    pub fn kind(&self, addr: u16) -> MemoryKind {
        self.state.kinds[addr as usize]
    }

    /// Reads RAM or ROM. Device addresses are not handled here.
    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.state.ram[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, value: u8) {
        if self.kind(addr) == MemoryKind::Ram {
            self.state.ram[addr as usize] = value;
        }
    }

    /// The CPU visible address space, as seen by ANTIC and GTIA DMA.
    pub fn ram(&self) -> &[u8] {
        &self.state.ram
    }

    /// Copies `data` into RAM starting at `addr`, bypassing the memory map.
    pub fn load_ram(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        let end = (start + data.len()).min(self.state.ram.len());
        self.state.ram[start..end].copy_from_slice(&data[..end - start]);
    }

    pub fn portb(&self) -> u8 {
        self.state.portb
    }

    /// Rebuilds the memory map for the given PORTB value. ROM regions are refreshed from the
    /// images, which allows loading a ROM while it is already mapped.
    pub fn install(&mut self, portb: u8) {
        for region in BankedRegion::iter() {
            if region.rom_enabled(portb) {
                self.map_rom(region);
            } else {
                self.map_ram(region);
            }
        }
        self.state.portb = portb;
    }

    /// Handles a PORTB write. Only regions whose mapping changes are touched. Returns the
    /// effective port value.
    pub fn set_portb(&mut self, value: u8) -> u8 {
        let old = self.state.portb;
        let new = (value & 0x83) | 0x7C;
        for region in BankedRegion::iter() {
            let enabled = region.rom_enabled(new);
            if enabled == region.rom_enabled(old) {
                continue;
            }
            debug!(
                "PORTB {:02X}: {} {}",
                new,
                region,
                if enabled { "ROM" } else { "RAM" }
            );
            if enabled {
                self.map_rom(region);
            } else {
                self.map_ram(region);
            }
        }
        self.state.portb = new;
        new
    }

    /// Maps the ROM image over `region`, saving the outgoing RAM contents to the shadow array.
    fn map_rom(&mut self, region: BankedRegion) {
        let range = region.range();
        if self.state.kinds[range.start] == MemoryKind::Ram {
            self.state.shadow[range.clone()].copy_from_slice(&self.state.ram[range.clone()]);
        }
        self.state.kinds[range.clone()].fill(MemoryKind::Rom);
        if let Some(image) = region.image(&self.roms) {
            self.state.ram[range].copy_from_slice(image);
        }
    }

    /// Restores the RAM hidden underneath `region`.
    fn map_ram(&mut self, region: BankedRegion) {
        let range = region.range();
        if self.state.kinds[range.start] == MemoryKind::Ram {
            return;
        }
        self.state.ram[range.clone()].copy_from_slice(&self.state.shadow[range.clone()]);
        self.state.kinds[range].fill(MemoryKind::Ram);
    }

    pub fn save_state(&self) -> MemoryState {
        self.state.clone()
    }

    /// Restores a snapshot. Snapshots that do not cover the whole address space are rejected.
    pub fn load_state(&mut self, state: MemoryState) -> Result<()> {
        let MemoryState {
            ram, shadow, kinds, ..
        } = &state;
        ensure!(
            ram.len() == ADDRESS_SPACE_SIZE
                && shadow.len() == ADDRESS_SPACE_SIZE
                && kinds.len() == ADDRESS_SPACE_SIZE,
            "Memory snapshot covers {}/{}/{} bytes instead of 64KB",
            ram.len(),
            shadow.len(),
            kinds.len()
        );
        self.state = state;
        Ok(())
    }
}
