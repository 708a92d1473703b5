//! Implementation of ATR disk image parsing.
use std::ops::Range;
use std::path::Path;

use anyhow::bail;
use anyhow::ensure;
use anyhow::Context;
use anyhow::Result;
use packed_struct::prelude::*;

pub const ATR_MAGIC: u16 = 0x0296;
pub const ATR_HEADER_SIZE: usize = 16;

/// Sectors 1-3 are always single density, the boot loader reads them before it knows better.
const BOOT_SECTORS: usize = 3;
const BOOT_SECTOR_SIZE: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiskImage {
    pub header: AtrHeader,
    data: Vec<u8>,
}

impl DiskImage {
    pub fn with_atr_data(data: &[u8]) -> Result<DiskImage> {
        let header = AtrHeader::parse_header(data)?;
        Ok(DiskImage {
            header,
            data: data.to_vec(),
        })
    }

    pub fn with_atr_file(path: &Path) -> Result<DiskImage> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read disk image {}", path.display()))?;
        Self::with_atr_data(&data)
    }

    /// The raw image including the header.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Byte range of `sector` within the image, or None if the sector does not exist.
    pub fn sector_range(&self, sector: u16) -> Option<Range<usize>> {
        let sector = sector as usize;
        if sector == 0 {
            return None;
        }
        let (offset, size) = if sector <= BOOT_SECTORS {
            ((sector - 1) * BOOT_SECTOR_SIZE, BOOT_SECTOR_SIZE)
        } else {
            let size = self.header.sector_size;
            (
                BOOT_SECTORS * BOOT_SECTOR_SIZE + (sector - BOOT_SECTORS - 1) * size,
                size,
            )
        };
        let start = ATR_HEADER_SIZE + offset;
        (start + size <= self.data.len()).then_some(start..start + size)
    }

    pub fn read_sector(&self, sector: u16) -> Option<&[u8]> {
        self.sector_range(sector).map(|range| &self.data[range])
    }

    /// Overwrites a sector. Returns false if the sector does not exist or `data` does not match
    /// its size.
    pub fn write_sector(&mut self, sector: u16, data: &[u8]) -> bool {
        match self.sector_range(sector) {
            Some(range) if range.len() == data.len() => {
                self.data[range].copy_from_slice(data);
                true
            }
            _ => false,
        }
    }

    /// Zeroes everything after the header.
    pub fn format(&mut self) {
        self.data[ATR_HEADER_SIZE..].fill(0);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtrHeader {
    /// 128 or 256. Images declaring anything else are treated as single density.
    pub sector_size: usize,
    /// Image size excluding the header, in 16 byte paragraphs.
    pub paragraphs: u32,
    pub flags: u8,
}

impl AtrHeader {
    fn parse_header(data: &[u8]) -> Result<Self> {
        ensure!(
            data.len() >= ATR_HEADER_SIZE,
            "Disk image too short: {} bytes",
            data.len()
        );
        let raw = RawAtrHeader::unpack_from_slice(&data[0..ATR_HEADER_SIZE])
            .with_context(|| "Failed to unpack ATR header")?;
        if raw.magic != ATR_MAGIC {
            bail!("Not an ATR image: magic {:04X}", raw.magic)
        }
        Ok(AtrHeader {
            sector_size: match raw.sector_size {
                256 => 256,
                _ => 128,
            },
            paragraphs: raw.paragraphs_low as u32 | (raw.paragraphs_high as u32) << 16,
            flags: raw.flags,
        })
    }
}

#[derive(PackedStruct, Clone, Debug, Default, PartialEq, Eq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb")]
struct RawAtrHeader {
    magic: u16,
    paragraphs_low: u16,
    sector_size: u16,
    paragraphs_high: u8,
    reserved: [u8; 8],
    flags: u8,
}
