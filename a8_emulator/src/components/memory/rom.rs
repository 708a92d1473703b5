//! Loading of the OS and BASIC ROM images.
use anyhow::ensure;
use anyhow::Result;

use crate::common::constants::BASIC_ROM_SIZE;
use crate::common::constants::OS_ROM_SIZE;

/// The three segments of the 16KB XL OS ROM and where they are mapped.
pub const OS_SEGMENT_START: u16 = 0xC000;
pub const SELF_TEST_SEGMENT_START: u16 = 0x5000;
pub const FLOATING_POINT_SEGMENT_START: u16 = 0xD800;
pub const BASIC_START: u16 = 0xA000;

#[derive(Default, Clone)]
pub struct RomImages {
    pub os: Option<Vec<u8>>,
    pub self_test: Option<Vec<u8>>,
    pub floating_point: Option<Vec<u8>>,
    pub basic: Option<Vec<u8>>,
}

impl RomImages {
    /// Splits a 16KB OS ROM image into its segments:
    ///
    /// - $0000-$0FFF: OS, mapped to $C000-$CFFF
    /// - $1000-$17FF: self test, mapped to $5000-$57FF
    /// - $1800-$3FFF: floating point package, mapped to $D800-$FFFF
    pub fn set_os_rom(&mut self, data: &[u8]) -> Result<()> {
        ensure!(
            data.len() == OS_ROM_SIZE,
            "OS ROM must be 16KB (0x4000), got {} bytes",
            data.len()
        );
        self.os = Some(data[0x0000..0x1000].to_vec());
        self.self_test = Some(data[0x1000..0x1800].to_vec());
        self.floating_point = Some(data[0x1800..0x4000].to_vec());
        Ok(())
    }

    pub fn set_basic_rom(&mut self, data: &[u8]) -> Result<()> {
        ensure!(
            data.len() == BASIC_ROM_SIZE,
            "BASIC ROM must be 8KB (0x2000), got {} bytes",
            data.len()
        );
        self.basic = Some(data.to_vec());
        Ok(())
    }

    pub fn has_os_rom(&self) -> bool {
        self.os.is_some()
    }

    pub fn has_basic_rom(&self) -> bool {
        self.basic.is_some()
    }
}
