//! Helpers for booting a machine from a synthetic OS ROM.
use a8_emulator::common::constants::BASIC_ROM_SIZE;
use a8_emulator::common::constants::OS_ROM_SIZE;
use a8_emulator::common::logging;
use a8_emulator::config::MachineConfig;
use a8_emulator::System;

/// 16KB OS ROM image, addressed the way the CPU sees it in $C000-$FFFF.
pub struct OsRom(pub Vec<u8>);

impl OsRom {
    pub fn new() -> Self {
        let mut rom = Self(vec![0; OS_ROM_SIZE]);
        // NMI and IRQ default to a lone RTI.
        rom.put(0xCFF0, &[0x40]);
        rom.put(0xFFFA, &[0xF0, 0xCF]);
        rom.put(0xFFFE, &[0xF0, 0xCF]);
        rom
    }

    /// Places `code` at `addr` and points the reset vector at it.
    pub fn with_program(addr: u16, code: &[u8]) -> Self {
        let mut rom = Self::new();
        rom.put(addr, code);
        rom.put(0xFFFC, &addr.to_le_bytes());
        rom
    }

    pub fn put(&mut self, addr: u16, bytes: &[u8]) -> &mut Self {
        let offset = (addr - 0xC000) as usize;
        self.0[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }
}

pub fn basic_rom() -> Vec<u8> {
    vec![0; BASIC_ROM_SIZE]
}

/// A started machine without audio.
pub fn boot(rom: &OsRom) -> System {
    logging::test_init(false);
    let mut system = System::new(MachineConfig {
        audio_enabled: false,
        ..MachineConfig::default()
    });
    system.load_os_rom(&rom.0).unwrap();
    system.load_basic_rom(&basic_rom()).unwrap();
    assert!(system.start());
    system
}
