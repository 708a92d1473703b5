//! Tests of the host facing machine API, driven by small programs in a synthetic OS ROM.
mod util;

use std::io::Write;

use a8_emulator::common::address::AddressU16;
use a8_emulator::common::bus::Bus;
use a8_emulator::components::cpu::CpuEvent;
use a8_emulator::components::sio::checksum;
use a8_emulator::config::MachineConfig;
use a8_emulator::input::KeySymbol;
use a8_emulator::input::Modifiers;
use a8_emulator::System;
use pretty_assertions::assert_eq;
use util::basic_rom;
use util::boot;
use util::OsRom;

/// Stores $42 at $0600, sets the background to $94 and spins.
#[rustfmt::skip]
const STORE_AND_SPIN: &[u8] = &[
    0xA9, 0x42, 0x8D, 0x00, 0x06, // LDA #$42; STA $0600
    0xA9, 0x94, 0x8D, 0x1A, 0xD0, // LDA #$94; STA COLBK
    0x4C, 0x0A, 0xC0,             // JMP *
];

fn ram(system: &System, addr: u16) -> u8 {
    system.machine().memory.read(addr)
}

fn single_sector_atr() -> Vec<u8> {
    let mut image = vec![0x96, 0x02, 0x08, 0x00, 0x80, 0x00];
    image.resize(16, 0);
    image.resize(16 + 128, 0x01);
    image
}

#[test]
fn test_requires_both_roms() {
    let mut system = System::new(MachineConfig::default());
    assert!(!system.is_ready());
    assert!(!system.start());
    assert!(!system.key_down(KeySymbol::A, Modifiers::default(), None, false));

    let rom = OsRom::with_program(0xC000, STORE_AND_SPIN);
    system.load_os_rom(&rom.0).unwrap();
    assert!(system.has_os_rom());
    assert!(!system.start());
    assert!(!system.is_running());

    system.load_basic_rom(&basic_rom()).unwrap();
    assert!(system.is_ready());
    assert!(system.start());
    assert!(system.is_running());
    assert_eq!(system.cpu_registers().pc, 0xC000);
}

#[test]
fn test_rejects_bad_rom_files() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[0; 100]).unwrap();
    let mut system = System::default();
    let error = system.load_os_rom_file(file.path()).unwrap_err();
    assert!(format!("{:#}", error).contains("16KB"), "{:#}", error);
    assert!(!system.has_os_rom());
    assert!(system.load_basic_rom(&[0; 0x1000]).is_err());
    assert!(system.load_disk(&[0x12, 0x34]).is_err());
    assert!(!system.has_disk());
}

#[test]
fn test_load_disk_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&single_sector_atr()).unwrap();
    let mut system = System::default();
    system.load_disk_file(file.path()).unwrap();
    assert!(system.has_disk());
}

#[test]
fn test_program_output() {
    let mut system = boot(&OsRom::with_program(0xC000, STORE_AND_SPIN));
    system.execute_frames(1);
    assert_eq!(ram(&system, 0x0600), 0x42);
    assert_eq!(system.cpu_registers().pc, 0xC00A);
    // Playfield DMA is off, so every visible line is background.
    assert!(system.framebuffer().line(100).iter().all(|&pixel| pixel == 0x94));
    assert_eq!(system.framebuffer().rgb(200, 100), system.palette()[0x94]);
    assert_eq!(system.framebuffer().visible_rgba().len(), 336 * 240 * 4);
}

#[test]
fn test_vbi_handler_runs_every_frame() {
    #[rustfmt::skip]
    let mut rom = OsRom::with_program(0xC000, &[
        0xA9, 0x40, 0x8D, 0x0E, 0xD4, // NMIEN = VBI
        0x4C, 0x05, 0xC0,             // JMP *
    ]);
    rom.put(0xC010, &[0xEE, 0x01, 0x06, 0x40]); // INC $0601; RTI
    rom.put(0xFFFA, &[0x10, 0xC0]);
    let mut system = boot(&rom);
    system.execute_frames(3);
    assert_eq!(ram(&system, 0x0601), 3);
}

#[test]
fn test_keyboard_irq_handler() {
    #[rustfmt::skip]
    let mut rom = OsRom::with_program(0xC000, &[
        0xA9, 0x40, 0x8D, 0x0E, 0xD2, // IRQEN = keyboard
        0x58,                         // CLI
        0x4C, 0x06, 0xC0,             // JMP *
    ]);
    #[rustfmt::skip]
    let handler = [
        0x48,                         // PHA
        0xAD, 0x09, 0xD2,             // LDA KBCODE
        0x8D, 0x02, 0x06,             // STA $0602
        0xA9, 0x00, 0x8D, 0x0E, 0xD2, // IRQEN = 0
        0xA9, 0x40, 0x8D, 0x0E, 0xD2, // IRQEN = keyboard
        0x68,                         // PLA
        0x40,                         // RTI
    ];
    rom.put(0xC020, &handler);
    rom.put(0xFFFE, &[0x20, 0xC0]);
    let mut system = boot(&rom);
    system.execute_frames(1);

    assert!(system.key_down(KeySymbol::A, Modifiers::default(), None, false));
    system.run_cycles(1000);
    assert_eq!(ram(&system, 0x0602), 0x3F);
    assert!(system.key_up(KeySymbol::A, None));

    let shift = Modifiers {
        shift: true,
        ..Modifiers::default()
    };
    assert!(system.key_down(KeySymbol::A, shift, None, false));
    system.run_cycles(1000);
    assert_eq!(ram(&system, 0x0602), 0x7F);
    system.release_all_keys();

    assert!(!system.key_down(KeySymbol::Backquote, Modifiers::default(), None, false));
}

#[test]
fn test_reset_key_restarts_cpu() {
    let mut system = boot(&OsRom::with_program(0xC000, STORE_AND_SPIN));
    system.execute_frames(1);
    assert_eq!(system.cpu_registers().pc, 0xC00A);
    assert!(system.key_down(KeySymbol::Reset, Modifiers::default(), None, false));
    assert_eq!(system.cpu_registers().pc, 0xC000);
    assert!(system.is_running());
}

#[test]
fn test_option_held_at_boot() {
    #[rustfmt::skip]
    let code = [
        0xAD, 0x1F, 0xD0, // LDA CONSOL
        0x8D, 0x03, 0x06, // STA $0603
        0x4C, 0xA0, 0xC4, // JMP *
    ];
    let rom = OsRom::with_program(0xC49A, &code);

    let mut system = boot(&rom);
    system.run_cycles(100);
    assert_eq!(ram(&system, 0x0603), 0x07);

    system.set_option_on_start(true);
    system.hard_reset();
    system.run_cycles(100);
    assert_eq!(ram(&system, 0x0603), 0x03);
}

#[test]
fn test_frame_cycles() {
    let mut system = boot(&OsRom::with_program(0xC000, STORE_AND_SPIN));
    assert_eq!(system.frame_cycles(0.02), 35468);
    // Long host stalls are not caught up.
    assert_eq!(system.frame_cycles(1.0), 177344);
    assert_eq!(system.frame_cycles(0.0), 1);

    system.set_turbo(true);
    assert_eq!(system.frame_cycles(0.02), 141875);
    system.set_turbo(false);

    system.load_disk(&single_sector_atr()).unwrap();
    let mut frame = vec![0x31, 0x53, 0x00, 0x00];
    frame.push(checksum(&frame));
    for byte in frame {
        system.cpu.bus.write_u8(AddressU16(0xD20D), byte);
    }
    assert!(system.is_sio_active());
    assert_eq!(system.frame_cycles(0.02), 141875);
    system.set_sio_turbo(false);
    assert_eq!(system.frame_cycles(0.02), 35468);
}

#[test]
fn test_pause_and_resume() {
    let mut system = System::new(MachineConfig::default());
    system
        .load_os_rom(&OsRom::with_program(0xC000, STORE_AND_SPIN).0)
        .unwrap();
    system.load_basic_rom(&basic_rom()).unwrap();
    assert_eq!(system.execute_for_duration(0.02), 0);

    assert!(system.start());
    let cycle = system.execute_for_duration(0.02);
    assert!(cycle >= 35468, "{}", cycle);
    assert!(system.audio_samples_available() > 0);

    system.pause();
    assert!(!system.is_running());
    assert_eq!(system.audio_samples_available(), 0);
    assert_eq!(system.execute_for_duration(0.02), cycle);

    // Resuming continues where the machine stopped.
    assert!(system.start());
    assert_eq!(system.cycle(), cycle);
    assert_eq!(ram(&system, 0x0600), 0x42);
}

#[test]
fn test_hard_reset_keeps_ram() {
    let mut system = boot(&OsRom::with_program(0xC000, STORE_AND_SPIN));
    system.execute_frames(1);
    system.cpu.bus.write_u8(AddressU16(0x0700), 0x55);

    system.hard_reset();
    assert_eq!(system.cycle(), 7);
    assert_eq!(system.cpu_registers().pc, 0xC000);
    assert_eq!(ram(&system, 0x0700), 0x55);
    assert_eq!(system.machine().antic.current_line(), 0);
}

#[test]
fn test_save_and_load_state() {
    let mut system = boot(&OsRom::with_program(0xC000, STORE_AND_SPIN));
    system.execute_frames(1);
    let saved = system.save_state();
    let cycle = system.cycle();
    let registers = system.cpu_registers();

    system.cpu.bus.write_u8(AddressU16(0x0600), 0x00);
    system.execute_frames(1);
    assert_eq!(ram(&system, 0x0600), 0x00);

    system.load_state(&saved).unwrap();
    assert_eq!(system.cycle(), cycle);
    assert_eq!(system.cpu_registers(), registers);
    assert_eq!(ram(&system, 0x0600), 0x42);

    // A truncated snapshot leaves the machine as it was.
    assert!(system.load_state(&saved[..saved.len() / 2]).is_err());
    assert_eq!(system.cycle(), cycle);
}

#[test]
fn test_debug_events() {
    let mut system = boot(&OsRom::with_program(0xC000, STORE_AND_SPIN));
    system.execute_frames(1);
    assert!(system.take_debug_events().is_empty());

    system.enable_debug_events();
    system.run_cycles(100);
    let events = system.take_debug_events();
    assert!(!events.is_empty());
    for event in events {
        match event {
            CpuEvent::Step(state) => assert_eq!(state.instruction.address, AddressU16(0xC00A)),
            CpuEvent::Interrupt(vector) => panic!("Unexpected interrupt {:?}", vector),
        }
    }
    assert!(system.take_debug_events().is_empty());
}
