use pretty_assertions::assert_eq;

use super::MachineState;
use crate::common::address::AddressU16;
use crate::common::bus::Bus;
use crate::common::constants::gtia;
use crate::common::constants::CYCLES_PER_LINE;
use crate::common::constants::OS_ROM_SIZE;
use crate::common::scheduler::Cycle;
use crate::common::scheduler::TimedEvent;
use crate::components::cpu::MainBus;
use crate::components::sio::checksum;
use crate::components::sio::DiskImage;

fn read(machine: &mut MachineState, addr: u16) -> u8 {
    machine.read_u8(AddressU16(addr))
}

fn write(machine: &mut MachineState, addr: u16, value: u8) {
    machine.write_u8(AddressU16(addr), value)
}

/// Advances time event by event, the way the CPU does while it is stalled.
fn run_until(machine: &mut MachineState, target: Cycle) {
    while machine.cycle() < target {
        let next = machine.next_event_cycle().unwrap_or(target).min(target);
        machine.advance(next.max(machine.cycle() + 1) - machine.cycle());
        if matches!(machine.next_event_cycle(), Some(next) if next <= machine.cycle()) {
            machine.service_events();
        }
    }
}

#[test]
fn test_register_mirroring() {
    let mut machine = MachineState::new();
    write(&mut machine, 0xD01A + 0x20, 0x94);
    assert_eq!(machine.gtia.registers()[gtia::COLBK as usize], 0x94);

    write(&mut machine, 0xD40E + 0x10, 0x40);
    write(&mut machine, 0xD40F, 0);
    assert_eq!(read(&mut machine, 0xD41F), 0x00);

    // Unassigned pages
    assert_eq!(read(&mut machine, 0xD100), 0xFF);
    write(&mut machine, 0xD500, 0x12);
    assert_eq!(read(&mut machine, 0xD500), 0xFF);
    assert_eq!(machine.peek_u8(AddressU16(0xD600)), Some(0xFF));
}

#[test]
fn test_portb_bank_switching() {
    let mut machine = MachineState::new();
    machine.memory.load_os_rom(&vec![0xAA; OS_ROM_SIZE]).unwrap();
    assert_eq!(read(&mut machine, 0xC000), 0xAA);
    write(&mut machine, 0xC000, 0x11);
    assert_eq!(read(&mut machine, 0xC000), 0xAA);

    // PBCTL selects the port, then PORTB bit 0 switches the OS ROM out.
    write(&mut machine, 0xD303, 0x3C);
    write(&mut machine, 0xD301, 0xFE);
    assert_eq!(read(&mut machine, 0xD301), 0xFE);
    assert_eq!(read(&mut machine, 0xC000), 0x00);
    write(&mut machine, 0xC000, 0x11);
    assert_eq!(read(&mut machine, 0xC000), 0x11);

    // Hard reset maps the OS back in but keeps the RAM underneath.
    machine.reset();
    assert_eq!(read(&mut machine, 0xC000), 0xAA);
    write(&mut machine, 0xD303, 0x3C);
    write(&mut machine, 0xD301, 0xFE);
    assert_eq!(read(&mut machine, 0xC000), 0x11);
}

#[test]
fn test_wsync_stalls_to_next_line() {
    let mut machine = MachineState::new();
    machine.advance(50);
    write(&mut machine, 0xD40A, 0);
    assert_eq!(machine.stall_until(), CYCLES_PER_LINE);
}

#[test]
fn test_line_events() {
    let mut machine = MachineState::new();
    run_until(&mut machine, CYCLES_PER_LINE);
    assert_eq!(machine.antic.current_line(), 1);
    assert_eq!(
        machine.scheduler.get(TimedEvent::DisplayListFetch),
        Some(2 * CYCLES_PER_LINE)
    );
    // Refresh and display list DMA
    assert_eq!(machine.stall_until(), CYCLES_PER_LINE + 9);

    run_until(&mut machine, CYCLES_PER_LINE + 16);
    assert_eq!(
        machine.scheduler.get(TimedEvent::DrawLine),
        Some(2 * CYCLES_PER_LINE + 16)
    );
}

#[test]
fn test_dli_timed_from_service_cycle() {
    let mut machine = MachineState::new();
    // DLI on an 8 line blank instruction
    write(&mut machine, 0x2000, 0xF0);
    write(&mut machine, 0xD402, 0x00);
    write(&mut machine, 0xD403, 0x20);
    write(&mut machine, 0xD400, 0x22);

    // The line 8 fetch is due at 912 but picked up 4 cycles late.
    run_until(&mut machine, 8 * CYCLES_PER_LINE - 1);
    machine.advance(5);
    machine.service_events();
    assert_eq!(machine.antic.current_line(), 8);
    assert_eq!(
        machine.scheduler.get(TimedEvent::Dli),
        Some(8 * CYCLES_PER_LINE + 4 + 7 * CYCLES_PER_LINE)
    );
}

#[test]
fn test_vbi_nmi_once_per_frame() {
    let mut machine = MachineState::new();
    write(&mut machine, 0xD40E, 0x40);
    run_until(&mut machine, 248 * CYCLES_PER_LINE - 1);
    assert_eq!(machine.take_interrupts().nmi, 0);

    run_until(&mut machine, 312 * CYCLES_PER_LINE);
    assert_eq!(machine.take_interrupts().nmi, 1);
    assert_eq!(read(&mut machine, 0xD40F), 0x40);
}

#[test]
fn test_timer_irq() {
    let mut machine = MachineState::new();
    write(&mut machine, 0xD20F, 0x03);
    write(&mut machine, 0xD200, 0x10);
    write(&mut machine, 0xD20E, 0x01);
    write(&mut machine, 0xD209, 0x00);
    let period = 17 * 28;
    assert_eq!(machine.scheduler.get(TimedEvent::Timer1), Some(period));

    run_until(&mut machine, period);
    assert_eq!(machine.take_interrupts().irq, 1);
    assert_eq!(read(&mut machine, 0xD20E), 0xFE);
    assert_eq!(machine.scheduler.get(TimedEvent::Timer1), Some(2 * period));

    // Acknowledged by toggling IRQEN.
    write(&mut machine, 0xD20E, 0x00);
    assert_eq!(read(&mut machine, 0xD20E), 0xFF);
}

#[test]
fn test_disk_status_over_serial_bus() {
    let mut machine = MachineState::new();
    let mut image = vec![0x96, 0x02, 0x08, 0x00, 0x80, 0x00];
    image.resize(16, 0);
    image.resize(16 + 128, 0x01);
    machine
        .sio
        .insert_disk(DiskImage::with_atr_data(&image).unwrap());
    write(&mut machine, 0xD20E, 0x20);

    let mut frame = vec![0x31, 0x53, 0x00, 0x00];
    frame.push(checksum(&frame));
    for byte in frame {
        write(&mut machine, 0xD20D, byte);
    }
    assert!(machine.sio.is_active(&machine.scheduler));

    run_until(&mut machine, 3000);
    assert_eq!(machine.take_interrupts().irq, 1);
    assert_eq!(read(&mut machine, 0xD20D), b'A');
    assert_eq!(machine.peek_u8(AddressU16(0xD20D)), Some(b'A'));
    assert_eq!(read(&mut machine, 0xD20D), b'C');
}

#[test]
fn test_option_held_during_boot_check() {
    let mut machine = MachineState::new();
    machine.option_on_start = true;
    machine.on_instruction_fetch(AddressU16(0xC49A));
    assert_eq!(read(&mut machine, 0xD01F), 0x03);
    machine.on_instruction_fetch(AddressU16(0xC49D));
    assert_eq!(read(&mut machine, 0xD01F), 0x07);
}

#[test]
fn test_save_and_load_state() {
    let mut machine = MachineState::new();
    write(&mut machine, 0x0600, 0x42);
    write(&mut machine, 0xD016, 0x28);
    run_until(&mut machine, 1000);
    let snapshot = machine.save_state();

    write(&mut machine, 0x0600, 0x00);
    write(&mut machine, 0xD016, 0x00);
    run_until(&mut machine, 5000);

    machine.load_state(snapshot).unwrap();
    assert_eq!(machine.cycle(), 1000);
    assert_eq!(read(&mut machine, 0x0600), 0x42);
    assert_eq!(machine.gtia.registers()[gtia::COLPF0 as usize], 0x28);
    assert_eq!(machine.antic.current_line(), 8);
}

#[test]
fn test_load_state_rejects_truncated_memory() {
    let mut machine = MachineState::new();
    write(&mut machine, 0x0600, 0x42);
    run_until(&mut machine, 1000);
    let mut snapshot = machine.save_state();
    snapshot.memory.truncate_ram(0x100);

    write(&mut machine, 0xD016, 0x28);
    run_until(&mut machine, 5000);
    assert!(machine.load_state(snapshot).is_err());
    assert_eq!(machine.cycle(), 5000);
    assert_eq!(read(&mut machine, 0x0600), 0x42);
    assert_eq!(machine.gtia.registers()[gtia::COLPF0 as usize], 0x28);
    // Still runs.
    run_until(&mut machine, 6000);
}
