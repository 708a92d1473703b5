use a8_emulator::common::constants::BASIC_ROM_SIZE;
use a8_emulator::common::constants::OS_ROM_SIZE;
use a8_emulator::config::MachineConfig;
use a8_emulator::System;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::BatchSize;
use criterion::Criterion;

/// OS ROM that switches on a text mode screen and then counts up in a busy loop with the
/// VBI handler also running.
fn busy_os_rom() -> Vec<u8> {
    let mut rom = vec![0; OS_ROM_SIZE];
    #[rustfmt::skip]
    let code = [
        0xA9, 0x00, 0x8D, 0x02, 0xD4, // DLIST = $2000
        0xA9, 0x20, 0x8D, 0x03, 0xD4,
        0xA9, 0xE0, 0x8D, 0x09, 0xD4, // CHBASE = $E0
        0xA9, 0x22, 0x8D, 0x00, 0xD4, // DMACTL = $22
        0xA9, 0x40, 0x8D, 0x0E, 0xD4, // NMIEN = VBI
        0xE8,                         // INX
        0xD0, 0xFD,                   // BNE -3
        0xC8,                         // INY
        0x4C, 0x19, 0xC0,             // JMP $C019
    ];
    rom[..code.len()].copy_from_slice(&code);
    // VBI: INC $0600; RTI
    rom[0x0100..0x0104].copy_from_slice(&[0xEE, 0x00, 0x06, 0x40]);
    rom[0x3FFA..0x3FFE].copy_from_slice(&[0x00, 0xC1, 0x00, 0xC0]);
    rom
}

fn booted_system(audio_enabled: bool) -> System {
    let mut system = System::new(MachineConfig {
        audio_enabled,
        ..MachineConfig::default()
    });
    system.load_os_rom(&busy_os_rom()).unwrap();
    system.load_basic_rom(&vec![0; BASIC_ROM_SIZE]).unwrap();
    let mut display_list = vec![0x70, 0x70, 0x70, 0x42, 0x00, 0x40];
    display_list.extend([0x02; 23]);
    display_list.extend([0x41, 0x00, 0x20]);
    system.cpu.bus.memory.load_ram(0x2000, &display_list);
    system.start();
    system
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("cpu_steps", |b| {
        b.iter_batched_ref(
            || booted_system(false),
            |system| {
                for _ in 0..100000 {
                    system.cpu.step();
                }
            },
            BatchSize::LargeInput,
        )
    });
    c.bench_function("text_mode_frames", |b| {
        b.iter_batched_ref(
            || booted_system(false),
            |system| system.execute_frames(10),
            BatchSize::LargeInput,
        )
    });
    c.bench_function("text_mode_frames_with_audio", |b| {
        b.iter_batched_ref(
            || booted_system(true),
            |system| {
                system.execute_frames(10);
                system.drain_audio(usize::MAX)
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
