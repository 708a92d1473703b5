use pretty_assertions::assert_eq;

use super::fixed_add;
use super::Antic;
use crate::common::constants::antic;
use crate::common::constants::gtia;
use crate::common::constants::CYCLES_PER_LINE;
use crate::common::constants::PIXELS_PER_LINE;
use crate::common::constants::PRIO_BKG;
use crate::common::constants::PRIO_PF1;
use crate::common::constants::PRIO_PF2;
use crate::common::framebuffer::Framebuffer;
use crate::common::scheduler::EventScheduler;
use crate::common::scheduler::TimedEvent;

struct TestMachine {
    antic: Antic,
    scheduler: EventScheduler,
    ram: Vec<u8>,
    gtia: [u8; gtia::REGISTER_COUNT],
    framebuffer: Framebuffer,
}

impl TestMachine {
    /// ANTIC with playfield DMA on a normal width playfield, reading its display list from
    /// `display_list` placed at $2000.
    fn new(display_list: &[u8]) -> Self {
        let mut machine = Self {
            antic: Antic::new(),
            scheduler: EventScheduler::new(),
            ram: vec![0; 0x10000],
            gtia: [0; gtia::REGISTER_COUNT],
            framebuffer: Framebuffer::default(),
        };
        machine.ram[0x2000..0x2000 + display_list.len()].copy_from_slice(display_list);
        machine.write(antic::DLISTL, 0x00);
        machine.write(antic::DLISTH, 0x20);
        machine.write(antic::DMACTL, 0x22);
        machine
    }

    fn write(&mut self, offset: u8, value: u8) {
        self.antic.bus_write(offset, value, 0, &self.scheduler);
    }

    fn fetch(&mut self) -> super::LineFetch {
        let now = (self.antic.current_line() as u64 + 1) * CYCLES_PER_LINE;
        self.antic.fetch_line(now, &self.ram, &mut self.scheduler)
    }

    fn fetch_until(&mut self, line: usize) {
        while self.antic.current_line() != line {
            self.fetch();
        }
    }

    fn draw(&mut self) -> u64 {
        self.antic
            .draw_line(&self.ram, &self.gtia, &mut self.framebuffer)
    }
}

#[test]
fn test_fixed_add() {
    assert_eq!(fixed_add(0x1FFF, 0x0FFF, 1), 0x1000);
    assert_eq!(fixed_add(0x1FF0, 0x0FFF, 0x20), 0x1010);
    assert_eq!(fixed_add(0x23FF, 0x03FF, 1), 0x2000);
    assert_eq!(fixed_add(0x2100, 0x03FF, 3), 0x2103);
}

#[test]
fn test_vcount() {
    let mut machine = TestMachine::new(&[]);
    machine.write(antic::DMACTL, 0);
    machine.fetch_until(101);
    assert_eq!(machine.antic.bus_peek(antic::VCOUNT), 50);
    machine.fetch_until(311);
    machine.fetch();
    assert_eq!(machine.antic.current_line(), 0);
    assert_eq!(machine.antic.bus_peek(antic::VCOUNT), 0);
}

#[test]
fn test_vbi_nmi() {
    let mut machine = TestMachine::new(&[]);
    machine.write(antic::DMACTL, 0);
    machine.fetch_until(247);
    assert_eq!(machine.antic.nmist(), 0);

    // Disabled: NMIST is set anyway.
    let result = machine.fetch();
    assert!(!result.nmi);
    assert_eq!(result.stall, 9);
    assert_eq!(machine.antic.nmist(), 0x40);

    machine.write(antic::NMIRES_NMIST, 0);
    assert_eq!(machine.antic.nmist(), 0);
    machine.write(antic::NMIEN, 0x40);
    machine.fetch_until(247);
    assert!(machine.fetch().nmi);
}

#[test]
fn test_display_list_instructions() {
    let mut machine = TestMachine::new(&[
        0x70, // 8 blank lines
        0x42, 0x00, 0x40, // mode 2 with LMS $4000
        0x02, // mode 2
        0x41, 0x00, 0x20, // JVB $2000
    ]);
    machine.fetch_until(8);
    assert_eq!(machine.antic.mode(), 0);
    assert_eq!(machine.antic.display_list_address(), 0x2001);

    machine.fetch_until(16);
    assert_eq!(machine.antic.mode(), 2);
    assert_eq!(machine.antic.display_memory_address(), 0x4000);
    assert_eq!(machine.antic.display_list_address(), 0x2004);

    machine.fetch_until(24);
    assert_eq!(machine.antic.display_list_address(), 0x2005);

    machine.fetch_until(32);
    assert_eq!(machine.antic.mode(), 1);
    assert_eq!(machine.antic.display_list_address(), 0x2000);

    // Nothing more is fetched until the next frame.
    machine.fetch_until(311);
    assert_eq!(machine.antic.display_list_address(), 0x2000);
    machine.fetch_until(8);
    assert_eq!(machine.antic.display_list_address(), 0x2001);
}

#[test]
fn test_dli() {
    let mut machine = TestMachine::new(&[0xF0]);
    machine.write(antic::NMIEN, 0x80);
    machine.fetch_until(8);
    // Raised on the last line of the 8 line instruction.
    let expected = 8 * CYCLES_PER_LINE + 7 * CYCLES_PER_LINE;
    assert_eq!(machine.scheduler.get(TimedEvent::Dli), Some(expected));

    assert!(machine.antic.service_dli(&mut machine.scheduler));
    assert_eq!(machine.antic.nmist(), 0x80);
    assert!(!machine.scheduler.is_armed(TimedEvent::Dli));
}

#[test]
fn test_wsync_target() {
    let mut machine = TestMachine::new(&[]);
    let scheduler = &machine.scheduler;
    // Display list fetch is pending at 114.
    assert_eq!(
        machine.antic.bus_write(antic::WSYNC, 0, 50, scheduler),
        Some(CYCLES_PER_LINE)
    );
    assert_eq!(
        machine.antic.bus_write(antic::WSYNC, 0, 114, scheduler),
        Some(2 * CYCLES_PER_LINE)
    );
    assert_eq!(
        machine.antic.bus_write(antic::WSYNC, 0, 300, scheduler),
        Some(3 * CYCLES_PER_LINE)
    );
    assert_eq!(machine.antic.bus_write(antic::CHACTL, 0, 300, scheduler), None);
}

#[test]
fn test_blank_line_uses_background() {
    let mut machine = TestMachine::new(&[]);
    machine.write(antic::DMACTL, 0);
    machine.gtia[gtia::COLBK as usize] = 0x94;

    machine.fetch_until(5);
    assert_eq!(machine.draw(), 0);
    assert!(machine.framebuffer.line(5).iter().all(|&pixel| pixel == 0));

    machine.fetch_until(10);
    assert_eq!(machine.draw(), 0);
    assert!(machine.framebuffer.line(10).iter().all(|&pixel| pixel == 0x94));

    // PRIOR mode 3 keeps only the background hue.
    machine.gtia[gtia::PRIOR as usize] = 0xC0;
    machine.draw();
    assert_eq!(machine.framebuffer.line(10)[0], 0x90);
}

#[test]
fn test_text_mode_rendering() {
    let mut machine = TestMachine::new(&[0x70, 0x42, 0x00, 0x40, 0x02, 0x41, 0x00, 0x20]);
    machine.write(antic::CHBASE, 0xE0);
    machine.write(antic::CHACTL, 0x02);
    machine.gtia[gtia::COLBK as usize] = 0x02;
    machine.gtia[gtia::COLPF1 as usize] = 0x0A;
    machine.gtia[gtia::COLPF2 as usize] = 0x94;
    // Character $21 has its leftmost pixel set on the top row.
    machine.ram[0xE000 + 0x21 * 8] = 0x80;
    machine.ram[0x4000] = 0x21;
    machine.ram[0x4001] = 0xA1;

    machine.fetch_until(16);
    assert_eq!(machine.draw(), 32);

    let start = Framebuffer::line_offset(16);
    let line = machine.framebuffer.line(16);
    let priority = &machine.framebuffer.priority[start..start + PIXELS_PER_LINE];
    assert_eq!(line[95], 0x02);
    assert_eq!(priority[95], PRIO_BKG);
    assert_eq!(&line[96..98], &[0x9A, 0x94]);
    assert_eq!(&priority[96..98], &[PRIO_PF1, PRIO_PF2]);
    // Inverse video swaps the two colors.
    assert_eq!(&line[104..106], &[0x94, 0x9A]);
    assert_eq!(&priority[104..106], &[PRIO_PF2, PRIO_PF1]);
    assert_eq!(line[96 + 256], 0x02);

    // The screen pointer moves on after the last line of the mode line.
    machine.fetch_until(23);
    assert_eq!(machine.antic.display_memory_address(), 0x4000);
    machine.draw();
    assert_eq!(machine.antic.display_memory_address(), 0x4020);
}

#[test]
fn test_gtia_luminance_mode() {
    let mut machine = TestMachine::new(&[0x4F, 0x00, 0x50]);
    machine.gtia[gtia::COLBK as usize] = 0x90;
    machine.gtia[gtia::PRIOR as usize] = 0x40;
    machine.ram[0x5000] = 0x3C;

    machine.fetch_until(8);
    assert_eq!(machine.draw(), 32);
    let line = machine.framebuffer.line(8);
    assert_eq!(&line[96..104], &[0x93, 0x93, 0x93, 0x93, 0x9C, 0x9C, 0x9C, 0x9C]);
    assert_eq!(machine.antic.display_memory_address(), 0x5020);
}
