//! Hardware constants of the PAL machine: timing, register map, interrupt bits and mode tables.
//!
//! The register addresses are a compatibility contract with existing software.

pub const PIXELS_PER_LINE: usize = 456;
pub const LINES_PER_SCREEN_PAL: usize = 312;
pub const COLOR_CLOCKS_PER_LINE: usize = PIXELS_PER_LINE / 2;
pub const CYCLES_PER_LINE: u64 = (COLOR_CLOCKS_PER_LINE / 2) as u64;
pub const CYCLES_PER_FRAME: u64 = CYCLES_PER_LINE * LINES_PER_SCREEN_PAL as u64;
pub const ATARI_CPU_HZ_PAL: u64 = 1_773_447;

pub const FIRST_VISIBLE_LINE: usize = 8;
pub const LAST_VISIBLE_LINE: usize = 247;
pub const VBI_LINE: usize = 248;

pub const SERIAL_OUTPUT_DATA_NEEDED_CYCLES: u64 = 900;
pub const SERIAL_OUTPUT_TRANSMISSION_DONE_CYCLES: u64 = 1500;
pub const SERIAL_INPUT_FIRST_DATA_READY_CYCLES: u64 = 3000;
pub const SERIAL_INPUT_DATA_READY_CYCLES: u64 = 900;
pub const TURBO_EMU_MULTIPLIER: f64 = 4.0;
pub const SIO_TURBO_EMU_MULTIPLIER: f64 = 4.0;

/// Visible window used for screenshots.
pub const VIEW_W: usize = 336;
pub const VIEW_H: usize = 240;
pub const VIEW_X: usize = (16 + 12 + 6 + 10 + 4) * 2 + 160 - VIEW_W / 2;
pub const VIEW_Y: usize = 8;

pub const OS_ROM_SIZE: usize = 0x4000;
pub const BASIC_ROM_SIZE: usize = 0x2000;

#[derive(Clone, Copy, PartialEq, Debug, strum::Display, strum::EnumString)]
pub enum VectorTable {
    #[strum(serialize = "nmi")]
    Nmi = 0xFFFA,
    #[strum(serialize = "reset")]
    Reset = 0xFFFC,
    #[strum(serialize = "irq", serialize = "brk")]
    Irq = 0xFFFE,
}

/// NMIST/NMIEN bits
pub const NMI_DLI: u8 = 0x80;
pub const NMI_VBI: u8 = 0x40;
pub const NMI_RESET: u8 = 0x20;

/// IRQST/IRQEN bits. IRQST is active low.
pub const IRQ_TIMER_1: u8 = 0x01;
pub const IRQ_TIMER_2: u8 = 0x02;
pub const IRQ_TIMER_4: u8 = 0x04;
pub const IRQ_SERIAL_OUTPUT_TRANSMISSION_DONE: u8 = 0x08;
pub const IRQ_SERIAL_OUTPUT_DATA_NEEDED: u8 = 0x10;
pub const IRQ_SERIAL_INPUT_DATA_READY: u8 = 0x20;
pub const IRQ_OTHER_KEY_PRESSED: u8 = 0x40;
pub const IRQ_BREAK_KEY_PRESSED: u8 = 0x80;

/// Base address of each chip's register page.
pub const GTIA_BASE: u16 = 0xD000;
pub const POKEY_BASE: u16 = 0xD200;
pub const PIA_BASE: u16 = 0xD300;
pub const ANTIC_BASE: u16 = 0xD400;
pub const IO_START: u16 = 0xD000;
pub const IO_END: u16 = 0xD7FF;

/// GTIA register offsets. Write name first, read name second.
pub mod gtia {
    pub const HPOSP0_M0PF: u8 = 0x00;
    pub const HPOSM0_P0PF: u8 = 0x04;
    pub const SIZEP0_M0PL: u8 = 0x08;
    pub const SIZEM_P0PL: u8 = 0x0C;
    pub const GRAFP0_P1PL: u8 = 0x0D;
    pub const GRAFP3_TRIG0: u8 = 0x10;
    pub const GRAFM_TRIG1: u8 = 0x11;
    pub const COLPM0_TRIG2: u8 = 0x12;
    pub const COLPM1_TRIG3: u8 = 0x13;
    pub const COLPM2_PAL: u8 = 0x14;
    pub const COLPM3: u8 = 0x15;
    pub const COLPF0: u8 = 0x16;
    pub const COLPF1: u8 = 0x17;
    pub const COLPF2: u8 = 0x18;
    pub const COLPF3: u8 = 0x19;
    pub const COLBK: u8 = 0x1A;
    pub const PRIOR: u8 = 0x1B;
    pub const VDELAY: u8 = 0x1C;
    pub const GRACTL: u8 = 0x1D;
    pub const HITCLR: u8 = 0x1E;
    pub const CONSOL: u8 = 0x1F;
    pub const REGISTER_COUNT: usize = 0x20;
}

/// POKEY register offsets. Write name first, read name second.
pub mod pokey {
    pub const AUDF1_POT0: u8 = 0x00;
    pub const AUDC1_POT1: u8 = 0x01;
    pub const AUDF2_POT2: u8 = 0x02;
    pub const AUDC2_POT3: u8 = 0x03;
    pub const AUDF3_POT4: u8 = 0x04;
    pub const AUDC3_POT5: u8 = 0x05;
    pub const AUDF4_POT6: u8 = 0x06;
    pub const AUDC4_POT7: u8 = 0x07;
    pub const AUDCTL_ALLPOT: u8 = 0x08;
    pub const STIMER_KBCODE: u8 = 0x09;
    pub const SKREST_RANDOM: u8 = 0x0A;
    pub const POTGO: u8 = 0x0B;
    pub const SEROUT_SERIN: u8 = 0x0D;
    pub const IRQEN_IRQST: u8 = 0x0E;
    pub const SKCTL_SKSTAT: u8 = 0x0F;
    pub const REGISTER_COUNT: usize = 0x10;
}

/// PIA register offsets.
pub mod pia {
    pub const PORTA: u8 = 0x00;
    pub const PORTB: u8 = 0x01;
    pub const PACTL: u8 = 0x02;
    pub const PBCTL: u8 = 0x03;
    pub const REGISTER_COUNT: usize = 0x04;
}

/// ANTIC register offsets.
pub mod antic {
    pub const DMACTL: u8 = 0x00;
    pub const CHACTL: u8 = 0x01;
    pub const DLISTL: u8 = 0x02;
    pub const DLISTH: u8 = 0x03;
    pub const HSCROL: u8 = 0x04;
    pub const VSCROL: u8 = 0x05;
    pub const PMBASE: u8 = 0x07;
    pub const CHBASE: u8 = 0x09;
    pub const WSYNC: u8 = 0x0A;
    pub const VCOUNT: u8 = 0x0B;
    pub const PENH: u8 = 0x0C;
    pub const PENV: u8 = 0x0D;
    pub const NMIEN: u8 = 0x0E;
    pub const NMIRES_NMIST: u8 = 0x0F;
    pub const REGISTER_COUNT: usize = 0x10;
}

/// Priority plane bits written by the playfield renderer and consumed by the compositor.
pub const PRIO_BKG: u8 = 0x00;
pub const PRIO_PF0: u8 = 0x01;
pub const PRIO_PF1: u8 = 0x02;
pub const PRIO_PF2: u8 = 0x04;
pub const PRIO_PF3: u8 = 0x08;
pub const PRIO_PM0: u8 = 0x10;
pub const PRIO_PM1: u8 = 0x20;
pub const PRIO_PM2: u8 = 0x40;
pub const PRIO_PM3: u8 = 0x80;

pub const PRIORITY_TABLE_BKG_PF012: [u8; 4] = [PRIO_BKG, PRIO_PF0, PRIO_PF1, PRIO_PF2];
pub const PRIORITY_TABLE_BKG_PF013: [u8; 4] = [PRIO_BKG, PRIO_PF0, PRIO_PF1, PRIO_PF3];
pub const PRIORITY_TABLE_PF0123: [u8; 4] = [PRIO_PF0, PRIO_PF1, PRIO_PF2, PRIO_PF3];

/// Scanlines per mode line and pixels per source byte for each ANTIC mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnticModeInfo {
    pub lines: u8,
    pub pixels_per_byte: u8,
}

const fn mode(lines: u8, pixels_per_byte: u8) -> AnticModeInfo {
    AnticModeInfo {
        lines,
        pixels_per_byte,
    }
}

pub const ANTIC_MODE_INFO: [AnticModeInfo; 16] = [
    mode(0, 0),
    mode(0, 0),
    mode(8, 8),
    mode(10, 8),
    mode(8, 8),
    mode(16, 8),
    mode(8, 16),
    mode(16, 16),
    mode(8, 32),
    mode(4, 32),
    mode(4, 16),
    mode(2, 16),
    mode(1, 16),
    mode(2, 8),
    mode(1, 8),
    mode(1, 8),
];
