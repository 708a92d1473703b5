//! GTIA: color registers, joystick triggers, console keys and the player/missile compositor.
//!
//! Write and read registers share addresses but not meaning. Writes land in `registers`, the
//! read side is assembled from collision latches, trigger state and the console keys.
mod player_missile;

use bitcode::Decode;
use bitcode::Encode;
use log::debug;

use crate::common::constants::gtia;
use crate::common::framebuffer::Framebuffer;

/// Console key bits as read from CONSOL (active low).
pub const CONSOL_START: u8 = 0x01;
pub const CONSOL_SELECT: u8 = 0x02;
pub const CONSOL_OPTION: u8 = 0x04;

const TRIGGER_COUNT: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct GtiaState {
    registers: [u8; gtia::REGISTER_COUNT],
    /// M0PF..P3PL, indexed by read offset.
    collisions: [u8; 16],
    /// Current trigger levels, 0 is pressed.
    trigger_physical: [u8; TRIGGER_COUNT],
    trigger_latched: [u8; TRIGGER_COUNT],
    /// Console key lines, a cleared bit is a held key.
    console_keys: u8,
}

impl Default for GtiaState {
    fn default() -> Self {
        Self {
            registers: [0; gtia::REGISTER_COUNT],
            collisions: [0; 16],
            trigger_physical: [1; TRIGGER_COUNT],
            trigger_latched: [1; TRIGGER_COUNT],
            console_keys: CONSOL_START | CONSOL_SELECT | CONSOL_OPTION,
        }
    }
}

#[derive(Default)]
pub struct Gtia {
    state: GtiaState,
}

impl Gtia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.state = GtiaState::default();
    }

    pub fn save_state(&self) -> GtiaState {
        self.state.clone()
    }

    pub fn load_state(&mut self, state: GtiaState) {
        self.state = state;
    }

    /// The write registers, as used by the playfield renderer.
    pub fn registers(&self) -> &[u8] {
        &self.state.registers
    }

    fn latch_enabled(&self) -> bool {
        self.state.registers[gtia::GRACTL as usize] & 0x04 != 0
    }

    pub fn bus_peek(&self, offset: u8) -> u8 {
        match offset {
            0x00..=0x0F => self.state.collisions[offset as usize],
            gtia::GRAFP3_TRIG0..=gtia::COLPM1_TRIG3 => {
                let index = (offset - gtia::GRAFP3_TRIG0) as usize;
                if self.latch_enabled() {
                    self.state.trigger_latched[index]
                } else {
                    self.state.trigger_physical[index]
                }
            }
            // PAL
            gtia::COLPM2_PAL => 0x01,
            gtia::COLPM3..=gtia::COLBK => 0x0F,
            gtia::CONSOL => self.state.console_keys,
            _ => 0xFF,
        }
    }

    pub fn bus_write(&mut self, offset: u8, value: u8) {
        let registers = &mut self.state.registers;
        match offset {
            gtia::COLPM0_TRIG2..=gtia::COLBK => registers[offset as usize] = value & 0xFE,
            gtia::GRACTL => {
                let was_latching = registers[offset as usize] & 0x04 != 0;
                let latching = value & 0x04 != 0;
                registers[offset as usize] = value & 0x07;
                // Turning latching on starts from the current levels, turning it off drops
                // the latched presses.
                if !(was_latching && latching) {
                    self.state.trigger_latched = self.state.trigger_physical;
                }
            }
            gtia::HITCLR => {
                self.state.collisions = [0; 16];
                registers[offset as usize] = value;
            }
            // Only the speaker bit is writable.
            gtia::CONSOL => registers[offset as usize] = value & 0x08,
            _ => registers[offset as usize] = value,
        }
    }

    /// Joystick button `index` (0..=3). With latching enabled a press is held until GRACTL is
    /// rewritten.
    pub fn set_trigger(&mut self, index: usize, pressed: bool) {
        let level = if pressed { 0 } else { 1 };
        self.state.trigger_physical[index] = level;
        if self.latch_enabled() {
            if pressed {
                self.state.trigger_latched[index] = 0;
            }
        } else {
            self.state.trigger_latched[index] = level;
        }
    }

    /// Console keys `mask` (CONSOL_START, CONSOL_SELECT, CONSOL_OPTION).
    pub fn set_console_keys(&mut self, mask: u8, pressed: bool) {
        debug!("Console keys {:02X} pressed: {}", mask, pressed);
        if pressed {
            self.state.console_keys &= !mask;
        } else {
            self.state.console_keys |= mask;
        }
    }

    /// Overlays players and missiles onto a rendered scanline and records their collisions.
    pub fn draw_player_missiles(
        &mut self,
        line: usize,
        antic_mode: u8,
        dmactl: u8,
        pmbase: u8,
        ram: &[u8],
        framebuffer: &mut Framebuffer,
    ) {
        player_missile::draw_line(
            &mut self.state,
            player_missile::LineContext {
                line,
                antic_mode,
                dmactl,
                pmbase,
            },
            ram,
            framebuffer,
        );
    }
}
