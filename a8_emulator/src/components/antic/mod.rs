//! ANTIC: the display list processor.
//!
//! Once per scanline the display list is advanced (`fetch_line`) and shortly after, the current
//! line of the playfield is rendered into the framebuffer (`draw_line`). Both are driven by the
//! machine's event scheduler. VBI and DLI are reported back to the caller, which raises the NMI.
mod playfield;
#[cfg(test)]
mod test;

use bitcode::Decode;
use bitcode::Encode;
use log::debug;

use crate::common::constants::antic;
use crate::common::constants::ANTIC_MODE_INFO;
use crate::common::constants::CYCLES_PER_LINE;
use crate::common::constants::LINES_PER_SCREEN_PAL;
use crate::common::constants::NMI_DLI;
use crate::common::constants::NMI_RESET;
use crate::common::constants::NMI_VBI;
use crate::common::constants::VBI_LINE;
use crate::common::framebuffer::Framebuffer;
use crate::common::scheduler::Cycle;
use crate::common::scheduler::EventScheduler;
use crate::common::scheduler::TimedEvent;

/// The first display list instruction of a frame is fetched on this line.
const FIRST_DISPLAY_LIST_LINE: u16 = 8;
/// DMA cycles taken by the memory refresh and display list fetch at the start of a line.
const FETCH_STALL_CYCLES: u64 = 9;

/// Adds `delta` to the bits of `address` selected by `mask`, leaving the others untouched.
/// ANTIC's address counters cannot carry out of their 1K (display list) or 4K (screen memory)
/// block.
pub(crate) fn fixed_add(address: u16, mask: u16, delta: u16) -> u16 {
    (address & !mask) | (address.wrapping_add(delta) & mask)
}

/// Result of advancing the display list by one scanline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineFetch {
    /// Cycles the CPU is halted for DMA.
    pub stall: u64,
    /// A vertical blank NMI is to be delivered.
    pub nmi: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct AnticState {
    dmactl: u8,
    chactl: u8,
    hscrol: u8,
    vscrol: u8,
    pmbase: u8,
    chbase: u8,
    nmien: u8,
    nmist: u8,

    current_line: u16,
    next_display_list_line: u16,
    vertical_scroll_offset: u16,
    display_list_address: u16,
    display_list_command: u8,
    display_memory_address: u16,
}

impl Default for AnticState {
    fn default() -> Self {
        Self {
            dmactl: 0,
            chactl: 0,
            hscrol: 0,
            vscrol: 0,
            pmbase: 0,
            chbase: 0,
            nmien: 0,
            nmist: 0,
            current_line: 0,
            next_display_list_line: FIRST_DISPLAY_LIST_LINE,
            vertical_scroll_offset: 0,
            display_list_address: 0,
            display_list_command: 0,
            display_memory_address: 0,
        }
    }
}

#[derive(Default)]
pub struct Antic {
    state: AnticState,
}

impl Antic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.state = AnticState::default();
    }

    pub fn save_state(&self) -> AnticState {
        self.state.clone()
    }

    pub fn load_state(&mut self, state: AnticState) {
        self.state = state;
    }

    pub fn bus_peek(&self, offset: u8) -> u8 {
        match offset {
            antic::VCOUNT => (self.state.current_line >> 1) as u8,
            antic::NMIRES_NMIST => self.state.nmist,
            _ => 0xFF,
        }
    }

    /// Writes a register. For WSYNC, returns the cycle until which the CPU is halted.
    pub fn bus_write(
        &mut self,
        offset: u8,
        value: u8,
        now: Cycle,
        scheduler: &EventScheduler,
    ) -> Option<Cycle> {
        match offset {
            antic::DMACTL => self.state.dmactl = value & 0x3F,
            antic::CHACTL => self.state.chactl = value,
            antic::DLISTL => {
                self.state.display_list_address =
                    (self.state.display_list_address & 0xFF00) | value as u16
            }
            antic::DLISTH => {
                self.state.display_list_address =
                    (self.state.display_list_address & 0x00FF) | (value as u16) << 8
            }
            antic::HSCROL => self.state.hscrol = value & 0x0F,
            antic::VSCROL => self.state.vscrol = value & 0x0F,
            antic::PMBASE => self.state.pmbase = value,
            antic::CHBASE => self.state.chbase = value,
            antic::WSYNC => return Some(Self::wsync_target(now, scheduler)),
            antic::NMIEN => self.state.nmien = value & (NMI_DLI | NMI_VBI | NMI_RESET),
            antic::NMIRES_NMIST => self.state.nmist = 0,
            // VCOUNT, PENH, PENV and the unused offsets
            _ => (),
        }
        None
    }

    /// WSYNC halts the CPU until the start of the next scanline, and never for more than one line.
    fn wsync_target(now: Cycle, scheduler: &EventScheduler) -> Cycle {
        let next_line_boundary = (now / CYCLES_PER_LINE + 1) * CYCLES_PER_LINE;
        match scheduler.get(TimedEvent::DisplayListFetch) {
            Some(fetch) if fetch > now && fetch - now <= CYCLES_PER_LINE => fetch,
            _ => next_line_boundary,
        }
    }

    pub fn current_line(&self) -> usize {
        self.state.current_line as usize
    }

    pub fn dmactl(&self) -> u8 {
        self.state.dmactl
    }

    pub fn pmbase(&self) -> u8 {
        self.state.pmbase
    }

    /// The mode of the current display list instruction.
    pub fn mode(&self) -> u8 {
        self.state.display_list_command & 0x0F
    }

    pub fn display_list_address(&self) -> u16 {
        self.state.display_list_address
    }

    pub fn display_memory_address(&self) -> u16 {
        self.state.display_memory_address
    }

    pub fn nmist(&self) -> u8 {
        self.state.nmist
    }

    /// Moves to the next scanline and processes the display list for it.
    pub fn fetch_line(
        &mut self,
        now: Cycle,
        ram: &[u8],
        scheduler: &mut EventScheduler,
    ) -> LineFetch {
        let state = &mut self.state;
        state.current_line += 1;
        if state.current_line as usize >= LINES_PER_SCREEN_PAL {
            state.current_line = 0;
            state.next_display_list_line = FIRST_DISPLAY_LIST_LINE;
        }
        let mut result = LineFetch {
            stall: FETCH_STALL_CYCLES,
            nmi: false,
        };

        if state.current_line as usize == VBI_LINE {
            state.next_display_list_line = FIRST_DISPLAY_LIST_LINE;
            state.nmist = (state.nmist & !NMI_DLI) | NMI_VBI;
            if state.nmien & NMI_VBI != 0 {
                debug!("ANTIC: VBI");
                result.nmi = true;
            }
        }

        if state.dmactl & 0x20 != 0 && state.current_line == state.next_display_list_line {
            self.execute_display_list_instruction(now, ram, scheduler);
        }
        result
    }

    fn execute_display_list_instruction(
        &mut self,
        now: Cycle,
        ram: &[u8],
        scheduler: &mut EventScheduler,
    ) {
        let state = &mut self.state;
        let read_next = |address: &mut u16| {
            let value = ram[*address as usize];
            *address = fixed_add(*address, 0x03FF, 1);
            value
        };

        let old_command = state.display_list_command;
        let command = read_next(&mut state.display_list_address);
        state.display_list_command = command;

        let mode = command & 0x0F;
        let line = state.current_line;
        if mode <= 0x01 {
            state.next_display_list_line += (((command & 0x70) >> 4) + 1) as u16;
        } else {
            state.next_display_list_line += ANTIC_MODE_INFO[mode as usize].lines as u16;
        }

        // Entering or leaving a vertically scrolled region shortens its first or last line.
        let vscrol = state.vscrol as u16;
        let was_scrolled = (old_command & 0x2F) >= 0x22;
        let is_scrolled = (command & 0x2F) >= 0x22;
        if !was_scrolled && is_scrolled {
            state.next_display_list_line =
                (line + 1).max(state.next_display_list_line.saturating_sub(vscrol));
            state.vertical_scroll_offset = 0;
        } else if was_scrolled && !is_scrolled {
            let unscrolled = state.next_display_list_line;
            state.next_display_list_line = unscrolled.min(line + vscrol + 1);
            state.vertical_scroll_offset = unscrolled - state.next_display_list_line;
        } else {
            state.vertical_scroll_offset = 0;
        }

        if command & 0x80 != 0 {
            let lines = state.next_display_list_line.saturating_sub(line + 1) as u64;
            scheduler.arm(TimedEvent::Dli, now + lines * CYCLES_PER_LINE);
        }

        if mode == 0x01 {
            let address = state.display_list_address as usize;
            state.display_list_address =
                u16::from_le_bytes([ram[address], ram[(address + 1) & 0xFFFF]]);
        }

        // JVB: wait for vertical blank
        if command == 0x41 {
            state.next_display_list_line = FIRST_DISPLAY_LIST_LINE;
        }

        // LMS: load memory scan
        if (command & 0x4F) >= 0x42 {
            let low = read_next(&mut state.display_list_address);
            let high = read_next(&mut state.display_list_address);
            state.display_memory_address = u16::from_le_bytes([low, high]);
        }
    }

    /// Handles the DLI event. Returns true if the NMI is to be delivered.
    pub fn service_dli(&mut self, scheduler: &mut EventScheduler) -> bool {
        scheduler.disarm(TimedEvent::Dli);
        self.state.nmist = (self.state.nmist & !NMI_VBI) | NMI_DLI;
        let enabled = self.state.nmien & NMI_DLI != 0;
        if enabled {
            debug!("ANTIC: DLI on line {}", self.state.current_line);
        }
        enabled
    }

    /// Renders the playfield of the current line. `gtia` holds the GTIA write registers (colors
    /// and PRIOR). Returns the number of DMA cycles taken from the CPU.
    pub fn draw_line(&mut self, ram: &[u8], gtia: &[u8], framebuffer: &mut Framebuffer) -> u64 {
        playfield::draw_line(&mut self.state, ram, gtia, framebuffer)
    }
}
