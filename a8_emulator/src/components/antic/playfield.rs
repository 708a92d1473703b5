//! Playfield rendering: turns one scanline of the current display list mode into palette
//! indices and priority bits in the framebuffer.
use super::fixed_add;
use super::AnticState;
use crate::common::constants::gtia;
use crate::common::constants::ANTIC_MODE_INFO;
use crate::common::constants::FIRST_VISIBLE_LINE;
use crate::common::constants::LAST_VISIBLE_LINE;
use crate::common::constants::PIXELS_PER_LINE;
use crate::common::constants::PRIORITY_TABLE_BKG_PF012;
use crate::common::constants::PRIORITY_TABLE_BKG_PF013;
use crate::common::constants::PRIORITY_TABLE_PF0123;
use crate::common::constants::PRIO_BKG;
use crate::common::constants::PRIO_PF0;
use crate::common::constants::PRIO_PF1;
use crate::common::constants::PRIO_PF2;
use crate::common::framebuffer::Framebuffer;

/// Screen memory counters wrap inside a 4K block.
const SCREEN_MEMORY_MASK: u16 = 0x0FFF;

/// Renders the current line. Returns the number of bytes fetched from screen memory, which is
/// also the number of cycles the CPU loses to DMA.
pub(super) fn draw_line(
    state: &mut AnticState,
    ram: &[u8],
    gtia: &[u8],
    framebuffer: &mut Framebuffer,
) -> u64 {
    let y = state.current_line as usize;
    if !(FIRST_VISIBLE_LINE..=LAST_VISIBLE_LINE).contains(&y) {
        return 0;
    }
    let line_start = Framebuffer::line_offset(y);

    let colbk = gtia[gtia::COLBK as usize];
    let background = match gtia[gtia::PRIOR as usize] >> 6 {
        2 => gtia[gtia::COLPM0_TRIG2 as usize],
        3 => colbk & 0xF0,
        _ => colbk,
    };

    let width = state.dmactl & 0x03;
    let command = state.display_list_command;
    let mode = command & 0x0F;
    if state.dmactl & 0x20 == 0 || width == 0 || mode < 2 {
        framebuffer.fill(line_start, PIXELS_PER_LINE, background, PRIO_BKG);
        return 0;
    }

    // Narrow, normal and wide playfields.
    let playfield_pixels = 192 + width as usize * 64;
    let (left_border, right_border, mut dest) = match width {
        1 => (128, 72, 128),
        2 => (96, 40, 96),
        // Wide starts 24 pixels early so horizontal scrolling can shift it right.
        _ => (88, 16, 64),
    };
    let mut bytes_per_line =
        playfield_pixels / ANTIC_MODE_INFO[mode as usize].pixels_per_byte as usize;
    if command & 0x10 != 0 {
        let hscrol = state.hscrol as usize * 2;
        if width != 3 {
            dest = dest + hscrol - 32;
            bytes_per_line += 8;
        } else {
            dest += hscrol;
        }
    }

    let line_delta = state.next_display_list_line as i32 - state.current_line as i32;
    let start_address = state.display_memory_address;
    if line_delta == 1 {
        // Mode 3 advances without the 4K wrap.
        state.display_memory_address = if mode == 3 {
            start_address.wrapping_add(bytes_per_line as u16)
        } else {
            fixed_add(start_address, SCREEN_MEMORY_MASK, bytes_per_line as u16)
        };
    }

    let mut renderer = LineRenderer {
        ram,
        gtia,
        framebuffer: &mut *framebuffer,
        dest: line_start + dest,
        address: start_address,
        chactl: state.chactl,
        chbase: state.chbase,
    };
    let vertical_scroll_offset = state.vertical_scroll_offset as i32;
    let row_8 = (8 - line_delta - vertical_scroll_offset) as u8;
    let row_16 = ((16 - line_delta - vertical_scroll_offset) >> 1) as u8;

    match mode {
        2 => renderer.text_hires(bytes_per_line, row_8),
        3 => renderer.text_descenders(bytes_per_line, line_delta),
        4 => renderer.text_four_color(bytes_per_line, 0xFC00, row_8),
        5 => renderer.text_four_color(bytes_per_line, 0xFE00, row_16),
        6 => renderer.text_five_color(bytes_per_line, row_8),
        7 => renderer.text_five_color(bytes_per_line, row_16),
        8 => renderer.map_four_color(bytes_per_line, 8),
        9 => renderer.map_two_color(bytes_per_line, 4),
        0x0A => renderer.map_four_color(bytes_per_line, 4),
        0x0B | 0x0C => renderer.map_two_color(bytes_per_line, 2),
        0x0D | 0x0E => renderer.map_four_color(bytes_per_line, 2),
        // 0x0F
        _ => renderer.map_hires(bytes_per_line),
    }

    framebuffer.fill(line_start, left_border, background, PRIO_BKG);
    framebuffer.fill(
        line_start + playfield_pixels + left_border,
        right_border,
        background,
        PRIO_BKG,
    );
    bytes_per_line as u64
}

/// Splits a character code into glyph index and inverse flag according to CHACTL.
fn decode_character(code: u8, chactl: u8) -> (u8, bool) {
    if code & 0x80 == 0 {
        (code, false)
    } else if chactl & 0x01 != 0 {
        // Blank
        (0, false)
    } else {
        (code & 0x7F, chactl & 0x02 != 0)
    }
}

struct LineRenderer<'a> {
    ram: &'a [u8],
    gtia: &'a [u8],
    framebuffer: &'a mut Framebuffer,
    dest: usize,
    address: u16,
    chactl: u8,
    chbase: u8,
}

impl LineRenderer<'_> {
    fn next_byte(&mut self) -> u8 {
        let value = self.ram[self.address as usize];
        self.address = fixed_add(self.address, SCREEN_MEMORY_MASK, 1);
        value
    }

    fn glyph_row(&self, base_mask: u16, character: u8, row: u8) -> u8 {
        let base = ((self.chbase as u16) << 8) & base_mask;
        let address = base
            .wrapping_add(character as u16 * 8)
            .wrapping_add(row as u16);
        self.ram[address as usize]
    }

    fn color(&self, register: u8) -> u8 {
        self.gtia[register as usize]
    }

    fn put(&mut self, count: usize, color: u8, priority: u8) {
        self.framebuffer.fill(self.dest, count, color, priority);
        self.dest += count;
    }

    /// Colors for the two pixel values of the hires modes (2, 3 and F).
    fn hires_colors(&self, inverse: bool) -> [(u8, u8); 2] {
        let pf2 = self.color(gtia::COLPF2);
        let luminance = (pf2 & 0xF0) | (self.color(gtia::COLPF1) & 0x0F);
        if inverse {
            [(luminance, PRIO_PF1), (pf2, PRIO_PF2)]
        } else {
            [(pf2, PRIO_PF2), (luminance, PRIO_PF1)]
        }
    }

    fn hires_byte(&mut self, data: u8, colors: [(u8, u8); 2]) {
        for bit in (0..8).rev() {
            let (color, priority) = colors[((data >> bit) & 1) as usize];
            self.put(1, color, priority);
        }
    }

    /// GTIA modes reinterpret hires data as two 4 bit pixels per byte.
    fn gtia_byte(&mut self, data: u8, prior_mode: u8) {
        let colbk = self.color(gtia::COLBK);
        for nibble in [data >> 4, data & 0x0F] {
            let color = match prior_mode {
                // 16 luminances of the background hue
                1 => colbk | nibble,
                // 9 colors from the color registers
                2 => self.color(GTIA_COLOR_REGISTERS[nibble as usize]),
                // 16 hues of the background luminance
                _ if nibble != 0 => colbk | (nibble << 4),
                _ => colbk & 0xF0,
            };
            self.put(4, color, PRIO_BKG);
        }
    }

    fn hires_or_gtia(&mut self, data: u8, inverse: bool) {
        let prior_mode = self.color(gtia::PRIOR) >> 6;
        if prior_mode == 0 {
            let colors = self.hires_colors(inverse);
            self.hires_byte(data, colors);
        } else {
            self.gtia_byte(data, prior_mode);
        }
    }

    /// Mode 2: 40 column text.
    fn text_hires(&mut self, bytes: usize, row: u8) {
        for _ in 0..bytes {
            let (character, inverse) = decode_character(self.next_byte(), self.chactl);
            let data = self.glyph_row(0xFC00, character, row);
            self.hires_or_gtia(data, inverse);
        }
    }

    /// Mode 3: 10 scanline text where the lower quarter of the character set is drawn with
    /// descenders.
    fn text_descenders(&mut self, bytes: usize, line_delta: i32) {
        for _ in 0..bytes {
            let (character, inverse) = decode_character(self.next_byte(), self.chactl);
            let data = if character < 0x60 {
                if line_delta > 2 {
                    self.glyph_row(0xFC00, character, (10 - line_delta) as u8)
                } else {
                    0
                }
            } else if line_delta > 8 {
                0
            } else if line_delta > 2 {
                self.glyph_row(0xFF00, character, (10 - line_delta) as u8)
            } else {
                self.glyph_row(0xFF00, character, (2 - line_delta) as u8)
            };
            let colors = self.hires_colors(inverse);
            self.hires_byte(data, colors);
        }
    }

    /// Modes 4 and 5: four color text, inverse characters swap PF2 for PF3.
    fn text_four_color(&mut self, bytes: usize, base_mask: u16, row: u8) {
        let colbk = self.color(gtia::COLBK);
        let pf0 = self.color(gtia::COLPF0);
        let pf1 = self.color(gtia::COLPF1);
        let normal = [colbk, pf0, pf1, self.color(gtia::COLPF2)];
        let inverse = [colbk, pf0, pf1, self.color(gtia::COLPF3)];
        for _ in 0..bytes {
            let (character, inverted) = decode_character(self.next_byte(), self.chactl);
            let (colors, priorities) = if inverted {
                (inverse, PRIORITY_TABLE_BKG_PF013)
            } else {
                (normal, PRIORITY_TABLE_BKG_PF012)
            };
            let data = self.glyph_row(base_mask, character, row);
            self.two_bit_pixels(data, 2, colors, priorities);
        }
    }

    /// Modes 6 and 7: 20 column text, the top two bits of the character select the color.
    fn text_five_color(&mut self, bytes: usize, row: u8) {
        let colbk = self.color(gtia::COLBK);
        for _ in 0..bytes {
            let code = self.next_byte();
            let select = (code >> 6) as usize;
            let color = self.color(gtia::COLPF0 + select as u8);
            let data = self.glyph_row(0xFE00, code & 0x3F, row);
            for bit in (0..8).rev() {
                if data & (1 << bit) != 0 {
                    self.put(2, color, PRIORITY_TABLE_PF0123[select]);
                } else {
                    self.put(2, colbk, PRIO_BKG);
                }
            }
        }
    }

    fn two_bit_pixels(&mut self, data: u8, width: usize, colors: [u8; 4], priorities: [u8; 4]) {
        for shift in [6, 4, 2, 0] {
            let index = ((data >> shift) & 0x03) as usize;
            self.put(width, colors[index], priorities[index]);
        }
    }

    /// Modes 8, A, D and E.
    fn map_four_color(&mut self, bytes: usize, width: usize) {
        let colors = [
            self.color(gtia::COLBK),
            self.color(gtia::COLPF0),
            self.color(gtia::COLPF1),
            self.color(gtia::COLPF2),
        ];
        for _ in 0..bytes {
            let data = self.next_byte();
            self.two_bit_pixels(data, width, colors, PRIORITY_TABLE_BKG_PF012);
        }
    }

    /// Modes 9, B and C.
    fn map_two_color(&mut self, bytes: usize, width: usize) {
        let colbk = self.color(gtia::COLBK);
        let pf0 = self.color(gtia::COLPF0);
        for _ in 0..bytes {
            let data = self.next_byte();
            for bit in (0..8).rev() {
                if data & (1 << bit) != 0 {
                    self.put(width, pf0, PRIO_PF0);
                } else {
                    self.put(width, colbk, PRIO_BKG);
                }
            }
        }
    }

    /// Mode F: 320 pixel bitmap, or the GTIA modes when PRIOR selects one.
    fn map_hires(&mut self, bytes: usize) {
        for _ in 0..bytes {
            let data = self.next_byte();
            self.hires_or_gtia(data, false);
        }
    }
}

/// Color registers addressed by a pixel value in the 9 color GTIA mode.
const GTIA_COLOR_REGISTERS: [u8; 16] = [
    gtia::COLPM0_TRIG2,
    gtia::COLPM1_TRIG3,
    gtia::COLPM2_PAL,
    gtia::COLPM3,
    gtia::COLPF0,
    gtia::COLPF1,
    gtia::COLPF2,
    gtia::COLPF3,
    gtia::COLBK,
    gtia::COLBK,
    gtia::COLBK,
    gtia::COLBK,
    gtia::COLPF0,
    gtia::COLPF1,
    gtia::COLPF2,
    gtia::COLPF3,
];
