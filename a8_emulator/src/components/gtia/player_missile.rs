//! Player/missile graphics. Runs after the playfield of a line has been drawn and uses the
//! priority plane the playfield renderer left behind.
use super::GtiaState;
use crate::common::constants::gtia;
use crate::common::constants::PIXELS_PER_LINE;
use crate::common::constants::PRIO_PF0;
use crate::common::constants::PRIO_PF1;
use crate::common::constants::PRIO_PF2;
use crate::common::constants::PRIO_PF3;
use crate::common::constants::PRIO_PM0;
use crate::common::constants::PRIO_PM1;
use crate::common::constants::PRIO_PM2;
use crate::common::constants::PRIO_PM3;
use crate::common::constants::VBI_LINE;
use crate::common::framebuffer::Framebuffer;

const PRIO_PF: u8 = PRIO_PF0 | PRIO_PF1 | PRIO_PF2 | PRIO_PF3;
const PRIO_PM: u8 = PRIO_PM0 | PRIO_PM1 | PRIO_PM2 | PRIO_PM3;

// Collision register read offsets
const P0PF: usize = 0x04;
const P0PL: usize = 0x0C;
const M0PF: usize = 0x00;
const M0PL: usize = 0x08;

pub(super) struct LineContext {
    pub line: usize,
    pub antic_mode: u8,
    pub dmactl: u8,
    pub pmbase: u8,
}

/// Masks of the objects drawn in front of player `index` for the PRIOR register.
fn player_priority_mask(index: usize, prior: u8) -> u8 {
    // Lower numbered players are always in front.
    let players_in_front = [
        0,
        PRIO_PM0,
        PRIO_PM0 | PRIO_PM1,
        PRIO_PM0 | PRIO_PM1 | PRIO_PM2,
    ][index];
    if prior & 0x01 != 0 {
        players_in_front
    } else if prior & 0x02 != 0 {
        // PM0 and PM1 in front of the playfield, PM2 and PM3 behind.
        match index {
            0 | 1 => players_in_front,
            _ => players_in_front | PRIO_PF,
        }
    } else if prior & 0x04 != 0 {
        players_in_front | PRIO_PF
    } else if prior & 0x08 != 0 {
        players_in_front | PRIO_PF0 | PRIO_PF1
    } else {
        0
    }
}

fn missile_priority_mask(index: usize, prior: u8) -> u8 {
    if prior & 0x10 == 0 {
        return player_priority_mask(index, prior);
    }
    // Fifth player: all missiles share PF3's color and priority.
    if prior & 0x01 != 0 {
        PRIO_PM
    } else if prior & 0x02 != 0 {
        PRIO_PM0 | PRIO_PM1
    } else if prior & 0x04 != 0 {
        0
    } else if prior & 0x08 != 0 {
        PRIO_PM
    } else {
        0
    }
}

/// Player 1 and 3 colors are ORed into players 0 and 2 where they overlap.
fn overlap_mask(index: usize, prior: u8) -> u8 {
    if prior & 0x20 == 0 {
        return 0;
    }
    match index {
        0 => PRIO_PM1,
        2 => PRIO_PM3,
        _ => 0,
    }
}

/// In the hires modes players only take the hue of the playfield where it is lit.
fn remap_hires_collision(collision: u8, special: bool) -> u8 {
    if !special {
        return collision;
    }
    let pf1 = if collision & PRIO_PF1 != 0 { PRIO_PF2 } else { 0 };
    (collision & !(PRIO_PF1 | PRIO_PF2)) | pf1
}

struct Object {
    color: u8,
    priority_mask: u8,
    special: bool,
}

impl Object {
    fn draw_pixel(&self, framebuffer: &mut Framebuffer, index: usize, overlap: u8) {
        let priority = framebuffer.priority[index];
        let pixel = &mut framebuffer.pixels[index];
        if overlap != 0 && priority & overlap != 0 {
            if self.special && priority & PRIO_PF1 != 0 {
                *pixel |= self.color & 0xF0;
            } else if priority & self.priority_mask == 0 {
                *pixel |= self.color;
            }
        } else if self.special && priority & PRIO_PF1 != 0 {
            *pixel = (*pixel & 0x0F) | (self.color & 0xF0);
        } else if priority & self.priority_mask == 0 {
            *pixel = self.color;
        }
    }
}

fn draw_player(
    framebuffer: &mut Framebuffer,
    object: &Object,
    start: usize,
    size: u8,
    data: u8,
    priority_bit: u8,
    overlap: u8,
) -> u8 {
    let width = match size & 0x03 {
        1 => 4,
        3 => 8,
        _ => 2,
    };
    let end = framebuffer.pixels.len();
    let mut collision = 0;
    for bit in 0..8 {
        if data & (0x80 >> bit) == 0 {
            continue;
        }
        let first = start + bit * width;
        for index in first..(first + width).min(end) {
            object.draw_pixel(framebuffer, index, overlap);
            framebuffer.priority[index] |= priority_bit;
            collision |= framebuffer.priority[index];
        }
    }
    remap_hires_collision(collision, object.special)
}

/// Missiles are two pixels wide objects that neither set nor respect other missiles'
/// priority bits.
fn draw_missile(
    framebuffer: &mut Framebuffer,
    object: &Object,
    index: usize,
    start: usize,
    sizem: u8,
    data: u8,
) -> u8 {
    let shift = index * 2;
    let width = match (sizem >> shift) & 0x03 {
        1 => 4,
        3 => 8,
        _ => 2,
    };
    let end = framebuffer.pixels.len();
    let mut collision = 0;
    for (half, mask) in [0x02_u8, 0x01].into_iter().enumerate() {
        if data & (mask << shift) == 0 {
            continue;
        }
        let first = start + half * width;
        for pixel in first..(first + width).min(end) {
            collision |= framebuffer.priority[pixel];
            object.draw_pixel(framebuffer, pixel, 0);
        }
    }
    remap_hires_collision(collision, object.special)
}

pub(super) fn draw_line(
    state: &mut GtiaState,
    context: LineContext,
    ram: &[u8],
    framebuffer: &mut Framebuffer,
) {
    let y = context.line;
    if y >= VBI_LINE {
        return;
    }
    let registers = &mut state.registers;
    let prior = registers[gtia::PRIOR as usize];
    let special = matches!(context.antic_mode, 0x02 | 0x03 | 0x0F) && prior & 0xC0 == 0;
    let hires = context.dmactl & 0x10 != 0;
    let gractl = registers[gtia::GRACTL as usize];
    let player_dma = context.dmactl & 0x08 != 0 && gractl & 0x02 != 0;
    let missile_dma = context.dmactl & 0x04 != 0 && gractl & 0x01 != 0;
    let vdelay = registers[gtia::VDELAY as usize];
    let pmbase = (context.pmbase as u16) << 8;

    // Offset of the object's table within the single line (hires) or double line PM area.
    let pm_address = |hires_offset: u16, vdelay_mask: u8| -> usize {
        let delay = (vdelay & vdelay_mask != 0) as u16;
        let address = if hires {
            (pmbase & 0xF800)
                .wrapping_add(hires_offset)
                .wrapping_add((y as u16).wrapping_sub(delay))
        } else {
            (pmbase & 0xFC00)
                .wrapping_add(hires_offset / 2)
                .wrapping_add(((y / 2) as u16).wrapping_sub(delay))
        };
        address as usize
    };
    let line_start = y * PIXELS_PER_LINE;

    // Players are drawn back to front so lower numbered ones win.
    for index in (0..4).rev() {
        let graf = gtia::GRAFP0_P1PL as usize + index;
        if player_dma {
            registers[graf] = ram[pm_address(1024 + 256 * index as u16, 0x10 << index)];
        }
        let data = registers[graf];
        let hpos = registers[gtia::HPOSP0_M0PF as usize + index];
        if data == 0 || hpos == 0 {
            continue;
        }
        let object = Object {
            color: registers[gtia::COLPM0_TRIG2 as usize + index],
            priority_mask: player_priority_mask(index, prior),
            special,
        };
        let collision = draw_player(
            framebuffer,
            &object,
            line_start + hpos as usize * 2,
            registers[gtia::SIZEP0_M0PL as usize + index],
            data,
            PRIO_PM0 << index,
            overlap_mask(index, prior),
        );

        let collisions = &mut state.collisions;
        collisions[P0PF + index] |= collision & 0x0F;
        // Player to player hits are recorded in both players' registers.
        for other in (index + 1)..4 {
            if collision & (PRIO_PM0 << other) != 0 {
                collisions[P0PL + other] |= 1 << index;
            }
        }
        collisions[P0PL + index] |= (collision >> 4) & !(1 << index);
    }

    let graf = gtia::GRAFM_TRIG1 as usize;
    if missile_dma {
        registers[graf] = ram[pm_address(768, 0x08)];
    }
    let data = registers[graf];
    let sizem = registers[gtia::SIZEM_P0PL as usize];
    for index in (0..4).rev() {
        let hpos = registers[gtia::HPOSM0_P0PF as usize + index];
        if data & (0x03 << (index * 2)) == 0 || hpos == 0 {
            continue;
        }
        let color = if prior & 0x10 != 0 {
            registers[gtia::COLPF3 as usize]
        } else {
            registers[gtia::COLPM0_TRIG2 as usize + index]
        };
        let object = Object {
            color,
            priority_mask: missile_priority_mask(index, prior),
            special,
        };
        let collision = draw_missile(
            framebuffer,
            &object,
            index,
            line_start + hpos as usize * 2,
            sizem,
            data,
        );
        state.collisions[M0PF + index] |= collision & 0x0F;
        state.collisions[M0PL + index] |= collision >> 4;
    }
}
