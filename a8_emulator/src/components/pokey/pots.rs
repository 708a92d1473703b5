//! Paddle (POT0-7) scanning. A scan counts up once per 28 cycles after POTGO and latches each
//! pot when the count reaches the paddle's position.
use bitcode::Decode;
use bitcode::Encode;

use crate::common::scheduler::Cycle;

pub const POT_MAX: u8 = 228;
const CYCLES_PER_COUNT: u64 = 28;

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct PotScan {
    /// Paddle positions, 0..=228.
    targets: [u8; 8],
    readback: [u8; 8],
    latched: [bool; 8],
    allpot: u8,
    active: bool,
    start: Cycle,
}

impl Default for PotScan {
    fn default() -> Self {
        Self {
            targets: [POT_MAX; 8],
            readback: [0xFF; 8],
            latched: [false; 8],
            allpot: 0xFF,
            active: false,
            start: 0,
        }
    }
}

impl PotScan {
    pub fn start(&mut self, now: Cycle) {
        self.active = true;
        self.start = now;
        self.allpot = 0xFF;
        self.latched = [false; 8];
        self.readback = [0; 8];
    }

    pub fn set_target(&mut self, pot: usize, value: u8) {
        self.targets[pot] = value.min(POT_MAX);
    }

    /// Advances the scan to `now`.
    pub fn update(&mut self, now: Cycle) {
        if !self.active {
            return;
        }
        let count = (now.saturating_sub(self.start) / CYCLES_PER_COUNT).min(255) as u8;
        let mut pending = false;
        for pot in 0..8 {
            if self.latched[pot] {
                continue;
            }
            pending = true;
            let target = self.targets[pot];
            if count >= target {
                self.latched[pot] = true;
                self.readback[pot] = target;
                self.allpot &= !(1 << pot);
            } else {
                self.readback[pot] = count.min(POT_MAX);
            }
        }
        if !pending || self.allpot == 0 {
            self.active = false;
        }
    }

    pub fn value(&self, pot: usize) -> u8 {
        self.readback[pot]
    }

    pub fn allpot(&self) -> u8 {
        self.allpot
    }
}
