//! POKEY sound generation.
//!
//! The four channels are simulated at CPU cycle resolution and resampled to the host rate with
//! a 32.32 fixed-point phase accumulator. Stretches of cycles without any divider pulse are
//! skipped in bulk, so the cost of a sync is proportional to the number of pulses and output
//! samples rather than to the number of cycles.
use bilge::prelude::*;
use log::debug;

use crate::common::constants::pokey;
use crate::common::constants::ATARI_CPU_HZ_PAL;
use crate::common::constants::CYCLES_PER_LINE;
use crate::common::scheduler::Cycle;
use crate::common::util::RingBuffer;

/// 1.0 in the 32.32 fixed-point cycles-per-sample representation.
pub const FIXED_POINT_ONE: u64 = 1 << 32;
pub const RING_SIZE: usize = 4096;
pub const DEFAULT_TARGET_BUFFER_SAMPLES: usize = 512;
const MIX_GAIN: f64 = 0.35;
const DC_BLOCK_HZ: f64 = 20.0;
/// The rate adjustment of the fill level feedback is limited to 1/40th (2.5%).
const MAX_ADJUST_DIVISOR: u64 = 40;
const MAX_CATCHUP_CYCLES: u64 = 100_000;
const SLOW_CLOCK_CYCLES: u32 = 28;

#[bitsize(8)]
#[derive(Clone, Copy, DebugBits, Default, FromBits, PartialEq)]
pub(crate) struct Audctl {
    pub clock_15khz: bool,
    pub high_pass_2: bool,
    pub high_pass_1: bool,
    pub join_3_4: bool,
    pub join_1_2: bool,
    pub fast_3: bool,
    pub fast_1: bool,
    pub poly9: bool,
}

impl Audctl {
    /// Divider of the channels not running at CPU speed.
    pub(crate) fn base_clock(&self) -> u32 {
        if self.clock_15khz() {
            CYCLES_PER_LINE as u32
        } else {
            SLOW_CLOCK_CYCLES
        }
    }
}

#[bitsize(8)]
#[derive(Clone, Copy, DebugBits, Default, FromBits, PartialEq)]
struct Audc {
    volume: u4,
    volume_only: bool,
    distortion: u3,
}

pub(crate) fn step_poly4(value: u8) -> u8 {
    let feedback = !((value >> 2) ^ (value >> 3)) & 1;
    ((value << 1) | feedback) & 0x0F
}

pub(crate) fn step_poly5(value: u8) -> u8 {
    let feedback = !((value >> 2) ^ (value >> 4)) & 1;
    ((value << 1) | feedback) & 0x1F
}

pub(crate) fn step_poly9(value: u16) -> u16 {
    let feedback = (value ^ (value >> 5)) & 1;
    ((value >> 1) | (feedback << 8)) & 0x1FF
}

pub(crate) fn step_poly17(value: u32) -> u32 {
    let feedback = ((value >> 8) ^ (value >> 13)) & 1;
    let carry = value & 1;
    let shifted = value >> 1;
    let shifted = (shifted & 0xFF7F) | (feedback << 7);
    ((shifted & 0xFFFF) | (carry << 16)) & 0x1FFFF
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PolyCounters {
    poly4: u8,
    poly5: u8,
    poly9: u16,
    poly17: u32,
}

impl Default for PolyCounters {
    fn default() -> Self {
        Self {
            poly4: 0x00,
            poly5: 0x00,
            poly9: 0x1FF,
            poly17: 0x1FFFF,
        }
    }
}

impl PolyCounters {
    fn step(&mut self) {
        self.poly4 = step_poly4(self.poly4);
        self.poly5 = step_poly5(self.poly5);
        self.poly9 = step_poly9(self.poly9);
        self.poly17 = step_poly17(self.poly17);
    }

    /// Advances all counters by `cycles` steps, reduced by each counter's period.
    fn advance(&mut self, cycles: u64) {
        for _ in 0..cycles % 15 {
            self.poly4 = step_poly4(self.poly4);
        }
        for _ in 0..cycles % 31 {
            self.poly5 = step_poly5(self.poly5);
        }
        for _ in 0..cycles % 511 {
            self.poly9 = step_poly9(self.poly9);
        }
        for _ in 0..cycles % 131_071 {
            self.poly17 = step_poly17(self.poly17);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Channel {
    audf: u8,
    audc: u8,
    counter: u32,
    output: bool,
    clock_divider: u32,
    clock_accumulator: u32,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            audf: 0,
            audc: 0,
            counter: 1,
            output: false,
            clock_divider: SLOW_CLOCK_CYCLES,
            clock_accumulator: 0,
        }
    }
}

impl Channel {
    /// Cycles until this channel's counter, clocked by `clock`, reaches zero.
    fn cycles_until_pulse(&self, clock: &Channel) -> u64 {
        let counter = self.counter.max(1) as u64;
        let divider = clock.clock_divider as u64;
        if divider <= 1 {
            return counter;
        }
        let first_tick = divider
            .saturating_sub(clock.clock_accumulator as u64)
            .max(1);
        first_tick + (counter - 1) * divider
    }

    /// Advances the prescaler by `cycles`. Returns the number of counter ticks.
    fn advance_clock(&mut self, cycles: u64) -> u64 {
        let divider = self.clock_divider as u64;
        if divider <= 1 {
            return cycles;
        }
        let accumulator = self.clock_accumulator as u64 + cycles;
        self.clock_accumulator = (accumulator % divider) as u32;
        accumulator / divider
    }

    /// Counts down without reaching zero, the caller guarantees no pulse happens.
    fn count_down(&mut self, ticks: u64) {
        self.counter = (self.counter as u64).saturating_sub(ticks).max(1) as u32;
    }
}

pub struct PokeyAudio {
    sample_rate: u32,
    cpu_hz: u64,
    cycles_per_sample_base: u64,
    cycles_per_sample: u64,
    target_buffer_samples: usize,
    fill_level_hint: Option<usize>,
    last_cycle: Cycle,
    sample_phase: u64,
    sample_accumulator: f64,
    sample_accumulator_count: u64,
    dc_block_r: f64,
    dc_block_x1: f64,
    dc_block_y1: f64,
    poly: PolyCounters,
    high_pass_latch: [bool; 2],
    audctl: Audctl,
    skctl: u8,
    channels: [Channel; 4],
    ring: RingBuffer<f32, RING_SIZE>,
    last_sample: f32,
}

impl PokeyAudio {
    pub fn new(sample_rate: u32) -> Self {
        let mut audio = Self {
            sample_rate: sample_rate.max(1),
            cpu_hz: ATARI_CPU_HZ_PAL,
            cycles_per_sample_base: 0,
            cycles_per_sample: 0,
            target_buffer_samples: DEFAULT_TARGET_BUFFER_SAMPLES,
            fill_level_hint: None,
            last_cycle: 0,
            sample_phase: 0,
            sample_accumulator: 0.0,
            sample_accumulator_count: 0,
            dc_block_r: 0.0,
            dc_block_x1: 0.0,
            dc_block_y1: 0.0,
            poly: PolyCounters::default(),
            high_pass_latch: [false; 2],
            audctl: Audctl::from(0_u8),
            skctl: 0,
            channels: [Channel::default(); 4],
            ring: RingBuffer::default(),
            last_sample: 0.0,
        };
        audio.recompute_cycles_per_sample();
        audio.recompute_dc_block();
        audio.recompute_clocks();
        debug!(
            "Audio engine at {}Hz, {:.3} cycles per sample",
            audio.sample_rate,
            audio.cycles_per_sample as f64 / FIXED_POINT_ONE as f64
        );
        audio
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the synthesis state to power-on. Rate settings are kept.
    pub fn reset(&mut self) {
        self.last_cycle = 0;
        self.sample_phase = 0;
        self.sample_accumulator = 0.0;
        self.sample_accumulator_count = 0;
        self.dc_block_x1 = 0.0;
        self.dc_block_y1 = 0.0;
        self.poly = PolyCounters::default();
        self.high_pass_latch = [false; 2];
        self.audctl = Audctl::from(0_u8);
        self.skctl = 0;
        self.channels = [Channel::default(); 4];
        self.recompute_clocks();
        self.clear();
    }

    /// Restarts sample generation at `cycle` without rendering the cycles before it.
    pub fn resync(&mut self, cycle: Cycle) {
        self.last_cycle = cycle;
    }

    pub fn set_turbo(&mut self, turbo: bool) {
        self.cpu_hz = ATARI_CPU_HZ_PAL * if turbo { 4 } else { 1 };
        self.recompute_cycles_per_sample();
    }

    /// Occupancy the rate feedback steers towards, clamped to [256, 3/4 of the ring].
    pub fn set_target_buffer_samples(&mut self, samples: usize) {
        self.target_buffer_samples = samples.clamp(256, RING_SIZE * 3 / 4);
    }

    pub fn target_buffer_samples(&self) -> usize {
        self.target_buffer_samples
    }

    /// Number of samples queued by the host. Without a hint the ring's own count is used.
    pub fn set_fill_level_hint(&mut self, samples: Option<usize>) {
        self.fill_level_hint = samples;
    }

    pub fn cycles_per_sample(&self) -> u64 {
        self.cycles_per_sample
    }

    pub fn poly17(&self) -> u32 {
        self.poly.poly17
    }

    pub fn samples_available(&self) -> usize {
        self.ring.len()
    }

    /// Removes up to `max` samples from the output ring.
    pub fn drain(&mut self, max: usize) -> Vec<f32> {
        let samples: Vec<f32> = self.ring.drain(max).collect();
        if let Some(&last) = samples.last() {
            self.last_sample = last;
        }
        samples
    }

    /// Fills `out` from the ring. Missing samples repeat the last sample value.
    pub fn consume(&mut self, out: &mut [f32]) {
        let mut count = 0;
        let len = out.len();
        for (slot, sample) in out.iter_mut().zip(self.ring.drain(len)) {
            *slot = sample;
            count += 1;
        }
        if count > 0 {
            self.last_sample = out[count - 1];
        }
        out[count..].fill(self.last_sample);
    }

    pub fn clear(&mut self) {
        self.ring.clear();
        self.last_sample = 0.0;
    }

    fn recompute_cycles_per_sample(&mut self) {
        let cycles = ((self.cpu_hz as u128 * FIXED_POINT_ONE as u128) / self.sample_rate as u128)
            .max(1) as u64;
        self.cycles_per_sample_base = cycles;
        self.cycles_per_sample = cycles;
    }

    fn recompute_dc_block(&mut self) {
        let r = (-2.0 * std::f64::consts::PI * DC_BLOCK_HZ / self.sample_rate as f64).exp();
        self.dc_block_r = r.clamp(0.0, 0.999999);
    }

    fn recompute_clocks(&mut self) {
        let base = self.audctl.base_clock();
        self.channels[0].clock_divider = if self.audctl.fast_1() { 1 } else { base };
        self.channels[1].clock_divider = base;
        self.channels[2].clock_divider = if self.audctl.fast_3() { 1 } else { base };
        self.channels[3].clock_divider = base;
    }

    /// Reload value of a single channel's counter.
    fn channel_reload(&self, index: usize) -> u32 {
        let fast = match index {
            0 => self.audctl.fast_1(),
            2 => self.audctl.fast_3(),
            _ => false,
        };
        self.channels[index].audf as u32 + if fast { 4 } else { 1 }
    }

    /// Reload value of the upper channel of a joined pair.
    fn pair_reload(&self, low: usize) -> u32 {
        let period =
            u16::from_le_bytes([self.channels[low].audf, self.channels[low + 1].audf]) as u32;
        let fast = match low {
            0 => self.audctl.fast_1(),
            _ => self.audctl.fast_3(),
        };
        period + if fast { 7 } else { 1 }
    }

    fn reload_counters(&mut self) {
        for low in [0, 2] {
            let joined = match low {
                0 => self.audctl.join_1_2(),
                _ => self.audctl.join_3_4(),
            };
            if joined {
                self.channels[low + 1].counter = self.pair_reload(low);
            } else {
                self.channels[low].counter = self.channel_reload(low);
                self.channels[low + 1].counter = self.channel_reload(low + 1);
            }
        }
    }

    /// Applies a register write. The caller syncs to the current cycle beforehand.
    pub fn on_register_write(&mut self, offset: u8, value: u8) {
        match offset {
            pokey::AUDF1_POT0 | pokey::AUDF2_POT2 | pokey::AUDF3_POT4 | pokey::AUDF4_POT6 => {
                let index = (offset / 2) as usize;
                self.channels[index].audf = value;
                self.channels[index].counter = self.channel_reload(index);
                let low = index & !1;
                let joined = match low {
                    0 => self.audctl.join_1_2(),
                    _ => self.audctl.join_3_4(),
                };
                if joined {
                    self.channels[low + 1].counter = self.pair_reload(low);
                }
            }
            pokey::AUDC1_POT1 | pokey::AUDC2_POT3 | pokey::AUDC3_POT5 | pokey::AUDC4_POT7 => {
                self.channels[(offset / 2) as usize].audc = value;
            }
            pokey::AUDCTL_ALLPOT => {
                self.audctl = Audctl::from(value);
                self.recompute_clocks();
                self.reload_counters();
            }
            pokey::STIMER_KBCODE => {
                for channel in self.channels.iter_mut() {
                    channel.clock_accumulator = 0;
                }
                self.reload_counters();
            }
            pokey::SKCTL_SKSTAT => {
                let old = self.skctl;
                self.skctl = value;
                // Bits 0-1 cleared hold the polynomials and prescalers in reset.
                if (old ^ value) & 0x03 != 0 && value & 0x03 == 0 {
                    self.poly = PolyCounters::default();
                    for channel in self.channels.iter_mut() {
                        channel.clock_accumulator = 0;
                    }
                    self.high_pass_latch = [false; 2];
                }
            }
            _ => (),
        }
    }

    fn is_running(&self) -> bool {
        self.skctl & 0x03 != 0
    }

    fn clock_out(&mut self, index: usize) {
        let audc = Audc::from(self.channels[index].audc);
        if audc.volume_only() {
            self.channels[index].output = true;
            return;
        }
        let distortion = audc.distortion().value();
        if distortion <= 3 && self.poly.poly5 & 1 == 0 {
            return;
        }
        let output = &mut self.channels[index].output;
        *output = match distortion {
            0 | 4 => {
                if self.audctl.poly9() {
                    self.poly.poly9 & 1 != 0
                } else {
                    self.poly.poly17 & 1 != 0
                }
            }
            2 | 6 => self.poly.poly4 & 1 != 0,
            _ => !*output,
        };
    }

    /// Advances the prescaler of `index` by one cycle. Returns true if it ticks the counter.
    fn tick_prescaler(&mut self, index: usize) -> bool {
        let channel = &mut self.channels[index];
        if channel.clock_divider == 1 {
            return true;
        }
        channel.clock_accumulator += 1;
        if channel.clock_accumulator >= channel.clock_divider {
            channel.clock_accumulator -= channel.clock_divider;
            true
        } else {
            false
        }
    }

    fn tick_channel(&mut self, index: usize) -> bool {
        let channel = &mut self.channels[index];
        channel.counter = channel.counter.saturating_sub(1);
        if channel.counter != 0 {
            return false;
        }
        let reload = self.channel_reload(index).max(1);
        self.channels[index].counter = reload;
        self.clock_out(index);
        true
    }

    fn tick_pair(&mut self, low: usize) -> bool {
        let high = &mut self.channels[low + 1];
        high.counter = high.counter.saturating_sub(1);
        if high.counter != 0 {
            return false;
        }
        self.channels[low + 1].counter = self.pair_reload(low).max(1);
        self.clock_out(low + 1);
        true
    }

    /// Clocks channels `low` and `low + 1`. Returns the pulses of (low, low + 1).
    fn step_pair(&mut self, low: usize, joined: bool) -> (bool, bool) {
        if joined {
            let pulse = self.tick_prescaler(low) && self.tick_pair(low);
            return (pulse, pulse);
        }
        let pulse_low = self.tick_prescaler(low) && self.tick_channel(low);
        let pulse_high = self.tick_prescaler(low + 1) && self.tick_channel(low + 1);
        (pulse_low, pulse_high)
    }

    fn step_cycle(&mut self) {
        if !self.is_running() {
            return;
        }
        self.poly.step();
        self.step_pair(0, self.audctl.join_1_2());
        let (pulse_3, pulse_4) = self.step_pair(2, self.audctl.join_3_4());

        if pulse_3 && self.audctl.high_pass_1() {
            self.high_pass_latch[0] = self.channels[0].output;
        }
        if pulse_4 && self.audctl.high_pass_2() {
            self.high_pass_latch[1] = self.channels[1].output;
        }
    }

    /// Cycles until the next counter pulse of any channel.
    fn cycles_until_next_pulse(&self) -> u64 {
        let mut next = u64::MAX;
        for low in [0, 2] {
            let joined = match low {
                0 => self.audctl.join_1_2(),
                _ => self.audctl.join_3_4(),
            };
            if joined {
                next = next.min(self.channels[low + 1].cycles_until_pulse(&self.channels[low]));
            } else {
                for index in [low, low + 1] {
                    let channel = &self.channels[index];
                    next = next.min(channel.cycles_until_pulse(channel));
                }
            }
        }
        next.max(1)
    }

    /// Advances `cycles` cycles during which no counter reaches zero.
    fn fast_forward(&mut self, cycles: u64) {
        if cycles == 0 {
            return;
        }
        self.poly.advance(cycles);
        for low in [0, 2] {
            let joined = match low {
                0 => self.audctl.join_1_2(),
                _ => self.audctl.join_3_4(),
            };
            if joined {
                let ticks = self.channels[low].advance_clock(cycles);
                self.channels[low + 1].count_down(ticks);
            } else {
                for channel in &mut self.channels[low..low + 2] {
                    let ticks = channel.advance_clock(cycles);
                    channel.count_down(ticks);
                }
            }
        }
    }

    /// Mix of the current channel outputs, centered in [-0.5, 0.5].
    fn mix_level(&self) -> f64 {
        let mut sum = 0_u32;
        for (index, channel) in self.channels.iter().enumerate() {
            if (index == 0 && self.audctl.join_1_2()) || (index == 2 && self.audctl.join_3_4()) {
                continue;
            }
            let audc = Audc::from(channel.audc);
            let volume = audc.volume().value() as u32;
            if volume == 0 {
                continue;
            }
            let mut bit = audc.volume_only() || channel.output;
            if !audc.volume_only() {
                if index == 0 && self.audctl.high_pass_1() {
                    bit ^= self.high_pass_latch[0];
                }
                if index == 1 && self.audctl.high_pass_2() {
                    bit ^= self.high_pass_latch[1];
                }
            }
            if bit {
                sum += volume;
            }
        }
        (sum.min(60) as f64 - 30.0) / 60.0
    }

    fn finalize_sample(&mut self, sample: f64) -> f32 {
        let scaled = sample * MIX_GAIN;
        let out = scaled - self.dc_block_x1 + self.dc_block_r * self.dc_block_y1;
        self.dc_block_x1 = scaled;
        self.dc_block_y1 = out;
        out.clamp(-1.0, 1.0) as f32
    }

    /// Steers the resampling rate towards the target buffer occupancy.
    fn adjust_rate(&mut self) {
        let base = self.cycles_per_sample_base as i64;
        let target = self.target_buffer_samples.max(1) as i64;
        let fill = self.fill_level_hint.unwrap_or(self.ring.len()) as i64;
        let delta = (fill - target).clamp(-target, target);
        let max_adjust = (base / MAX_ADJUST_DIVISOR as i64).max(1);
        let adjust = delta * max_adjust / target;
        self.cycles_per_sample = (base + adjust)
            .clamp(base - max_adjust, base + max_adjust)
            .max(1) as u64;
    }

    /// Renders all cycles up to `target` into the output ring.
    pub fn sync(&mut self, target: Cycle) {
        if target <= self.last_cycle {
            return;
        }
        self.adjust_rate();
        let cycles_per_sample = self.cycles_per_sample;
        let mut cycle = self.last_cycle.max(target.saturating_sub(MAX_CATCHUP_CYCLES));

        while cycle < target {
            let mut run = target - cycle;
            let running = self.is_running();
            let mut next_pulse = 0;
            if running {
                next_pulse = self.cycles_until_next_pulse();
                run = run.min(next_pulse);
            }

            let level = self.mix_level();
            let mut left = run;
            while left > 0 {
                let cycles_until_sample = (cycles_per_sample.saturating_sub(self.sample_phase)
                    + FIXED_POINT_ONE
                    - 1)
                    / FIXED_POINT_ONE;
                let batch = left.min(cycles_until_sample.max(1));
                self.sample_accumulator += level * batch as f64;
                self.sample_accumulator_count += batch;
                self.sample_phase += FIXED_POINT_ONE * batch;
                left -= batch;

                while self.sample_phase >= cycles_per_sample {
                    let sample = if self.sample_accumulator_count > 0 {
                        self.sample_accumulator / self.sample_accumulator_count as f64
                    } else {
                        level
                    };
                    self.sample_accumulator = 0.0;
                    self.sample_accumulator_count = 0;
                    let out = self.finalize_sample(sample);
                    self.ring.push(out);
                    self.sample_phase -= cycles_per_sample;
                }
            }

            if running {
                if run == next_pulse {
                    self.fast_forward(run - 1);
                    self.step_cycle();
                } else {
                    self.fast_forward(run);
                }
            }
            cycle += run;
        }
        self.last_cycle = target;
    }
}
