//! POKEY: sound channels, the three interval timers, keyboard scan registers, paddle scanning
//! and the RANDOM register.
//!
//! Serial I/O (SEROUT/SERIN) is routed to the disk drive by the machine, but the serial IRQ bits
//! live here together with all other IRQ sources.
mod audio;
mod pots;
#[cfg(test)]
mod test;

use bitcode::Decode;
use bitcode::Encode;
use log::debug;
use strum::IntoEnumIterator;

pub use self::audio::PokeyAudio;
pub use self::audio::DEFAULT_TARGET_BUFFER_SAMPLES;
use self::audio::step_poly17;
use self::audio::Audctl;
use self::pots::PotScan;
use crate::common::constants::pokey;
use crate::common::constants::IRQ_TIMER_1;
use crate::common::constants::IRQ_TIMER_2;
use crate::common::constants::IRQ_TIMER_4;
use crate::common::scheduler::Cycle;
use crate::common::scheduler::EventScheduler;
use crate::common::scheduler::TimedEvent;

const POLY17_PERIOD: u64 = 131_071;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::EnumIter, strum::Display)]
pub enum PokeyTimer {
    Timer1,
    Timer2,
    Timer4,
}

impl PokeyTimer {
    pub fn event(self) -> TimedEvent {
        match self {
            Self::Timer1 => TimedEvent::Timer1,
            Self::Timer2 => TimedEvent::Timer2,
            Self::Timer4 => TimedEvent::Timer4,
        }
    }

    pub fn irq_mask(self) -> u8 {
        match self {
            Self::Timer1 => IRQ_TIMER_1,
            Self::Timer2 => IRQ_TIMER_2,
            Self::Timer4 => IRQ_TIMER_4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct PokeyState {
    audf: [u8; 4],
    audc: [u8; 4],
    audctl: u8,
    skctl: u8,
    irqen: u8,
    /// Active low: a cleared bit is a pending interrupt.
    irqst: u8,
    kbcode: u8,
    skstat: u8,
    /// Standalone RANDOM generator, used while the audio engine is disabled.
    poly17: u32,
    poly17_cycle: Cycle,
    pots: PotScan,
}

impl Default for PokeyState {
    fn default() -> Self {
        Self {
            audf: [0; 4],
            audc: [0; 4],
            audctl: 0,
            skctl: 0,
            irqen: 0,
            irqst: 0xFF,
            kbcode: 0xFF,
            skstat: 0xFF,
            poly17: 0x1FFFF,
            poly17_cycle: 0,
            pots: PotScan::default(),
        }
    }
}

#[derive(Default)]
pub struct Pokey {
    state: PokeyState,
    audio: Option<PokeyAudio>,
}

impl Pokey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets all registers. The audio engine is kept but returned to its power-on state.
    pub fn reset(&mut self) {
        self.state = PokeyState::default();
        if let Some(audio) = self.audio.as_mut() {
            audio.reset();
        }
    }

    pub fn save_state(&self) -> PokeyState {
        self.state.clone()
    }

    /// Restores the registers and rebuilds the audio engine from them, starting at `now`.
    pub fn load_state(&mut self, state: PokeyState, now: Cycle) {
        self.state = state;
        if let Some(audio) = self.audio.as_mut() {
            audio.reset();
            Self::replay_registers(&self.state, audio);
            audio.resync(now);
        }
    }

    fn replay_registers(state: &PokeyState, audio: &mut PokeyAudio) {
        audio.on_register_write(pokey::SKCTL_SKSTAT, state.skctl);
        audio.on_register_write(pokey::AUDCTL_ALLPOT, state.audctl);
        for channel in 0..4 {
            let offset = channel as u8 * 2;
            audio.on_register_write(offset, state.audf[channel]);
            audio.on_register_write(offset + 1, state.audc[channel]);
        }
    }

    /// Creates the audio engine, synchronized to the current registers.
    pub fn enable_audio(&mut self, sample_rate: u32, target_buffer_samples: usize, now: Cycle) {
        let mut audio = PokeyAudio::new(sample_rate);
        audio.set_target_buffer_samples(target_buffer_samples);
        Self::replay_registers(&self.state, &mut audio);
        audio.resync(now);
        self.audio = Some(audio);
    }

    pub fn disable_audio(&mut self) {
        self.audio = None;
    }

    pub fn audio(&self) -> Option<&PokeyAudio> {
        self.audio.as_ref()
    }

    pub fn audio_mut(&mut self) -> Option<&mut PokeyAudio> {
        self.audio.as_mut()
    }

    pub fn sync_audio(&mut self, now: Cycle) {
        if let Some(audio) = self.audio.as_mut() {
            audio.sync(now);
        }
    }

    /// Brings the RANDOM generator up to `now`.
    fn sync_poly17(&mut self, now: Cycle) {
        if let Some(audio) = self.audio.as_mut() {
            audio.sync(now);
            self.state.poly17 = audio.poly17();
        } else if self.state.skctl & 0x03 == 0 {
            self.state.poly17 = 0x1FFFF;
        } else {
            let steps = now.saturating_sub(self.state.poly17_cycle) % POLY17_PERIOD;
            for _ in 0..steps {
                self.state.poly17 = step_poly17(self.state.poly17);
            }
        }
        self.state.poly17_cycle = now;
    }

    pub fn bus_read(&mut self, offset: u8, now: Cycle) -> u8 {
        match offset {
            pokey::AUDF1_POT0..=pokey::AUDC4_POT7 | pokey::AUDCTL_ALLPOT => {
                self.state.pots.update(now)
            }
            pokey::SKREST_RANDOM | pokey::SKCTL_SKSTAT => self.sync_poly17(now),
            _ => (),
        }
        self.bus_peek(offset)
    }

    pub fn bus_peek(&self, offset: u8) -> u8 {
        match offset {
            pokey::AUDF1_POT0..=pokey::AUDC4_POT7 => self.state.pots.value(offset as usize),
            pokey::AUDCTL_ALLPOT => self.state.pots.allpot(),
            pokey::STIMER_KBCODE => self.state.kbcode,
            pokey::SKREST_RANDOM => (self.state.poly17 & 0xFF) as u8,
            pokey::IRQEN_IRQST => self.state.irqst,
            pokey::SKCTL_SKSTAT => self.state.skstat,
            _ => 0xFF,
        }
    }

    pub fn bus_write(&mut self, offset: u8, value: u8, now: Cycle, scheduler: &mut EventScheduler) {
        match offset {
            pokey::AUDF1_POT0..=pokey::AUDC4_POT7 | pokey::AUDCTL_ALLPOT => {
                self.sync_audio(now);
                match offset {
                    pokey::AUDCTL_ALLPOT => self.state.audctl = value,
                    _ if offset % 2 == 0 => self.state.audf[offset as usize / 2] = value,
                    _ => self.state.audc[offset as usize / 2] = value,
                }
                if let Some(audio) = self.audio.as_mut() {
                    audio.on_register_write(offset, value);
                }
            }
            pokey::STIMER_KBCODE => {
                self.sync_audio(now);
                if let Some(audio) = self.audio.as_mut() {
                    audio.on_register_write(offset, value);
                }
                self.restart_timers(now, scheduler);
            }
            pokey::SKREST_RANDOM => self.sync_poly17(now),
            pokey::POTGO => self.state.pots.start(now),
            pokey::IRQEN_IRQST => {
                self.state.irqen = value;
                // Disabled sources read as not pending.
                self.state.irqst |= !value;
            }
            pokey::SKCTL_SKSTAT => {
                self.sync_poly17(now);
                self.state.skctl = value;
                if let Some(audio) = self.audio.as_mut() {
                    audio.on_register_write(offset, value);
                }
            }
            _ => (),
        }
    }

    /// Flags an interrupt source in IRQST. Returns true if the source is enabled in IRQEN and
    /// the CPU should be interrupted.
    pub fn request_irq(&mut self, mask: u8) -> bool {
        self.state.irqst &= !mask;
        self.state.irqen & mask != 0
    }

    pub fn irqen(&self) -> u8 {
        self.state.irqen
    }

    /// Timer period in CPU cycles. Zero if the timer does not run.
    pub fn timer_period(&self, timer: PokeyTimer) -> u64 {
        if self.state.skctl & 0x03 == 0 {
            return 0;
        }
        let audctl = Audctl::from(self.state.audctl);
        let base = audctl.base_clock() as u64;
        let audf = self.state.audf.map(|value| value as u64);
        let single = |index: usize, fast: bool| {
            if audf[index] == 0 {
                return 0;
            }
            let (reload, divider) = if fast { (audf[index] + 4, 1) } else { (audf[index] + 1, base) };
            reload * divider
        };
        let joined = |low: usize, fast: bool| {
            if audf[low + 1] == 0 {
                return 0;
            }
            let period = audf[low] | audf[low + 1] << 8;
            let (reload, divider) = if fast { (period + 7, 1) } else { (period + 1, base) };
            reload * divider
        };
        match timer {
            PokeyTimer::Timer1 if audctl.join_1_2() => 0,
            PokeyTimer::Timer1 => single(0, audctl.fast_1()),
            PokeyTimer::Timer2 if audctl.join_1_2() => joined(0, audctl.fast_1()),
            PokeyTimer::Timer2 => single(1, false),
            PokeyTimer::Timer4 if audctl.join_3_4() => joined(2, audctl.fast_3()),
            PokeyTimer::Timer4 => single(3, false),
        }
    }

    /// STIMER: restarts all timers from their current periods.
    pub fn restart_timers(&mut self, now: Cycle, scheduler: &mut EventScheduler) {
        for timer in PokeyTimer::iter() {
            let period = self.timer_period(timer);
            scheduler.set(timer.event(), (period > 0).then_some(now + period));
        }
    }

    /// Handles an expired timer: flags its interrupt and re-arms it one period later.
    pub fn service_timer(
        &mut self,
        timer: PokeyTimer,
        now: Cycle,
        scheduler: &mut EventScheduler,
    ) -> bool {
        let period = self.timer_period(timer);
        let irq = self.request_irq(timer.irq_mask());
        match (period, scheduler.get(timer.event())) {
            (0, _) | (_, None) => scheduler.disarm(timer.event()),
            (period, Some(mut cycle)) => {
                while cycle <= now {
                    cycle += period;
                }
                scheduler.arm(timer.event(), cycle);
            }
        }
        irq
    }

    /// Keyboard scan result of a newly pressed key.
    pub fn key_pressed(&mut self, kbcode: u8) {
        debug!("Key pressed: KBCODE {:02X}", kbcode);
        self.state.kbcode = kbcode;
    }

    /// Sets (released) or clears (pressed) bits of SKSTAT.
    pub fn set_skstat_bits(&mut self, mask: u8, released: bool) {
        if released {
            self.state.skstat |= mask;
        } else {
            self.state.skstat &= !mask;
        }
    }

    pub fn set_pot(&mut self, pot: usize, value: u8) {
        self.state.pots.set_target(pot, value);
    }
}
