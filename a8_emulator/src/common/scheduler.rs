//! Cycle-ordered bookkeeping of all timed hardware events.
//!
//! Every event is either armed at an absolute cycle or disarmed (`None`, compares as +infinity).
//! The earliest armed cycle is cached in `next` so the CPU loop only compares a single value
//! after each instruction.
use bitcode::Decode;
use bitcode::Encode;
use strum::EnumCount;
use strum::EnumIter;
use strum::IntoEnumIterator;

/// Absolute CPU cycle count since the last hard reset.
pub type Cycle = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumCount, EnumIter, strum::Display)]
pub enum TimedEvent {
    DisplayListFetch,
    DrawLine,
    Dli,
    SerialOutputTransmissionDone,
    SerialOutputDataNeeded,
    SerialInputDataReady,
    Timer1,
    Timer2,
    Timer4,
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct EventScheduler {
    events: [Option<Cycle>; TimedEvent::COUNT],
    next: Option<Cycle>,
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventScheduler {
    /// Scheduler state after a hard reset: the first display list fetch happens at the end of
    /// line 0 and drawing 16 cycles later.
    pub fn new() -> Self {
        use crate::common::constants::CYCLES_PER_LINE;
        let mut scheduler = Self {
            events: [None; TimedEvent::COUNT],
            next: None,
        };
        scheduler.events[TimedEvent::DisplayListFetch as usize] = Some(CYCLES_PER_LINE);
        scheduler.events[TimedEvent::DrawLine as usize] = Some(CYCLES_PER_LINE + 16);
        scheduler.recompute_next();
        scheduler
    }

    pub fn get(&self, event: TimedEvent) -> Option<Cycle> {
        self.events[event as usize]
    }

    pub fn arm(&mut self, event: TimedEvent, cycle: Cycle) {
        self.events[event as usize] = Some(cycle);
        self.recompute_next();
    }

    /// Arms or disarms depending on `cycle`.
    pub fn set(&mut self, event: TimedEvent, cycle: Option<Cycle>) {
        self.events[event as usize] = cycle;
        self.recompute_next();
    }

    pub fn disarm(&mut self, event: TimedEvent) {
        self.events[event as usize] = None;
        self.recompute_next();
    }

    pub fn is_armed(&self, event: TimedEvent) -> bool {
        self.events[event as usize].is_some()
    }

    /// True if `event` is armed at or before `now`.
    pub fn is_due(&self, event: TimedEvent, now: Cycle) -> bool {
        matches!(self.events[event as usize], Some(cycle) if cycle <= now)
    }

    /// The earliest armed event cycle.
    pub fn next(&self) -> Option<Cycle> {
        self.next
    }

    pub fn recompute_next(&mut self) {
        self.next = TimedEvent::iter()
            .filter_map(|event| self.events[event as usize])
            .min();
    }
}
