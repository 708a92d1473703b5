//! Plumbing for components to report debug events (executed instructions, interrupts) to
//! whoever is observing the machine.
//!
//! Collecting is globally gated by `DEBUG_EVENTS_ENABLED`, so components can produce events
//! unconditionally at near zero cost while nobody is listening.
use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use super::util::RingBuffer;

pub static DEBUG_EVENTS_ENABLED: AtomicBool = AtomicBool::new(false);

pub trait DebugEventCollector<EventT> {
    #[cold]
    fn on_event(&mut self, event: EventT);
}

/// Wrapper to a dyn trait reference of a DebugEventCollector
#[derive(Clone)]
pub struct DebugEventCollectorRef<EventT>(pub Rc<RefCell<dyn DebugEventCollector<EventT>>>);

impl<EventT> DebugEventCollectorRef<EventT> {
    pub fn collect_event(&self, event: EventT) {
        if DEBUG_EVENTS_ENABLED.load(Ordering::Relaxed) {
            self.0.deref().borrow_mut().on_event(event);
        }
    }
}

/// Collector that drops all events.
pub struct NullCollector;

impl<EventT> DebugEventCollector<EventT> for NullCollector {
    fn on_event(&mut self, _event: EventT) {}
}

pub fn null_collector<EventT>() -> DebugEventCollectorRef<EventT> {
    DebugEventCollectorRef(Rc::new(RefCell::new(NullCollector)))
}

/// Keeps the most recent 1024 events.
pub struct EventLog<EventT> {
    pub log: RingBuffer<EventT, 1024>,
}

impl<EventT> Default for EventLog<EventT> {
    fn default() -> Self {
        Self {
            log: RingBuffer::default(),
        }
    }
}

impl<EventT> DebugEventCollector<EventT> for EventLog<EventT> {
    fn on_event(&mut self, event: EventT) {
        self.log.push(event);
    }
}
