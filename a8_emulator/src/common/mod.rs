//! Traits and types used by all components of the emulator.

pub mod address;
pub mod bus;
pub mod constants;
pub mod debug_events;
pub mod framebuffer;
pub mod logging;
pub mod scheduler;
pub mod test_util;
pub mod util;
