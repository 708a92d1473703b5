//! The chips of the machine.
//!
//! Each chip is modelled independently so it can be tested against a small fake of its
//! surroundings. The machine state wires them together.
//!
//! To keep them independent, the following rules are applied:
//! - Components cannot depend on one another
//! - Components can only import code from common/
//! - Keep exported types and functionality to a minimum
//! - All modules inside a component must be private
//! - Use self/super to refer to inner modules

pub mod antic;
pub mod cpu;
pub mod gtia;
pub mod memory;
pub mod pia;
pub mod pokey;
pub mod sio;
