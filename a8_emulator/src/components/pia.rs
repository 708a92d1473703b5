//! The PIA: port A carries the joystick directions, port B controls bank switching.
//!
//! Bit 2 of PACTL/PBCTL selects what the port address accesses. When clear, the data direction
//! value is accessed; when set, reads return the port input and writes drive the port.
use bitcode::Decode;
use bitcode::Encode;
use intbits::Bits;

use crate::common::constants::pia;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
struct PortControl {
    written: u8,
    readback: u8,
}

impl PortControl {
    fn write(&mut self, value: u8) {
        self.written = value;
        self.readback = (value & 0x0D) | 0x30;
    }

    fn port_selected(&self) -> bool {
        self.written.bit(2)
    }
}

impl Default for PortControl {
    fn default() -> Self {
        Self {
            written: 0x00,
            readback: 0x3C,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct Pia {
    /// Port A input lines, active low. Bits 0-3 are the joystick 0 directions.
    porta_input: u8,
    porta_direction: u8,
    portb_direction: u8,
    pactl: PortControl,
    pbctl: PortControl,
}

impl Default for Pia {
    fn default() -> Self {
        Self {
            porta_input: 0xFF,
            porta_direction: 0x00,
            portb_direction: 0x00,
            pactl: PortControl::default(),
            pbctl: PortControl::default(),
        }
    }
}

impl Pia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a register. `portb` is the current bank switching value held by the memory
    /// controller.
    pub fn bus_read(&self, offset: u8, portb: u8) -> u8 {
        match offset {
            pia::PORTA if self.pactl.port_selected() => self.porta_input,
            pia::PORTA => self.porta_direction,
            pia::PORTB if self.pbctl.port_selected() => portb,
            pia::PORTB => self.portb_direction,
            pia::PACTL => self.pactl.readback,
            pia::PBCTL => self.pbctl.readback,
            _ => unreachable!("PIA offset {offset:#04X}"),
        }
    }

    /// Writes a register. Returns the value to apply to the bank switching logic for PORTB
    /// writes in port mode.
    pub fn bus_write(&mut self, offset: u8, value: u8) -> Option<u8> {
        match offset {
            // Joystick port outputs are not connected.
            pia::PORTA if self.pactl.port_selected() => {}
            pia::PORTA => self.porta_direction = value,
            pia::PORTB if self.pbctl.port_selected() => return Some(value),
            pia::PORTB => self.portb_direction = value,
            pia::PACTL => self.pactl.write(value),
            pia::PBCTL => self.pbctl.write(value),
            _ => unreachable!("PIA offset {offset:#04X}"),
        }
        None
    }

    pub fn porta_input(&self) -> u8 {
        self.porta_input
    }

    /// Drives port A input lines. A pressed joystick direction pulls its bit low.
    pub fn set_porta_line(&mut self, mask: u8, pressed: bool) {
        if pressed {
            self.porta_input &= !mask;
        } else {
            self.porta_input |= mask;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_direction_and_port_mode() {
        let mut chip = Pia::new();
        assert_eq!(chip.bus_read(pia::PACTL, 0xFF), 0x3C);

        // Direction mode after reset
        assert_eq!(chip.bus_write(pia::PORTB, 0x12), None);
        assert_eq!(chip.bus_read(pia::PORTB, 0xFD), 0x12);

        chip.bus_write(pia::PBCTL, 0x3C);
        assert_eq!(chip.bus_read(pia::PBCTL, 0xFD), 0x3C);
        assert_eq!(chip.bus_read(pia::PORTB, 0xFD), 0xFD);
        assert_eq!(chip.bus_write(pia::PORTB, 0xFE), Some(0xFE));
    }

    #[test]
    fn test_joystick_lines() {
        let mut chip = Pia::new();
        chip.bus_write(pia::PACTL, 0x04);
        assert_eq!(chip.bus_read(pia::PACTL, 0), 0x34);
        chip.set_porta_line(0x01, true);
        chip.set_porta_line(0x08, true);
        assert_eq!(chip.bus_read(pia::PORTA, 0), 0xF6);
        chip.set_porta_line(0x01, false);
        assert_eq!(chip.bus_read(pia::PORTA, 0), 0xF7);
    }
}
