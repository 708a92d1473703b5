use std::fmt::Display;
use std::str::FromStr;

use anyhow::bail;
use intbits::Bits;

/// The 6502 status register, kept unpacked. Bit 5 is not stored and always reads as set.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub struct StatusFlags {
    pub carry: bool,
    pub zero: bool,
    pub irq_disable: bool,
    pub decimal: bool,
    pub break_command: bool,
    pub overflow: bool,
    pub negative: bool,
}

impl StatusFlags {
    /// The value pushed to the stack. `break_command` is true for PHP/BRK and false for
    /// hardware interrupts.
    pub fn to_stack_value(self, break_command: bool) -> u8 {
        u8::from(self).with_bit(4, break_command)
    }

    /// Restores flags pulled from the stack. The break flag only exists on the stack.
    pub fn set_from_stack_value(&mut self, value: u8) {
        *self = Self {
            break_command: self.break_command,
            ..Self::from(value)
        }
    }
}

impl From<u8> for StatusFlags {
    fn from(value: u8) -> Self {
        Self {
            carry: value.bit(0),
            zero: value.bit(1),
            irq_disable: value.bit(2),
            decimal: value.bit(3),
            break_command: value.bit(4),
            overflow: value.bit(6),
            negative: value.bit(7),
        }
    }
}

impl From<StatusFlags> for u8 {
    fn from(value: StatusFlags) -> Self {
        0_u8.with_bit(0, value.carry)
            .with_bit(1, value.zero)
            .with_bit(2, value.irq_disable)
            .with_bit(3, value.decimal)
            .with_bit(4, value.break_command)
            .with_bit(5, true)
            .with_bit(6, value.overflow)
            .with_bit(7, value.negative)
    }
}

impl Display for StatusFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}{}{}{}{}",
            if self.negative { "N" } else { "." },
            if self.overflow { "V" } else { "." },
            if self.break_command { "B" } else { "." },
            if self.decimal { "D" } else { "." },
            if self.irq_disable { "I" } else { "." },
            if self.zero { "Z" } else { "." },
            if self.carry { "C" } else { "." },
        )
    }
}

impl FromStr for StatusFlags {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let flags: Vec<bool> = s.chars().map(|c| c != '.').collect();
        let [negative, overflow, break_command, decimal, irq_disable, zero, carry] = flags[..]
        else {
            bail!("StatusFlags string must be 7 characters long");
        };
        Ok(Self {
            carry,
            zero,
            irq_disable,
            decimal,
            break_command,
            overflow,
            negative,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_stack_value() {
        let flags = StatusFlags {
            carry: true,
            negative: true,
            ..Default::default()
        };
        assert_eq!(flags.to_stack_value(true), 0xB1);
        assert_eq!(flags.to_stack_value(false), 0xA1);

        let mut pulled = StatusFlags::default();
        pulled.set_from_stack_value(0xFF);
        assert!(!pulled.break_command);
        assert!(pulled.decimal && pulled.irq_disable && pulled.overflow);
    }

    #[test]
    fn test_format_and_parse() {
        let flags = StatusFlags {
            irq_disable: true,
            zero: true,
            ..Default::default()
        };
        assert_eq!(flags.to_string(), "....IZ.");
        assert_eq!("....IZ.".parse::<StatusFlags>().unwrap(), flags);
        assert!("NV".parse::<StatusFlags>().is_err());
    }
}
