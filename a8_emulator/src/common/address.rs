//! The 16-bit address type shared by the CPU, the bus and ANTIC's DMA counters.
use std::fmt::Display;
use std::fmt::Formatter;
use std::hash::Hash;

/// Address types enforce that the wrapping behavior for each calculation is explicitly specified.
pub trait Address: Eq + Hash + Display + Ord + Copy + Clone + From<u16> {
    fn add_signed(&self, rhs: i32, wrap: Wrap) -> Self;
    fn add(&self, rhs: u16, wrap: Wrap) -> Self;
    fn add_detect_page_cross(&self, rhs: u16, wrap: Wrap) -> (bool, Self);
    fn sub(&self, rhs: u16, wrap: Wrap) -> Self;
}

#[derive(Clone, Debug, PartialEq, Eq, Copy)]
pub enum Wrap {
    /// Stay within the 256 byte page of the address (zero page indexing, JMP ($xxFF)).
    WrapPage,
    /// Only the bits in the mask take part in the calculation. ANTIC's display list counter
    /// wraps within 1K (mask 0x3FF) and its memory scan counter within 4K (mask 0xFFF).
    Window(u16),
    /// Wrap around the full 64K address space.
    NoWrap,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Copy, Hash, PartialOrd, Ord)]
pub struct AddressU16(pub u16);

impl AddressU16 {
    pub fn new_direct_page(page: u8, offset: u8) -> Self {
        AddressU16(((page as u16) << 8) | (offset as u16))
    }

    pub fn page(&self) -> u8 {
        (self.0 >> 8) as u8
    }
}

impl Address for AddressU16 {
    fn add_signed(&self, rhs: i32, wrap: Wrap) -> Self {
        if rhs > 0 {
            self.add(rhs.unsigned_abs() as u16, wrap)
        } else {
            self.sub(rhs.unsigned_abs() as u16, wrap)
        }
    }

    fn add(&self, rhs: u16, wrap: Wrap) -> Self {
        match wrap {
            Wrap::WrapPage => {
                AddressU16((self.0 & 0xFF00) | (self.0 as u8).wrapping_add(rhs as u8) as u16)
            }
            Wrap::Window(mask) => AddressU16((self.0 & !mask) | (self.0.wrapping_add(rhs) & mask)),
            Wrap::NoWrap => AddressU16(self.0.wrapping_add(rhs)),
        }
    }

    fn add_detect_page_cross(&self, rhs: u16, wrap: Wrap) -> (bool, Self) {
        let result = self.add(rhs, wrap);
        (result.page() != self.page(), result)
    }

    fn sub(&self, rhs: u16, wrap: Wrap) -> Self {
        match wrap {
            Wrap::WrapPage => {
                AddressU16((self.0 & 0xFF00) | (self.0 as u8).wrapping_sub(rhs as u8) as u16)
            }
            Wrap::Window(mask) => AddressU16((self.0 & !mask) | (self.0.wrapping_sub(rhs) & mask)),
            Wrap::NoWrap => AddressU16(self.0.wrapping_sub(rhs)),
        }
    }
}

impl From<u16> for AddressU16 {
    fn from(value: u16) -> Self {
        AddressU16(value)
    }
}

impl From<AddressU16> for u16 {
    fn from(addr: AddressU16) -> Self {
        addr.0
    }
}

impl From<AddressU16> for usize {
    fn from(addr: AddressU16) -> Self {
        addr.0 as usize
    }
}

impl Display for AddressU16 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:04X}", self.0)
    }
}

/// Metadata about a decoded instruction. Used to generate disassembly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstructionMeta<AddressT: Address> {
    pub address: AddressT,
    pub operation: String,
    pub operand_str: Option<String>,
    pub effective_addr: Option<AddressT>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_page() {
        assert_eq!(
            AddressU16(0x12FF).add(1, Wrap::WrapPage),
            AddressU16(0x1200)
        );
        assert_eq!(
            AddressU16(0x0000).sub(1, Wrap::WrapPage),
            AddressU16(0x00FF)
        );
    }

    #[test]
    fn test_wrap_window() {
        // Display list counter stays within its 1K block
        assert_eq!(
            AddressU16(0x23FF).add(1, Wrap::Window(0x3FF)),
            AddressU16(0x2000)
        );
        // Memory scan counter stays within its 4K block
        assert_eq!(
            AddressU16(0x4FFE).add(4, Wrap::Window(0xFFF)),
            AddressU16(0x4002)
        );
    }

    #[test]
    fn test_page_cross() {
        assert_eq!(
            AddressU16(0x10F0).add_detect_page_cross(0x10, Wrap::NoWrap),
            (true, AddressU16(0x1100))
        );
        assert_eq!(
            AddressU16(0x10F0).add_detect_page_cross(0x0F, Wrap::NoWrap),
            (false, AddressU16(0x10FF))
        );
        assert_eq!(
            AddressU16(0xFFFF).add_detect_page_cross(0x01, Wrap::NoWrap),
            (true, AddressU16(0x0000))
        );
    }

    #[test]
    fn test_signed() {
        assert_eq!(
            AddressU16(0x1000).add_signed(-2, Wrap::NoWrap),
            AddressU16(0x0FFE)
        );
        assert_eq!(
            AddressU16(0x1000).add_signed(0x7F, Wrap::NoWrap),
            AddressU16(0x107F)
        );
    }
}
