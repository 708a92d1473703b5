//! Each instruction in the [opcode table](super::opcode_table::build_opcode_table) has an
//! associated address mode, which is decoded here to handle how the operand is loaded and stored.
use super::Cpu;
use super::MainBus;
use crate::common::address::Address;
use crate::common::address::AddressU16;
use crate::common::address::Wrap;

/// The 13 addressing modes of the 6502.
///
/// To access an operand, the mode first needs to be decoded (i.e. consume and interpret bytes of
/// program memory) into a [DecodedOperand], which can then be loaded or stored. These are separate
/// steps since read-modify-write instructions load and store the same decoded operand.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AddressMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl AddressMode {
    /// Consumes program bytes to decode an operand.
    #[inline]
    pub fn decode(&self, cpu: &mut Cpu<impl MainBus>) -> DecodedOperand {
        match self {
            Self::Implied => DecodedOperand::Implied,
            Self::Accumulator => DecodedOperand::Accumulator,
            Self::Immediate => DecodedOperand::Immediate(cpu.fetch_program_u8()),
            Self::ZeroPage => {
                DecodedOperand::Memory(AddressU16(cpu.fetch_program_u8() as u16), false)
            }
            Self::ZeroPageX => {
                let base = AddressU16(cpu.fetch_program_u8() as u16);
                DecodedOperand::Memory(base.add(cpu.x as u16, Wrap::WrapPage), false)
            }
            Self::ZeroPageY => {
                let base = AddressU16(cpu.fetch_program_u8() as u16);
                DecodedOperand::Memory(base.add(cpu.y as u16, Wrap::WrapPage), false)
            }
            Self::Absolute => DecodedOperand::Memory(AddressU16(cpu.fetch_program_u16()), false),
            Self::AbsoluteX => {
                let base = AddressU16(cpu.fetch_program_u16());
                let (page_cross, addr) = base.add_detect_page_cross(cpu.x as u16, Wrap::NoWrap);
                DecodedOperand::Memory(addr, page_cross)
            }
            Self::AbsoluteY => {
                let base = AddressU16(cpu.fetch_program_u16());
                let (page_cross, addr) = base.add_detect_page_cross(cpu.y as u16, Wrap::NoWrap);
                DecodedOperand::Memory(addr, page_cross)
            }
            Self::Indirect => {
                // The pointer high byte is fetched without carrying into the page.
                let pointer = AddressU16(cpu.fetch_program_u16());
                DecodedOperand::Memory(
                    AddressU16(cpu.bus.read_u16(pointer, Wrap::WrapPage)),
                    false,
                )
            }
            Self::IndirectX => {
                let pointer = AddressU16(cpu.fetch_program_u8().wrapping_add(cpu.x) as u16);
                DecodedOperand::Memory(
                    AddressU16(cpu.bus.read_u16(pointer, Wrap::WrapPage)),
                    false,
                )
            }
            Self::IndirectY => {
                let pointer = AddressU16(cpu.fetch_program_u8() as u16);
                let base = AddressU16(cpu.bus.read_u16(pointer, Wrap::WrapPage));
                let (page_cross, addr) = base.add_detect_page_cross(cpu.y as u16, Wrap::NoWrap);
                DecodedOperand::Memory(addr, page_cross)
            }
            Self::Relative => {
                let offset = cpu.fetch_program_u8() as i8;
                DecodedOperand::Relative(cpu.pc.add_signed(offset.into(), Wrap::NoWrap))
            }
        }
    }

    pub fn operand_size(&self) -> u16 {
        match self {
            Self::Implied | Self::Accumulator => 0,
            Self::Immediate
            | Self::ZeroPage
            | Self::ZeroPageX
            | Self::ZeroPageY
            | Self::IndirectX
            | Self::IndirectY
            | Self::Relative => 1,
            Self::Absolute | Self::AbsoluteX | Self::AbsoluteY | Self::Indirect => 2,
        }
    }

    /// Formats the operand at `addr` without side effects. Returns the operand string, the
    /// effective address if it can be determined and the address of the next instruction.
    pub fn disassembly(
        &self,
        cpu: &Cpu<impl MainBus>,
        addr: AddressU16,
    ) -> (String, Option<AddressU16>, AddressU16) {
        let size = self.operand_size();
        let next_addr = addr.add(size, Wrap::NoWrap);
        let byte = cpu.bus.peek_u8(addr).unwrap_or_default();
        let word = cpu.bus.peek_u16(addr, Wrap::NoWrap).unwrap_or_default();
        let peek_pointer = |pointer: u16| {
            cpu.bus
                .peek_u16(AddressU16(pointer), Wrap::WrapPage)
                .map(AddressU16)
        };
        match self {
            Self::Implied => (String::new(), None, next_addr),
            Self::Accumulator => ("A".to_string(), None, next_addr),
            Self::Immediate => (format!("#${:02X}", byte), None, next_addr),
            Self::ZeroPage => (
                format!("${:02X}", byte),
                Some(AddressU16(byte as u16)),
                next_addr,
            ),
            Self::ZeroPageX => (
                format!("${:02X},X", byte),
                Some(AddressU16(byte.wrapping_add(cpu.x) as u16)),
                next_addr,
            ),
            Self::ZeroPageY => (
                format!("${:02X},Y", byte),
                Some(AddressU16(byte.wrapping_add(cpu.y) as u16)),
                next_addr,
            ),
            Self::Absolute => (format!("${:04X}", word), Some(AddressU16(word)), next_addr),
            Self::AbsoluteX => (
                format!("${:04X},X", word),
                Some(AddressU16(word.wrapping_add(cpu.x as u16))),
                next_addr,
            ),
            Self::AbsoluteY => (
                format!("${:04X},Y", word),
                Some(AddressU16(word.wrapping_add(cpu.y as u16))),
                next_addr,
            ),
            Self::Indirect => (format!("(${:04X})", word), peek_pointer(word), next_addr),
            Self::IndirectX => (
                format!("(${:02X},X)", byte),
                peek_pointer(byte.wrapping_add(cpu.x) as u16),
                next_addr,
            ),
            Self::IndirectY => (
                format!("(${:02X}),Y", byte),
                peek_pointer(byte as u16).map(|base| base.add(cpu.y as u16, Wrap::NoWrap)),
                next_addr,
            ),
            Self::Relative => {
                let target = next_addr.add_signed((byte as i8).into(), Wrap::NoWrap);
                (format!("${:04X}", target.0), Some(target), next_addr)
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodedOperand {
    Implied,
    Accumulator,
    Immediate(u8),
    /// Effective address and whether indexing crossed a page boundary.
    Memory(AddressU16, bool),
    /// Branch target.
    Relative(AddressU16),
}

impl DecodedOperand {
    #[inline]
    pub fn load(&self, cpu: &mut Cpu<impl MainBus>) -> u8 {
        match self {
            Self::Accumulator => cpu.a,
            Self::Immediate(value) => *value,
            Self::Memory(addr, _) => cpu.bus.read_u8(*addr),
            Self::Implied | Self::Relative(_) => 0,
        }
    }

    #[inline]
    pub fn store(&self, cpu: &mut Cpu<impl MainBus>, value: u8) {
        match self {
            Self::Accumulator => cpu.a = value,
            Self::Memory(addr, _) => cpu.bus.write_u8(*addr, value),
            Self::Implied | Self::Immediate(_) | Self::Relative(_) => {}
        }
    }

    /// Effective address for jumps and stores.
    #[inline]
    pub fn address(&self) -> AddressU16 {
        match self {
            Self::Memory(addr, _) | Self::Relative(addr) => *addr,
            _ => AddressU16(0),
        }
    }

    #[inline]
    pub fn page_cross(&self) -> bool {
        matches!(self, Self::Memory(_, true))
    }
}
