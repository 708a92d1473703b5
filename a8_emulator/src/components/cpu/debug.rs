use std::fmt::Display;
use std::str::FromStr;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;

use super::Cpu;
use super::MainBus;
use crate::common::address::AddressU16;
use crate::common::address::InstructionMeta;
use crate::common::constants::VectorTable;

#[derive(Debug, Clone, PartialEq)]
pub enum CpuEvent {
    Step(CpuState),
    Interrupt(VectorTable),
}

pub struct CpuDebug<'a, BusT: MainBus>(pub &'a Cpu<BusT>);

impl<BusT: MainBus> CpuDebug<'_, BusT> {
    pub fn state(&self) -> CpuState {
        CpuState {
            instruction: self.disassembly(self.0.pc).0,
            a: self.0.a,
            x: self.0.x,
            y: self.0.y,
            sp: self.0.sp,
            status: self.0.status.to_string(),
        }
    }

    pub fn disassembly(&self, addr: AddressU16) -> (InstructionMeta<AddressU16>, AddressU16) {
        let opcode = self.0.bus.peek_u8(addr).unwrap_or_default();
        let instruction = &self.0.opcode_table[opcode as usize];
        (instruction.disassembly)(self.0, addr)
    }

    /// Disassembles `count` instructions starting at the current program counter.
    pub fn peek_next_operations(
        &self,
        count: usize,
    ) -> impl Iterator<Item = InstructionMeta<AddressU16>> + '_ {
        let mut pc = self.0.pc;
        (0..count).map(move |_| {
            let (meta, next_pc) = self.disassembly(pc);
            pc = next_pc;
            meta
        })
    }
}

/// One line of an execution trace.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct CpuState {
    pub instruction: InstructionMeta<AddressU16>,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub status: String,
}

impl FromStr for CpuState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        // Example:
        //
        // E477  lda #$3C     A:00 X:00 Y:00 S:FD P:....I..
        // 0     6   10         20   27   32   37   42
        if s.len() < 49 || &s[20..22] != "A:" {
            bail!("Invalid trace format.")
        }
        let operand = s[10..19].trim();
        Ok(Self {
            instruction: InstructionMeta {
                address: AddressU16(u16::from_str_radix(&s[0..4], 16).with_context(|| "pc")?),
                operation: s[6..9].trim().to_string(),
                operand_str: (!operand.is_empty()).then(|| operand.to_string()),
                effective_addr: None,
            },
            a: u8::from_str_radix(&s[22..24], 16).with_context(|| "a")?,
            x: u8::from_str_radix(&s[27..29], 16).with_context(|| "x")?,
            y: u8::from_str_radix(&s[32..34], 16).with_context(|| "y")?,
            sp: u8::from_str_radix(&s[37..39], 16).with_context(|| "sp")?,
            status: s[42..49].to_string(),
        })
    }
}

impl Display for CpuState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04X}  {:<3} {:<9} A:{:02X} X:{:02X} Y:{:02X} S:{:02X} P:{}",
            self.instruction.address.0,
            self.instruction.operation,
            self.instruction.operand_str.as_deref().unwrap_or(""),
            self.a,
            self.x,
            self.y,
            self.sp,
            self.status,
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    static EXAMPLE_TRACE: &str = r"E477  lda #$3C      A:00 X:00 Y:00 S:FD P:....I..";

    fn example_trace() -> CpuState {
        CpuState {
            instruction: InstructionMeta {
                address: AddressU16(0xE477),
                operation: "lda".to_string(),
                operand_str: Some("#$3C".to_string()),
                effective_addr: None,
            },
            a: 0x00,
            x: 0x00,
            y: 0x00,
            sp: 0xFD,
            status: "....I..".to_string(),
        }
    }

    #[test]
    pub fn test_cpu_state_from_str() {
        assert_eq!(EXAMPLE_TRACE.parse::<CpuState>().unwrap(), example_trace());
    }

    #[test]
    pub fn test_cpu_state_to_str() {
        assert_eq!(format!("{}", example_trace()), EXAMPLE_TRACE);
    }
}
