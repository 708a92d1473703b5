use super::instructions;
use super::Cpu;
use super::MainBus;
use crate::common::address::Address;
use crate::common::address::AddressU16;
use crate::common::address::InstructionMeta;
use crate::common::address::Wrap;

/// An entry in the opcode table
pub struct InstructionDef<BusT: MainBus> {
    /// Execute the instruction on the provided CPU.
    pub execute: fn(&mut Cpu<BusT>),

    /// Return metadata about this instruction. Can be used on an immutable CPU.
    pub disassembly: fn(&Cpu<BusT>, AddressU16) -> (InstructionMeta<AddressU16>, AddressU16),

    /// Base cycle cost, before page crossing and branch penalties.
    pub cycles: u8,
}

pub fn build_opcode_table<BusT: MainBus>() -> [InstructionDef<BusT>; 256] {
    macro_rules! instruction {
        // Implied instruction
        ($method: ident, $cycles: expr) => {
            InstructionDef::<BusT> {
                execute: |cpu| instructions::$method(cpu),
                disassembly: |_, instruction_addr| {
                    (
                        InstructionMeta {
                            address: instruction_addr,
                            operation: stringify!($method).to_string(),
                            operand_str: None,
                            effective_addr: None,
                        },
                        instruction_addr.add(1, Wrap::NoWrap),
                    )
                },
                cycles: $cycles,
            }
        };
        // Instruction with an operand
        ($method: ident, $mode: expr, $cycles: expr) => {
            InstructionDef::<BusT> {
                execute: |cpu| instructions::$method(cpu, $mode),
                disassembly: |cpu, instruction_addr| {
                    let (operand, effective_addr, next_addr) =
                        $mode.disassembly(cpu, instruction_addr.add(1, Wrap::NoWrap));
                    (
                        InstructionMeta {
                            address: instruction_addr,
                            operation: stringify!($method).to_string(),
                            operand_str: Some(operand),
                            effective_addr,
                        },
                        next_addr,
                    )
                },
                cycles: $cycles,
            }
        };
    }

    let mut opcodes = [(); 256].map(|_| instruction!(jam, 2));

    use super::operands::AddressMode::*;
    opcodes[0x00] = instruction!(brk, 7);
    opcodes[0x01] = instruction!(ora, IndirectX, 6);
    opcodes[0x02] = instruction!(jam, 2);
    opcodes[0x03] = instruction!(slo, IndirectX, 8);
    opcodes[0x04] = instruction!(dop, ZeroPage, 3);
    opcodes[0x05] = instruction!(ora, ZeroPage, 3);
    opcodes[0x06] = instruction!(asl, ZeroPage, 5);
    opcodes[0x07] = instruction!(slo, ZeroPage, 5);
    opcodes[0x08] = instruction!(php, 3);
    opcodes[0x09] = instruction!(ora, Immediate, 2);
    opcodes[0x0A] = instruction!(asl, Accumulator, 2);
    opcodes[0x0B] = instruction!(anc, Immediate, 2);
    opcodes[0x0C] = instruction!(top, Absolute, 4);
    opcodes[0x0D] = instruction!(ora, Absolute, 4);
    opcodes[0x0E] = instruction!(asl, Absolute, 6);
    opcodes[0x0F] = instruction!(slo, Absolute, 6);
    opcodes[0x10] = instruction!(bpl, Relative, 2);
    opcodes[0x11] = instruction!(ora, IndirectY, 5);
    opcodes[0x12] = instruction!(jam, 2);
    opcodes[0x13] = instruction!(slo, IndirectY, 8);
    opcodes[0x14] = instruction!(dop, ZeroPageX, 4);
    opcodes[0x15] = instruction!(ora, ZeroPageX, 4);
    opcodes[0x16] = instruction!(asl, ZeroPageX, 6);
    opcodes[0x17] = instruction!(slo, ZeroPageX, 6);
    opcodes[0x18] = instruction!(clc, 2);
    opcodes[0x19] = instruction!(ora, AbsoluteY, 4);
    opcodes[0x1A] = instruction!(nop, 2);
    opcodes[0x1B] = instruction!(slo, AbsoluteY, 7);
    opcodes[0x1C] = instruction!(top, AbsoluteX, 4);
    opcodes[0x1D] = instruction!(ora, AbsoluteX, 4);
    opcodes[0x1E] = instruction!(asl, AbsoluteX, 7);
    opcodes[0x1F] = instruction!(slo, AbsoluteX, 7);
    opcodes[0x20] = instruction!(jsr, Absolute, 6);
    opcodes[0x21] = instruction!(and, IndirectX, 6);
    opcodes[0x22] = instruction!(jam, 2);
    opcodes[0x23] = instruction!(rla, IndirectX, 8);
    opcodes[0x24] = instruction!(bit, ZeroPage, 3);
    opcodes[0x25] = instruction!(and, ZeroPage, 3);
    opcodes[0x26] = instruction!(rol, ZeroPage, 5);
    opcodes[0x27] = instruction!(rla, ZeroPage, 5);
    opcodes[0x28] = instruction!(plp, 4);
    opcodes[0x29] = instruction!(and, Immediate, 2);
    opcodes[0x2A] = instruction!(rol, Accumulator, 2);
    opcodes[0x2B] = instruction!(anc, Immediate, 2);
    opcodes[0x2C] = instruction!(bit, Absolute, 4);
    opcodes[0x2D] = instruction!(and, Absolute, 4);
    opcodes[0x2E] = instruction!(rol, Absolute, 6);
    opcodes[0x2F] = instruction!(rla, Absolute, 6);
    opcodes[0x30] = instruction!(bmi, Relative, 2);
    opcodes[0x31] = instruction!(and, IndirectY, 5);
    opcodes[0x32] = instruction!(jam, 2);
    opcodes[0x33] = instruction!(rla, IndirectY, 8);
    opcodes[0x34] = instruction!(dop, ZeroPageX, 4);
    opcodes[0x35] = instruction!(and, ZeroPageX, 4);
    opcodes[0x36] = instruction!(rol, ZeroPageX, 6);
    opcodes[0x37] = instruction!(rla, ZeroPageX, 6);
    opcodes[0x38] = instruction!(sec, 2);
    opcodes[0x39] = instruction!(and, AbsoluteY, 4);
    opcodes[0x3A] = instruction!(nop, 2);
    opcodes[0x3B] = instruction!(rla, AbsoluteY, 7);
    opcodes[0x3C] = instruction!(top, AbsoluteX, 4);
    opcodes[0x3D] = instruction!(and, AbsoluteX, 4);
    opcodes[0x3E] = instruction!(rol, AbsoluteX, 7);
    opcodes[0x3F] = instruction!(rla, AbsoluteX, 7);
    opcodes[0x40] = instruction!(rti, 6);
    opcodes[0x41] = instruction!(eor, IndirectX, 6);
    opcodes[0x42] = instruction!(jam, 2);
    opcodes[0x43] = instruction!(sre, IndirectX, 8);
    opcodes[0x44] = instruction!(dop, ZeroPage, 3);
    opcodes[0x45] = instruction!(eor, ZeroPage, 3);
    opcodes[0x46] = instruction!(lsr, ZeroPage, 5);
    opcodes[0x47] = instruction!(sre, ZeroPage, 5);
    opcodes[0x48] = instruction!(pha, 3);
    opcodes[0x49] = instruction!(eor, Immediate, 2);
    opcodes[0x4A] = instruction!(lsr, Accumulator, 2);
    opcodes[0x4B] = instruction!(alr, Immediate, 2);
    opcodes[0x4C] = instruction!(jmp, Absolute, 3);
    opcodes[0x4D] = instruction!(eor, Absolute, 4);
    opcodes[0x4E] = instruction!(lsr, Absolute, 6);
    opcodes[0x4F] = instruction!(sre, Absolute, 6);
    opcodes[0x50] = instruction!(bvc, Relative, 2);
    opcodes[0x51] = instruction!(eor, IndirectY, 5);
    opcodes[0x52] = instruction!(jam, 2);
    opcodes[0x53] = instruction!(sre, IndirectY, 8);
    opcodes[0x54] = instruction!(dop, ZeroPageX, 4);
    opcodes[0x55] = instruction!(eor, ZeroPageX, 4);
    opcodes[0x56] = instruction!(lsr, ZeroPageX, 6);
    opcodes[0x57] = instruction!(sre, ZeroPageX, 6);
    opcodes[0x58] = instruction!(cli, 2);
    opcodes[0x59] = instruction!(eor, AbsoluteY, 4);
    opcodes[0x5A] = instruction!(nop, 2);
    opcodes[0x5B] = instruction!(sre, AbsoluteY, 7);
    opcodes[0x5C] = instruction!(top, AbsoluteX, 4);
    opcodes[0x5D] = instruction!(eor, AbsoluteX, 4);
    opcodes[0x5E] = instruction!(lsr, AbsoluteX, 7);
    opcodes[0x5F] = instruction!(sre, AbsoluteX, 7);
    opcodes[0x60] = instruction!(rts, 6);
    opcodes[0x61] = instruction!(adc, IndirectX, 6);
    opcodes[0x62] = instruction!(jam, 2);
    opcodes[0x63] = instruction!(rra, IndirectX, 8);
    opcodes[0x64] = instruction!(dop, ZeroPage, 3);
    opcodes[0x65] = instruction!(adc, ZeroPage, 3);
    opcodes[0x66] = instruction!(ror, ZeroPage, 5);
    opcodes[0x67] = instruction!(rra, ZeroPage, 5);
    opcodes[0x68] = instruction!(pla, 4);
    opcodes[0x69] = instruction!(adc, Immediate, 2);
    opcodes[0x6A] = instruction!(ror, Accumulator, 2);
    opcodes[0x6B] = instruction!(arr, Immediate, 2);
    opcodes[0x6C] = instruction!(jmp, Indirect, 5);
    opcodes[0x6D] = instruction!(adc, Absolute, 4);
    opcodes[0x6E] = instruction!(ror, Absolute, 6);
    opcodes[0x6F] = instruction!(rra, Absolute, 6);
    opcodes[0x70] = instruction!(bvs, Relative, 2);
    opcodes[0x71] = instruction!(adc, IndirectY, 5);
    opcodes[0x72] = instruction!(jam, 2);
    opcodes[0x73] = instruction!(rra, IndirectY, 8);
    opcodes[0x74] = instruction!(dop, ZeroPageX, 4);
    opcodes[0x75] = instruction!(adc, ZeroPageX, 4);
    opcodes[0x76] = instruction!(ror, ZeroPageX, 6);
    opcodes[0x77] = instruction!(rra, ZeroPageX, 6);
    opcodes[0x78] = instruction!(sei, 2);
    opcodes[0x79] = instruction!(adc, AbsoluteY, 4);
    opcodes[0x7A] = instruction!(nop, 2);
    opcodes[0x7B] = instruction!(rra, AbsoluteY, 7);
    opcodes[0x7C] = instruction!(top, AbsoluteX, 4);
    opcodes[0x7D] = instruction!(adc, AbsoluteX, 4);
    opcodes[0x7E] = instruction!(ror, AbsoluteX, 7);
    opcodes[0x7F] = instruction!(rra, AbsoluteX, 7);
    opcodes[0x80] = instruction!(dop, Immediate, 2);
    opcodes[0x81] = instruction!(sta, IndirectX, 6);
    opcodes[0x82] = instruction!(dop, Immediate, 2);
    opcodes[0x83] = instruction!(sax, IndirectX, 6);
    opcodes[0x84] = instruction!(sty, ZeroPage, 3);
    opcodes[0x85] = instruction!(sta, ZeroPage, 3);
    opcodes[0x86] = instruction!(stx, ZeroPage, 3);
    opcodes[0x87] = instruction!(sax, ZeroPage, 3);
    opcodes[0x88] = instruction!(dey, 2);
    opcodes[0x89] = instruction!(dop, Immediate, 2);
    opcodes[0x8A] = instruction!(txa, 2);
    opcodes[0x8B] = instruction!(xaa, Immediate, 2);
    opcodes[0x8C] = instruction!(sty, Absolute, 4);
    opcodes[0x8D] = instruction!(sta, Absolute, 4);
    opcodes[0x8E] = instruction!(stx, Absolute, 4);
    opcodes[0x8F] = instruction!(sax, Absolute, 4);
    opcodes[0x90] = instruction!(bcc, Relative, 2);
    opcodes[0x91] = instruction!(sta, IndirectY, 6);
    opcodes[0x92] = instruction!(jam, 2);
    opcodes[0x93] = instruction!(sha, IndirectY, 6);
    opcodes[0x94] = instruction!(sty, ZeroPageX, 4);
    opcodes[0x95] = instruction!(sta, ZeroPageX, 4);
    opcodes[0x96] = instruction!(stx, ZeroPageY, 4);
    opcodes[0x97] = instruction!(sax, ZeroPageY, 4);
    opcodes[0x98] = instruction!(tya, 2);
    opcodes[0x99] = instruction!(sta, AbsoluteY, 5);
    opcodes[0x9A] = instruction!(txs, 2);
    opcodes[0x9B] = instruction!(tas, AbsoluteY, 5);
    opcodes[0x9C] = instruction!(shy, AbsoluteX, 5);
    opcodes[0x9D] = instruction!(sta, AbsoluteX, 5);
    opcodes[0x9E] = instruction!(shx, AbsoluteY, 5);
    opcodes[0x9F] = instruction!(sha, AbsoluteY, 5);
    opcodes[0xA0] = instruction!(ldy, Immediate, 2);
    opcodes[0xA1] = instruction!(lda, IndirectX, 6);
    opcodes[0xA2] = instruction!(ldx, Immediate, 2);
    opcodes[0xA3] = instruction!(lax, IndirectX, 6);
    opcodes[0xA4] = instruction!(ldy, ZeroPage, 3);
    opcodes[0xA5] = instruction!(lda, ZeroPage, 3);
    opcodes[0xA6] = instruction!(ldx, ZeroPage, 3);
    opcodes[0xA7] = instruction!(lax, ZeroPage, 3);
    opcodes[0xA8] = instruction!(tay, 2);
    opcodes[0xA9] = instruction!(lda, Immediate, 2);
    opcodes[0xAA] = instruction!(tax, 2);
    opcodes[0xAB] = instruction!(lxa, Immediate, 2);
    opcodes[0xAC] = instruction!(ldy, Absolute, 4);
    opcodes[0xAD] = instruction!(lda, Absolute, 4);
    opcodes[0xAE] = instruction!(ldx, Absolute, 4);
    opcodes[0xAF] = instruction!(lax, Absolute, 4);
    opcodes[0xB0] = instruction!(bcs, Relative, 2);
    opcodes[0xB1] = instruction!(lda, IndirectY, 5);
    opcodes[0xB2] = instruction!(jam, 2);
    opcodes[0xB3] = instruction!(lax, IndirectY, 5);
    opcodes[0xB4] = instruction!(ldy, ZeroPageX, 4);
    opcodes[0xB5] = instruction!(lda, ZeroPageX, 4);
    opcodes[0xB6] = instruction!(ldx, ZeroPageY, 4);
    opcodes[0xB7] = instruction!(lax, ZeroPageY, 4);
    opcodes[0xB8] = instruction!(clv, 2);
    opcodes[0xB9] = instruction!(lda, AbsoluteY, 4);
    opcodes[0xBA] = instruction!(tsx, 2);
    opcodes[0xBB] = instruction!(las, AbsoluteY, 4);
    opcodes[0xBC] = instruction!(ldy, AbsoluteX, 4);
    opcodes[0xBD] = instruction!(lda, AbsoluteX, 4);
    opcodes[0xBE] = instruction!(ldx, AbsoluteY, 4);
    opcodes[0xBF] = instruction!(lax, AbsoluteY, 4);
    opcodes[0xC0] = instruction!(cpy, Immediate, 2);
    opcodes[0xC1] = instruction!(cmp, IndirectX, 6);
    opcodes[0xC2] = instruction!(dop, Immediate, 2);
    opcodes[0xC3] = instruction!(dcp, IndirectX, 8);
    opcodes[0xC4] = instruction!(cpy, ZeroPage, 3);
    opcodes[0xC5] = instruction!(cmp, ZeroPage, 3);
    opcodes[0xC6] = instruction!(dec, ZeroPage, 5);
    opcodes[0xC7] = instruction!(dcp, ZeroPage, 5);
    opcodes[0xC8] = instruction!(iny, 2);
    opcodes[0xC9] = instruction!(cmp, Immediate, 2);
    opcodes[0xCA] = instruction!(dex, 2);
    opcodes[0xCB] = instruction!(sbx, Immediate, 2);
    opcodes[0xCC] = instruction!(cpy, Absolute, 4);
    opcodes[0xCD] = instruction!(cmp, Absolute, 4);
    opcodes[0xCE] = instruction!(dec, Absolute, 6);
    opcodes[0xCF] = instruction!(dcp, Absolute, 6);
    opcodes[0xD0] = instruction!(bne, Relative, 2);
    opcodes[0xD1] = instruction!(cmp, IndirectY, 5);
    opcodes[0xD2] = instruction!(jam, 2);
    opcodes[0xD3] = instruction!(dcp, IndirectY, 8);
    opcodes[0xD4] = instruction!(dop, ZeroPageX, 4);
    opcodes[0xD5] = instruction!(cmp, ZeroPageX, 4);
    opcodes[0xD6] = instruction!(dec, ZeroPageX, 6);
    opcodes[0xD7] = instruction!(dcp, ZeroPageX, 6);
    opcodes[0xD8] = instruction!(cld, 2);
    opcodes[0xD9] = instruction!(cmp, AbsoluteY, 4);
    opcodes[0xDA] = instruction!(nop, 2);
    opcodes[0xDB] = instruction!(dcp, AbsoluteY, 7);
    opcodes[0xDC] = instruction!(top, AbsoluteX, 4);
    opcodes[0xDD] = instruction!(cmp, AbsoluteX, 4);
    opcodes[0xDE] = instruction!(dec, AbsoluteX, 7);
    opcodes[0xDF] = instruction!(dcp, AbsoluteX, 7);
    opcodes[0xE0] = instruction!(cpx, Immediate, 2);
    opcodes[0xE1] = instruction!(sbc, IndirectX, 6);
    opcodes[0xE2] = instruction!(dop, Immediate, 2);
    opcodes[0xE3] = instruction!(isc, IndirectX, 8);
    opcodes[0xE4] = instruction!(cpx, ZeroPage, 3);
    opcodes[0xE5] = instruction!(sbc, ZeroPage, 3);
    opcodes[0xE6] = instruction!(inc, ZeroPage, 5);
    opcodes[0xE7] = instruction!(isc, ZeroPage, 5);
    opcodes[0xE8] = instruction!(inx, 2);
    opcodes[0xE9] = instruction!(sbc, Immediate, 2);
    opcodes[0xEA] = instruction!(nop, 2);
    opcodes[0xEB] = instruction!(sbc, Immediate, 2);
    opcodes[0xEC] = instruction!(cpx, Absolute, 4);
    opcodes[0xED] = instruction!(sbc, Absolute, 4);
    opcodes[0xEE] = instruction!(inc, Absolute, 6);
    opcodes[0xEF] = instruction!(isc, Absolute, 6);
    opcodes[0xF0] = instruction!(beq, Relative, 2);
    opcodes[0xF1] = instruction!(sbc, IndirectY, 5);
    opcodes[0xF2] = instruction!(jam, 2);
    opcodes[0xF3] = instruction!(isc, IndirectY, 8);
    opcodes[0xF4] = instruction!(dop, ZeroPageX, 4);
    opcodes[0xF5] = instruction!(sbc, ZeroPageX, 4);
    opcodes[0xF6] = instruction!(inc, ZeroPageX, 6);
    opcodes[0xF7] = instruction!(isc, ZeroPageX, 6);
    opcodes[0xF8] = instruction!(sed, 2);
    opcodes[0xF9] = instruction!(sbc, AbsoluteY, 4);
    opcodes[0xFA] = instruction!(nop, 2);
    opcodes[0xFB] = instruction!(isc, AbsoluteY, 7);
    opcodes[0xFC] = instruction!(top, AbsoluteX, 4);
    opcodes[0xFD] = instruction!(sbc, AbsoluteX, 4);
    opcodes[0xFE] = instruction!(inc, AbsoluteX, 7);
    opcodes[0xFF] = instruction!(isc, AbsoluteX, 7);
    opcodes
}
