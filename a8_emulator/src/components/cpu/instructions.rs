//! Implements the 6502 instruction set, including the stable undocumented opcodes.
//!
//! One function per instruction, each named after the mnemonic. They are mapped to opcodes by the
//! [opcode table](super::opcode_table::build_opcode_table), which also holds the base cycle
//! cost of each opcode. Functions here only add cycles on top of that: page crossing penalties
//! of read instructions and taken branches.
use intbits::Bits;

use super::operands::AddressMode;
use super::operands::DecodedOperand;
use super::Cpu;
use super::MainBus;
use crate::common::address::Address;
use crate::common::address::AddressU16;
use crate::common::address::Wrap;
use crate::common::constants::VectorTable;

/// Loads the operand of a read instruction, charging one cycle if indexing crossed a page.
fn load_charging_page_cross(cpu: &mut Cpu<impl MainBus>, operand: &DecodedOperand) -> u8 {
    let value = operand.load(cpu);
    if operand.page_cross() {
        cpu.bus.advance(1);
    }
    value
}

fn add_with_carry(cpu: &mut Cpu<impl MainBus>, value: u8) {
    let a = cpu.a as i32;
    let value = value as i32;
    let carry = cpu.status.carry as i32;
    let mut sum = a + value + carry;
    let binary = (sum & 0xFF) as u8;
    cpu.status.overflow = ((a ^ value) & 0x80) == 0 && ((a ^ sum) & 0x80) != 0;
    if cpu.status.decimal {
        if (a & 0x0F) + (value & 0x0F) + carry > 9 {
            sum += 0x06;
        }
        cpu.status.carry = sum > 0x99;
        if cpu.status.carry {
            sum += 0x60;
        }
    } else {
        cpu.status.carry = sum > 0xFF;
    }
    cpu.a = (sum & 0xFF) as u8;
    // In decimal mode N and Z reflect the binary sum.
    cpu.update_negative_zero_flags(binary);
}

fn subtract_with_borrow(cpu: &mut Cpu<impl MainBus>, value: u8) {
    let a = cpu.a as i32;
    let value = value as i32;
    let borrow = !cpu.status.carry as i32;
    let mut diff = a - value - borrow;
    let binary = (diff & 0xFF) as u8;
    let carry = diff & 0x100 == 0;
    cpu.status.overflow = ((a ^ binary as i32) & (a ^ value) & 0x80) != 0;
    if cpu.status.decimal {
        if (a & 0x0F) - borrow < (value & 0x0F) {
            diff -= 0x06;
        }
        if !carry {
            diff -= 0x60;
        }
    }
    cpu.a = (diff & 0xFF) as u8;
    cpu.status.carry = carry;
    cpu.update_negative_zero_flags(binary);
}

fn compare(cpu: &mut Cpu<impl MainBus>, register: u8, value: u8) {
    let diff = register.wrapping_sub(value);
    cpu.status.carry = register >= value;
    cpu.status.zero = diff == 0;
    cpu.status.negative = diff.bit(7);
}

fn shift_left(cpu: &mut Cpu<impl MainBus>, value: u8, carry_in: bool) -> u8 {
    cpu.status.carry = value.bit(7);
    (value << 1).with_bit(0, carry_in)
}

fn shift_right(cpu: &mut Cpu<impl MainBus>, value: u8, carry_in: bool) -> u8 {
    cpu.status.carry = value.bit(0);
    (value >> 1).with_bit(7, carry_in)
}

fn branch(cpu: &mut Cpu<impl MainBus>, mode: AddressMode, condition: bool) {
    let target = mode.decode(cpu).address();
    if condition {
        let extra = if target.page() != cpu.pc.page() { 2 } else { 1 };
        cpu.bus.advance(extra);
        cpu.pc = target;
    }
}

pub fn lda(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    cpu.a = load_charging_page_cross(cpu, &operand);
    cpu.update_negative_zero_flags(cpu.a);
}

pub fn ldx(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    cpu.x = load_charging_page_cross(cpu, &operand);
    cpu.update_negative_zero_flags(cpu.x);
}

pub fn ldy(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    cpu.y = load_charging_page_cross(cpu, &operand);
    cpu.update_negative_zero_flags(cpu.y);
}

pub fn sta(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = cpu.a;
    operand.store(cpu, value);
}

pub fn stx(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = cpu.x;
    operand.store(cpu, value);
}

pub fn sty(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = cpu.y;
    operand.store(cpu, value);
}

pub fn adc(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = load_charging_page_cross(cpu, &operand);
    add_with_carry(cpu, value);
}

pub fn sbc(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = load_charging_page_cross(cpu, &operand);
    subtract_with_borrow(cpu, value);
}

pub fn and(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = load_charging_page_cross(cpu, &operand);
    cpu.a &= value;
    cpu.update_negative_zero_flags(cpu.a);
}

pub fn ora(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = load_charging_page_cross(cpu, &operand);
    cpu.a |= value;
    cpu.update_negative_zero_flags(cpu.a);
}

pub fn eor(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = load_charging_page_cross(cpu, &operand);
    cpu.a ^= value;
    cpu.update_negative_zero_flags(cpu.a);
}

pub fn cmp(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = load_charging_page_cross(cpu, &operand);
    let register = cpu.a;
    compare(cpu, register, value);
}

pub fn cpx(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let value = mode.decode(cpu).load(cpu);
    let register = cpu.x;
    compare(cpu, register, value);
}

pub fn cpy(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let value = mode.decode(cpu).load(cpu);
    let register = cpu.y;
    compare(cpu, register, value);
}

pub fn bit(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let value = mode.decode(cpu).load(cpu);
    cpu.status.zero = cpu.a & value == 0;
    cpu.status.negative = value.bit(7);
    cpu.status.overflow = value.bit(6);
}

pub fn asl(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = operand.load(cpu);
    let result = shift_left(cpu, value, false);
    operand.store(cpu, result);
    cpu.update_negative_zero_flags(result);
}

pub fn lsr(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = operand.load(cpu);
    let result = shift_right(cpu, value, false);
    operand.store(cpu, result);
    cpu.update_negative_zero_flags(result);
}

pub fn rol(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = operand.load(cpu);
    let carry = cpu.status.carry;
    let result = shift_left(cpu, value, carry);
    operand.store(cpu, result);
    cpu.update_negative_zero_flags(result);
}

pub fn ror(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = operand.load(cpu);
    let carry = cpu.status.carry;
    let result = shift_right(cpu, value, carry);
    operand.store(cpu, result);
    cpu.update_negative_zero_flags(result);
}

pub fn inc(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let result = operand.load(cpu).wrapping_add(1);
    operand.store(cpu, result);
    cpu.update_negative_zero_flags(result);
}

pub fn dec(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let result = operand.load(cpu).wrapping_sub(1);
    operand.store(cpu, result);
    cpu.update_negative_zero_flags(result);
}

pub fn inx(cpu: &mut Cpu<impl MainBus>) {
    cpu.x = cpu.x.wrapping_add(1);
    cpu.update_negative_zero_flags(cpu.x);
}

pub fn iny(cpu: &mut Cpu<impl MainBus>) {
    cpu.y = cpu.y.wrapping_add(1);
    cpu.update_negative_zero_flags(cpu.y);
}

pub fn dex(cpu: &mut Cpu<impl MainBus>) {
    cpu.x = cpu.x.wrapping_sub(1);
    cpu.update_negative_zero_flags(cpu.x);
}

pub fn dey(cpu: &mut Cpu<impl MainBus>) {
    cpu.y = cpu.y.wrapping_sub(1);
    cpu.update_negative_zero_flags(cpu.y);
}

pub fn tax(cpu: &mut Cpu<impl MainBus>) {
    cpu.x = cpu.a;
    cpu.update_negative_zero_flags(cpu.x);
}

pub fn tay(cpu: &mut Cpu<impl MainBus>) {
    cpu.y = cpu.a;
    cpu.update_negative_zero_flags(cpu.y);
}

pub fn txa(cpu: &mut Cpu<impl MainBus>) {
    cpu.a = cpu.x;
    cpu.update_negative_zero_flags(cpu.a);
}

pub fn tya(cpu: &mut Cpu<impl MainBus>) {
    cpu.a = cpu.y;
    cpu.update_negative_zero_flags(cpu.a);
}

pub fn tsx(cpu: &mut Cpu<impl MainBus>) {
    cpu.x = cpu.sp;
    cpu.update_negative_zero_flags(cpu.x);
}

pub fn txs(cpu: &mut Cpu<impl MainBus>) {
    cpu.sp = cpu.x;
}

pub fn pha(cpu: &mut Cpu<impl MainBus>) {
    cpu.stack_push_u8(cpu.a);
}

pub fn php(cpu: &mut Cpu<impl MainBus>) {
    cpu.stack_push_u8(cpu.status.to_stack_value(true));
}

pub fn pla(cpu: &mut Cpu<impl MainBus>) {
    cpu.a = cpu.stack_pop_u8();
    cpu.update_negative_zero_flags(cpu.a);
}

pub fn plp(cpu: &mut Cpu<impl MainBus>) {
    let value = cpu.stack_pop_u8();
    cpu.status.set_from_stack_value(value);
}

pub fn clc(cpu: &mut Cpu<impl MainBus>) {
    cpu.status.carry = false;
}

pub fn cld(cpu: &mut Cpu<impl MainBus>) {
    cpu.status.decimal = false;
}

pub fn cli(cpu: &mut Cpu<impl MainBus>) {
    cpu.status.irq_disable = false;
}

pub fn clv(cpu: &mut Cpu<impl MainBus>) {
    cpu.status.overflow = false;
}

pub fn sec(cpu: &mut Cpu<impl MainBus>) {
    cpu.status.carry = true;
}

pub fn sed(cpu: &mut Cpu<impl MainBus>) {
    cpu.status.decimal = true;
}

pub fn sei(cpu: &mut Cpu<impl MainBus>) {
    cpu.status.irq_disable = true;
}

pub fn nop(_cpu: &mut Cpu<impl MainBus>) {}

pub fn jmp(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    cpu.pc = mode.decode(cpu).address();
}

pub fn jsr(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let target = mode.decode(cpu).address();
    cpu.stack_push_u16(cpu.pc.sub(1, Wrap::NoWrap).0);
    cpu.pc = target;
}

pub fn rts(cpu: &mut Cpu<impl MainBus>) {
    cpu.pc = AddressU16(cpu.stack_pop_u16()).add(1, Wrap::NoWrap);
}

pub fn rti(cpu: &mut Cpu<impl MainBus>) {
    let value = cpu.stack_pop_u8();
    cpu.status.set_from_stack_value(value);
    cpu.pc = AddressU16(cpu.stack_pop_u16());
}

pub fn brk(cpu: &mut Cpu<impl MainBus>) {
    // The byte following BRK is skipped.
    cpu.stack_push_u16(cpu.pc.add(1, Wrap::NoWrap).0);
    cpu.stack_push_u8(cpu.status.to_stack_value(true));
    cpu.status.irq_disable = true;
    cpu.pc = AddressU16(
        cpu.bus
            .read_u16(AddressU16(VectorTable::Irq as u16), Wrap::NoWrap),
    );
}

pub fn bpl(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let condition = !cpu.status.negative;
    branch(cpu, mode, condition);
}

pub fn bmi(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let condition = cpu.status.negative;
    branch(cpu, mode, condition);
}

pub fn bvc(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let condition = !cpu.status.overflow;
    branch(cpu, mode, condition);
}

pub fn bvs(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let condition = cpu.status.overflow;
    branch(cpu, mode, condition);
}

pub fn bcc(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let condition = !cpu.status.carry;
    branch(cpu, mode, condition);
}

pub fn bcs(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let condition = cpu.status.carry;
    branch(cpu, mode, condition);
}

pub fn bne(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let condition = !cpu.status.zero;
    branch(cpu, mode, condition);
}

pub fn beq(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let condition = cpu.status.zero;
    branch(cpu, mode, condition);
}

// Undocumented instructions

pub fn lax(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = load_charging_page_cross(cpu, &operand);
    cpu.a = value;
    cpu.x = value;
    cpu.update_negative_zero_flags(value);
}

pub fn sax(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = cpu.a & cpu.x;
    operand.store(cpu, value);
}

pub fn slo(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = operand.load(cpu);
    let result = shift_left(cpu, value, false);
    operand.store(cpu, result);
    cpu.a |= result;
    cpu.update_negative_zero_flags(cpu.a);
}

pub fn rla(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = operand.load(cpu);
    let carry = cpu.status.carry;
    let result = shift_left(cpu, value, carry);
    operand.store(cpu, result);
    cpu.a &= result;
    cpu.update_negative_zero_flags(cpu.a);
}

pub fn sre(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = operand.load(cpu);
    let result = shift_right(cpu, value, false);
    operand.store(cpu, result);
    cpu.a ^= result;
    cpu.update_negative_zero_flags(cpu.a);
}

pub fn rra(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let value = operand.load(cpu);
    let carry = cpu.status.carry;
    let result = shift_right(cpu, value, carry);
    operand.store(cpu, result);
    add_with_carry(cpu, result);
}

pub fn dcp(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let result = operand.load(cpu).wrapping_sub(1);
    operand.store(cpu, result);
    let register = cpu.a;
    compare(cpu, register, result);
}

pub fn isc(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let operand = mode.decode(cpu);
    let result = operand.load(cpu).wrapping_add(1);
    operand.store(cpu, result);
    subtract_with_borrow(cpu, result);
}

pub fn anc(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let value = mode.decode(cpu).load(cpu);
    cpu.a &= value;
    cpu.update_negative_zero_flags(cpu.a);
    cpu.status.carry = cpu.status.negative;
}

pub fn alr(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let value = mode.decode(cpu).load(cpu) & cpu.a;
    cpu.a = shift_right(cpu, value, false);
    cpu.update_negative_zero_flags(cpu.a);
}

pub fn arr(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let value = mode.decode(cpu).load(cpu) & cpu.a;
    cpu.a = (value >> 1).with_bit(7, cpu.status.carry);
    cpu.update_negative_zero_flags(cpu.a);
    cpu.status.carry = cpu.a.bit(6);
    cpu.status.overflow = cpu.a.bit(6) ^ cpu.a.bit(5);
}

pub fn xaa(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let value = mode.decode(cpu).load(cpu);
    cpu.a = cpu.x & value;
    cpu.update_negative_zero_flags(cpu.a);
}

pub fn lxa(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let value = mode.decode(cpu).load(cpu);
    cpu.a &= value;
    cpu.x = cpu.a;
    cpu.update_negative_zero_flags(cpu.a);
}

pub fn sbx(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    let value = mode.decode(cpu).load(cpu);
    let base = cpu.a & cpu.x;
    cpu.status.carry = base >= value;
    cpu.x = base.wrapping_sub(value);
    cpu.update_negative_zero_flags(cpu.x);
}

/// Two byte NOP. The operand is read and discarded.
pub fn dop(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    mode.decode(cpu).load(cpu);
}

/// Three byte NOP. The operand is read and discarded.
pub fn top(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    mode.decode(cpu).load(cpu);
}

// Unstable instructions. These are a loose compatibility shim rather than an emulation of the
// analog behavior: the operand bytes are consumed so execution continues at the next
// instruction, and nothing else happens.

fn unstable_shim(cpu: &mut Cpu<impl MainBus>, mode: AddressMode, name: &'static str) {
    cpu.report_unstable_opcode(name);
    mode.decode(cpu);
}

pub fn jam(cpu: &mut Cpu<impl MainBus>) {
    cpu.report_unstable_opcode("jam");
}

pub fn sha(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    unstable_shim(cpu, mode, "sha");
}

pub fn shx(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    unstable_shim(cpu, mode, "shx");
}

pub fn shy(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    unstable_shim(cpu, mode, "shy");
}

pub fn tas(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    unstable_shim(cpu, mode, "tas");
}

pub fn las(cpu: &mut Cpu<impl MainBus>, mode: AddressMode) {
    unstable_shim(cpu, mode, "las");
}
