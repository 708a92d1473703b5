//! Implementation of the 6502 main CPU.
//!
//! Cycle accounting is table driven: each opcode adds its base cost after executing, read
//! instructions add one cycle when indexing crosses a page and taken branches add one or two.
//! Hardware events are serviced between instructions, whenever the bus reports that the
//! earliest scheduled event is due.
mod debug;
mod instructions;
mod opcode_table;
mod operands;
mod status;

use std::sync::atomic::Ordering;

use bitcode::Decode;
use bitcode::Encode;
use log::trace;
use log::warn;

use crate::common::address::Address;
use crate::common::address::AddressU16;
use crate::common::address::Wrap;
use crate::common::bus::Bus;
use crate::common::constants::VectorTable;
use crate::common::debug_events::DebugEventCollectorRef;
use crate::common::debug_events::DEBUG_EVENTS_ENABLED;
use crate::common::scheduler::Cycle;

pub use self::debug::CpuDebug;
pub use self::debug::CpuEvent;
pub use self::debug::CpuState;
use self::opcode_table::build_opcode_table;
use self::opcode_table::InstructionDef;
pub use self::status::StatusFlags;

/// Interrupt requests raised by the hardware since they were last taken.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterruptRequests {
    pub nmi: u32,
    pub irq: u32,
}

pub trait MainBus: Bus<AddressU16> {
    /// The current cycle counter.
    fn cycle(&self) -> Cycle;
    fn advance(&mut self, cycles: u64);
    /// The CPU does not execute instructions before this cycle (set by WSYNC).
    fn stall_until(&self) -> Cycle;
    /// Cycle of the earliest scheduled hardware event.
    fn next_event_cycle(&self) -> Option<Cycle>;
    /// Runs all hardware events that are due at the current cycle.
    fn service_events(&mut self);
    fn take_interrupts(&mut self) -> InterruptRequests;
    /// Called with the address of each opcode before it is fetched.
    fn on_instruction_fetch(&mut self, _pc: AddressU16) {}
}

/// The register file, used for debug displays and save states.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub struct CpuRegisters {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub status: u8,
    pub irq_pending: u8,
}

pub struct Cpu<BusT: MainBus> {
    pub bus: BusT,
    pc: AddressU16,
    a: u8,
    x: u8,
    y: u8,
    sp: u8,
    status: StatusFlags,
    /// IRQs asserted while masked, delivered once the I flag clears.
    irq_pending: u8,
    opcode_table: [InstructionDef<BusT>; 256],
    debug_event_collector: DebugEventCollectorRef<CpuEvent>,
    reported_unstable_opcodes: Vec<&'static str>,
}

impl<BusT: MainBus> Cpu<BusT> {
    pub fn new(bus: BusT, debug_event_collector: DebugEventCollectorRef<CpuEvent>) -> Self {
        Self {
            bus,
            pc: AddressU16(0),
            a: 0,
            x: 0,
            y: 0,
            sp: 0,
            status: StatusFlags::default(),
            irq_pending: 0,
            opcode_table: build_opcode_table(),
            debug_event_collector,
            reported_unstable_opcodes: Vec::new(),
        }
    }

    pub fn debug(&self) -> CpuDebug<'_, BusT> {
        CpuDebug(self)
    }

    pub fn registers(&self) -> CpuRegisters {
        CpuRegisters {
            pc: self.pc.0,
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            status: self.status.into(),
            irq_pending: self.irq_pending,
        }
    }

    pub fn set_registers(&mut self, registers: CpuRegisters) {
        self.pc = AddressU16(registers.pc);
        self.a = registers.a;
        self.x = registers.x;
        self.y = registers.y;
        self.sp = registers.sp;
        self.status = registers.status.into();
        self.irq_pending = registers.irq_pending;
    }

    pub fn set_debug_event_collector(&mut self, collector: DebugEventCollectorRef<CpuEvent>) {
        self.debug_event_collector = collector;
    }

    /// Warm reset. Memory and hardware registers are left as they are.
    pub fn reset(&mut self) {
        self.sp = 0xFD;
        self.status.irq_disable = true;
        self.status.decimal = false;
        self.status.break_command = false;
        self.irq_pending = 0;
        self.pc = AddressU16(
            self.bus
                .read_u16(AddressU16(VectorTable::Reset as u16), Wrap::NoWrap),
        );
        self.bus.advance(7);
    }

    pub fn nmi(&mut self) {
        self.interrupt(VectorTable::Nmi);
    }

    /// Asserts an IRQ. While interrupts are disabled the request is counted and delivered once
    /// they are enabled again.
    pub fn irq(&mut self) {
        if self.status.irq_disable {
            self.irq_pending = self.irq_pending.wrapping_add(1);
        } else {
            self.irq_pending = self.irq_pending.saturating_sub(1);
            self.interrupt(VectorTable::Irq);
        }
    }

    fn interrupt(&mut self, vector: VectorTable) {
        self.debug_event_collector
            .collect_event(CpuEvent::Interrupt(vector));
        self.stack_push_u16(self.pc.0);
        self.stack_push_u8(self.status.to_stack_value(false));
        self.status.irq_disable = true;
        self.pc = AddressU16(self.bus.read_u16(AddressU16(vector as u16), Wrap::NoWrap));
        self.bus.advance(7);
    }

    /// Executes until the cycle counter reaches `target`. Returns the final cycle counter.
    pub fn run(&mut self, target: Cycle) -> Cycle {
        while self.bus.cycle() < target {
            if matches!(self.bus.next_event_cycle(), Some(next) if self.bus.cycle() >= next) {
                self.bus.service_events();
            }
            self.deliver_interrupts();

            let now = self.bus.cycle();
            let stall_until = self.bus.stall_until();
            if now < stall_until {
                let mut until = stall_until.min(target);
                if let Some(next) = self.bus.next_event_cycle() {
                    until = until.min(next);
                }
                self.bus.advance(until.max(now + 1) - now);
                continue;
            }

            if self.irq_pending > 0 && !self.status.irq_disable {
                self.irq();
            }
            self.step();
        }
        self.bus.cycle()
    }

    fn deliver_interrupts(&mut self) {
        let requests = self.bus.take_interrupts();
        for _ in 0..requests.nmi {
            self.nmi();
        }
        for _ in 0..requests.irq {
            self.irq();
        }
    }

    /// Fetches and executes a single instruction.
    pub fn step(&mut self) {
        if DEBUG_EVENTS_ENABLED.load(Ordering::Relaxed) {
            let state = self.debug().state();
            trace!(target: "cpu_state", "{}", state);
            self.debug_event_collector
                .collect_event(CpuEvent::Step(state));
        }

        self.bus.on_instruction_fetch(self.pc);
        let opcode = self.fetch_program_u8();
        let instruction = &self.opcode_table[opcode as usize];
        let (execute, cycles) = (instruction.execute, instruction.cycles);
        execute(self);
        self.bus.advance(cycles as u64);
    }

    fn report_unstable_opcode(&mut self, name: &'static str) {
        if !self.reported_unstable_opcodes.contains(&name) {
            self.reported_unstable_opcodes.push(name);
            warn!(
                "Unstable opcode {} at {} executed as no-op",
                name,
                self.pc.sub(1, Wrap::NoWrap)
            );
        }
    }

    fn update_negative_zero_flags(&mut self, value: u8) {
        self.status.negative = value & 0x80 != 0;
        self.status.zero = value == 0;
    }

    fn stack_push_u8(&mut self, value: u8) {
        self.bus
            .write_u8(AddressU16::new_direct_page(1, self.sp), value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn stack_push_u16(&mut self, value: u16) {
        let bytes = value.to_le_bytes();
        self.stack_push_u8(bytes[1]);
        self.stack_push_u8(bytes[0]);
    }

    fn stack_pop_u8(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.bus.read_u8(AddressU16::new_direct_page(1, self.sp))
    }

    fn stack_pop_u16(&mut self) -> u16 {
        u16::from_le_bytes([self.stack_pop_u8(), self.stack_pop_u8()])
    }

    fn fetch_program_u8(&mut self) -> u8 {
        let value = self.bus.read_u8(self.pc);
        self.pc = self.pc.add(1, Wrap::NoWrap);
        value
    }

    fn fetch_program_u16(&mut self) -> u16 {
        let value = self.bus.read_u16(self.pc, Wrap::NoWrap);
        self.pc = self.pc.add(2, Wrap::NoWrap);
        value
    }
}
