//! The aggregate of all chips, as seen by the CPU.
//!
//! `MachineState` owns memory and every chip, dispatches CPU bus accesses to them and runs the
//! timed hardware events between instructions. Interrupts raised by the chips are counted here
//! and handed to the CPU through [MainBus::take_interrupts].
#[cfg(test)]
mod test;

use anyhow::Result;
use bitcode::Decode;
use bitcode::Encode;
use log::trace;
use strum::IntoEnumIterator;

use crate::common::address::AddressU16;
use crate::common::bus::Bus;
use crate::common::constants::gtia;
use crate::common::constants::pokey;
use crate::common::constants::ANTIC_BASE;
use crate::common::constants::CYCLES_PER_LINE;
use crate::common::constants::GTIA_BASE;
use crate::common::constants::IRQ_SERIAL_INPUT_DATA_READY;
use crate::common::constants::IRQ_SERIAL_OUTPUT_DATA_NEEDED;
use crate::common::constants::IRQ_SERIAL_OUTPUT_TRANSMISSION_DONE;
use crate::common::constants::PIA_BASE;
use crate::common::constants::POKEY_BASE;
use crate::common::framebuffer::Framebuffer;
use crate::common::scheduler::Cycle;
use crate::common::scheduler::EventScheduler;
use crate::common::scheduler::TimedEvent;
use crate::components::antic::Antic;
use crate::components::antic::AnticState;
use crate::components::cpu::InterruptRequests;
use crate::components::cpu::MainBus;
use crate::components::gtia::Gtia;
use crate::components::gtia::GtiaState;
use crate::components::memory::Memory;
use crate::components::memory::MemoryKind;
use crate::components::memory::MemoryState;
use crate::components::pia::Pia;
use crate::components::pokey::Pokey;
use crate::components::pokey::PokeyState;
use crate::components::pokey::PokeyTimer;
use crate::components::sio::Sio;
use crate::components::sio::SioState;

/// Address of the OS instruction that samples CONSOL to decide whether BASIC stays enabled.
const BOOT_CONSOL_CHECK: u16 = 0xC49A;
/// PORTB after a hard reset: OS ROM in, BASIC and self test out.
const PORTB_RESET: u8 = 0xFF;

/// Snapshot of everything but the CPU registers, the ROM images and the disk.
#[derive(Clone, Encode, Decode)]
pub struct MachineStateSnapshot {
    cycle: Cycle,
    stall_until: Cycle,
    memory: MemoryState,
    pia: Pia,
    antic: AnticState,
    gtia: GtiaState,
    pokey: PokeyState,
    sio: SioState,
    scheduler: EventScheduler,
}

/// The register page a device address belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Device {
    Gtia(u8),
    Pokey(u8),
    Pia(u8),
    Antic(u8),
    Unmapped,
}

impl Device {
    /// Each chip's registers repeat across its page.
    #[inline]
    fn decode(addr: u16) -> Self {
        let offset = (addr & 0xFF) as u8;
        match addr & 0xFF00 {
            GTIA_BASE => Self::Gtia(offset & 0x1F),
            POKEY_BASE => Self::Pokey(offset & 0x0F),
            PIA_BASE => Self::Pia(offset & 0x03),
            ANTIC_BASE => Self::Antic(offset & 0x0F),
            _ => Self::Unmapped,
        }
    }
}

pub struct MachineState {
    pub memory: Memory,
    pub pia: Pia,
    pub antic: Antic,
    pub gtia: Gtia,
    pub pokey: Pokey,
    pub sio: Sio,
    pub framebuffer: Framebuffer,
    pub scheduler: EventScheduler,
    /// Report Option as held while the OS decides whether to enable BASIC.
    pub option_on_start: bool,
    cycle: Cycle,
    stall_until: Cycle,
    interrupts: InterruptRequests,
    instruction_pc: u16,
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineState {
    pub fn new() -> Self {
        Self {
            memory: Memory::new(),
            pia: Pia::new(),
            antic: Antic::new(),
            gtia: Gtia::new(),
            pokey: Pokey::new(),
            sio: Sio::new(),
            framebuffer: Framebuffer::default(),
            scheduler: EventScheduler::new(),
            option_on_start: false,
            cycle: 0,
            stall_until: 0,
            interrupts: InterruptRequests::default(),
            instruction_pc: 0,
        }
    }

    pub fn save_state(&self) -> MachineStateSnapshot {
        MachineStateSnapshot {
            cycle: self.cycle,
            stall_until: self.stall_until,
            memory: self.memory.save_state(),
            pia: self.pia.clone(),
            antic: self.antic.save_state(),
            gtia: self.gtia.save_state(),
            pokey: self.pokey.save_state(),
            sio: self.sio.save_state(),
            scheduler: self.scheduler.clone(),
        }
    }

    /// Restores a snapshot. On error nothing is changed.
    pub fn load_state(&mut self, snapshot: MachineStateSnapshot) -> Result<()> {
        self.memory.load_state(snapshot.memory)?;
        self.cycle = snapshot.cycle;
        self.stall_until = snapshot.stall_until;
        self.pia = snapshot.pia;
        self.antic.load_state(snapshot.antic);
        self.gtia.load_state(snapshot.gtia);
        self.pokey.load_state(snapshot.pokey, snapshot.cycle);
        self.sio.load_state(snapshot.sio);
        self.scheduler = snapshot.scheduler;
        self.interrupts = InterruptRequests::default();
        Ok(())
    }

    /// Halts the CPU for `cycles` from now, on top of any stall already in effect.
    fn stall(&mut self, cycles: u64) {
        self.stall_until = self.stall_until.max(self.cycle + cycles);
    }

    /// Raises an interrupt from a POKEY source if IRQEN allows it.
    pub fn request_irq(&mut self, mask: u8) {
        if self.pokey.request_irq(mask) {
            self.interrupts.irq += 1;
        }
    }

    pub fn request_nmi(&mut self) {
        self.interrupts.nmi += 1;
    }

    fn console_keys(&self) -> u8 {
        if self.option_on_start && self.instruction_pc == BOOT_CONSOL_CHECK {
            return 0x03;
        }
        self.gtia.bus_peek(gtia::CONSOL)
    }

    fn peek_device(&self, addr: u16) -> u8 {
        match Device::decode(addr) {
            Device::Gtia(gtia::CONSOL) => self.console_keys(),
            Device::Gtia(offset) => self.gtia.bus_peek(offset),
            Device::Pokey(pokey::SEROUT_SERIN) => self.sio.serin_peek(),
            Device::Pokey(offset) => self.pokey.bus_peek(offset),
            Device::Pia(offset) => self.pia.bus_read(offset, self.memory.portb()),
            Device::Antic(offset) => self.antic.bus_peek(offset),
            Device::Unmapped => 0xFF,
        }
    }

    fn read_device(&mut self, addr: u16) -> u8 {
        match Device::decode(addr) {
            Device::Pokey(pokey::SEROUT_SERIN) => {
                self.sio.serin_read(self.cycle, &mut self.scheduler)
            }
            Device::Pokey(offset) => self.pokey.bus_read(offset, self.cycle),
            _ => self.peek_device(addr),
        }
    }

    fn write_device(&mut self, addr: u16, value: u8) {
        match Device::decode(addr) {
            Device::Gtia(offset) => self.gtia.bus_write(offset, value),
            Device::Pokey(pokey::SEROUT_SERIN) => {
                self.sio
                    .serout_write(value, self.cycle, &mut self.scheduler)
            }
            Device::Pokey(offset) => {
                self.pokey
                    .bus_write(offset, value, self.cycle, &mut self.scheduler)
            }
            Device::Pia(offset) => {
                if let Some(portb) = self.pia.bus_write(offset, value) {
                    self.memory.set_portb(portb);
                }
            }
            Device::Antic(offset) => {
                if let Some(target) =
                    self.antic
                        .bus_write(offset, value, self.cycle, &self.scheduler)
                {
                    trace!("WSYNC at {} until {}", self.cycle, target);
                    self.stall_until = self.stall_until.max(target);
                }
            }
            Device::Unmapped => (),
        }
    }

    /// The earliest due event and the cycle it was scheduled for.
    fn due_event(&self) -> Option<(TimedEvent, Cycle)> {
        let next = self.scheduler.next()?;
        if next > self.cycle {
            return None;
        }
        TimedEvent::iter()
            .find(|event| self.scheduler.get(*event) == Some(next))
            .map(|event| (event, next))
    }

    fn service_event(&mut self, event: TimedEvent, scheduled: Cycle) {
        match event {
            TimedEvent::DisplayListFetch => {
                // DLIs are timed from the current cycle, which trails `scheduled` when the event
                // is serviced after an instruction.
                let fetch = self
                    .antic
                    .fetch_line(self.cycle, self.memory.ram(), &mut self.scheduler);
                self.stall(fetch.stall);
                if fetch.nmi {
                    self.request_nmi();
                }
                self.scheduler
                    .arm(TimedEvent::DisplayListFetch, scheduled + CYCLES_PER_LINE);
            }
            TimedEvent::DrawLine => {
                let line = self.antic.current_line();
                if line == 0 {
                    self.framebuffer.clear_priority();
                }
                let stall = self.antic.draw_line(
                    self.memory.ram(),
                    self.gtia.registers(),
                    &mut self.framebuffer,
                );
                self.stall(stall);
                self.gtia.draw_player_missiles(
                    line,
                    self.antic.mode(),
                    self.antic.dmactl(),
                    self.antic.pmbase(),
                    self.memory.ram(),
                    &mut self.framebuffer,
                );
                self.scheduler
                    .arm(TimedEvent::DrawLine, scheduled + CYCLES_PER_LINE);
            }
            TimedEvent::Dli => {
                if self.antic.service_dli(&mut self.scheduler) {
                    self.request_nmi();
                }
            }
            TimedEvent::SerialOutputTransmissionDone => {
                self.scheduler.disarm(event);
                self.request_irq(IRQ_SERIAL_OUTPUT_TRANSMISSION_DONE);
            }
            TimedEvent::SerialOutputDataNeeded => {
                self.scheduler.disarm(event);
                self.request_irq(IRQ_SERIAL_OUTPUT_DATA_NEEDED);
            }
            TimedEvent::SerialInputDataReady => {
                self.scheduler.disarm(event);
                self.request_irq(IRQ_SERIAL_INPUT_DATA_READY);
            }
            TimedEvent::Timer1 | TimedEvent::Timer2 | TimedEvent::Timer4 => {
                let timer = match event {
                    TimedEvent::Timer1 => PokeyTimer::Timer1,
                    TimedEvent::Timer2 => PokeyTimer::Timer2,
                    _ => PokeyTimer::Timer4,
                };
                if self
                    .pokey
                    .service_timer(timer, self.cycle, &mut self.scheduler)
                {
                    self.interrupts.irq += 1;
                }
            }
        }
    }
}

impl Bus<AddressU16> for MachineState {
    fn peek_u8(&self, addr: AddressU16) -> Option<u8> {
        Some(match self.memory.kind(addr.0) {
            MemoryKind::Ram | MemoryKind::Rom => self.memory.read(addr.0),
            MemoryKind::Device => self.peek_device(addr.0),
        })
    }

    #[inline]
    fn read_u8(&mut self, addr: AddressU16) -> u8 {
        match self.memory.kind(addr.0) {
            MemoryKind::Ram | MemoryKind::Rom => self.memory.read(addr.0),
            MemoryKind::Device => self.read_device(addr.0),
        }
    }

    #[inline]
    fn write_u8(&mut self, addr: AddressU16, value: u8) {
        match self.memory.kind(addr.0) {
            MemoryKind::Ram => self.memory.write(addr.0, value),
            MemoryKind::Rom => (),
            MemoryKind::Device => self.write_device(addr.0, value),
        }
    }

    /// Hard reset of the hardware. RAM contents survive, the memory map is rebuilt for the
    /// default PORTB value.
    fn reset(&mut self) {
        self.cycle = 0;
        self.stall_until = 0;
        self.interrupts = InterruptRequests::default();
        self.instruction_pc = 0;
        self.scheduler = EventScheduler::new();
        self.pia = Pia::new();
        self.antic.reset();
        self.gtia.reset();
        self.pokey.reset();
        self.sio.reset();
        self.memory.install(PORTB_RESET);
    }
}

impl MainBus for MachineState {
    #[inline]
    fn cycle(&self) -> Cycle {
        self.cycle
    }

    #[inline]
    fn advance(&mut self, cycles: u64) {
        self.cycle += cycles;
    }

    fn stall_until(&self) -> Cycle {
        self.stall_until
    }

    fn next_event_cycle(&self) -> Option<Cycle> {
        self.scheduler.next()
    }

    fn service_events(&mut self) {
        let _span = tracing::trace_span!("MachineState::service_events").entered();
        while let Some((event, scheduled)) = self.due_event() {
            self.service_event(event, scheduled);
        }
    }

    fn take_interrupts(&mut self) -> InterruptRequests {
        std::mem::take(&mut self.interrupts)
    }

    fn on_instruction_fetch(&mut self, pc: AddressU16) {
        self.instruction_pc = pc.0;
    }
}
