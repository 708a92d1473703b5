pub mod common;
pub mod components;
pub mod config;
pub mod input;
pub mod machine_state;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::Ordering;

use anyhow::Context;
use anyhow::Result;
use bitcode::Decode;
use bitcode::Encode;
use log::debug;
use log::info;

use crate::common::bus::Bus;
use crate::common::constants::ATARI_CPU_HZ_PAL;
use crate::common::constants::CYCLES_PER_FRAME;
use crate::common::constants::SIO_TURBO_EMU_MULTIPLIER;
use crate::common::constants::TURBO_EMU_MULTIPLIER;
use crate::common::debug_events::null_collector;
use crate::common::debug_events::DebugEventCollectorRef;
use crate::common::debug_events::EventLog;
use crate::common::debug_events::DEBUG_EVENTS_ENABLED;
use crate::common::framebuffer::Framebuffer;
use crate::common::framebuffer::PALETTE;
use crate::common::scheduler::Cycle;
use crate::components::cpu::Cpu;
use crate::components::cpu::CpuEvent;
use crate::components::cpu::CpuRegisters;
use crate::components::cpu::MainBus;
use crate::components::sio::DiskImage;
use crate::config::MachineConfig;
use crate::input::KeySymbol;
use crate::input::Keyboard;
use crate::input::Modifiers;
use crate::input::SourceId;
use crate::machine_state::MachineState;
use crate::machine_state::MachineStateSnapshot;

/// Longest host time slice that is caught up in one go.
const MAX_SLICE_SECONDS: f64 = 0.1;

#[derive(Encode, Decode)]
struct SystemSnapshot {
    cpu: CpuRegisters,
    machine: MachineStateSnapshot,
}

/// The complete machine as seen by a host: load media, feed input, run time slices and pick up
/// video and audio.
pub struct System {
    pub cpu: Cpu<MachineState>,
    config: MachineConfig,
    keyboard: Keyboard,
    running: bool,
    debug_events: Option<Rc<RefCell<EventLog<CpuEvent>>>>,
}

impl Default for System {
    fn default() -> Self {
        Self::new(MachineConfig::default())
    }
}

impl System {
    pub fn new(config: MachineConfig) -> Self {
        let mut machine = MachineState::new();
        machine.option_on_start = config.option_on_start;
        let mut system = Self {
            cpu: Cpu::new(machine, null_collector()),
            config: MachineConfig {
                audio_enabled: false,
                ..config.clone()
            },
            keyboard: Keyboard::new(),
            running: false,
            debug_events: None,
        };
        system.set_audio_enabled(config.audio_enabled);
        system
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn machine(&self) -> &MachineState {
        &self.cpu.bus
    }

    pub fn load_os_rom(&mut self, data: &[u8]) -> Result<()> {
        self.cpu.bus.memory.load_os_rom(data)
    }

    pub fn load_os_rom_file(&mut self, path: &Path) -> Result<()> {
        let data =
            std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
        self.load_os_rom(&data)
            .with_context(|| format!("Cannot load OS ROM {}", path.display()))
    }

    pub fn load_basic_rom(&mut self, data: &[u8]) -> Result<()> {
        self.cpu.bus.memory.load_basic_rom(data)
    }

    pub fn load_basic_rom_file(&mut self, path: &Path) -> Result<()> {
        let data =
            std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
        self.load_basic_rom(&data)
            .with_context(|| format!("Cannot load BASIC ROM {}", path.display()))
    }

    /// Inserts an ATR image into drive 1.
    pub fn load_disk(&mut self, data: &[u8]) -> Result<()> {
        let disk = DiskImage::with_atr_data(data)?;
        self.cpu.bus.sio.insert_disk(disk);
        Ok(())
    }

    pub fn load_disk_file(&mut self, path: &Path) -> Result<()> {
        let disk = DiskImage::with_atr_file(path)?;
        self.cpu.bus.sio.insert_disk(disk);
        Ok(())
    }

    pub fn has_os_rom(&self) -> bool {
        self.cpu.bus.memory.roms().has_os_rom()
    }

    pub fn has_basic_rom(&self) -> bool {
        self.cpu.bus.memory.roms().has_basic_rom()
    }

    pub fn has_disk(&self) -> bool {
        self.cpu.bus.sio.disk().is_some()
    }

    /// Both ROMs are loaded.
    pub fn is_ready(&self) -> bool {
        self.has_os_rom() && self.has_basic_rom()
    }

    /// Starts running time slices. A machine that never ran is hard reset first. Returns false
    /// if the ROMs are missing.
    pub fn start(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        if !self.running && self.cpu.registers().pc == 0 {
            self.hard_reset();
        }
        self.running = true;
        true
    }

    pub fn pause(&mut self) {
        self.running = false;
        if let Some(audio) = self.cpu.bus.pokey.audio_mut() {
            audio.clear();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Power cycle: all chips return to their defaults and the CPU starts at the reset vector.
    /// RAM keeps its contents.
    pub fn hard_reset(&mut self) {
        info!("Hard reset");
        self.cpu.bus.reset();
        self.cpu.reset();
        let turbo = self.config.turbo;
        if let Some(audio) = self.cpu.bus.pokey.audio_mut() {
            audio.set_turbo(turbo);
        }
    }

    /// The Reset key: restarts the CPU only.
    pub fn reset(&mut self) {
        debug!("Warm reset");
        self.cpu.reset();
    }

    pub fn set_turbo(&mut self, turbo: bool) {
        self.config.turbo = turbo;
        self.sync_audio_turbo();
    }

    pub fn set_sio_turbo(&mut self, sio_turbo: bool) {
        self.config.sio_turbo = sio_turbo;
        self.sync_audio_turbo();
    }

    pub fn set_option_on_start(&mut self, option_on_start: bool) {
        self.config.option_on_start = option_on_start;
        self.cpu.bus.option_on_start = option_on_start;
    }

    /// Creates or drops the audio engine. Audio is resynchronized to the current cycle, so
    /// time spent without audio is not rendered.
    pub fn set_audio_enabled(&mut self, enabled: bool) {
        if enabled == self.config.audio_enabled {
            return;
        }
        self.config.audio_enabled = enabled;
        let machine = &mut self.cpu.bus;
        if enabled {
            let now = machine.cycle();
            machine.pokey.enable_audio(
                self.config.sample_rate,
                self.config.target_buffer_samples,
                now,
            );
            self.sync_audio_turbo();
        } else {
            machine.pokey.disable_audio();
        }
    }

    pub fn is_sio_active(&self) -> bool {
        let machine = &self.cpu.bus;
        machine.sio.is_active(&machine.scheduler)
    }

    fn effective_turbo(&self) -> bool {
        self.config.turbo || (self.config.sio_turbo && self.is_sio_active())
    }

    fn sync_audio_turbo(&mut self) {
        let turbo = self.effective_turbo();
        if let Some(audio) = self.cpu.bus.pokey.audio_mut() {
            audio.set_turbo(turbo);
        }
    }

    /// Number of cycles to emulate for `elapsed_seconds` of host time.
    pub fn frame_cycles(&mut self, elapsed_seconds: f64) -> u64 {
        self.sync_audio_turbo();
        let multiplier = if self.config.turbo {
            TURBO_EMU_MULTIPLIER
        } else if self.config.sio_turbo && self.is_sio_active() {
            SIO_TURBO_EMU_MULTIPLIER
        } else {
            1.0
        };
        let seconds = elapsed_seconds.clamp(0.0, MAX_SLICE_SECONDS);
        ((seconds * ATARI_CPU_HZ_PAL as f64 * multiplier) as u64).max(1)
    }

    /// Runs the time slice for `elapsed_seconds` of host time, if the machine is running.
    pub fn execute_for_duration(&mut self, elapsed_seconds: f64) -> Cycle {
        if !self.running {
            return self.cpu.bus.cycle();
        }
        let cycles = self.frame_cycles(elapsed_seconds);
        self.run_cycles(cycles)
    }

    pub fn run_cycles(&mut self, cycles: u64) -> Cycle {
        let target = self.cpu.bus.cycle() + cycles;
        self.run_until(target)
    }

    /// Runs the CPU up to `target` (finishing the instruction in flight) and renders the audio
    /// produced on the way.
    pub fn run_until(&mut self, target: Cycle) -> Cycle {
        let cycle = self.cpu.run(target);
        self.cpu.bus.pokey.sync_audio(cycle);
        cycle
    }

    pub fn execute_frames(&mut self, count: u64) -> Cycle {
        let _span = tracing::info_span!("System::execute_frames", count).entered();
        self.run_cycles(count * CYCLES_PER_FRAME)
    }

    pub fn cycle(&self) -> Cycle {
        self.cpu.bus.cycle()
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.cpu.bus.framebuffer
    }

    pub fn palette(&self) -> &'static [[u8; 3]; 256] {
        &PALETTE
    }

    pub fn audio_samples_available(&self) -> usize {
        self.cpu
            .bus
            .pokey
            .audio()
            .map_or(0, |audio| audio.samples_available())
    }

    pub fn drain_audio(&mut self, max: usize) -> Vec<f32> {
        self.cpu
            .bus
            .pokey
            .audio_mut()
            .map(|audio| audio.drain(max))
            .unwrap_or_default()
    }

    /// Tells the rate feedback how many samples the host still has queued.
    pub fn set_audio_fill_hint(&mut self, samples: Option<usize>) {
        if let Some(audio) = self.cpu.bus.pokey.audio_mut() {
            audio.set_fill_level_hint(samples);
        }
    }

    pub fn cpu_registers(&self) -> CpuRegisters {
        self.cpu.registers()
    }

    /// Returns false if the key is not used by the machine or the machine is not ready.
    pub fn key_down(
        &mut self,
        key: KeySymbol,
        modifiers: Modifiers,
        source: Option<SourceId>,
        repeat: bool,
    ) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.keyboard
            .key_down(&mut self.cpu, key, modifiers, source, repeat)
    }

    pub fn key_up(&mut self, key: KeySymbol, source: Option<SourceId>) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.keyboard.key_up(&mut self.cpu, key, source)
    }

    pub fn release_all_keys(&mut self) {
        self.keyboard.release_all(&mut self.cpu.bus);
    }

    /// Snapshot of the CPU, memory and chip state. ROMs and the disk are not included.
    pub fn save_state(&self) -> Vec<u8> {
        bitcode::encode(&SystemSnapshot {
            cpu: self.cpu.registers(),
            machine: self.cpu.bus.save_state(),
        })
    }

    /// Restores a snapshot. A snapshot that does not decode leaves the machine untouched.
    pub fn load_state(&mut self, encoded: &[u8]) -> Result<()> {
        let snapshot: SystemSnapshot =
            bitcode::decode(encoded).context("Cannot decode save state")?;
        self.cpu
            .bus
            .load_state(snapshot.machine)
            .context("Cannot restore save state")?;
        self.cpu.set_registers(snapshot.cpu);
        self.keyboard = Keyboard::new();
        Ok(())
    }

    /// Starts recording executed instructions and interrupts.
    pub fn enable_debug_events(&mut self) {
        let log = Rc::new(RefCell::new(EventLog::default()));
        self.cpu
            .set_debug_event_collector(DebugEventCollectorRef(log.clone()));
        self.debug_events = Some(log);
        DEBUG_EVENTS_ENABLED.store(true, Ordering::Relaxed);
    }

    /// Removes and returns the recorded debug events, oldest first.
    pub fn take_debug_events(&mut self) -> Vec<CpuEvent> {
        match &self.debug_events {
            Some(log) => log.borrow_mut().log.drain(usize::MAX).collect(),
            None => Vec::new(),
        }
    }
}
