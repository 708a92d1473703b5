mod output;

use std::path::PathBuf;

use a8_emulator::common::logging;
use a8_emulator::config::MachineConfig;
use a8_emulator::System;
use anyhow::ensure;
use anyhow::Result;
use argh::FromArgs;
use log::info;
use tracing_chrome::ChromeLayerBuilder;
use tracing_subscriber::prelude::*;

/// Headless Atari 800XL
#[derive(FromArgs)]
struct CliArgs {
    /// 16KB OS ROM image
    #[argh(positional)]
    os_rom: PathBuf,

    /// 8KB BASIC ROM image
    #[argh(option)]
    basic: PathBuf,

    /// ATR disk image to insert into drive 1
    #[argh(option)]
    disk: Option<PathBuf>,

    /// number of frames to run
    #[argh(option, default = "300")]
    frames: u64,

    /// write the last frame to this PNG file
    #[argh(option)]
    screenshot: Option<PathBuf>,

    /// write all produced audio to this WAV file
    #[argh(option)]
    wav: Option<PathBuf>,

    /// run at 4x speed
    #[argh(switch)]
    turbo: bool,

    /// hold Option during boot to disable BASIC
    #[argh(switch)]
    option: bool,

    /// JSON machine config, command line switches take precedence
    #[argh(option)]
    config: Option<PathBuf>,

    /// enable generation of trace files
    #[argh(option)]
    trace_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    logging::init();
    let args: CliArgs = argh::from_env();
    let _tracing_guard = if let Some(trace_file) = &args.trace_file {
        let (chrome_layer, guard) = ChromeLayerBuilder::new().file(trace_file).build();
        tracing_subscriber::registry().with(chrome_layer).init();
        Some(guard)
    } else {
        None
    };

    let mut config = match &args.config {
        Some(path) => MachineConfig::from_json_file(path)?,
        None => MachineConfig::default(),
    };
    config.turbo |= args.turbo;
    config.option_on_start |= args.option;
    config.audio_enabled |= args.wav.is_some();

    let mut system = System::new(config);
    system.load_os_rom_file(&args.os_rom)?;
    system.load_basic_rom_file(&args.basic)?;
    if let Some(disk) = &args.disk {
        system.load_disk_file(disk)?;
    }
    ensure!(system.start(), "Machine is missing a ROM");

    let mut samples = Vec::new();
    for _ in 0..args.frames {
        system.execute_frames(1);
        // Drained every frame, the engine's ring holds only a few frames.
        if args.wav.is_some() {
            samples.extend(system.drain_audio(usize::MAX));
        }
    }
    info!(
        "Ran {} frames, {} cycles, PC={:04X}",
        args.frames,
        system.cycle(),
        system.cpu_registers().pc
    );

    if let Some(path) = &args.screenshot {
        output::write_screenshot(&system, path)?;
    }
    if let Some(path) = &args.wav {
        output::write_wav(&samples, system.config().sample_rate, path)?;
    }
    Ok(())
}
