//! Machine options chosen by the host.
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;

use crate::components::pokey::DEFAULT_TARGET_BUFFER_SAMPLES;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineConfig {
    /// Output sample rate of the audio engine in Hz.
    pub sample_rate: u32,
    pub audio_enabled: bool,
    /// Run the machine at 4x speed.
    pub turbo: bool,
    /// Run at 4x speed while the serial bus is busy.
    pub sio_turbo: bool,
    /// Hold Option during boot, which disables BASIC.
    pub option_on_start: bool,
    /// Audio samples kept buffered ahead of the host.
    pub target_buffer_samples: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            audio_enabled: true,
            turbo: false,
            sio_turbo: true,
            option_on_start: false,
            target_buffer_samples: DEFAULT_TARGET_BUFFER_SAMPLES,
        }
    }
}

impl MachineConfig {
    /// Parses a JSON config. Missing fields keep their defaults, errors name the offending
    /// field.
    pub fn from_json(json: &str) -> Result<Self> {
        let deserializer = &mut serde_json::Deserializer::from_str(json);
        serde_path_to_error::deserialize(deserializer)
            .map_err(|error| anyhow::anyhow!("Invalid config at {}: {}", error.path(), error))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("In {}", path.display()))
    }
}
