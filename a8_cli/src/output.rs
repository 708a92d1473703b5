use std::path::Path;

use a8_emulator::common::constants::VIEW_H;
use a8_emulator::common::constants::VIEW_W;
use a8_emulator::System;
use anyhow::Context;
use anyhow::Result;
use image::RgbaImage;
use log::info;

pub fn write_screenshot(system: &System, path: &Path) -> Result<()> {
    let image = RgbaImage::from_raw(
        VIEW_W as u32,
        VIEW_H as u32,
        system.framebuffer().visible_rgba(),
    )
    .context("Framebuffer does not match the visible window")?;
    image
        .save(path)
        .with_context(|| format!("Cannot write {}", path.display()))?;
    info!("Wrote screenshot to {}", path.display());
    Ok(())
}

/// Writes mono 16 bit PCM.
pub fn write_wav(samples: &[f32], sample_rate: u32, path: &Path) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Cannot create {}", path.display()))?;
    for sample in samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    info!("Wrote {} samples to {}", samples.len(), path.display());
    Ok(())
}
