#![cfg(test)]

use std::path::Path;

use hound::WavReader;
use hound::WavWriter;
use image::RgbaImage;

use crate::common::framebuffer::Image;
use crate::common::framebuffer::Rgba32;

impl Image for RgbaImage {
    fn new(width: u32, height: u32) -> Self {
        RgbaImage::new(width, height)
    }

    fn set_pixel(&mut self, index: (u32, u32), value: Rgba32) {
        self.put_pixel(index.0, index.1, image::Rgba(value.0));
    }
}

/// Converts the [-1, 1] float samples of the audio engine to 16 bit PCM.
pub fn samples_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|sample| (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

pub fn compare_wav_against_golden(data: &[i16], sample_rate: u32, path_prefix: &Path) {
    let golden_path = path_prefix.with_extension("wav");
    if golden_path.exists() {
        let golden = read_wav(&golden_path);
        if data != golden {
            let actual_path = path_prefix.with_extension("actual.wav");
            write_wav(data, sample_rate, &actual_path);
            panic!("Actual result does not match golden. See {:?}", actual_path);
        }
    } else {
        create_parent_dir(&golden_path);
        write_wav(data, sample_rate, &golden_path);
    }
}

pub fn compare_image_against_golden(image: &RgbaImage, path_prefix: &Path) {
    let golden_path = path_prefix.with_extension("png");
    if golden_path.exists() {
        let golden = image::open(&golden_path).unwrap().into_rgba8();
        if golden != *image {
            let actual_path = path_prefix.with_extension("actual.png");
            image.save(&actual_path).unwrap();
            panic!("Actual result does not match golden. See {:?}", actual_path);
        }
    } else {
        create_parent_dir(&golden_path);
        image.save(&golden_path).unwrap();
    }
}

fn create_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
}

pub fn write_wav(data: &[i16], sample_rate: u32, filename: &Path) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = WavWriter::create(filename, spec).unwrap();
    let mut i16_writer = writer.get_i16_writer(data.len() as u32);
    for sample in data {
        i16_writer.write_sample(*sample);
    }
    i16_writer.flush().unwrap()
}

pub fn read_wav(filename: &Path) -> Vec<i16> {
    let mut reader = WavReader::open(filename).unwrap();
    reader.samples().map(|s| s.unwrap()).collect()
}

/// Renders a window of audio samples as an ascii plot for assertion messages.
pub fn plot_samples(samples: &[f32]) -> String {
    let data: Vec<f64> = samples.iter().map(|s| *s as f64).collect();
    rasciigraph::plot(
        data,
        rasciigraph::Config::default()
            .with_height(10)
            .with_width(80),
    )
}
