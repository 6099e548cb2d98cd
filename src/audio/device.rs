//! Audio output device selection and stream configuration

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{SampleFormat, SupportedBufferSize, SupportedStreamConfigRange};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name, or the system default when absent
    pub device: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_size: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: 48000,
            channels: 2,
            buffer_size: 512,
        }
    }
}

/// Output device by name, or the system default when `name` is None
pub fn get_output_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();

    let Some(device_name) = name else {
        return host
            .default_output_device()
            .ok_or_else(|| Error::Device("No default output device found".to_string()));
    };

    let mut devices = host
        .output_devices()
        .map_err(|e| Error::Device(format!("Failed to enumerate devices: {}", e)))?;

    devices
        .find(|d| d.name().is_ok_and(|n| n == device_name))
        .ok_or_else(|| Error::Device(format!("Device '{}' not found", device_name)))
}

/// Negotiate an f32 output config for a device, preferring the requested settings
pub fn get_supported_config(
    device: &cpal::Device,
    preferred: &AudioConfig,
) -> Result<cpal::StreamConfig> {
    let ranges: Vec<SupportedStreamConfigRange> = device
        .supported_output_configs()
        .map_err(|e| Error::StreamConfig(e.to_string()))?
        .collect();

    let config = choose_config(&ranges, preferred).ok_or_else(|| {
        Error::StreamConfig("device offers no f32 output format".to_string())
    })?;

    if config.sample_rate.0 != preferred.sample_rate || config.channels != preferred.channels {
        log::warn!(
            "No output config matches {} Hz / {} channels, using {} Hz / {} channels",
            preferred.sample_rate,
            preferred.channels,
            config.sample_rate.0,
            config.channels
        );
    }

    Ok(config)
}

/// Pick a stream config from the f32 ranges a device advertises
///
/// Ranges covering the preferred rate win, an exact channel match first.
/// Otherwise the f32 range with the highest rate is used. The channel count
/// always comes from the chosen range.
fn choose_config(
    ranges: &[SupportedStreamConfigRange],
    preferred: &AudioConfig,
) -> Option<cpal::StreamConfig> {
    let f32_ranges = || {
        ranges
            .iter()
            .filter(|r| r.sample_format() == SampleFormat::F32)
    };

    let covers_rate = |r: &&SupportedStreamConfigRange| {
        (r.min_sample_rate().0..=r.max_sample_rate().0).contains(&preferred.sample_rate)
    };

    if let Some(range) = f32_ranges()
        .filter(covers_rate)
        .find(|r| r.channels() == preferred.channels)
        .or_else(|| f32_ranges().find(covers_rate))
    {
        return Some(cpal::StreamConfig {
            channels: range.channels(),
            sample_rate: cpal::SampleRate(preferred.sample_rate),
            buffer_size: buffer_size(range.buffer_size(), preferred.buffer_size),
        });
    }

    let range = f32_ranges().max_by_key(|r| r.max_sample_rate().0)?;
    let supported = range.clone().with_max_sample_rate();
    Some(cpal::StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size: buffer_size(supported.buffer_size(), preferred.buffer_size),
    })
}

/// Fixed buffer size when the device allows it
fn buffer_size(supported: &SupportedBufferSize, frames: u32) -> cpal::BufferSize {
    match supported {
        SupportedBufferSize::Range { min, max } if (*min..=*max).contains(&frames) => {
            cpal::BufferSize::Fixed(frames)
        }
        _ => cpal::BufferSize::Default,
    }
}
