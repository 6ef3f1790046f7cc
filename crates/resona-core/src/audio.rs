//! CPAL output device plumbing
//!
//! Resolves the default output device into a concrete stream configuration
//! for a track's sample rate and channel count, and builds the output stream
//! around a [`StreamState`]. Streams open at the track's native rate; there
//! is no resampling layer, so a device that cannot do that rate in f32 is a
//! configuration error rather than a silent pitch shift.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{
    BufferSize, SampleFormat, SampleRate, Stream, StreamConfig, SupportedBufferSize,
    SupportedStreamConfigRange,
};

use crate::engine::StreamState;
use crate::error::{PlayerError, Result};
use crate::types::BLOCK_FRAMES;

/// A resolved output device plus the stream config to open it with
pub struct OutputTarget {
    device: cpal::Device,
    config: StreamConfig,
}

impl OutputTarget {
    /// Channel count the stream will open with (may differ from the source;
    /// the render loop maps channels)
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }
}

/// Resolve the default output device for a track's format
pub fn resolve_output(sample_rate: u32, channels: u16) -> Result<OutputTarget> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(PlayerError::NoOutputDevice)?;

    let supported: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| PlayerError::DeviceConfig(e.to_string()))?
        .collect();

    let config = select_config(&supported, sample_rate, channels)?;

    log::info!(
        "Output: {} ch @ {}Hz, buffer {:?}",
        config.channels,
        config.sample_rate.0,
        config.buffer_size
    );

    Ok(OutputTarget { device, config })
}

/// Pick a stream config for the requested format.
///
/// Only f32 configs with the requested rate in range are considered,
/// preferring an exact channel match, then any config with at least the
/// requested channels, then whatever f32 config supports the rate. A device
/// that cannot do the track's rate in f32 yields `DeviceConfig` instead of
/// opening at some other rate.
fn select_config(
    supported: &[SupportedStreamConfigRange],
    sample_rate: u32,
    channels: u16,
) -> Result<StreamConfig> {
    let usable = || {
        supported
            .iter()
            .filter(|c| c.sample_format() == SampleFormat::F32)
            .filter(|c| {
                sample_rate >= c.min_sample_rate().0 && sample_rate <= c.max_sample_rate().0
            })
    };

    let best = usable()
        .find(|c| c.channels() == channels)
        .or_else(|| usable().find(|c| c.channels() >= channels))
        .or_else(|| usable().next())
        .ok_or_else(|| {
            PlayerError::DeviceConfig(format!(
                "no f32 output configuration supports {}Hz",
                sample_rate
            ))
        })?;

    // Fixed blocks where the device allows; ~23ms at 44.1kHz
    let buffer_size = match best.buffer_size() {
        SupportedBufferSize::Range { min, max } if (*min..=*max).contains(&BLOCK_FRAMES) => {
            BufferSize::Fixed(BLOCK_FRAMES)
        }
        _ => BufferSize::Default,
    };

    Ok(StreamConfig {
        channels: best.channels(),
        sample_rate: SampleRate(sample_rate),
        buffer_size,
    })
}

/// Build (but do not start) the output stream around a stream state
pub fn build_stream(target: &OutputTarget, mut state: StreamState) -> Result<Stream> {
    let stream = target
        .device
        .build_output_stream(
            &target.config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                state.render(data);
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None, // No timeout (blocking)
        )
        .map_err(|e| PlayerError::StreamBuild(e.to_string()))?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(
        channels: u16,
        min_rate: u32,
        max_rate: u32,
        format: SampleFormat,
    ) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(min_rate),
            SampleRate(max_rate),
            SupportedBufferSize::Range { min: 64, max: 8192 },
            format,
        )
    }

    #[test]
    fn test_picks_exact_channel_match_at_requested_rate() {
        let supported = vec![
            range(6, 8000, 192_000, SampleFormat::F32),
            range(2, 8000, 192_000, SampleFormat::F32),
        ];
        let config = select_config(&supported, 44100, 2).unwrap();
        assert_eq!(config.channels, 2);
        assert_eq!(config.sample_rate.0, 44100);
        assert_eq!(config.buffer_size, BufferSize::Fixed(BLOCK_FRAMES));
    }

    #[test]
    fn test_mono_source_fits_stereo_device() {
        let supported = vec![range(2, 8000, 48000, SampleFormat::F32)];
        let config = select_config(&supported, 44100, 1).unwrap();
        assert_eq!(config.channels, 2);
    }

    #[test]
    fn test_unsupported_rate_is_config_error() {
        // Device tops out at 48kHz: a 96kHz track must fail, not pitch-shift
        let supported = vec![range(2, 8000, 48000, SampleFormat::F32)];
        let err = select_config(&supported, 96000, 2).unwrap_err();
        assert!(matches!(err, PlayerError::DeviceConfig(_)));
        assert!(err.to_string().contains("96000"));
    }

    #[test]
    fn test_non_f32_only_is_config_error() {
        let supported = vec![range(2, 8000, 192_000, SampleFormat::I16)];
        let err = select_config(&supported, 44100, 2).unwrap_err();
        assert!(matches!(err, PlayerError::DeviceConfig(_)));
    }

    #[test]
    fn test_empty_config_list_is_config_error() {
        let err = select_config(&[], 44100, 2).unwrap_err();
        assert!(matches!(err, PlayerError::DeviceConfig(_)));
    }

    #[test]
    fn test_block_size_outside_device_range_uses_default() {
        let supported = vec![SupportedStreamConfigRange::new(
            2,
            SampleRate(8000),
            SampleRate(48000),
            SupportedBufferSize::Range { min: 32, max: 256 },
            SampleFormat::F32,
        )];
        let config = select_config(&supported, 44100, 2).unwrap();
        assert_eq!(config.buffer_size, BufferSize::Default);
    }
}
