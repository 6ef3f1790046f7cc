//! Common types for Resona
//!
//! Fundamental audio types shared across the playback engine, analyzer and
//! playlist: the sample type, the transport state machine, and the decoded
//! per-track sample buffer the engine streams from.

/// Audio sample type used throughout Resona
pub type Sample = f32;

/// Fixed block size requested from the output device (in frames).
/// At 44.1kHz this is ~23ms per callback.
pub const BLOCK_FRAMES: u32 = 1024;

/// Transport state of the playback engine.
///
/// The output device is actively consuming samples iff a stream is open and
/// the state is `Playing`. `Paused` keeps the stream alive but emits silence;
/// `Stopped` means no track is loaded (or the last one finished).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Playing,
    Paused,
}

impl PlayState {
    /// Encode for storage in an atomic (see `TransportAtomics`)
    pub fn as_u8(self) -> u8 {
        match self {
            PlayState::Stopped => 0,
            PlayState::Playing => 1,
            PlayState::Paused => 2,
        }
    }

    /// Decode from the atomic representation; unknown values read as Stopped
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => PlayState::Playing,
            2 => PlayState::Paused,
            _ => PlayState::Stopped,
        }
    }
}

/// Decoded audio for one track, owned by the stream callback during playback.
///
/// Samples are interleaved f32 in [-1.0, 1.0]. `position` is the next unread
/// frame; the engine resets it on `play` and the callback advances it as
/// blocks are emitted. The whole buffer is replaced wholesale when the next
/// track starts — there is no in-place mutation of the sample data.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    /// Interleaved samples, `frames * channels` long
    pub samples: Vec<Sample>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, ...)
    pub channels: u16,
    /// Next unread frame, `0 <= position <= frames()`
    pub position: usize,
}

impl SampleBuffer {
    /// Create a buffer positioned at the start
    pub fn new(samples: Vec<Sample>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
            position: 0,
        }
    }

    /// Create an empty buffer (useful for tests and the stopped state)
    pub fn empty(sample_rate: u32, channels: u16) -> Self {
        Self::new(Vec::new(), sample_rate, channels)
    }

    /// Total number of frames in the buffer
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Frames remaining from the current position
    pub fn remaining_frames(&self) -> usize {
        self.frames().saturating_sub(self.position)
    }

    /// Whether the read position has reached the end
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.frames()
    }

    /// Duration of the whole buffer in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_state_roundtrip() {
        for state in [PlayState::Stopped, PlayState::Playing, PlayState::Paused] {
            assert_eq!(PlayState::from_u8(state.as_u8()), state);
        }
        // Unknown encodings degrade to Stopped
        assert_eq!(PlayState::from_u8(99), PlayState::Stopped);
    }

    #[test]
    fn test_sample_buffer_frames() {
        let buf = SampleBuffer::new(vec![0.0; 400], 44100, 2);
        assert_eq!(buf.frames(), 200);
        assert_eq!(buf.remaining_frames(), 200);
        assert!(!buf.is_exhausted());
    }

    #[test]
    fn test_sample_buffer_exhaustion() {
        let mut buf = SampleBuffer::new(vec![0.0; 100], 44100, 1);
        buf.position = 100;
        assert!(buf.is_exhausted());
        assert_eq!(buf.remaining_frames(), 0);
    }

    #[test]
    fn test_empty_buffer() {
        let buf = SampleBuffer::empty(48000, 2);
        assert_eq!(buf.frames(), 0);
        assert!(buf.is_exhausted());
        assert_eq!(buf.duration_secs(), 0.0);
    }

    #[test]
    fn test_duration() {
        let buf = SampleBuffer::new(vec![0.0; 44100 * 2], 44100, 2);
        assert!((buf.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_channels_is_safe() {
        let buf = SampleBuffer::new(vec![0.0; 10], 44100, 0);
        assert_eq!(buf.frames(), 0);
        assert!(buf.is_exhausted());
    }
}
