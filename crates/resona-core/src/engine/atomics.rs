//! Lock-free transport state for UI access

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

use crate::types::PlayState;

/// Atomic mirror of the transport state, readable from any thread without a
/// lock. The audio callback keeps position and state current while a stream
/// is live; the control side writes the rest.
///
/// All operations use `Ordering::Relaxed` since we only need visibility,
/// not synchronization with other memory operations.
pub struct TransportAtomics {
    /// Current playhead position in frames
    position: AtomicU64,
    /// Playback state: 0=Stopped, 1=Playing, 2=Paused
    state: AtomicU8,
    /// Volume in [0.0, 1.0], stored as f32 bits
    volume_bits: AtomicU32,
    /// Total frames in the loaded track (0 when nothing is loaded)
    total_frames: AtomicU64,
}

impl TransportAtomics {
    pub fn new() -> Self {
        Self {
            position: AtomicU64::new(0),
            state: AtomicU8::new(PlayState::Stopped.as_u8()),
            volume_bits: AtomicU32::new(1.0f32.to_bits()),
            total_frames: AtomicU64::new(0),
        }
    }

    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    pub fn set_position(&self, frames: u64) {
        self.position.store(frames, Ordering::Relaxed);
    }

    pub fn play_state(&self) -> PlayState {
        PlayState::from_u8(self.state.load(Ordering::Relaxed))
    }

    pub fn set_play_state(&self, state: PlayState) {
        self.state.store(state.as_u8(), Ordering::Relaxed);
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    pub fn set_volume(&self, level: f32) {
        self.volume_bits.store(level.to_bits(), Ordering::Relaxed);
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames.load(Ordering::Relaxed)
    }

    pub fn set_total_frames(&self, frames: u64) {
        self.total_frames.store(frames, Ordering::Relaxed);
    }

    /// Playback progress in [0.0, 1.0]; 0.0 when nothing is loaded
    pub fn progress(&self) -> f32 {
        let total = self.total_frames();
        if total == 0 {
            return 0.0;
        }
        (self.position() as f64 / total as f64) as f32
    }
}

impl Default for TransportAtomics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let atomics = TransportAtomics::new();
        assert_eq!(atomics.position(), 0);
        assert_eq!(atomics.play_state(), PlayState::Stopped);
        assert_eq!(atomics.volume(), 1.0);
        assert_eq!(atomics.progress(), 0.0);
    }

    #[test]
    fn test_volume_roundtrip() {
        let atomics = TransportAtomics::new();
        atomics.set_volume(0.37);
        assert_eq!(atomics.volume(), 0.37);
    }

    #[test]
    fn test_progress() {
        let atomics = TransportAtomics::new();
        atomics.set_total_frames(1000);
        atomics.set_position(250);
        assert!((atomics.progress() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_state_roundtrip() {
        let atomics = TransportAtomics::new();
        atomics.set_play_state(PlayState::Paused);
        assert_eq!(atomics.play_state(), PlayState::Paused);
    }
}
