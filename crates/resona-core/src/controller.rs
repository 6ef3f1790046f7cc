//! Transport controller
//!
//! Ties the playback engine, the playlist, and the visualization sink
//! together into one control surface: decode-and-play orchestration, track
//! navigation, the single seek entry point, and the end-of-track policy
//! (repeat-one replays, repeat-all advances, otherwise playback halts).

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use crate::analyzer::{self, BlockMailbox, VisualizationSink};
use crate::config::PlayerConfig;
use crate::decode;
use crate::engine::{EngineEvent, PlaybackEngine, TransportAtomics};
use crate::error::{PlayerError, Result};
use crate::playlist::Playlist;
use crate::types::{PlayState, SampleBuffer};

/// Points in the per-track waveform overview pushed to the sink
pub const WAVEFORM_PREVIEW_POINTS: usize = 512;

/// Notifications surfaced to the front-end from [`TransportController::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// A different track started playing
    TrackChanged { index: usize },
    /// The current track played to its end (fires before any auto-advance
    /// decision is visible)
    PlaybackFinished,
}

/// What to do when a track reaches its natural end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishAction {
    /// Repeat-one: play the same track again
    Replay,
    /// Repeat-all: advance to the next track and play it
    Advance,
    /// Neither repeat mode: playback halts
    Halt,
}

/// End-of-track policy as a pure function of the playlist flags
pub fn after_finish_action(playlist: &Playlist) -> FinishAction {
    if playlist.repeat_one() {
        FinishAction::Replay
    } else if playlist.repeat_all() {
        FinishAction::Advance
    } else {
        FinishAction::Halt
    }
}

pub struct TransportController {
    engine: PlaybackEngine,
    playlist: Playlist,
    sink: Option<Arc<dyn VisualizationSink>>,
    pending: VecDeque<TransportEvent>,
}

impl TransportController {
    pub fn new() -> Self {
        Self {
            engine: PlaybackEngine::new(),
            playlist: Playlist::new(),
            sink: None,
            pending: VecDeque::new(),
        }
    }

    /// Attach the visualization sink that receives waveform previews.
    /// The same sink is typically also passed to `analyzer::spawn`.
    pub fn set_sink(&mut self, sink: Arc<dyn VisualizationSink>) {
        self.sink = Some(sink);
    }

    /// Analyzer mailbox fed by the audio callback
    pub fn mailbox(&self) -> Arc<BlockMailbox> {
        self.engine.mailbox()
    }

    /// Lock-free transport mirror for progress display
    pub fn atomics(&self) -> Arc<TransportAtomics> {
        self.engine.atomics()
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn state(&self) -> PlayState {
        self.engine.state()
    }

    /// Append tracks to the playlist, reading tags for each
    pub fn add_files<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.playlist.add_files(paths);
    }

    /// Decode the current playlist track and start playing it
    pub fn play(&mut self) -> Result<()> {
        let track = self.playlist.current().ok_or(PlayerError::EmptyPlaylist)?;
        let path = track.path.clone();
        log::info!("Playing {}", path.display());

        let decoded = decode::decode_file(&path)?;

        if let Some(sink) = &self.sink {
            let preview = analyzer::waveform_preview(
                &decoded.samples,
                decoded.channels,
                WAVEFORM_PREVIEW_POINTS,
            );
            sink.on_waveform_preview(&preview);
        }

        let buffer = SampleBuffer::new(decoded.samples, decoded.sample_rate, decoded.channels);
        self.engine.play(buffer)
    }

    /// Jump to a playlist index and play it. `TrackChanged` fires as soon as
    /// the selection moves, even if the track then fails to decode.
    pub fn play_index(&mut self, index: usize) -> Result<()> {
        self.playlist.set_index(index);
        self.pending
            .push_back(TransportEvent::TrackChanged { index: self.playlist.index() });
        self.play()
    }

    pub fn pause(&mut self) {
        self.engine.pause();
    }

    pub fn resume(&mut self) {
        self.engine.resume();
    }

    pub fn toggle_play(&mut self) {
        self.engine.toggle_play();
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    /// Advance in the playlist and play the new track
    pub fn next(&mut self) -> Result<()> {
        if self.playlist.next().is_none() {
            return Err(PlayerError::EmptyPlaylist);
        }
        self.pending
            .push_back(TransportEvent::TrackChanged { index: self.playlist.index() });
        self.play()
    }

    /// Step back in the playlist and play the new track
    pub fn prev(&mut self) -> Result<()> {
        if self.playlist.prev().is_none() {
            return Err(PlayerError::EmptyPlaylist);
        }
        self.pending
            .push_back(TransportEvent::TrackChanged { index: self.playlist.index() });
        self.play()
    }

    /// The one seek entry point: jump to an absolute frame
    pub fn seek(&mut self, frame: u64) {
        self.engine.seek(frame);
    }

    /// Seek to a fraction of the track length in [0.0, 1.0]
    pub fn seek_to_fraction(&mut self, fraction: f64) {
        let total = self.engine.atomics().total_frames();
        if total == 0 {
            return;
        }
        let frame = (fraction.clamp(0.0, 1.0) * total as f64) as u64;
        self.engine.seek(frame);
    }

    /// Set volume on the 0-100 UI scale
    pub fn set_volume(&mut self, percent: u8) {
        self.engine.set_volume(percent.min(100) as f32 / 100.0);
    }

    pub fn set_shuffle(&mut self, enabled: bool) {
        self.playlist.set_shuffle(enabled);
    }

    pub fn set_repeat_all(&mut self, enabled: bool) {
        self.playlist.set_repeat_all(enabled);
    }

    pub fn set_repeat_one(&mut self, enabled: bool) {
        self.playlist.set_repeat_one(enabled);
    }

    /// Apply startup settings
    pub fn apply_config(&mut self, config: &PlayerConfig) {
        self.set_volume(config.volume);
        self.playlist.set_shuffle(config.shuffle);
        self.playlist.set_repeat_all(config.repeat_all);
        if config.repeat_one {
            self.playlist.set_repeat_one(true);
        }
    }

    /// Drive the transport: drain engine events, apply the end-of-track
    /// policy, and hand the next notification to the front-end.
    ///
    /// Call regularly from the UI loop; returns at most one event per call.
    pub fn poll(&mut self) -> Option<TransportEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        while let Some(event) = self.engine.poll_event() {
            match event {
                EngineEvent::PlaybackFinished { .. } => self.handle_finished(),
            }
        }

        self.pending.pop_front()
    }

    fn handle_finished(&mut self) {
        self.pending.push_back(TransportEvent::PlaybackFinished);
        match after_finish_action(&self.playlist) {
            FinishAction::Replay => {
                if let Err(e) = self.play() {
                    log::warn!("Failed to replay track: {}", e);
                }
            }
            FinishAction::Advance => self.advance_skipping_failures(),
            FinishAction::Halt => {}
        }
    }

    /// Advance and play, skipping undecodable tracks. Attempts are bounded
    /// by the playlist length so an all-corrupt playlist halts instead of
    /// spinning.
    fn advance_skipping_failures(&mut self) {
        for _ in 0..self.playlist.len() {
            if self.playlist.next().is_none() {
                return;
            }
            match self.play() {
                Ok(()) => {
                    self.pending
                        .push_back(TransportEvent::TrackChanged { index: self.playlist.index() });
                    return;
                }
                Err(e) => {
                    log::warn!("Skipping unplayable track: {}", e);
                }
            }
        }
        log::error!("No playable track found, halting");
    }
}

impl Default for TransportController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist_with_flags(repeat_one: bool, repeat_all: bool) -> Playlist {
        let mut pl = Playlist::new();
        pl.set_repeat_all(repeat_all);
        pl.set_repeat_one(repeat_one);
        pl
    }

    #[test]
    fn test_finish_action_matrix() {
        assert_eq!(
            after_finish_action(&playlist_with_flags(true, false)),
            FinishAction::Replay
        );
        assert_eq!(
            after_finish_action(&playlist_with_flags(false, true)),
            FinishAction::Advance
        );
        assert_eq!(
            after_finish_action(&playlist_with_flags(false, false)),
            FinishAction::Halt
        );
    }

    #[test]
    fn test_volume_percent_mapping() {
        let mut controller = TransportController::new();
        controller.set_volume(0);
        assert_eq!(controller.engine.volume(), 0.0);
        controller.set_volume(50);
        assert_eq!(controller.engine.volume(), 0.5);
        controller.set_volume(100);
        assert_eq!(controller.engine.volume(), 1.0);
        controller.set_volume(250);
        assert_eq!(controller.engine.volume(), 1.0);
    }

    #[test]
    fn test_play_on_empty_playlist() {
        let mut controller = TransportController::new();
        assert!(matches!(controller.play(), Err(PlayerError::EmptyPlaylist)));
        assert!(matches!(controller.next(), Err(PlayerError::EmptyPlaylist)));
        assert!(matches!(controller.prev(), Err(PlayerError::EmptyPlaylist)));
    }

    #[test]
    fn test_play_undecodable_track_errors() {
        let mut controller = TransportController::new();
        controller.add_files(["/nonexistent/ghost.mp3"]);
        assert!(matches!(
            controller.play(),
            Err(PlayerError::Decode { .. })
        ));
        // The engine never started
        assert_eq!(controller.state(), PlayState::Stopped);
    }

    #[test]
    fn test_seek_to_fraction_without_track() {
        let mut controller = TransportController::new();
        controller.seek_to_fraction(0.5);
        assert_eq!(controller.atomics().position(), 0);
    }

    #[test]
    fn test_poll_idle_returns_none() {
        let mut controller = TransportController::new();
        assert!(controller.poll().is_none());
    }

    fn fake_controller(paths: &[&str]) -> TransportController {
        let mut controller = TransportController::new();
        controller.add_files(paths.iter().copied());
        controller
    }

    #[test]
    fn test_repeat_one_replays_same_index() {
        let mut controller = fake_controller(&["/nonexistent/a.mp3", "/nonexistent/b.mp3"]);
        controller.set_repeat_one(true);

        controller.engine.finish_current_track();
        assert_eq!(controller.poll(), Some(TransportEvent::PlaybackFinished));
        // Replay stays on the same playlist entry and never advances
        assert_eq!(controller.playlist().index(), 0);
        assert!(controller.poll().is_none());
    }

    #[test]
    fn test_finish_without_repeat_halts() {
        let mut controller = fake_controller(&["/nonexistent/a.mp3", "/nonexistent/b.mp3"]);

        controller.engine.finish_current_track();
        assert_eq!(controller.poll(), Some(TransportEvent::PlaybackFinished));
        assert_eq!(controller.playlist().index(), 0);
        assert_eq!(controller.state(), PlayState::Stopped);
        assert!(controller.poll().is_none());
    }

    #[test]
    fn test_repeat_all_skip_is_bounded() {
        let mut controller = fake_controller(&["/nonexistent/a.mp3", "/nonexistent/b.mp3"]);
        controller.set_repeat_all(true);

        controller.engine.finish_current_track();
        assert_eq!(controller.poll(), Some(TransportEvent::PlaybackFinished));
        // Every candidate fails to decode: the advance tries each track once
        // (0 -> 1 -> wrap to 0), emits no TrackChanged, and halts
        assert_eq!(controller.playlist().index(), 0);
        assert!(controller.poll().is_none());
        assert_eq!(controller.state(), PlayState::Stopped);
    }

    #[test]
    fn test_next_emits_track_changed() {
        let mut controller = fake_controller(&["/nonexistent/a.mp3", "/nonexistent/b.mp3"]);
        // The selection moves even though decoding fails
        assert!(controller.next().is_err());
        assert_eq!(controller.playlist().index(), 1);
        assert_eq!(
            controller.poll(),
            Some(TransportEvent::TrackChanged { index: 1 })
        );
    }

    #[test]
    fn test_apply_config() {
        let mut controller = TransportController::new();
        let config = PlayerConfig {
            volume: 80,
            shuffle: true,
            repeat_all: false,
            repeat_one: true,
        };
        controller.apply_config(&config);
        assert_eq!(controller.engine.volume(), 0.8);
        assert!(controller.playlist().shuffle_enabled());
        assert!(controller.playlist().repeat_one());
        assert!(!controller.playlist().repeat_all());
    }
}
