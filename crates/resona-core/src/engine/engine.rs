//! Playback engine: stream lifecycle and transport control
//!
//! The engine lives on the control thread and owns at most one output stream
//! at a time. Transport changes that must land mid-stream (pause, resume,
//! seek) go through the per-stream command queue; everything that replaces
//! the stream (play, stop) happens here directly, with the old stream halted
//! deterministically before the call returns.

use std::sync::Arc;

use crossbeam::channel::{bounded, Receiver, Sender};

use crate::analyzer::BlockMailbox;
use crate::audio;
use crate::engine::atomics::TransportAtomics;
use crate::engine::command::{command_channel, EngineEvent, StreamCommand, EVENT_QUEUE_CAPACITY};
use crate::engine::render::StreamState;
use crate::error::{PlayerError, Result};
use crate::types::{PlayState, SampleBuffer};

pub struct PlaybackEngine {
    stream: Option<cpal::Stream>,
    commands: Option<rtrb::Producer<StreamCommand>>,
    atomics: Arc<TransportAtomics>,
    mailbox: Arc<BlockMailbox>,
    event_tx: Sender<EngineEvent>,
    event_rx: Receiver<EngineEvent>,
    /// Bumped on every play/stop; events from earlier epochs are stale
    epoch: u64,
    /// Control-side view of the transport state
    state: PlayState,
    volume: f32,
}

impl PlaybackEngine {
    pub fn new() -> Self {
        let (event_tx, event_rx) = bounded(EVENT_QUEUE_CAPACITY);
        let atomics = Arc::new(TransportAtomics::new());
        let volume = 0.5;
        atomics.set_volume(volume);
        Self {
            stream: None,
            commands: None,
            atomics,
            mailbox: Arc::new(BlockMailbox::new()),
            event_tx,
            event_rx,
            epoch: 0,
            state: PlayState::Stopped,
            volume,
        }
    }

    /// Shared handle to the analyzer mailbox; pass to `analyzer::spawn`
    pub fn mailbox(&self) -> Arc<BlockMailbox> {
        Arc::clone(&self.mailbox)
    }

    /// Shared handle to the lock-free transport mirror for UI reads
    pub fn atomics(&self) -> Arc<TransportAtomics> {
        Arc::clone(&self.atomics)
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Start playing a decoded track from the beginning.
    ///
    /// Any current stream is halted first. An empty buffer fires
    /// `PlaybackFinished` immediately without opening a stream.
    pub fn play(&mut self, buffer: SampleBuffer) -> Result<()> {
        self.halt_stream();
        self.epoch += 1;

        if buffer.frames() == 0 {
            log::warn!("Empty buffer, nothing to play");
            self.atomics.set_total_frames(0);
            self.atomics.set_position(0);
            self.state = PlayState::Stopped;
            self.atomics.set_play_state(PlayState::Stopped);
            let _ = self
                .event_tx
                .try_send(EngineEvent::PlaybackFinished { epoch: self.epoch });
            return Ok(());
        }

        self.atomics.set_total_frames(buffer.frames() as u64);
        self.atomics.set_position(0);
        self.atomics.set_volume(self.volume);

        let target = audio::resolve_output(buffer.sample_rate, buffer.channels)?;
        let (cmd_tx, cmd_rx) = command_channel();
        let state = StreamState::new(
            buffer,
            target.channels(),
            Arc::clone(&self.atomics),
            cmd_rx,
            Arc::clone(&self.mailbox),
            self.event_tx.clone(),
            self.epoch,
        );

        let stream = audio::build_stream(&target, state)?;
        cpal::traits::StreamTrait::play(&stream)
            .map_err(|e| PlayerError::StreamStart(e.to_string()))?;

        self.stream = Some(stream);
        self.commands = Some(cmd_tx);
        self.state = PlayState::Playing;
        self.atomics.set_play_state(PlayState::Playing);
        Ok(())
    }

    /// Pause without tearing down the stream; no-op when stopped
    pub fn pause(&mut self) {
        if self.state != PlayState::Playing {
            return;
        }
        self.send(StreamCommand::Pause);
        self.state = PlayState::Paused;
    }

    /// Resume a paused stream; no-op otherwise
    pub fn resume(&mut self) {
        if self.state != PlayState::Paused {
            return;
        }
        self.send(StreamCommand::Resume);
        self.state = PlayState::Playing;
    }

    /// Flip Playing and Paused; no-op when stopped
    pub fn toggle_play(&mut self) {
        match self.state {
            PlayState::Playing => self.pause(),
            PlayState::Paused => self.resume(),
            PlayState::Stopped => {}
        }
    }

    /// Halt playback and unload the stream. A finish event queued by the old
    /// stream will be discarded by the epoch filter.
    pub fn stop(&mut self) {
        self.halt_stream();
        self.epoch += 1;
        self.state = PlayState::Stopped;
        self.atomics.set_play_state(PlayState::Stopped);
        self.atomics.set_position(0);
    }

    /// Jump to a frame, clamped to `[0, frames-1]`. Applied by the callback
    /// at the next block boundary; no-op when no stream is open.
    pub fn seek(&mut self, frame: u64) {
        if self.commands.is_none() {
            return;
        }
        let total = self.atomics.total_frames();
        if total == 0 {
            return;
        }
        let clamped = frame.min(total - 1);
        self.atomics.set_position(clamped);
        self.send(StreamCommand::Seek {
            frame: clamped as usize,
        });
    }

    /// Set the output level in [0.0, 1.0]; effective within one block
    pub fn set_volume(&mut self, level: f32) {
        self.volume = level.clamp(0.0, 1.0);
        self.atomics.set_volume(self.volume);
    }

    /// Non-blocking event poll. Events from a stream that was since stopped
    /// or replaced are discarded.
    pub fn poll_event(&mut self) -> Option<EngineEvent> {
        while let Ok(event) = self.event_rx.try_recv() {
            if event.epoch() != self.epoch {
                log::debug!("Discarding stale engine event: {:?}", event);
                continue;
            }
            match event {
                EngineEvent::PlaybackFinished { .. } => {
                    self.halt_stream();
                    self.state = PlayState::Stopped;
                    self.atomics.set_play_state(PlayState::Stopped);
                }
            }
            return Some(event);
        }
        None
    }

    /// Queue a finish event for the current epoch, exactly as the callback
    /// does at the natural end of a track
    #[cfg(test)]
    pub(crate) fn finish_current_track(&self) {
        let _ = self
            .event_tx
            .try_send(EngineEvent::PlaybackFinished { epoch: self.epoch });
    }

    fn send(&mut self, cmd: StreamCommand) {
        if let Some(tx) = self.commands.as_mut() {
            if tx.push(cmd).is_err() {
                log::warn!("Stream command queue full, dropping {:?}", cmd);
            }
        }
    }

    /// Deterministic halt: the device stops consuming before this returns
    fn halt_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = cpal::traits::StreamTrait::pause(&stream) {
                log::warn!("Failed to pause stream before drop: {}", e);
            }
            drop(stream);
        }
        self.commands = None;
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}
