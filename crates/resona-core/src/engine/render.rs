//! Real-time block rendering
//!
//! [`StreamState`] is everything the audio callback owns: the decoded track,
//! the command consumer, the atomic state mirror, the analyzer mailbox and
//! the event sender. `render` fills one output block and is the only code
//! that runs on the audio thread; it never allocates, never takes a contended
//! lock, and never panics. Keeping it off `cpal` directly means every
//! property of the callback is testable without an audio device.

use std::sync::Arc;

use crossbeam::channel::Sender;

use crate::analyzer::BlockMailbox;
use crate::engine::atomics::TransportAtomics;
use crate::engine::command::{EngineEvent, StreamCommand};
use crate::types::{PlayState, SampleBuffer};

/// Per-stream state owned by the audio callback
pub struct StreamState {
    buffer: SampleBuffer,
    /// Channel count of the opened device stream
    device_channels: u16,
    atomics: Arc<TransportAtomics>,
    commands: rtrb::Consumer<StreamCommand>,
    mailbox: Arc<BlockMailbox>,
    events: Sender<EngineEvent>,
    /// Epoch of the `play` call that created this stream
    epoch: u64,
    playing: bool,
    finished_sent: bool,
}

impl StreamState {
    pub fn new(
        buffer: SampleBuffer,
        device_channels: u16,
        atomics: Arc<TransportAtomics>,
        commands: rtrb::Consumer<StreamCommand>,
        mailbox: Arc<BlockMailbox>,
        events: Sender<EngineEvent>,
        epoch: u64,
    ) -> Self {
        Self {
            buffer,
            device_channels,
            atomics,
            commands,
            mailbox,
            events,
            epoch,
            playing: true,
            finished_sent: false,
        }
    }

    /// Fill one output block.
    ///
    /// Drains pending commands, then copies `min(requested, remaining)`
    /// frames scaled by the current volume, mapping source channels onto
    /// device channels (mono is duplicated). The shortfall is zero-filled.
    /// The exact emitted samples are published to the analyzer mailbox, and
    /// on exhaustion a `PlaybackFinished` event is sent exactly once.
    pub fn render(&mut self, out: &mut [f32]) {
        while let Ok(cmd) = self.commands.pop() {
            match cmd {
                StreamCommand::Pause => {
                    self.playing = false;
                    self.atomics.set_play_state(PlayState::Paused);
                }
                StreamCommand::Resume => {
                    self.playing = true;
                    self.atomics.set_play_state(PlayState::Playing);
                }
                StreamCommand::Seek { frame } => {
                    // Clamped again here: commands queued before a buffer
                    // swap must not read out of bounds
                    let last = self.buffer.frames().saturating_sub(1);
                    self.buffer.position = frame.min(last);
                    self.atomics.set_position(self.buffer.position as u64);
                }
            }
        }

        if !self.playing || self.finished_sent {
            out.fill(0.0);
            return;
        }

        let oc = self.device_channels as usize;
        let sc = self.buffer.channels as usize;
        if oc == 0 || sc == 0 {
            out.fill(0.0);
            return;
        }

        let volume = self.atomics.volume();
        let requested = out.len() / oc;
        let frames = requested.min(self.buffer.remaining_frames());

        for f in 0..frames {
            let src_base = (self.buffer.position + f) * sc;
            let dst_base = f * oc;
            for ch in 0..oc {
                // Mono duplicates; extra device channels take the last
                // source channel
                let src_ch = ch.min(sc - 1);
                out[dst_base + ch] = self.buffer.samples[src_base + src_ch] * volume;
            }
        }

        // Zero-fill the shortfall past the end of the track
        out[frames * oc..].fill(0.0);

        if frames > 0 {
            self.mailbox.publish(&out[..frames * oc]);
        }

        self.buffer.position += frames;
        self.atomics.set_position(self.buffer.position as u64);

        if self.buffer.is_exhausted() && !self.finished_sent {
            self.finished_sent = true;
            self.playing = false;
            self.atomics.set_play_state(PlayState::Stopped);
            // Drop on full: the control side polls faster than tracks end
            let _ = self.events.try_send(EngineEvent::PlaybackFinished { epoch: self.epoch });
        }
    }
}
