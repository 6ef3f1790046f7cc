//! Lock-free messaging between the control side and the audio callback
//!
//! Commands travel UI→audio over an `rtrb` SPSC ringbuffer: the control side
//! pushes in O(1) without blocking, the callback drains pending commands at
//! the start of each block, so state never changes mid-block. A fresh channel
//! is created per stream, so commands can never leak from one track into the
//! next.
//!
//! Events travel audio→control over a bounded crossbeam channel. Each event
//! carries the epoch of the stream that produced it; the engine bumps its
//! epoch on every `play`/`stop` and discards events from earlier epochs, so
//! a finish notification queued by a stream that was since replaced is never
//! delivered.

/// Capacity of the per-stream command queue. Far more than can accumulate
/// in one ~23ms callback period.
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Capacity of the audio→control event channel
pub const EVENT_QUEUE_CAPACITY: usize = 16;

/// Commands applied by the audio callback at the next block boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCommand {
    /// Keep the stream open but emit silence
    Pause,
    /// Resume emitting samples
    Resume,
    /// Jump the playhead to this frame (already clamped by the engine)
    Seek { frame: usize },
}

/// Notifications from the audio callback to the control side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The track played to its natural end. Fired exactly once per stream,
    /// never as a result of `stop()`.
    PlaybackFinished { epoch: u64 },
}

impl EngineEvent {
    /// Epoch of the stream that produced this event
    pub fn epoch(&self) -> u64 {
        match self {
            EngineEvent::PlaybackFinished { epoch } => *epoch,
        }
    }
}

/// Create a command channel for one stream.
///
/// Returns `(Producer, Consumer)` where the producer stays with the engine
/// and the consumer moves into the stream callback.
pub fn command_channel() -> (rtrb::Producer<StreamCommand>, rtrb::Consumer<StreamCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_channel_roundtrip() {
        let (mut tx, mut rx) = command_channel();
        tx.push(StreamCommand::Pause).unwrap();
        tx.push(StreamCommand::Seek { frame: 1234 }).unwrap();
        assert_eq!(rx.pop().unwrap(), StreamCommand::Pause);
        assert_eq!(rx.pop().unwrap(), StreamCommand::Seek { frame: 1234 });
        assert!(rx.pop().is_err());
    }

    #[test]
    fn test_command_channel_empty() {
        let (_tx, mut rx) = command_channel();
        assert!(rx.pop().is_err());
    }

    #[test]
    fn test_event_epoch() {
        let ev = EngineEvent::PlaybackFinished { epoch: 7 };
        assert_eq!(ev.epoch(), 7);
    }
}
