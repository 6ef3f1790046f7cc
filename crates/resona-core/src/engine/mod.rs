//! Real-time playback engine
//!
//! Split along the thread boundary: [`PlaybackEngine`] is the control-side
//! surface (stream lifecycle, transport commands, event polling),
//! [`StreamState`] is the audio-callback side (block rendering), and the two
//! talk only through the lock-free command queue, the event channel, and
//! [`TransportAtomics`].

pub mod atomics;
pub mod command;
mod engine;
mod render;

pub use atomics::TransportAtomics;
pub use command::{command_channel, EngineEvent, StreamCommand};
pub use engine::PlaybackEngine;
pub use render::StreamState;
