//! Player configuration
//!
//! In-memory settings applied to the transport controller at startup. The
//! struct derives serde so a front-end can persist it in whatever format it
//! likes; the core itself does no config file I/O.

use serde::{Deserialize, Serialize};

/// Player settings with sensible defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Volume on the UI scale, 0-100
    pub volume: u8,
    /// Randomized track order
    pub shuffle: bool,
    /// Wrap around at playlist boundaries and auto-advance on finish
    pub repeat_all: bool,
    /// Replay the current track on finish (mutually exclusive with repeat_all)
    pub repeat_one: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume: 50,
            shuffle: false,
            repeat_all: false,
            repeat_one: false,
        }
    }
}
