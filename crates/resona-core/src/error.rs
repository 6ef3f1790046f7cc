//! Player error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during playback, decoding, or playlist navigation
#[derive(Error, Debug)]
pub enum PlayerError {
    /// No audio output device available
    #[error("No audio output device found")]
    NoOutputDevice,

    /// No usable output configuration for the requested format
    #[error("Failed to resolve output config: {0}")]
    DeviceConfig(String),

    /// Failed to build the output stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuild(String),

    /// Failed to start the output stream
    #[error("Failed to start audio stream: {0}")]
    StreamStart(String),

    /// File could not be decoded (unsupported format, corrupt data)
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Navigation requested on an empty playlist
    #[error("Playlist is empty")]
    EmptyPlaylist,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for player operations
pub type Result<T> = std::result::Result<T, PlayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlayerError::Decode {
            path: PathBuf::from("/music/broken.mp3"),
            reason: "unsupported codec".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("broken.mp3"));
        assert!(msg.contains("unsupported codec"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PlayerError = io.into();
        assert!(matches!(err, PlayerError::Io(_)));
    }
}
