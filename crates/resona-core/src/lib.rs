//! Resona Core - Audio playback, spectrum analysis, and playlist engine

pub mod analyzer;
pub mod audio;
pub mod config;
pub mod controller;
pub mod decode;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod playlist;
pub mod types;

pub use error::{PlayerError, Result};
pub use types::*;
