//! Playlist management
//!
//! Ordered track list with a current index, shuffle permutations, and the two
//! repeat modes. Navigation never fails: boundary behavior is wrap (repeat-all
//! on) or clamp (repeat-all off), and an empty playlist simply yields `None`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::seq::SliceRandom;

use crate::metadata::{self, TrackMetadata};

/// One entry in the playlist, immutable once constructed
#[derive(Debug, Clone)]
pub struct Track {
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    pub duration: Option<Duration>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
}

impl Track {
    /// Build a track from a file path, reading tags best-effort
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let meta = metadata::read_metadata(&path);
        Self::from_metadata(path, meta)
    }

    fn from_metadata(path: PathBuf, meta: TrackMetadata) -> Self {
        Self {
            path,
            title: meta.title,
            artist: meta.artist,
            duration: meta.duration,
            sample_rate: meta.sample_rate,
            channels: meta.channels,
        }
    }

    /// Display name for list views
    pub fn display_name(&self) -> &str {
        &self.title
    }
}

/// Ordered track list with shuffle and repeat semantics
#[derive(Debug, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    index: usize,
    shuffle: bool,
    repeat_all: bool,
    repeat_one: bool,
    /// Upcoming indices in shuffle mode, consumed from the front
    shuffle_queue: Vec<usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append tracks built from file paths, reading tags for each
    pub fn add_files<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self.tracks.push(Track::from_path(path.as_ref()));
        }
        self.reset_shuffle();
    }

    /// Append an already-constructed track
    pub fn add_track(&mut self, track: Track) {
        self.tracks.push(track);
        self.reset_shuffle();
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Jump to a specific track; out-of-range indices are ignored
    pub fn set_index(&mut self, idx: usize) {
        if idx < self.tracks.len() {
            self.index = idx;
        }
    }

    /// The track at the current index, if any
    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.index)
    }

    /// Advance to the next track and return it.
    ///
    /// Shuffle mode consumes the shuffle queue, regenerating a fresh
    /// permutation when it runs out. Order mode wraps to the start when
    /// repeat-all is on, otherwise clamps at the last track.
    pub fn next(&mut self) -> Option<&Track> {
        if self.tracks.is_empty() {
            return None;
        }
        if self.shuffle {
            self.index = self.pop_shuffled();
        } else if self.index + 1 >= self.tracks.len() {
            if self.repeat_all {
                self.index = 0;
            } else {
                self.index = self.tracks.len() - 1;
            }
        } else {
            self.index += 1;
        }
        self.tracks.get(self.index)
    }

    /// Step back to the previous track and return it.
    ///
    /// Shuffle mode draws from the shuffle queue just like [`next`];
    /// order mode wraps to the end when repeat-all is on, otherwise clamps
    /// at the first track.
    ///
    /// [`next`]: Playlist::next
    pub fn prev(&mut self) -> Option<&Track> {
        if self.tracks.is_empty() {
            return None;
        }
        if self.shuffle {
            self.index = self.pop_shuffled();
        } else if self.index == 0 {
            if self.repeat_all {
                self.index = self.tracks.len() - 1;
            }
        } else {
            self.index -= 1;
        }
        self.tracks.get(self.index)
    }

    pub fn shuffle_enabled(&self) -> bool {
        self.shuffle
    }

    pub fn repeat_all(&self) -> bool {
        self.repeat_all
    }

    pub fn repeat_one(&self) -> bool {
        self.repeat_one
    }

    /// Toggle shuffle; enabling discards any in-progress queue and
    /// regenerates a fresh permutation
    pub fn set_shuffle(&mut self, enabled: bool) {
        self.shuffle = enabled;
        self.reset_shuffle();
    }

    /// Enabling repeat-all clears repeat-one
    pub fn set_repeat_all(&mut self, enabled: bool) {
        self.repeat_all = enabled;
        if enabled {
            self.repeat_one = false;
        }
    }

    /// Enabling repeat-one clears repeat-all
    pub fn set_repeat_one(&mut self, enabled: bool) {
        self.repeat_one = enabled;
        if enabled {
            self.repeat_all = false;
        }
    }

    fn pop_shuffled(&mut self) -> usize {
        if self.shuffle_queue.is_empty() {
            self.reset_shuffle();
        }
        // Queue is non-empty here whenever tracks is non-empty
        if self.shuffle_queue.is_empty() {
            return self.index;
        }
        self.shuffle_queue.remove(0)
    }

    fn reset_shuffle(&mut self) {
        if self.shuffle && !self.tracks.is_empty() {
            let mut indices: Vec<usize> = (0..self.tracks.len()).collect();
            indices.shuffle(&mut rand::thread_rng());
            self.shuffle_queue = indices;
        } else {
            self.shuffle_queue.clear();
        }
    }
}
