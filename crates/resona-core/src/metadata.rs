//! Tag and audio-property reading via lofty
//!
//! Best-effort: missing or unreadable tags degrade to "Unknown" fields and
//! never block playback. Duration and format properties come from lofty's
//! property reader so the playlist can show them without decoding the file.

use std::path::Path;
use std::time::Duration;

use lofty::picture::PictureType;
use lofty::prelude::*;
use lofty::probe::Probe;

/// Tags and audio properties for one file
#[derive(Debug, Clone)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Front cover image bytes, if embedded
    pub cover_art: Option<Vec<u8>>,
    pub duration: Option<Duration>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
}

impl TrackMetadata {
    /// Fallback metadata when the file has no readable tags:
    /// title from the file stem, everything else unknown.
    pub fn fallback(path: &Path) -> Self {
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown")
            .to_string();
        Self {
            title,
            artist: "Unknown".to_string(),
            album: "Unknown".to_string(),
            cover_art: None,
            duration: None,
            sample_rate: None,
            channels: None,
        }
    }
}

/// Read tags and properties from an audio file.
///
/// Never fails: files lofty cannot parse yield [`TrackMetadata::fallback`].
pub fn read_metadata(path: &Path) -> TrackMetadata {
    let tagged_file = match Probe::open(path).and_then(|p| p.read()) {
        Ok(f) => f,
        Err(e) => {
            log::warn!("Failed to read metadata from {}: {}", path.display(), e);
            return TrackMetadata::fallback(path);
        }
    };

    let mut meta = TrackMetadata::fallback(path);

    let properties = tagged_file.properties();
    meta.duration = Some(properties.duration());
    meta.sample_rate = properties.sample_rate();
    meta.channels = properties.channels();

    if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        if let Some(title) = tag.title() {
            if !title.is_empty() {
                meta.title = title.to_string();
            }
        }
        if let Some(artist) = tag.artist() {
            if !artist.is_empty() {
                meta.artist = artist.to_string();
            }
        }
        if let Some(album) = tag.album() {
            if !album.is_empty() {
                meta.album = album.to_string();
            }
        }

        // Prefer an explicit front cover, fall back to the first picture
        let cover = tag
            .pictures()
            .iter()
            .find(|p| p.pic_type() == PictureType::CoverFront)
            .or_else(|| tag.pictures().first());
        meta.cover_art = cover.map(|p| p.data().to_vec());
    }

    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_uses_file_stem() {
        let meta = TrackMetadata::fallback(Path::new("/music/My Song.flac"));
        assert_eq!(meta.title, "My Song");
        assert_eq!(meta.artist, "Unknown");
        assert_eq!(meta.album, "Unknown");
        assert!(meta.cover_art.is_none());
        assert!(meta.duration.is_none());
    }

    #[test]
    fn test_unreadable_file_degrades_to_fallback() {
        let meta = read_metadata(Path::new("/nonexistent/track.mp3"));
        assert_eq!(meta.title, "track");
        assert_eq!(meta.artist, "Unknown");
    }
}
