//! Audio file decoding via Symphonia
//!
//! Decodes a whole file to interleaved f32 samples up front; the playback
//! engine then streams from memory. Packet-level decode errors are logged and
//! skipped so a glitchy file still plays; files Symphonia cannot probe or
//! open a decoder for fail with [`PlayerError::Decode`].

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer as SymphoniaBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{PlayerError, Result};

/// Decoded PCM for one file
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved f32 samples, `frames * channels` long
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
}

impl DecodedAudio {
    /// Total number of frames
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }
}

fn decode_error(path: &Path, reason: impl ToString) -> PlayerError {
    PlayerError::Decode {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Decode an audio file to interleaved f32 samples
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path).map_err(|e| decode_error(path, e))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Hint the probe with the file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| decode_error(path, e))?;

    let mut format = probed.format;

    // Find the first audio track
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| decode_error(path, "no audio track found"))?;

    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| decode_error(path, "unknown sample rate"))?;

    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_error(path, e))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SymphoniaBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Error reading packet from {}: {}", path.display(), e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("Error decoding packet from {}: {}", path.display(), e);
                continue;
            }
        };

        // Allocate the conversion buffer on first decode
        if sample_buf.is_none() {
            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;
            sample_buf = Some(SymphoniaBuffer::new(duration, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    if samples.is_empty() {
        return Err(decode_error(path, "no decodable audio data"));
    }

    log::info!(
        "Decoded {}: {} frames, {} Hz, {} ch",
        path.display(),
        samples.len() / channels.max(1) as usize,
        sample_rate,
        channels
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_file_is_decode_error() {
        let err = decode_file(Path::new("/nonexistent/track.mp3")).unwrap_err();
        match err {
            PlayerError::Decode { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/track.mp3"));
            }
            other => panic!("expected Decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_file_is_decode_error() {
        let dir = std::env::temp_dir();
        let path = dir.join("resona_decode_garbage_test.mp3");
        std::fs::write(&path, b"this is not audio data at all").unwrap();
        let err = decode_file(&path).unwrap_err();
        assert!(matches!(err, PlayerError::Decode { .. }));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_decoded_audio_frames() {
        let audio = DecodedAudio {
            samples: vec![0.0; 2000],
            sample_rate: 44100,
            channels: 2,
        };
        assert_eq!(audio.frames(), 1000);
    }
}
