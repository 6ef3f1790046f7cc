//! Terminal spectrum rendering
//!
//! Sink implementation that keeps the newest analyzer frame and draws it as
//! a row of unicode bars. Frames arrive on the analyzer thread; the main
//! loop pulls the latest one whenever it redraws, dropped frames are fine.

use std::sync::Mutex;

use resona_core::analyzer::{SpectrumFrame, VisualizationSink};

const BAR_GLYPHS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub struct ConsoleVisualizer {
    latest: Mutex<Option<SpectrumFrame>>,
}

impl ConsoleVisualizer {
    pub fn new() -> Self {
        Self {
            latest: Mutex::new(None),
        }
    }

    /// Draw the newest frame as `width` bars, averaging bins per column.
    /// Returns None until the first frame arrives.
    pub fn render_bars(&self, width: usize) -> Option<String> {
        let guard = self.latest.lock().ok()?;
        let frame = guard.as_ref()?;
        if frame.magnitudes.is_empty() || width == 0 {
            return None;
        }

        let bins_per_bar = (frame.magnitudes.len() / width).max(1);
        let mut bars = String::with_capacity(width * 3);
        for col in 0..width {
            let start = col * bins_per_bar;
            if start >= frame.magnitudes.len() {
                bars.push(' ');
                continue;
            }
            let end = (start + bins_per_bar).min(frame.magnitudes.len());
            let avg: f32 =
                frame.magnitudes[start..end].iter().sum::<f32>() / (end - start) as f32;
            let level = (avg.clamp(0.0, 1.0) * (BAR_GLYPHS.len() - 1) as f32).round() as usize;
            bars.push(BAR_GLYPHS[level.min(BAR_GLYPHS.len() - 1)]);
        }
        Some(bars)
    }
}

impl Default for ConsoleVisualizer {
    fn default() -> Self {
        Self::new()
    }
}

impl VisualizationSink for ConsoleVisualizer {
    fn on_spectrum_frame(&self, frame: &SpectrumFrame) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(frame.clone());
        }
    }

    fn on_waveform_preview(&self, points: &[f32]) {
        log::debug!("Waveform preview: {} points", points.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_frame_renders_nothing() {
        let vis = ConsoleVisualizer::new();
        assert!(vis.render_bars(32).is_none());
    }

    #[test]
    fn test_bar_levels() {
        let vis = ConsoleVisualizer::new();
        vis.on_spectrum_frame(&SpectrumFrame {
            magnitudes: vec![0.0, 1.0],
            peaks: vec![0.0, 1.0],
        });
        let bars = vis.render_bars(2).unwrap();
        let chars: Vec<char> = bars.chars().collect();
        assert_eq!(chars.len(), 2);
        assert_eq!(chars[0], ' ');
        assert_eq!(chars[1], '█');
    }
}
