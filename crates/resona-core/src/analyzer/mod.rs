//! Spectrum analysis pipeline
//!
//! The audio callback publishes each emitted block into a single-slot
//! [`BlockMailbox`]; a dedicated analyzer thread wakes every 30ms, adopts the
//! newest block (or re-analyzes the previous one if playback has not produced
//! a new one), and runs a Hann-windowed real FFT. Magnitudes are normalized
//! against the frame maximum, exponentially smoothed, and paired with a
//! decaying peak-hold sequence before being pushed to the
//! [`VisualizationSink`] boundary.
//!
//! The mailbox is latest-wins: only the newest block matters visually, so the
//! writer drops a block rather than ever blocking the audio thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

/// Samples per analysis window
pub const ANALYSIS_WINDOW: usize = 1024;

/// Bins in the one-sided spectrum (window/2 + 1)
pub const SPECTRUM_BINS: usize = ANALYSIS_WINDOW / 2 + 1;

/// Analyzer tick period, decoupled from the audio callback period
pub const ANALYSIS_INTERVAL: Duration = Duration::from_millis(30);

/// Exponential smoothing factor: spectrum = SMOOTHING*new + (1-SMOOTHING)*old
const SMOOTHING: f32 = 0.5;

/// Per-tick peak-hold decay
const PEAK_DECAY: f32 = 0.96;

/// Floor added to the frame maximum so silent input divides cleanly to zero
const NORM_EPSILON: f32 = 1e-6;

/// One fixed-size block of samples handed from the audio callback to the
/// analyzer. Shorter source blocks are zero-padded; longer ones truncated.
#[derive(Clone, Copy)]
pub struct AnalysisBlock {
    samples: [f32; ANALYSIS_WINDOW],
}

impl AnalysisBlock {
    pub fn silence() -> Self {
        Self {
            samples: [0.0; ANALYSIS_WINDOW],
        }
    }

    /// Overwrite from a slice, truncating or zero-padding to the window size
    pub fn fill_from(&mut self, data: &[f32]) {
        let n = data.len().min(ANALYSIS_WINDOW);
        self.samples[..n].copy_from_slice(&data[..n]);
        self.samples[n..].fill(0.0);
    }

    pub fn samples(&self) -> &[f32; ANALYSIS_WINDOW] {
        &self.samples
    }
}

impl Default for AnalysisBlock {
    fn default() -> Self {
        Self::silence()
    }
}

/// Single-slot latest-wins handoff from the audio callback to the analyzer.
///
/// `publish` never blocks: it takes the slot with `try_lock` and drops the
/// block on contention. The freshness flag lets the reader distinguish a new
/// block from one it has already consumed.
pub struct BlockMailbox {
    slot: Mutex<AnalysisBlock>,
    fresh: AtomicBool,
}

impl BlockMailbox {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(AnalysisBlock::silence()),
            fresh: AtomicBool::new(false),
        }
    }

    /// Called from the audio callback. Wait-free: drops the block if the
    /// reader currently holds the slot.
    pub fn publish(&self, data: &[f32]) {
        if let Ok(mut slot) = self.slot.try_lock() {
            slot.fill_from(data);
            drop(slot);
            self.fresh.store(true, Ordering::Release);
        }
    }

    /// Copy out the newest block if one arrived since the last take
    pub fn take(&self, out: &mut AnalysisBlock) -> bool {
        if !self.fresh.swap(false, Ordering::Acquire) {
            return false;
        }
        match self.slot.lock() {
            Ok(slot) => {
                *out = *slot;
                true
            }
            Err(_) => false,
        }
    }
}

impl Default for BlockMailbox {
    fn default() -> Self {
        Self::new()
    }
}

/// One analyzed frame: normalized magnitudes plus the peak-hold sequence,
/// both [`SPECTRUM_BINS`] long and non-negative
#[derive(Debug, Clone)]
pub struct SpectrumFrame {
    pub magnitudes: Vec<f32>,
    pub peaks: Vec<f32>,
}

/// Boundary between the analysis pipeline and whatever renders it.
///
/// Implementations must tolerate being called from the analyzer thread.
/// There is no backpressure: frames may be overwritten before display.
pub trait VisualizationSink: Send + Sync {
    /// Pushed at analyzer cadence (~30ms)
    fn on_spectrum_frame(&self, frame: &SpectrumFrame);

    /// Pushed once per track change with a normalized, downsampled overview
    /// of the whole track
    fn on_waveform_preview(&self, _points: &[f32]) {}
}

/// Hann-windowed FFT analyzer with smoothing and peak-hold state.
///
/// All FFT buffers are allocated once and reused across ticks.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    frame_buf: Vec<f32>,
    spectrum_buf: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
    smoothed: Vec<f32>,
    peaks: Vec<f32>,
    block: AnalysisBlock,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        Self::with_window(ANALYSIS_WINDOW)
    }

    /// Analyzer with a custom window size, at most [`ANALYSIS_WINDOW`]
    /// samples (the mailbox block is the upper bound)
    pub fn with_window(len: usize) -> Self {
        let len = len.clamp(2, ANALYSIS_WINDOW);
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(len);

        // Pre-compute Hann window
        let window: Vec<f32> = (0..len)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / len as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect();

        let frame_buf = vec![0.0f32; len];
        let spectrum_buf = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();
        let bins = spectrum_buf.len();

        Self {
            fft,
            window,
            frame_buf,
            spectrum_buf,
            scratch,
            magnitudes: vec![0.0; bins],
            smoothed: vec![0.0; bins],
            peaks: vec![0.0; bins],
            block: AnalysisBlock::silence(),
        }
    }

    /// Switch to a different window size. The FFT plan and buffers are
    /// rebuilt immediately; smoothing and peak state carry the old bin count
    /// until the next frame, where the length mismatch resets them to zero.
    pub fn set_window(&mut self, len: usize) {
        let len = len.clamp(2, ANALYSIS_WINDOW);
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(len);

        self.window = (0..len)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / len as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect();
        self.frame_buf = vec![0.0f32; len];
        self.spectrum_buf = fft.make_output_vec();
        self.scratch = fft.make_scratch_vec();
        self.magnitudes = vec![0.0; self.spectrum_buf.len()];
        self.fft = fft;
    }

    /// One analyzer step: adopt the newest block if one arrived, otherwise
    /// re-analyze the previous one, then produce the next frame.
    pub fn tick(&mut self, mailbox: &BlockMailbox) -> SpectrumFrame {
        mailbox.take(&mut self.block);
        self.analyze()
    }

    /// Analyze the current block and update smoothing/peak state
    fn analyze(&mut self) -> SpectrumFrame {
        let samples = self.block.samples();
        for i in 0..self.window.len() {
            self.frame_buf[i] = samples[i] * self.window[i];
        }

        if let Err(e) =
            self.fft
                .process_with_scratch(&mut self.frame_buf, &mut self.spectrum_buf, &mut self.scratch)
        {
            // Buffer lengths are fixed at construction, this cannot happen in
            // practice; keep the last frame rather than poisoning state.
            log::error!("FFT failed: {:?}", e);
            return self.frame();
        }

        let mut max = 0.0f32;
        for (mag, c) in self.magnitudes.iter_mut().zip(self.spectrum_buf.iter()) {
            *mag = c.norm();
            if *mag > max {
                max = *mag;
            }
        }

        // Normalize against the frame maximum; silence stays all-zero
        let scale = 1.0 / (max + NORM_EPSILON);
        for mag in self.magnitudes.iter_mut() {
            *mag *= scale;
        }

        self.accumulate();
        self.frame()
    }

    /// Fold freshly normalized magnitudes into the smoothing and peak state.
    /// A bin-count mismatch resets both sequences instead of interpolating.
    fn accumulate(&mut self) {
        if self.smoothed.len() != self.magnitudes.len() {
            self.smoothed = vec![0.0; self.magnitudes.len()];
            self.peaks = vec![0.0; self.magnitudes.len()];
        }
        for i in 0..self.magnitudes.len() {
            self.smoothed[i] = SMOOTHING * self.magnitudes[i] + (1.0 - SMOOTHING) * self.smoothed[i];
            self.peaks[i] = (self.peaks[i] * PEAK_DECAY).max(self.smoothed[i]);
        }
    }

    fn frame(&self) -> SpectrumFrame {
        SpectrumFrame {
            magnitudes: self.smoothed.clone(),
            peaks: self.peaks.clone(),
        }
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to the running analyzer thread; `stop` (or drop) joins it
pub struct AnalyzerHandle {
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl AnalyzerHandle {
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                log::error!("Analyzer thread panicked");
            }
        }
    }
}

impl Drop for AnalyzerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the analyzer thread: every 30ms, analyze the newest block from
/// `mailbox` and push the resulting frame to `sink`.
pub fn spawn(mailbox: Arc<BlockMailbox>, sink: Arc<dyn VisualizationSink>) -> AnalyzerHandle {
    let shutdown = Arc::new(AtomicBool::new(false));
    let thread_shutdown = Arc::clone(&shutdown);

    let join = thread::Builder::new()
        .name("resona-analyzer".to_string())
        .spawn(move || {
            let mut analyzer = SpectrumAnalyzer::new();
            while !thread_shutdown.load(Ordering::Acquire) {
                let frame = analyzer.tick(&mailbox);
                sink.on_spectrum_frame(&frame);
                thread::sleep(ANALYSIS_INTERVAL);
            }
        })
        .expect("failed to spawn analyzer thread");

    AnalyzerHandle {
        shutdown,
        join: Some(join),
    }
}

/// Build a waveform overview for the whole track: first channel only,
/// normalized to [-1, 1], downsampled to at most `points` values.
pub fn waveform_preview(samples: &[f32], channels: u16, points: usize) -> Vec<f32> {
    if samples.is_empty() || channels == 0 || points == 0 {
        return Vec::new();
    }

    let stride = channels as usize;
    let mono: Vec<f32> = samples.iter().step_by(stride).copied().collect();

    let max = mono.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    let scale = if max > 0.0 { 1.0 / max } else { 1.0 };

    if mono.len() <= points {
        return mono.iter().map(|s| s * scale).collect();
    }

    let step = mono.len() / points;
    (0..points).map(|i| mono[i * step] * scale).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_yields_zero_spectrum() {
        let mut analyzer = SpectrumAnalyzer::new();
        let mailbox = BlockMailbox::new();
        mailbox.publish(&[0.0; ANALYSIS_WINDOW]);
        let frame = analyzer.tick(&mailbox);
        assert_eq!(frame.magnitudes.len(), SPECTRUM_BINS);
        assert!(frame.magnitudes.iter().all(|m| *m == 0.0));
        assert!(frame.magnitudes.iter().all(|m| m.is_finite()));
        assert!(frame.peaks.iter().all(|p| *p == 0.0));
    }

    #[test]
    fn test_sine_concentrates_at_its_bin() {
        let mut analyzer = SpectrumAnalyzer::new();
        let mailbox = BlockMailbox::new();

        let bin = 64usize;
        let samples: Vec<f32> = (0..ANALYSIS_WINDOW)
            .map(|i| {
                (2.0 * std::f32::consts::PI * bin as f32 * i as f32 / ANALYSIS_WINDOW as f32).sin()
            })
            .collect();
        mailbox.publish(&samples);

        let frame = analyzer.tick(&mailbox);
        let argmax = frame
            .magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        // Hann leakage spreads energy to the neighbors but not further
        assert!((bin - 1..=bin + 1).contains(&argmax));
        // First frame: smoothing halves the normalized maximum
        assert!((frame.magnitudes[argmax] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_peaks_decay_toward_spectrum() {
        let mut analyzer = SpectrumAnalyzer::new();
        let mailbox = BlockMailbox::new();

        let samples: Vec<f32> = (0..ANALYSIS_WINDOW)
            .map(|i| (2.0 * std::f32::consts::PI * 32.0 * i as f32 / ANALYSIS_WINDOW as f32).sin())
            .collect();
        mailbox.publish(&samples);
        let loud = analyzer.tick(&mailbox);
        let bin = 32usize;
        let held = loud.peaks[bin];
        assert!(held > 0.0);

        // Silence follows: the peak decays by 0.96 per tick, the smoothed
        // magnitude halves per tick, so after one tick peak > magnitude
        mailbox.publish(&[0.0; ANALYSIS_WINDOW]);
        let quiet = analyzer.tick(&mailbox);
        assert!(quiet.peaks[bin] < held);
        assert!(quiet.peaks[bin] > quiet.magnitudes[bin]);
    }

    #[test]
    fn test_mailbox_latest_wins() {
        let mailbox = BlockMailbox::new();
        mailbox.publish(&[0.25; 16]);
        mailbox.publish(&[0.75; 16]);

        let mut block = AnalysisBlock::silence();
        assert!(mailbox.take(&mut block));
        assert_eq!(block.samples()[0], 0.75);
        // Consumed: nothing new until the next publish
        assert!(!mailbox.take(&mut block));
    }

    #[test]
    fn test_block_pads_and_truncates() {
        let mut block = AnalysisBlock::silence();
        block.fill_from(&[1.0; 8]);
        assert_eq!(block.samples()[7], 1.0);
        assert_eq!(block.samples()[8], 0.0);

        block.fill_from(&vec![2.0; ANALYSIS_WINDOW + 100]);
        assert!(block.samples().iter().all(|s| *s == 2.0));
    }

    #[test]
    fn test_window_change_resets_smoothing_and_peaks() {
        let mut analyzer = SpectrumAnalyzer::new();
        let mailbox = BlockMailbox::new();

        let samples: Vec<f32> = (0..ANALYSIS_WINDOW)
            .map(|i| (2.0 * std::f32::consts::PI * 32.0 * i as f32 / ANALYSIS_WINDOW as f32).sin())
            .collect();
        mailbox.publish(&samples);
        let before = analyzer.tick(&mailbox);
        assert_eq!(before.magnitudes.len(), SPECTRUM_BINS);
        assert!(before.peaks.iter().any(|p| *p > 0.0));

        // Shrinking the window changes the bin count: the mismatch must
        // discard the held state instead of interpolating, so the first
        // frame after the switch has no peak history
        analyzer.set_window(512);
        mailbox.publish(&samples);
        let after = analyzer.tick(&mailbox);
        assert_eq!(after.magnitudes.len(), 512 / 2 + 1);
        assert_eq!(after.peaks.len(), after.magnitudes.len());
        for (peak, mag) in after.peaks.iter().zip(after.magnitudes.iter()) {
            assert_eq!(peak, mag);
        }
    }

    #[test]
    fn test_analyzer_reuses_last_block_when_mailbox_empty() {
        let mut analyzer = SpectrumAnalyzer::new();
        let mailbox = BlockMailbox::new();

        let samples: Vec<f32> = (0..ANALYSIS_WINDOW)
            .map(|i| (2.0 * std::f32::consts::PI * 10.0 * i as f32 / ANALYSIS_WINDOW as f32).sin())
            .collect();
        mailbox.publish(&samples);
        analyzer.tick(&mailbox);

        // No new publish: the previous block is re-analyzed, smoothing
        // converges upward toward the normalized magnitude
        let second = analyzer.tick(&mailbox);
        assert!(second.magnitudes[10] > 0.5);
    }

    #[test]
    fn test_waveform_preview_point_count_and_range() {
        let samples: Vec<f32> = (0..10_000).map(|i| ((i % 100) as f32 - 50.0) / 10.0).collect();
        let preview = waveform_preview(&samples, 2, 512);
        assert_eq!(preview.len(), 512);
        assert!(preview.iter().all(|p| p.abs() <= 1.0));
    }

    #[test]
    fn test_waveform_preview_short_input() {
        let preview = waveform_preview(&[0.5, -0.5, 0.25, -0.25], 2, 512);
        // Channel 0 only, normalized by its own maximum
        assert_eq!(preview, vec![1.0, 0.5]);
    }

    #[test]
    fn test_waveform_preview_empty() {
        assert!(waveform_preview(&[], 2, 512).is_empty());
        assert!(waveform_preview(&[0.1], 0, 512).is_empty());
    }

    #[test]
    fn test_analyzer_thread_lifecycle() {
        struct CountingSink(std::sync::atomic::AtomicUsize);
        impl VisualizationSink for CountingSink {
            fn on_spectrum_frame(&self, frame: &SpectrumFrame) {
                assert_eq!(frame.magnitudes.len(), SPECTRUM_BINS);
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let mailbox = Arc::new(BlockMailbox::new());
        let sink = Arc::new(CountingSink(std::sync::atomic::AtomicUsize::new(0)));
        let mut handle = spawn(Arc::clone(&mailbox), sink.clone());
        std::thread::sleep(Duration::from_millis(100));
        handle.stop();
        assert!(sink.0.load(Ordering::Relaxed) >= 1);
    }
}
