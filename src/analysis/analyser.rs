//! Real-time frequency analyser modelled on the browser `AnalyserNode`.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::{Arc, Mutex, MutexGuard};

use super::window::blackman_window;
use super::FrequencySampler;
use crate::error::Result;
use crate::params::AnalyserConfig;

/// Shared handle to a frequency analyser
///
/// The audio thread writes time-domain samples; the render loop reads byte
/// spectra. Clones share the same analyser, so one node serves one audio
/// source for its whole lifetime.
#[derive(Clone)]
pub struct AnalyserNode {
    inner: Arc<Mutex<AnalyserState>>,
    bin_count: usize,
}

struct AnalyserState {
    config: AnalyserConfig,
    fft: Arc<dyn Fft<f32>>,
    /// Most recent `fft_size` mono samples, oldest at `write_pos`
    ring: Vec<f32>,
    write_pos: usize,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    /// Smoothed linear magnitudes, one per bin
    smoothed: Vec<f32>,
}

impl AnalyserNode {
    /// Create an analyser with a validated configuration
    pub fn new(config: AnalyserConfig) -> Result<Self> {
        config.validate()?;

        let size = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let window = (0..size).map(|i| blackman_window(i, size)).collect();
        let bin_count = config.frequency_bin_count();

        let state = AnalyserState {
            fft,
            ring: vec![0.0; size],
            write_pos: 0,
            window,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch,
            smoothed: vec![0.0; bin_count],
            config,
        };

        Ok(Self {
            inner: Arc::new(Mutex::new(state)),
            bin_count,
        })
    }

    /// Append mono samples from the audio graph
    pub fn write_samples(&self, samples: &[f32]) {
        let mut state = self.lock();
        let size = state.ring.len();
        // Only the newest `size` samples can survive
        let start = samples.len().saturating_sub(size);
        for &sample in &samples[start..] {
            let pos = state.write_pos;
            state.ring[pos] = sample;
            state.write_pos = (pos + 1) % size;
        }
    }

    fn lock(&self) -> MutexGuard<'_, AnalyserState> {
        // Poisoned only by a panicking audio callback; the buffers stay valid
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl FrequencySampler for AnalyserNode {
    fn frequency_bin_count(&self) -> usize {
        self.bin_count
    }

    fn sample_spectrum(&self, out: &mut [u8]) {
        self.lock().byte_frequency_data(out);
    }
}

impl AnalyserState {
    /// Window, transform, smooth and quantize the current time-domain block
    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        let size = self.ring.len();
        for i in 0..size {
            let sample = self.ring[(self.write_pos + i) % size];
            self.buffer[i] = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let tau = self.config.smoothing_time_constant;
        let scale = 1.0 / size as f32;
        for (bin, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.buffer[bin].norm() * scale;
            let value = tau * *smoothed + (1.0 - tau) * magnitude;
            *smoothed = if value.is_finite() { value } else { 0.0 };
        }

        let min_db = self.config.min_decibels;
        let range_db = self.config.max_decibels - min_db;
        for (byte, &magnitude) in out.iter_mut().zip(&self.smoothed) {
            let db = 20.0 * magnitude.max(f32::MIN_POSITIVE).log10();
            let scaled = (255.0 / range_db) * (db - min_db);
            *byte = scaled.floor().clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn analyser(smoothing: f32) -> AnalyserNode {
        AnalyserNode::new(AnalyserConfig {
            smoothing_time_constant: smoothing,
            ..AnalyserConfig::default()
        })
        .unwrap()
    }

    /// Full-scale sine centred exactly on `bin`
    fn bin_sine(bin: usize, size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| (2.0 * PI * bin as f32 * i as f32 / size as f32).sin())
            .collect()
    }

    #[test]
    fn test_silence_is_all_zero() {
        let node = analyser(0.0);
        let mut out = vec![7u8; node.frequency_bin_count()];
        node.sample_spectrum(&mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let node = analyser(0.0);
        node.write_samples(&bin_sine(10, 2048));

        let mut out = vec![0u8; node.frequency_bin_count()];
        node.sample_spectrum(&mut out);

        assert_eq!(out[10], 255);
        assert!(out[500] < out[10]);
        assert!(out[900] < 64);
    }

    #[test]
    fn test_smoothing_decays_to_zero() {
        let node = analyser(0.5);
        node.write_samples(&bin_sine(4, 2048));
        let mut out = vec![0u8; node.frequency_bin_count()];
        node.sample_spectrum(&mut out);
        assert_eq!(out[4], 255);

        node.write_samples(&vec![0.0; 2048]);
        node.sample_spectrum(&mut out);
        // Smoothing keeps the previous energy alive for a while
        assert!(out[4] > 0);

        for _ in 0..40 {
            node.sample_spectrum(&mut out);
        }
        assert_eq!(out[4], 0);
    }

    #[test]
    fn test_short_output_gets_prefix() {
        let node = analyser(0.0);
        node.write_samples(&bin_sine(2, 2048));
        let mut out = vec![0u8; 8];
        node.sample_spectrum(&mut out);
        assert_eq!(out[2], 255);
    }

    #[test]
    fn test_clones_share_state() {
        let node = analyser(0.0);
        let reader = node.clone();
        node.write_samples(&bin_sine(6, 2048));

        let mut out = vec![0u8; reader.frequency_bin_count()];
        reader.sample_spectrum(&mut out);
        assert_eq!(out[6], 255);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalyserConfig {
            fft_size: 3000,
            ..AnalyserConfig::default()
        };
        assert!(AnalyserNode::new(config).is_err());
    }
}
