//! Frequency analysis configuration and audio constants.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Smallest FFT window the analyser accepts
pub const MIN_FFT_SIZE: usize = 32;

/// Largest FFT window the analyser accepts
pub const MAX_FFT_SIZE: usize = 32768;

/// Analyser configuration (owned by the audio collaborator, never by the renderer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    /// FFT window size in samples (power of 2)
    /// Bin count is half of this; 2048 gives 1024 bins and finer bass resolution
    pub fft_size: usize,

    /// Temporal smoothing between successive snapshots (0 = none, 1 = frozen)
    /// Lower is snappier and noisier
    pub smoothing_time_constant: f32,

    /// Level mapped to byte 0 (dBFS)
    pub min_decibels: f32,

    /// Level mapped to byte 255 (dBFS)
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing_time_constant: 0.5,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserConfig {
    /// Number of frequency bins produced per snapshot
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Width of one bin in Hz at the given sample rate
    pub fn bin_width_hz(&self, sample_rate_hz: u32) -> f32 {
        sample_rate_hz as f32 / self.fft_size as f32
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two()
            || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&self.fft_size)
        {
            return Err(Error::Config(format!(
                "FFT size must be a power of 2 in {}..={}, got {}",
                MIN_FFT_SIZE, MAX_FFT_SIZE, self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(Error::Config(format!(
                "smoothing time constant must be in 0..=1, got {}",
                self.smoothing_time_constant
            )));
        }
        if self.min_decibels.is_nan()
            || self.max_decibels.is_nan()
            || self.min_decibels >= self.max_decibels
        {
            return Err(Error::Config(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }
}

/// Audio constants (compile-time, match Glicol engine setup)
pub mod audio_constants {
    /// Audio block size (samples per buffer)
    /// 128 = 2.9ms @ 44.1kHz
    pub const BLOCK_SIZE: usize = 128;

    /// Sample rate used when no output device dictates one (headless mode)
    pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44100;
}
