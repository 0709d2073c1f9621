//! Parameter definitions with units and documented semantics.
//!
//! All tuning constants live here with:
//! - Units (pixels, seconds, dBFS, etc.)
//! - Documented ranges and meanings
//! - Defaults matching the reference look of the equalizer

mod audio;
mod equalizer;
mod render;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

// Re-export all types
pub use audio::{audio_constants, AnalyserConfig, MAX_FFT_SIZE, MIN_FFT_SIZE};
pub use equalizer::{EqualizerStyle, ReflectionLayer, Rgb, Rgba, REFLECTION_LAYERS};
pub use render::{RecordingConfig, RenderConfig};

/// Complete configuration, loadable from a TOML file
///
/// ```toml
/// [analyser]
/// fft_size = 4096
///
/// [equalizer]
/// color = "255,64,64"
/// stroke_width_multiplier = 1.5
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analyser: AnalyserConfig,
    pub equalizer: EqualizerStyle,
    pub render: RenderConfig,
}

impl Config {
    /// Parse configuration from TOML text (missing keys keep their defaults)
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.analyser.validate()?;
        self.equalizer.validate()?;
        Ok(())
    }
}
