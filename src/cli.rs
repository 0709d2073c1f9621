//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::audio::SourceSpec;
use crate::error::{Error, Result};
use crate::headless::OfflineOptions;
use crate::params::{Config, RecordingConfig, Rgb};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "spectroglow")]
#[command(about = "Audio-reactive glowing waveform equalizer", long_about = None)]
pub struct Args {
    /// WAV file to play
    #[arg(value_name = "AUDIO")]
    pub audio: Option<PathBuf>,

    /// Play the built-in procedural track instead of a file
    #[arg(long, conflicts_with = "audio")]
    pub demo: bool,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Stroke colour as R,G,B
    #[arg(long, value_name = "R,G,B")]
    pub color: Option<Rgb>,

    /// Stroke width multiplier
    #[arg(long, value_name = "X")]
    pub stroke_width: Option<f32>,

    /// Analyser FFT size (power of two)
    #[arg(long, value_name = "N")]
    pub fft_size: Option<usize>,

    /// Analyser smoothing time constant (0..1)
    #[arg(long, value_name = "T")]
    pub smoothing: Option<f32>,

    /// Window width (logical pixels)
    #[arg(long, value_name = "W")]
    pub width: Option<u32>,

    /// Window height (logical pixels)
    #[arg(long, value_name = "H")]
    pub height: Option<u32>,

    /// Record frames and audio while playing (duration in seconds)
    #[arg(long, value_name = "SECONDS", conflicts_with = "headless")]
    pub record: Option<f32>,

    /// Render the audio file offline to a PNG sequence, without a window
    #[arg(long, value_name = "OUT_DIR", requires = "audio")]
    pub headless: Option<PathBuf>,

    /// Frame rate for headless rendering and recording
    #[arg(long, value_name = "N", default_value = "60")]
    pub fps: u32,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Load the config file (if any) and apply command-line overrides
    pub fn build_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Config: {}", path.display());
                Config::load(path)?
            }
            None => Config::default(),
        };

        if let Some(color) = self.color {
            config.equalizer.color = color;
        }
        if let Some(multiplier) = self.stroke_width {
            config.equalizer.stroke_width_multiplier = multiplier;
        }
        if let Some(fft_size) = self.fft_size {
            config.analyser.fft_size = fft_size;
        }
        if let Some(smoothing) = self.smoothing {
            config.analyser.smoothing_time_constant = smoothing;
        }
        if let Some(width) = self.width {
            config.render.window_width = width;
        }
        if let Some(height) = self.height {
            config.render.window_height = height;
        }

        config.validate()?;
        Ok(config)
    }

    /// What to play: the given file, or the demo track
    pub fn source_spec(&self) -> SourceSpec {
        match &self.audio {
            Some(path) => SourceSpec::Wav(path.clone()),
            None => {
                if !self.demo {
                    warn!("No audio file given, playing the demo track");
                }
                SourceSpec::Demo
            }
        }
    }

    /// Create recording configuration if recording mode is enabled
    pub fn recording_config(&self) -> Result<Option<RecordingConfig>> {
        let Some(duration) = self.record else {
            return Ok(None);
        };
        if duration <= 0.0 {
            return Err(Error::Config(format!(
                "record duration must be positive, got {}",
                duration
            )));
        }

        let mut config = RecordingConfig::new(duration);
        config.fps = self.fps;

        // Create output directories
        std::fs::create_dir_all(config.frames_dir())?;
        Ok(Some(config))
    }

    /// Offline render settings, if headless mode was requested
    pub fn offline_options(&self, config: &Config) -> Option<(PathBuf, PathBuf, OfflineOptions)> {
        let out_dir = self.headless.clone()?;
        let audio = self.audio.clone()?;
        let options = OfflineOptions {
            config: config.clone(),
            fps: self.fps,
            ..OfflineOptions::default()
        };
        Some((audio, out_dir, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("spectroglow").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.source_spec(), SourceSpec::Demo);
        assert_eq!(args.build_config().unwrap(), Config::default());
        assert!(args.recording_config().unwrap().is_none());
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "track.wav",
            "--color",
            "255,0,64",
            "--stroke-width",
            "2",
            "--fft-size",
            "4096",
            "--width",
            "800",
        ]);
        let config = args.build_config().unwrap();

        assert_eq!(args.source_spec(), SourceSpec::Wav(PathBuf::from("track.wav")));
        assert_eq!(config.equalizer.color, Rgb { r: 255, g: 0, b: 64 });
        assert_eq!(config.equalizer.line_width(), 6.0);
        assert_eq!(config.analyser.fft_size, 4096);
        assert_eq!(config.render.window_width, 800);
        assert_eq!(config.render.window_height, 720);
    }

    #[test]
    fn test_invalid_override_rejected() {
        assert!(parse(&["--fft-size", "1000"]).build_config().is_err());
        assert!(Args::try_parse_from(["spectroglow", "--color", "red"]).is_err());
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glow.toml");
        std::fs::write(&path, "[equalizer]\ncolor = \"10,20,30\"\nstroke_width_multiplier = 3.0\n")
            .unwrap();

        let args = parse(&["--config", path.to_str().unwrap(), "--stroke-width", "0.5"]);
        let config = args.build_config().unwrap();
        assert_eq!(config.equalizer.color, Rgb { r: 10, g: 20, b: 30 });
        assert_eq!(config.equalizer.stroke_width_multiplier, 0.5);
    }

    #[test]
    fn test_headless_requires_audio() {
        assert!(Args::try_parse_from(["spectroglow", "--headless", "out"]).is_err());

        let args = parse(&["song.wav", "--headless", "out", "--fps", "24"]);
        let (audio, out_dir, options) = args.offline_options(&Config::default()).unwrap();
        assert_eq!(audio, PathBuf::from("song.wav"));
        assert_eq!(out_dir, PathBuf::from("out"));
        assert_eq!(options.fps, 24);
    }

    #[test]
    fn test_demo_conflicts_with_file() {
        assert!(Args::try_parse_from(["spectroglow", "a.wav", "--demo"]).is_err());
    }
}
