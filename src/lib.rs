//! Spectroglow library - audio-reactive glowing waveform equalizer

pub mod analysis;
pub mod audio;
pub mod cli;
pub mod error;
pub mod headless;
pub mod params;
pub mod rendering;
pub mod visual;

pub use error::{Error, Result};
