//! Audio playback: sources, the output stream, and the analyser tap.

mod source;
mod synthesis;
mod system;

pub use source::{AudioSource, SourceSpec, WavTrack};
pub use synthesis::{DemoSynth, DEMO_COMPOSITION};
pub use system::AudioSystem;
