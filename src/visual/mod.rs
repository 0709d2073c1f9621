//! Audio-reactive spectrum visualization.
//!
//! Per frame the renderer pulls one snapshot from its sampler, derives bass
//! energy and intensity, builds a smoothed waveform with mirrored
//! reflections, and paints it onto the surface it owns.

mod blur;
mod host;
mod renderer;
mod scene;
mod signal;
mod surface;
mod visibility;
mod waveform;

pub use host::{
    CancellationToken, FrameHost, FrameId, ListenerId, TickScheduler, Viewport,
    MAX_BACKING_DIMENSION,
};
pub use renderer::{ActiveLoop, FrameOutcome, FrameStats, RendererState, SpectrumRenderer};
pub use scene::{FrameScene, Glow, PassKind, StrokePass, HEAVY_OVERDRAW_THRESHOLD, OVERDRAW_THRESHOLD};
pub use signal::{bass_energy, intensity, StrokeParams};
pub use surface::DrawingSurface;
pub use visibility::{edge_feather, Visibility};
pub use waveform::{CurveSegment, WaveShape, WaveformPath};
