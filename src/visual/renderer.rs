//! The spectrum renderer: owns the drawing surface and the frame loop.

use tracing::{debug, info};

use super::host::{CancellationToken, FrameHost, FrameId, ListenerId, Viewport};
use super::scene::FrameScene;
use super::surface::DrawingSurface;
use crate::analysis::FrequencySampler;
use crate::params::EqualizerStyle;

/// Loop state: idle until a sampler is attached
pub enum RendererState<S> {
    Idle,
    Active(ActiveLoop<S>),
}

/// Everything that lives only while a sampler is attached
pub struct ActiveLoop<S> {
    sampler: S,
    /// Reused every frame; sized once from the sampler's bin count
    snapshot: Vec<u8>,
    pending: Option<FrameId>,
    resize_listener: ListenerId,
    token: CancellationToken,
}

/// Result of delivering one frame callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// A frame was painted and the next one requested
    Drawn(FrameStats),

    /// No sampler attached: nothing drawn, nothing rescheduled
    Idle,

    /// The callback was cancelled or superseded; ignored
    Stale,
}

/// Summary of one painted frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub bass_energy: f32,
    pub intensity: f32,
    pub line_width: f32,
    pub glow_blur: f32,
    pub overdraw_passes: usize,
    pub points: usize,
    /// Backing store was reallocated before this frame
    pub resized: bool,
}

/// Audio-reactive waveform renderer
///
/// Holds exclusive write access to its [`DrawingSurface`]; callers only get
/// a shared reference. Playback state is never touched.
pub struct SpectrumRenderer<S> {
    style: EqualizerStyle,
    surface: DrawingSurface,
    state: RendererState<S>,
    last_scene: Option<FrameScene>,
    frames_drawn: u64,
}

impl<S: FrequencySampler> SpectrumRenderer<S> {
    pub fn new(style: EqualizerStyle, viewport: Viewport) -> Self {
        Self {
            style,
            surface: DrawingSurface::new(viewport),
            state: RendererState::Idle,
            last_scene: None,
            frames_drawn: 0,
        }
    }

    /// Start the frame loop against `sampler`
    ///
    /// Replaces any sampler already attached.
    pub fn attach<H: FrameHost + ?Sized>(&mut self, sampler: S, host: &mut H) {
        if self.is_active() {
            self.detach(host);
        }

        let bins = sampler.frequency_bin_count();
        let resize_listener = host.add_resize_listener();
        self.surface.sync_size(host.viewport());
        let pending = Some(host.request_frame());

        info!(
            "Spectrum renderer attached: {} bins, surface {}x{}",
            bins,
            self.surface.width(),
            self.surface.height()
        );

        self.state = RendererState::Active(ActiveLoop {
            sampler,
            snapshot: vec![0; bins],
            pending,
            resize_listener,
            token: CancellationToken::new(),
        });
    }

    /// Stop the loop: cancel the pending frame and drop the resize listener
    ///
    /// Returns the detached sampler, if there was one.
    pub fn detach<H: FrameHost + ?Sized>(&mut self, host: &mut H) -> Option<S> {
        let RendererState::Active(active) = std::mem::replace(&mut self.state, RendererState::Idle)
        else {
            return None;
        };

        active.token.cancel();
        if let Some(id) = active.pending {
            host.cancel_frame(id);
        }
        host.remove_resize_listener(active.resize_listener);
        self.last_scene = None;

        info!("Spectrum renderer detached after {} frames", self.frames_drawn);
        Some(active.sampler)
    }

    /// Frame callback: sample, derive, paint, and request the next frame
    pub fn on_frame<H: FrameHost + ?Sized>(&mut self, id: FrameId, host: &mut H) -> FrameOutcome {
        let RendererState::Active(active) = &mut self.state else {
            return FrameOutcome::Idle;
        };
        if active.token.is_cancelled() || active.pending != Some(id) {
            debug!("Ignoring stale frame {:?}", id);
            return FrameOutcome::Stale;
        }
        active.pending = None;

        // Cheap enough to check every frame; catches changes no event reported
        let resized = self.surface.sync_size(host.viewport());

        active.sampler.sample_spectrum(&mut active.snapshot);
        self.surface.clear();

        let (width, height) = self.surface.logical_size();
        let scene = FrameScene::build(&active.snapshot, width, height, &self.style);
        self.surface.paint(&scene);

        let stats = FrameStats {
            bass_energy: scene.bass_energy,
            intensity: scene.intensity,
            line_width: scene.params.line_width,
            glow_blur: scene.params.glow_blur,
            overdraw_passes: scene.overdraw_count(),
            points: scene.waveform.len(),
            resized,
        };
        self.last_scene = Some(scene);
        self.frames_drawn += 1;

        active.pending = Some(host.request_frame());
        FrameOutcome::Drawn(stats)
    }

    /// Resize-listener callback
    pub fn on_resize<H: FrameHost + ?Sized>(&mut self, host: &mut H) -> bool {
        if !self.is_active() {
            return false;
        }
        self.surface.sync_size(host.viewport())
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, RendererState::Active(_))
    }

    /// Frame request currently outstanding, if any
    pub fn pending_frame(&self) -> Option<FrameId> {
        match &self.state {
            RendererState::Active(active) => active.pending,
            RendererState::Idle => None,
        }
    }

    /// Token of the running loop, for hosts that queue callbacks elsewhere
    pub fn cancellation_token(&self) -> Option<CancellationToken> {
        match &self.state {
            RendererState::Active(active) => Some(active.token.clone()),
            RendererState::Idle => None,
        }
    }

    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }

    pub fn style(&self) -> &EqualizerStyle {
        &self.style
    }

    /// Scene painted by the most recent frame
    pub fn last_scene(&self) -> Option<&FrameScene> {
        self.last_scene.as_ref()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }
}
