//! Externally driven surface opacity and edge feathering.
//!
//! Visibility belongs to the compositor, not the render loop: frames keep
//! being produced while the surface is transparent, so resuming playback
//! fades in an already-live waveform.

use std::time::Duration;

use crate::params::RenderConfig;

/// Opacity transition driven by the "is playing" flag
#[derive(Debug, Clone)]
pub struct Visibility {
    fade: Duration,
    playing_opacity: f32,
    playing: bool,
    from: f32,
    to: f32,
    started: Duration,
}

impl Visibility {
    /// Start hidden (nothing is playing yet)
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            fade: Duration::from_secs_f32(config.fade_duration_s.max(0.0)),
            playing_opacity: config.playing_opacity.clamp(0.0, 1.0),
            playing: false,
            from: 0.0,
            to: 0.0,
            started: Duration::ZERO,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Retarget the transition at time `now`; no-op if the flag is unchanged
    pub fn set_playing(&mut self, playing: bool, now: Duration) {
        if playing == self.playing {
            return;
        }
        self.from = self.opacity(now);
        self.to = if playing { self.playing_opacity } else { 0.0 };
        self.started = now;
        self.playing = playing;
    }

    /// Opacity at time `now` (linear ramp over the fade duration)
    pub fn opacity(&self, now: Duration) -> f32 {
        if self.fade.is_zero() {
            return self.to;
        }
        let elapsed = now.saturating_sub(self.started).as_secs_f32();
        let t = (elapsed / self.fade.as_secs_f32()).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }

    /// True while the opacity is still moving
    pub fn is_animating(&self, now: Duration) -> bool {
        now.saturating_sub(self.started) < self.fade && self.from != self.to
    }
}

/// Horizontal mask: transparent at both edges, opaque between `feather`
/// and `1 - feather` of the width
pub fn edge_feather(x: f32, feather: f32) -> f32 {
    if feather <= 0.0 {
        return 1.0;
    }
    (x.min(1.0 - x) / feather).clamp(0.0, 1.0)
}
