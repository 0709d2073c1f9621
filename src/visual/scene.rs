//! Per-frame display list: every stroke the surface paints, in order.

use crate::params::{EqualizerStyle, Rgba};

use super::signal::{bass_energy, intensity, StrokeParams};
use super::waveform::{WaveShape, WaveformPath};

/// Intensity above which the main line is stroked a second time
pub const OVERDRAW_THRESHOLD: f32 = 0.5;

/// Intensity above which a third, half-transparent stroke is stacked
pub const HEAVY_OVERDRAW_THRESHOLD: f32 = 0.8;

/// What a stroke pass represents
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PassKind {
    Main,
    Overdraw,
    Reflection { scale: f32 },
}

/// Shadow-style glow applied beneath a stroke
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glow {
    /// Blur radius (backing pixels)
    pub blur: f32,
    pub color: Rgba,
}

impl Glow {
    pub fn is_visible(&self) -> bool {
        self.blur > 0.0 && self.color.alpha > 0.0
    }
}

/// One stroke of a smoothed waveform curve
#[derive(Debug, Clone, PartialEq)]
pub struct StrokePass {
    pub kind: PassKind,
    pub path: WaveformPath,
    pub line_width: f32,
    pub color: Rgba,
    /// Global alpha multiplied into both stroke and glow
    pub alpha: f32,
    pub glow: Glow,
}

/// Everything derived from one spectrum snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct FrameScene {
    pub bass_energy: f32,
    pub intensity: f32,
    pub params: StrokeParams,
    pub waveform: WaveformPath,
    pub passes: Vec<StrokePass>,
}

impl FrameScene {
    /// Build the scene for a snapshot on a surface of `width` x `height`
    /// logical pixels
    pub fn build(snapshot: &[u8], width: f32, height: f32, style: &EqualizerStyle) -> Self {
        let bass_energy = bass_energy(snapshot, style.bass_bins);
        let intensity = intensity(bass_energy, style.bass_threshold);
        let params = StrokeParams::derive(intensity, style);
        let waveform = WaveformPath::build(snapshot, width, height, &WaveShape::from(style));

        let stroke_color = style.color.with_alpha(params.stroke_alpha);
        let glow = Glow {
            blur: params.glow_blur,
            color: style.color.with_alpha(params.glow_alpha),
        };

        let mut passes = vec![StrokePass {
            kind: PassKind::Main,
            path: waveform.clone(),
            line_width: params.line_width,
            color: stroke_color,
            alpha: 1.0,
            glow,
        }];

        // Heavy hits: restroke the main line, thinner each time
        if intensity > OVERDRAW_THRESHOLD {
            passes.push(StrokePass {
                kind: PassKind::Overdraw,
                path: waveform.clone(),
                line_width: params.line_width * 0.8,
                color: stroke_color,
                alpha: 1.0,
                glow,
            });
            if intensity > HEAVY_OVERDRAW_THRESHOLD {
                passes.push(StrokePass {
                    kind: PassKind::Overdraw,
                    path: waveform.clone(),
                    line_width: params.line_width * 0.6,
                    color: stroke_color,
                    alpha: 0.5,
                    glow,
                });
            }
        }

        // Reflections keep whatever width the last main-line pass used
        let reflection_width = passes
            .last()
            .map_or(params.line_width, |pass| pass.line_width);
        let reflection_glow = Glow {
            blur: params.reflection_blur,
            ..glow
        };
        let center = height / 2.0;

        passes.extend(style.reflection_layers.iter().map(|layer| StrokePass {
            kind: PassKind::Reflection { scale: layer.scale },
            path: waveform.mirrored(center, layer.scale),
            line_width: reflection_width,
            color: stroke_color,
            alpha: layer.alpha(intensity),
            glow: reflection_glow,
        }));

        Self {
            bass_energy,
            intensity,
            params,
            waveform,
            passes,
        }
    }

    /// Number of extra main-line strokes stacked for emphasis
    pub fn overdraw_count(&self) -> usize {
        self.passes
            .iter()
            .filter(|p| p.kind == PassKind::Overdraw)
            .count()
    }

    pub fn reflections(&self) -> impl Iterator<Item = &StrokePass> {
        self.passes
            .iter()
            .filter(|p| matches!(p.kind, PassKind::Reflection { .. }))
    }
}
