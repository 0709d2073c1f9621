//! Equalizer visual style: colour, stroke widths, thresholds and reflection layers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Stroke colour, written as "R,G,B" in config files and on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    /// Colour with an alpha channel in [0, 1]
    pub fn with_alpha(self, alpha: f32) -> Rgba {
        Rgba {
            rgb: self,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}

impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(Error::Config(format!(
                "colour must be \"R,G,B\", got {:?}",
                s
            )));
        }
        let channel = |part: &str| {
            part.parse::<u8>()
                .map_err(|e| Error::Config(format!("bad colour channel {:?}: {}", part, e)))
        };
        Ok(Self {
            r: channel(parts[0])?,
            g: channel(parts[1])?,
            b: channel(parts[2])?,
        })
    }
}

impl TryFrom<String> for Rgb {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

/// Colour plus straight (non-premultiplied) alpha
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub rgb: Rgb,
    pub alpha: f32,
}

/// One mirrored copy of the waveform drawn beneath the main line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReflectionLayer {
    /// Mirror distance relative to the main line's distance from center
    pub scale: f32,

    /// Alpha at zero intensity
    pub base_alpha: f32,

    /// Extra alpha at full intensity
    pub bonus_alpha: f32,
}

impl ReflectionLayer {
    pub const fn new(scale: f32, base_alpha: f32, bonus_alpha: f32) -> Self {
        Self {
            scale,
            base_alpha,
            bonus_alpha,
        }
    }

    /// Layer alpha for the given intensity
    pub fn alpha(&self, intensity: f32) -> f32 {
        self.base_alpha + intensity * self.bonus_alpha
    }
}

/// Fixed reflection stack, nearest (full-scale) layer first
pub const REFLECTION_LAYERS: [ReflectionLayer; 4] = [
    ReflectionLayer::new(1.0, 0.2, 0.2),
    ReflectionLayer::new(0.9, 0.1, 0.1),
    ReflectionLayer::new(0.7, 0.05, 0.1),
    ReflectionLayer::new(0.5, 0.15, 0.1),
];

/// Visual style of the equalizer
///
/// Only `color` and `stroke_width_multiplier` are meant to vary between
/// hosts; the rest are the engine's tuning constants, exposed so a config
/// file can adjust them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqualizerStyle {
    /// Stroke and glow colour
    pub color: Rgb,

    /// Multiplier applied to the base line width
    pub stroke_width_multiplier: f32,

    /// Base line width before the multiplier (logical pixels)
    pub base_line_width: f32,

    /// Glow blur radius at zero intensity (pixels)
    pub base_glow_blur: f32,

    /// Number of lowest bins averaged for bass energy
    pub bass_bins: usize,

    /// Bass energy above which intensity starts ramping
    pub bass_threshold: f32,

    /// Fraction of the spectrum (lowest bins) used for the waveform
    pub waveform_fraction: f32,

    /// Power-curve exponent applied to normalized bin energy
    pub boost_exponent: f32,

    /// Gain applied after the power curve
    pub boost_gain: f32,

    /// Maximum vertical offset as a fraction of surface height
    pub max_offset_fraction: f32,

    /// Maximum reflection glow blur at full intensity (pixels)
    pub reflection_glow_blur: f32,

    /// Mirrored copies beneath the main line
    pub reflection_layers: Vec<ReflectionLayer>,
}

impl Default for EqualizerStyle {
    fn default() -> Self {
        Self {
            color: Rgb::WHITE,
            stroke_width_multiplier: 1.0,
            base_line_width: 3.0,
            base_glow_blur: 10.0,
            bass_bins: 10,
            bass_threshold: 0.55,
            waveform_fraction: 0.2,
            boost_exponent: 1.5,
            boost_gain: 1.5,
            max_offset_fraction: 0.25,
            reflection_glow_blur: 15.0,
            reflection_layers: REFLECTION_LAYERS.to_vec(),
        }
    }
}

impl EqualizerStyle {
    /// Line width before intensity modulation
    pub fn line_width(&self) -> f32 {
        self.base_line_width * self.stroke_width_multiplier
    }

    /// Validate tuning constants
    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..1.0).contains(&self.bass_threshold) {
            return Err(Error::Config(format!(
                "bass threshold must be in 0..1, got {}",
                self.bass_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.waveform_fraction) {
            return Err(Error::Config(format!(
                "waveform fraction must be in 0..=1, got {}",
                self.waveform_fraction
            )));
        }
        if !(self.stroke_width_multiplier.is_finite() && self.stroke_width_multiplier > 0.0) {
            return Err(Error::Config(format!(
                "stroke width multiplier must be positive, got {}",
                self.stroke_width_multiplier
            )));
        }
        if self.bass_bins == 0 {
            return Err(Error::Config("bass bin count must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        let c: Rgb = "255, 0,128".parse().unwrap();
        assert_eq!(c, Rgb { r: 255, g: 0, b: 128 });
        assert_eq!(c.to_string(), "255,0,128");

        assert!("255,0".parse::<Rgb>().is_err());
        assert!("256,0,0".parse::<Rgb>().is_err());
        assert!("a,b,c".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_default_style() {
        let style = EqualizerStyle::default();
        assert_eq!(style.color, Rgb::WHITE);
        assert_eq!(style.line_width(), 3.0);
        assert_eq!(style.reflection_layers.len(), 4);
        assert!(style.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_finite_width() {
        for multiplier in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let style = EqualizerStyle {
                stroke_width_multiplier: multiplier,
                ..EqualizerStyle::default()
            };
            assert!(style.validate().is_err(), "accepted {}", multiplier);
        }
    }

    #[test]
    fn test_reflection_alpha() {
        let layer = REFLECTION_LAYERS[0];
        assert!((layer.alpha(0.0) - 0.2).abs() < 1e-6);
        assert!((layer.alpha(1.0) - 0.4).abs() < 1e-6);

        let deepest = REFLECTION_LAYERS[3];
        assert!((deepest.alpha(0.5) - 0.2).abs() < 1e-6);
    }
}
