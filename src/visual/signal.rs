//! Bass detection and the intensity curve that drives every visual parameter.

use crate::params::EqualizerStyle;

/// Normalized mean energy of the lowest `bass_bins` bins, in [0, 1]
///
/// Bins missing from a short snapshot count as silence.
pub fn bass_energy(snapshot: &[u8], bass_bins: usize) -> f32 {
    if bass_bins == 0 {
        return 0.0;
    }
    let sum: u32 = snapshot.iter().take(bass_bins).map(|&b| b as u32).sum();
    sum as f32 / bass_bins as f32 / 255.0
}

/// Amplification factor: zero up to `threshold`, then a linear ramp reaching
/// 1.0 at full bass energy
pub fn intensity(bass_energy: f32, threshold: f32) -> f32 {
    if bass_energy <= threshold {
        return 0.0;
    }
    ((bass_energy - threshold) / (1.0 - threshold)).clamp(0.0, 1.0)
}

/// Stroke and glow parameters for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeParams {
    /// Main line width (logical pixels)
    pub line_width: f32,

    /// Glow blur radius of the main line (pixels)
    pub glow_blur: f32,

    /// Glow colour alpha
    pub glow_alpha: f32,

    /// Stroke colour alpha
    pub stroke_alpha: f32,

    /// Glow blur radius of the reflections (pixels)
    pub reflection_blur: f32,
}

impl StrokeParams {
    /// Derive visual parameters from intensity
    pub fn derive(intensity: f32, style: &EqualizerStyle) -> Self {
        Self {
            line_width: style.line_width() + 1.0 + intensity * 6.0,
            glow_blur: style.base_glow_blur + intensity * 60.0,
            glow_alpha: 0.6 + intensity * 0.4,
            stroke_alpha: 0.9 + intensity * 0.1,
            reflection_blur: intensity * style.reflection_glow_blur,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bass_energy_extremes() {
        assert_eq!(bass_energy(&[0; 1024], 10), 0.0);
        assert_eq!(bass_energy(&[255; 1024], 10), 1.0);
    }

    #[test]
    fn test_bass_energy_ignores_upper_bins() {
        let mut snapshot = [0u8; 64];
        snapshot[10..].fill(255);
        assert_eq!(bass_energy(&snapshot, 10), 0.0);
    }

    #[test]
    fn test_bass_energy_short_snapshot() {
        // Five bins at max out of ten expected: half energy
        assert!((bass_energy(&[255; 5], 10) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_intensity_threshold() {
        assert_eq!(intensity(0.55, 0.55), 0.0);
        assert_eq!(intensity(0.3, 0.55), 0.0);
        assert!((intensity(0.775, 0.55) - 0.5).abs() < 1e-5);
        assert_eq!(intensity(1.0, 0.55), 1.0);
    }

    #[test]
    fn test_full_intensity_params() {
        let style = EqualizerStyle::default();
        let params = StrokeParams::derive(1.0, &style);
        // base (3) + 1 + 6
        assert_eq!(params.line_width, 10.0);
        assert_eq!(params.glow_blur, 70.0);
        assert_eq!(params.glow_alpha, 1.0);
        assert_eq!(params.stroke_alpha, 1.0);
        assert_eq!(params.reflection_blur, 15.0);
    }

    #[test]
    fn test_idle_params_with_multiplier() {
        let style = EqualizerStyle {
            stroke_width_multiplier: 2.0,
            ..EqualizerStyle::default()
        };
        let params = StrokeParams::derive(0.0, &style);
        assert_eq!(params.line_width, 7.0);
        assert_eq!(params.glow_blur, 10.0);
        assert!((params.glow_alpha - 0.6).abs() < 1e-6);
        assert!((params.stroke_alpha - 0.9).abs() < 1e-6);
        assert_eq!(params.reflection_blur, 0.0);
    }

    proptest! {
        #[test]
        fn prop_intensity_in_unit_range(bins in proptest::collection::vec(any::<u8>(), 0..64)) {
            let energy = bass_energy(&bins, 10);
            prop_assert!((0.0..=1.0).contains(&energy));
            let i = intensity(energy, 0.55);
            prop_assert!((0.0..=1.0).contains(&i));
        }

        #[test]
        fn prop_quiet_bass_means_zero_intensity(bins in proptest::collection::vec(0u8..=140, 10)) {
            // Every bin at or below 0.55 * 255 keeps the mean at or below the threshold
            prop_assert_eq!(intensity(bass_energy(&bins, 10), 0.55), 0.0);
        }
    }
}
