//! Waveform path construction and smooth-curve interpolation.

use glam::Vec2;

use crate::params::EqualizerStyle;

/// Shaping constants for turning bin energy into vertical offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveShape {
    /// Fraction of the snapshot (lowest bins) turned into points
    pub fraction: f32,
    pub exponent: f32,
    pub gain: f32,
    /// Offset cap as a fraction of surface height
    pub max_offset_fraction: f32,
}

impl From<&EqualizerStyle> for WaveShape {
    fn from(style: &EqualizerStyle) -> Self {
        Self {
            fraction: style.waveform_fraction,
            exponent: style.boost_exponent,
            gain: style.boost_gain,
            max_offset_fraction: style.max_offset_fraction,
        }
    }
}

impl Default for WaveShape {
    fn default() -> Self {
        Self::from(&EqualizerStyle::default())
    }
}

impl WaveShape {
    /// Number of points built from a snapshot of `bin_count` bins
    pub fn point_count(&self, bin_count: usize) -> usize {
        (bin_count as f32 * self.fraction).floor() as usize
    }

    /// Vertical offset above center for one bin
    pub fn offset(&self, bin: u8, height: f32) -> f32 {
        let v = bin as f32 / 255.0;
        let boosted = v.powf(self.exponent) * self.gain;
        let cap = height * self.max_offset_fraction;
        (boosted * cap).min(cap)
    }
}

/// One drawing command of a smoothed curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveSegment {
    MoveTo(Vec2),
    QuadTo { control: Vec2, end: Vec2 },
    LineTo(Vec2),
}

/// Ordered points of one frame's waveform (logical pixels, y grows downwards)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformPath {
    points: Vec<Vec2>,
}

impl WaveformPath {
    /// Build the path from the lowest bins of a snapshot
    pub fn build(snapshot: &[u8], width: f32, height: f32, shape: &WaveShape) -> Self {
        let count = shape.point_count(snapshot.len());
        let spacing = if count > 1 {
            width / (count - 1) as f32
        } else {
            0.0
        };
        let center = height / 2.0;

        let points = snapshot
            .iter()
            .take(count)
            .enumerate()
            .map(|(i, &bin)| Vec2::new(i as f32 * spacing, center - shape.offset(bin, height)))
            .collect();

        Self { points }
    }

    pub fn from_points(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Mirror every point around `center`, scaling its distance by `scale`
    pub fn mirrored(&self, center: f32, scale: f32) -> Self {
        let points = self
            .points
            .iter()
            .map(|p| Vec2::new(p.x, center + (center - p.y) * scale))
            .collect();
        Self { points }
    }

    /// Quadratic curve through successive midpoints, ending on the last point
    pub fn curve(&self) -> Vec<CurveSegment> {
        let (Some(&first), Some(&last)) = (self.points.first(), self.points.last()) else {
            return Vec::new();
        };

        let mut segments = Vec::with_capacity(self.points.len() + 1);
        segments.push(CurveSegment::MoveTo(first));
        for pair in self.points.windows(2) {
            segments.push(CurveSegment::QuadTo {
                control: pair[0],
                end: (pair[0] + pair[1]) * 0.5,
            });
        }
        segments.push(CurveSegment::LineTo(last));
        segments
    }
}
