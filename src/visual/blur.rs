//! Separable box blur over a region of an 8-bit alpha plane.
//!
//! Three successive box passes approximate a Gaussian closely enough for a
//! glow, at a cost independent of the radius.

/// Pixel region of a row-major plane
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaneRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl PlaneRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> usize {
        self.x + self.width
    }

    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    /// Smallest rect covering both
    pub fn union(&self, other: PlaneRect) -> PlaneRect {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        PlaneRect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }
}

/// Box widths whose triple convolution approximates a Gaussian of `sigma`
pub fn gaussian_boxes(sigma: f32) -> [usize; 3] {
    const PASSES: f32 = 3.0;
    if sigma.is_nan() || sigma <= 0.0 {
        return [1; 3];
    }
    let ideal = (12.0 * sigma * sigma / PASSES + 1.0).sqrt();
    let mut lower = ideal.floor() as usize;
    if lower % 2 == 0 {
        lower = lower.saturating_sub(1);
    }
    let lower = lower.max(1);
    let upper = lower + 2;

    let l = lower as f32;
    let m_ideal = (12.0 * sigma * sigma - PASSES * l * l - 4.0 * PASSES * l - 3.0 * PASSES)
        / (-4.0 * l - 4.0);
    let m = m_ideal.round().max(0.0) as usize;

    let mut boxes = [upper; 3];
    for (i, b) in boxes.iter_mut().enumerate() {
        if i < m {
            *b = lower;
        }
    }
    boxes
}

/// How far (in pixels) a blur of `sigma` spreads a single lit pixel
pub fn blur_reach(sigma: f32) -> usize {
    gaussian_boxes(sigma).iter().map(|size| size / 2).sum()
}

/// Reusable working memory for region blurs
#[derive(Debug, Default)]
pub struct AlphaBlur {
    scratch: Vec<u8>,
    sums: Vec<u32>,
}

impl AlphaBlur {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blur the `rect` region of `plane` (rows `stride` bytes apart) in place
    ///
    /// Pixels outside `rect` read as zero and are never written, so the rect
    /// must leave room for the spread (see [`blur_reach`]).
    pub fn blur(&mut self, plane: &mut [u8], stride: usize, rect: PlaneRect, sigma: f32) {
        if rect.is_empty() || sigma.is_nan() || sigma <= 0.0 {
            return;
        }
        debug_assert!(rect.right() <= stride);
        debug_assert!(rect.bottom() * stride <= plane.len());

        let (width, height) = (rect.width, rect.height);
        if self.scratch.len() < width * height {
            self.scratch.resize(width * height, 0);
        }
        if self.sums.len() < width {
            self.sums.resize(width, 0);
        }
        let scratch = &mut self.scratch[..width * height];
        let sums = &mut self.sums[..width];

        for size in gaussian_boxes(sigma) {
            let radius = size / 2;
            if radius == 0 {
                continue;
            }
            for row in 0..height {
                let start = (rect.y + row) * stride + rect.x;
                box_row(
                    &plane[start..start + width],
                    &mut scratch[row * width..(row + 1) * width],
                    radius,
                );
            }
            box_columns(scratch, plane, stride, rect, radius, sums);
        }
    }
}

/// Running sum over [x - radius, x + radius], zero outside the row
fn box_row(src: &[u8], dst: &mut [u8], radius: usize) {
    let width = src.len();
    let window = (2 * radius + 1) as u32;
    let mut sum: u32 = src.iter().take(radius).map(|&v| v as u32).sum();
    for x in 0..width {
        if x + radius < width {
            sum += src[x + radius] as u32;
        }
        dst[x] = ((sum + window / 2) / window) as u8;
        if x >= radius {
            sum -= src[x - radius] as u32;
        }
    }
}

/// Vertical pass from the compact `src` back into the plane region
fn box_columns(
    src: &[u8],
    plane: &mut [u8],
    stride: usize,
    rect: PlaneRect,
    radius: usize,
    sums: &mut [u32],
) {
    let (width, height) = (rect.width, rect.height);
    let window = (2 * radius + 1) as u32;
    sums.fill(0);
    for y in 0..radius.min(height) {
        for (sum, &v) in sums.iter_mut().zip(&src[y * width..(y + 1) * width]) {
            *sum += v as u32;
        }
    }
    for y in 0..height {
        if y + radius < height {
            let row = (y + radius) * width;
            for (sum, &v) in sums.iter_mut().zip(&src[row..row + width]) {
                *sum += v as u32;
            }
        }
        let out = (rect.y + y) * stride + rect.x;
        for (dst, &sum) in plane[out..out + width].iter_mut().zip(sums.iter()) {
            *dst = ((sum + window / 2) / window) as u8;
        }
        if y >= radius {
            let row = (y - radius) * width;
            for (sum, &v) in sums.iter_mut().zip(&src[row..row + width]) {
                *sum -= v as u32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(width: usize, height: usize) -> PlaneRect {
        PlaneRect {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    #[test]
    fn test_boxes_grow_with_sigma() {
        assert_eq!(gaussian_boxes(0.0), [1, 1, 1]);
        assert_eq!(gaussian_boxes(f32::NAN), [1, 1, 1]);
        let small = gaussian_boxes(5.0);
        let large = gaussian_boxes(35.0);
        assert!(small.iter().all(|b| b % 2 == 1));
        assert!(large.iter().sum::<usize>() > small.iter().sum::<usize>());
        assert!(blur_reach(35.0) > blur_reach(5.0));
        assert_eq!(blur_reach(0.0), 0);
    }

    #[test]
    fn test_blur_spreads_and_conserves_roughly() {
        let (w, h) = (64, 64);
        let mut alpha = vec![0u8; w * h];
        for y in 28..36 {
            for x in 28..36 {
                alpha[y * w + x] = 255;
            }
        }
        let before: u32 = alpha.iter().map(|&a| a as u32).sum();

        AlphaBlur::new().blur(&mut alpha, w, full(w, h), 3.0);

        let after: u32 = alpha.iter().map(|&a| a as u32).sum();
        // Energy stays within rounding of the original
        assert!((after as f32 - before as f32).abs() / (before as f32) < 0.05);
        // Peak drops and the halo reaches pixels that were empty
        assert!(alpha[32 * w + 32] < 255);
        assert!(alpha[32 * w + 24] > 0);
    }

    #[test]
    fn test_zero_sigma_is_identity() {
        let mut alpha = vec![0, 255, 0, 128];
        AlphaBlur::new().blur(&mut alpha, 2, full(2, 2), 0.0);
        assert_eq!(alpha, vec![0, 255, 0, 128]);
    }

    #[test]
    fn test_blur_stays_inside_rect() {
        let (w, h) = (40, 40);
        let mut alpha = vec![7u8; w * h];
        let rect = PlaneRect {
            x: 10,
            y: 12,
            width: 20,
            height: 16,
        };
        for y in rect.y..rect.bottom() {
            alpha[y * w + rect.x..y * w + rect.right()].fill(0);
        }
        alpha[20 * w + 20] = 255;

        let mut blur = AlphaBlur::new();
        blur.blur(&mut alpha, w, rect, 2.0);

        for y in 0..h {
            for x in 0..w {
                let inside = (rect.x..rect.right()).contains(&x) && (rect.y..rect.bottom()).contains(&y);
                if !inside {
                    assert_eq!(alpha[y * w + x], 7, "touched ({}, {})", x, y);
                }
            }
        }
        assert!(alpha[20 * w + 20] < 255);
        assert!(alpha[20 * w + 22] > 0);

        // Working memory is reused for a smaller region
        blur.blur(&mut alpha, w, PlaneRect { width: 4, height: 4, ..rect }, 1.0);
        assert_eq!(alpha[0], 7);
    }

    #[test]
    fn test_union() {
        let a = PlaneRect {
            x: 2,
            y: 3,
            width: 4,
            height: 5,
        };
        let b = PlaneRect {
            x: 5,
            y: 1,
            width: 10,
            height: 2,
        };
        assert_eq!(
            a.union(b),
            PlaneRect {
                x: 2,
                y: 1,
                width: 13,
                height: 7
            }
        );
        assert_eq!(PlaneRect::default().union(a), a);
        assert!(PlaneRect::default().is_empty());
    }
}
