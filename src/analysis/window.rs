//! FFT window function.

use std::f32::consts::PI;

/// Blackman window (alpha = 0.16), the window used by browser analysers
pub fn blackman_window(index: usize, size: usize) -> f32 {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    let phase = 2.0 * PI * index as f32 / size as f32;
    a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blackman_window() {
        let size = 2048;

        // Blackman is ~0 at the start and exactly 1 at the center
        assert!(blackman_window(0, size).abs() < 1e-6);
        assert!((blackman_window(size / 2, size) - 1.0).abs() < 1e-6);
        // Symmetric around the center
        let a = blackman_window(100, size);
        let b = blackman_window(size - 100, size);
        assert!((a - b).abs() < 1e-5);
    }
}
