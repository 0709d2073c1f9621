//! Owned, resizable pixel surface the spectrum renderer paints onto.

use tiny_skia::{
    Color, FillRule, LineCap, LineJoin, Mask, Paint, Path, PathBuilder, Pixmap,
    PremultipliedColorU8, Stroke, Transform,
};
use tracing::{debug, warn};

use super::blur::{blur_reach, AlphaBlur, PlaneRect};
use super::host::Viewport;
use super::scene::{FrameScene, StrokePass};
use super::visibility::edge_feather;
use super::waveform::CurveSegment;
use crate::params::{Rgb, Rgba};

/// Largest factor glow coverage is shrunk by before blurring
const MAX_GLOW_DOWNSCALE: usize = 8;

/// Resizable RGBA surface kept in sync with its displayed size and pixel density
///
/// Drawing happens in logical (device-independent) pixels; the backing
/// store holds `logical x device_pixel_ratio` physical pixels.
pub struct DrawingSurface {
    pixmap: Pixmap,
    /// Glow coverage at reduced resolution, rows one backing width apart
    coverage: Mask,
    /// Halo alpha accumulated for one batch, same layout as `coverage`.
    /// All zero between batches.
    halo: Vec<u8>,
    blur: AlphaBlur,
    /// Requested backing size; the pixmap is never smaller than 1x1
    backing: (u32, u32),
    logical: (f32, f32),
    device_pixel_ratio: f32,
    transform: Transform,
}

impl DrawingSurface {
    /// Create a surface sized for `viewport`
    pub fn new(viewport: Viewport) -> Self {
        // Pixmap::new and Mask::new only refuse zero or overflowing sizes
        let (pixmap, coverage) = allocate(1, 1).expect("1x1 surface buffers");
        let mut surface = Self {
            pixmap,
            coverage,
            halo: vec![0; 1],
            blur: AlphaBlur::new(),
            backing: (1, 1),
            logical: (0.0, 0.0),
            device_pixel_ratio: 1.0,
            transform: Transform::identity(),
        };
        surface.sync_size(viewport);
        surface
    }

    /// Match the backing store to the displayed size
    ///
    /// Returns true if the backing store was reallocated. An unchanged size
    /// keeps the current buffer and transform, and so does a size that
    /// cannot be allocated.
    pub fn sync_size(&mut self, viewport: Viewport) -> bool {
        let dpr = viewport.effective_pixel_ratio();
        let logical = (viewport.width.max(0.0), viewport.height.max(0.0));
        let target = viewport.backing_size();

        if target == self.backing && dpr == self.device_pixel_ratio {
            self.logical = logical;
            return false;
        }
        if !self.reallocate(target, dpr) {
            return false;
        }
        self.logical = logical;
        true
    }

    fn reallocate(&mut self, target: (u32, u32), dpr: f32) -> bool {
        let Some((pixmap, coverage)) = allocate(target.0, target.1) else {
            warn!(
                "Cannot allocate a {}x{} surface, keeping {}x{}",
                target.0, target.1, self.backing.0, self.backing.1
            );
            return false;
        };

        debug!(
            "Surface resize: {}x{} -> {}x{} (dpr {})",
            self.backing.0, self.backing.1, target.0, target.1, dpr
        );
        self.halo = vec![0; coverage.data().len()];
        self.pixmap = pixmap;
        self.coverage = coverage;
        self.backing = target;
        self.device_pixel_ratio = dpr;
        self.transform = Transform::from_scale(dpr, dpr);
        true
    }

    /// Backing width (physical pixels)
    pub fn width(&self) -> u32 {
        self.backing.0
    }

    /// Backing height (physical pixels)
    pub fn height(&self) -> u32 {
        self.backing.1
    }

    /// Displayed size (logical pixels)
    pub fn logical_size(&self) -> (f32, f32) {
        self.logical
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    /// Premultiplied RGBA pixels, row-major
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Straight-alpha RGBA of one backing pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let color = self.pixmap.pixel(x, y)?.demultiply();
        Some([color.red(), color.green(), color.blue(), color.alpha()])
    }

    /// Straight-alpha RGBA buffer with opacity and horizontal edge feathering
    /// applied, as the surface appears once composited
    pub fn export_rgba(&self, opacity: f32, feather: f32) -> Vec<u8> {
        let width = self.pixmap.width();
        let mut out = Vec::with_capacity(self.pixmap.data().len());
        for (i, pixel) in self.pixmap.pixels().iter().enumerate() {
            let x = (i as u32 % width) as f32 + 0.5;
            let fade = opacity * edge_feather(x / width as f32, feather);
            let color = pixel.demultiply();
            out.extend_from_slice(&[
                color.red(),
                color.green(),
                color.blue(),
                (color.alpha() as f32 * fade).round() as u8,
            ]);
        }
        out
    }

    pub(crate) fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    /// Paint a scene's passes in order, every stroke over its own glow
    ///
    /// Consecutive passes whose strokes and glows share one colour form a
    /// batch: their halos stack into one plane that is laid down before the
    /// batch's strokes.
    pub(crate) fn paint(&mut self, scene: &FrameScene) {
        let passes = &scene.passes;
        let mut start = 0;
        while start < passes.len() {
            let tint = passes[start].glow.color.rgb;
            let end = if passes[start].color.rgb == tint {
                passes[start..]
                    .iter()
                    .position(|p| p.color.rgb != tint || p.glow.color.rgb != tint)
                    .map_or(passes.len(), |offset| start + offset)
            } else {
                start + 1
            };
            let batch = &passes[start..end];

            if let Some(scale) = glow_downscale(batch) {
                let mut region = PlaneRect::default();
                for pass in batch.iter().filter(|p| p.glow.is_visible()) {
                    if let Some(rect) = self.accumulate_halo(pass, scale) {
                        region = region.union(rect);
                    }
                }
                if !region.is_empty() {
                    self.composite_halo(region, scale, tint);
                }
            }
            for pass in batch {
                self.stroke(pass);
            }
            start = end;
        }
    }

    fn stroke(&mut self, pass: &StrokePass) {
        let Some(path) = build_path(&pass.path.curve()) else {
            return;
        };
        let paint = solid_paint(pass.color, pass.alpha);
        self.pixmap
            .stroke_path(&path, &paint, &line_stroke(pass.line_width), self.transform, None);
    }

    /// Rasterize one pass's outline at `1/scale` resolution, blur it over
    /// its bounding region only, and stack it onto the halo plane
    ///
    /// Returns the touched region in reduced-resolution pixels.
    fn accumulate_halo(&mut self, pass: &StrokePass, scale: usize) -> Option<PlaneRect> {
        let outline = build_path(&pass.path.curve())?
            .transform(self.transform)?
            .stroke(&line_stroke(pass.line_width * self.device_pixel_ratio), 1.0)?;

        let stride = self.coverage.width() as usize;
        let rows = self.coverage.height() as usize;
        let limits = (stride.div_ceil(scale), rows.div_ceil(scale));
        // Shadow blur radius maps to a Gaussian of half that deviation
        let sigma = pass.glow.blur / 2.0 / scale as f32;
        let margin = (blur_reach(sigma) + 1) as f32;

        let inv = 1.0 / scale as f32;
        let bounds = outline.bounds();
        let span = |lo: f32, hi: f32, limit: usize| {
            let start = ((lo * inv).floor() - margin).clamp(0.0, limit as f32) as usize;
            let end = ((hi * inv).ceil() + margin).clamp(0.0, limit as f32) as usize;
            (start, end.max(start))
        };
        let (left, right) = span(bounds.left(), bounds.right(), limits.0);
        let (top, bottom) = span(bounds.top(), bounds.bottom(), limits.1);
        let rect = PlaneRect {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        };
        if rect.is_empty() {
            return None;
        }

        let coverage = self.coverage.data_mut();
        for y in rect.y..rect.bottom() {
            coverage[y * stride + rect.x..y * stride + rect.right()].fill(0);
        }
        self.coverage
            .fill_path(&outline, FillRule::Winding, true, Transform::from_scale(inv, inv));
        self.blur.blur(self.coverage.data_mut(), stride, rect, sigma);

        let strength = (pass.glow.color.alpha * pass.color.alpha * pass.alpha).clamp(0.0, 1.0);
        let coverage = self.coverage.data();
        for y in rect.y..rect.bottom() {
            let row = y * stride + rect.x..y * stride + rect.right();
            for (halo, &lit) in self.halo[row.clone()].iter_mut().zip(&coverage[row]) {
                let add = (lit as f32 * strength).round() as u32;
                let below = *halo as u32;
                *halo = (below + (add * (255 - below) + 127) / 255) as u8;
            }
        }
        Some(rect)
    }

    /// Upsample the halo plane over `region`, lay it down tinted, and
    /// reset that part of the plane
    fn composite_halo(&mut self, region: PlaneRect, scale: usize, tint: Rgb) {
        let stride = self.coverage.width() as usize;
        let width = self.pixmap.width() as usize;
        let height = self.pixmap.height() as usize;
        let inv = 1.0 / scale as f32;

        let halo = &self.halo;
        let pixels = self.pixmap.pixels_mut();
        for py in region.y * scale..(region.bottom() * scale).min(height) {
            let (y0, y1, ty) = sample_axis(py, inv, region.y, region.bottom());
            for px in region.x * scale..(region.right() * scale).min(width) {
                let (x0, x1, tx) = sample_axis(px, inv, region.x, region.right());
                let top = lerp(halo[y0 * stride + x0], halo[y0 * stride + x1], tx);
                let bottom = lerp(halo[y1 * stride + x0], halo[y1 * stride + x1], tx);
                let alpha = (top + (bottom - top) * ty).round() as u8;
                if alpha > 0 {
                    let dst = &mut pixels[py * width + px];
                    *dst = blend_over(*dst, tint, alpha);
                }
            }
        }

        for y in region.y..region.bottom() {
            self.halo[y * stride + region.x..y * stride + region.right()].fill(0);
        }
    }
}

fn allocate(width: u32, height: u32) -> Option<(Pixmap, Mask)> {
    let (width, height) = (width.max(1), height.max(1));
    let pixmap = Pixmap::new(width, height)?;
    let coverage = Mask::new(width, height)?;
    Some((pixmap, coverage))
}

/// Reduced resolution for a batch's glows: coarser for wider blurs, sized
/// by the narrowest visible one
fn glow_downscale(batch: &[StrokePass]) -> Option<usize> {
    let sigma = batch
        .iter()
        .filter(|p| p.glow.is_visible())
        .map(|p| p.glow.blur / 2.0)
        .reduce(f32::min)?;
    Some(((sigma / 3.0).floor() as usize).clamp(1, MAX_GLOW_DOWNSCALE))
}

/// Neighbouring reduced-resolution samples for backing pixel `p`
fn sample_axis(p: usize, inv: f32, lo: usize, hi: usize) -> (usize, usize, f32) {
    let pos = ((p as f32 + 0.5) * inv - 0.5).clamp(lo as f32, (hi - 1) as f32);
    let i = pos.floor() as usize;
    (i, (i + 1).min(hi - 1), pos - i as f32)
}

fn lerp(a: u8, b: u8, t: f32) -> f32 {
    a as f32 + (b as f32 - a as f32) * t
}

/// Source-over of `tint` at `alpha` onto a premultiplied pixel
fn blend_over(dst: PremultipliedColorU8, tint: Rgb, alpha: u8) -> PremultipliedColorU8 {
    let a = alpha as u32;
    let mix = |src: u8, below: u8| ((src as u32 * a + below as u32 * (255 - a) + 127) / 255) as u8;
    PremultipliedColorU8::from_rgba(
        mix(tint.r, dst.red()),
        mix(tint.g, dst.green()),
        mix(tint.b, dst.blue()),
        mix(255, dst.alpha()),
    )
    .unwrap_or(dst)
}

fn build_path(segments: &[CurveSegment]) -> Option<Path> {
    let mut builder = PathBuilder::new();
    for segment in segments {
        match *segment {
            CurveSegment::MoveTo(p) => builder.move_to(p.x, p.y),
            CurveSegment::QuadTo { control, end } => {
                builder.quad_to(control.x, control.y, end.x, end.y)
            }
            CurveSegment::LineTo(p) => builder.line_to(p.x, p.y),
        }
    }
    builder.finish()
}

fn solid_paint(color: Rgba, global_alpha: f32) -> Paint<'static> {
    let mut paint = Paint::default();
    let alpha = (color.alpha * global_alpha).clamp(0.0, 1.0);
    paint.set_color_rgba8(
        color.rgb.r,
        color.rgb.g,
        color.rgb.b,
        (alpha * 255.0).round() as u8,
    );
    paint.anti_alias = true;
    paint
}

fn line_stroke(width: f32) -> Stroke {
    Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    }
}
