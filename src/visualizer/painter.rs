// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Alpha-blended drawing primitives on an RGB buffer.
//!
//! Every shape is first rasterized into a small coverage mask with
//! `imageproc`, then blended into the target so transparency works the same
//! for circles, strokes and polygons.

use ab_glyph::{FontArc, PxScale};
use image::{GrayImage, Luma, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_polygon_mut,
    draw_text_mut, text_size,
};
use imageproc::point::Point;
use imageproc::rect::Rect;

use crate::visualizer::color::Color;

const COVERED: Luma<u8> = Luma([255]);

/// How far outside the image, in pixels, polygon vertices and text anchors may lie.
pub const GUARD_BAND: i32 = 1 << 14;

/// Inclusive pixel box inside the image.
#[derive(Debug, Clone, Copy)]
struct Area {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

impl Area {
    const fn origin(self) -> (i32, i32) {
        (self.x0, self.y0)
    }

    fn mask(self) -> GrayImage {
        new_mask(self.x1 - self.x0 + 1, self.y1 - self.y0 + 1)
    }
}

/// Channel layout of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    /// Red, green, blue.
    Rgb,
    /// Blue, green, red (`OpenCV` frames).
    #[default]
    Bgr,
}

impl ChannelOrder {
    /// Convert an RGB color into this layout.
    #[must_use]
    pub const fn encode(self, color: Color) -> Color {
        match self {
            Self::Rgb => color,
            Self::Bgr => color.swapped(),
        }
    }
}

/// Horizontal text anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    /// Text starts at the anchor.
    Left,
    /// Text is centered on the anchor.
    Center,
}

/// Vertical text anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    /// Text hangs below the anchor.
    Top,
    /// Text sits above the anchor.
    Bottom,
}

/// Drawing context over a mutable image.
pub struct Painter<'a> {
    image: &'a mut RgbImage,
    order: ChannelOrder,
}

impl<'a> Painter<'a> {
    /// Wrap an image whose channels are laid out as `order`.
    pub fn new(image: &'a mut RgbImage, order: ChannelOrder) -> Self {
        Self { image, order }
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Filled circle.
    #[allow(clippy::cast_possible_truncation)]
    pub fn circle(&mut self, center: (f32, f32), radius: f32, color: Color, alpha: f32) {
        let r = radius.round().max(1.0);
        let (cx, cy) = (center.0.round(), center.1.round());
        let Some(area) = self.clip((cx - r, cy - r), (cx + r, cy + r)) else {
            return;
        };
        let mut mask = area.mask();
        let local = ((cx - area.x0 as f32) as i32, (cy - area.y0 as f32) as i32);
        draw_filled_circle_mut(&mut mask, local, r as i32, COVERED);
        self.blend_mask(area.origin(), &mask, color, alpha);
    }

    /// Straight stroke between two points; `width` above one draws a quad.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn line(&mut self, start: (f32, f32), end: (f32, f32), color: Color, width: f32, alpha: f32) {
        let pad = width.ceil().max(1.0) + 1.0;
        let (w, h) = (self.image.width() as f32, self.image.height() as f32);
        let Some((start, end)) = clip_segment(start, end, (-pad, -pad, w - 1.0 + pad, h - 1.0 + pad)) else {
            return;
        };
        let lo = (start.0.min(end.0) - pad, start.1.min(end.1) - pad);
        let hi = (start.0.max(end.0) + pad, start.1.max(end.1) + pad);
        let Some(area) = self.clip(lo, hi) else {
            return;
        };
        let mut mask = area.mask();
        let local = |p: (f32, f32)| (p.0 - area.x0 as f32, p.1 - area.y0 as f32);
        let (a, b) = (local(start), local(end));

        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let length = dx.hypot(dy);
        if width <= 1.0 || length < f32::EPSILON {
            draw_line_segment_mut(&mut mask, a, b, COVERED);
        } else {
            let (nx, ny) = (-dy / length * width / 2.0, dx / length * width / 2.0);
            let quad = [
                (a.0 + nx, a.1 + ny),
                (b.0 + nx, b.1 + ny),
                (b.0 - nx, b.1 - ny),
                (a.0 - nx, a.1 - ny),
            ];
            let points: Vec<(i32, i32)> = quad
                .iter()
                .map(|p| (p.0.round() as i32, p.1.round() as i32))
                .collect();
            fill_polygon(&mut mask, &points);
            draw_line_segment_mut(&mut mask, a, b, COVERED);
        }
        self.blend_mask(area.origin(), &mask, color, alpha);
    }

    /// Filled polygon in image coordinates.
    ///
    /// Outlines reaching further than [`GUARD_BAND`] pixels outside the image
    /// are not drawn.
    #[allow(clippy::cast_precision_loss)]
    pub fn polygon(&mut self, points: &[(i32, i32)], color: Color, alpha: f32) {
        if points.is_empty() || !points.iter().all(|&p| self.in_guard_band(p)) {
            return;
        }
        let lo = points.iter().fold((i32::MAX, i32::MAX), |acc, p| (acc.0.min(p.0), acc.1.min(p.1)));
        let hi = points.iter().fold((i32::MIN, i32::MIN), |acc, p| (acc.0.max(p.0), acc.1.max(p.1)));
        let Some(area) = self.clip((lo.0 as f32, lo.1 as f32), (hi.0 as f32, hi.1 as f32)) else {
            return;
        };
        let mut mask = area.mask();
        let local: Vec<(i32, i32)> = points.iter().map(|p| (p.0 - area.x0, p.1 - area.y0)).collect();
        fill_polygon(&mut mask, &local);
        self.blend_mask(area.origin(), &mask, color, alpha);
    }

    /// Hollow rectangle from corner `(x1, y1)` to `(x2, y2)` with `thickness` inset strokes.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap, clippy::cast_precision_loss)]
    pub fn rect(&mut self, top_left: (i32, i32), bottom_right: (i32, i32), color: Color, thickness: i32, alpha: f32) {
        let thickness = thickness.max(1);
        // corners pulled in to just outside the image keep every visible stroke in place
        let (w, h) = (self.image.width() as i32, self.image.height() as i32);
        let clamp_x = |x: i32| x.clamp(-thickness - 1, w.saturating_add(thickness));
        let clamp_y = |y: i32| y.clamp(-thickness - 1, h.saturating_add(thickness));
        let (x1, x2) = (clamp_x(top_left.0.min(bottom_right.0)), clamp_x(top_left.0.max(bottom_right.0)));
        let (y1, y2) = (clamp_y(top_left.1.min(bottom_right.1)), clamp_y(top_left.1.max(bottom_right.1)));
        let Some(area) = self.clip((x1 as f32, y1 as f32), (x2 as f32, y2 as f32)) else {
            return;
        };
        let (rw, rh) = (x2 - x1 + 1, y2 - y1 + 1);
        let mut mask = area.mask();
        for t in 0..thickness {
            let (tw, th) = (rw - 2 * t, rh - 2 * t);
            if tw <= 0 || th <= 0 {
                break;
            }
            let rect = Rect::at(x1 + t - area.x0, y1 + t - area.y0).of_size(tw as u32, th as u32);
            draw_hollow_rect_mut(&mut mask, rect, COVERED);
        }
        self.blend_mask(area.origin(), &mask, color, alpha);
    }

    /// Opaque text anchored at `anchor`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn text(
        &mut self,
        text: &str,
        anchor: (f32, f32),
        font: &FontArc,
        size: f32,
        color: Color,
        align: (HAlign, VAlign),
    ) {
        if !anchor.0.is_finite() || !anchor.1.is_finite() {
            return;
        }
        if !self.in_guard_band((anchor.0 as i32, anchor.1 as i32)) {
            return;
        }
        let scale = PxScale::from(size);
        let (w, h) = text_size(scale, font, text);
        let x = match align.0 {
            HAlign::Left => anchor.0,
            HAlign::Center => anchor.0 - w as f32 / 2.0,
        };
        let y = match align.1 {
            VAlign::Top => anchor.1,
            VAlign::Bottom => anchor.1 - h as f32,
        };
        let pixel = self.order.encode(color).to_rgb();
        draw_text_mut(&mut *self.image, pixel, x.round() as i32, y.round() as i32, scale, font, text);
    }

    /// Pixel size of `text` rendered at `size`.
    #[must_use]
    pub fn measure(text: &str, font: &FontArc, size: f32) -> (u32, u32) {
        text_size(PxScale::from(size), font, text)
    }

    /// Intersect the box spanned by `lo` and `hi` with the image.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn clip(&self, lo: (f32, f32), hi: (f32, f32)) -> Option<Area> {
        if ![lo.0, lo.1, hi.0, hi.1].iter().all(|v| v.is_finite()) {
            return None;
        }
        let (w, h) = (self.image.width() as f32, self.image.height() as f32);
        let x0 = lo.0.floor().max(0.0);
        let y0 = lo.1.floor().max(0.0);
        let x1 = hi.0.ceil().min(w - 1.0);
        let y1 = hi.1.ceil().min(h - 1.0);
        if x0 > x1 || y0 > y1 {
            return None;
        }
        Some(Area {
            x0: x0 as i32,
            y0: y0 as i32,
            x1: x1 as i32,
            y1: y1 as i32,
        })
    }

    #[allow(clippy::cast_possible_wrap)]
    fn in_guard_band(&self, p: (i32, i32)) -> bool {
        let (w, h) = (self.image.width() as i32, self.image.height() as i32);
        (-GUARD_BAND..=w.saturating_add(GUARD_BAND)).contains(&p.0)
            && (-GUARD_BAND..=h.saturating_add(GUARD_BAND)).contains(&p.1)
    }

    /// Blend `color` through `mask` into the image at `origin`.
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn blend_mask(&mut self, origin: (i32, i32), mask: &GrayImage, color: Color, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let color = self.order.encode(color);
        let src = [f32::from(color.0), f32::from(color.1), f32::from(color.2)];
        let (width, height) = (self.image.width() as i32, self.image.height() as i32);
        for (mx, my, coverage) in mask.enumerate_pixels() {
            if coverage[0] == 0 {
                continue;
            }
            let x = origin.0 + mx as i32;
            let y = origin.1 + my as i32;
            if x < 0 || y < 0 || x >= width || y >= height {
                continue;
            }
            let pixel = self.image.get_pixel_mut(x as u32, y as u32);
            for (dst, s) in pixel.0.iter_mut().zip(src) {
                *dst = blend(*dst, s, alpha);
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend(dst: u8, src: f32, alpha: f32) -> u8 {
    (f32::from(dst) * (1.0 - alpha) + src * alpha).round().clamp(0.0, 255.0) as u8
}

#[allow(clippy::cast_sign_loss)]
fn new_mask(width: i32, height: i32) -> GrayImage {
    GrayImage::new(width.max(1) as u32, height.max(1) as u32)
}

/// Cut the segment `a`-`b` to the box `(xmin, ymin, xmax, ymax)` (Liang-Barsky).
///
/// `None` when the segment misses the box or has a non-finite end.
#[allow(clippy::cast_possible_truncation)]
fn clip_segment(a: (f32, f32), b: (f32, f32), bounds: (f32, f32, f32, f32)) -> Option<((f32, f32), (f32, f32))> {
    if ![a.0, a.1, b.0, b.1].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (ax, ay) = (f64::from(a.0), f64::from(a.1));
    let (dx, dy) = (f64::from(b.0) - ax, f64::from(b.1) - ay);
    let (xmin, ymin, xmax, ymax) = (
        f64::from(bounds.0),
        f64::from(bounds.1),
        f64::from(bounds.2),
        f64::from(bounds.3),
    );
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [(-dx, ax - xmin), (dx, xmax - ax), (-dy, ay - ymin), (dy, ymax - ay)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    let at = |t: f64| ((ax + t * dx) as f32, (ay + t * dy) as f32);
    Some((at(t0), at(t1)))
}

/// Fill a polygon into a mask, tolerating degenerate outlines.
fn fill_polygon(mask: &mut GrayImage, points: &[(i32, i32)]) {
    let mut poly: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for &(x, y) in points {
        let p = Point::new(x, y);
        if poly.last() != Some(&p) {
            poly.push(p);
        }
    }
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    match poly.len() {
        0 => {}
        #[allow(clippy::cast_precision_loss)]
        1 | 2 => {
            let a = poly[0];
            let b = poly[poly.len() - 1];
            draw_line_segment_mut(mask, (a.x as f32, a.y as f32), (b.x as f32, b.y as f32), COVERED);
        }
        _ => draw_polygon_mut(mask, &poly, COVERED),
    }
}

/// Outline of a rotated ellipse, sampled every `delta` degrees.
///
/// Consecutive duplicate points are dropped, matching the polygon a
/// rasterizer expects for a closed outline.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn ellipse_polygon(center: (i32, i32), axes: (i32, i32), angle_deg: i32, delta: usize) -> Vec<(i32, i32)> {
    let angle = f64::from(angle_deg).to_radians();
    let (alpha, beta) = (angle.cos(), angle.sin());
    let mut points: Vec<(i32, i32)> = Vec::with_capacity(360 / delta.max(1) + 1);
    for step in (0..=360).step_by(delta.max(1)) {
        let t = f64::from(step).to_radians();
        let x = f64::from(axes.0) * t.cos();
        let y = f64::from(axes.1) * t.sin();
        let p = (
            (f64::from(center.0) + x * alpha - y * beta).round() as i32,
            (f64::from(center.1) + x * beta + y * alpha).round() as i32,
        );
        if points.last() != Some(&p) {
            points.push(p);
        }
    }
    points
}
