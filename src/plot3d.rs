// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 3D plotting surfaces.
//!
//! [`PlotSurface3d`] is the small axes API the pose plotter draws through.
//! [`RasterAxes3d`] implements it by projecting into an `RgbImage` with a
//! perspective camera orbiting the axes box.

use ab_glyph::FontArc;
use image::{Rgb, RgbImage};
use nalgebra::{Isometry3, Perspective3, Point3, Vector3};

use crate::visualizer::color::Color;
use crate::visualizer::painter::{ChannelOrder, HAlign, Painter, VAlign};

/// Title font size in pixels.
pub const TITLE_FONT_SIZE: f32 = 20.0;
/// Keypoint label font size in pixels.
pub const LABEL_FONT_SIZE: f32 = 14.0;
/// Default marker radius in pixels.
pub const MARKER_RADIUS: f32 = 3.0;
/// Default stroke width in pixels.
pub const LINE_WIDTH: f32 = 2.0;

const BOX_COLOR: Color = Color(170, 170, 170);
const TICK_COUNT: usize = 5;
const TITLE_PADDING: f32 = 4.0;
const NEAR_PLANE: f32 = 0.1;
/// Segments are cut slightly in front of the near plane.
const CLIP_Z: f32 = -2.0 * NEAR_PLANE;

/// Axes that can hold 3D scatter points, line segments and labels.
///
/// Calls mirror a 3D plotting axes object: configure the camera and limits,
/// add primitives in data coordinates, `draw`, then `capture` the pixels.
pub trait PlotSurface3d {
    /// Set the camera elevation and azimuth in degrees.
    fn view_init(&mut self, elev: f32, azim: f32);
    /// Set the camera distance.
    fn set_dist(&mut self, dist: f32);
    /// Remove tick marks from every axis.
    fn hide_ticks(&mut self);
    /// Set the x data range.
    fn set_xlim3d(&mut self, lo: f32, hi: f32);
    /// Set the y data range.
    fn set_ylim3d(&mut self, lo: f32, hi: f32);
    /// Set the z data range.
    fn set_zlim3d(&mut self, lo: f32, hi: f32);
    /// Add one marker per point.
    fn scatter(&mut self, points: &[[f32; 3]], colors: &[Color]);
    /// Add a line segment.
    fn plot(&mut self, start: [f32; 3], end: [f32; 3], color: Color);
    /// Add a text label at a data position.
    fn text(&mut self, pos: [f32; 3], text: &str, color: Color);
    /// Set the title text and its colors; `background` of `None` leaves it unboxed.
    fn set_title(&mut self, title: &str, color: Color, background: Option<Color>);
    /// Rasterize everything added so far.
    fn draw(&mut self);
    /// Consume the surface and return its RGB pixels.
    fn capture(self) -> RgbImage;
}

/// Source of fresh surfaces, one per plot.
pub trait PlotBackend {
    /// Surface type handed out.
    type Surface: PlotSurface3d;

    /// Acquire a square surface of `size` pixels.
    fn acquire(&self, size: u32) -> Self::Surface;
}

/// Backend producing [`RasterAxes3d`] surfaces.
#[derive(Debug, Clone, Default)]
pub struct RasterBackend {
    font: Option<FontArc>,
}

impl RasterBackend {
    /// Create a backend; without a font titles and labels are skipped.
    #[must_use]
    pub const fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }
}

impl PlotBackend for RasterBackend {
    type Surface = RasterAxes3d;

    fn acquire(&self, size: u32) -> RasterAxes3d {
        RasterAxes3d::new(size, self.font.clone())
    }
}

#[derive(Debug, Clone)]
enum Primitive {
    Marker { pos: [f32; 3], color: Color },
    Segment { start: [f32; 3], end: [f32; 3], color: Color },
    Label { pos: [f32; 3], text: String, color: Color },
}

#[derive(Debug, Clone)]
struct Title {
    text: String,
    color: Color,
    background: Option<Color>,
}

/// Software 3D axes rendered into a square RGB image.
#[derive(Debug, Clone)]
pub struct RasterAxes3d {
    size: u32,
    font: Option<FontArc>,
    elev: f32,
    azim: f32,
    dist: f32,
    limits: [(f32, f32); 3],
    ticks: bool,
    title: Option<Title>,
    primitives: Vec<Primitive>,
    canvas: Option<RgbImage>,
}

impl RasterAxes3d {
    /// Create empty axes with a default camera and unit limits.
    #[must_use]
    pub fn new(size: u32, font: Option<FontArc>) -> Self {
        Self {
            size: size.max(1),
            font,
            elev: 30.0,
            azim: -60.0,
            dist: 10.0,
            limits: [(0.0, 1.0); 3],
            ticks: true,
            title: None,
            primitives: Vec::new(),
            canvas: None,
        }
    }

    /// Number of primitives added so far.
    #[must_use]
    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Current axis limits as `[x, y, z]` ranges.
    #[must_use]
    pub const fn limits(&self) -> [(f32, f32); 3] {
        self.limits
    }

    fn camera(&self) -> Camera {
        Camera::new(self.elev, self.azim, self.dist)
    }

    /// Data coordinates to the normalized cube [-1, 1]^3.
    fn normalize(&self, p: [f32; 3]) -> Point3<f32> {
        let axis = |v: f32, (lo, hi): (f32, f32)| {
            let span = hi - lo;
            if span.abs() < f32::EPSILON { 0.0 } else { 2.0 * (v - lo) / span - 1.0 }
        };
        Point3::new(
            axis(p[0], self.limits[0]),
            axis(p[1], self.limits[1]),
            axis(p[2], self.limits[2]),
        )
    }

    fn title_band(&self) -> f32 {
        if self.title.is_some() {
            TITLE_FONT_SIZE + 2.0 * TITLE_PADDING
        } else {
            0.0
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn viewport(&self) -> Viewport {
        let top = self.title_band();
        let width = self.size as f32;
        let height = (self.size as f32 - top).max(1.0);
        let side = width.min(height);
        Viewport {
            cx: width / 2.0,
            cy: top + height / 2.0,
            half: side / 2.0,
        }
    }

    fn render(&self) -> RgbImage {
        let mut image = RgbImage::from_pixel(self.size, self.size, Rgb([255, 255, 255]));
        let camera = self.camera();
        let viewport = self.viewport();
        let segment = |a: &Point3<f32>, b: &Point3<f32>| {
            camera
                .project_segment(a, b)
                .map(|(pa, pb, depth)| (viewport.map(pa), viewport.map(pb), depth))
        };

        let mut painter = Painter::new(&mut image, ChannelOrder::Rgb);
        let mut frame = cube_edges();
        if self.ticks {
            frame.extend(tick_marks());
        }
        for (i, (a, b)) in frame.iter().enumerate() {
            let color = if i < 12 { BOX_COLOR } else { Color::GRAY };
            if let Some((pa, pb, _)) = segment(a, b) {
                painter.line(pa, pb, color, 1.0, 1.0);
            }
        }

        // primitives behind the near plane are dropped, segments crossing it are cut
        let mut geometry: Vec<(f32, Shape)> = Vec::with_capacity(self.primitives.len());
        for prim in &self.primitives {
            match prim {
                Primitive::Marker { pos, color } => {
                    if let Some((xy, depth)) = camera.project(&self.normalize(*pos)) {
                        geometry.push((depth, Shape::Marker(viewport.map(xy), *color)));
                    }
                }
                Primitive::Segment { start, end, color } => {
                    if let Some((pa, pb, depth)) = segment(&self.normalize(*start), &self.normalize(*end)) {
                        geometry.push((depth, Shape::Segment(pa, pb, *color)));
                    }
                }
                Primitive::Label { .. } => {}
            }
        }
        // far to near so nearer geometry stays on top
        geometry.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (_, shape) in geometry {
            match shape {
                Shape::Marker(xy, color) => painter.circle(xy, MARKER_RADIUS, color, 1.0),
                Shape::Segment(pa, pb, color) => painter.line(pa, pb, color, LINE_WIDTH, 1.0),
            }
        }

        if let Some(font) = &self.font {
            for prim in &self.primitives {
                if let Primitive::Label { pos, text, color } = prim {
                    if let Some((xy, _)) = camera.project(&self.normalize(*pos)) {
                        let anchor = viewport.map(xy);
                        painter.text(text, anchor, font, LABEL_FONT_SIZE, *color, (HAlign::Left, VAlign::Bottom));
                    }
                }
            }
        }
        if let Some(title) = &self.title {
            draw_title(&mut painter, title, self.font.as_ref(), viewport.cx);
        }
        image
    }
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    Marker((f32, f32), Color),
    Segment((f32, f32), (f32, f32), Color),
}

/// Title box and text; without a font only the box is drawn.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn draw_title(painter: &mut Painter<'_>, title: &Title, font: Option<&FontArc>, cx: f32) {
    let (w, h) = match font {
        Some(font) => {
            let (w, h) = Painter::measure(&title.text, font, TITLE_FONT_SIZE);
            (w as f32, h as f32)
        }
        None => (
            title.text.chars().count() as f32 * TITLE_FONT_SIZE * 0.55,
            TITLE_FONT_SIZE,
        ),
    };
    let top = TITLE_PADDING;
    if let Some(background) = title.background {
        let x1 = cx - w / 2.0 - TITLE_PADDING;
        let x2 = cx + w / 2.0 + TITLE_PADDING;
        let y2 = top + h + TITLE_PADDING;
        let rect = [
            (x1 as i32, 0),
            (x2 as i32, 0),
            (x2 as i32, y2 as i32),
            (x1 as i32, y2 as i32),
        ];
        painter.polygon(&rect, background, 1.0);
    }
    let Some(font) = font else { return };
    // drawn twice for a heavier stroke
    for dx in [0.0, 1.0] {
        painter.text(
            &title.text,
            (cx + dx, top),
            font,
            TITLE_FONT_SIZE,
            title.color,
            (HAlign::Center, VAlign::Top),
        );
    }
}

impl PlotSurface3d for RasterAxes3d {
    fn view_init(&mut self, elev: f32, azim: f32) {
        self.elev = elev;
        self.azim = azim;
    }

    fn set_dist(&mut self, dist: f32) {
        self.dist = dist;
    }

    fn hide_ticks(&mut self) {
        self.ticks = false;
    }

    fn set_xlim3d(&mut self, lo: f32, hi: f32) {
        self.limits[0] = (lo, hi);
    }

    fn set_ylim3d(&mut self, lo: f32, hi: f32) {
        self.limits[1] = (lo, hi);
    }

    fn set_zlim3d(&mut self, lo: f32, hi: f32) {
        self.limits[2] = (lo, hi);
    }

    fn scatter(&mut self, points: &[[f32; 3]], colors: &[Color]) {
        self.primitives.extend(
            points
                .iter()
                .zip(colors)
                .map(|(&pos, &color)| Primitive::Marker { pos, color }),
        );
    }

    fn plot(&mut self, start: [f32; 3], end: [f32; 3], color: Color) {
        self.primitives.push(Primitive::Segment { start, end, color });
    }

    fn text(&mut self, pos: [f32; 3], text: &str, color: Color) {
        self.primitives.push(Primitive::Label {
            pos,
            text: text.to_string(),
            color,
        });
    }

    fn set_title(&mut self, title: &str, color: Color, background: Option<Color>) {
        self.title = Some(Title {
            text: title.to_string(),
            color,
            background,
        });
    }

    fn draw(&mut self) {
        self.canvas = Some(self.render());
    }

    fn capture(self) -> RgbImage {
        match self.canvas {
            Some(canvas) => canvas,
            None => self.render(),
        }
    }
}

/// Orbit camera around the normalized axes cube.
struct Camera {
    view: Isometry3<f32>,
    projection: Perspective3<f32>,
}

impl Camera {
    fn new(elev: f32, azim: f32, dist: f32) -> Self {
        let (el, az) = (elev.to_radians(), azim.to_radians());
        let dist = dist.max(2.0);
        let eye = Point3::from(Vector3::new(el.cos() * az.cos(), el.cos() * az.sin(), el.sin()) * dist);
        let up = if el.cos().abs() < 1e-4 { Vector3::y() } else { Vector3::z() };
        let view = Isometry3::look_at_rh(&eye, &Point3::origin(), &up);
        let fovy = 2.0 * (1.8 / dist).atan();
        let projection = Perspective3::new(1.0, fovy, NEAR_PLANE, dist + 10.0);
        Self { view, projection }
    }

    /// Normalized device xy and view-space depth (larger is nearer).
    ///
    /// `None` for points at or behind the near plane.
    fn project(&self, p: &Point3<f32>) -> Option<((f32, f32), f32)> {
        let in_view = self.view.transform_point(p);
        self.project_view(&in_view).map(|xy| (xy, in_view.z))
    }

    /// Project both ends of a segment, cutting it where it crosses the clip plane.
    fn project_segment(&self, a: &Point3<f32>, b: &Point3<f32>) -> Option<((f32, f32), (f32, f32), f32)> {
        let (mut va, mut vb) = (self.view.transform_point(a), self.view.transform_point(b));
        let in_front = |v: &Point3<f32>| v.z <= CLIP_Z;
        match (in_front(&va), in_front(&vb)) {
            (true, true) => {}
            (true, false) => vb = cut_at_clip_plane(&va, &vb),
            (false, true) => va = cut_at_clip_plane(&vb, &va),
            (false, false) => return None,
        }
        let pa = self.project_view(&va)?;
        let pb = self.project_view(&vb)?;
        Some((pa, pb, (va.z + vb.z) / 2.0))
    }

    fn project_view(&self, in_view: &Point3<f32>) -> Option<(f32, f32)> {
        // the camera looks down -z; NaN fails the comparison too
        if !(in_view.z <= -NEAR_PLANE) {
            return None;
        }
        let ndc = self.projection.project_point(in_view);
        (ndc.x.is_finite() && ndc.y.is_finite()).then_some((ndc.x, ndc.y))
    }
}

/// Point of the segment `front`-`behind` lying on the clip plane.
fn cut_at_clip_plane(front: &Point3<f32>, behind: &Point3<f32>) -> Point3<f32> {
    let t = (CLIP_Z - front.z) / (behind.z - front.z);
    *front + (*behind - *front) * t
}

struct Viewport {
    cx: f32,
    cy: f32,
    half: f32,
}

impl Viewport {
    fn map(&self, ndc: (f32, f32)) -> (f32, f32) {
        (self.cx + ndc.0 * self.half, self.cy - ndc.1 * self.half)
    }
}

fn cube_edges() -> Vec<(Point3<f32>, Point3<f32>)> {
    let corner = |i: u8| {
        Point3::new(
            if i & 1 == 0 { -1.0 } else { 1.0 },
            if i & 2 == 0 { -1.0 } else { 1.0 },
            if i & 4 == 0 { -1.0 } else { 1.0 },
        )
    };
    let mut edges = Vec::with_capacity(12);
    for i in 0..8u8 {
        for bit in [1u8, 2, 4] {
            if i & bit == 0 {
                edges.push((corner(i), corner(i | bit)));
            }
        }
    }
    edges
}

/// Short ticks along the three box edges leaving (-1, -1, -1).
#[allow(clippy::cast_precision_loss)]
fn tick_marks() -> Vec<(Point3<f32>, Point3<f32>)> {
    let mut marks = Vec::with_capacity(3 * TICK_COUNT);
    for i in 0..TICK_COUNT {
        let t = -1.0 + 2.0 * (i as f32 + 0.5) / TICK_COUNT as f32;
        marks.push((Point3::new(t, -1.0, -1.0), Point3::new(t, -1.08, -1.0)));
        marks.push((Point3::new(-1.0, t, -1.0), Point3::new(-1.08, t, -1.0)));
        marks.push((Point3::new(-1.0, -1.0, t), Point3::new(-1.08, -1.0, t)));
    }
    marks
}
