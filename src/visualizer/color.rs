// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Colors, palettes and track-id color assignment.

use std::str::FromStr;

use image::Rgb;

use crate::error::{RenderError, Result};

/// Golden ratio conjugate used to spread track hues.
pub const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_895;

/// Color type for visualization, always stored in RGB order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Red color.
    pub const RED: Color = Color(255, 0, 0);
    /// Green color.
    pub const GREEN: Color = Color(0, 255, 0);
    /// Blue color.
    pub const BLUE: Color = Color(0, 0, 255);
    /// White color.
    pub const WHITE: Color = Color(255, 255, 255);
    /// Black color.
    pub const BLACK: Color = Color(0, 0, 0);
    /// Neutral gray.
    pub const GRAY: Color = Color(128, 128, 128);

    /// Create a new color from RGB values.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// Create a color from unit-range RGB components.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_unit(rgb: [f32; 3]) -> Self {
        let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self(to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2]))
    }

    /// Get a color from the pose palette by index.
    #[must_use]
    pub const fn from_pose_index(index: usize) -> Self {
        let color = POSE_COLORS[index % POSE_COLORS.len()];
        Self(color[0], color[1], color[2])
    }

    /// The same color with red and blue swapped.
    #[must_use]
    pub const fn swapped(self) -> Self {
        Self(self.2, self.1, self.0)
    }

    /// Convert to an `image` pixel.
    #[must_use]
    pub const fn to_rgb(self) -> Rgb<u8> {
        Rgb([self.0, self.1, self.2])
    }
}

impl FromStr for Color {
    type Err = RenderError;

    /// Parse a color name (`"red"`, `"green"`, ...) or a `#rrggbb` hex string.
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_lowercase();
        if let Some(hex) = name.strip_prefix('#') {
            if hex.len() == 6 {
                let parse = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
                if let (Ok(r), Ok(g), Ok(b)) = (parse(0), parse(2), parse(4)) {
                    return Ok(Self(r, g, b));
                }
            }
            return Err(RenderError::ConfigError(format!("invalid hex color '{s}'")));
        }
        match name.as_str() {
            "red" => Ok(Self::RED),
            "green" => Ok(Self::GREEN),
            "blue" => Ok(Self::BLUE),
            "white" => Ok(Self::WHITE),
            "black" => Ok(Self::BLACK),
            "gray" | "grey" => Ok(Self::GRAY),
            "yellow" => Ok(Self(255, 255, 0)),
            "cyan" => Ok(Self(0, 255, 255)),
            "magenta" => Ok(Self(255, 0, 255)),
            "orange" => Ok(Self(255, 128, 0)),
            _ => Err(RenderError::ConfigError(format!("unknown color name '{s}'"))),
        }
    }
}

/// Keypoint or bone color configuration.
///
/// Mirrors the three shapes a color option can take: nothing configured, one
/// color for every item, or one optional color per item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColorSpec {
    /// No color; items are not drawn.
    #[default]
    Unset,
    /// One color shared by every item.
    Uniform(Color),
    /// One color per item, `None` disables that item.
    PerItem(Vec<Option<Color>>),
}

impl ColorSpec {
    /// Build a per-item color list from pose palette indices.
    #[must_use]
    pub fn from_pose_indices(indices: &[usize]) -> Self {
        Self::PerItem(
            indices
                .iter()
                .map(|&i| Some(Color::from_pose_index(i)))
                .collect(),
        )
    }

    /// Whether any color is configured at all.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Expand the colors to exactly `count` entries.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ColorCountMismatch`] when a per-item list does
    /// not have `count` entries.
    pub fn resolve(
        &self,
        count: usize,
        kind: &'static str,
        target: &'static str,
    ) -> Result<Vec<Option<Color>>> {
        match self {
            Self::Unset => Ok(vec![None; count]),
            Self::Uniform(color) => Ok(vec![Some(*color); count]),
            Self::PerItem(colors) if colors.len() == count => Ok(colors.clone()),
            Self::PerItem(colors) => Err(RenderError::ColorCountMismatch {
                kind,
                colors: colors.len(),
                target,
                expected: count,
            }),
        }
    }
}

impl From<Color> for ColorSpec {
    fn from(color: Color) -> Self {
        Self::Uniform(color)
    }
}

/// Deterministic unit-range RGB color for a track id.
///
/// Hue walks the golden ratio so consecutive ids land far apart; saturation
/// and lightness cycle with periods 5 and 3. Negative ids are valid.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn color_for_track(track_id: i32) -> [f32; 3] {
    let id = i64::from(track_id);
    let h = (id as f64 * GOLDEN_RATIO_CONJUGATE).rem_euclid(1.0);
    let s = 0.4 + id.rem_euclid(5) as f64 * 0.1;
    let l = 0.4 + id.rem_euclid(3) as f64 * 0.1;
    let (r, g, b) = hls_to_rgb(h, l, s);
    [r as f32, g as f32, b as f32]
}

/// HLS to RGB conversion, all components in [0, 1].
#[must_use]
pub fn hls_to_rgb(h: f64, l: f64, s: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (l, l, l);
    }
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    (
        hue_channel(m1, m2, h + 1.0 / 3.0),
        hue_channel(m1, m2, h),
        hue_channel(m1, m2, h - 1.0 / 3.0),
    )
}

fn hue_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

/// Ultralytics Pose Color Palette
pub const POSE_COLORS: [[u8; 3]; 20] = [
    [255, 128, 0],   // #ff8000
    [255, 153, 51],  // #ff9933
    [255, 178, 102], // #ffb266
    [230, 230, 0],   // #e6e600
    [255, 153, 255], // #ff99ff
    [153, 204, 255], // #99ccff
    [255, 102, 255], // #ff66ff
    [255, 51, 255],  // #ff33ff
    [102, 178, 255], // #66b2ff
    [51, 153, 255],  // #3399ff
    [255, 153, 153], // #ff9999
    [255, 102, 102], // #ff6666
    [255, 51, 51],   // #ff3333
    [153, 255, 153], // #99ff99
    [102, 255, 102], // #66ff66
    [51, 255, 51],   // #33ff33
    [0, 255, 0],     // #00ff00
    [0, 0, 255],     // #0000ff
    [255, 0, 0],     // #ff0000
    [255, 255, 255], // #ffffff
];
