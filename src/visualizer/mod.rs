// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Drawing building blocks: colors, skeletons, raster primitives and fonts.

/// Color definitions, palettes and track colors.
pub mod color;
/// Font loading and caching.
pub mod font;
/// Alpha-blended raster primitives.
pub mod painter;
/// Skeleton definitions and dataset palettes.
pub mod skeleton;

pub use color::{Color, ColorSpec, color_for_track};
pub use painter::{ChannelOrder, Painter};
pub use skeleton::Skeleton;
