// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Font loading for keypoint labels and plot titles.

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::FontArc;

use crate::error::{RenderError, Result};

/// Font used when no font path is given.
pub const DEFAULT_FONT: &str = "Arial.ttf";

/// Assets URL for downloading fonts
#[cfg(feature = "download")]
const ASSETS_URL: &str = "https://github.com/ultralytics/assets/releases/download/v0.0.0";

/// Load a TrueType/OpenType font from disk.
///
/// # Errors
///
/// Returns an IO error when the file cannot be read and a font error when the
/// bytes are not a valid font.
pub fn load_font<P: AsRef<Path>>(path: P) -> Result<FontArc> {
    let path = path.as_ref();
    let data = fs::read(path)
        .map_err(|e| RenderError::IoError(format!("Failed to read font {}: {e}", path.display())))?;
    FontArc::try_from_vec(data)
        .map_err(|e| RenderError::FontError(format!("{}: {e}", path.display())))
}

/// Directory where fonts are cached between runs.
#[must_use]
pub fn font_cache_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("PoseRender"))
}

/// Check if font exists locally or download it.
///
/// Returns `None` when the font is unavailable; callers render without text.
pub fn check_font(font: &str) -> Option<PathBuf> {
    let local = Path::new(font);
    if local.exists() {
        return Some(local.to_path_buf());
    }

    let font_name = local.file_name()?.to_string_lossy().to_string();
    let config_dir = font_cache_dir()?;
    let font_path = config_dir.join(&font_name);
    if font_path.exists() {
        return Some(font_path);
    }

    download_font(&font_name, &config_dir, &font_path)
}

#[cfg(feature = "download")]
fn download_font(font_name: &str, config_dir: &Path, font_path: &Path) -> Option<PathBuf> {
    use std::fs::File;
    use std::io;

    if let Err(e) = fs::create_dir_all(config_dir) {
        crate::warn!("Failed to create font directory: {e}");
        return None;
    }

    let url = format!("{ASSETS_URL}/{font_name}");
    crate::verbose!("Downloading {url} to {}", font_path.display());

    match ureq::get(&url).call() {
        Ok(response) => {
            let mut file = match File::create(font_path) {
                Ok(f) => f,
                Err(e) => {
                    crate::warn!("Failed to create font file: {e}");
                    return None;
                }
            };

            let mut reader = response.into_body().into_reader();
            if let Err(e) = io::copy(&mut reader, &mut file) {
                crate::warn!("Failed to download font: {e}");
                let _ = fs::remove_file(font_path);
                return None;
            }

            Some(font_path.to_path_buf())
        }
        Err(e) => {
            crate::warn!("Failed to download font from {url}: {e}");
            None
        }
    }
}

#[cfg(not(feature = "download"))]
fn download_font(_font_name: &str, _config_dir: &Path, _font_path: &Path) -> Option<PathBuf> {
    None
}

/// Resolve and load a font, falling back to [`DEFAULT_FONT`].
///
/// Failures are reported as warnings and yield `None`.
pub fn resolve_font(font: Option<&str>) -> Option<FontArc> {
    let path = check_font(font.unwrap_or(DEFAULT_FONT))?;
    match load_font(&path) {
        Ok(f) => Some(f),
        Err(e) => {
            crate::warn!("{e}");
            None
        }
    }
}
