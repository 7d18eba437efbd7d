// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the pose rendering library.

use std::fmt;

/// Result type alias for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Main error type for the pose rendering library.
#[derive(Debug)]
pub enum RenderError {
    /// A configured color list does not match the keypoint or bone count.
    ColorCountMismatch {
        /// Which color list was checked (`kpt_color`, `link_color`, ...).
        kind: &'static str,
        /// Number of colors configured.
        colors: usize,
        /// Name of the counted items (`keypoints`, `skeleton`).
        target: &'static str,
        /// Number of items the colors should cover.
        expected: usize,
    },
    /// Invalid configuration provided.
    ConfigError(String),
    /// Array shapes or slot counts that do not line up.
    ShapeError(String),
    /// Unsupported keypoint definition conversion.
    ConversionError(String),
    /// Error processing images.
    ImageError(String),
    /// IO error with context (file not found, permission denied, etc.).
    IoError(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
    /// Malformed detection input.
    InputError(String),
    /// Font could not be loaded.
    FontError(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColorCountMismatch {
                kind,
                colors,
                target,
                expected,
            } => write!(
                f,
                "Config error: the length of {kind} ({colors}) does not match that of {target} ({expected})"
            ),
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::ShapeError(msg) => write!(f, "Shape error: {msg}"),
            Self::ConversionError(msg) => write!(f, "Conversion error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::IoError(msg) => write!(f, "IO error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::InputError(msg) => write!(f, "Input error: {msg}"),
            Self::FontError(msg) => write!(f, "Font error: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for RenderError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::ShapeError(err.to_string())
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        Self::InputError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RenderError::ConfigError("test".to_string());
        assert_eq!(err.to_string(), "Config error: test");

        let err = RenderError::ShapeError("test".to_string());
        assert_eq!(err.to_string(), "Shape error: test");
    }

    #[test]
    fn test_color_count_mismatch_display() {
        let err = RenderError::ColorCountMismatch {
            kind: "kpt_color",
            colors: 3,
            target: "keypoints",
            expected: 17,
        };
        assert_eq!(
            err.to_string(),
            "Config error: the length of kpt_color (3) does not match that of keypoints (17)"
        );
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error;

        let err = RenderError::from(std::io::Error::other("boom"));
        assert!(err.source().is_some());
        assert!(RenderError::InputError("x".into()).source().is_none());
    }
}
