// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Reading detection files and images, writing rendered frames.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbImage};
use ndarray::{Array2, Array3};
use serde::Deserialize;

use crate::error::{RenderError, Result};
use crate::frame::RenderedFrame;
use crate::instances::{NO_TRACK, PoseDataSample, PoseInstances, TrackId};
use crate::pose3d::PlotKey;

/// One instance as stored in a sample file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InstanceRecord {
    /// Keypoints as `[x, y]` or `[x, y, z]` rows.
    pub keypoints: Vec<Vec<f32>>,
    /// Per-keypoint scores.
    #[serde(default)]
    pub keypoint_scores: Option<Vec<f32>>,
    /// Per-keypoint visibility.
    #[serde(default)]
    pub keypoints_visible: Option<Vec<f32>>,
    /// Box as x1, y1, x2, y2.
    #[serde(default)]
    pub bbox: Option<[f32; 4]>,
    /// Track id of the subject.
    #[serde(default)]
    pub track_id: Option<TrackId>,
}

/// Contents of a sample file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SampleFile {
    /// Instances in slot order.
    #[serde(default)]
    pub instances: Vec<InstanceRecord>,
}

impl SampleFile {
    /// Parse a sample file from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an input error for malformed JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a sample file.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the file cannot be opened and an input error
    /// for malformed JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| RenderError::IoError(format!("Failed to open {}: {e}", path.display())))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Track ids of the instances.
    ///
    /// `None` when no instance carries one; otherwise instances without an id
    /// get `-1` and are not drawn.
    #[must_use]
    pub fn track_ids(&self) -> Option<Vec<TrackId>> {
        if self.instances.iter().all(|i| i.track_id.is_none()) {
            return None;
        }
        Some(
            self.instances
                .iter()
                .map(|i| i.track_id.unwrap_or(NO_TRACK))
                .collect(),
        )
    }

    /// Stack the instances into dense arrays.
    ///
    /// # Errors
    ///
    /// Returns an input error when instances disagree on keypoint count or
    /// dimension, or when only some instances carry a box.
    pub fn to_sample(&self) -> Result<PoseDataSample> {
        let Some(first) = self.instances.first() else {
            return Ok(PoseDataSample::empty());
        };
        let n = self.instances.len();
        let k = first.keypoints.len();
        let d = first.keypoints.first().map_or(2, Vec::len);

        let mut keypoints = Array3::<f32>::zeros((n, k, d));
        let mut scores = Array2::<f32>::ones((n, k));
        let mut visible = Array2::<f32>::ones((n, k));
        let mut has_scores = false;
        let mut has_visible = false;

        for (i, inst) in self.instances.iter().enumerate() {
            if inst.keypoints.len() != k {
                return Err(RenderError::InputError(format!(
                    "instance {i} has {} keypoints, expected {k}",
                    inst.keypoints.len()
                )));
            }
            for (j, row) in inst.keypoints.iter().enumerate() {
                if row.len() != d {
                    return Err(RenderError::InputError(format!(
                        "keypoint {j} of instance {i} has {} coordinates, expected {d}",
                        row.len()
                    )));
                }
                for (c, &v) in row.iter().enumerate() {
                    keypoints[[i, j, c]] = v;
                }
            }
            if let Some(values) = &inst.keypoint_scores {
                fill_row(&mut scores, i, values, "keypoint_scores")?;
                has_scores = true;
            }
            if let Some(values) = &inst.keypoints_visible {
                fill_row(&mut visible, i, values, "keypoints_visible")?;
                has_visible = true;
            }
        }

        let mut instances = PoseInstances::new(keypoints)?;
        if has_scores {
            instances = instances.with_scores(scores)?;
        }
        if has_visible {
            instances = instances.with_visibility(visible)?;
        }

        let boxes: Vec<[f32; 4]> = self.instances.iter().filter_map(|i| i.bbox).collect();
        if boxes.len() == n {
            let flat: Vec<f32> = boxes.into_iter().flatten().collect();
            instances = instances.with_bboxes(Array2::from_shape_vec((n, 4), flat)?)?;
        } else if !boxes.is_empty() {
            return Err(RenderError::InputError(format!(
                "{} of {n} instances carry a bbox; all or none must",
                boxes.len()
            )));
        }

        Ok(PoseDataSample::new(instances))
    }
}

fn fill_row(target: &mut Array2<f32>, row: usize, values: &[f32], name: &str) -> Result<()> {
    if values.len() != target.ncols() {
        return Err(RenderError::InputError(format!(
            "{name} of instance {row} has {} values, expected {}",
            values.len(),
            target.ncols()
        )));
    }
    for (dst, &v) in target.row_mut(row).iter_mut().zip(values) {
        *dst = v;
    }
    Ok(())
}

/// Load an image as RGB.
///
/// JPEG files are decoded with `jpeg-decoder` first, everything else and any
/// decoder failure falls back to `image::open`.
///
/// # Errors
///
/// Returns an image error when no decoder can read the file.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    if matches!(ext.as_deref(), Some("jpg" | "jpeg")) {
        if let Some(image) = decode_jpeg(path) {
            return Ok(image.to_rgb8());
        }
    }
    Ok(image::open(path)?.to_rgb8())
}

fn decode_jpeg(path: &Path) -> Option<DynamicImage> {
    let file = File::open(path).ok()?;
    let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(file));
    let pixels = decoder.decode().ok()?;
    let info = decoder.info()?;
    let (width, height) = (u32::from(info.width), u32::from(info.height));
    match info.pixel_format {
        jpeg_decoder::PixelFormat::RGB24 => {
            image::ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        }
        jpeg_decoder::PixelFormat::L8 => {
            image::ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
        }
        _ => None,
    }
}

/// Find the next available run directory (`render`, `render2`, `render3`, ...).
#[must_use]
pub fn find_next_run_dir<P: AsRef<Path>>(base: P, prefix: &str) -> PathBuf {
    let base = base.as_ref();
    let first = base.join(prefix);
    if !first.exists() {
        return first;
    }
    (2..)
        .map(|i| base.join(format!("{prefix}{i}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// File name for one plot.
#[must_use]
pub fn plot_file_name(stem: &str, key: PlotKey) -> String {
    match key {
        PlotKey::Track(id) => format!("{stem}_track{id}.png"),
        PlotKey::Placeholder(id) => format!("{stem}_placeholder{}.png", id.unsigned_abs()),
    }
}

/// Write a frame's overlay and plots into `dir`.
///
/// # Returns
///
/// Paths written, overlay first.
///
/// # Errors
///
/// Returns an IO error when `dir` cannot be created and an image error when
/// encoding fails.
pub fn save_frame<P: AsRef<Path>>(dir: P, stem: &str, frame: &RenderedFrame) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(frame.plots.len() + 1);

    if let Some(overlay) = &frame.overlay {
        let path = dir.join(format!("{stem}.jpg"));
        overlay.save(&path)?;
        written.push(path);
    }
    for entry in frame.plots.iter() {
        let path = dir.join(plot_file_name(stem, entry.key));
        entry.image.save(&path)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose3d::{PlotEntry, Pose3dPlots};

    const SAMPLE: &str = r#"{
        "instances": [
            {"keypoints": [[1, 2, 3], [4, 5, 6]], "keypoint_scores": [0.5, 0.9], "track_id": 3},
            {"keypoints": [[7, 8, 9], [1, 1, 1]]}
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let file = SampleFile::from_json(SAMPLE).unwrap();
        let sample = file.to_sample().unwrap();
        let inst = sample.pred_instances.unwrap();
        assert_eq!(inst.keypoints().dim(), (2, 2, 3));
        assert_eq!(inst.keypoints()[[1, 0, 2]], 9.0);
        assert_eq!(inst.scores()[[0, 0]], 0.5);
        assert_eq!(inst.scores()[[1, 1]], 1.0);
        assert_eq!(file.track_ids(), Some(vec![3, -1]));
    }

    #[test]
    fn test_empty_sample() {
        let file = SampleFile::from_json(r#"{"instances": []}"#).unwrap();
        assert!(file.to_sample().unwrap().pred_instances.is_none());
        assert_eq!(file.track_ids(), None);
        assert!(SampleFile::from_json("{}").unwrap().instances.is_empty());
    }

    #[test]
    fn test_inconsistent_sample() {
        let file = SampleFile::from_json(r#"{"instances": [{"keypoints": [[1, 2]]}, {"keypoints": [[1, 2], [3, 4]]}]}"#)
            .unwrap();
        assert!(matches!(file.to_sample(), Err(RenderError::InputError(_))));

        let file = SampleFile::from_json(r#"{"instances": [{"keypoints": [[1, 2]], "keypoint_scores": [1, 2]}]}"#)
            .unwrap();
        assert!(matches!(file.to_sample(), Err(RenderError::InputError(_))));
    }

    #[test]
    fn test_partial_bboxes_rejected() {
        let file = SampleFile::from_json(
            r#"{"instances": [{"keypoints": [[1, 2]], "bbox": [0, 0, 4, 4]}, {"keypoints": [[1, 2]]}]}"#,
        )
        .unwrap();
        assert!(file.to_sample().is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(SampleFile::from_json("{"), Err(RenderError::InputError(_))));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(SampleFile::load("/no/such/file.json"), Err(RenderError::IoError(_))));
    }

    #[test]
    fn test_find_next_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let first = find_next_run_dir(dir.path(), "render");
        assert_eq!(first, dir.path().join("render"));
        fs::create_dir(&first).unwrap();
        assert_eq!(find_next_run_dir(dir.path(), "render"), dir.path().join("render2"));
    }

    #[test]
    fn test_plot_file_name() {
        assert_eq!(plot_file_name("frame", PlotKey::Track(7)), "frame_track7.png");
        assert_eq!(plot_file_name("frame", PlotKey::Placeholder(-2)), "frame_placeholder2.png");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut plots = Pose3dPlots::new();
        plots.insert(PlotEntry {
            key: PlotKey::Track(1),
            image: RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30])),
            has_geometry: true,
        });
        let frame = RenderedFrame {
            overlay: Some(RgbImage::new(8, 6)),
            plots,
        };
        let written = save_frame(dir.path(), "f", &frame).unwrap();
        assert_eq!(written.len(), 2);
        let overlay = load_image(&written[0]).unwrap();
        assert_eq!(overlay.dimensions(), (8, 6));
        let plot = load_image(&written[1]).unwrap();
        assert_eq!(plot.get_pixel(0, 0).0, [10, 20, 30]);
    }
}
