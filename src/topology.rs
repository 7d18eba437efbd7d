// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Keypoint topologies and conversions between them.
//!
//! A topology is the fixed ordering and naming of keypoints produced by one
//! dataset convention. Two conversions live here:
//!
//! - [`to_openpose`] rewrites one COCO instance into the 18 keypoint OpenPose
//!   layout for drawing, synthesizing the neck.
//! - [`KeypointConverter`] maps per-keypoint values (scores) of a whole set of
//!   instances from one dataset definition to another.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};

use crate::error::{RenderError, Result};

/// Keypoint dataset definitions known to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeypointDataset {
    /// COCO 17 keypoints.
    #[default]
    Coco,
    /// Human3.6M 17 keypoints.
    H36m,
    /// OpenPose 18 keypoints.
    Openpose,
}

impl KeypointDataset {
    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Coco => "coco",
            Self::H36m => "h36m",
            Self::Openpose => "openpose",
        }
    }

    /// Number of keypoints in this definition.
    #[must_use]
    pub const fn num_keypoints(&self) -> usize {
        match self {
            Self::Coco | Self::H36m => 17,
            Self::Openpose => 18,
        }
    }
}

impl fmt::Display for KeypointDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for KeypointDataset {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "coco" | "cocodataset" => Ok(Self::Coco),
            "h36m" | "human36m" | "human36mdataset" => Ok(Self::H36m),
            "openpose" => Ok(Self::Openpose),
            _ => Err(RenderError::ConfigError(format!(
                "invalid keypoint dataset '{s}', expected one of: coco, h36m, openpose"
            ))),
        }
    }
}

/// How 2D skeletons are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkeletonStyle {
    /// Native topology, thin line bones.
    #[default]
    Mmpose,
    /// OpenPose topology with synthesized neck, ellipse bones.
    Openpose,
}

impl FromStr for SkeletonStyle {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mmpose" => Ok(Self::Mmpose),
            "openpose" => Ok(Self::Openpose),
            _ => Err(RenderError::ConfigError(format!(
                "invalid skeleton style '{s}', expected one of: mmpose, openpose"
            ))),
        }
    }
}

/// COCO index of the left shoulder.
pub const COCO_LEFT_SHOULDER: usize = 5;
/// COCO index of the right shoulder.
pub const COCO_RIGHT_SHOULDER: usize = 6;
/// Index at which the synthesized neck is inserted.
pub const NECK_INSERT_INDEX: usize = 17;

/// Source indices (after neck insertion) copied into [`OPENPOSE_TARGET_INDICES`].
pub const OPENPOSE_SOURCE_INDICES: [usize; 15] = [17, 6, 8, 10, 7, 9, 12, 14, 16, 13, 15, 2, 1, 4, 3];
/// Destination indices of the OpenPose permutation.
pub const OPENPOSE_TARGET_INDICES: [usize; 15] = [1, 2, 3, 4, 6, 7, 8, 9, 10, 12, 13, 14, 15, 16, 17];

/// One instance's keypoints in a drawable form.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceKeypoints {
    /// Pixel coordinates, shape (K, 2).
    pub xy: Array2<f32>,
    /// Scores, shape (K,).
    pub scores: Array1<f32>,
    /// Visibility, shape (K,).
    pub visible: Array1<f32>,
}

/// Rewrite one COCO instance into the OpenPose layout.
///
/// The neck is the midpoint of both shoulders; its score and visibility are
/// 1 only when both shoulders reach `kpt_thr`.
///
/// # Errors
///
/// Returns a shape error when the instance has fewer than 17 keypoints or
/// when the arrays disagree on the keypoint count.
pub fn to_openpose(
    xy: ArrayView2<'_, f32>,
    scores: ArrayView1<'_, f32>,
    visible: ArrayView1<'_, f32>,
    kpt_thr: f32,
) -> Result<InstanceKeypoints> {
    let k = xy.nrows();
    if k < NECK_INSERT_INDEX || scores.len() != k || visible.len() != k || xy.ncols() < 2 {
        return Err(RenderError::ShapeError(format!(
            "openpose style needs 17 COCO keypoints, got xy {:?}, scores {}, visible {}",
            xy.shape(),
            scores.len(),
            visible.len()
        )));
    }

    let (l, r) = (COCO_LEFT_SHOULDER, COCO_RIGHT_SHOULDER);
    let neck_x = (xy[[l, 0]] + xy[[r, 0]]) / 2.0;
    let neck_y = (xy[[l, 1]] + xy[[r, 1]]) / 2.0;
    let both = |v: ArrayView1<'_, f32>| {
        if v[l] >= kpt_thr && v[r] >= kpt_thr { 1.0 } else { 0.0 }
    };
    let neck_score = both(scores);
    let neck_visible = both(visible);

    let mut new_xy = Array2::<f32>::zeros((k + 1, 2));
    let mut new_scores = Array1::<f32>::zeros(k + 1);
    let mut new_visible = Array1::<f32>::zeros(k + 1);
    for (dst, src) in (0..=k).map(|i| (i, insert_source(i))) {
        match src {
            Some(src) => {
                new_xy.row_mut(dst).assign(&xy.slice(s![src, ..2]));
                new_scores[dst] = scores[src];
                new_visible[dst] = visible[src];
            }
            None => {
                new_xy[[dst, 0]] = neck_x;
                new_xy[[dst, 1]] = neck_y;
                new_scores[dst] = neck_score;
                new_visible[dst] = neck_visible;
            }
        }
    }

    let (src_xy, src_scores, src_visible) = (new_xy.clone(), new_scores.clone(), new_visible.clone());
    for (&dst, &src) in OPENPOSE_TARGET_INDICES.iter().zip(&OPENPOSE_SOURCE_INDICES) {
        new_xy.row_mut(dst).assign(&src_xy.row(src));
        new_scores[dst] = src_scores[src];
        new_visible[dst] = src_visible[src];
    }

    Ok(InstanceKeypoints {
        xy: new_xy,
        scores: new_scores,
        visible: new_visible,
    })
}

/// Source row for position `i` after inserting the neck; `None` is the neck.
const fn insert_source(i: usize) -> Option<usize> {
    if i < NECK_INSERT_INDEX {
        Some(i)
    } else if i == NECK_INSERT_INDEX {
        None
    } else {
        Some(i - 1)
    }
}

/// Converts per-keypoint values between dataset definitions.
///
/// Inputs are shaped (N, K) with K matching `source`; outputs are (N, K')
/// with K' matching `target`. The instance axis is preserved.
pub trait KeypointConverter {
    /// Convert `values` from `source` to `target`.
    ///
    /// # Errors
    ///
    /// Implementations return a conversion error for unsupported pairs and a
    /// shape error when K does not match `source`.
    fn convert(
        &self,
        values: ArrayView2<'_, f32>,
        source: KeypointDataset,
        target: KeypointDataset,
    ) -> Result<Array2<f32>>;
}

/// Built-in converter: identity and COCO → Human3.6M.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetConverter;

impl KeypointConverter for DatasetConverter {
    fn convert(
        &self,
        values: ArrayView2<'_, f32>,
        source: KeypointDataset,
        target: KeypointDataset,
    ) -> Result<Array2<f32>> {
        if values.ncols() != source.num_keypoints() {
            return Err(RenderError::ShapeError(format!(
                "{source} expects {} keypoints, got {}",
                source.num_keypoints(),
                values.ncols()
            )));
        }
        match (source, target) {
            (a, b) if a == b => Ok(values.to_owned()),
            (KeypointDataset::Coco, KeypointDataset::H36m) => Ok(coco_to_h36m(values)),
            _ => Err(RenderError::ConversionError(format!(
                "no keypoint conversion from {source} to {target}"
            ))),
        }
    }
}

/// COCO → Human3.6M, averaging parents for joints COCO lacks.
fn coco_to_h36m(values: ArrayView2<'_, f32>) -> Array2<f32> {
    let n = values.nrows();
    let mut out = Array2::<f32>::zeros((n, 17));
    let col = |i: usize| values.column(i).to_owned();
    let mean = |a: usize, b: usize| (&values.column(a) + &values.column(b)) / 2.0;

    // pelvis, thorax
    let pelvis = mean(11, 12);
    let thorax = mean(5, 6);
    out.column_mut(0).assign(&pelvis);
    out.column_mut(8).assign(&thorax);
    // spine sits between pelvis and thorax
    out.column_mut(7).assign(&((&pelvis + &thorax) / 2.0));
    // nose, head
    out.column_mut(9).assign(&col(0));
    out.column_mut(10).assign(&mean(1, 2));

    let copies: [(usize, usize); 12] = [
        (1, 12),
        (2, 14),
        (3, 16),
        (4, 11),
        (5, 13),
        (6, 15),
        (11, 5),
        (12, 7),
        (13, 9),
        (14, 6),
        (15, 8),
        (16, 10),
    ];
    for (dst, src) in copies {
        out.column_mut(dst).assign(&col(src));
    }
    out
}

/// Convert slot-indexed scores, leaving empty slots empty.
///
/// # Errors
///
/// Propagates converter errors.
pub fn convert_slots(
    converter: &dyn KeypointConverter,
    slots: &[Option<Array1<f32>>],
    source: KeypointDataset,
    target: KeypointDataset,
) -> Result<Vec<Option<Array1<f32>>>> {
    slots
        .iter()
        .map(|slot| {
            slot.as_ref()
                .map(|scores| {
                    let row = scores.view().insert_axis(Axis(0));
                    let converted = converter.convert(row, source, target)?;
                    Ok::<_, RenderError>(converted.row(0).to_owned())
                })
                .transpose()
        })
        .collect()
}
