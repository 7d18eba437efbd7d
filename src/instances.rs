// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Instance containers and instance-count selection.
//!
//! [`PoseInstances`] stores one frame's pose predictions as dense arrays with
//! the instance axis first, the same way detection results are kept:
//! keypoints (N, K, D), scores and visibility (N, K), boxes (N, 4).

use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Axis, s};

use crate::error::{RenderError, Result};

/// Track identifier attached to an instance slot.
pub type TrackId = i32;

/// Track id marking a slot with no subject.
pub const NO_TRACK: TrackId = -1;

/// Pose predictions for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseInstances {
    keypoints: Array3<f32>,
    transformed_keypoints: Option<Array3<f32>>,
    keypoint_scores: Option<Array2<f32>>,
    keypoints_visible: Option<Array2<f32>>,
    bboxes: Option<Array2<f32>>,
}

impl PoseInstances {
    /// Create instances from keypoints shaped (N, K, D) with D >= 2.
    ///
    /// # Errors
    ///
    /// Returns a shape error when D < 2.
    pub fn new(keypoints: Array3<f32>) -> Result<Self> {
        if keypoints.shape()[2] < 2 {
            return Err(RenderError::ShapeError(format!(
                "keypoints need at least 2 coordinates, got shape {:?}",
                keypoints.shape()
            )));
        }
        Ok(Self {
            keypoints,
            transformed_keypoints: None,
            keypoint_scores: None,
            keypoints_visible: None,
            bboxes: None,
        })
    }

    /// Attach per-keypoint scores shaped (N, K).
    ///
    /// # Errors
    ///
    /// Returns a shape error when the shape differs from (N, K).
    pub fn with_scores(mut self, scores: Array2<f32>) -> Result<Self> {
        self.check_nk("keypoint_scores", scores.dim())?;
        self.keypoint_scores = Some(scores);
        Ok(self)
    }

    /// Attach per-keypoint visibility shaped (N, K); non-zero means visible.
    ///
    /// # Errors
    ///
    /// Returns a shape error when the shape differs from (N, K).
    pub fn with_visibility(mut self, visible: Array2<f32>) -> Result<Self> {
        self.check_nk("keypoints_visible", visible.dim())?;
        self.keypoints_visible = Some(visible);
        Ok(self)
    }

    /// Attach bounding boxes shaped (N, 4) as x1, y1, x2, y2.
    ///
    /// # Errors
    ///
    /// Returns a shape error when the shape differs from (N, 4).
    pub fn with_bboxes(mut self, bboxes: Array2<f32>) -> Result<Self> {
        if bboxes.dim() != (self.len(), 4) {
            return Err(RenderError::ShapeError(format!(
                "bboxes must be ({}, 4), got {:?}",
                self.len(),
                bboxes.dim()
            )));
        }
        self.bboxes = Some(bboxes);
        Ok(self)
    }

    /// Attach image-space keypoints that the 2D renderer prefers over the raw ones.
    ///
    /// # Errors
    ///
    /// Returns a shape error when the shape differs from the keypoints.
    pub fn with_transformed_keypoints(mut self, keypoints: Array3<f32>) -> Result<Self> {
        if keypoints.shape()[..2] != self.keypoints.shape()[..2] || keypoints.shape()[2] < 2 {
            return Err(RenderError::ShapeError(format!(
                "transformed_keypoints {:?} do not match keypoints {:?}",
                keypoints.shape(),
                self.keypoints.shape()
            )));
        }
        self.transformed_keypoints = Some(keypoints);
        Ok(self)
    }

    fn check_nk(&self, name: &str, dim: (usize, usize)) -> Result<()> {
        let expected = (self.len(), self.num_keypoints());
        if dim == expected {
            Ok(())
        } else {
            Err(RenderError::ShapeError(format!(
                "{name} must be {expected:?}, got {dim:?}"
            )))
        }
    }

    /// Number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keypoints.shape()[0]
    }

    /// Check if there are no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keypoints per instance.
    #[must_use]
    pub fn num_keypoints(&self) -> usize {
        self.keypoints.shape()[1]
    }

    /// Coordinates per keypoint.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.keypoints.shape()[2]
    }

    /// Raw keypoints (N, K, D).
    #[must_use]
    pub const fn keypoints(&self) -> &Array3<f32> {
        &self.keypoints
    }

    /// Keypoints used for image drawing: transformed when present.
    #[must_use]
    pub fn image_keypoints(&self) -> &Array3<f32> {
        self.transformed_keypoints.as_ref().unwrap_or(&self.keypoints)
    }

    /// Bounding boxes, when present.
    #[must_use]
    pub const fn bboxes(&self) -> Option<&Array2<f32>> {
        self.bboxes.as_ref()
    }

    /// Per-keypoint scores, defaulting to ones.
    #[must_use]
    pub fn scores(&self) -> Array2<f32> {
        self.keypoint_scores
            .clone()
            .unwrap_or_else(|| Array2::ones((self.len(), self.num_keypoints())))
    }

    /// Per-keypoint visibility, defaulting to ones.
    #[must_use]
    pub fn visibility(&self) -> Array2<f32> {
        self.keypoints_visible
            .clone()
            .unwrap_or_else(|| Array2::ones((self.len(), self.num_keypoints())))
    }

    /// Keypoints of instance `idx`, shape (K, D).
    #[must_use]
    pub fn instance(&self, idx: usize) -> ArrayView2<'_, f32> {
        self.keypoints.index_axis(Axis(0), idx)
    }

    /// Keep the first `n` instances of every per-instance array.
    #[must_use]
    pub fn truncate(&self, n: usize) -> Self {
        let n = n.min(self.len());
        Self {
            keypoints: self.keypoints.slice(s![..n, .., ..]).to_owned(),
            transformed_keypoints: self
                .transformed_keypoints
                .as_ref()
                .map(|k| k.slice(s![..n, .., ..]).to_owned()),
            keypoint_scores: self
                .keypoint_scores
                .as_ref()
                .map(|a| a.slice(s![..n, ..]).to_owned()),
            keypoints_visible: self
                .keypoints_visible
                .as_ref()
                .map(|a| a.slice(s![..n, ..]).to_owned()),
            bboxes: self.bboxes.as_ref().map(|a| a.slice(s![..n, ..]).to_owned()),
        }
    }
}

/// One frame's predictions; a sample without instances renders nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseDataSample {
    /// Predicted instances, if any.
    pub pred_instances: Option<PoseInstances>,
}

impl PoseDataSample {
    /// Wrap predicted instances.
    #[must_use]
    pub const fn new(pred_instances: PoseInstances) -> Self {
        Self {
            pred_instances: Some(pred_instances),
        }
    }

    /// A sample without predictions.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            pred_instances: None,
        }
    }
}

/// Result of fixing the instance count.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSelection {
    /// Kept instances, `None` when the sample had no keypoints.
    pub instances: Option<PoseInstances>,
    /// Number of slots the caller asked for.
    pub requested: usize,
    /// Missing slots when padding is needed, `None` when no padding applies.
    pub padding: Option<usize>,
}

impl InstanceSelection {
    /// Number of kept instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.as_ref().map_or(0, PoseInstances::len)
    }

    /// Whether no instance was kept.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether placeholder plots should fill missing slots.
    #[must_use]
    pub const fn needs_padding(&self) -> bool {
        self.padding.is_some()
    }

    /// Missing slots, zero when no padding applies.
    #[must_use]
    pub fn deficit(&self) -> usize {
        self.padding.unwrap_or(0)
    }
}

/// Fix the instance count to `num_instances`.
///
/// - `None`: keep everything, no padding.
/// - more instances than requested: keep the first `n` in order, no padding.
/// - otherwise keep everything and flag `n - len` missing slots.
#[must_use]
pub fn select_instances(instances: Option<&PoseInstances>, num_instances: Option<usize>) -> InstanceSelection {
    let available = instances.map_or(0, PoseInstances::len);
    match num_instances {
        None => InstanceSelection {
            instances: instances.cloned(),
            requested: available,
            padding: None,
        },
        Some(n) if available > n => InstanceSelection {
            instances: instances.map(|i| i.truncate(n)),
            requested: n,
            padding: None,
        },
        Some(n) => InstanceSelection {
            instances: instances.cloned(),
            requested: n,
            padding: Some(n - available),
        },
    }
}

/// Track id for `slot`, or a shape error when the caller supplied too few.
///
/// # Errors
///
/// Returns a shape error when `track_ids` has no entry for `slot`.
pub fn track_for_slot(track_ids: &[TrackId], slot: usize) -> Result<TrackId> {
    track_ids.get(slot).copied().ok_or_else(|| {
        RenderError::ShapeError(format!(
            "no track id for instance slot {slot} ({} track ids supplied)",
            track_ids.len()
        ))
    })
}

/// Arithmetic mean, `None` for empty input.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: ArrayView1<'_, f32>) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.sum() / values.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, Array1};

    fn instances(n: usize) -> PoseInstances {
        let kpts = Array::from_shape_fn((n, 17, 3), |(i, k, c)| (i * 1000 + k * 10 + c) as f32);
        PoseInstances::new(kpts).unwrap()
    }

    #[test]
    fn test_select_truncates_in_order() {
        let inst = instances(8);
        let sel = select_instances(Some(&inst), Some(5));
        assert_eq!(sel.len(), 5);
        assert!(!sel.needs_padding());
        assert_eq!(sel.deficit(), 0);
        let kept = sel.instances.unwrap();
        assert_eq!(kept.keypoints()[[4, 0, 0]], 4000.0);
    }

    #[test]
    fn test_select_flags_padding() {
        let inst = instances(3);
        let sel = select_instances(Some(&inst), Some(5));
        assert_eq!(sel.len(), 3);
        assert!(sel.needs_padding());
        assert_eq!(sel.deficit(), 2);
        assert_eq!(sel.requested, 5);
    }

    #[test]
    fn test_select_exact_count_pads_zero() {
        let inst = instances(5);
        let sel = select_instances(Some(&inst), Some(5));
        assert_eq!(sel.padding, Some(0));
    }

    #[test]
    fn test_select_all() {
        let inst = instances(4);
        let sel = select_instances(Some(&inst), None);
        assert_eq!(sel.len(), 4);
        assert_eq!(sel.requested, 4);
        assert!(!sel.needs_padding());

        let none = select_instances(None, None);
        assert_eq!(none.requested, 0);
        assert!(none.is_empty());
    }

    #[test]
    fn test_select_without_data_pads_everything() {
        let sel = select_instances(None, Some(3));
        assert_eq!(sel.deficit(), 3);
    }

    #[test]
    fn test_truncate_keeps_optional_arrays_aligned() {
        let inst = instances(4)
            .with_scores(Array2::from_elem((4, 17), 0.5))
            .unwrap()
            .with_bboxes(Array2::zeros((4, 4)))
            .unwrap();
        let cut = inst.truncate(2);
        assert_eq!(cut.len(), 2);
        assert_eq!(cut.scores().dim(), (2, 17));
        assert_eq!(cut.bboxes().unwrap().dim(), (2, 4));
    }

    #[test]
    fn test_shape_validation() {
        let inst = instances(2);
        assert!(inst.clone().with_scores(Array2::zeros((2, 5))).is_err());
        assert!(inst.clone().with_visibility(Array2::zeros((3, 17))).is_err());
        assert!(inst.with_bboxes(Array2::zeros((2, 5))).is_err());
        assert!(PoseInstances::new(Array3::zeros((1, 17, 1))).is_err());
    }

    #[test]
    fn test_defaults_to_ones() {
        let inst = instances(2);
        assert!(inst.scores().iter().all(|&v| v == 1.0));
        assert!(inst.visibility().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_track_for_slot() {
        assert_eq!(track_for_slot(&[3, 4], 1).unwrap(), 4);
        assert!(track_for_slot(&[3], 1).is_err());
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(Array1::from(vec![1.0, 3.0]).view()), Some(2.0));
        assert_eq!(mean(Array1::<f32>::zeros(0).view()), None);
    }
}
