// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use crate::error::{RenderError, Result};
use crate::visualizer::color::{Color, ColorSpec};

/// COCO-Pose dataset skeleton structure (pairs of keypoint indices)
/// Defines which keypoints connect to form the pose skeleton
pub const COCO_SKELETON: [[usize; 2]; 19] = [
    [15, 13], // left ankle to left knee
    [13, 11], // left knee to left hip
    [16, 14], // right ankle to right knee
    [14, 12], // right knee to right hip
    [11, 12], // left hip to right hip
    [5, 11],  // left shoulder to left hip
    [6, 12],  // right shoulder to right hip
    [5, 6],   // left shoulder to right shoulder
    [5, 7],   // left shoulder to left elbow
    [6, 8],   // right shoulder to right elbow
    [7, 9],   // left elbow to left wrist
    [8, 10],  // right elbow to right wrist
    [1, 2],   // left eye to right eye
    [0, 1],   // nose to left eye
    [0, 2],   // nose to right eye
    [1, 3],   // left eye to left ear
    [2, 4],   // right eye to right ear
    [3, 5],   // left ear to left shoulder
    [4, 6],   // right ear to right shoulder
];

/// Limb color indices mapping to `POSE_COLORS`
/// Mapping: legs=orange, torso=magenta, arms=blue, face=green
pub const COCO_LIMB_COLOR_INDICES: [usize; 19] = [
    0, 0, 0, 0, 7, 7, 7, 9, 9, 9, 9, 9, 16, 16, 16, 16, 16, 16, 16,
];

/// Keypoint color indices mapping to `POSE_COLORS`
pub const COCO_KPT_COLOR_INDICES: [usize; 17] = [16, 16, 16, 16, 16, 9, 9, 9, 9, 9, 9, 0, 0, 0, 0, 0, 0];

/// Human3.6M skeleton.
///
/// Keypoints: 0 pelvis, 1-3 right leg, 4-6 left leg, 7 spine, 8 thorax,
/// 9 neck/nose, 10 head, 11-13 left arm, 14-16 right arm.
pub const H36M_SKELETON: [[usize; 2]; 16] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [0, 4],
    [4, 5],
    [5, 6],
    [0, 7],
    [7, 8],
    [8, 9],
    [9, 10],
    [8, 11],
    [11, 12],
    [12, 13],
    [8, 14],
    [14, 15],
    [15, 16],
];

/// Human3.6M limb colors: right side orange, left side green, spine blue.
pub const H36M_LIMB_COLOR_INDICES: [usize; 16] = [0, 0, 0, 16, 16, 16, 9, 9, 9, 9, 16, 16, 16, 0, 0, 0];

/// Human3.6M keypoint colors.
pub const H36M_KPT_COLOR_INDICES: [usize; 17] = [9, 0, 0, 0, 16, 16, 16, 9, 9, 9, 9, 16, 16, 16, 0, 0, 0];

/// OpenPose (18 keypoint) skeleton, used with the `openpose` skeleton style.
///
/// Keypoints: 0 nose, 1 neck, 2-4 right arm, 5-7 left arm, 8-10 right leg,
/// 11-13 left leg, 14 right eye, 15 left eye, 16 right ear, 17 left ear.
pub const OPENPOSE_SKELETON: [[usize; 2]; 17] = [
    [1, 2],
    [1, 5],
    [2, 3],
    [3, 4],
    [5, 6],
    [6, 7],
    [1, 8],
    [8, 9],
    [9, 10],
    [1, 11],
    [11, 12],
    [12, 13],
    [1, 0],
    [0, 14],
    [14, 16],
    [0, 15],
    [15, 17],
];

/// OpenPose rainbow palette, one entry per keypoint.
pub const OPENPOSE_COLORS: [[u8; 3]; 18] = [
    [255, 0, 0],
    [255, 85, 0],
    [255, 170, 0],
    [255, 255, 0],
    [170, 255, 0],
    [85, 255, 0],
    [0, 255, 0],
    [0, 255, 85],
    [0, 255, 170],
    [0, 255, 255],
    [0, 170, 255],
    [0, 85, 255],
    [0, 0, 255],
    [85, 0, 255],
    [170, 0, 255],
    [255, 0, 255],
    [255, 0, 170],
    [255, 0, 85],
];

/// Ordered bone list over a keypoint sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Skeleton {
    bones: Vec<[usize; 2]>,
}

impl Skeleton {
    /// Create a skeleton from bone pairs.
    #[must_use]
    pub fn new(bones: impl Into<Vec<[usize; 2]>>) -> Self {
        Self {
            bones: bones.into(),
        }
    }

    /// COCO 17 keypoint skeleton.
    #[must_use]
    pub fn coco() -> Self {
        Self::new(COCO_SKELETON)
    }

    /// Human3.6M 17 keypoint skeleton.
    #[must_use]
    pub fn h36m() -> Self {
        Self::new(H36M_SKELETON)
    }

    /// OpenPose 18 keypoint skeleton.
    #[must_use]
    pub fn openpose() -> Self {
        Self::new(OPENPOSE_SKELETON)
    }

    /// Bone pairs.
    #[must_use]
    pub fn bones(&self) -> &[[usize; 2]] {
        &self.bones
    }

    /// Number of bones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    /// Whether the skeleton has no bones.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Check every bone index against the keypoint count.
    ///
    /// # Errors
    ///
    /// Returns a config error naming the first bone that references a
    /// keypoint outside `0..num_keypoints`.
    pub fn validate(&self, num_keypoints: usize) -> Result<()> {
        match self
            .bones
            .iter()
            .enumerate()
            .find(|(_, [a, b])| *a >= num_keypoints || *b >= num_keypoints)
        {
            Some((id, bone)) => Err(RenderError::ConfigError(format!(
                "skeleton bone {id} {bone:?} references a keypoint outside 0..{num_keypoints}"
            ))),
            None => Ok(()),
        }
    }
}

/// Keypoint colors for COCO.
#[must_use]
pub fn coco_kpt_colors() -> ColorSpec {
    ColorSpec::from_pose_indices(&COCO_KPT_COLOR_INDICES)
}

/// Limb colors for COCO.
#[must_use]
pub fn coco_link_colors() -> ColorSpec {
    ColorSpec::from_pose_indices(&COCO_LIMB_COLOR_INDICES)
}

/// Keypoint colors for Human3.6M.
#[must_use]
pub fn h36m_kpt_colors() -> ColorSpec {
    ColorSpec::from_pose_indices(&H36M_KPT_COLOR_INDICES)
}

/// Limb colors for Human3.6M.
#[must_use]
pub fn h36m_link_colors() -> ColorSpec {
    ColorSpec::from_pose_indices(&H36M_LIMB_COLOR_INDICES)
}

/// Keypoint colors for OpenPose.
#[must_use]
pub fn openpose_kpt_colors() -> ColorSpec {
    ColorSpec::PerItem(
        OPENPOSE_COLORS
            .iter()
            .map(|c| Some(Color(c[0], c[1], c[2])))
            .collect(),
    )
}

/// Limb colors for OpenPose, each limb takes the color of its index.
#[must_use]
pub fn openpose_link_colors() -> ColorSpec {
    ColorSpec::PerItem(
        OPENPOSE_COLORS[..OPENPOSE_SKELETON.len()]
            .iter()
            .map(|c| Some(Color(c[0], c[1], c[2])))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(Skeleton::coco().validate(17).is_ok());
        assert!(Skeleton::h36m().validate(17).is_ok());
        assert!(Skeleton::openpose().validate(18).is_ok());
        assert!(Skeleton::openpose().validate(17).is_err());
    }

    #[test]
    fn test_preset_color_counts() {
        assert!(coco_kpt_colors().resolve(17, "kpt_color", "keypoints").is_ok());
        assert!(coco_link_colors().resolve(COCO_SKELETON.len(), "link_color", "skeleton").is_ok());
        assert!(h36m_kpt_colors().resolve(17, "kpt_color", "keypoints").is_ok());
        assert!(h36m_link_colors().resolve(H36M_SKELETON.len(), "link_color", "skeleton").is_ok());
        assert!(openpose_kpt_colors().resolve(18, "kpt_color", "keypoints").is_ok());
        assert!(openpose_link_colors().resolve(17, "link_color", "skeleton").is_ok());
    }

    #[test]
    fn test_validate_reports_bone() {
        let skeleton = Skeleton::new(vec![[0, 1], [1, 5]]);
        let err = skeleton.validate(3).unwrap_err();
        assert!(err.to_string().contains("bone 1"));
    }
}
