// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Visualizer construction settings and per-call render options.

use ab_glyph::FontArc;

use crate::instances::NO_TRACK;
use crate::topology::{KeypointDataset, SkeletonStyle};
use crate::visualizer::color::{Color, ColorSpec};
use crate::visualizer::painter::ChannelOrder;
use crate::visualizer::skeleton::{self, Skeleton};

/// Settings fixed when a visualizer is built.
///
/// Colors apply to the 3D plots; the `det_*` overrides, when set, replace
/// them for the 2D overlay so detections and lifted poses can use different
/// topologies.
#[derive(Clone)]
pub struct VisualizerConfig {
    /// Bounding box color.
    pub bbox_color: Color,
    /// Keypoint colors.
    pub kpt_color: ColorSpec,
    /// Bone colors.
    pub link_color: ColorSpec,
    /// Text color of 3D plot titles.
    pub text_color: Color,
    /// Bones over the 3D keypoints.
    pub skeleton: Option<Skeleton>,
    /// Stroke width in pixels.
    pub line_width: f32,
    /// Keypoint radius in pixels.
    pub radius: f32,
    /// Scale drawing alpha by keypoint confidence.
    pub show_keypoint_weight: bool,
    /// Base drawing alpha.
    pub alpha: f32,
    /// Keypoint colors for the 2D overlay.
    pub det_kpt_color: Option<ColorSpec>,
    /// Bones for the 2D overlay.
    pub det_skeleton: Option<Skeleton>,
    /// Bone colors for the 2D overlay.
    pub det_link_color: Option<ColorSpec>,
    /// Font for labels and titles; text is skipped without one.
    pub font: Option<FontArc>,
    /// Resolve [`DEFAULT_FONT`](crate::visualizer::font::DEFAULT_FONT) when
    /// `font` is unset and a visualizer is built.
    pub load_default_font: bool,
    /// Channel layout of input frames.
    pub channel_order: ChannelOrder,
}

impl std::fmt::Debug for VisualizerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualizerConfig")
            .field("bbox_color", &self.bbox_color)
            .field("kpt_color", &self.kpt_color)
            .field("link_color", &self.link_color)
            .field("skeleton", &self.skeleton)
            .field("line_width", &self.line_width)
            .field("radius", &self.radius)
            .field("alpha", &self.alpha)
            .field("font", &self.font.is_some())
            .field("load_default_font", &self.load_default_font)
            .field("channel_order", &self.channel_order)
            .finish_non_exhaustive()
    }
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            bbox_color: Color::GREEN,
            kpt_color: ColorSpec::Uniform(Color::RED),
            link_color: ColorSpec::Unset,
            text_color: Color::WHITE,
            skeleton: None,
            line_width: 1.0,
            radius: 3.0,
            show_keypoint_weight: false,
            alpha: 0.8,
            det_kpt_color: None,
            det_skeleton: None,
            det_link_color: None,
            font: None,
            load_default_font: true,
            channel_order: ChannelOrder::Bgr,
        }
    }
}

impl VisualizerConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// COCO detections on the overlay, Human3.6M poses in the plots.
    #[must_use]
    pub fn coco_to_h36m() -> Self {
        Self::default()
            .with_skeleton(Skeleton::h36m())
            .with_kpt_color(skeleton::h36m_kpt_colors())
            .with_link_color(skeleton::h36m_link_colors())
            .with_det_skeleton(Skeleton::coco())
            .with_det_kpt_color(skeleton::coco_kpt_colors())
            .with_det_link_color(skeleton::coco_link_colors())
    }

    /// COCO everywhere.
    #[must_use]
    pub fn coco() -> Self {
        Self::default()
            .with_skeleton(Skeleton::coco())
            .with_kpt_color(skeleton::coco_kpt_colors())
            .with_link_color(skeleton::coco_link_colors())
    }

    /// OpenPose overlay style over COCO detections.
    ///
    /// The 2D renderer remaps detections to 18 keypoints, so the overlay uses
    /// the OpenPose skeleton and palette.
    #[must_use]
    pub fn openpose() -> Self {
        Self::coco_to_h36m()
            .with_det_skeleton(Skeleton::openpose())
            .with_det_kpt_color(skeleton::openpose_kpt_colors())
            .with_det_link_color(skeleton::openpose_link_colors())
    }

    /// Set the bounding box color.
    #[must_use]
    pub const fn with_bbox_color(mut self, color: Color) -> Self {
        self.bbox_color = color;
        self
    }

    /// Set the keypoint colors.
    #[must_use]
    pub fn with_kpt_color(mut self, color: impl Into<ColorSpec>) -> Self {
        self.kpt_color = color.into();
        self
    }

    /// Set the bone colors.
    #[must_use]
    pub fn with_link_color(mut self, color: impl Into<ColorSpec>) -> Self {
        self.link_color = color.into();
        self
    }

    /// Set the label color.
    #[must_use]
    pub const fn with_text_color(mut self, color: Color) -> Self {
        self.text_color = color;
        self
    }

    /// Set the skeleton.
    #[must_use]
    pub fn with_skeleton(mut self, skeleton: Skeleton) -> Self {
        self.skeleton = Some(skeleton);
        self
    }

    /// Set the stroke width.
    #[must_use]
    pub const fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self
    }

    /// Set the keypoint radius.
    #[must_use]
    pub const fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Scale alpha by keypoint confidence.
    #[must_use]
    pub const fn with_keypoint_weight(mut self, show: bool) -> Self {
        self.show_keypoint_weight = show;
        self
    }

    /// Set the base alpha.
    #[must_use]
    pub const fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Override keypoint colors on the overlay.
    #[must_use]
    pub fn with_det_kpt_color(mut self, color: impl Into<ColorSpec>) -> Self {
        self.det_kpt_color = Some(color.into());
        self
    }

    /// Override the skeleton on the overlay.
    #[must_use]
    pub fn with_det_skeleton(mut self, skeleton: Skeleton) -> Self {
        self.det_skeleton = Some(skeleton);
        self
    }

    /// Override bone colors on the overlay.
    #[must_use]
    pub fn with_det_link_color(mut self, color: impl Into<ColorSpec>) -> Self {
        self.det_link_color = Some(color.into());
        self
    }

    /// Set the font.
    #[must_use]
    pub fn with_font(mut self, font: Option<FontArc>) -> Self {
        self.font = font;
        self
    }

    /// Render without text and never look up the default font.
    #[must_use]
    pub fn without_font(mut self) -> Self {
        self.font = None;
        self.load_default_font = false;
        self
    }

    /// Set the input channel layout.
    #[must_use]
    pub const fn with_channel_order(mut self, order: ChannelOrder) -> Self {
        self.channel_order = order;
        self
    }

    /// Keypoint colors used on the overlay.
    #[must_use]
    pub fn overlay_kpt_color(&self) -> &ColorSpec {
        self.det_kpt_color.as_ref().unwrap_or(&self.kpt_color)
    }

    /// Skeleton used on the overlay.
    #[must_use]
    pub fn overlay_skeleton(&self) -> Option<&Skeleton> {
        self.det_skeleton.as_ref().or(self.skeleton.as_ref())
    }

    /// Bone colors used on the overlay.
    #[must_use]
    pub fn overlay_link_color(&self) -> &ColorSpec {
        self.det_link_color.as_ref().unwrap_or(&self.link_color)
    }
}

/// Options for one rendering call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Draw the 2D overlay.
    pub draw_2d: bool,
    /// Draw detection boxes on the overlay.
    pub draw_bbox: bool,
    /// Label keypoints with their index.
    pub show_kpt_idx: bool,
    /// Overlay skeleton style.
    pub skeleton_style: SkeletonStyle,
    /// Topology of the 2D detections.
    pub dataset_2d: KeypointDataset,
    /// Topology of the 3D poses.
    pub dataset_3d: KeypointDataset,
    /// Convert 2D scores into the 3D topology before gating.
    pub convert_keypoint: bool,
    /// Camera azimuth in degrees.
    pub axis_azimuth: f32,
    /// Full axis extent around the pose center.
    pub axis_limit: f32,
    /// Camera distance.
    pub axis_dist: f32,
    /// Camera elevation in degrees.
    pub axis_elev: f32,
    /// Number of 3D plot slots; `None` keeps every instance.
    pub num_instances: Option<usize>,
    /// Side of each 3D plot in pixels.
    pub plot_size: u32,
    /// Keypoint confidence threshold; scores below it are skipped.
    pub kpt_thr: f32,
    /// 3D plot title prefix.
    pub title: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            draw_2d: true,
            draw_bbox: false,
            show_kpt_idx: false,
            skeleton_style: SkeletonStyle::Mmpose,
            dataset_2d: KeypointDataset::Coco,
            dataset_3d: KeypointDataset::H36m,
            convert_keypoint: true,
            axis_azimuth: 70.0,
            axis_limit: 1.7,
            axis_dist: 10.0,
            axis_elev: 15.0,
            num_instances: Some(5),
            plot_size: 300,
            kpt_thr: 0.3,
            title: "Track id".to_string(),
        }
    }
}

impl RenderOptions {
    /// Create options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the 2D overlay.
    #[must_use]
    pub const fn with_draw_2d(mut self, draw: bool) -> Self {
        self.draw_2d = draw;
        self
    }

    /// Toggle detection boxes.
    #[must_use]
    pub const fn with_draw_bbox(mut self, draw: bool) -> Self {
        self.draw_bbox = draw;
        self
    }

    /// Toggle keypoint index labels.
    #[must_use]
    pub const fn with_kpt_idx(mut self, show: bool) -> Self {
        self.show_kpt_idx = show;
        self
    }

    /// Set the overlay skeleton style.
    #[must_use]
    pub const fn with_skeleton_style(mut self, style: SkeletonStyle) -> Self {
        self.skeleton_style = style;
        self
    }

    /// Set both keypoint topologies.
    #[must_use]
    pub const fn with_datasets(mut self, dataset_2d: KeypointDataset, dataset_3d: KeypointDataset) -> Self {
        self.dataset_2d = dataset_2d;
        self.dataset_3d = dataset_3d;
        self
    }

    /// Toggle score conversion.
    #[must_use]
    pub const fn with_convert(mut self, convert: bool) -> Self {
        self.convert_keypoint = convert;
        self
    }

    /// Set the camera azimuth and elevation in degrees.
    #[must_use]
    pub const fn with_view(mut self, azimuth: f32, elevation: f32) -> Self {
        self.axis_azimuth = azimuth;
        self.axis_elev = elevation;
        self
    }

    /// Set the axis extent.
    #[must_use]
    pub const fn with_axis_limit(mut self, limit: f32) -> Self {
        self.axis_limit = limit;
        self
    }

    /// Set the camera distance.
    #[must_use]
    pub const fn with_axis_dist(mut self, dist: f32) -> Self {
        self.axis_dist = dist;
        self
    }

    /// Set the number of 3D plot slots.
    #[must_use]
    pub const fn with_num_instances(mut self, num: Option<usize>) -> Self {
        self.num_instances = num;
        self
    }

    /// Set the plot side length.
    #[must_use]
    pub const fn with_plot_size(mut self, size: u32) -> Self {
        self.plot_size = size;
        self
    }

    /// Set the keypoint threshold.
    #[must_use]
    pub const fn with_kpt_thr(mut self, thr: f32) -> Self {
        self.kpt_thr = thr;
        self
    }

    /// Set the plot title prefix.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Slot labels when the caller passes no track ids.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn index_track_ids(count: usize) -> Vec<i32> {
    (0..count).map(|i| i as i32).collect()
}

/// Whether `track_id` marks an empty slot.
#[must_use]
pub const fn is_empty_slot(track_id: i32) -> bool {
    track_id == NO_TRACK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_defaults() {
        let opts = RenderOptions::default();
        assert!(opts.draw_2d);
        assert!(!opts.draw_bbox);
        assert_eq!(opts.axis_azimuth, 70.0);
        assert_eq!(opts.axis_elev, 15.0);
        assert_eq!(opts.axis_dist, 10.0);
        assert_eq!(opts.axis_limit, 1.7);
        assert_eq!(opts.num_instances, Some(5));
        assert_eq!(opts.plot_size, 300);
        assert_eq!(opts.kpt_thr, 0.3);
        assert_eq!(opts.title, "Track id");
    }

    #[test]
    fn test_render_options_builder() {
        let opts = RenderOptions::new()
            .with_kpt_thr(0.5)
            .with_num_instances(None)
            .with_view(30.0, 45.0)
            .with_title("Person");
        assert_eq!(opts.kpt_thr, 0.5);
        assert_eq!(opts.num_instances, None);
        assert_eq!(opts.axis_azimuth, 30.0);
        assert_eq!(opts.axis_elev, 45.0);
        assert_eq!(opts.title, "Person");
    }

    #[test]
    fn test_overlay_overrides() {
        let cfg = VisualizerConfig::coco_to_h36m();
        assert_eq!(cfg.overlay_skeleton(), Some(&Skeleton::coco()));
        assert_eq!(cfg.skeleton, Some(Skeleton::h36m()));
        assert_eq!(cfg.overlay_kpt_color(), &skeleton::coco_kpt_colors());

        let plain = VisualizerConfig::default();
        assert!(plain.overlay_skeleton().is_none());
        assert_eq!(plain.overlay_kpt_color(), &ColorSpec::Uniform(Color::RED));
    }

    #[test]
    fn test_font_defaults() {
        let cfg = VisualizerConfig::default();
        assert!(cfg.font.is_none());
        assert!(cfg.load_default_font);
        assert_eq!(cfg.text_color, Color::WHITE);
        assert!(!cfg.without_font().load_default_font);
    }

    #[test]
    fn test_index_track_ids() {
        assert_eq!(index_track_ids(3), vec![0, 1, 2]);
        assert!(is_empty_slot(-1));
        assert!(!is_empty_slot(0));
    }
}
