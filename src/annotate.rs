// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 2D keypoint, skeleton and box overlay.

use std::sync::Arc;

use image::RgbImage;
use ndarray::{Array1, ArrayView1, Axis, s};

use crate::config::{VisualizerConfig, is_empty_slot};
use crate::error::Result;
use crate::instances::{PoseInstances, TrackId, track_for_slot};
use crate::topology::{InstanceKeypoints, SkeletonStyle, to_openpose};
use crate::visualizer::color::Color;
use crate::visualizer::painter::{HAlign, Painter, VAlign, ellipse_polygon};

/// Native 2D scores per instance slot; `None` marks a skipped slot.
pub type SlotScores = Vec<Option<Array1<f32>>>;

/// Semi-minor axis of OpenPose limbs in pixels.
const OPENPOSE_STICK_WIDTH: i32 = 2;

/// Draws detections onto images.
#[derive(Debug, Clone)]
pub struct Annotator {
    config: Arc<VisualizerConfig>,
}

impl Annotator {
    /// Create an annotator sharing `config`.
    #[must_use]
    pub const fn new(config: Arc<VisualizerConfig>) -> Self {
        Self { config }
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    /// Draw keypoints and bones of every tracked instance on a copy of `image`.
    ///
    /// # Arguments
    ///
    /// * `image` - Frame in the configured channel order.
    /// * `instances` - 2D detections; transformed keypoints are used when present.
    /// * `track_ids` - One id per instance, `-1` skips the slot.
    /// * `kpt_thr` - Scores below this value are not drawn.
    /// * `show_kpt_idx` - Label each drawn keypoint with its index.
    /// * `skeleton_style` - `Openpose` remaps COCO detections to 18 keypoints first.
    ///
    /// # Returns
    ///
    /// The annotated copy and the native scores of every slot, aligned with
    /// the instance order.
    ///
    /// # Errors
    ///
    /// Fails when a color list does not match the keypoint or bone count, when
    /// the skeleton references missing keypoints, or when fewer track ids than
    /// instances are supplied.
    pub fn draw_instances_kpts(
        &self,
        image: &RgbImage,
        instances: &PoseInstances,
        track_ids: &[TrackId],
        kpt_thr: f32,
        show_kpt_idx: bool,
        skeleton_style: SkeletonStyle,
    ) -> Result<(RgbImage, SlotScores)> {
        let mut canvas = image.clone();
        let keypoints = instances.image_keypoints();
        let scores = instances.scores();
        let visible = instances.visibility();
        let mut slot_scores = SlotScores::with_capacity(instances.len());

        for i in 0..instances.len() {
            if is_empty_slot(track_for_slot(track_ids, i)?) {
                slot_scores.push(None);
                continue;
            }

            let xy = keypoints.index_axis(Axis(0), i);
            let kpt_scores = scores.row(i);
            let kpt_visible = visible.row(i);
            slot_scores.push(Some(kpt_scores.to_owned()));

            let drawable = match skeleton_style {
                SkeletonStyle::Openpose => to_openpose(xy, kpt_scores, kpt_visible, kpt_thr)?,
                SkeletonStyle::Mmpose => InstanceKeypoints {
                    xy: xy.slice(s![.., ..2]).to_owned(),
                    scores: kpt_scores.to_owned(),
                    visible: kpt_visible.to_owned(),
                },
            };
            self.draw_instance(&mut canvas, &drawable, kpt_thr, show_kpt_idx, skeleton_style)?;
        }

        Ok((canvas, slot_scores))
    }

    fn draw_instance(
        &self,
        canvas: &mut RgbImage,
        kpts: &InstanceKeypoints,
        kpt_thr: f32,
        show_kpt_idx: bool,
        style: SkeletonStyle,
    ) -> Result<()> {
        let cfg = &*self.config;
        let num_kpts = kpts.xy.nrows();
        let kpt_colors = cfg.overlay_kpt_color().resolve(num_kpts, "kpt_color", "keypoints")?;

        let mut painter = Painter::new(canvas, cfg.channel_order);

        for (k, color) in kpt_colors.into_iter().enumerate() {
            let Some(color) = color else { continue };
            let score = kpts.scores[k];
            if score < kpt_thr || kpts.visible[k] == 0.0 {
                continue;
            }
            let alpha = self.weighted_alpha(score);
            let center = (kpts.xy[[k, 0]], kpts.xy[[k, 1]]);
            painter.circle(center, cfg.radius, color, alpha);

            if show_kpt_idx {
                if let Some(font) = &cfg.font {
                    painter.text(
                        &k.to_string(),
                        center,
                        font,
                        cfg.radius * 3.0,
                        color,
                        (HAlign::Center, VAlign::Bottom),
                    );
                }
            }
        }

        // Links are painted over the keypoints.
        if let Some(skeleton) = cfg.overlay_skeleton() {
            skeleton.validate(num_kpts)?;
            let link_colors = cfg.overlay_link_color().resolve(skeleton.len(), "link_color", "skeleton")?;
            for (&[a, b], color) in skeleton.bones().iter().zip(link_colors) {
                if let Some(color) = color {
                    self.draw_bone(&mut painter, kpts, (a, b), color, kpt_thr, style);
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn draw_bone(
        &self,
        painter: &mut Painter<'_>,
        kpts: &InstanceKeypoints,
        (a, b): (usize, usize),
        color: Color,
        kpt_thr: f32,
        style: SkeletonStyle,
    ) {
        let (w, h) = (painter.width() as i32, painter.height() as i32);
        let pos = |k: usize| (kpts.xy[[k, 0]] as i32, kpts.xy[[k, 1]] as i32);
        let (p1, p2) = (pos(a), pos(b));
        let inside = |p: (i32, i32)| p.0 > 0 && p.0 < w && p.1 > 0 && p.1 < h;

        if kpts.visible[a] == 0.0 || kpts.visible[b] == 0.0 {
            return;
        }
        if !inside(p1) || !inside(p2) {
            return;
        }
        let (s1, s2) = (kpts.scores[a], kpts.scores[b]);
        if s1 < kpt_thr || s2 < kpt_thr {
            return;
        }

        let alpha = self.weighted_alpha(0.5 * (s1 + s2));
        match style {
            SkeletonStyle::Mmpose => {
                let to_f = |p: (i32, i32)| (p.0 as f32, p.1 as f32);
                painter.line(to_f(p1), to_f(p2), color, self.config.line_width, alpha);
            }
            SkeletonStyle::Openpose => {
                painter.polygon(&limb_polygon(p1, p2), color, alpha);
            }
        }
    }

    fn weighted_alpha(&self, score: f32) -> f32 {
        if self.config.show_keypoint_weight {
            self.config.alpha * score.clamp(0.0, 1.0)
        } else {
            self.config.alpha
        }
    }

    /// Draw every bounding box of `instances` onto `image`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn draw_instances_bbox(&self, image: &mut RgbImage, instances: &PoseInstances) {
        let Some(bboxes) = instances.bboxes() else {
            return;
        };
        let cfg = &*self.config;
        let thickness = cfg.line_width.round().max(1.0) as i32;
        let mut painter = Painter::new(image, cfg.channel_order);
        for bbox in bboxes.rows() {
            let (x1, y1, x2, y2) = corners(bbox);
            painter.rect((x1, y1), (x2, y2), cfg.bbox_color, thickness, cfg.alpha);
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn corners(bbox: ArrayView1<'_, f32>) -> (i32, i32, i32, i32) {
    (
        bbox[0].round() as i32,
        bbox[1].round() as i32,
        bbox[2].round() as i32,
        bbox[3].round() as i32,
    )
}

/// Filled ellipse along a limb, semi-axes (length / 2, stick width).
#[allow(clippy::cast_possible_truncation)]
fn limb_polygon(p1: (i32, i32), p2: (i32, i32)) -> Vec<(i32, i32)> {
    let (x0, y0) = (f64::from(p1.0), f64::from(p1.1));
    let (x1, y1) = (f64::from(p2.0), f64::from(p2.1));
    let center = (((x0 + x1) / 2.0) as i32, ((y0 + y1) / 2.0) as i32);
    let length = (x0 - x1).hypot(y0 - y1);
    let angle = (y0 - y1).atan2(x0 - x1).to_degrees();
    ellipse_polygon(center, ((length / 2.0) as i32, OPENPOSE_STICK_WIDTH), angle as i32, 1)
}
