// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Per-frame orchestration of the 2D overlay and the 3D plots.

use std::sync::Arc;

use image::RgbImage;

use crate::annotate::{Annotator, SlotScores};
use crate::config::{RenderOptions, VisualizerConfig, index_track_ids};
use crate::error::Result;
use crate::instances::{PoseDataSample, PoseInstances, TrackId, select_instances};
use crate::plot3d::{PlotBackend, RasterBackend};
use crate::pose3d::{Pose3dPlots, Pose3dPlotter};
use crate::topology::{DatasetConverter, KeypointConverter, convert_slots};
use crate::visualizer::font::{DEFAULT_FONT, resolve_font};
use crate::visualizer::painter::ChannelOrder;

/// Outputs of one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedFrame {
    /// RGB overlay, present when 2D drawing was requested and detections exist.
    pub overlay: Option<RgbImage>,
    /// One plot per rendered track plus placeholders.
    pub plots: Pose3dPlots,
}

/// Draws a frame's detections and lifted poses.
///
/// # Example
///
/// ```no_run
/// use pose_render::{Pose3dVisualizer, PoseDataSample, RenderOptions, VisualizerConfig};
///
/// let visualizer = Pose3dVisualizer::new(VisualizerConfig::coco_to_h36m());
/// let image = image::RgbImage::new(640, 480);
/// let frame = visualizer
///     .add_datasample(&image, &PoseDataSample::empty(), None, None, &RenderOptions::default())
///     .unwrap();
/// assert_eq!(frame.plots.len(), 5);
/// ```
pub struct Pose3dVisualizer<B: PlotBackend = RasterBackend> {
    config: Arc<VisualizerConfig>,
    annotator: Annotator,
    plotter: Pose3dPlotter<B>,
    converter: Box<dyn KeypointConverter + Send + Sync>,
}

impl Pose3dVisualizer {
    /// Create a visualizer plotting with the raster backend.
    ///
    /// Without a configured font, [`DEFAULT_FONT`] is resolved first unless
    /// the config opted out with
    /// [`without_font`](VisualizerConfig::without_font).
    #[must_use]
    pub fn new(config: VisualizerConfig) -> Self {
        let config = with_default_font(config);
        let backend = RasterBackend::new(config.font.clone());
        Self::with_backend(config, backend)
    }
}

impl<B: PlotBackend> Pose3dVisualizer<B> {
    /// Create a visualizer plotting through `backend`.
    #[must_use]
    pub fn with_backend(config: VisualizerConfig, backend: B) -> Self {
        let config = Arc::new(with_default_font(config));
        Self {
            annotator: Annotator::new(Arc::clone(&config)),
            plotter: Pose3dPlotter::new(Arc::clone(&config), backend),
            config,
            converter: Box::new(DatasetConverter),
        }
    }

    /// Replace the keypoint converter.
    #[must_use]
    pub fn with_converter(mut self, converter: Box<dyn KeypointConverter + Send + Sync>) -> Self {
        self.converter = converter;
        self
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    /// Render one frame.
    ///
    /// # Arguments
    ///
    /// * `image` - Frame in the configured channel order.
    /// * `data_sample` - 3D poses.
    /// * `det_data_sample` - 2D detections for the overlay and the 3D gate.
    /// * `track_ids` - One id per instance slot; `None` labels slots by index.
    /// * `options` - Per-call settings.
    ///
    /// # Returns
    ///
    /// The RGB overlay (when `options.draw_2d` and detections exist) and
    /// the 3D plots.
    ///
    /// # Errors
    ///
    /// Propagates configuration, shape and conversion errors; no partial
    /// frame is returned.
    pub fn add_datasample(
        &self,
        image: &RgbImage,
        data_sample: &PoseDataSample,
        det_data_sample: Option<&PoseDataSample>,
        track_ids: Option<&[TrackId]>,
        options: &RenderOptions,
    ) -> Result<RenderedFrame> {
        let detections = det_data_sample.and_then(|s| s.pred_instances.as_ref());
        let poses = data_sample.pred_instances.as_ref();
        let index_ids;
        let track_ids = match track_ids {
            Some(ids) => ids,
            None => {
                let slots = detections.map_or(0, PoseInstances::len).max(poses.map_or(0, PoseInstances::len));
                index_ids = index_track_ids(slots);
                &index_ids
            }
        };

        let mut overlay = None;
        let mut scores_2d: Option<SlotScores> = None;
        if let Some(detections) = detections.filter(|_| options.draw_2d) {
            let (mut canvas, scores) = self.annotator.draw_instances_kpts(
                image,
                detections,
                track_ids,
                options.kpt_thr,
                options.show_kpt_idx,
                options.skeleton_style,
            )?;
            if options.draw_bbox {
                self.annotator.draw_instances_bbox(&mut canvas, detections);
            }
            scores_2d = Some(scores);
            overlay = Some(canvas);
        }

        if options.convert_keypoint {
            if let Some(scores) = &scores_2d {
                scores_2d = Some(convert_slots(
                    self.converter.as_ref(),
                    scores,
                    options.dataset_2d,
                    options.dataset_3d,
                )?);
            }
        }

        let selection = select_instances(poses, options.num_instances);
        let plots = self
            .plotter
            .draw_3d_data_samples(&selection, track_ids, scores_2d.as_deref(), options)?;

        if let Some(canvas) = overlay.as_mut() {
            to_rgb_in_place(canvas, self.config.channel_order);
        }

        crate::verbose!(
            "Frame: {} detections, {} poses, {} plots",
            detections.map_or(0, PoseInstances::len),
            selection.len(),
            plots.len()
        );
        Ok(RenderedFrame { overlay, plots })
    }
}

/// Fill in the default font once, warning when it cannot be found.
fn with_default_font(mut config: VisualizerConfig) -> VisualizerConfig {
    if config.font.is_none() && config.load_default_font {
        config.font = resolve_font(None);
        if config.font.is_none() {
            crate::warn!("Font {DEFAULT_FONT} unavailable, plot titles and keypoint labels are drawn without text");
        }
    }
    config.load_default_font = false;
    config
}

/// Reorder channels of `image` from `order` to RGB.
pub fn to_rgb_in_place(image: &mut RgbImage, order: ChannelOrder) {
    if order == ChannelOrder::Bgr {
        for pixel in image.pixels_mut() {
            pixel.0.swap(0, 2);
        }
    }
}
