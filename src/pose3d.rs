// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Per-track 3D pose plots.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use image::{Rgb, RgbImage};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::config::{RenderOptions, VisualizerConfig, is_empty_slot};
use crate::error::{RenderError, Result};
use crate::instances::{InstanceSelection, TrackId, mean, track_for_slot};
use crate::plot3d::{PlotBackend, PlotSurface3d, RasterBackend};
use crate::visualizer::color::{Color, color_for_track};

/// Title of plots standing in for missing subjects.
pub const PLACEHOLDER_TITLE: &str = "NO DATA";

/// First synthetic id handed to placeholders; later ones count down.
pub const FIRST_PLACEHOLDER_ID: i32 = -2;

const PLACEHOLDER_TEXT: Color = Color(64, 64, 64);
const LABEL_COLOR: Color = Color::BLACK;

/// Key of one 3D plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlotKey {
    /// Plot of a tracked subject.
    Track(TrackId),
    /// Empty plot filling a missing slot, keyed by a synthetic negative id.
    Placeholder(i32),
}

impl PlotKey {
    /// Integer id of the plot.
    #[must_use]
    pub const fn id(self) -> i32 {
        match self {
            Self::Track(id) | Self::Placeholder(id) => id,
        }
    }

    /// Whether this is a placeholder.
    #[must_use]
    pub const fn is_placeholder(self) -> bool {
        matches!(self, Self::Placeholder(_))
    }
}

impl fmt::Display for PlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Track(id) => write!(f, "track {id}"),
            Self::Placeholder(id) => write!(f, "placeholder {id}"),
        }
    }
}

/// Lifecycle of one plot slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotPhase {
    /// Surface acquired, nothing drawn.
    Pending,
    /// Geometry drawn.
    Rendered,
    /// Confidence too low; only the frame and title were drawn.
    SkippedLowConfidence,
    /// Pixels copied out of the surface.
    Captured,
    /// Surface dropped.
    Released,
}

impl PlotPhase {
    /// Whether `next` may follow this phase.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Rendered | Self::SkippedLowConfidence)
                | (Self::Rendered | Self::SkippedLowConfidence, Self::Captured)
                | (Self::Captured, Self::Released)
        )
    }

    fn advance(&mut self, next: Self) -> Result<()> {
        if self.can_advance_to(next) {
            *self = next;
            Ok(())
        } else {
            Err(RenderError::ConfigError(format!(
                "invalid plot transition {self:?} -> {next:?}"
            )))
        }
    }
}

/// One finished plot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotEntry {
    /// Plot key.
    pub key: PlotKey,
    /// RGB pixels, `plot_size` square.
    pub image: RgbImage,
    /// Whether pose geometry was drawn.
    pub has_geometry: bool,
}

/// Ordered collection of 3D plots, at most one per id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pose3dPlots {
    entries: Vec<PlotEntry>,
}

impl Pose3dPlots {
    /// Empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Insert a plot; an existing plot with the same id is replaced in place.
    pub fn insert(&mut self, entry: PlotEntry) {
        let id = entry.key.id();
        match self.entries.iter_mut().find(|e| e.key.id() == id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Plot for `id`, tracked or placeholder.
    #[must_use]
    pub fn get(&self, id: i32) -> Option<&RgbImage> {
        self.entry(id).map(|e| &e.image)
    }

    /// Full entry for `id`.
    #[must_use]
    pub fn entry(&self, id: i32) -> Option<&PlotEntry> {
        self.entries.iter().find(|e| e.key.id() == id)
    }

    /// Whether `id` is taken.
    #[must_use]
    pub fn contains(&self, id: i32) -> bool {
        self.entry(id).is_some()
    }

    /// Number of plots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no plots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plots in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &PlotEntry> {
        self.entries.iter()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = PlotKey> + '_ {
        self.entries.iter().map(|e| e.key)
    }

    /// Number of placeholder plots.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.keys().filter(|k| k.is_placeholder()).count()
    }

    /// Images keyed by id.
    #[must_use]
    pub fn into_map(self) -> BTreeMap<i32, RgbImage> {
        self.entries.into_iter().map(|e| (e.key.id(), e.image)).collect()
    }

    /// Next free synthetic id at or below `from`.
    fn next_placeholder_id(&self, from: i32) -> i32 {
        let mut id = from;
        while self.contains(id) {
            id -= 1;
        }
        id
    }
}

impl IntoIterator for Pose3dPlots {
    type Item = PlotEntry;
    type IntoIter = std::vec::IntoIter<PlotEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// One slot moving through [`PlotPhase`].
struct PlotSlot<S: PlotSurface3d> {
    key: PlotKey,
    phase: PlotPhase,
    surface: Option<S>,
    image: Option<RgbImage>,
}

impl<S: PlotSurface3d> PlotSlot<S> {
    fn new(key: PlotKey, surface: S) -> Self {
        Self {
            key,
            phase: PlotPhase::Pending,
            surface: Some(surface),
            image: None,
        }
    }

    fn surface(&mut self) -> Result<&mut S> {
        self.surface
            .as_mut()
            .ok_or_else(|| RenderError::ConfigError(format!("{} has no surface in phase {:?}", self.key, self.phase)))
    }

    fn finish(&mut self, phase: PlotPhase) -> Result<()> {
        self.surface()?.draw();
        self.phase.advance(phase)
    }

    fn capture(&mut self, plot_size: u32) -> Result<()> {
        let surface = self
            .surface
            .take()
            .ok_or_else(|| RenderError::ConfigError(format!("{} captured twice", self.key)))?;
        self.image = Some(sanitize_capture(surface.capture(), plot_size, self.key));
        self.phase.advance(PlotPhase::Captured)
    }

    fn release(mut self, has_geometry: bool) -> Result<PlotEntry> {
        self.phase.advance(PlotPhase::Released)?;
        let image = self
            .image
            .take()
            .ok_or_else(|| RenderError::ConfigError(format!("{} released without pixels", self.key)))?;
        Ok(PlotEntry {
            key: self.key,
            image,
            has_geometry,
        })
    }
}

/// Replace an all-black capture with white and enforce the plot size.
fn sanitize_capture(image: RgbImage, plot_size: u32, key: PlotKey) -> RgbImage {
    if image.as_raw().iter().all(|&v| v == 0) {
        crate::warn!("Empty capture for {key}, using a blank plot");
        return RgbImage::from_pixel(plot_size, plot_size, Rgb([255, 255, 255]));
    }
    if image.dimensions() == (plot_size, plot_size) {
        image
    } else {
        image::imageops::resize(&image, plot_size, plot_size, image::imageops::FilterType::Triangle)
    }
}

/// Renders one 3D plot per tracked instance.
pub struct Pose3dPlotter<B: PlotBackend = RasterBackend> {
    config: Arc<VisualizerConfig>,
    backend: B,
}

impl<B: PlotBackend> Pose3dPlotter<B> {
    /// Create a plotter drawing through `backend`.
    #[must_use]
    pub fn new(config: Arc<VisualizerConfig>, backend: B) -> Self {
        Self { config, backend }
    }

    /// Backend in use.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Draw the selected 3D instances, one plot per track id.
    ///
    /// A slot is drawn without geometry when the mean of its 3D scores or of
    /// its 2D gate falls below `options.kpt_thr`. When the selection asks for
    /// padding, placeholder plots fill the collection up to the requested
    /// count.
    ///
    /// # Arguments
    ///
    /// * `selection` - Output of [`select_instances`](crate::instances::select_instances).
    /// * `track_ids` - One id per kept instance, `-1` skips the slot.
    /// * `scores_2d` - Optional per-slot gate in the 3D topology; missing slots gate with ones.
    /// * `options` - Camera, threshold and size settings.
    ///
    /// # Errors
    ///
    /// Returns a shape error for missing track ids, keypoints with fewer than
    /// three coordinates, or a gate whose length differs from the keypoint
    /// count, and a configuration error for mismatched color lists.
    pub fn draw_3d_data_samples(
        &self,
        selection: &InstanceSelection,
        track_ids: &[TrackId],
        scores_2d: Option<&[Option<Array1<f32>>]>,
        options: &RenderOptions,
    ) -> Result<Pose3dPlots> {
        let mut plots = Pose3dPlots::new();

        if let Some(instances) = &selection.instances {
            if !instances.is_empty() && instances.dims() < 3 {
                return Err(RenderError::ShapeError(format!(
                    "3D plots need (x, y, z) keypoints, got {} coordinates",
                    instances.dims()
                )));
            }
            let scores = instances.scores();
            for i in 0..instances.len() {
                let track_id = track_for_slot(track_ids, i)?;
                if is_empty_slot(track_id) {
                    continue;
                }
                let kpts = instances.instance(i);
                let gate = scores_2d
                    .and_then(|slots| slots.get(i))
                    .and_then(Option::as_ref)
                    .cloned()
                    .unwrap_or_else(|| Array1::ones(kpts.nrows()));
                if gate.len() != kpts.nrows() {
                    return Err(RenderError::ShapeError(format!(
                        "2D gate for slot {i} has {} scores, 3D pose has {} keypoints",
                        gate.len(),
                        kpts.nrows()
                    )));
                }
                let entry = self.draw_track(track_id, kpts, scores.row(i), gate.view(), options)?;
                plots.insert(entry);
            }
        }

        if selection.needs_padding() {
            let missing = selection.requested.saturating_sub(plots.len());
            let mut next = FIRST_PLACEHOLDER_ID;
            for _ in 0..missing {
                let id = plots.next_placeholder_id(next);
                plots.insert(self.draw_placeholder(id, options)?);
                next = id - 1;
            }
        }

        crate::verbose!(
            "Rendered {} 3D plots ({} placeholders)",
            plots.len(),
            plots.placeholder_count()
        );
        Ok(plots)
    }

    fn acquire(&self, key: PlotKey, options: &RenderOptions) -> PlotSlot<B::Surface> {
        let mut surface = self.backend.acquire(options.plot_size);
        surface.view_init(options.axis_elev, options.axis_azimuth);
        surface.hide_ticks();
        surface.set_dist(options.axis_dist);
        PlotSlot::new(key, surface)
    }

    fn draw_track(
        &self,
        track_id: TrackId,
        kpts: ArrayView2<'_, f32>,
        scores: ArrayView1<'_, f32>,
        gate: ArrayView1<'_, f32>,
        options: &RenderOptions,
    ) -> Result<PlotEntry> {
        let thr = options.kpt_thr;
        let mut slot = self.acquire(PlotKey::Track(track_id), options);
        let background = Color::from_unit(color_for_track(track_id));
        slot.surface()?
            .set_title(&format!("{} ({track_id})", options.title), self.config.text_color, Some(background));

        let center = [
            mean(kpts.column(0)),
            mean(kpts.column(1)),
            mean(kpts.column(2)),
        ];
        let skip = match (mean(scores), mean(gate), center) {
            (Some(s3), Some(s2), [Some(_), Some(_), Some(_)]) => s3 < thr || s2 < thr,
            _ => true,
        };

        let surface = slot.surface()?;
        let half = options.axis_limit / 2.0;
        let [xc, yc, zc] = center.map(|c| c.unwrap_or(0.0));
        surface.set_xlim3d(xc - half, xc + half);
        surface.set_ylim3d(yc - half, yc + half);
        surface.set_zlim3d((zc - half).min(0.0), zc + half);

        if skip {
            crate::verbose!("Track {track_id}: low confidence, plotting without pose");
            slot.finish(PlotPhase::SkippedLowConfidence)?;
        } else {
            self.draw_pose(slot.surface()?, kpts, scores, gate, thr, options.show_kpt_idx)?;
            slot.finish(PlotPhase::Rendered)?;
        }

        slot.capture(options.plot_size)?;
        slot.release(!skip)
    }

    fn draw_pose(
        &self,
        surface: &mut B::Surface,
        kpts: ArrayView2<'_, f32>,
        scores: ArrayView1<'_, f32>,
        gate: ArrayView1<'_, f32>,
        thr: f32,
        show_kpt_idx: bool,
    ) -> Result<()> {
        let cfg = &*self.config;
        let num_kpts = kpts.nrows();
        let point = |k: usize| [kpts[[k, 0]], kpts[[k, 1]], kpts[[k, 2]]];

        let kpt_colors = cfg.kpt_color.resolve(num_kpts, "kpt_color", "keypoints")?;
        let (points, colors): (Vec<[f32; 3]>, Vec<Color>) = kpt_colors
            .iter()
            .enumerate()
            .filter_map(|(k, color)| color.map(|c| (point(k), c)))
            .unzip();
        surface.scatter(&points, &colors);

        if show_kpt_idx {
            for (k, row) in kpts.axis_iter(Axis(0)).enumerate() {
                surface.text([row[0], row[1], row[2]], &k.to_string(), LABEL_COLOR);
            }
        }

        if let Some(skeleton) = cfg.skeleton.as_ref().filter(|_| cfg.link_color.is_set()) {
            skeleton.validate(num_kpts)?;
            let link_colors = cfg.link_color.resolve(skeleton.len(), "link_color", "skeleton")?;
            let passes = |k: usize| scores[k] >= thr && gate[k] >= thr;
            for (&[a, b], color) in skeleton.bones().iter().zip(link_colors) {
                if let Some(color) = color {
                    if passes(a) && passes(b) {
                        surface.plot(point(a), point(b), color);
                    }
                }
            }
        }
        Ok(())
    }

    fn draw_placeholder(&self, id: i32, options: &RenderOptions) -> Result<PlotEntry> {
        let mut slot = self.acquire(PlotKey::Placeholder(id), options);
        slot.surface()?.set_title(PLACEHOLDER_TITLE, PLACEHOLDER_TEXT, None);
        slot.finish(PlotPhase::SkippedLowConfidence)?;
        slot.capture(options.plot_size)?;
        slot.release(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instances::{PoseInstances, select_instances};
    use crate::visualizer::skeleton::Skeleton;
    use ndarray::{Array2, Array3};

    fn plotter() -> Pose3dPlotter {
        let cfg = VisualizerConfig::default()
            .with_skeleton(Skeleton::new(vec![[0, 1], [1, 2]]))
            .with_link_color(Color::BLUE);
        Pose3dPlotter::new(Arc::new(cfg), RasterBackend::default())
    }

    fn options() -> RenderOptions {
        RenderOptions::default().with_plot_size(64)
    }

    fn poses(n: usize) -> PoseInstances {
        let kpts = Array3::from_shape_fn((n, 3, 3), |(i, k, c)| (i + k + c) as f32 * 0.1);
        PoseInstances::new(kpts).unwrap()
    }

    #[test]
    fn test_plot_per_track() {
        let sel = select_instances(Some(&poses(2)), None);
        let plots = plotter().draw_3d_data_samples(&sel, &[4, 9], None, &options()).unwrap();
        assert_eq!(plots.keys().collect::<Vec<_>>(), vec![PlotKey::Track(4), PlotKey::Track(9)]);
        assert_eq!(plots.get(4).unwrap().dimensions(), (64, 64));
        assert!(plots.entry(9).unwrap().has_geometry);
    }

    #[test]
    fn test_empty_slot_is_skipped() {
        let sel = select_instances(Some(&poses(2)), None);
        let plots = plotter().draw_3d_data_samples(&sel, &[-1, 3], None, &options()).unwrap();
        assert_eq!(plots.len(), 1);
        assert!(plots.contains(3));
        assert!(!plots.contains(-1));
    }

    #[test]
    fn test_low_3d_confidence_draws_no_geometry() {
        let inst = poses(1).with_scores(Array2::from_elem((1, 3), 0.1)).unwrap();
        let sel = select_instances(Some(&inst), None);
        let gate = vec![Some(Array1::ones(3))];
        let plots = plotter()
            .draw_3d_data_samples(&sel, &[0], Some(&gate), &options())
            .unwrap();
        assert!(!plots.entry(0).unwrap().has_geometry);
    }

    #[test]
    fn test_low_gate_draws_no_geometry() {
        let sel = select_instances(Some(&poses(1)), None);
        let gate = vec![Some(Array1::from_elem(3, 0.2))];
        let plots = plotter()
            .draw_3d_data_samples(&sel, &[0], Some(&gate), &options())
            .unwrap();
        assert!(!plots.entry(0).unwrap().has_geometry);
    }

    #[test]
    fn test_gate_length_mismatch() {
        let sel = select_instances(Some(&poses(1)), None);
        let gate = vec![Some(Array1::ones(17))];
        let err = plotter()
            .draw_3d_data_samples(&sel, &[0], Some(&gate), &options())
            .unwrap_err();
        assert!(matches!(err, RenderError::ShapeError(_)));
    }

    #[test]
    fn test_padding_adds_placeholders() {
        let sel = select_instances(Some(&poses(2)), Some(5));
        let plots = plotter().draw_3d_data_samples(&sel, &[0, 1], None, &options()).unwrap();
        assert_eq!(plots.len(), 5);
        let ids: Vec<i32> = plots.keys().filter(|k| k.is_placeholder()).map(PlotKey::id).collect();
        assert_eq!(ids, vec![-2, -3, -4]);
    }

    #[test]
    fn test_placeholder_ids_avoid_track_ids() {
        let sel = select_instances(Some(&poses(1)), Some(3));
        let plots = plotter().draw_3d_data_samples(&sel, &[-2], None, &options()).unwrap();
        let ids: Vec<i32> = plots.keys().map(PlotKey::id).collect();
        assert_eq!(ids, vec![-2, -3, -4]);
        assert_eq!(plots.placeholder_count(), 2);
    }

    #[test]
    fn test_duplicate_track_overwrites() {
        let sel = select_instances(Some(&poses(2)), None);
        let plots = plotter().draw_3d_data_samples(&sel, &[5, 5], None, &options()).unwrap();
        assert_eq!(plots.len(), 1);
    }

    #[test]
    fn test_two_dimensional_poses_rejected() {
        let inst = PoseInstances::new(Array3::zeros((1, 3, 2))).unwrap();
        let sel = select_instances(Some(&inst), None);
        assert!(plotter().draw_3d_data_samples(&sel, &[0], None, &options()).is_err());
    }

    #[test]
    fn test_phase_transitions() {
        assert!(PlotPhase::Pending.can_advance_to(PlotPhase::Rendered));
        assert!(PlotPhase::Pending.can_advance_to(PlotPhase::SkippedLowConfidence));
        assert!(PlotPhase::Rendered.can_advance_to(PlotPhase::Captured));
        assert!(PlotPhase::Captured.can_advance_to(PlotPhase::Released));
        assert!(!PlotPhase::Pending.can_advance_to(PlotPhase::Captured));
        assert!(!PlotPhase::Released.can_advance_to(PlotPhase::Pending));
    }

    #[test]
    fn test_blank_capture_becomes_white() {
        let img = sanitize_capture(RgbImage::new(10, 10), 10, PlotKey::Track(0));
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_into_map() {
        let sel = select_instances(Some(&poses(1)), Some(2));
        let map = plotter()
            .draw_3d_data_samples(&sel, &[7], None, &options())
            .unwrap()
            .into_map();
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![-2, 7]);
    }
}
