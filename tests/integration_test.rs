// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! End-to-end tests for frame rendering

use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use image::{Rgb, RgbImage};
use ndarray::{Array2, Array3};
use pose_render::visualizer::ChannelOrder;
use pose_render::visualizer::skeleton::{COCO_KPT_COLOR_INDICES, OPENPOSE_COLORS};
use pose_render::{
    Color, ColorSpec, PlotBackend, PlotKey, PlotSurface3d, Pose3dVisualizer, PoseDataSample, PoseInstances,
    RenderError, RenderOptions, SkeletonStyle, VisualizerConfig,
};

const WIDTH: u32 = 140;
const HEIGHT: u32 = 120;

/// COCO keypoints laid out on a 5-wide grid with 20 px spacing.
fn grid_xy(k: usize) -> (f32, f32) {
    (20.0 + (k % 5) as f32 * 20.0, 20.0 + (k / 5) as f32 * 20.0)
}

/// A pixel inside keypoint `k`'s disc that no COCO bone of the grid crosses.
fn disc_pixel(k: usize) -> (u32, u32) {
    let (x, y) = grid_xy(k);
    (x as u32 + 1, y as u32 - 2)
}

fn detections(n: usize) -> PoseInstances {
    let kpts = Array3::from_shape_fn((n, 17, 2), |(_, k, c)| {
        let (x, y) = grid_xy(k);
        if c == 0 { x } else { y }
    });
    PoseInstances::new(kpts).unwrap()
}

fn poses(n: usize) -> PoseInstances {
    let kpts = Array3::from_shape_fn((n, 17, 3), |(i, k, c)| (i + k + c) as f32 * 0.05);
    PoseInstances::new(kpts).unwrap()
}

fn config() -> VisualizerConfig {
    VisualizerConfig::coco_to_h36m()
        .without_font()
        .with_alpha(1.0)
        .with_channel_order(ChannelOrder::Rgb)
}

fn options() -> RenderOptions {
    RenderOptions::default().with_plot_size(80)
}

fn render<B: PlotBackend>(
    visualizer: &Pose3dVisualizer<B>,
    det: Option<PoseInstances>,
    pose: Option<PoseInstances>,
    track_ids: Option<&[i32]>,
    opts: &RenderOptions,
) -> pose_render::Result<pose_render::RenderedFrame> {
    let det = det.map(PoseDataSample::new);
    let pose = pose.map_or_else(PoseDataSample::empty, PoseDataSample::new);
    visualizer.add_datasample(&RgbImage::new(WIDTH, HEIGHT), &pose, det.as_ref(), track_ids, opts)
}

#[test]
fn test_single_track_end_to_end() {
    let visualizer = Pose3dVisualizer::new(config());
    let frame = render(&visualizer, Some(detections(1)), Some(poses(1)), Some(&[7]), &options()).unwrap();

    let overlay = frame.overlay.unwrap();
    for k in 0..17 {
        let (x, y) = disc_pixel(k);
        let expected = Color::from_pose_index(COCO_KPT_COLOR_INDICES[k]).to_rgb();
        assert_eq!(*overlay.get_pixel(x, y), expected, "keypoint {k}");
    }

    let keys: Vec<PlotKey> = frame.plots.keys().collect();
    assert_eq!(
        keys,
        vec![
            PlotKey::Track(7),
            PlotKey::Placeholder(-2),
            PlotKey::Placeholder(-3),
            PlotKey::Placeholder(-4),
            PlotKey::Placeholder(-5),
        ]
    );
    assert!(frame.plots.entry(7).unwrap().has_geometry);
    for entry in frame.plots.iter() {
        assert_eq!(entry.image.dimensions(), (80, 80));
    }
}

#[test]
fn test_padding_with_two_tracks() {
    let visualizer = Pose3dVisualizer::new(config());
    let frame = render(&visualizer, Some(detections(2)), Some(poses(2)), Some(&[0, 1]), &options()).unwrap();

    assert_eq!(frame.plots.len(), 5);
    let placeholders: Vec<i32> = frame
        .plots
        .keys()
        .filter(|k| k.is_placeholder())
        .map(PlotKey::id)
        .collect();
    assert_eq!(placeholders.len(), 3);
    assert!(placeholders.iter().all(|&id| id < -1));
    let mut unique = placeholders.clone();
    unique.dedup();
    assert_eq!(unique, placeholders);
}

#[test]
fn test_truncation_without_padding() {
    let visualizer = Pose3dVisualizer::new(config());
    let ids: Vec<i32> = (10..18).collect();
    let frame = render(&visualizer, None, Some(poses(8)), Some(&ids), &options()).unwrap();
    let keys: Vec<i32> = frame.plots.keys().map(PlotKey::id).collect();
    assert_eq!(keys, vec![10, 11, 12, 13, 14]);
}

#[test]
fn test_skipped_slot() {
    let visualizer = Pose3dVisualizer::new(config());
    let opts = options().with_num_instances(None);
    let frame = render(&visualizer, Some(detections(2)), Some(poses(2)), Some(&[-1, 4]), &opts).unwrap();
    let keys: Vec<i32> = frame.plots.keys().map(PlotKey::id).collect();
    assert_eq!(keys, vec![4]);
}

#[test]
fn test_low_3d_confidence_with_high_gate() {
    let visualizer = Pose3dVisualizer::new(config());
    let pose = poses(1).with_scores(Array2::from_elem((1, 17), 0.1)).unwrap();
    let frame = render(&visualizer, Some(detections(1)), Some(pose), Some(&[3]), &options()).unwrap();
    let entry = frame.plots.entry(3).unwrap();
    assert!(!entry.has_geometry);
    assert_eq!(entry.image.dimensions(), (80, 80));
}

#[test]
fn test_low_2d_confidence_gates_3d() {
    let visualizer = Pose3dVisualizer::new(config());
    let det = detections(1).with_scores(Array2::from_elem((1, 17), 0.2)).unwrap();
    let frame = render(&visualizer, Some(det), Some(poses(1)), Some(&[3]), &options()).unwrap();
    assert!(!frame.plots.entry(3).unwrap().has_geometry);
}

#[test]
fn test_threshold_boundary_passes() {
    let visualizer = Pose3dVisualizer::new(config());
    let det = detections(1).with_scores(Array2::from_elem((1, 17), 0.3)).unwrap();
    let pose = poses(1).with_scores(Array2::from_elem((1, 17), 0.3)).unwrap();
    let frame = render(&visualizer, Some(det), Some(pose), Some(&[3]), &options()).unwrap();
    assert!(frame.plots.entry(3).unwrap().has_geometry);
    let (x, y) = disc_pixel(0);
    let expected = Color::from_pose_index(COCO_KPT_COLOR_INDICES[0]).to_rgb();
    assert_eq!(*frame.overlay.unwrap().get_pixel(x, y), expected);
}

#[test]
fn test_openpose_neck() {
    let cfg = VisualizerConfig::openpose()
        .without_font()
        .with_alpha(1.0)
        .with_channel_order(ChannelOrder::Rgb)
        .with_det_link_color(ColorSpec::Unset);
    let visualizer = Pose3dVisualizer::new(cfg);
    let opts = options().with_skeleton_style(SkeletonStyle::Openpose);
    let frame = render(&visualizer, Some(detections(1)), Some(poses(1)), Some(&[1]), &opts).unwrap();

    let (lx, ly) = grid_xy(5);
    let (rx, ry) = grid_xy(6);
    let neck = ((lx + rx) / 2.0, (ly + ry) / 2.0);
    let [r, g, b] = OPENPOSE_COLORS[1];
    assert_eq!(*frame.overlay.unwrap().get_pixel(neck.0 as u32, neck.1 as u32), Rgb([r, g, b]));
    assert!(frame.plots.entry(1).unwrap().has_geometry);
}

#[test]
fn test_bgr_input_returns_rgb_overlay() {
    let cfg = config().with_channel_order(ChannelOrder::Bgr);
    let visualizer = Pose3dVisualizer::new(cfg);
    let frame = render(&visualizer, Some(detections(1)), None, Some(&[0]), &options()).unwrap();
    let (x, y) = disc_pixel(11);
    let expected = Color::from_pose_index(COCO_KPT_COLOR_INDICES[11]).to_rgb();
    assert_eq!(*frame.overlay.unwrap().get_pixel(x, y), expected);
}

#[test]
fn test_color_count_mismatch_is_fatal() {
    let cfg = config().with_det_kpt_color(ColorSpec::PerItem(vec![Some(Color::RED); 5]));
    let visualizer = Pose3dVisualizer::new(cfg);
    let err = render(&visualizer, Some(detections(1)), Some(poses(1)), Some(&[0]), &options()).unwrap_err();
    assert!(matches!(
        err,
        RenderError::ColorCountMismatch {
            colors: 5,
            expected: 17,
            ..
        }
    ));
}

#[test]
fn test_short_track_id_list() {
    let visualizer = Pose3dVisualizer::new(config());
    let err = render(&visualizer, None, Some(poses(2)), Some(&[0]), &options()).unwrap_err();
    assert!(matches!(err, RenderError::ShapeError(_)));
}

#[test]
fn test_index_labels_without_track_ids() {
    let visualizer = Pose3dVisualizer::new(config());
    let opts = options().with_num_instances(None);
    let frame = render(&visualizer, Some(detections(3)), Some(poses(3)), None, &opts).unwrap();
    let keys: Vec<i32> = frame.plots.keys().map(PlotKey::id).collect();
    assert_eq!(keys, vec![0, 1, 2]);
}

#[test]
fn test_low_confidence_track_keeps_title_box() {
    let visualizer = Pose3dVisualizer::new(config());
    let pose = poses(1).with_scores(Array2::from_elem((1, 17), 0.1)).unwrap();
    let frame = render(&visualizer, None, Some(pose), Some(&[7]), &options()).unwrap();
    let track = frame.plots.entry(7).unwrap();
    assert!(!track.has_geometry);
    let placeholder = frame.plots.get(-2).unwrap();
    assert_ne!(&track.image, placeholder);
}

#[test]
fn test_outlier_next_to_the_camera() {
    let (el, az) = (15.0_f32.to_radians(), 70.0_f32.to_radians());
    let eye = [el.cos() * az.cos() * 10.0, el.cos() * az.sin() * 10.0, el.sin() * 10.0];
    let right = [-az.sin(), az.cos(), 0.0];
    // Normalized to 0.85 of the way from the origin to eye + right.
    let q: Vec<f32> = (0..3).map(|c| 0.85 * 0.85 * (eye[c] + right[c])).collect();
    let kpts = Array3::from_shape_fn((1, 17, 3), |(_, k, c)| match k {
        0 => q[c],
        1 => -q[c],
        _ => 0.0,
    });
    let pose = PoseInstances::new(kpts).unwrap();

    let visualizer = Pose3dVisualizer::new(config());
    let opts = options().with_num_instances(None);
    let frame = render(&visualizer, None, Some(pose), Some(&[1]), &opts).unwrap();
    let entry = frame.plots.entry(1).unwrap();
    assert!(entry.has_geometry);
    assert_eq!(entry.image.dimensions(), (80, 80));
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    View(f32, f32),
    Dist(f32),
    Lim(usize, f32, f32),
    Scatter(usize),
    Plot,
    Title(String, Color),
}

#[derive(Clone, Default)]
struct RecordingBackend {
    calls: Arc<Mutex<Vec<Call>>>,
}

struct RecordingSurface {
    size: u32,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingSurface {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PlotSurface3d for RecordingSurface {
    fn view_init(&mut self, elev: f32, azim: f32) {
        self.record(Call::View(elev, azim));
    }
    fn set_dist(&mut self, dist: f32) {
        self.record(Call::Dist(dist));
    }
    fn hide_ticks(&mut self) {}
    fn set_xlim3d(&mut self, lo: f32, hi: f32) {
        self.record(Call::Lim(0, lo, hi));
    }
    fn set_ylim3d(&mut self, lo: f32, hi: f32) {
        self.record(Call::Lim(1, lo, hi));
    }
    fn set_zlim3d(&mut self, lo: f32, hi: f32) {
        self.record(Call::Lim(2, lo, hi));
    }
    fn scatter(&mut self, points: &[[f32; 3]], _colors: &[Color]) {
        self.record(Call::Scatter(points.len()));
    }
    fn plot(&mut self, _start: [f32; 3], _end: [f32; 3], _color: Color) {
        self.record(Call::Plot);
    }
    fn text(&mut self, _pos: [f32; 3], _text: &str, _color: Color) {}
    fn set_title(&mut self, title: &str, color: Color, _background: Option<Color>) {
        self.record(Call::Title(title.to_string(), color));
    }
    fn draw(&mut self) {}
    fn capture(self) -> RgbImage {
        RgbImage::new(self.size, self.size)
    }
}

impl PlotBackend for RecordingBackend {
    type Surface = RecordingSurface;

    fn acquire(&self, size: u32) -> RecordingSurface {
        RecordingSurface {
            size,
            calls: Arc::clone(&self.calls),
        }
    }
}

#[test]
fn test_camera_framing_and_blank_capture() {
    let backend = RecordingBackend::default();
    let calls = Arc::clone(&backend.calls);
    let visualizer = Pose3dVisualizer::with_backend(config().with_text_color(Color::RED), backend);

    let kpts = Array3::from_shape_fn((1, 17, 3), |(_, _, c)| [1.0, 2.0, 3.0][c]);
    let pose = PoseInstances::new(kpts).unwrap();
    let opts = options().with_num_instances(None);
    let frame = render(&visualizer, None, Some(pose), Some(&[9]), &opts).unwrap();

    let image = frame.plots.get(9).unwrap();
    assert!(image.pixels().all(|p| p.0 == [255, 255, 255]));

    let calls = calls.lock().unwrap();
    assert!(calls.contains(&Call::View(15.0, 70.0)));
    assert!(calls.contains(&Call::Dist(10.0)));
    assert!(calls.contains(&Call::Title("Track id (9)".to_string(), Color::RED)));
    assert!(calls.contains(&Call::Scatter(17)));
    assert_eq!(calls.iter().filter(|c| **c == Call::Plot).count(), 16);

    let lims: Vec<(usize, f32, f32)> = calls
        .iter()
        .filter_map(|c| match c {
            Call::Lim(axis, lo, hi) => Some((*axis, *lo, *hi)),
            _ => None,
        })
        .collect();
    assert_eq!(lims.len(), 3);
    assert_relative_eq!(lims[0].1, 0.15, epsilon = 1e-5);
    assert_relative_eq!(lims[0].2, 1.85, epsilon = 1e-5);
    assert_relative_eq!(lims[1].1, 1.15, epsilon = 1e-5);
    assert_relative_eq!(lims[2].1, 0.0);
    assert_relative_eq!(lims[2].2, 3.85, epsilon = 1e-5);
}

#[test]
fn test_placeholder_titles() {
    let backend = RecordingBackend::default();
    let calls = Arc::clone(&backend.calls);
    let visualizer = Pose3dVisualizer::with_backend(config(), backend);
    let frame = render(&visualizer, None, None, None, &options().with_num_instances(Some(2))).unwrap();
    assert_eq!(frame.plots.placeholder_count(), 2);
    let titles = calls
        .lock()
        .unwrap()
        .iter()
        .filter(|c| matches!(c, Call::Title(title, _) if title == "NO DATA"))
        .count();
    assert_eq!(titles, 2);
}

#[test]
fn test_json_files_to_saved_frame() {
    use pose_render::io::{SampleFile, save_frame};

    let pose_kpts: Vec<Vec<f32>> = (0..17).map(|k| vec![k as f32 * 0.1, 0.5, 1.0]).collect();
    let det_kpts: Vec<Vec<f32>> = (0..17)
        .map(|k| {
            let (x, y) = grid_xy(k);
            vec![x, y]
        })
        .collect();
    let pose_json = serde_json::json!({"instances": [{"keypoints": pose_kpts, "track_id": 2}]});
    let det_json = serde_json::json!({"instances": [{"keypoints": det_kpts, "bbox": [5.0, 5.0, 110.0, 100.0]}]});

    let poses = SampleFile::from_json(&pose_json.to_string()).unwrap();
    let dets = SampleFile::from_json(&det_json.to_string()).unwrap();
    let track_ids = poses.track_ids().unwrap();
    assert_eq!(track_ids, vec![2]);

    let visualizer = Pose3dVisualizer::new(config());
    let opts = options().with_num_instances(Some(2)).with_draw_bbox(true);
    let frame = visualizer
        .add_datasample(
            &RgbImage::new(WIDTH, HEIGHT),
            &poses.to_sample().unwrap(),
            Some(&dets.to_sample().unwrap()),
            Some(&track_ids),
            &opts,
        )
        .unwrap();
    assert_eq!(*frame.overlay.as_ref().unwrap().get_pixel(5, 50), Rgb([0, 255, 0]));

    let dir = tempfile::tempdir().unwrap();
    let written = save_frame(dir.path(), "frame", &frame).unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["frame.jpg", "frame_track2.png", "frame_placeholder2.png"]);
    assert!(written.iter().all(|p| p.exists()));
}
