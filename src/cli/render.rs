// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::{Path, PathBuf};
use std::process;

use crate::cli::args::RenderArgs;
use crate::config::{RenderOptions, VisualizerConfig};
use crate::error::Result;
use crate::frame::Pose3dVisualizer;
use crate::io::{SampleFile, find_next_run_dir, load_image, save_frame};
use crate::logging::set_verbose;
use crate::topology::SkeletonStyle;
use crate::visualizer::font::resolve_font;
use crate::visualizer::painter::ChannelOrder;
use crate::{VERSION, error, info, section, success, verbose};

/// Run the render command, exiting with status 1 on failure.
pub fn run_render(args: &RenderArgs) {
    set_verbose(args.verbose);
    section!("pose-render {VERSION}");
    match render(args) {
        Ok(dir) => success!("Results saved to {}", dir.display()),
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}

/// Build per-call options from CLI arguments.
#[must_use]
pub fn options_from_args(args: &RenderArgs) -> RenderOptions {
    RenderOptions::default()
        .with_draw_2d(!args.no_2d)
        .with_draw_bbox(args.draw_bbox)
        .with_kpt_idx(args.show_kpt_idx)
        .with_skeleton_style(args.skeleton_style)
        .with_convert(!args.no_convert)
        .with_view(args.azimuth, args.elevation)
        .with_axis_limit(args.axis_limit)
        .with_axis_dist(args.axis_dist)
        .with_num_instances(args.num_instances())
        .with_plot_size(args.plot_size)
        .with_kpt_thr(args.kpt_thr)
}

/// Build the visualizer configuration for the chosen skeleton style.
#[must_use]
pub fn config_from_args(args: &RenderArgs) -> VisualizerConfig {
    let config = match args.skeleton_style {
        SkeletonStyle::Mmpose => VisualizerConfig::coco_to_h36m(),
        SkeletonStyle::Openpose => VisualizerConfig::openpose(),
    };
    config
        .with_font(args.font.as_deref().and_then(|f| resolve_font(Some(f))))
        .with_channel_order(ChannelOrder::Rgb)
}

fn render(args: &RenderArgs) -> Result<PathBuf> {
    let image = load_image(&args.image)?;
    verbose!("image {}: {}x{}", args.image, image.width(), image.height());

    let pose_file = SampleFile::load(&args.pose3d)?;
    let det_file = args.det2d.as_deref().map(SampleFile::load).transpose()?;
    let poses = pose_file.to_sample()?;
    let detections = det_file.as_ref().map(SampleFile::to_sample).transpose()?;
    let track_ids = pose_file
        .track_ids()
        .or_else(|| det_file.as_ref().and_then(SampleFile::track_ids));
    info!(
        "{} 3D poses, {} 2D detections",
        pose_file.instances.len(),
        det_file.as_ref().map_or(0, |f| f.instances.len())
    );

    let visualizer = Pose3dVisualizer::new(config_from_args(args));
    let options = options_from_args(args);
    let frame = visualizer.add_datasample(
        &image,
        &poses,
        detections.as_ref(),
        track_ids.as_deref(),
        &options,
    )?;

    let run_dir = find_next_run_dir(&args.output, "render");
    let stem = Path::new(&args.image)
        .file_stem()
        .map_or_else(|| "frame".to_string(), |s| s.to_string_lossy().to_string());
    let written = save_frame(&run_dir, &stem, &frame)?;
    verbose!("wrote {} files", written.len());
    Ok(run_dir)
}
