// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::{Args, Parser, Subcommand};

use crate::topology::SkeletonStyle;

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Render Options:
    --image, -i <IMAGE>        Frame to draw the 2D overlay on
    --pose3d, -p <JSON>        3D pose sample file
    --det2d, -d <JSON>         2D detection sample file
    --output, -o <DIR>         Output root [default: runs/pose3d]
    --num-instances <N>        3D plot slots, negative keeps all [default: 5]
    --kpt-thr <T>              Keypoint score threshold [default: 0.3]
    --skeleton-style <STYLE>   mmpose or openpose [default: mmpose]
    --no-2d                    Skip the 2D overlay
    --verbose <BOOL>           Show verbose output

Examples:
    pose-render render --image frame.jpg --pose3d pose3d.json --det2d det2d.json
    pose-render render -i frame.jpg -p pose3d.json --num-instances -1 --no-2d
    pose-render render -i frame.jpg -p pose3d.json -d det2d.json --skeleton-style openpose --draw-bbox"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the 2D overlay and per-track 3D plots of one frame
    Render(RenderArgs),
}

/// Arguments for the render command.
#[derive(Args, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RenderArgs {
    /// Frame image
    #[arg(short, long)]
    pub image: String,

    /// 3D pose sample (JSON)
    #[arg(short, long)]
    pub pose3d: String,

    /// 2D detection sample (JSON)
    #[arg(short, long)]
    pub det2d: Option<String>,

    /// Output root; each run gets its own numbered directory
    #[arg(short, long, default_value = "runs/pose3d")]
    pub output: String,

    /// Number of 3D plot slots, negative keeps every instance
    #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
    pub num_instances: i64,

    /// Keypoint score threshold
    #[arg(long, default_value_t = 0.3)]
    pub kpt_thr: f32,

    /// Side of each 3D plot in pixels
    #[arg(long, default_value_t = 300)]
    pub plot_size: u32,

    /// Camera azimuth in degrees
    #[arg(long, default_value_t = 70.0, allow_negative_numbers = true)]
    pub azimuth: f32,

    /// Camera elevation in degrees
    #[arg(long, default_value_t = 15.0, allow_negative_numbers = true)]
    pub elevation: f32,

    /// Axis extent around the pose center
    #[arg(long, default_value_t = 1.7)]
    pub axis_limit: f32,

    /// Camera distance
    #[arg(long, default_value_t = 10.0)]
    pub axis_dist: f32,

    /// Overlay skeleton style (mmpose, openpose)
    #[arg(long, default_value = "mmpose")]
    pub skeleton_style: SkeletonStyle,

    /// Draw detection boxes
    #[arg(long, default_value_t = false)]
    pub draw_bbox: bool,

    /// Skip the 2D overlay
    #[arg(long, default_value_t = false)]
    pub no_2d: bool,

    /// Label keypoints with their index
    #[arg(long, default_value_t = false)]
    pub show_kpt_idx: bool,

    /// Keep 2D scores in the detection topology
    #[arg(long, default_value_t = false)]
    pub no_convert: bool,

    /// TrueType font for labels and titles
    #[arg(long)]
    pub font: Option<String>,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

impl RenderArgs {
    /// Requested slot count; `None` keeps every instance.
    #[must_use]
    pub fn num_instances(&self) -> Option<usize> {
        usize::try_from(self.num_instances).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_render_args_defaults() {
        let args = Cli::parse_from(["app", "render", "--image", "f.jpg", "--pose3d", "p.json"]);
        match args.command {
            Commands::Render(render) => {
                assert_eq!(render.image, "f.jpg");
                assert_eq!(render.pose3d, "p.json");
                assert!(render.det2d.is_none());
                assert_eq!(render.num_instances(), Some(5));
                assert!((render.kpt_thr - 0.3).abs() < f32::EPSILON);
                assert_eq!(render.plot_size, 300);
                assert_eq!(render.skeleton_style, SkeletonStyle::Mmpose);
                assert!(!render.no_2d);
                assert!(render.verbose);
            }
        }
    }

    #[test]
    fn test_render_args_custom() {
        let args = Cli::parse_from([
            "app",
            "render",
            "-i",
            "f.jpg",
            "-p",
            "p.json",
            "-d",
            "d.json",
            "--num-instances",
            "-1",
            "--skeleton-style",
            "openpose",
            "--azimuth",
            "-30",
            "--draw-bbox",
            "--verbose",
            "false",
        ]);
        match args.command {
            Commands::Render(render) => {
                assert_eq!(render.det2d.as_deref(), Some("d.json"));
                assert_eq!(render.num_instances(), None);
                assert_eq!(render.skeleton_style, SkeletonStyle::Openpose);
                assert!((render.azimuth + 30.0).abs() < f32::EPSILON);
                assert!(render.draw_bbox);
                assert!(!render.verbose);
            }
        }
    }
}
