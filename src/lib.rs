// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Pose Render
//!
//! Per-frame rendering for multi-person pose estimation and tracking
//! pipelines. Given a frame, its 2D keypoint detections and the lifted 3D
//! poses, the library produces:
//!
//! - an annotated **2D overlay** with keypoints, skeleton bones and
//!   optional boxes, in MMPose or OpenPose style,
//! - one small **3D plot per track**, colored by track id, with
//!   placeholder plots keeping the slot count fixed.
//!
//! 3D plots are gated by the 2D confidence of the same track: a pose whose
//! detections are weak is plotted without geometry.
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use ndarray::Array3;
//! use pose_render::{Pose3dVisualizer, PoseDataSample, PoseInstances, RenderOptions, VisualizerConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let visualizer = Pose3dVisualizer::new(VisualizerConfig::coco_to_h36m());
//!
//!     let detections = PoseDataSample::new(PoseInstances::new(Array3::zeros((1, 17, 2)))?);
//!     let poses = PoseDataSample::new(PoseInstances::new(Array3::zeros((1, 17, 3)))?);
//!     let image = image::RgbImage::new(640, 480);
//!
//!     let frame = visualizer.add_datasample(
//!         &image,
//!         &poses,
//!         Some(&detections),
//!         Some(&[7]),
//!         &RenderOptions::default(),
//!     )?;
//!
//!     for entry in frame.plots.iter() {
//!         println!("{}: {:?}", entry.key, entry.image.dimensions());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Overlay + 5 plot slots
//! pose-render render --image frame.jpg --pose3d pose3d.json --det2d det2d.json
//!
//! # Every pose, no overlay
//! pose-render render -i frame.jpg -p pose3d.json --num-instances -1 --no-2d
//! ```
//!
//! Sample files hold `{"instances": [{"keypoints": [[x, y, z], ...],
//! "keypoint_scores": [...], "track_id": 7}]}`.

// Modules
pub mod annotate;
pub mod cli;
pub mod config;
pub mod error;
pub mod frame;
pub mod instances;
pub mod io;
pub mod logging;
pub mod plot3d;
pub mod pose3d;
pub mod topology;
pub mod visualizer;

// Re-export main types for convenience
pub use annotate::{Annotator, SlotScores};
pub use config::{RenderOptions, VisualizerConfig};
pub use error::{RenderError, Result};
pub use frame::{Pose3dVisualizer, RenderedFrame};
pub use instances::{InstanceSelection, NO_TRACK, PoseDataSample, PoseInstances, TrackId, select_instances};
pub use plot3d::{PlotBackend, PlotSurface3d, RasterAxes3d, RasterBackend};
pub use pose3d::{PlotEntry, PlotKey, PlotPhase, Pose3dPlots, Pose3dPlotter};
pub use topology::{DatasetConverter, KeypointConverter, KeypointDataset, SkeletonStyle};
pub use visualizer::{Color, ColorSpec, Skeleton, color_for_track};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
