// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module for rendering pose frames.
//!
//! This module contains the command-line interface logic, including argument parsing
//! and the `render` command implementation.

/// CLI arguments.
pub mod args;

/// Render command.
pub mod render;
