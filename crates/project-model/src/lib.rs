//! Montage Project Model
//!
//! Defines the read-only inputs of an export:
//! - **Project:** canvas size, background, assets, and tracks of clips
//! - **ExportOptions:** output resolution, frame rate, container and codecs
//!
//! Clip times are timeline seconds; transforms are in project-canvas pixels.

pub mod export;
pub mod project;

pub use export::*;
pub use project::*;
