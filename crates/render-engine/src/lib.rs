//! Montage Render Engine
//!
//! Compiles a multi-track timeline into an invocation of an external
//! composition engine (ffmpeg) and runs it.
//!
//! # Pipeline Architecture
//!
//! ```text
//! Project ──► classify ──► fast path? ──yes──► trim + scale ─────────────┐
//!                              │                                          │
//!                              no                                         ▼
//!                              └──► build_graph ──► render_graph ──► EncoderInvocation
//!                                   (geometry per layer)   (script file)   │
//!                                                                          ▼
//!                                                                 ffmpeg ──► output.mp4
//! ```

pub mod engine;
pub mod export;
pub mod fast_path;
pub mod geometry;
pub mod graph;
pub mod invocation;
pub mod layers;
pub mod script;

pub use engine::{FfmpegEngine, MediaEngine};
pub use export::*;
pub use fast_path::FastPathPlan;
pub use geometry::{GeometryMapper, PixelRect, TextAnchor};
pub use graph::{AudioSource, CompositionGraph, GraphNode, NodeRole, TimeGate};
pub use invocation::{EncoderInvocation, InvocationBuilder};
pub use layers::{Classification, LayerKind, LayerOp, MediaRoots, SkipReason, SourceResolver};
