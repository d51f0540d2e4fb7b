//! Project, asset, track, and clip types.
//!
//! A project is the read-only input to an export: a canvas size, the assets
//! the timeline can reference, and tracks of time-bounded clips. Documents
//! arrive from the editor as camelCase JSON.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Background color used when a project does not specify one.
pub const DEFAULT_BACKGROUND: &str = "#000000";

/// Top-level project document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique project identifier.
    pub id: String,

    /// Human-readable project name.
    pub name: String,

    /// Canvas resolution the editor positions layers in.
    pub width: u32,
    pub height: u32,

    /// Canvas fill as a hex string (for example `#1a1a1a`).
    #[serde(default = "default_background")]
    pub background_color: String,

    /// Media the timeline can reference.
    #[serde(default)]
    pub assets: Vec<Asset>,

    /// Tracks in document order.
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// Kind of media carried by an asset, track, or clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
    Audio,
    Text,
}

/// A piece of media the timeline can reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Unique within the project.
    pub id: String,

    /// Network URL or local path.
    #[serde(default)]
    pub source: String,

    pub kind: MediaKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_meta: Option<TextMeta>,
}

/// Extra data carried by text assets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMeta {
    #[serde(default)]
    pub initial_text: String,
}

/// A layer of clips. Higher `order` stacks in front.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,

    pub kind: MediaKind,

    #[serde(default)]
    pub order: i32,

    /// Hidden tracks are left out of every export.
    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub clips: Vec<Clip>,
}

/// A time-bounded use of an asset on a track.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: String,

    pub track_id: String,

    pub asset_id: String,

    pub kind: MediaKind,

    /// Timeline seconds.
    pub start: f64,
    pub end: f64,

    /// Source-media seconds; default to `start`/`end` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_point: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_point: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,

    /// Free-form per-kind data such as `text`, `fontSize` and `fill`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

/// 2-D placement of a clip on the project canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Degrees, clockwise.
    pub rotation: f64,
    pub opacity: f64,
    pub anchor_x: f64,
    pub anchor_y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            opacity: 1.0,
            anchor_x: 0.0,
            anchor_y: 0.0,
        }
    }
}

impl Clip {
    /// The clip transform, or identity.
    pub fn transform_or_default(&self) -> Transform {
        self.transform.unwrap_or_default()
    }

    /// Source seconds where playback begins.
    pub fn source_in(&self) -> f64 {
        self.in_point.unwrap_or(self.start)
    }

    /// Source seconds where playback ends.
    pub fn source_out(&self) -> f64 {
        self.out_point.unwrap_or(self.end)
    }

    /// Timeline length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// `params.text`, when it is a string.
    pub fn text_param(&self) -> Option<&str> {
        self.params.get("text").and_then(Value::as_str)
    }

    /// `params.fontSize` in canvas pixels.
    pub fn font_size_param(&self) -> Option<f64> {
        self.params.get("fontSize").and_then(Value::as_f64)
    }

    /// `params.fill` color string.
    pub fn fill_param(&self) -> Option<&str> {
        self.params.get("fill").and_then(Value::as_str)
    }
}

impl Project {
    /// Create an empty project with the given canvas size.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            width,
            height,
            background_color: default_background(),
            assets: vec![],
            tracks: vec![],
        }
    }

    /// Parse a project document.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a project document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&json).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Latest clip end across all tracks, hidden ones included.
    pub fn duration(&self) -> f64 {
        self.tracks
            .iter()
            .flat_map(|track| track.clips.iter())
            .map(|clip| clip.end)
            .fold(0.0, f64::max)
    }

    /// Look up an asset by id.
    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.id == id)
    }

    /// Check structural invariants, reporting every violation found.
    pub fn validate(&self) -> Result<(), ProjectError> {
        let mut problems = vec![];

        if self.width == 0 || self.height == 0 {
            problems.push(format!(
                "canvas must be non-empty (got {}x{})",
                self.width, self.height
            ));
        }

        let mut seen = HashSet::new();
        for asset in &self.assets {
            if !seen.insert(asset.id.as_str()) {
                problems.push(format!("duplicate asset id {}", asset.id));
            }
        }

        for clip in self.tracks.iter().flat_map(|t| t.clips.iter()) {
            if !(clip.start >= 0.0 && clip.end > clip.start) {
                problems.push(format!(
                    "clip {} has invalid bounds [{}, {}]",
                    clip.id, clip.start, clip.end
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ProjectError::ValidationError {
                message: problems.join("; "),
            })
        }
    }
}

fn default_background() -> String {
    DEFAULT_BACKGROUND.to_string()
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}
