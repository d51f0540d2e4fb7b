//! Layer classification.
//!
//! Walks visible tracks back to front and turns each clip the engine can
//! actually draw into a typed [`LayerOp`]. Clips that reference a missing
//! asset, disagree with their asset's kind, point at a source the engine
//! cannot reach, or carry no text are skipped and recorded, never fatal.

use std::path::{Component, Path, PathBuf};

use montage_common::error::{MontageError, MontageResult};
use montage_project_model::project::{Asset, Clip, MediaKind, Project, Track};

/// Renderable layer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Video,
    Image,
    Text,
}

/// One renderable contribution derived from a timeline clip.
#[derive(Debug, Clone)]
pub struct LayerOp<'a> {
    pub kind: LayerKind,
    pub clip: &'a Clip,
    pub asset: &'a Asset,
    pub track: &'a Track,
    /// Resolved locator the engine opens. Text layers have none.
    pub locator: Option<String>,
    /// Displayed string for text layers.
    pub text: Option<String>,
}

/// Why a clip did not become a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `start`/`end` do not satisfy `0 <= start < end`.
    InvalidBounds,
    /// `assetId` does not match any project asset.
    UnresolvedAsset,
    /// Clip kind and asset kind disagree, or the kind is not drawable.
    KindMismatch,
    /// The asset source cannot be consumed by the engine (yet).
    UnreachableSource,
    /// Neither `params.text` nor the asset's initial text has content.
    EmptyText,
}

/// A clip left out of the composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedClip {
    pub clip_id: String,
    pub reason: SkipReason,
}

/// Renderable layer count per type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerCounts {
    pub video: usize,
    pub image: usize,
    pub text: usize,
}

impl LayerCounts {
    pub fn total(&self) -> usize {
        self.video + self.image + self.text
    }
}

/// Result of classifying a project.
#[derive(Debug, Clone)]
pub struct Classification<'a> {
    /// Layers in stacking order, back to front.
    pub layers: Vec<LayerOp<'a>>,
    pub skipped: Vec<SkippedClip>,
    pub counts: LayerCounts,
}

/// Resolves an asset source into a locator the engine can open.
pub trait SourceResolver {
    /// `None` means the engine cannot reach the source.
    fn resolve(&self, source: &str) -> Option<String>;
}

/// Accepts network URLs and files under a set of local media roots.
#[derive(Debug, Clone, Default)]
pub struct MediaRoots {
    roots: Vec<PathBuf>,
}

impl MediaRoots {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }
}

impl SourceResolver for MediaRoots {
    fn resolve(&self, source: &str) -> Option<String> {
        let source = source.trim();
        if source.is_empty() {
            return None;
        }
        if is_network_url(source) {
            return Some(source.to_string());
        }

        let path = Path::new(source);
        if has_parent_dir(path) {
            return None;
        }
        if path.is_absolute() && self.roots.iter().any(|root| path.starts_with(root)) {
            return Some(source.to_string());
        }

        // Root-relative sources such as `/uploads/a.mp4` live inside a media root.
        let relative = source.trim_start_matches('/');
        if relative.is_empty() {
            return None;
        }
        self.roots
            .iter()
            .map(|root| root.join(relative))
            .find(|candidate| candidate.is_file())
            .map(|candidate| candidate.display().to_string())
    }
}

fn has_parent_dir(path: &Path) -> bool {
    path.components().any(|c| c == Component::ParentDir)
}

fn is_network_url(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Classify every clip of `project` into renderable layers.
///
/// Fails with [`MontageError::NoRenderableLayers`] only when nothing
/// survives.
pub fn classify<'a>(
    project: &'a Project,
    resolver: &dyn SourceResolver,
) -> MontageResult<Classification<'a>> {
    let mut tracks: Vec<&Track> = project.tracks.iter().filter(|t| !t.hidden).collect();
    // Stable sort keeps document order for equal `order` values.
    tracks.sort_by_key(|t| t.order);

    let mut layers = Vec::new();
    let mut skipped = Vec::new();
    let mut counts = LayerCounts::default();

    for track in tracks {
        for clip in &track.clips {
            match classify_clip(project, track, clip, resolver) {
                Ok(layer) => {
                    match layer.kind {
                        LayerKind::Video => counts.video += 1,
                        LayerKind::Image => counts.image += 1,
                        LayerKind::Text => counts.text += 1,
                    }
                    layers.push(layer);
                }
                Err(reason) => {
                    tracing::debug!(
                        clip = %clip.id,
                        asset = %clip.asset_id,
                        track = %track.id,
                        ?reason,
                        "Skipping clip"
                    );
                    skipped.push(SkippedClip {
                        clip_id: clip.id.clone(),
                        reason,
                    });
                }
            }
        }
    }

    if layers.is_empty() {
        return Err(MontageError::NoRenderableLayers);
    }

    Ok(Classification {
        layers,
        skipped,
        counts,
    })
}

fn classify_clip<'a>(
    project: &'a Project,
    track: &'a Track,
    clip: &'a Clip,
    resolver: &dyn SourceResolver,
) -> Result<LayerOp<'a>, SkipReason> {
    if !(clip.start >= 0.0 && clip.end > clip.start) {
        return Err(SkipReason::InvalidBounds);
    }
    let asset = project
        .asset(&clip.asset_id)
        .ok_or(SkipReason::UnresolvedAsset)?;
    if clip.kind != asset.kind {
        return Err(SkipReason::KindMismatch);
    }

    let kind = match clip.kind {
        MediaKind::Video => LayerKind::Video,
        MediaKind::Image => LayerKind::Image,
        MediaKind::Text => LayerKind::Text,
        MediaKind::Audio => return Err(SkipReason::KindMismatch),
    };

    let (locator, text) = match kind {
        LayerKind::Text => (None, Some(display_text(clip, asset)?)),
        LayerKind::Video | LayerKind::Image => {
            let locator = resolver
                .resolve(&asset.source)
                .ok_or(SkipReason::UnreachableSource)?;
            (Some(locator), None)
        }
    };

    Ok(LayerOp {
        kind,
        clip,
        asset,
        track,
        locator,
        text,
    })
}

fn display_text(clip: &Clip, asset: &Asset) -> Result<String, SkipReason> {
    clip.text_param()
        .filter(|text| !text.is_empty())
        .or_else(|| {
            asset
                .text_meta
                .as_ref()
                .map(|meta| meta.initial_text.as_str())
                .filter(|text| !text.is_empty())
        })
        .map(str::to_string)
        .ok_or(SkipReason::EmptyText)
}

#[cfg(test)]
mod tests {
    use super::*;
    use montage_project_model::project::TextMeta;
    use serde_json::{json, Map};

    struct AllowAll;

    impl SourceResolver for AllowAll {
        fn resolve(&self, source: &str) -> Option<String> {
            Some(source.to_string())
        }
    }

    fn asset(id: &str, kind: MediaKind, source: &str) -> Asset {
        Asset {
            id: id.to_string(),
            source: source.to_string(),
            kind,
            text_meta: None,
        }
    }

    fn clip(id: &str, asset_id: &str, kind: MediaKind) -> Clip {
        Clip {
            id: id.to_string(),
            track_id: String::new(),
            asset_id: asset_id.to_string(),
            kind,
            start: 0.0,
            end: 4.0,
            in_point: None,
            out_point: None,
            transform: None,
            params: Map::new(),
        }
    }

    fn track(id: &str, order: i32, clips: Vec<Clip>) -> Track {
        Track {
            id: id.to_string(),
            kind: MediaKind::Video,
            order,
            hidden: false,
            clips,
        }
    }

    #[test]
    fn test_tracks_sorted_by_order_with_stable_ties() {
        let mut project = Project::new("Order", 1920, 1080);
        project.assets = vec![
            asset("v", MediaKind::Video, "https://cdn/v.mp4"),
            asset("i", MediaKind::Image, "https://cdn/i.png"),
        ];
        project.tracks = vec![
            track("front", 5, vec![clip("c-front", "i", MediaKind::Image)]),
            track("back", 0, vec![clip("c-back", "v", MediaKind::Video)]),
            track("tie", 5, vec![clip("c-tie", "i", MediaKind::Image)]),
        ];

        let classified = classify(&project, &AllowAll).unwrap();
        let ids: Vec<&str> = classified.layers.iter().map(|l| l.clip.id.as_str()).collect();
        assert_eq!(ids, vec!["c-back", "c-front", "c-tie"]);
        assert_eq!(
            classified.counts,
            LayerCounts {
                video: 1,
                image: 2,
                text: 0
            }
        );
    }

    #[test]
    fn test_unusable_clips_are_skipped_with_reason() {
        let mut project = Project::new("Skips", 1920, 1080);
        project.assets = vec![
            asset("v", MediaKind::Video, "https://cdn/v.mp4"),
            asset("uploading", MediaKind::Video, "blob:pending"),
        ];
        let mut hidden = track("hidden", 9, vec![clip("c-hidden", "v", MediaKind::Video)]);
        hidden.hidden = true;
        project.tracks = vec![
            track(
                "main",
                0,
                vec![
                    clip("c-ok", "v", MediaKind::Video),
                    clip("c-missing", "nope", MediaKind::Video),
                    clip("c-mismatch", "v", MediaKind::Image),
                    clip("c-uploading", "uploading", MediaKind::Video),
                    Clip {
                        end: 0.0,
                        ..clip("c-empty-span", "v", MediaKind::Video)
                    },
                ],
            ),
            hidden,
        ];

        let resolver = MediaRoots::default();
        let classified = classify(&project, &resolver).unwrap();
        assert_eq!(classified.layers.len(), 1);
        assert_eq!(classified.layers[0].locator.as_deref(), Some("https://cdn/v.mp4"));
        assert_eq!(
            classified.skipped,
            vec![
                SkippedClip {
                    clip_id: "c-missing".to_string(),
                    reason: SkipReason::UnresolvedAsset
                },
                SkippedClip {
                    clip_id: "c-mismatch".to_string(),
                    reason: SkipReason::KindMismatch
                },
                SkippedClip {
                    clip_id: "c-uploading".to_string(),
                    reason: SkipReason::UnreachableSource
                },
                SkippedClip {
                    clip_id: "c-empty-span".to_string(),
                    reason: SkipReason::InvalidBounds
                },
            ]
        );
    }

    #[test]
    fn test_text_falls_back_to_initial_text() {
        let mut project = Project::new("Text", 1920, 1080);
        let mut text_asset = asset("t", MediaKind::Text, "");
        text_asset.text_meta = Some(TextMeta {
            initial_text: "Fallback".to_string(),
        });
        project.assets = vec![text_asset];

        let mut explicit = clip("c-explicit", "t", MediaKind::Text);
        explicit.params.insert("text".to_string(), json!("Explicit"));
        let mut blank = clip("c-blank", "t", MediaKind::Text);
        blank.params.insert("text".to_string(), json!(""));
        project.tracks = vec![track("texts", 0, vec![explicit, blank])];

        let classified = classify(&project, &AllowAll).unwrap();
        let texts: Vec<&str> = classified
            .layers
            .iter()
            .filter_map(|l| l.text.as_deref())
            .collect();
        assert_eq!(texts, vec!["Explicit", "Fallback"]);
        assert_eq!(classified.counts.text, 2);
    }

    #[test]
    fn test_only_empty_text_is_not_renderable() {
        let mut project = Project::new("Empty", 1920, 1080);
        let mut text_asset = asset("t", MediaKind::Text, "");
        text_asset.text_meta = Some(TextMeta::default());
        project.assets = vec![text_asset];
        let mut empty = clip("c-empty", "t", MediaKind::Text);
        empty.params.insert("text".to_string(), json!(""));
        project.tracks = vec![track("texts", 0, vec![empty])];

        let err = classify(&project, &AllowAll).unwrap_err();
        assert!(matches!(err, MontageError::NoRenderableLayers));
    }

    #[test]
    fn test_media_roots_resolution() {
        let root = std::env::temp_dir().join("montage_test_media_roots");
        std::fs::create_dir_all(root.join("uploads")).unwrap();
        std::fs::write(root.join("uploads").join("clip.mp4"), b"").unwrap();
        let roots = MediaRoots::new(vec![root.clone()]);

        assert_eq!(
            roots.resolve("HTTPS://cdn.example.com/a.mp4").as_deref(),
            Some("HTTPS://cdn.example.com/a.mp4")
        );
        let absolute = root.join("anything.png").display().to_string();
        assert_eq!(roots.resolve(&absolute), Some(absolute.clone()));
        assert_eq!(
            roots.resolve("/uploads/clip.mp4"),
            Some(root.join("uploads").join("clip.mp4").display().to_string())
        );
        assert_eq!(roots.resolve("/uploads/missing.mp4"), None);
        assert_eq!(roots.resolve("/etc/passwd"), None);
        assert_eq!(roots.resolve("../uploads/clip.mp4"), None);
        let escaping = format!("{}/../../etc/passwd", root.display());
        assert_eq!(roots.resolve(&escaping), None);
        let sibling = format!("{}/uploads/../uploads/clip.mp4", root.display());
        assert_eq!(roots.resolve(&sibling), None);
        assert_eq!(roots.resolve(""), None);

        std::fs::remove_dir_all(&root).ok();
    }
}
