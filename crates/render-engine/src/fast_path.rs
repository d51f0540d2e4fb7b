//! Single-clip fast path.
//!
//! A project whose only renderable layer is one video clip spanning the
//! whole timeline needs no compositing: trimming and scaling the source
//! directly saves a graph and keeps the encode to one generation.

use crate::layers::{Classification, LayerKind};

/// Tolerance, in seconds, for a clip to count as covering the timeline.
pub const FULL_SPAN_EPSILON: f64 = 0.01;

/// Parameters for a direct trim-and-scale export.
#[derive(Debug, Clone, PartialEq)]
pub struct FastPathPlan {
    /// Locator of the video asset.
    pub source: String,
    /// Source seconds where the output begins.
    pub in_point: f64,
    /// Output length in seconds.
    pub clip_duration: f64,
}

/// Detect the fast path for a classified project.
pub fn detect(classification: &Classification<'_>, duration: f64) -> Option<FastPathPlan> {
    let counts = classification.counts;
    if counts.video != 1 || counts.image != 0 || counts.text != 0 {
        return None;
    }

    let layer = classification
        .layers
        .iter()
        .find(|layer| layer.kind == LayerKind::Video)?;
    let clip = layer.clip;
    if clip.start > FULL_SPAN_EPSILON || clip.end < duration - FULL_SPAN_EPSILON {
        return None;
    }

    let in_point = clip.source_in();
    let clip_duration = clip.source_out() - in_point;
    if clip_duration <= 0.0 {
        return None;
    }

    Some(FastPathPlan {
        source: layer.locator.clone()?,
        in_point,
        clip_duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{classify, MediaRoots};
    use montage_project_model::project::{Asset, Clip, MediaKind, Project, TextMeta, Track};
    use serde_json::{json, Map};

    fn project_with(clips: Vec<(MediaKind, f64, f64, i32)>) -> Project {
        let mut project = Project::new("Fast", 1920, 1080);
        project.assets = vec![
            Asset {
                id: "video".to_string(),
                source: "https://cdn.example.com/a.mp4".to_string(),
                kind: MediaKind::Video,
                text_meta: None,
            },
            Asset {
                id: "text".to_string(),
                source: String::new(),
                kind: MediaKind::Text,
                text_meta: Some(TextMeta {
                    initial_text: "Title".to_string(),
                }),
            },
        ];
        project.tracks = clips
            .into_iter()
            .enumerate()
            .map(|(i, (kind, start, end, order))| Track {
                id: format!("t{i}"),
                kind,
                order,
                hidden: false,
                clips: vec![Clip {
                    id: format!("c{i}"),
                    track_id: format!("t{i}"),
                    asset_id: if kind == MediaKind::Text { "text" } else { "video" }.to_string(),
                    kind,
                    start,
                    end,
                    in_point: None,
                    out_point: None,
                    transform: None,
                    params: Map::new(),
                }],
            })
            .collect();
        project
    }

    #[test]
    fn test_full_length_video_takes_fast_path() {
        let mut project = project_with(vec![(MediaKind::Video, 0.0, 10.0, 0)]);
        project.tracks[0].clips[0].in_point = Some(2.0);
        project.tracks[0].clips[0].out_point = Some(12.0);

        let classified = classify(&project, &MediaRoots::default()).unwrap();
        let plan = detect(&classified, project.duration()).unwrap();
        assert_eq!(plan.source, "https://cdn.example.com/a.mp4");
        assert_eq!(plan.in_point, 2.0);
        assert_eq!(plan.clip_duration, 10.0);
    }

    #[test]
    fn test_epsilon_tolerates_rounding() {
        let project = project_with(vec![(MediaKind::Video, 0.005, 9.995, 0)]);
        let classified = classify(&project, &MediaRoots::default()).unwrap();
        assert!(detect(&classified, 10.0).is_some());
    }

    #[test]
    fn test_late_start_rejects_fast_path() {
        let project = project_with(vec![(MediaKind::Video, 1.0, 10.0, 0)]);
        let classified = classify(&project, &MediaRoots::default()).unwrap();
        assert!(detect(&classified, project.duration()).is_none());
    }

    #[test]
    fn test_extra_text_layer_rejects_fast_path() {
        let mut project = project_with(vec![
            (MediaKind::Video, 0.0, 10.0, 0),
            (MediaKind::Text, 0.0, 3.0, 1),
        ]);
        project.tracks[1].clips[0]
            .params
            .insert("text".to_string(), json!("Hi"));
        let classified = classify(&project, &MediaRoots::default()).unwrap();
        assert!(detect(&classified, project.duration()).is_none());
    }

    #[test]
    fn test_two_video_clips_reject_fast_path() {
        let project = project_with(vec![
            (MediaKind::Video, 0.0, 10.0, 0),
            (MediaKind::Video, 0.0, 10.0, 1),
        ]);
        let classified = classify(&project, &MediaRoots::default()).unwrap();
        assert!(detect(&classified, project.duration()).is_none());
    }
}
