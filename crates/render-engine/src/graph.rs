//! Composition graph construction.
//!
//! Classified layers are folded, back to front, into an ordered list of
//! graph nodes. Each node is a tagged record (role, input pads, typed
//! filters, output pads); turning it into engine syntax happens separately
//! in [`crate::script`].
//!
//! ```text
//! [0:v] backdrop ──► [bg] ──overlay──► [c0] ──drawtext──► [c1] ──overlay──► [c2] ─► [vout]
//!                          ▲                                         ▲
//! [1:v] trim/setpts/scale ─┘                   [2:v] trim/scale ─────┘
//! ```

use std::collections::HashMap;
use std::path::Path;

use montage_project_model::export::{ExportFormat, ExportOptions};
use montage_project_model::project::Clip;

use crate::geometry::{fmt_num, GeometryMapper};
use crate::layers::{LayerKind, LayerOp};

/// Input slot of the synthetic backdrop.
pub const BACKDROP_INPUT: usize = 0;

/// Pad carrying the finished picture.
pub const VIDEO_OUT: &str = "vout";

/// Closed interval during which a layer is visible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGate {
    pub start: f64,
    pub end: f64,
}

impl TimeGate {
    pub fn for_clip(clip: &Clip) -> Self {
        Self {
            start: clip.start,
            end: clip.end,
        }
    }

    /// Engine `enable` expression, true for `start <= t <= end`.
    pub fn expression(&self) -> String {
        format!("gte(t,{})*lte(t,{})", fmt_num(self.start), fmt_num(self.end))
    }
}

/// Typed filter primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Null,
    Format { pix_fmt: &'static str },
    SetSar,
    /// Keep source seconds `[start, end)`.
    Trim { start: f64, end: f64 },
    /// Keep the first `duration` seconds.
    TrimDuration { duration: f64 },
    /// Rebase timestamps to zero, then shift them by `offset` seconds.
    SetPts { offset: f64 },
    /// Scale to `width`x`height`; `fit` preserves aspect inside the box.
    Scale { width: u32, height: u32, fit: bool },
    /// Center the frame in a `width`x`height` box.
    Pad { width: u32, height: u32 },
    /// Multiply the alpha channel.
    ColorChannelMixer { alpha: f64 },
    /// Rotate clockwise by `degrees`, growing the frame to fit.
    Rotate { degrees: f64 },
    /// Place the frame at `x`,`y`. With `center_in`, a frame grown by
    /// rotation is centred on the unrotated `width`x`height` box instead.
    Overlay {
        x: i64,
        y: i64,
        center_in: Option<(u32, u32)>,
        gate: TimeGate,
    },
    DrawText {
        text: String,
        font_file: Option<String>,
        font_size: u32,
        color: String,
        x: i64,
        y: i64,
        gate: TimeGate,
    },
    Split { outputs: usize },
    PaletteGen,
    PaletteUse,
}

/// What a node contributes to the composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Normalizes the synthetic backdrop into the first composite.
    Backdrop,
    /// Fans one engine input out to several layers.
    Fanout { input: usize },
    /// Prepares a layer's source frames (trim, retime, scale).
    Source { layer: usize, kind: LayerKind },
    /// Draws a layer onto the running composite.
    Composite { layer: usize, kind: LayerKind },
    /// GIF palette generation and mapping.
    Palette,
    /// Names the final composite as the output pad.
    Output,
}

/// One linear chain of filters between labelled pads.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub role: NodeRole,
    pub inputs: Vec<String>,
    pub filters: Vec<Filter>,
    pub outputs: Vec<String>,
}

impl GraphNode {
    fn new(role: NodeRole, inputs: Vec<String>, filters: Vec<Filter>, outputs: Vec<String>) -> Self {
        Self {
            role,
            inputs,
            filters,
            outputs,
        }
    }

    /// Time gate of the node's overlay or drawtext, if any.
    pub fn gate(&self) -> Option<TimeGate> {
        self.filters.iter().find_map(|filter| match filter {
            Filter::Overlay { gate, .. } | Filter::DrawText { gate, .. } => Some(*gate),
            _ => None,
        })
    }
}

/// Kind of media behind an engine input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Video,
    Image,
}

/// An engine input opened for one distinct asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInput {
    /// Engine input index; the backdrop occupies 0.
    pub index: usize,
    pub kind: InputKind,
    pub asset_id: String,
    pub locator: String,
    /// Number of layers drawing from this input.
    pub uses: usize,
}

/// Audio taken from one video layer, trimmed and shifted like its picture.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    pub locator: String,
    /// Source second where playback begins.
    pub in_point: f64,
    /// Seconds of source audio to keep.
    pub duration: f64,
    /// Timeline second where the audio starts.
    pub offset: f64,
}

/// Ordered composition graph for one export.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionGraph {
    /// Media inputs after the backdrop, in engine order.
    pub inputs: Vec<MediaInput>,
    pub nodes: Vec<GraphNode>,
    /// Pad carrying the finished picture.
    pub video_out: String,
    /// Audio carried into the export, if any.
    pub audio: Option<AudioSource>,
    /// Export length in seconds.
    pub duration: f64,
    /// Backdrop color in engine syntax.
    pub background: String,
}

impl CompositionGraph {
    /// Nodes that draw onto the composite, in stacking order.
    pub fn composite_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes
            .iter()
            .filter(|node| matches!(node.role, NodeRole::Composite { .. }))
    }
}

/// Running state of the fold: nodes emitted so far and the current composite.
struct Stack {
    nodes: Vec<GraphNode>,
    current: String,
}

impl Stack {
    fn push(mut self, nodes: Vec<GraphNode>) -> Self {
        if let Some(label) = nodes.last().and_then(|node| node.outputs.first()) {
            self.current = label.clone();
        }
        self.nodes.extend(nodes);
        self
    }
}

/// Fold `layers` (back to front) into a composition graph.
pub fn build_graph(
    layers: &[LayerOp<'_>],
    mapper: &GeometryMapper,
    options: &ExportOptions,
    duration: f64,
    background: &str,
    font_file: Option<&Path>,
) -> CompositionGraph {
    let (inputs, pads) = assign_inputs(layers);

    let mut seed = vec![GraphNode::new(
        NodeRole::Backdrop,
        vec![format!("{BACKDROP_INPUT}:v")],
        vec![Filter::Format { pix_fmt: "yuv420p" }, Filter::SetSar],
        vec!["bg".to_string()],
    )];
    seed.extend(fanout_nodes(&inputs));

    let font_file = font_file.map(|path| path.display().to_string());
    let stack = layers.iter().zip(pads).enumerate().fold(
        Stack {
            nodes: seed,
            current: "bg".to_string(),
        },
        |stack, (index, (layer, pad))| {
            let nodes = layer_nodes(index, layer, pad, &stack.current, mapper, font_file.as_deref());
            stack.push(nodes)
        },
    );

    let mut nodes = stack.nodes;
    nodes.extend(output_nodes(&stack.current, options.format));

    let audio = layers
        .iter()
        .filter(|_| options.format.has_audio())
        .find(|layer| layer.kind == LayerKind::Video)
        .and_then(|layer| {
            let clip = layer.clip;
            Some(AudioSource {
                locator: layer.locator.clone()?,
                in_point: clip.source_in(),
                duration: clip.source_out() - clip.source_in(),
                offset: clip.start,
            })
        });

    CompositionGraph {
        inputs,
        nodes,
        video_out: VIDEO_OUT.to_string(),
        audio,
        duration,
        background: engine_color(background).unwrap_or_else(|| "black".to_string()),
    }
}

/// Give every distinct video asset, then every distinct image asset, its own
/// input slot, and pick the pad each layer reads from.
fn assign_inputs(layers: &[LayerOp<'_>]) -> (Vec<MediaInput>, Vec<Option<String>>) {
    let mut inputs: Vec<MediaInput> = Vec::new();
    let mut by_asset: HashMap<&str, usize> = HashMap::new();

    for (wanted, kind) in [(LayerKind::Video, InputKind::Video), (LayerKind::Image, InputKind::Image)] {
        for layer in layers.iter().filter(|layer| layer.kind == wanted) {
            let Some(locator) = layer.locator.as_ref() else {
                continue;
            };
            match by_asset.get(layer.asset.id.as_str()) {
                Some(&slot) => inputs[slot].uses += 1,
                None => {
                    by_asset.insert(layer.asset.id.as_str(), inputs.len());
                    inputs.push(MediaInput {
                        index: inputs.len() + 1,
                        kind,
                        asset_id: layer.asset.id.clone(),
                        locator: locator.clone(),
                        uses: 1,
                    });
                }
            }
        }
    }

    let mut taken: HashMap<usize, usize> = HashMap::new();
    let pads = layers
        .iter()
        .map(|layer| {
            let slot = *by_asset.get(layer.asset.id.as_str())?;
            let input = &inputs[slot];
            if input.uses == 1 {
                return Some(format!("{}:v", input.index));
            }
            let branch = taken.entry(input.index).or_insert(0);
            let pad = fanout_label(input.index, *branch);
            *branch += 1;
            Some(pad)
        })
        .collect();

    (inputs, pads)
}

fn fanout_label(input: usize, branch: usize) -> String {
    format!("in{input}_{branch}")
}

fn fanout_nodes(inputs: &[MediaInput]) -> Vec<GraphNode> {
    inputs
        .iter()
        .filter(|input| input.uses > 1)
        .map(|input| {
            GraphNode::new(
                NodeRole::Fanout { input: input.index },
                vec![format!("{}:v", input.index)],
                vec![Filter::Split {
                    outputs: input.uses,
                }],
                (0..input.uses)
                    .map(|branch| fanout_label(input.index, branch))
                    .collect(),
            )
        })
        .collect()
}

fn layer_nodes(
    index: usize,
    layer: &LayerOp<'_>,
    pad: Option<String>,
    current: &str,
    mapper: &GeometryMapper,
    font_file: Option<&str>,
) -> Vec<GraphNode> {
    let clip = layer.clip;
    let gate = TimeGate::for_clip(clip);
    let composite = format!("c{index}");

    if layer.kind == LayerKind::Text {
        let Some(text) = layer.text.clone() else {
            return vec![];
        };
        let anchor = mapper.text_anchor(clip);
        let color = clip
            .fill_param()
            .and_then(engine_color)
            .unwrap_or_else(|| "white".to_string());
        return vec![GraphNode::new(
            NodeRole::Composite {
                layer: index,
                kind: LayerKind::Text,
            },
            vec![current.to_string()],
            vec![Filter::DrawText {
                text,
                font_file: font_file.map(str::to_string),
                font_size: anchor.font_size,
                color,
                x: anchor.x,
                y: anchor.y,
                gate,
            }],
            vec![composite],
        )];
    }

    let Some(pad) = pad else {
        return vec![];
    };
    let rect = mapper.overlay_rect(clip);
    let transform = clip.transform_or_default();

    let mut filters = match layer.kind {
        LayerKind::Video => vec![
            Filter::Trim {
                start: clip.source_in(),
                end: clip.source_out(),
            },
            Filter::SetPts { offset: clip.start },
            Filter::Scale {
                width: rect.width,
                height: rect.height,
                fit: true,
            },
            Filter::Pad {
                width: rect.width,
                height: rect.height,
            },
            Filter::SetSar,
        ],
        _ => vec![
            Filter::TrimDuration {
                duration: clip.duration(),
            },
            Filter::SetPts { offset: clip.start },
            Filter::Scale {
                width: rect.width,
                height: rect.height,
                fit: false,
            },
            Filter::SetSar,
        ],
    };

    let opacity = transform.opacity.clamp(0.0, 1.0);
    let rotated = transform.rotation.abs() > f64::EPSILON;
    if opacity < 1.0 || rotated {
        filters.push(Filter::Format { pix_fmt: "rgba" });
    }
    if opacity < 1.0 {
        filters.push(Filter::ColorChannelMixer { alpha: opacity });
    }
    if rotated {
        filters.push(Filter::Rotate {
            degrees: transform.rotation,
        });
    }

    let source = format!("l{index}");
    vec![
        GraphNode::new(
            NodeRole::Source {
                layer: index,
                kind: layer.kind,
            },
            vec![pad],
            filters,
            vec![source.clone()],
        ),
        GraphNode::new(
            NodeRole::Composite {
                layer: index,
                kind: layer.kind,
            },
            vec![current.to_string(), source],
            vec![Filter::Overlay {
                x: rect.x,
                y: rect.y,
                center_in: rotated.then_some((rect.width, rect.height)),
                gate,
            }],
            vec![composite],
        ),
    ]
}

fn output_nodes(current: &str, format: ExportFormat) -> Vec<GraphNode> {
    match format {
        ExportFormat::Gif => vec![
            GraphNode::new(
                NodeRole::Palette,
                vec![current.to_string()],
                vec![Filter::Split { outputs: 2 }],
                vec!["pal_src".to_string(), "pal_gen".to_string()],
            ),
            GraphNode::new(
                NodeRole::Palette,
                vec!["pal_gen".to_string()],
                vec![Filter::PaletteGen],
                vec!["palette".to_string()],
            ),
            GraphNode::new(
                NodeRole::Palette,
                vec!["pal_src".to_string(), "palette".to_string()],
                vec![Filter::PaletteUse],
                vec![VIDEO_OUT.to_string()],
            ),
        ],
        ExportFormat::Mp4 | ExportFormat::Mov => vec![GraphNode::new(
            NodeRole::Output,
            vec![current.to_string()],
            vec![Filter::Null],
            vec![VIDEO_OUT.to_string()],
        )],
    }
}

/// Normalize a user color into engine syntax.
///
/// Hex colors (`#rgb`, `#rrggbb`, `#rrggbbaa`) become `0x` form; plain color
/// names pass through lowercased. Anything else is rejected.
pub fn engine_color(value: &str) -> Option<String> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return match hex.len() {
            3 => Some(format!(
                "0x{}",
                hex.chars().flat_map(|c| [c, c]).collect::<String>().to_ascii_lowercase()
            )),
            6 | 8 => Some(format!("0x{}", hex.to_ascii_lowercase())),
            _ => None,
        };
    }
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(value.to_ascii_lowercase());
    }
    None
}
