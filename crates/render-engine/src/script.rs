//! Graph script rendering.
//!
//! The only place that knows the engine's textual filtergraph syntax.
//! User-supplied strings go through both escaping levels the filtergraph
//! parser applies: once for the option value, once for the graph itself.

use std::f64::consts::PI;

use crate::geometry::fmt_num;
use crate::graph::{CompositionGraph, Filter, GraphNode};

/// Render a whole graph, one chain per line.
pub fn render_graph(graph: &CompositionGraph) -> String {
    graph
        .nodes
        .iter()
        .map(render_node)
        .collect::<Vec<_>>()
        .join(";\n")
}

/// Render one node as `[in]filter,filter[out]`.
pub fn render_node(node: &GraphNode) -> String {
    let inputs: String = node.inputs.iter().map(|pad| format!("[{pad}]")).collect();
    let outputs: String = node.outputs.iter().map(|pad| format!("[{pad}]")).collect();
    let chain = node
        .filters
        .iter()
        .map(render_filter)
        .collect::<Vec<_>>()
        .join(",");
    format!("{inputs}{chain}{outputs}")
}

/// Render a single filter with its options.
pub fn render_filter(filter: &Filter) -> String {
    match filter {
        Filter::Null => "null".to_string(),
        Filter::Format { pix_fmt } => format!("format={pix_fmt}"),
        Filter::SetSar => "setsar=1".to_string(),
        Filter::Trim { start, end } => {
            format!("trim=start={}:end={}", fmt_num(*start), fmt_num(*end))
        }
        Filter::TrimDuration { duration } => format!("trim=duration={}", fmt_num(*duration)),
        Filter::SetPts { offset } => {
            let offset = fmt_num(*offset);
            if offset == "0" {
                "setpts=PTS-STARTPTS".to_string()
            } else {
                format!("setpts=PTS-STARTPTS+{offset}/TB")
            }
        }
        Filter::Scale { width, height, fit } => {
            if *fit {
                format!("scale={width}:{height}:force_original_aspect_ratio=decrease")
            } else {
                format!("scale={width}:{height}")
            }
        }
        Filter::Pad { width, height } => {
            format!("pad={width}:{height}:(ow-iw)/2:(oh-ih)/2:color=black")
        }
        Filter::ColorChannelMixer { alpha } => format!("colorchannelmixer=aa={}", fmt_num(*alpha)),
        Filter::Rotate { degrees } => {
            let radians = fmt_num(degrees * PI / 180.0);
            format!("rotate=a={radians}:c=none:ow=rotw({radians}):oh=roth({radians})")
        }
        Filter::Overlay {
            x,
            y,
            center_in,
            gate,
        } => {
            let (x, y) = match center_in {
                Some((width, height)) => (format!("{x}-(w-{width})/2"), format!("{y}-(h-{height})/2")),
                None => (x.to_string(), y.to_string()),
            };
            format!("overlay=x={x}:y={y}:enable='{}'", gate.expression())
        }
        Filter::DrawText {
            text,
            font_file,
            font_size,
            color,
            x,
            y,
            gate,
        } => {
            let font = font_file
                .as_deref()
                .map(|path| format!("fontfile={}:", escape_value(path)))
                .unwrap_or_default();
            format!(
                "drawtext={font}text={}:expansion=none:fontsize={font_size}:fontcolor={color}:x={x}:y={y}:enable='{}'",
                escape_value(text),
                gate.expression()
            )
        }
        Filter::Split { outputs } => format!("split={outputs}"),
        Filter::PaletteGen => "palettegen".to_string(),
        Filter::PaletteUse => "paletteuse".to_string(),
    }
}

/// Simple `-vf` chain for the fast path: letterbox into the output size.
pub fn fast_path_filter(width: u32, height: u32, gif: bool) -> String {
    let chain = [
        Filter::Scale {
            width,
            height,
            fit: true,
        },
        Filter::Pad { width, height },
        Filter::SetSar,
    ]
    .iter()
    .map(render_filter)
    .collect::<Vec<_>>()
    .join(",");

    if gif {
        format!("{chain},split[pal_src][pal_gen];[pal_gen]palettegen[palette];[pal_src][palette]paletteuse")
    } else {
        chain
    }
}

/// Escape a string for use as a filter option value inside a graph.
pub fn escape_value(raw: &str) -> String {
    escape_chars(&escape_chars(raw, &['\\', '\'', ':']), &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_chars(raw: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
