//! Engine invocation building.
//!
//! Turns a fast-path plan or a composition graph plus export settings into
//! concrete engine arguments. The general path writes its graph to a
//! uniquely named script file so the command line stays short; the file is
//! owned by the returned [`EncoderInvocation`] and removed by
//! [`EncoderInvocation::cleanup`] (or on drop).

use std::io::Write;
use std::path::{Path, PathBuf};

use montage_common::config::EngineConfig;
use montage_common::error::MontageResult;
use montage_project_model::export::{AudioCodec, ExportFormat, ExportOptions};
use tempfile::TempPath;

use crate::fast_path::FastPathPlan;
use crate::geometry::fmt_num;
use crate::graph::{CompositionGraph, InputKind};
use crate::script::{fast_path_filter, render_graph};

/// Concrete arguments for one engine run, plus the temp resources it owns.
#[derive(Debug)]
pub struct EncoderInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Where the engine writes the export.
    pub output_path: PathBuf,
    /// File name component of `output_path`.
    pub file_name: String,
    script: Option<TempPath>,
}

impl EncoderInvocation {
    /// Graph script handed to the engine, if this is a general-path run.
    pub fn script_path(&self) -> Option<&Path> {
        self.script.as_deref()
    }

    /// Shell-style rendering of the command, for logs and dry runs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .map(|arg| shell_quote(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Delete the graph script. Failures are logged, never returned.
    pub fn cleanup(&mut self) {
        let Some(script) = self.script.take() else {
            return;
        };
        let path = script.to_path_buf();
        match script.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed graph script"),
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "Failed to remove graph script")
            }
        }
    }
}

/// Builds engine invocations from an explicit engine configuration.
#[derive(Debug, Clone)]
pub struct InvocationBuilder {
    binary: PathBuf,
    temp_dir: PathBuf,
    output_dir: PathBuf,
}

impl InvocationBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            temp_dir: config.temp_dir.clone(),
            output_dir: config.output_dir.clone(),
        }
    }

    /// Direct trim-and-scale of a single source. Touches no files.
    pub fn fast_path(&self, plan: &FastPathPlan, options: &ExportOptions) -> EncoderInvocation {
        let file_name = output_file_name(&options.title, options.format);
        let output_path = self.output_dir.join(&file_name);

        let mut args = leading_args();
        args.extend(strings([
            "-ss",
            &fmt_num(plan.in_point),
            "-t",
            &fmt_num(plan.clip_duration),
            "-i",
            &plan.source,
            "-vf",
            &fast_path_filter(options.width, options.height, options.format == ExportFormat::Gif),
            "-map",
            "0:v:0",
        ]));
        if options.format.has_audio() {
            args.extend(strings(["-map", "0:a:0?"]));
        }
        args.extend(strings(["-r", &options.fps.to_string()]));
        args.extend(codec_args(options));
        args.push(output_path.display().to_string());

        EncoderInvocation {
            program: self.binary.clone(),
            args,
            output_path,
            file_name,
            script: None,
        }
    }

    /// Full graph run: synthetic backdrop, one input per asset, script file.
    pub fn general(
        &self,
        graph: &CompositionGraph,
        options: &ExportOptions,
    ) -> MontageResult<EncoderInvocation> {
        let file_name = output_file_name(&options.title, options.format);
        let output_path = self.output_dir.join(&file_name);
        let fps = options.fps.to_string();
        let duration = fmt_num(graph.duration);

        let mut args = leading_args();
        args.extend(strings([
            "-f",
            "lavfi",
            "-i",
            &format!(
                "color=c={}:s={}x{}:r={fps}:d={duration}",
                graph.background, options.width, options.height
            ),
        ]));
        for input in &graph.inputs {
            if input.kind == InputKind::Image {
                args.extend(strings(["-loop", "1", "-framerate", &fps]));
            }
            args.extend(strings(["-i", &input.locator]));
        }
        // Dedicated audio input, seeked and shifted like the clip's picture.
        let audio_index = graph.audio.as_ref().map(|audio| {
            args.extend(strings([
                "-ss",
                &fmt_num(audio.in_point),
                "-t",
                &fmt_num(audio.duration),
            ]));
            if audio.offset > 0.0 {
                args.extend(strings(["-itsoffset", &fmt_num(audio.offset)]));
            }
            args.extend(strings(["-i", &audio.locator]));
            graph.inputs.len() + 1
        });

        let script = self.write_script(graph)?;
        args.extend(strings([
            "-filter_complex_script",
            &script.display().to_string(),
            "-map",
            &format!("[{}]", graph.video_out),
        ]));
        if let Some(index) = audio_index {
            args.extend(strings(["-map", &format!("{index}:a?")]));
        }
        args.extend(strings(["-t", &duration, "-r", &fps]));
        args.extend(codec_args(options));
        args.push(output_path.display().to_string());

        Ok(EncoderInvocation {
            program: self.binary.clone(),
            args,
            output_path,
            file_name,
            script: Some(script),
        })
    }

    fn write_script(&self, graph: &CompositionGraph) -> MontageResult<TempPath> {
        let mut file = tempfile::Builder::new()
            .prefix("montage-graph-")
            .suffix(".txt")
            .tempfile_in(&self.temp_dir)?;
        file.write_all(render_graph(graph).as_bytes())?;
        file.flush()?;
        Ok(file.into_temp_path())
    }
}

fn leading_args() -> Vec<String> {
    strings(["-y", "-hide_banner", "-loglevel", "error", "-nostats"])
}

fn strings<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Map a requested codec (or alias) to an engine encoder name.
pub fn video_encoder(requested: &str) -> String {
    match requested.trim().to_ascii_lowercase().as_str() {
        "" | "h264" | "avc" => "libx264".to_string(),
        "h265" | "hevc" => "libx265".to_string(),
        "prores" => "prores_ks".to_string(),
        other => other.to_string(),
    }
}

/// Codec and container options for `options`.
pub fn codec_args(options: &ExportOptions) -> Vec<String> {
    if options.format == ExportFormat::Gif {
        return strings(["-an", "-loop", "0"]);
    }

    let encoder = video_encoder(&options.video_codec);
    let pix_fmt = if encoder.starts_with("prores") {
        "yuv422p10le"
    } else {
        "yuv420p"
    };

    let mut args = strings(["-c:v", &encoder, "-pix_fmt", pix_fmt]);
    if options.video_bitrate_kbps > 0 {
        args.extend(strings(["-b:v", &format!("{}k", options.video_bitrate_kbps)]));
    }
    match options.audio_codec {
        AudioCodec::Aac => args.extend(strings([
            "-c:a",
            "aac",
            "-b:a",
            &format!("{}k", options.audio_bitrate_kbps.max(32)),
        ])),
        AudioCodec::Pcm => args.extend(strings(["-c:a", "pcm_s16le"])),
    }
    if options.audio_sample_rate > 0 {
        args.extend(strings(["-ar", &options.audio_sample_rate.to_string()]));
    }
    if options.format == ExportFormat::Mp4 {
        args.extend(strings(["-movflags", "+faststart"]));
    }
    args
}

/// `title` with whitespace collapsed, a random suffix, and the extension.
pub fn output_file_name(title: &str, format: ExportFormat) -> String {
    let stem = title
        .split_whitespace()
        .map(|word| word.replace(['/', '\\'], ""))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    let stem = if stem.is_empty() { "export".to_string() } else { stem };
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{stem}-{}.{}", &suffix[..8], format.extension())
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(format: ExportFormat) -> ExportOptions {
        ExportOptions {
            width: 1280,
            height: 720,
            fps: 30,
            title: "Quarterly   review\tcut".to_string(),
            format,
            ..ExportOptions::default()
        }
    }

    fn builder(dir: &Path) -> InvocationBuilder {
        InvocationBuilder::new(&EngineConfig {
            binary: PathBuf::from("/usr/bin/ffmpeg"),
            temp_dir: dir.to_path_buf(),
            output_dir: dir.join("out"),
            ..EngineConfig::default()
        })
    }

    #[test]
    fn test_output_file_name_collapses_whitespace() {
        let name = output_file_name("  Quarterly   review\tcut ", ExportFormat::Mov);
        assert!(name.starts_with("Quarterly_review_cut-"));
        assert!(name.ends_with(".mov"));
        assert_eq!(name.len(), "Quarterly_review_cut-".len() + 8 + ".mov".len());

        assert!(output_file_name("", ExportFormat::Gif).starts_with("export-"));
        assert!(!output_file_name("../../etc/x", ExportFormat::Mp4).contains('/'));
        assert_ne!(
            output_file_name("same", ExportFormat::Mp4),
            output_file_name("same", ExportFormat::Mp4)
        );
    }

    #[test]
    fn test_codec_args_for_mp4_aac() {
        let args = codec_args(&options(ExportFormat::Mp4));
        assert_eq!(
            args,
            vec![
                "-c:v", "libx264", "-pix_fmt", "yuv420p", "-b:v", "8000k", "-c:a", "aac", "-b:a",
                "192k", "-ar", "48000", "-movflags", "+faststart"
            ]
        );
    }

    #[test]
    fn test_codec_args_for_mov_pcm_prores() {
        let mut opts = options(ExportFormat::Mov);
        opts.video_codec = "prores".to_string();
        opts.audio_codec = AudioCodec::Pcm;
        opts.video_bitrate_kbps = 0;
        let args = codec_args(&opts);
        assert_eq!(
            args,
            vec!["-c:v", "prores_ks", "-pix_fmt", "yuv422p10le", "-c:a", "pcm_s16le", "-ar", "48000"]
        );
    }

    #[test]
    fn test_gif_drops_audio() {
        assert_eq!(codec_args(&options(ExportFormat::Gif)), vec!["-an", "-loop", "0"]);
    }

    #[test]
    fn test_video_encoder_aliases() {
        assert_eq!(video_encoder("H264"), "libx264");
        assert_eq!(video_encoder("hevc"), "libx265");
        assert_eq!(video_encoder("libvpx-vp9"), "libvpx-vp9");
    }

    #[test]
    fn test_fast_path_invocation() {
        let dir = std::env::temp_dir().join("montage_test_fast_invocation");
        let plan = FastPathPlan {
            source: "https://cdn.example.com/a.mp4".to_string(),
            in_point: 2.0,
            clip_duration: 10.0,
        };
        let mut invocation = builder(&dir).fast_path(&plan, &options(ExportFormat::Mp4));

        assert!(invocation.script_path().is_none());
        assert_eq!(&invocation.args[5..9], &["-ss", "2", "-t", "10"]);
        assert_eq!(invocation.args[10], "https://cdn.example.com/a.mp4");
        assert!(invocation.args.contains(&"0:a:0?".to_string()));
        assert!(invocation.file_name.ends_with(".mp4"));
        assert_eq!(invocation.output_path, dir.join("out").join(&invocation.file_name));
        assert_eq!(invocation.args.last().unwrap(), &invocation.output_path.display().to_string());
        invocation.cleanup();
    }

    #[test]
    fn test_general_audio_follows_the_trimmed_clip() {
        use crate::graph::{AudioSource, MediaInput, VIDEO_OUT};

        let dir = std::env::temp_dir().join("montage_test_general_audio");
        std::fs::create_dir_all(&dir).unwrap();
        let graph = CompositionGraph {
            inputs: vec![MediaInput {
                index: 1,
                kind: InputKind::Video,
                asset_id: "v".to_string(),
                locator: "https://x/v.mp4".to_string(),
                uses: 1,
            }],
            nodes: vec![],
            video_out: VIDEO_OUT.to_string(),
            audio: Some(AudioSource {
                locator: "https://x/v.mp4".to_string(),
                in_point: 2.0,
                duration: 10.0,
                offset: 1.5,
            }),
            duration: 11.5,
            background: "black".to_string(),
        };

        let mut invocation = builder(&dir).general(&graph, &options(ExportFormat::Mp4)).unwrap();
        let args = &invocation.args;
        let audio_at = args.iter().rposition(|arg| arg == "https://x/v.mp4").unwrap();
        assert_eq!(
            &args[audio_at - 7..=audio_at],
            &["-ss", "2", "-t", "10", "-itsoffset", "1.5", "-i", "https://x/v.mp4"]
        );
        assert!(args.windows(2).any(|pair| pair == ["-map", "2:a?"]));
        invocation.cleanup();
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("-map"), "-map");
        assert_eq!(shell_quote("[vout]"), "'[vout]'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }
}
