use std::path::Path;

use anyhow::Context as _;

use crate::{
    foundation::error::UgoiraResult, format::OutputFormat, meta::MetaInfo, stats::FrameStats,
};

/// Below this average rate the concat demuxer loses the last frame's duration in WebM
/// output, so the final frame is listed twice.
pub const TAIL_DUPLICATION_FPS: f64 = 5.0;

/// Render the ffmpeg concat-demuxer script for `meta`.
///
/// Durations are omitted for constant-rate input (the rate goes on the command line).
/// GIF durations are seconds with millisecond precision; WebM durations are raw
/// milliseconds because the encoder command rescales the time base by 1/1000.
pub fn render_concat_script(
    frames_dir: &Path,
    meta: &MetaInfo,
    stats: &FrameStats,
    fmt: OutputFormat,
) -> String {
    let mut out = String::new();

    for f in &meta.frames {
        push_file_line(&mut out, &frames_dir.join(&f.name));

        if !stats.is_constant {
            let line = match fmt {
                OutputFormat::Webm => format!("duration {}\n", f.delay_ms),
                OutputFormat::Gif => {
                    format!("duration {}.{:03}\n", f.delay_ms / 1000, f.delay_ms % 1000)
                }
            };
            out.push_str(&line);
        }
    }

    if fmt == OutputFormat::Webm
        && stats.avg_fps < TAIL_DUPLICATION_FPS
        && let Some(last) = meta.frames.last()
    {
        push_file_line(&mut out, &frames_dir.join(&last.name));
    }

    out
}

/// Render and write the concat script to `path`.
pub fn write_concat_script(
    path: &Path,
    frames_dir: &Path,
    meta: &MetaInfo,
    stats: &FrameStats,
    fmt: OutputFormat,
) -> UgoiraResult<()> {
    let script = render_concat_script(frames_dir, meta, stats, fmt);
    std::fs::write(path, script)
        .with_context(|| format!("failed to write concat script '{}'", path.display()))?;
    Ok(())
}

fn push_file_line(out: &mut String, path: &Path) {
    out.push_str("file ");
    out.push_str(&quote(&path.to_string_lossy()));
    out.push('\n');
}

/// Single-quote for the concat demuxer; an embedded `'` becomes `'\''`.
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
