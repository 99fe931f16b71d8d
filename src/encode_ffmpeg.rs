use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    exec::{ToolCommand, ToolRunner},
    foundation::error::{UgoiraError, UgoiraResult},
    format::OutputFormat,
    stats::FrameStats,
};

/// Encoder binary looked up on `PATH`.
pub const FFMPEG: &str = "ffmpeg";

const GIF_FILTER: &str = "split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse=dither=sierra2";
const WEBM_MS_TIMEBASE_FILTER: &str = "settb=1/1000,setpts=PTS*0.001";

/// `<dest>.part`, the name the encoder writes before the final rename.
pub fn part_path(dest: &Path) -> PathBuf {
    let mut s = OsString::from(dest.as_os_str());
    s.push(".part");
    PathBuf::from(s)
}

/// Build the ffmpeg invocation that turns the concat script into `out_path`.
///
/// Constant-rate input gets `-r` on both sides and `-vsync cfr`, capped at the
/// container's [`OutputFormat::fps_limit`]. Variable-rate WebM reads millisecond
/// durations from the script, so the timestamps are rescaled back to seconds.
pub fn build_encode_command(
    concat_script: &Path,
    out_path: &Path,
    fmt: OutputFormat,
    stats: &FrameStats,
) -> ToolCommand {
    let mut cmd = ToolCommand::new(FFMPEG);
    cmd.args(["-loglevel", "error", "-y", "-f", "concat", "-safe", "0"]);

    if stats.is_constant {
        cmd.arg("-r").arg(format_rate(stats.const_fps));
    }

    cmd.arg("-i").arg(concat_script);

    match fmt {
        OutputFormat::Gif => {
            cmd.args(["-vf", GIF_FILTER, "-f", "gif"]);
        }
        OutputFormat::Webm => {
            cmd.args(["-f", "webm", "-c:v", "libvpx", "-b:v", "10M", "-crf", "4"]);
        }
    }

    cmd.args(["-fflags", "bitexact"]);
    cmd.arg("-vsync")
        .arg(if stats.is_constant { "cfr" } else { "vfr" });

    if stats.is_constant {
        cmd.arg("-r")
            .arg(format_rate(stats.const_fps.min(fmt.fps_limit())));
    }

    if fmt == OutputFormat::Webm && !stats.is_constant {
        cmd.args(["-enc_time_base", "1/1000", "-vf", WEBM_MS_TIMEBASE_FILTER]);
    }

    cmd.arg(out_path);
    cmd
}

/// Run the encoder. A failed or unstartable process is `CmdFailed`.
pub fn run_encoder(runner: &mut dyn ToolRunner, cmd: &ToolCommand) -> UgoiraResult<()> {
    tracing::debug!(command = %cmd, "encoding");
    let output = runner.run(cmd).map_err(|e| {
        UgoiraError::cmd_failed(format!(
            "failed to spawn {} (is it installed and on PATH?): {e}",
            cmd.program
        ))
    })?;

    if !output.success() {
        let detail = output.stderr.trim();
        return Err(UgoiraError::cmd_failed(if detail.is_empty() {
            "ffmpeg command failed".to_string()
        } else {
            format!("ffmpeg command failed: {detail}")
        }));
    }

    Ok(())
}

/// Create the destination's parent directory if needed.
pub fn ensure_parent_dir(path: &Path) -> UgoiraResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Rates print without a trailing `.0` for whole numbers (`25`, `12.5`).
fn format_rate(fps: f64) -> String {
    format!("{fps}")
}
