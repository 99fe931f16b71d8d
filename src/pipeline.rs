use std::{
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    concat::write_concat_script,
    encode_ffmpeg::{build_encode_command, ensure_parent_dir, part_path, run_encoder},
    exec::{SystemRunner, ToolRunner},
    fetch::{Fetcher, UreqFetcher},
    foundation::error::{UgoiraError, UgoiraResult},
    format::OutputFormat,
    input::{InputState, parse_post_url},
    normalize::{Normalized, Normalizer, load_meta_file, parse_meta_str},
    progress::{Progress, ProgressEvent},
    stats::FrameStats,
    workspace::WorkspaceManager,
};

/// Firefox 91 on Linux.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:91.0) Gecko/20100101 Firefox/91.0";

const CONCAT_SCRIPT: &str = "ffmpeg_input.txt";

/// A conversion context: configuration, pending inputs, and the tool backends.
///
/// Inputs are consumed by [`convert`](Self::convert) and are empty afterwards whatever the
/// outcome. One context serves one conversion at a time; use a context per thread.
pub struct Context {
    fetcher: Box<dyn Fetcher>,
    runner: Box<dyn ToolRunner>,
    user_agent: String,
    session_id: String,
    input: InputState,
    progress: Progress,
    workspace: WorkspaceManager,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Context using HTTP via `ureq` and the system `unzip` / `ffmpeg`.
    pub fn new() -> Self {
        Self::with_backends(Box::new(UreqFetcher::default()), Box::new(SystemRunner))
    }

    /// Context with injected fetcher and tool runner.
    pub fn with_backends(fetcher: Box<dyn Fetcher>, runner: Box<dyn ToolRunner>) -> Self {
        Self {
            fetcher,
            runner,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            session_id: String::new(),
            input: InputState::Empty,
            progress: Progress::default(),
            workspace: WorkspaceManager::default(),
        }
    }

    /// Override the `User-Agent` sent to Pixiv.
    pub fn set_user_agent(&mut self, ua: impl Into<String>) {
        self.user_agent = ua.into();
    }

    /// Forward `PHPSESSID=<sid>` with Pixiv requests. Empty disables the cookie.
    pub fn set_session_id(&mut self, sid: impl Into<String>) {
        self.session_id = sid.into();
    }

    /// Directory under which `ugoira-convert/<random>` workspaces are created.
    pub fn set_temp_root(&mut self, root: impl Into<PathBuf>) {
        self.workspace.set_temp_root(root);
    }

    /// Select the post from an artwork URL.
    pub fn set_post_url(&mut self, url: &str) -> UgoiraResult<()> {
        let id = parse_post_url(url)?;
        self.input.set_post(id)
    }

    /// Select the post by ID.
    pub fn set_post_id(&mut self, id: u64) -> UgoiraResult<()> {
        self.input.set_post(id)
    }

    /// Load meta JSON from a file.
    pub fn set_meta_path(&mut self, path: &Path) -> UgoiraResult<()> {
        let meta = load_meta_file(path)?;
        self.input.set_meta(meta)
    }

    /// Load meta JSON from a reader.
    pub fn set_meta_reader(&mut self, mut reader: impl Read) -> UgoiraResult<()> {
        let mut text = String::new();
        reader.read_to_string(&mut text).map_err(|e| {
            UgoiraError::meta_cant_open(format!("Failed to read meta file: {e}"))
        })?;
        self.set_meta_str(&text)
    }

    /// Load meta JSON from a string.
    pub fn set_meta_str(&mut self, meta: &str) -> UgoiraResult<()> {
        let meta = parse_meta_str(meta)?;
        self.input.set_meta(meta)
    }

    /// Use a pre-downloaded frames ZIP. Requires meta to be set first.
    pub fn set_zip(&mut self, path: impl Into<PathBuf>) -> UgoiraResult<()> {
        self.input.set_zip(path.into())
    }

    /// Use a self-contained ugoira archive (frames + `animation.json`).
    pub fn set_ugoira(&mut self, path: impl Into<PathBuf>) -> UgoiraResult<()> {
        self.input.set_ugoira(path.into())
    }

    /// Post ID of the pending input, if it is a post.
    pub fn post_id(&self) -> Option<u64> {
        self.input.post_id()
    }

    /// Pending input.
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Enable or suppress progress events.
    pub fn show_progress(&mut self, yes: bool) {
        self.progress.set_enabled(yes);
    }

    /// Install the progress callback.
    pub fn set_progress_sink(&mut self, sink: impl FnMut(ProgressEvent) + 'static) {
        self.progress.set_sink(Box::new(sink));
    }

    /// Convert the pending input into `dest`.
    ///
    /// The encoder writes `<dest>.part`, which is renamed onto `dest` only after the
    /// encoder reports success. The workspace is removed on every exit path.
    #[tracing::instrument(skip_all, fields(dest = %dest.display(), fmt = %fmt))]
    pub fn convert(&mut self, dest: &Path, fmt: OutputFormat) -> UgoiraResult<()> {
        let input = std::mem::take(&mut self.input);
        let ws = self.workspace.acquire()?;

        let normalized = Normalizer {
            fetcher: self.fetcher.as_mut(),
            runner: self.runner.as_mut(),
            progress: &mut self.progress,
            workspace: &self.workspace,
            user_agent: &self.user_agent,
            session_id: &self.session_id,
        }
        .run(input)?;

        self.encode(&normalized, ws.path(), dest, fmt)
    }

    fn encode(
        &mut self,
        normalized: &Normalized,
        workspace: &Path,
        dest: &Path,
        fmt: OutputFormat,
    ) -> UgoiraResult<()> {
        let stats = FrameStats::analyze(&normalized.meta);
        tracing::debug!(
            avg_fps = stats.avg_fps,
            is_constant = stats.is_constant,
            const_fps = stats.const_fps,
            "frame stats"
        );

        let concat_path = workspace.join(CONCAT_SCRIPT);
        write_concat_script(
            &concat_path,
            &normalized.frames_dir,
            &normalized.meta,
            &stats,
            fmt,
        )?;

        ensure_parent_dir(dest)?;
        let dest_part = part_path(dest);
        let cmd = build_encode_command(&concat_path, &dest_part, fmt, &stats);

        self.progress.message(format!("Encoding to {}", fmt.extension()));

        if let Err(e) = run_encoder(self.runner.as_mut(), &cmd) {
            remove_stale(&dest_part);
            return Err(e);
        }

        std::fs::rename(&dest_part, dest)
            .with_context(|| {
                format!(
                    "failed to move '{}' to '{}'",
                    dest_part.display(),
                    dest.display()
                )
            })
            .inspect_err(|_| remove_stale(&dest_part))?;

        Ok(())
    }
}

fn remove_stale(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove partial output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    struct Unreachable;

    impl Fetcher for Unreachable {
        fn get(&mut self, url: &str, _: crate::fetch::RequestOpts<'_>) -> crate::fetch::Response {
            panic!("unexpected fetch of {url}");
        }
    }

    impl ToolRunner for Unreachable {
        fn run(&mut self, cmd: &crate::exec::ToolCommand) -> std::io::Result<crate::exec::ToolOutput> {
            panic!("unexpected run of {cmd}");
        }
    }

    fn ctx(root: &Path) -> Context {
        let mut c = Context::with_backends(Box::new(Unreachable), Box::new(Unreachable));
        c.set_temp_root(root);
        c
    }

    #[test]
    fn no_input_is_usage_error_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let mut c = ctx(root.path());
        let err = c
            .convert(&root.path().join("out.gif"), OutputFormat::Gif)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(
            std::fs::read_dir(root.path().join("ugoira-convert"))
                .unwrap()
                .count(),
            0
        );
    }

    #[test]
    fn missing_zip_is_zip_cant_open_and_input_is_cleared() {
        let root = tempfile::tempdir().unwrap();
        let mut c = ctx(root.path());
        c.set_meta_str(r#"{"originalSrc": "u", "frames": [{"file": "a.jpg", "delay": 40}]}"#)
            .unwrap();
        c.set_zip(root.path().join("missing.zip")).unwrap();

        let err = c
            .convert(&root.path().join("out.webm"), OutputFormat::Webm)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ZipCantOpen);
        assert!(c.input().is_empty());
    }

    #[test]
    fn setters_surface_parse_errors() {
        let root = tempfile::tempdir().unwrap();
        let mut c = ctx(root.path());
        assert_eq!(
            c.set_post_url("https://pixiv.net/en/artworks/1")
                .unwrap_err()
                .kind(),
            ErrorKind::UrlInvalid
        );
        assert_eq!(
            c.set_meta_reader("{".as_bytes()).unwrap_err().kind(),
            ErrorKind::MetaInvalid
        );
        c.set_post_url("https://www.pixiv.net/en/artworks/12345")
            .unwrap();
        assert_eq!(c.post_id(), Some(12345));
    }
}
