use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde_json::Value;

use crate::{
    exec::{ToolRunner, unzip_command},
    fetch::{Fetcher, RequestOpts, Response},
    foundation::error::{UgoiraError, UgoiraResult},
    input::{InputState, PIXIV_REFERER, meta_url},
    meta::{MetaInfo, decode_meta, pixiv_error},
    progress::Progress,
    workspace::WorkspaceManager,
};

pub(crate) const FRAMES_DIR: &str = "frames";
pub(crate) const ZIP_NAME: &str = "ugoira.zip";
pub(crate) const BUNDLED_META: &str = "animation.json";

/// Inputs resolved to decoded meta plus a directory of extracted frames.
#[derive(Clone, Debug)]
pub(crate) struct Normalized {
    /// Decoded meta.
    pub meta: MetaInfo,
    /// Directory holding the extracted frame files.
    pub frames_dir: PathBuf,
}

/// Borrowed view of the context needed to resolve inputs.
pub(crate) struct Normalizer<'a> {
    pub fetcher: &'a mut dyn Fetcher,
    pub runner: &'a mut dyn ToolRunner,
    pub progress: &'a mut Progress,
    pub workspace: &'a WorkspaceManager,
    pub user_agent: &'a str,
    pub session_id: &'a str,
}

impl Normalizer<'_> {
    #[tracing::instrument(skip_all)]
    pub fn run(&mut self, input: InputState) -> UgoiraResult<Normalized> {
        let ws = self.workspace.acquire()?;
        let frames_dir = ws.path().join(FRAMES_DIR);

        let (meta, zip, extracted) = match input {
            InputState::Empty => {
                return Err(UgoiraError::usage(
                    "Post ID must be given if meta file is not",
                ));
            }
            InputState::Ugoira(archive) => {
                self.extract(&archive, &frames_dir)?;
                let meta_path = frames_dir.join(BUNDLED_META);
                if !meta_path.exists() {
                    return Err(UgoiraError::meta_cant_open(
                        "Ugoira file does not contain an animation.json",
                    ));
                }
                (load_meta_file(&meta_path)?, Some(archive), true)
            }
            InputState::Post(id) => (self.fetch_meta(id)?, None, false),
            InputState::Meta { meta, zip } => (meta, zip, false),
        };

        if let Some(message) = pixiv_error(&meta) {
            return Err(UgoiraError::req_failed(format!("Pixiv: {message}")));
        }

        let info = decode_meta(&meta)?;
        tracing::debug!(
            frames = info.frames.len(),
            zip_url = %info.zip_url,
            "meta decoded"
        );

        let zip = match zip {
            Some(zip) => zip,
            None => self.fetch_zip(&info.zip_url, ws.path())?,
        };

        if !extracted {
            self.extract(&zip, &frames_dir)?;
        }

        Ok(Normalized {
            meta: info,
            frames_dir,
        })
    }

    fn fetch_meta(&mut self, post_id: u64) -> UgoiraResult<Value> {
        let url = meta_url(post_id);
        tracing::debug!(%url, "fetching meta");
        let resp = self.pixiv_request(&url, "Downloading ugoira_meta");

        match serde_json::from_slice::<Value>(&resp.body) {
            Ok(v) => Ok(v),
            // An unparseable body next to a non-200 status is a network failure first.
            Err(_) if resp.status != 200 => Err(UgoiraError::req_failed(format!(
                "Failed to fetch ugoira meta info: {}",
                resp.failure_reason()
            ))),
            Err(e) => Err(UgoiraError::meta_invalid(format!(
                "Failed to parse JSON meta file: {e}"
            ))),
        }
    }

    fn fetch_zip(&mut self, zip_url: &str, workspace: &Path) -> UgoiraResult<PathBuf> {
        tracing::debug!(url = %zip_url, "fetching frames archive");
        let resp = self.pixiv_request(zip_url, "Downloading ugoira.zip");
        if resp.status != 200 {
            return Err(UgoiraError::req_failed(format!(
                "Failed to fetch ugoira frames (zip): {}",
                resp.failure_reason()
            )));
        }

        let zip_path = workspace.join(ZIP_NAME);
        std::fs::write(&zip_path, &resp.body)
            .with_context(|| format!("failed to write '{}'", zip_path.display()))?;
        Ok(zip_path)
    }

    /// GET with Pixiv's referer and session cookie, bracketed by progress events.
    fn pixiv_request(&mut self, url: &str, label: &str) -> Response {
        let cookies = session_cookie(self.session_id);
        let progress = &mut *self.progress;
        progress.starting(label);

        let mut forward = |total: u64, now: u64| progress.bytes(total, now);
        let resp = self.fetcher.get(
            url,
            RequestOpts {
                referer: PIXIV_REFERER,
                user_agent: self.user_agent,
                cookies: &cookies,
                progress: Some(&mut forward),
            },
        );

        progress.finished(resp.body.len() as u64);
        resp
    }

    fn extract(&mut self, zip: &Path, dest: &Path) -> UgoiraResult<()> {
        if !zip.exists() {
            return Err(UgoiraError::zip_cant_open(format!(
                "File doesn't exist: {}",
                zip.display()
            )));
        }

        std::fs::create_dir_all(dest)
            .with_context(|| format!("failed to create '{}'", dest.display()))?;

        let cmd = unzip_command(zip, dest);
        let output = self.runner.run(&cmd).map_err(|e| {
            UgoiraError::cmd_failed(format!(
                "failed to spawn unzip (is it installed and on PATH?): {e}"
            ))
        })?;
        if !output.success() {
            tracing::debug!(stderr = %output.stderr, "unzip failed");
            return Err(UgoiraError::cmd_failed("unzip command failed"));
        }
        Ok(())
    }
}

/// Read and parse a meta JSON file.
pub fn load_meta_file(path: &Path) -> UgoiraResult<Value> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        UgoiraError::meta_cant_open(format!(
            "Failed to open meta file: {} ({e})",
            path.display()
        ))
    })?;
    parse_meta_str(&text)
}

/// Parse meta JSON text.
pub fn parse_meta_str(text: &str) -> UgoiraResult<Value> {
    serde_json::from_str(text).map_err(|e| {
        UgoiraError::meta_invalid(format!("Failed to parse JSON meta file: {e}"))
    })
}

fn session_cookie(session_id: &str) -> String {
    if session_id.is_empty() {
        String::new()
    } else {
        format!("PHPSESSID={session_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn cookie_only_when_session_set() {
        assert_eq!(session_cookie(""), "");
        assert_eq!(session_cookie("abc_123"), "PHPSESSID=abc_123");
    }

    #[test]
    fn unreadable_meta_file() {
        let err = load_meta_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MetaCantOpen);
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn garbage_meta_text() {
        let err = parse_meta_str("{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MetaInvalid);
    }
}
