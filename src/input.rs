use std::path::PathBuf;

use serde_json::Value;

use crate::foundation::error::{UgoiraError, UgoiraResult};

const ARTWORK_BASE: &str = "www.pixiv.net/en/artworks/";

/// Referer sent with every Pixiv request.
pub const PIXIV_REFERER: &str = "https://www.pixiv.net/";

/// Parse `[http[s]://]www.pixiv.net/en/artworks/<digits>` into a post ID.
pub fn parse_post_url(url: &str) -> UgoiraResult<u64> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    let Some(id) = rest.strip_prefix(ARTWORK_BASE) else {
        return Err(UgoiraError::url_invalid(format!(
            "Invalid artwork URL (must be in the form [http(s)://]{ARTWORK_BASE}<ID>)"
        )));
    };

    parse_post_id(id).ok_or_else(|| {
        UgoiraError::url_invalid("Invalid artwork URL (ID is not a non-negative integer)")
    })
}

/// Parse a bare decimal post ID: ASCII digits only, no sign, fits in `u64`.
pub fn parse_post_id(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Pixiv AJAX endpoint for a post's ugoira meta.
pub fn meta_url(post_id: u64) -> String {
    format!("https://www.pixiv.net/ajax/illust/{post_id}/ugoira_meta?lang=en")
}

/// Which inputs a conversion starts from.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum InputState {
    /// Nothing supplied yet.
    #[default]
    Empty,
    /// Fetch meta and frames for this post.
    Post(u64),
    /// Pre-parsed meta JSON, optionally with a pre-downloaded frames ZIP.
    Meta {
        /// Parsed meta (wrapped or bare form).
        meta: Value,
        /// Local frames archive; fetched from the meta's URL when absent.
        zip: Option<PathBuf>,
    },
    /// Self-contained archive holding frames and `animation.json`.
    Ugoira(PathBuf),
}

impl InputState {
    /// Post ID, when the input is a post.
    pub fn post_id(&self) -> Option<u64> {
        match self {
            InputState::Post(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether no input has been supplied.
    pub fn is_empty(&self) -> bool {
        matches!(self, InputState::Empty)
    }

    pub(crate) fn set_post(&mut self, id: u64) -> UgoiraResult<()> {
        match self {
            InputState::Empty | InputState::Post(_) => {
                *self = InputState::Post(id);
                Ok(())
            }
            InputState::Meta { .. } => Err(UgoiraError::usage(
                "A post ID doesn't make sense together with a meta file",
            )),
            InputState::Ugoira(_) => Err(UgoiraError::usage(
                "A post ID doesn't make sense together with an ugoira file",
            )),
        }
    }

    pub(crate) fn set_meta(&mut self, meta: Value) -> UgoiraResult<()> {
        match self {
            InputState::Empty => {
                *self = InputState::Meta { meta, zip: None };
                Ok(())
            }
            InputState::Meta { meta: current, .. } => {
                *current = meta;
                Ok(())
            }
            InputState::Post(_) => Err(UgoiraError::usage(
                "A meta file doesn't make sense together with a post ID",
            )),
            InputState::Ugoira(_) => Err(UgoiraError::usage(
                "A meta file doesn't make sense together with an ugoira file",
            )),
        }
    }

    pub(crate) fn set_zip(&mut self, path: PathBuf) -> UgoiraResult<()> {
        match self {
            InputState::Meta { zip, .. } => {
                *zip = Some(path);
                Ok(())
            }
            _ => Err(UgoiraError::usage(
                "A zip file can only be supplied together with a meta file",
            )),
        }
    }

    pub(crate) fn set_ugoira(&mut self, path: PathBuf) -> UgoiraResult<()> {
        match self {
            InputState::Empty | InputState::Ugoira(_) => {
                *self = InputState::Ugoira(path);
                Ok(())
            }
            _ => Err(UgoiraError::usage(
                "An ugoira file can't be combined with a post ID or meta file",
            )),
        }
    }
}
