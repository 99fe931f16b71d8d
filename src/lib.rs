//! Convert Pixiv "ugoira" animations into a single GIF or WebM file.
//!
//! An ugoira is a ZIP of numbered still frames plus a per-frame delay table. This crate
//! resolves the inputs, lays the frames out for ffmpeg's concat demuxer, and drives the
//! encoder.
//!
//! # Pipeline overview
//!
//! 1. **Normalize**: a post URL/ID, a meta JSON (with or without a frames ZIP), or a
//!    bundled ugoira archive becomes decoded [`MetaInfo`] plus a directory of frames
//! 2. **Analyze**: the delay table becomes [`FrameStats`] (constant vs variable rate)
//! 3. **Script**: a concat-demuxer script with per-frame durations
//! 4. **Encode**: `ffmpeg` writes `<dest>.part`, renamed onto `<dest>` on success
//!
//! Everything runs synchronously on the calling thread. Scratch files live in a
//! per-conversion workspace under `<temp>/ugoira-convert/` that is always removed.
//!
//! ```no_run
//! use ugoira_convert::{Context, OutputFormat};
//!
//! let mut ctx = Context::new();
//! ctx.set_post_url("https://www.pixiv.net/en/artworks/44298467")?;
//! ctx.convert(std::path::Path::new("44298467.webm"), OutputFormat::Webm)?;
//! # Ok::<(), ugoira_convert::UgoiraError>(())
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod concat;
mod encode_ffmpeg;
mod exec;
mod fetch;
mod format;
mod foundation;
mod input;
mod meta;
mod normalize;
mod pipeline;
mod progress;
mod stats;
mod workspace;

pub use concat::{TAIL_DUPLICATION_FPS, render_concat_script, write_concat_script};
pub use encode_ffmpeg::{FFMPEG, build_encode_command, part_path};
pub use exec::{SystemRunner, ToolCommand, ToolOutput, ToolRunner, is_tool_on_path, unzip_command};
pub use fetch::{Fetcher, RequestOpts, Response, UreqFetcher};
pub use format::OutputFormat;
pub use foundation::error::{ErrorKind, UgoiraError, UgoiraResult};
pub use input::{InputState, PIXIV_REFERER, meta_url, parse_post_id, parse_post_url};
pub use meta::{Frame, MetaInfo, decode_meta, pixiv_error};
pub use pipeline::{Context, DEFAULT_USER_AGENT};
pub use progress::{Progress, ProgressEvent, ProgressSink};
pub use stats::FrameStats;
pub use workspace::{WORKSPACE_PARENT, WorkspaceGuard, WorkspaceManager};
