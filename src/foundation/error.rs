/// Convenience result type used across the converter.
pub type UgoiraResult<T> = Result<T, UgoiraError>;

/// Classification of a failed conversion.
///
/// Success is represented by `Ok(_)`, so there is no `Ok` kind here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or contradictory inputs.
    Usage,
    /// Artwork URL not in the accepted form, or the ID is not a non-negative integer.
    UrlInvalid,
    /// Meta file unreadable, or a bundled archive without `animation.json`.
    MetaCantOpen,
    /// Meta JSON unparseable or of the wrong shape.
    MetaInvalid,
    /// Supplied ZIP path does not exist.
    ZipCantOpen,
    /// Remote fetch returned non-200, failed in transport, or Pixiv reported an error.
    ReqFailed,
    /// A child process (`unzip` or `ffmpeg`) failed.
    CmdFailed,
    /// Scratch workspace could not be created, or another unexpected I/O failure.
    Internal,
}

impl ErrorKind {
    /// Process exit code used by the command-line front-end.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Usage => 1,
            ErrorKind::CmdFailed => 2,
            ErrorKind::MetaCantOpen => 3,
            ErrorKind::ZipCantOpen => 4,
            ErrorKind::MetaInvalid => 5,
            ErrorKind::ReqFailed => 6,
            ErrorKind::UrlInvalid => 7,
            ErrorKind::Internal => 8,
        }
    }
}

/// Top-level error taxonomy. Every variant carries a message fit for user display.
#[derive(thiserror::Error, Debug)]
pub enum UgoiraError {
    /// See [`ErrorKind::Usage`].
    #[error("{0}")]
    Usage(String),

    /// See [`ErrorKind::UrlInvalid`].
    #[error("{0}")]
    UrlInvalid(String),

    /// See [`ErrorKind::MetaCantOpen`].
    #[error("{0}")]
    MetaCantOpen(String),

    /// See [`ErrorKind::MetaInvalid`].
    #[error("{0}")]
    MetaInvalid(String),

    /// See [`ErrorKind::ZipCantOpen`].
    #[error("{0}")]
    ZipCantOpen(String),

    /// See [`ErrorKind::ReqFailed`].
    #[error("{0}")]
    ReqFailed(String),

    /// See [`ErrorKind::CmdFailed`].
    #[error("{0}")]
    CmdFailed(String),

    /// Failure to allocate the scratch workspace.
    #[error("workspace error: {0}")]
    Workspace(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UgoiraError {
    /// Build a [`UgoiraError::Usage`] value.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Build a [`UgoiraError::UrlInvalid`] value.
    pub fn url_invalid(msg: impl Into<String>) -> Self {
        Self::UrlInvalid(msg.into())
    }

    /// Build a [`UgoiraError::MetaCantOpen`] value.
    pub fn meta_cant_open(msg: impl Into<String>) -> Self {
        Self::MetaCantOpen(msg.into())
    }

    /// Build a [`UgoiraError::MetaInvalid`] value.
    pub fn meta_invalid(msg: impl Into<String>) -> Self {
        Self::MetaInvalid(msg.into())
    }

    /// Build a [`UgoiraError::ZipCantOpen`] value.
    pub fn zip_cant_open(msg: impl Into<String>) -> Self {
        Self::ZipCantOpen(msg.into())
    }

    /// Build a [`UgoiraError::ReqFailed`] value.
    pub fn req_failed(msg: impl Into<String>) -> Self {
        Self::ReqFailed(msg.into())
    }

    /// Build a [`UgoiraError::CmdFailed`] value.
    pub fn cmd_failed(msg: impl Into<String>) -> Self {
        Self::CmdFailed(msg.into())
    }

    /// Build a [`UgoiraError::Workspace`] value.
    pub fn workspace(msg: impl Into<String>) -> Self {
        Self::Workspace(msg.into())
    }

    /// Taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Usage(_) => ErrorKind::Usage,
            Self::UrlInvalid(_) => ErrorKind::UrlInvalid,
            Self::MetaCantOpen(_) => ErrorKind::MetaCantOpen,
            Self::MetaInvalid(_) => ErrorKind::MetaInvalid,
            Self::ZipCantOpen(_) => ErrorKind::ZipCantOpen,
            Self::ReqFailed(_) => ErrorKind::ReqFailed,
            Self::CmdFailed(_) => ErrorKind::CmdFailed,
            Self::Workspace(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }
}
