use std::{fmt, str::FromStr};

/// Target container of a conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Animated GIF with a generated palette.
    Gif,
    /// VP8 WebM.
    Webm,
}

impl OutputFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Gif => "gif",
            OutputFormat::Webm => "webm",
        }
    }

    /// Highest output frame rate passed to the encoder for this container.
    pub fn fps_limit(self) -> f64 {
        match self {
            OutputFormat::Gif => 50.0,
            OutputFormat::Webm => 60.0,
        }
    }

    /// Parse an extension (`gif` / `webm`), as used for output-path inference.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "gif" => Some(OutputFormat::Gif),
            "webm" => Some(OutputFormat::Webm),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| format!("Unrecognized format {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_parse_back() {
        for fmt in [OutputFormat::Gif, OutputFormat::Webm] {
            assert_eq!(OutputFormat::from_extension(fmt.extension()), Some(fmt));
        }
        assert_eq!(OutputFormat::from_extension("mp4"), None);
        assert_eq!(OutputFormat::from_extension("GIF"), None);
    }

    #[test]
    fn fps_limits() {
        assert_eq!(OutputFormat::Gif.fps_limit(), 50.0);
        assert_eq!(OutputFormat::Webm.fps_limit(), 60.0);
    }

    #[test]
    fn from_str_reports_the_input() {
        let err = "avi".parse::<OutputFormat>().unwrap_err();
        assert!(err.contains("avi"));
    }
}
