// Error types for the download pipeline

use thiserror::Error;

use super::extractors::diagnostics::diagnose_error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// URL does not belong to any supported platform
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    /// External binary (yt-dlp, instaloader, ffmpeg) not found on the host
    #[error("Tool not found: {0}")]
    ToolMissing(String),

    /// External binary ran but exited non-zero
    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// Extractor finished but the expected output file is absent
    #[error("Expected output not found: {0}")]
    NotFound(String),

    /// Interactive login did not complete (browser closed or cancelled)
    #[error("Login aborted: {0}")]
    LoginAborted(String),

    /// Navigation or selector wait exceeded its deadline
    #[error("Timed out waiting for page: {0}")]
    PageLoadTimeout(String),

    /// Page rendered but no fetchable video source was present
    #[error("No video found on page: {0}")]
    NoVideoFound(String),

    #[error("No images found: {0}")]
    NoImagesFound(String),

    /// None of the probed thumbnail qualities exist. Reported, not fatal.
    #[error("No thumbnails found for video {0}")]
    NoThumbnailsFound(String),

    /// Downloaded file is missing, empty or too small to be media
    #[error("Downloaded file seems invalid: {0}")]
    InvalidDownload(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    /// ffmpeg could not sample frames from the source video
    #[error("Frame extraction failed: {0}")]
    ExtractionError(String),

    #[error("Could not determine YouTube video id for {0}")]
    MissingVideoId(String),

    /// Browser engine failed to launch or a CDP call failed
    #[error("Browser error: {0}")]
    Browser(String),

    /// Stored session is unreadable or could not be written
    #[error("Session error: {0}")]
    Session(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Interrupted by the user (Ctrl-C)
    #[error("Cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Build a `ToolFailed` from captured stderr, prefixing the diagnosed reason
    /// and its hint when the output matches a known failure pattern.
    pub fn tool_failed(tool: &str, stderr: &str) -> Self {
        let details = stderr
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join(" | ");

        let message = match diagnose_error(stderr) {
            Some(reason) => format!("{}. {}\nDetails: {}", reason.description(), reason.hint(), details),
            None if details.is_empty() => "exited with an error and no output".to_string(),
            None => details,
        };

        Self::ToolFailed {
            tool: tool.to_string(),
            message,
        }
    }

    /// Whether the error should abort the run with a non-zero exit.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::NoThumbnailsFound(_))
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::NetworkError(format!("request timed out: {}", e));
        }
        Self::NetworkError(e.to_string())
    }
}

impl From<serde_json::Error> for DownloadError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<config::ConfigError> for DownloadError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
