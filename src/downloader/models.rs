// Common data models for the download pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Supported platforms. The set is closed: every dispatch is an exhaustive match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Facebook,
    Reddit,
    Youtube,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
            Self::Reddit => "reddit",
            Self::Youtube => "youtube",
        }
    }

    /// Content id used when the URL carries no recognizable id
    pub fn fallback_tag(&self) -> &'static str {
        match self {
            Self::Instagram => "insta",
            Self::Facebook => "fb",
            Self::Reddit => "reddit",
            Self::Youtube => "ytshort",
        }
    }

    /// Login page for platforms that need an authenticated session
    pub fn login_url(&self) -> Option<&'static str> {
        match self {
            Self::Facebook => Some("https://www.facebook.com/login"),
            _ => None,
        }
    }

    /// Cookie that only exists once the user is logged in
    pub fn login_marker_cookie(&self) -> Option<&'static str> {
        match self {
            Self::Facebook => Some("c_user"),
            _ => None,
        }
    }

    pub fn requires_login(&self) -> bool {
        self.login_url().is_some()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaMode {
    /// Download the video and sample it into frames
    #[default]
    Video,
    /// Download the post's images (or thumbnails)
    Images,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Video,
    Image,
    /// URL already points at raw media bytes
    DirectFile,
}

/// Result of URL classification. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub platform: Platform,
    pub content_id: String,
    pub kind: ContentKind,
    pub raw_url: String,
}

impl SourceDescriptor {
    /// Whether the content id came from the URL rather than the fallback tag
    pub fn has_content_id(&self) -> bool {
        self.content_id != self.platform.fallback_tag()
    }
}

/// What a strategy hands to the materializer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPayload {
    /// Already written to disk by an external extractor
    LocalFile(PathBuf),
    /// Remote resources, streamed by the materializer in order
    Remote(Vec<String>),
}

/// Transient output of one retrieval call
#[derive(Debug, Clone)]
pub struct RetrievedMedia {
    pub payload: MediaPayload,
    /// Extension (with leading dot) used when a URL path has none
    pub suggested_extension: String,
    pub source: SourceDescriptor,
}

impl RetrievedMedia {
    pub fn remote(source: &SourceDescriptor, urls: Vec<String>, suggested_extension: &str) -> Self {
        Self {
            payload: MediaPayload::Remote(urls),
            suggested_extension: suggested_extension.to_string(),
            source: source.clone(),
        }
    }

    pub fn local(source: &SourceDescriptor, path: PathBuf) -> Self {
        let suggested_extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| ".mp4".to_string());
        Self {
            payload: MediaPayload::LocalFile(path),
            suggested_extension,
            source: source.clone(),
        }
    }
}

/// Frames sampled from one video at one fps
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSet {
    pub source: PathBuf,
    pub fps: f64,
    /// Sorted by index: frame_0001, frame_0002, ...
    pub frames: Vec<PathBuf>,
}

impl FrameSet {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Summary of one end-to-end run
#[derive(Debug)]
pub struct DownloadReport {
    pub descriptor: SourceDescriptor,
    pub saved: Vec<PathBuf>,
    pub failed: usize,
    pub frames: Option<FrameSet>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_facebook_requires_login() {
        assert!(Platform::Facebook.requires_login());
        assert_eq!(Platform::Facebook.login_marker_cookie(), Some("c_user"));
        for p in [Platform::Instagram, Platform::Reddit, Platform::Youtube] {
            assert!(!p.requires_login());
        }
    }

    #[test]
    fn local_media_takes_extension_from_path() {
        let source = SourceDescriptor {
            platform: Platform::Youtube,
            content_id: "dQw4w9WgXcQ".into(),
            kind: ContentKind::Video,
            raw_url: "https://youtu.be/dQw4w9WgXcQ".into(),
        };
        let media = RetrievedMedia::local(&source, PathBuf::from("frames/youtube_dQw4w9WgXcQ.mp4"));
        assert_eq!(media.suggested_extension, ".mp4");
        assert!(source.has_content_id());
    }
}
