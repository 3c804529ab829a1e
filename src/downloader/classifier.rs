// URL classification: raw URL + requested mode -> SourceDescriptor
//
// Rules are checked in a fixed order and the first match wins, so a reel URL
// that happens to end in ".mp4" is still treated as a reel.

use lazy_static::lazy_static;
use regex::Regex;

use super::errors::DownloadError;
use super::models::{ContentKind, MediaMode, Platform, SourceDescriptor};
use super::utils::{is_direct_image, is_direct_video};

lazy_static! {
    static ref INSTAGRAM_REEL: Regex = Regex::new(r"(?i)instagram\.com/reel/([^/?#&]+)").unwrap();
    static ref FACEBOOK_REEL: Regex = Regex::new(r"(?i)facebook\.com/reel/([^/?#&]+)").unwrap();
    static ref INSTAGRAM_POST: Regex =
        Regex::new(r"(?i)instagram\.com/(?:[^/?#]+/)?(?:p|tv|reels?)/([^/?#&]+)").unwrap();
    static ref FACEBOOK_POST: Regex =
        Regex::new(r"(?i)facebook\.com/(?:.*?/)?(?:videos|posts)/(?:[^/?#]+/)?([0-9A-Za-z]+)").unwrap();
    static ref FACEBOOK_QUERY_ID: Regex =
        Regex::new(r"[?&](?:v|story_fbid|fbid)=([0-9]+)").unwrap();
    static ref REDDIT_COMMENTS: Regex = Regex::new(r"/comments/([A-Za-z0-9]+)").unwrap();
    static ref REDDIT_VIDEO_SLUG: Regex = Regex::new(r"(?i)v\.redd\.it/([A-Za-z0-9]+)").unwrap();
    static ref YOUTUBE_ID: Regex =
        Regex::new(r"(?:v=|youtu\.be/|/shorts/)([A-Za-z0-9_-]{11})").unwrap();
}

const REDDIT_HOSTS: [&str; 4] = ["reddit.com", "v.redd.it", "preview.redd.it", "i.redd.it"];
const YOUTUBE_HOSTS: [&str; 3] = ["youtube.com/shorts/", "youtube.com", "youtu.be"];

/// Map a URL to its platform, content id and kind.
pub fn classify(raw_url: &str, mode: MediaMode) -> Result<SourceDescriptor, DownloadError> {
    let url = raw_url.trim();
    let lower = url.to_ascii_lowercase();

    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Err(DownloadError::UnsupportedUrl(raw_url.to_string()));
    }

    let kind = match mode {
        MediaMode::Video => ContentKind::Video,
        MediaMode::Images => ContentKind::Image,
    };

    let descriptor = |platform: Platform, content_id: String, kind: ContentKind| SourceDescriptor {
        platform,
        content_id,
        kind,
        raw_url: url.to_string(),
    };

    if lower.contains("instagram.com/reel/") {
        let id = capture(&INSTAGRAM_REEL, url).unwrap_or_else(|| fallback(Platform::Instagram));
        return Ok(descriptor(Platform::Instagram, id, kind));
    }

    if lower.contains("facebook.com/reel/") {
        let id = capture(&FACEBOOK_REEL, url).unwrap_or_else(|| fallback(Platform::Facebook));
        return Ok(descriptor(Platform::Facebook, id, kind));
    }

    if is_direct_video(url) || is_direct_image(url) {
        let platform = platform_token(&lower).unwrap_or(Platform::Reddit);
        let id = content_id_for(platform, url);
        return Ok(descriptor(platform, id, ContentKind::DirectFile));
    }

    if REDDIT_HOSTS.iter().any(|h| lower.contains(h)) {
        return Ok(descriptor(Platform::Reddit, content_id_for(Platform::Reddit, url), kind));
    }

    if YOUTUBE_HOSTS.iter().any(|h| lower.contains(h)) {
        return Ok(descriptor(Platform::Youtube, content_id_for(Platform::Youtube, url), kind));
    }

    if lower.contains("instagram.com") {
        return Ok(descriptor(
            Platform::Instagram,
            content_id_for(Platform::Instagram, url),
            kind,
        ));
    }

    if lower.contains("facebook.com") {
        return Ok(descriptor(
            Platform::Facebook,
            content_id_for(Platform::Facebook, url),
            kind,
        ));
    }

    Err(DownloadError::UnsupportedUrl(raw_url.to_string()))
}

/// Extract an 11-character YouTube video id, if the URL carries one
pub fn youtube_id(url: &str) -> Option<String> {
    capture(&YOUTUBE_ID, url)
}

fn content_id_for(platform: Platform, url: &str) -> String {
    let id = match platform {
        Platform::Instagram => capture(&INSTAGRAM_POST, url),
        Platform::Facebook => {
            capture(&FACEBOOK_POST, url).or_else(|| capture(&FACEBOOK_QUERY_ID, url))
        }
        Platform::Reddit => {
            capture(&REDDIT_COMMENTS, url).or_else(|| capture(&REDDIT_VIDEO_SLUG, url))
        }
        Platform::Youtube => youtube_id(url),
    };
    id.unwrap_or_else(|| fallback(platform))
}

/// Platform named anywhere in a direct media URL (CDN hosts included)
fn platform_token(lower: &str) -> Option<Platform> {
    if lower.contains("instagram") || lower.contains("cdninstagram") {
        Some(Platform::Instagram)
    } else if lower.contains("facebook") || lower.contains("fbcdn") {
        Some(Platform::Facebook)
    } else if lower.contains("youtube") || lower.contains("youtu.be") || lower.contains("ytimg") {
        Some(Platform::Youtube)
    } else if lower.contains("reddit") || lower.contains("redd.it") {
        Some(Platform::Reddit)
    } else {
        None
    }
}

fn capture(re: &Regex, url: &str) -> Option<String> {
    re.captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}

fn fallback(platform: Platform) -> String {
    platform.fallback_tag().to_string()
}
