// Page scraping shared by the browser-backed strategies

use serde::Deserialize;
use tokio::time::sleep;
use tracing::debug;

use super::browser::BrowserPage;
use super::errors::DownloadError;
use crate::config::Timeouts;

/// Resolved source of the first `<video>` element, or ""
pub const VIDEO_SRC_SCRIPT: &str = r#"(() => {
  const v = document.querySelector('video');
  if (!v) return '';
  const source = v.querySelector('source');
  return v.currentSrc || v.src || (source ? source.src : '') || '';
})()"#;

/// JSON array of `{src, alt}` for every `<img>`
pub const IMAGE_CANDIDATES_SCRIPT: &str = r#"JSON.stringify(
  Array.from(document.querySelectorAll('img')).map(i => ({
    src: i.currentSrc || i.src || '',
    alt: i.alt || ''
  }))
)"#;

/// href of `link[rel=canonical]`, or ""
pub const CANONICAL_LINK_SCRIPT: &str = r#"(() => {
  const l = document.querySelector('link[rel="canonical"]');
  return l ? l.href : '';
})()"#;

/// Images whose URL or alt text contains one of these are page chrome, not post content
const EXCLUDED_KEYWORDS: [&str; 3] = ["profile", "icon", "avatar"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageCandidate {
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

pub fn parse_candidates(json: &str) -> Result<Vec<ImageCandidate>, DownloadError> {
    Ok(serde_json::from_str(json)?)
}

/// Keep post images: http(s) sources, on the asset host when a marker is
/// given, none mentioning profile/icon/avatar. Order kept, duplicates dropped.
pub fn filter_post_images(candidates: &[ImageCandidate], host_marker: Option<&str>) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();

    for candidate in candidates {
        let src = candidate.src.trim();
        if !(src.starts_with("http://") || src.starts_with("https://")) {
            continue;
        }
        if let Some(marker) = host_marker {
            if !src.contains(marker) {
                continue;
            }
        }

        let src_lower = src.to_lowercase();
        let alt_lower = candidate.alt.to_lowercase();
        if EXCLUDED_KEYWORDS
            .iter()
            .any(|k| src_lower.contains(k) || alt_lower.contains(k))
        {
            continue;
        }

        if !kept.iter().any(|k| k == src) {
            kept.push(src.to_string());
        }
    }

    kept
}

/// A scraped video source the materializer can actually fetch
pub fn usable_video_src(src: &str, page_url: &str) -> Result<String, DownloadError> {
    let src = src.trim();
    if src.is_empty() {
        return Err(DownloadError::NoVideoFound(page_url.to_string()));
    }
    if src.starts_with("blob:") {
        return Err(DownloadError::NoVideoFound(format!(
            "{} (stream is a blob: URL and cannot be fetched)",
            page_url
        )));
    }
    Ok(src.to_string())
}

/// Load `url`, wait for a `<video>`, return its source
pub async fn scrape_video(
    page: &dyn BrowserPage,
    url: &str,
    timeouts: &Timeouts,
) -> Result<String, DownloadError> {
    page.goto(url, timeouts.page_load()).await?;
    page.wait_for_selector("video", timeouts.selector()).await?;
    let src = page.evaluate_string(VIDEO_SRC_SCRIPT).await?;
    debug!(src = %src, "video element source");
    usable_video_src(&src, url)
}

/// Load `url`, let lazy images settle, return filtered image URLs
pub async fn scrape_images(
    page: &dyn BrowserPage,
    url: &str,
    timeouts: &Timeouts,
    host_marker: Option<&str>,
) -> Result<Vec<String>, DownloadError> {
    page.goto(url, timeouts.image_page_load()).await?;
    sleep(timeouts.settle()).await;

    let raw = page.evaluate_string(IMAGE_CANDIDATES_SCRIPT).await?;
    let candidates = parse_candidates(&raw)?;
    let images = filter_post_images(&candidates, host_marker);
    debug!(candidates = candidates.len(), kept = images.len(), "image scrape");

    if images.is_empty() {
        return Err(DownloadError::NoImagesFound(url.to_string()));
    }
    Ok(images)
}
