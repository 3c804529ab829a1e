use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::{BrowserAccess, DirectFileStrategy};
use crate::downloader::browser::close_after;
use crate::downloader::classifier::youtube_id;
use crate::downloader::errors::DownloadError;
use crate::downloader::extractors::MediaExtractor;
use crate::downloader::models::{ContentKind, RetrievedMedia, SourceDescriptor};
use crate::downloader::scrape::CANONICAL_LINK_SCRIPT;
use crate::downloader::session::Session;
use crate::downloader::traits::RetrievalStrategy;

/// Probe order, best first
pub const THUMBNAIL_QUALITIES: [&str; 4] = ["maxresdefault", "hqdefault", "sddefault", "mqdefault"];

/// Every thumbnail quality that answers with a success status.
/// Failed probes are skipped; an empty result is left to the caller.
pub async fn probe_thumbnails(client: &reqwest::Client, base: &str, video_id: &str) -> Vec<String> {
    let base = base.trim_end_matches('/');
    let mut found = Vec::new();

    for quality in THUMBNAIL_QUALITIES {
        let url = format!("{}/{}/{}.jpg", base, video_id, quality);
        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(url = %url, "thumbnail available");
                found.push(url);
            }
            Ok(response) => debug!(url = %url, status = %response.status(), "thumbnail missing"),
            Err(e) => debug!(url = %url, error = %e, "thumbnail probe failed"),
        }
    }

    found
}

/// yt-dlp for video, thumbnail probing for images
pub struct YoutubeStrategy {
    extractor: Arc<dyn MediaExtractor>,
    client: reqwest::Client,
    browser: BrowserAccess,
    thumbnail_base: String,
}

impl YoutubeStrategy {
    pub fn new(
        extractor: Arc<dyn MediaExtractor>,
        client: reqwest::Client,
        browser: BrowserAccess,
        thumbnail_base: &str,
    ) -> Self {
        Self {
            extractor,
            client,
            browser,
            thumbnail_base: thumbnail_base.to_string(),
        }
    }

    async fn video(
        &self,
        source: &SourceDescriptor,
        dest_dir: &Path,
    ) -> Result<RetrievedMedia, DownloadError> {
        let output = dest_dir.join(format!("youtube_{}.mp4", source.content_id));
        info!(id = %source.content_id, extractor = self.extractor.name(), "fetching video");
        let path = self.extractor.extract(&source.raw_url, &output).await?;
        Ok(RetrievedMedia::local(source, path))
    }

    /// Id from the URL, else from the rendered page's canonical link
    async fn resolve_id(&self, source: &SourceDescriptor) -> Result<String, DownloadError> {
        if source.has_content_id() {
            return Ok(source.content_id.clone());
        }

        let page = self.browser.open().await?;
        let result = async {
            page.goto(&source.raw_url, self.browser.timeouts.page_load()).await?;
            page.evaluate_string(CANONICAL_LINK_SCRIPT).await
        }
        .await;
        let canonical = close_after(page, result).await?;
        debug!(canonical = %canonical, "canonical link");

        youtube_id(&canonical).ok_or_else(|| DownloadError::MissingVideoId(source.raw_url.clone()))
    }

    async fn thumbnails(&self, source: &SourceDescriptor) -> Result<RetrievedMedia, DownloadError> {
        let id = self.resolve_id(source).await?;
        let urls = probe_thumbnails(&self.client, &self.thumbnail_base, &id).await;
        if urls.is_empty() {
            return Err(DownloadError::NoThumbnailsFound(id));
        }
        Ok(RetrievedMedia::remote(source, urls, ".jpg"))
    }
}

#[async_trait]
impl RetrievalStrategy for YoutubeStrategy {
    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn retrieve(
        &self,
        source: &SourceDescriptor,
        _session: Option<&Session>,
        dest_dir: &Path,
    ) -> Result<RetrievedMedia, DownloadError> {
        match source.kind {
            ContentKind::Video => self.video(source, dest_dir).await,
            ContentKind::Image => self.thumbnails(source).await,
            ContentKind::DirectFile => Ok(DirectFileStrategy::media_for(source)),
        }
    }
}
