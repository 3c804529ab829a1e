use async_trait::async_trait;
use std::path::Path;

use super::{BrowserAccess, DirectFileStrategy};
use crate::downloader::browser::{close_after, BrowserPage};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{ContentKind, RetrievedMedia, SourceDescriptor};
use crate::downloader::scrape::{scrape_images, scrape_video};
use crate::downloader::session::Session;
use crate::downloader::traits::RetrievalStrategy;

/// Post images are served from the `scontent` CDN hosts
const ASSET_HOST_MARKER: &str = "scontent";

/// Authenticated scrape of the rendered page
pub struct FacebookStrategy {
    browser: BrowserAccess,
}

impl FacebookStrategy {
    pub fn new(browser: BrowserAccess) -> Self {
        Self { browser }
    }

    async fn scrape(
        &self,
        page: &dyn BrowserPage,
        source: &SourceDescriptor,
        session: &Session,
    ) -> Result<RetrievedMedia, DownloadError> {
        page.set_cookies(&session.cookies).await?;

        let timeouts = &self.browser.timeouts;
        match source.kind {
            ContentKind::Image => {
                let urls = scrape_images(page, &source.raw_url, timeouts, Some(ASSET_HOST_MARKER)).await?;
                Ok(RetrievedMedia::remote(source, urls, ".jpg"))
            }
            _ => {
                let src = scrape_video(page, &source.raw_url, timeouts).await?;
                Ok(RetrievedMedia::remote(source, vec![src], ".mp4"))
            }
        }
    }
}

#[async_trait]
impl RetrievalStrategy for FacebookStrategy {
    fn name(&self) -> &'static str {
        "facebook"
    }

    fn requires_session(&self, source: &SourceDescriptor) -> bool {
        source.kind != ContentKind::DirectFile
    }

    async fn retrieve(
        &self,
        source: &SourceDescriptor,
        session: Option<&Session>,
        _dest_dir: &Path,
    ) -> Result<RetrievedMedia, DownloadError> {
        if source.kind == ContentKind::DirectFile {
            return Ok(DirectFileStrategy::media_for(source));
        }

        let session = session.ok_or_else(|| {
            DownloadError::Session("no Facebook session; run `social-downloader login`".to_string())
        })?;

        let page = self.browser.open().await?;
        let result = self.scrape(page.as_ref(), source, session).await;
        close_after(page, result).await
    }
}
