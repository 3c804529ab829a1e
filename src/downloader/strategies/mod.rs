// Retrieval strategies, one per platform plus the direct-file fetcher

use std::sync::Arc;

use super::browser::{BrowserLauncher, BrowserPage, LaunchOptions};
use super::errors::DownloadError;
use crate::config::Timeouts;

mod direct;
mod facebook;
mod instagram;
mod reddit;
mod youtube;

pub use direct::DirectFileStrategy;
pub use facebook::FacebookStrategy;
pub use instagram::InstagramStrategy;
pub use reddit::{extract_image_urls, json_url, RedditStrategy};
pub use youtube::{probe_thumbnails, YoutubeStrategy, THUMBNAIL_QUALITIES};

/// How browser-backed strategies open pages
#[derive(Clone)]
pub struct BrowserAccess {
    pub launcher: Arc<dyn BrowserLauncher>,
    pub options: LaunchOptions,
    pub timeouts: Timeouts,
}

impl BrowserAccess {
    pub async fn open(&self) -> Result<Box<dyn BrowserPage>, DownloadError> {
        self.launcher.launch(&self.options).await
    }
}
