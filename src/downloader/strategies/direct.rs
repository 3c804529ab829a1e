use async_trait::async_trait;
use std::path::Path;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{RetrievedMedia, SourceDescriptor};
use crate::downloader::session::Session;
use crate::downloader::traits::RetrievalStrategy;
use crate::downloader::utils::url_extension;

/// URL already points at the bytes: hand it straight to the materializer
pub struct DirectFileStrategy;

impl DirectFileStrategy {
    pub fn media_for(source: &SourceDescriptor) -> RetrievedMedia {
        let ext = url_extension(&source.raw_url).unwrap_or_else(|| ".jpg".to_string());
        RetrievedMedia::remote(source, vec![source.raw_url.clone()], &ext)
    }
}

#[async_trait]
impl RetrievalStrategy for DirectFileStrategy {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn retrieve(
        &self,
        source: &SourceDescriptor,
        _session: Option<&Session>,
        _dest_dir: &Path,
    ) -> Result<RetrievedMedia, DownloadError> {
        Ok(Self::media_for(source))
    }
}
