// Retrieval strategy trait definition

use async_trait::async_trait;
use std::path::Path;

use super::errors::DownloadError;
use super::models::{RetrievedMedia, SourceDescriptor};
use super::session::Session;

/// One way of getting media for a classified URL
#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    /// Name of the strategy (for logging)
    fn name(&self) -> &'static str;

    /// Whether `retrieve` needs an authenticated session for this descriptor
    fn requires_session(&self, _source: &SourceDescriptor) -> bool {
        false
    }

    /// Fetch or locate the media. Extractor-backed strategies write into
    /// `dest_dir` and return a local file; the rest return remote URLs.
    async fn retrieve(
        &self,
        source: &SourceDescriptor,
        session: Option<&Session>,
        dest_dir: &Path,
    ) -> Result<RetrievedMedia, DownloadError>;
}
