// Media materializer - streams retrieved media into the destination directory
//
// Files are named `<base>_<index><ext>` with the index starting at 1 on every
// call, so a rerun with the same base overwrites the previous batch.

use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::errors::DownloadError;
use super::models::{MediaPayload, RetrievedMedia};
use super::utils::url_extension;

const FALLBACK_EXTENSION: &str = ".jpg";

/// Per-item outcome of one `save` call
#[derive(Debug, Default)]
pub struct MaterializedBatch {
    pub saved: Vec<PathBuf>,
    pub failed: Vec<(String, DownloadError)>,
}

pub struct Materializer {
    client: reqwest::Client,
}

impl Materializer {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn save(
        &self,
        media: &RetrievedMedia,
        dest_dir: &Path,
        base: &str,
    ) -> Result<MaterializedBatch, DownloadError> {
        tokio::fs::create_dir_all(dest_dir).await?;

        let urls = match &media.payload {
            MediaPayload::LocalFile(path) => {
                debug!(path = %path.display(), "already on disk");
                return Ok(MaterializedBatch {
                    saved: vec![path.clone()],
                    failed: Vec::new(),
                });
            }
            MediaPayload::Remote(urls) => urls,
        };

        let mut batch = MaterializedBatch::default();
        for (i, url) in urls.iter().enumerate() {
            let ext = file_extension(url, &media.suggested_extension);
            let path = dest_dir.join(format!("{}_{}{}", base, i + 1, ext));

            match self.download(url, &path).await {
                Ok(bytes) => {
                    info!(path = %path.display(), bytes, "saved");
                    batch.saved.push(path);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "download failed");
                    batch.failed.push((url.clone(), e));
                }
            }
        }

        Ok(batch)
    }

    /// Stream one URL to `path`; a partial file is removed on failure
    async fn download(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::NetworkError(format!("{} returned {}", url, status)));
        }

        let result = write_stream(response, path).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(path).await;
        }
        result
    }
}

async fn write_stream(response: reqwest::Response, path: &Path) -> Result<u64, DownloadError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

/// Extension from the URL path, else the suggested one, else `.jpg`
fn file_extension(url: &str, suggested: &str) -> String {
    url_extension(url).unwrap_or_else(|| {
        if suggested.is_empty() {
            FALLBACK_EXTENSION.to_string()
        } else if suggested.starts_with('.') {
            suggested.to_string()
        } else {
            format!(".{}", suggested)
        }
    })
}
