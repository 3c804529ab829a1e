// MediaExtractor trait and shared invocation helper

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::downloader::errors::DownloadError;
use crate::downloader::tools::{ToolManager, ToolType};
use crate::downloader::utils::run_output_with_timeout;

/// Settings passed to every extractor invocation
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    pub user_agent: Option<String>,
    /// Kill the tool after this many seconds
    pub timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            user_agent: None,
            timeout_secs: 600,
        }
    }
}

impl From<&AppConfig> for ExtractorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            proxy: config.proxy.clone(),
            user_agent: Some(config.user_agent.clone()),
            timeout_secs: config.timeouts.tool_secs,
        }
    }
}

/// An external program that writes one media file for a target
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Write the media for `target` to `output_path` and return that path.
    /// `ToolMissing` / `ToolFailed` / `NotFound` describe the failure.
    async fn extract(&self, target: &str, output_path: &Path) -> Result<PathBuf, DownloadError>;
}

/// Locate `tool`, run it, and confirm `output_path` was produced
pub(crate) async fn run_extractor(
    tools: &ToolManager,
    tool: ToolType,
    args: Vec<String>,
    timeout_secs: u64,
    output_path: &Path,
) -> Result<PathBuf, DownloadError> {
    let binary = tools.locate(tool).await?;
    let program = binary.to_string_lossy().to_string();

    if let Some(dir) = output_path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }

    debug!(tool = tool.as_str(), args = %args.join(" "), "running extractor");
    let output = run_output_with_timeout(&program, &args, timeout_secs).await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(tool = tool.as_str(), status = ?output.status.code(), "extractor failed");
        return Err(DownloadError::tool_failed(tool.as_str(), &stderr));
    }

    if !tokio::fs::try_exists(output_path).await.unwrap_or(false) {
        return Err(DownloadError::NotFound(output_path.display().to_string()));
    }

    Ok(output_path.to_path_buf())
}
