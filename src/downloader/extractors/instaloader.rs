// instaloader extractor - fetches one Instagram post by shortcode
//
// instaloader picks the file extension itself, so the output path's stem
// becomes --filename-pattern and its parent becomes --dirname-pattern.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::traits::{run_extractor, ExtractorConfig, MediaExtractor};
use crate::downloader::errors::DownloadError;
use crate::downloader::tools::{ToolManager, ToolType};

pub struct InstaloaderExtractor {
    tools: ToolManager,
    config: ExtractorConfig,
}

impl InstaloaderExtractor {
    pub fn new(tools: ToolManager, config: ExtractorConfig) -> Self {
        Self { tools, config }
    }

    fn build_args(&self, shortcode: &str, output_path: &Path) -> Vec<String> {
        let dir = output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("instagram_{}", shortcode));

        let mut args = vec![
            "--no-posts".to_string(),
            "--no-profile-pic".to_string(),
            "--no-captions".to_string(),
            "--no-metadata-json".to_string(),
            "--no-video-thumbnails".to_string(),
            "--quiet".to_string(),
            format!("--dirname-pattern={}", dir.display()),
            format!("--filename-pattern={}", stem),
        ];

        if let Some(user_agent) = &self.config.user_agent {
            args.push(format!("--user-agent={}", user_agent));
        }

        // A leading dash tells instaloader the target is a post shortcode
        args.push("--".to_string());
        args.push(format!("-{}", shortcode));
        args
    }
}

#[async_trait]
impl MediaExtractor for InstaloaderExtractor {
    fn name(&self) -> &'static str {
        "instaloader"
    }

    async fn extract(&self, shortcode: &str, output_path: &Path) -> Result<PathBuf, DownloadError> {
        let args = self.build_args(shortcode, output_path);
        run_extractor(
            &self.tools,
            ToolType::Instaloader,
            args,
            self.config.timeout_secs,
            output_path,
        )
        .await
    }
}
