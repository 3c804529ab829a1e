// yt-dlp extractor - downloads a single mp4 rendition with the native binary

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::traits::{run_extractor, ExtractorConfig, MediaExtractor};
use crate::downloader::errors::DownloadError;
use crate::downloader::tools::{ToolManager, ToolType};
use crate::downloader::utils::proxy_args;

pub struct YtDlpExtractor {
    tools: ToolManager,
    config: ExtractorConfig,
}

impl YtDlpExtractor {
    pub fn new(tools: ToolManager, config: ExtractorConfig) -> Self {
        Self { tools, config }
    }

    /// Build command arguments
    fn build_args(&self, url: &str, output_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            "mp4".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-part".to_string(),
            "--force-overwrites".to_string(),
            "--retries".to_string(),
            "2".to_string(),
        ];

        if let Some(user_agent) = &self.config.user_agent {
            args.push("--user-agent".to_string());
            args.push(user_agent.clone());
        }

        args.extend(proxy_args(self.config.proxy.as_deref()));

        args.push("-o".to_string());
        args.push(output_path.to_string_lossy().to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn extract(&self, url: &str, output_path: &Path) -> Result<PathBuf, DownloadError> {
        let args = self.build_args(url, output_path);
        run_extractor(
            &self.tools,
            ToolType::YtDlp,
            args,
            self.config.timeout_secs,
            output_path,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(dir: &Path, proxy: Option<&str>) -> YtDlpExtractor {
        YtDlpExtractor::new(
            ToolManager::with_search_dirs(vec![dir.to_path_buf()]),
            ExtractorConfig {
                proxy: proxy.map(str::to_string),
                ..Default::default()
            },
        )
    }

    #[test]
    fn args_force_mp4_and_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let args = extractor(dir.path(), Some("socks5://127.0.0.1:9050"))
            .build_args("https://youtu.be/dQw4w9WgXcQ", Path::new("frames/youtube_dQw4w9WgXcQ.mp4"));

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-f") + 1], "mp4");
        assert_eq!(args[pos("-o") + 1], "frames/youtube_dQw4w9WgXcQ.mp4");
        assert_eq!(args[pos("--proxy") + 1], "socks5://127.0.0.1:9050");
        assert_eq!(args.last().unwrap(), "https://youtu.be/dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn missing_binary_is_tool_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = extractor(dir.path(), None)
            .extract("https://youtu.be/dQw4w9WgXcQ", &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::ToolMissing(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn writes_requested_output() {
        use crate::downloader::extractors::traits::fake_tool;

        let bin = tempfile::tempdir().unwrap();
        fake_tool::install(
            bin.path(),
            "yt-dlp",
            r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
printf 'video-bytes' > "$out""#,
        );
        let out_dir = tempfile::tempdir().unwrap();
        let target = out_dir.path().join("youtube_dQw4w9WgXcQ.mp4");

        let path = extractor(bin.path(), None)
            .extract("https://youtu.be/dQw4w9WgXcQ", &target)
            .await
            .unwrap();
        assert_eq!(path, target);
        assert_eq!(std::fs::read(&target).unwrap(), b"video-bytes");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failure_carries_diagnosis() {
        use crate::downloader::extractors::traits::fake_tool;

        let bin = tempfile::tempdir().unwrap();
        fake_tool::install(
            bin.path(),
            "yt-dlp",
            "echo 'ERROR: [youtube] x: Video unavailable' >&2\nexit 1",
        );

        let err = extractor(bin.path(), None)
            .extract("https://youtu.be/dQw4w9WgXcQ", &bin.path().join("o.mp4"))
            .await
            .unwrap_err();
        match err {
            DownloadError::ToolFailed { tool, message } => {
                assert_eq!(tool, "yt-dlp");
                assert!(message.contains("Content unavailable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
