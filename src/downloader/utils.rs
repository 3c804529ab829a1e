// Helper functions shared by strategies, extractors and the materializer

use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::downloader::errors::DownloadError;

pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "webm", "mov", "mkv"];

/// Run command with timeout, capturing stdout and stderr
pub async fn run_output_with_timeout(
    program: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    debug!(program, args = %args.join(" "), "spawning");

    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DownloadError::ToolMissing(program.to_string()),
            _ => DownloadError::ToolFailed {
                tool: program.to_string(),
                message: format!("failed to start: {}", e),
            },
        })?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| DownloadError::ToolFailed {
        tool: program.to_string(),
        message: "failed to capture stdout".to_string(),
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| DownloadError::ToolFailed {
        tool: program.to_string(),
        message: "failed to capture stderr".to_string(),
    })?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    let waited = timeout(Duration::from_secs(timeout_secs), child.wait()).await;
    match waited {
        Ok(status) => {
            let status = status?;
            let stdout = join_pipe(stdout_task).await?;
            let stderr = join_pipe(stderr_task).await?;
            Ok(std::process::Output { status, stdout, stderr })
        }
        Err(_) => {
            warn!(program, timeout_secs, "killing process after timeout");
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::ToolFailed {
                tool: program.to_string(),
                message: format!("Timed out after {}s", timeout_secs),
            })
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, DownloadError> {
    task.await
        .map_err(|e| DownloadError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
        .map_err(DownloadError::from)
}

/// Shared HTTP client: user agent, request timeout and optional proxy from config
pub fn build_http_client(config: &AppConfig) -> Result<reqwest::Client, DownloadError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(config.timeouts.http_secs));

    if let Some(proxy_url) = config.proxy.as_deref() {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| DownloadError::Config(format!("invalid proxy {}: {}", proxy_url, e)))?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(DownloadError::from)
}

/// Build proxy arguments for yt-dlp
pub fn proxy_args(proxy: Option<&str>) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(proxy) = proxy {
        args.push("--proxy".to_string());
        args.push(proxy.to_string());
    }

    args
}

/// Lowercase extension (with leading dot) of the URL's path, ignoring query and fragment
pub fn url_extension(raw: &str) -> Option<String> {
    let path = match url::Url::parse(raw) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => raw.split(['?', '#']).next().unwrap_or(raw).to_string(),
    };

    let file = path.rsplit('/').next()?;
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 5 {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

pub fn is_direct_image(raw: &str) -> bool {
    has_extension(raw, &IMAGE_EXTENSIONS)
}

pub fn is_direct_video(raw: &str) -> bool {
    has_extension(raw, &["mp4"])
}

pub fn is_video_path(path: &std::path::Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .map_or(false, |e| VIDEO_EXTENSIONS.contains(&e.as_str()))
}

fn has_extension(raw: &str, allowed: &[&str]) -> bool {
    url_extension(raw).map_or(false, |ext| allowed.contains(&&ext[1..]))
}

/// Reddit escapes `&` inside JSON-embedded URLs
pub fn unescape_amp(raw: &str) -> String {
    raw.replace("&amp;", "&")
}
