// Frame extraction - samples a video into numbered PNG files with ffmpeg

use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::errors::DownloadError;
use super::models::FrameSet;
use super::tools::{ToolManager, ToolType};
use super::utils::run_output_with_timeout;

lazy_static! {
    static ref FRAME_NAME: Regex = Regex::new(r"^frame_\d{4,}\.png$").unwrap();
}

pub const FRAME_PATTERN: &str = "frame_%04d.png";

pub struct FrameExtractor {
    tools: ToolManager,
    timeout_secs: u64,
}

impl FrameExtractor {
    pub fn new(tools: ToolManager, timeout_secs: u64) -> Self {
        Self { tools, timeout_secs }
    }

    fn build_args(video: &Path, dest_dir: &Path, fps: f64) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            video.to_string_lossy().to_string(),
            "-vf".to_string(),
            format!("fps={}", fps),
            dest_dir.join(FRAME_PATTERN).to_string_lossy().to_string(),
        ]
    }

    /// Sample `video` at `fps` into `dest_dir/frame_0001.png`, ...
    /// Existing frames with the same index are overwritten.
    pub async fn extract(
        &self,
        video: &Path,
        dest_dir: &Path,
        fps: f64,
    ) -> Result<FrameSet, DownloadError> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(DownloadError::ExtractionError(format!(
                "fps must be positive, got {}",
                fps
            )));
        }

        let ffmpeg = self.tools.locate(ToolType::Ffmpeg).await?;
        tokio::fs::create_dir_all(dest_dir).await?;

        // Stage the run: the set holds only frames this ffmpeg call wrote
        let staging = dest_dir.join(format!(".frames-{}", std::process::id()));
        remove_dir_if_present(&staging).await?;
        tokio::fs::create_dir_all(&staging).await?;

        let frames = match self.run_ffmpeg(&ffmpeg, video, &staging, fps).await {
            Ok(()) => publish_frames(&staging, dest_dir).await,
            Err(e) => Err(e),
        };
        if let Err(e) = remove_dir_if_present(&staging).await {
            warn!(dir = %staging.display(), error = %e, "failed to remove staging dir");
        }
        let frames = frames?;

        if frames.is_empty() {
            return Err(DownloadError::ExtractionError(format!(
                "ffmpeg produced no frames from {}",
                video.display()
            )));
        }

        info!(count = frames.len(), fps, dir = %dest_dir.display(), "frames extracted");
        Ok(FrameSet {
            source: video.to_path_buf(),
            fps,
            frames,
        })
    }

    async fn run_ffmpeg(
        &self,
        ffmpeg: &Path,
        video: &Path,
        out_dir: &Path,
        fps: f64,
    ) -> Result<(), DownloadError> {
        let args = Self::build_args(video, out_dir, fps);
        debug!(args = %args.join(" "), "running ffmpeg");
        let output =
            run_output_with_timeout(&ffmpeg.to_string_lossy(), &args, self.timeout_secs).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = stderr
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .last()
                .unwrap_or("ffmpeg exited with an error");
            return Err(DownloadError::ExtractionError(tail.to_string()));
        }
        Ok(())
    }
}

/// Move staged frames into `dest_dir`, overwriting same-index files
async fn publish_frames(staging: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, DownloadError> {
    let mut published = Vec::new();
    for staged in list_frames(staging).await? {
        let Some(name) = staged.file_name() else {
            continue;
        };
        let target = dest_dir.join(name);
        tokio::fs::rename(&staged, &target).await?;
        published.push(target);
    }
    Ok(published)
}

async fn remove_dir_if_present(dir: &Path) -> Result<(), DownloadError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// `frame_NNNN.png` files in `dir`, sorted by index
pub async fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, DownloadError> {
    let mut frames = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if FRAME_NAME.is_match(&name.to_string_lossy()) {
            frames.push(entry.path());
        }
    }

    // Zero-padded names sort numerically until the index outgrows the padding
    frames.sort_by_key(|p| {
        let stem = p.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        let index = stem.trim_start_matches("frame_").parse::<u64>().unwrap_or(u64::MAX);
        (index, stem)
    });
    Ok(frames)
}
