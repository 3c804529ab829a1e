use std::path::{Path, PathBuf};
use tracing::debug;

use super::errors::DownloadError;
use super::utils::run_output_with_timeout;

const PROBE_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Instaloader,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Instaloader => "instaloader",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp | ToolType::Instaloader => "--version",
            ToolType::Ffmpeg => "-version", // ffmpeg uses a single dash
        }
    }

    fn install_hint(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "pip3 install -U yt-dlp",
            ToolType::Instaloader => "pip3 install -U instaloader",
            ToolType::Ffmpeg => "install ffmpeg from your package manager",
        }
    }

    pub fn all() -> [ToolType; 3] {
        [ToolType::YtDlp, ToolType::Instaloader, ToolType::Ffmpeg]
    }
}

#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

impl ToolInfo {
    /// One status line for the `tools` command
    pub fn summary(&self) -> String {
        match (&self.path, &self.version) {
            (Some(path), Some(version)) => {
                format!("{:<12} {:<24} {}", self.name, version, path.display())
            }
            (Some(path), None) => format!("{:<12} {:<24} {}", self.name, "unknown version", path.display()),
            (None, _) => format!(
                "{:<12} missing ({})",
                self.name,
                self.tool_type.install_hint()
            ),
        }
    }
}

/// Locates external binaries. Search directories can be overridden for tests.
#[derive(Debug, Clone)]
pub struct ToolManager {
    search_dirs: Vec<PathBuf>,
    use_path_lookup: bool,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolManager {
    pub fn new() -> Self {
        Self {
            search_dirs: vec![
                PathBuf::from("/opt/homebrew/bin"),
                PathBuf::from("/usr/local/bin"),
                PathBuf::from("/usr/bin"),
            ],
            use_path_lookup: true,
        }
    }

    /// Only look in the given directories, never in PATH
    pub fn with_search_dirs(dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs: dirs,
            use_path_lookup: false,
        }
    }

    pub async fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let path = self.detect_tool(tool_type).await;
        let version = match &path {
            Some(p) => self.get_version(p, tool_type).await,
            None => None,
        };

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            version,
            path,
        }
    }

    pub async fn get_all_tools(&self) -> Vec<ToolInfo> {
        let mut tools = Vec::new();
        for tool_type in ToolType::all() {
            tools.push(self.get_tool_info(tool_type).await);
        }
        tools
    }

    /// Path to a runnable binary, or `ToolMissing`
    pub async fn locate(&self, tool_type: ToolType) -> Result<PathBuf, DownloadError> {
        self.detect_tool(tool_type)
            .await
            .ok_or_else(|| DownloadError::ToolMissing(tool_type.as_str().to_string()))
    }

    async fn detect_tool(&self, tool_type: ToolType) -> Option<PathBuf> {
        let binary_name = tool_type.as_str();

        // 1. Try common paths first
        for dir in &self.search_dirs {
            let candidate = dir.join(binary_name);
            if candidate.is_file() {
                debug!(tool = binary_name, path = %candidate.display(), "found in search dir");
                return Some(candidate);
            }
        }

        if !self.use_path_lookup {
            return None;
        }

        // 2. Try PATH
        let args = vec![binary_name.to_string()];
        match run_output_with_timeout("which", &args, PROBE_TIMEOUT_SECS).await {
            Ok(output) if output.status.success() => {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if path.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(path))
                }
            }
            _ => None,
        }
    }

    async fn get_version(&self, path: &Path, tool_type: ToolType) -> Option<String> {
        let program = path.to_string_lossy();
        let args = vec![tool_type.version_arg().to_string()];

        match run_output_with_timeout(&program, &args, PROBE_TIMEOUT_SECS).await {
            Ok(output) if output.status.success() => {
                // ffmpeg prints a banner; keep the first line only
                String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_match_binaries() {
        assert_eq!(ToolType::YtDlp.as_str(), "yt-dlp");
        assert_eq!(ToolType::Instaloader.as_str(), "instaloader");
        assert_eq!(ToolType::Ffmpeg.version_arg(), "-version");
    }

    #[tokio::test]
    async fn empty_search_dirs_report_missing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ToolManager::with_search_dirs(vec![dir.path().to_path_buf()]);

        let err = manager.locate(ToolType::Instaloader).await.unwrap_err();
        assert!(matches!(err, DownloadError::ToolMissing(ref t) if t == "instaloader"));

        let info = manager.get_tool_info(ToolType::Ffmpeg).await;
        assert!(info.path.is_none());
        assert!(info.summary().contains("missing"));
    }

    #[tokio::test]
    async fn finds_binary_in_search_dir() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("yt-dlp");
        std::fs::write(&fake, "").unwrap();
        let manager = ToolManager::with_search_dirs(vec![dir.path().to_path_buf()]);

        assert_eq!(manager.locate(ToolType::YtDlp).await.unwrap(), fake);
    }
}
