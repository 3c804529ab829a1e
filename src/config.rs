// Application configuration: defaults < user config file < --config file < SOCIAL_DL__* env

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::downloader::errors::DownloadError;

const APP_DIR: &str = "social-downloader";
const ENV_PREFIX: &str = "SOCIAL_DL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Saved videos and their sampled frames
    pub frames_dir: PathBuf,
    pub images_dir: PathBuf,
    /// Directory holding `<platform>_cookies.json`
    pub session_dir: PathBuf,
    pub default_fps: f64,
    /// Headless mode for scraping. The login browser is always visible.
    pub headless: bool,
    pub timeouts: Timeouts,
    pub login_poll_interval_ms: u64,
    pub user_agent: String,
    /// http(s):// or socks5:// proxy for HTTP requests and yt-dlp
    pub proxy: Option<String>,
    pub thumbnail_base: String,
    pub min_video_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Timeouts {
    pub page_load_secs: u64,
    pub image_page_load_secs: u64,
    pub selector_secs: u64,
    /// Wait after an image page loads so lazy images resolve
    pub settle_secs: u64,
    pub tool_secs: u64,
    pub http_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page_load_secs: 20,
            image_page_load_secs: 45,
            selector_secs: 10,
            settle_secs: 4,
            tool_secs: 600,
            http_secs: 60,
        }
    }
}

impl Timeouts {
    pub fn page_load(&self) -> Duration {
        Duration::from_secs(self.page_load_secs)
    }

    pub fn image_page_load(&self) -> Duration {
        Duration::from_secs(self.image_page_load_secs)
    }

    pub fn selector(&self) -> Duration {
        Duration::from_secs(self.selector_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            frames_dir: PathBuf::from("frames"),
            images_dir: PathBuf::from("images"),
            session_dir: PathBuf::from("."),
            default_fps: 10.0,
            headless: true,
            timeouts: Timeouts::default(),
            login_poll_interval_ms: 2000,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
            proxy: None,
            thumbnail_base: "https://img.youtube.com/vi".to_string(),
            min_video_bytes: 1000,
        }
    }
}

impl AppConfig {
    /// Path of the per-user config file, if the platform has a config dir
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Load layered configuration. A missing user file is fine; a missing
    /// explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, DownloadError> {
        let user_file = Self::user_config_path();
        Self::load_from(user_file.as_deref(), explicit)
    }

    pub(crate) fn load_from(
        user_file: Option<&Path>,
        explicit: Option<&Path>,
    ) -> Result<Self, DownloadError> {
        let mut builder = Config::builder();

        if let Some(path) = user_file {
            debug!(path = %path.display(), "user config");
            builder = builder.add_source(File::from(path).required(false));
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(DownloadError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), DownloadError> {
        if !(self.default_fps.is_finite() && self.default_fps > 0.0) {
            return Err(DownloadError::Config(format!(
                "default_fps must be positive, got {}",
                self.default_fps
            )));
        }
        if self.login_poll_interval_ms == 0 {
            return Err(DownloadError::Config(
                "login_poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn login_poll_interval(&self) -> Duration {
        Duration::from_millis(self.login_poll_interval_ms)
    }
}
