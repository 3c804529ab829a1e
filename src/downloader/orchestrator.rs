// Orchestrator: classify -> session -> retrieve -> materialize -> frames

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::browser::{BrowserLauncher, LaunchOptions};
use super::classifier::classify;
use super::errors::DownloadError;
use super::extractors::{ExtractorConfig, InstaloaderExtractor, YtDlpExtractor};
use super::frames::FrameExtractor;
use super::login::LoginFlow;
use super::materializer::Materializer;
use super::models::{ContentKind, DownloadReport, MediaMode, Platform, SourceDescriptor};
use super::session::{Session, SessionStore};
use super::strategies::{
    BrowserAccess, DirectFileStrategy, FacebookStrategy, InstagramStrategy, RedditStrategy,
    YoutubeStrategy,
};
use super::tools::ToolManager;
use super::traits::RetrievalStrategy;
use super::utils::{build_http_client, is_direct_image, is_video_path};
use crate::config::AppConfig;

pub struct Downloader {
    config: AppConfig,
    direct: DirectFileStrategy,
    instagram: InstagramStrategy,
    facebook: FacebookStrategy,
    reddit: RedditStrategy,
    youtube: YoutubeStrategy,
    store: SessionStore,
    login_flow: LoginFlow,
    launcher: Arc<dyn BrowserLauncher>,
    launch_options: LaunchOptions,
    materializer: Materializer,
    frames: FrameExtractor,
    cancel: CancellationToken,
}

impl Downloader {
    pub fn new(
        config: AppConfig,
        launcher: Arc<dyn BrowserLauncher>,
        tools: ToolManager,
    ) -> Result<Self, DownloadError> {
        let client = build_http_client(&config)?;
        let extractor_config = ExtractorConfig::from(&config);

        let launch_options = LaunchOptions {
            headless: config.headless,
            ..LaunchOptions::headless().with_user_agent(&config.user_agent)
        };
        let browser = BrowserAccess {
            launcher: launcher.clone(),
            options: launch_options.clone(),
            timeouts: config.timeouts.clone(),
        };

        let instaloader = Arc::new(InstaloaderExtractor::new(tools.clone(), extractor_config.clone()));
        let ytdlp = Arc::new(YtDlpExtractor::new(tools.clone(), extractor_config));

        Ok(Self {
            direct: DirectFileStrategy,
            instagram: InstagramStrategy::new(instaloader, browser.clone()),
            facebook: FacebookStrategy::new(browser.clone()),
            reddit: RedditStrategy::new(client.clone(), browser.clone()),
            youtube: YoutubeStrategy::new(ytdlp, client.clone(), browser, &config.thumbnail_base),
            store: SessionStore::new(config.session_dir.clone()),
            login_flow: LoginFlow::new(config.login_poll_interval()),
            launcher,
            launch_options,
            materializer: Materializer::new(client),
            frames: FrameExtractor::new(tools, config.timeouts.tool_secs),
            cancel: CancellationToken::new(),
            config,
        })
    }

    /// Token that interrupts a running login or pipeline when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn strategy_for(&self, source: &SourceDescriptor) -> &dyn RetrievalStrategy {
        match (source.kind, source.platform) {
            (ContentKind::DirectFile, _) => &self.direct,
            (_, Platform::Instagram) => &self.instagram,
            (_, Platform::Facebook) => &self.facebook,
            (_, Platform::Reddit) => &self.reddit,
            (_, Platform::Youtube) => &self.youtube,
        }
    }

    /// Run the interactive login and store the session
    pub async fn login(&self, platform: Platform) -> Result<Session, DownloadError> {
        self.login_flow
            .run(
                self.launcher.as_ref(),
                &self.store,
                platform,
                &self.launch_options,
                &self.cancel,
            )
            .await
    }

    /// Stored session if still valid, otherwise a fresh login
    pub async fn ensure_session(&self, platform: Platform) -> Result<Session, DownloadError> {
        match self.store.load(platform).await? {
            Some(session) if session.is_valid() => {
                debug!(path = %session.path.display(), "reusing session");
                Ok(session)
            }
            Some(_) => {
                info!(platform = %platform, "stored session has expired; logging in again");
                self.login(platform).await
            }
            None => {
                info!(platform = %platform, "no stored session; logging in");
                self.login(platform).await
            }
        }
    }

    fn dest_dir(&self, mode: MediaMode) -> &Path {
        match mode {
            MediaMode::Video => &self.config.frames_dir,
            MediaMode::Images => &self.config.images_dir,
        }
    }

    /// Process one URL end to end
    pub async fn run(
        &self,
        url: &str,
        mode: MediaMode,
        fps: f64,
    ) -> Result<DownloadReport, DownloadError> {
        tokio::select! {
            biased;
            result = self.pipeline(url, mode, fps) => result,
            _ = self.cancel.cancelled() => Err(DownloadError::Cancelled),
        }
    }

    async fn pipeline(
        &self,
        url: &str,
        mode: MediaMode,
        fps: f64,
    ) -> Result<DownloadReport, DownloadError> {
        let source = classify(url, mode)?;
        let strategy = self.strategy_for(&source);
        info!(
            platform = %source.platform,
            id = %source.content_id,
            kind = ?source.kind,
            strategy = strategy.name(),
            "classified"
        );

        let session = if strategy.requires_session(&source) {
            Some(self.ensure_session(source.platform).await?)
        } else {
            None
        };

        let dest = self.dest_dir(mode);
        let media = strategy.retrieve(&source, session.as_ref(), dest).await?;

        let base = filename_base(&source, mode);
        let batch = self.materializer.save(&media, dest, &base).await?;
        let failed = batch.failed.len();

        if batch.saved.is_empty() {
            return Err(batch
                .failed
                .into_iter()
                .next()
                .map(|(_, e)| e)
                .unwrap_or_else(|| DownloadError::NoImagesFound(source.raw_url.clone())));
        }

        let frames = match mode {
            MediaMode::Video => match batch.saved.iter().find(|p| is_video_path(p)) {
                Some(video) => {
                    self.check_video(video).await?;
                    Some(self.frames.extract(video, dest, fps).await?)
                }
                None => {
                    debug!(saved = ?batch.saved, "no video file among the saved media");
                    return Err(DownloadError::NoVideoFound(format!(
                        "{} (saved {} non-video file(s))",
                        source.raw_url,
                        batch.saved.len()
                    )));
                }
            },
            MediaMode::Images => None,
        };

        Ok(DownloadReport {
            descriptor: source,
            saved: batch.saved,
            failed,
            frames,
        })
    }

    /// Reject missing or suspiciously small downloads before transcoding
    async fn check_video(&self, video: &Path) -> Result<(), DownloadError> {
        let size = match tokio::fs::metadata(video).await {
            Ok(meta) => meta.len(),
            Err(_) => {
                return Err(DownloadError::InvalidDownload(format!(
                    "{} does not exist",
                    video.display()
                )))
            }
        };

        if size < self.config.min_video_bytes {
            return Err(DownloadError::InvalidDownload(format!(
                "{} is only {} bytes",
                video.display(),
                size
            )));
        }
        Ok(())
    }

    /// Wipe and recreate the output directories
    pub async fn clean(&self) -> Result<Vec<PathBuf>, DownloadError> {
        let mut cleaned = Vec::new();
        for dir in [&self.config.frames_dir, &self.config.images_dir] {
            match tokio::fs::remove_dir_all(dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            tokio::fs::create_dir_all(dir).await?;
            cleaned.push(dir.clone());
        }
        Ok(cleaned)
    }
}

/// Filename prefix for saved media
pub fn filename_base(source: &SourceDescriptor, mode: MediaMode) -> String {
    match mode {
        MediaMode::Video => format!("{}_{}", source.platform, source.content_id),
        MediaMode::Images
            if source.kind == ContentKind::DirectFile && is_direct_image(&source.raw_url) =>
        {
            "direct_image".to_string()
        }
        MediaMode::Images => source.platform.to_string(),
    }
}
