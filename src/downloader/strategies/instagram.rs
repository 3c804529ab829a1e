use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::{BrowserAccess, DirectFileStrategy};
use crate::downloader::browser::close_after;
use crate::downloader::errors::DownloadError;
use crate::downloader::extractors::MediaExtractor;
use crate::downloader::models::{ContentKind, RetrievedMedia, SourceDescriptor};
use crate::downloader::scrape::scrape_images;
use crate::downloader::session::Session;
use crate::downloader::traits::RetrievalStrategy;

/// Reels and videos through instaloader; images by scraping the post page
pub struct InstagramStrategy {
    extractor: Arc<dyn MediaExtractor>,
    browser: BrowserAccess,
}

impl InstagramStrategy {
    pub fn new(extractor: Arc<dyn MediaExtractor>, browser: BrowserAccess) -> Self {
        Self { extractor, browser }
    }

    async fn video(
        &self,
        source: &SourceDescriptor,
        dest_dir: &Path,
    ) -> Result<RetrievedMedia, DownloadError> {
        if !source.has_content_id() {
            return Err(DownloadError::UnsupportedUrl(format!(
                "{} (no post shortcode in URL)",
                source.raw_url
            )));
        }

        let output = dest_dir.join(format!("instagram_{}.mp4", source.content_id));
        info!(shortcode = %source.content_id, extractor = self.extractor.name(), "fetching reel");
        let path = self.extractor.extract(&source.content_id, &output).await?;
        Ok(RetrievedMedia::local(source, path))
    }

    async fn images(&self, source: &SourceDescriptor) -> Result<RetrievedMedia, DownloadError> {
        let page = self.browser.open().await?;
        let result = scrape_images(page.as_ref(), &source.raw_url, &self.browser.timeouts, None).await;
        let urls = close_after(page, result).await?;
        Ok(RetrievedMedia::remote(source, urls, ".jpg"))
    }
}

#[async_trait]
impl RetrievalStrategy for InstagramStrategy {
    fn name(&self) -> &'static str {
        "instagram"
    }

    async fn retrieve(
        &self,
        source: &SourceDescriptor,
        _session: Option<&Session>,
        dest_dir: &Path,
    ) -> Result<RetrievedMedia, DownloadError> {
        match source.kind {
            ContentKind::Video => self.video(source, dest_dir).await,
            ContentKind::Image => self.images(source).await,
            ContentKind::DirectFile => Ok(DirectFileStrategy::media_for(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use crate::downloader::browser::fake::{CallLog, FakeLauncher, FakePage};
    use crate::downloader::browser::LaunchOptions;
    use crate::downloader::models::{MediaPayload, Platform};
    use crate::downloader::scrape::IMAGE_CANDIDATES_SCRIPT;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Records the target and pretends the file was written
    #[derive(Default)]
    struct RecordingExtractor {
        targets: Mutex<Vec<(String, PathBuf)>>,
    }

    #[async_trait]
    impl MediaExtractor for RecordingExtractor {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn extract(
            &self,
            target: &str,
            output_path: &Path,
        ) -> Result<std::path::PathBuf, DownloadError> {
            self.targets
                .lock()
                .unwrap()
                .push((target.to_string(), output_path.to_path_buf()));
            Ok(output_path.to_path_buf())
        }
    }

    fn source(kind: ContentKind, id: &str, url: &str) -> SourceDescriptor {
        SourceDescriptor {
            platform: Platform::Instagram,
            content_id: id.into(),
            kind,
            raw_url: url.into(),
        }
    }

    fn strategy(extractor: Arc<RecordingExtractor>, page: FakePage) -> (InstagramStrategy, Arc<FakeLauncher>) {
        let launcher = Arc::new(FakeLauncher::new(page));
        let browser = BrowserAccess {
            launcher: launcher.clone(),
            options: LaunchOptions::headless(),
            timeouts: Timeouts::default(),
        };
        (InstagramStrategy::new(extractor, browser), launcher)
    }

    #[tokio::test]
    async fn reel_uses_fixed_output_name() {
        let extractor = Arc::new(RecordingExtractor::default());
        let (strategy, launcher) = strategy(extractor.clone(), FakePage::default());

        let media = strategy
            .retrieve(
                &source(ContentKind::Video, "Cx9AbC", "https://www.instagram.com/reel/Cx9AbC/"),
                None,
                Path::new("frames"),
            )
            .await
            .unwrap();

        let expected = PathBuf::from("frames/instagram_Cx9AbC.mp4");
        assert_eq!(media.payload, MediaPayload::LocalFile(expected.clone()));
        assert_eq!(extractor.targets.lock().unwrap()[0], ("Cx9AbC".to_string(), expected));
        assert!(launcher.calls().is_empty());
    }

    #[tokio::test]
    async fn reel_without_shortcode_is_rejected() {
        let extractor = Arc::new(RecordingExtractor::default());
        let (strategy, _) = strategy(extractor.clone(), FakePage::default());

        let err = strategy
            .retrieve(
                &source(ContentKind::Video, "insta", "https://www.instagram.com/someone/"),
                None,
                Path::new("frames"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::UnsupportedUrl(_)));
        assert!(extractor.targets.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn images_are_scraped_and_browser_closed() {
        let log = CallLog::default();
        let page = FakePage::new(&log).evaluating(
            IMAGE_CANDIDATES_SCRIPT,
            r#"[{"src":"https://scontent.cdninstagram.com/a.jpg","alt":"Photo by x"},
                {"src":"https://scontent.cdninstagram.com/profile.jpg","alt":""}]"#,
        );
        let (strategy, launcher) = strategy(Arc::new(RecordingExtractor::default()), page);

        let media = strategy
            .retrieve(
                &source(ContentKind::Image, "C1", "https://www.instagram.com/p/C1/"),
                None,
                Path::new("images"),
            )
            .await
            .unwrap();

        assert_eq!(
            media.payload,
            MediaPayload::Remote(vec!["https://scontent.cdninstagram.com/a.jpg".into()])
        );
        assert_eq!(launcher.calls().last().map(String::as_str), Some("close"));
    }
}
