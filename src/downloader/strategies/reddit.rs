use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use super::{BrowserAccess, DirectFileStrategy};
use crate::downloader::browser::close_after;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{ContentKind, RetrievedMedia, SourceDescriptor};
use crate::downloader::scrape::scrape_video;
use crate::downloader::session::Session;
use crate::downloader::traits::RetrievalStrategy;
use crate::downloader::utils::{is_direct_image, unescape_amp};

/// Post JSON for images, rendered-page scrape for video
pub struct RedditStrategy {
    client: reqwest::Client,
    browser: BrowserAccess,
}

/// `<post>/.json` with any fragment removed
pub fn json_url(post_url: &str) -> String {
    let base = post_url.split('#').next().unwrap_or(post_url);
    let (path, query) = match base.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (base, None),
    };

    let mut url = if path.ends_with('/') {
        format!("{}.json", path)
    } else {
        format!("{}/.json", path)
    };
    if let Some(query) = query {
        url.push('?');
        url.push_str(query);
    }
    url
}

fn post_data(listing: &Value) -> Option<&Value> {
    listing
        .get(0)?
        .get("data")?
        .get("children")?
        .get(0)?
        .get("data")
}

/// Image URLs of a post, in priority order: the post's own URL, gallery
/// items, then preview images (only when the first two found nothing).
pub fn extract_image_urls(listing: &Value) -> Vec<String> {
    let Some(post) = post_data(listing) else {
        return Vec::new();
    };

    let mut urls: Vec<String> = Vec::new();

    // (a) direct image link
    for key in ["url_overridden_by_dest", "url"] {
        if let Some(url) = post.get(key).and_then(Value::as_str) {
            if is_direct_image(url) {
                push_unique(&mut urls, url);
                break;
            }
        }
    }

    // (b) gallery, ordered by gallery_data
    if let (Some(items), Some(metadata)) = (
        post.pointer("/gallery_data/items").and_then(Value::as_array),
        post.get("media_metadata"),
    ) {
        for item in items {
            let Some(media_id) = item.get("media_id").and_then(Value::as_str) else {
                continue;
            };
            let source = metadata.get(media_id).and_then(|m| m.get("s"));
            let url = source
                .and_then(|s| s.get("u").or_else(|| s.get("gif")))
                .and_then(Value::as_str);
            if let Some(url) = url {
                push_unique(&mut urls, url);
            }
        }
    }

    // (c) previews as a last resort
    if urls.is_empty() {
        if let Some(images) = post.pointer("/preview/images").and_then(Value::as_array) {
            for image in images {
                if let Some(url) = image.pointer("/source/url").and_then(Value::as_str) {
                    push_unique(&mut urls, url);
                }
            }
        }
    }

    urls
}

fn push_unique(urls: &mut Vec<String>, raw: &str) {
    let url = unescape_amp(raw);
    if !urls.contains(&url) {
        urls.push(url);
    }
}

/// A hosted video that is not part of a gallery
fn is_video_post(listing: &Value) -> bool {
    post_data(listing).map_or(false, |post| {
        let is_video = post.get("is_video").and_then(Value::as_bool).unwrap_or(false);
        let is_gallery = post.get("is_gallery").and_then(Value::as_bool).unwrap_or(false);
        is_video && !is_gallery
    })
}

impl RedditStrategy {
    pub fn new(client: reqwest::Client, browser: BrowserAccess) -> Self {
        Self { client, browser }
    }

    async fn fetch_listing(&self, post_url: &str) -> Result<Value, DownloadError> {
        let url = json_url(post_url);
        debug!(url = %url, "fetching post json");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::NetworkError(format!("{} returned {}", url, status)));
        }
        Ok(response.json::<Value>().await?)
    }

    async fn video(&self, source: &SourceDescriptor) -> Result<RetrievedMedia, DownloadError> {
        let page = self.browser.open().await?;
        let result = scrape_video(page.as_ref(), &source.raw_url, &self.browser.timeouts).await;
        let src = close_after(page, result).await?;
        Ok(RetrievedMedia::remote(source, vec![src], ".mp4"))
    }

    async fn images(&self, source: &SourceDescriptor) -> Result<RetrievedMedia, DownloadError> {
        let listing = self.fetch_listing(&source.raw_url).await?;
        let urls = extract_image_urls(&listing);

        if !urls.is_empty() {
            return Ok(RetrievedMedia::remote(source, urls, ".jpg"));
        }

        if is_video_post(&listing) {
            info!("post has no images; falling back to its video");
            return self.video(source).await;
        }

        Err(DownloadError::NoImagesFound(source.raw_url.clone()))
    }
}

#[async_trait]
impl RetrievalStrategy for RedditStrategy {
    fn name(&self) -> &'static str {
        "reddit"
    }

    async fn retrieve(
        &self,
        source: &SourceDescriptor,
        _session: Option<&Session>,
        _dest_dir: &Path,
    ) -> Result<RetrievedMedia, DownloadError> {
        match source.kind {
            ContentKind::DirectFile => Ok(DirectFileStrategy::media_for(source)),
            ContentKind::Image => self.images(source).await,
            ContentKind::Video => self.video(source).await,
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
    use crate::downloader::scrape::VIDEO_SRC_SCRIPT;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing(post: Value) -> Value {
        json!([{ "data": { "children": [{ "data": post }] } }, { "data": { "children": [] } }])
    }

    #[test]
    fn json_url_shapes() {
        assert_eq!(
            json_url("https://www.reddit.com/r/pics/comments/abc/title/#c1"),
            "https://www.reddit.com/r/pics/comments/abc/title/.json"
        );
        assert_eq!(
            json_url("https://www.reddit.com/r/pics/comments/abc/title"),
            "https://www.reddit.com/r/pics/comments/abc/title/.json"
        );
        assert_eq!(
            json_url("https://www.reddit.com/r/pics/comments/abc/t/?utm=1"),
            "https://www.reddit.com/r/pics/comments/abc/t/.json?utm=1"
        );
    }

    #[test]
    fn gallery_urls_are_unescaped_and_ordered() {
        let data = listing(json!({
            "url": "https://www.reddit.com/gallery/abc",
            "is_gallery": true,
            "gallery_data": { "items": [{ "media_id": "m2" }, { "media_id": "m1" }, { "media_id": "gone" }] },
            "media_metadata": {
                "m1": { "s": { "u": "https://preview.redd.it/m1.jpg?width=640&amp;s=aa" } },
                "m2": { "s": { "u": "https://preview.redd.it/m2.png?width=640&amp;s=bb" } }
            },
            "preview": { "images": [{ "source": { "url": "https://preview.redd.it/p.jpg" } }] }
        }));

        assert_eq!(
            extract_image_urls(&data),
            vec![
                "https://preview.redd.it/m2.png?width=640&s=bb",
                "https://preview.redd.it/m1.jpg?width=640&s=aa"
            ]
        );
    }

    #[test]
    fn direct_post_image_skips_previews() {
        let data = listing(json!({
            "url": "https://i.redd.it/xyz.jpg",
            "preview": { "images": [{ "source": { "url": "https://preview.redd.it/xyz.jpg?s=1&amp;a=2" } }] }
        }));
        assert_eq!(extract_image_urls(&data), vec!["https://i.redd.it/xyz.jpg"]);
    }

    #[test]
    fn previews_used_when_nothing_else() {
        let data = listing(json!({
            "url": "https://example.com/article",
            "preview": { "images": [{ "source": { "url": "https://external-preview.redd.it/q.jpg?a=1&amp;b=2" } }] }
        }));
        assert_eq!(
            extract_image_urls(&data),
            vec!["https://external-preview.redd.it/q.jpg?a=1&b=2"]
        );
        assert!(extract_image_urls(&json!({})).is_empty());
    }

    fn strategy(page: FakePage) -> (RedditStrategy, Arc<FakeLauncher>) {
        let launcher = Arc::new(FakeLauncher::new(page));
        let browser = BrowserAccess {
            launcher: launcher.clone(),
            options: LaunchOptions::headless(),
            timeouts: Timeouts::default(),
        };
        (RedditStrategy::new(reqwest::Client::new(), browser), launcher)
    }

    fn source(server: &MockServer, kind: ContentKind) -> SourceDescriptor {
        SourceDescriptor {
            platform: Platform::Reddit,
            content_id: "abc".into(),
            kind,
            raw_url: format!("{}/r/pics/comments/abc/title/", server.uri()),
        }
    }

    #[tokio::test]
    async fn images_from_post_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/pics/comments/abc/title/.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(json!({
                "url": "https://i.redd.it/one.png"
            }))))
            .mount(&server)
            .await;

        let (strategy, launcher) = strategy(FakePage::default());
        let media = strategy
            .retrieve(&source(&server, ContentKind::Image), None, Path::new("images"))
            .await
            .unwrap();

        assert_eq!(media.payload, MediaPayload::Remote(vec!["https://i.redd.it/one.png".into()]));
        assert!(launcher.calls().is_empty());
    }

    #[tokio::test]
    async fn video_post_falls_back_to_scrape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/pics/comments/abc/title/.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(json!({
                "url": "https://v.redd.it/k2j4h5",
                "is_video": true
            }))))
            .mount(&server)
            .await;

        let mut page = FakePage::new(&CallLog::default())
            .evaluating(VIDEO_SRC_SCRIPT, "https://v.redd.it/k2j4h5/DASH_720.mp4");
        page.has_selector = true;
        let (strategy, launcher) = strategy(page);

        let media = strategy
            .retrieve(&source(&server, ContentKind::Image), None, Path::new("images"))
            .await
            .unwrap();

        assert_eq!(
            media.payload,
            MediaPayload::Remote(vec!["https://v.redd.it/k2j4h5/DASH_720.mp4".into()])
        );
        assert_eq!(media.suggested_extension, ".mp4");
        assert_eq!(launcher.calls().last().map(String::as_str), Some("close"));
    }

    #[tokio::test]
    async fn text_post_has_no_images() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(json!({
                "url": "https://www.reddit.com/r/pics/comments/abc/title/",
                "selftext": "hello"
            }))))
            .mount(&server)
            .await;

        let (strategy, _) = strategy(FakePage::default());
        let err = strategy
            .retrieve(&source(&server, ContentKind::Image), None, Path::new("images"))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::NoImagesFound(_)));
    }

    #[tokio::test]
    async fn http_error_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let (strategy, _) = strategy(FakePage::default());
        let err = strategy
            .retrieve(&source(&server, ContentKind::Image), None, Path::new("images"))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::NetworkError(ref m) if m.contains("429")));
    }
}
