// Interactive login: a visible browser, a human, and a cookie poll

use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::browser::{close_after, BrowserLauncher, BrowserPage, LaunchOptions};
use super::errors::DownloadError;
use super::models::Platform;
use super::session::{Session, SessionCookie, SessionStore};

const LOGIN_PAGE_DEADLINE: Duration = Duration::from_secs(60);

pub struct LoginFlow {
    interval: Duration,
}

impl LoginFlow {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Poll the cookie jar until `marker` shows up. No deadline: the user may
    /// take as long as needed. Ends with `LoginAborted` on cancel or when the
    /// browser or the login tab goes away.
    pub async fn wait_for_marker(
        &self,
        page: &dyn BrowserPage,
        marker: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<SessionCookie>, DownloadError> {
        let mut polls: u32 = 0;

        loop {
            let cookies = page.cookies().await.map_err(|e| {
                DownloadError::LoginAborted(format!("browser closed before login completed ({})", e))
            })?;
            polls += 1;

            if cookies.iter().any(|c| c.name == marker && !c.value.is_empty()) {
                debug!(polls, "login marker found");
                return Ok(cookies);
            }

            if !page.is_open().await.unwrap_or(false) {
                return Err(DownloadError::LoginAborted(
                    "login tab was closed before login completed".to_string(),
                ));
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(DownloadError::LoginAborted("cancelled".to_string()));
                }
                _ = sleep(self.interval) => {}
            }
        }
    }

    /// Open the platform's login page, wait for the user, persist the cookies.
    /// The browser is closed on every path.
    pub async fn run(
        &self,
        launcher: &dyn BrowserLauncher,
        store: &SessionStore,
        platform: Platform,
        options: &LaunchOptions,
        cancel: &CancellationToken,
    ) -> Result<Session, DownloadError> {
        let (login_url, marker) = match (platform.login_url(), platform.login_marker_cookie()) {
            (Some(url), Some(marker)) => (url, marker),
            _ => {
                return Err(DownloadError::Session(format!(
                    "{} has no login flow",
                    platform
                )))
            }
        };

        let options = LaunchOptions {
            headless: false,
            ..options.clone()
        };
        let page = launcher.launch(&options).await?;

        let result = async {
            page.goto(login_url, LOGIN_PAGE_DEADLINE).await?;
            eprintln!(
                "[Login] Log in to {} in the opened browser window. Waiting for the session cookie...",
                platform
            );
            self.wait_for_marker(page.as_ref(), marker, cancel).await
        }
        .await;

        let cookies = close_after(page, result).await?;
        let session = store.save(platform, cookies).await?;
        info!(platform = %platform, path = %session.path.display(), "login complete");
        Ok(session)
    }
}
