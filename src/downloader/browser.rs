// Browser automation seam
//
// Strategies and the login flow talk to `BrowserLauncher` / `BrowserPage`;
// the Chromium implementation drives a real browser over CDP.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    Cookie, CookieParam, CookieSameSite, TimeSinceEpoch,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::errors::DownloadError;
use super::session::SessionCookie;

const SELECTOR_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub user_agent: Option<String>,
    pub launch_timeout: Duration,
}

impl LaunchOptions {
    pub fn headless() -> Self {
        Self {
            headless: true,
            user_agent: None,
            launch_timeout: Duration::from_secs(30),
        }
    }

    pub fn visible() -> Self {
        Self {
            headless: false,
            ..Self::headless()
        }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }
}

/// Opens a fresh browser with a single page
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserPage>, DownloadError>;
}

/// One page of a launched browser. Owner must call `close`.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<(), DownloadError>;

    /// Navigate and wait for the load event; `PageLoadTimeout` past the deadline
    async fn goto(&self, url: &str, deadline: Duration) -> Result<(), DownloadError>;

    /// Wait until an element matches; `PageLoadTimeout` past the deadline
    async fn wait_for_selector(&self, selector: &str, deadline: Duration)
        -> Result<(), DownloadError>;

    /// Evaluate an expression that yields a string
    async fn evaluate_string(&self, script: &str) -> Result<String, DownloadError>;

    /// Every cookie in the browser's jar
    async fn cookies(&self) -> Result<Vec<SessionCookie>, DownloadError>;

    /// Whether this page's tab still exists in the browser
    async fn is_open(&self) -> Result<bool, DownloadError>;

    async fn close(&self) -> Result<(), DownloadError>;
}

/// Close the page, then hand back the result of the work done on it
pub async fn close_after<T>(
    page: Box<dyn BrowserPage>,
    result: Result<T, DownloadError>,
) -> Result<T, DownloadError> {
    if let Err(e) = page.close().await {
        warn!(error = %e, "failed to close browser");
    }
    result
}

pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserPage>, DownloadError> {
        let mut builder = BrowserConfig::builder()
            .launch_timeout(options.launch_timeout)
            .request_timeout(Duration::from_secs(60));

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(user_agent) = &options.user_agent {
            builder = builder.arg(format!("--user-agent={}", user_agent));
        }

        let config = builder.build().map_err(DownloadError::Browser)?;
        let (browser, mut handler) = Browser::launch(config).await.map_err(browser_error)?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "cdp handler");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(browser_error(e));
            }
        };

        debug!(headless = options.headless, "browser launched");

        Ok(Box::new(ChromiumPage {
            browser: Mutex::new(browser),
            page,
            handler_task,
        }))
    }
}

struct ChromiumPage {
    browser: Mutex<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<(), DownloadError> {
        let params = cookies.iter().map(to_cookie_param).collect::<Vec<_>>();
        let browser = self.browser.lock().await;
        browser.set_cookies(params).await.map_err(browser_error)?;
        Ok(())
    }

    async fn goto(&self, url: &str, deadline: Duration) -> Result<(), DownloadError> {
        match timeout(deadline, self.page.goto(url)).await {
            Ok(result) => result.map(|_| ()).map_err(browser_error),
            Err(_) => Err(DownloadError::PageLoadTimeout(format!(
                "{} did not load within {}s",
                url,
                deadline.as_secs()
            ))),
        }
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        deadline: Duration,
    ) -> Result<(), DownloadError> {
        let poll = async {
            loop {
                if self.page.find_element(selector).await.is_ok() {
                    return;
                }
                sleep(SELECTOR_POLL).await;
            }
        };

        timeout(deadline, poll).await.map_err(|_| {
            DownloadError::PageLoadTimeout(format!(
                "no `{}` element within {}s",
                selector,
                deadline.as_secs()
            ))
        })
    }

    async fn evaluate_string(&self, script: &str) -> Result<String, DownloadError> {
        let result = self.page.evaluate(script).await.map_err(browser_error)?;
        result
            .into_value::<String>()
            .map_err(|e| DownloadError::Browser(format!("script returned no string: {}", e)))
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>, DownloadError> {
        let browser = self.browser.lock().await;
        let cookies = browser.get_cookies().await.map_err(browser_error)?;
        Ok(cookies.into_iter().map(from_cdp_cookie).collect())
    }

    async fn is_open(&self) -> Result<bool, DownloadError> {
        let browser = self.browser.lock().await;
        let pages = browser.pages().await.map_err(browser_error)?;
        Ok(pages.iter().any(|p| p.target_id() == self.page.target_id()))
    }

    async fn close(&self) -> Result<(), DownloadError> {
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await.map(|_| ()).map_err(browser_error);
        // Reap the process even if the close command failed
        let _ = browser.wait().await;
        self.handler_task.abort();
        closed
    }
}

fn browser_error(e: chromiumoxide::error::CdpError) -> DownloadError {
    DownloadError::Browser(e.to_string())
}

fn to_cookie_param(cookie: &SessionCookie) -> CookieParam {
    let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
    param.domain = Some(cookie.domain.clone());
    param.path = Some(cookie.path.clone());
    param.secure = Some(cookie.secure);
    param.http_only = Some(cookie.http_only);
    param.same_site = cookie
        .same_site
        .as_deref()
        .and_then(|s| s.parse::<CookieSameSite>().ok());
    if cookie.expires > 0.0 {
        param.expires = Some(TimeSinceEpoch::new(cookie.expires));
    }
    param
}

fn from_cdp_cookie(cookie: Cookie) -> SessionCookie {
    SessionCookie {
        name: cookie.name,
        value: cookie.value,
        domain: cookie.domain,
        path: cookie.path,
        expires: if cookie.session { -1.0 } else { cookie.expires },
        http_only: cookie.http_only,
        secure: cookie.secure,
        same_site: cookie.same_site.map(|s| s.as_ref().to_string()),
    }
}

/// Scripted stand-ins for unit tests
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex as StdMutex};

    pub type CallLog = Arc<StdMutex<Vec<String>>>;

    #[derive(Default)]
    pub struct FakePage {
        pub log: CallLog,
        /// (script, result) pairs; unknown scripts fail
        pub evaluations: Vec<(String, String)>,
        /// One entry per `cookies` call; `None` simulates a closed browser
        pub cookie_polls: StdMutex<VecDeque<Option<Vec<SessionCookie>>>>,
        pub has_selector: bool,
        pub goto_times_out: bool,
        /// The user closed the tab but not the browser
        pub tab_closed: bool,
    }

    impl FakePage {
        pub fn new(log: &CallLog) -> Self {
            Self {
                log: log.clone(),
                ..Default::default()
            }
        }

        pub fn evaluating(mut self, script: &str, result: &str) -> Self {
            self.evaluations.push((script.to_string(), result.to_string()));
            self
        }

        fn record(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }
    }

    #[async_trait]
    impl BrowserPage for FakePage {
        async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<(), DownloadError> {
            self.record(format!("set_cookies {}", cookies.len()));
            Ok(())
        }

        async fn goto(&self, url: &str, _deadline: Duration) -> Result<(), DownloadError> {
            self.record(format!("goto {}", url));
            if self.goto_times_out {
                return Err(DownloadError::PageLoadTimeout(url.to_string()));
            }
            Ok(())
        }

        async fn wait_for_selector(
            &self,
            selector: &str,
            _deadline: Duration,
        ) -> Result<(), DownloadError> {
            self.record(format!("wait {}", selector));
            if self.has_selector {
                Ok(())
            } else {
                Err(DownloadError::PageLoadTimeout(selector.to_string()))
            }
        }

        async fn evaluate_string(&self, script: &str) -> Result<String, DownloadError> {
            self.evaluations
                .iter()
                .find(|(s, _)| s == script)
                .map(|(_, r)| r.clone())
                .ok_or_else(|| DownloadError::Browser("unexpected script".to_string()))
        }

        async fn cookies(&self) -> Result<Vec<SessionCookie>, DownloadError> {
            self.record("cookies".to_string());
            match self.cookie_polls.lock().unwrap().pop_front() {
                Some(Some(cookies)) => Ok(cookies),
                Some(None) => Err(DownloadError::Browser("target closed".to_string())),
                None => Ok(Vec::new()),
            }
        }

        async fn is_open(&self) -> Result<bool, DownloadError> {
            Ok(!self.tab_closed)
        }

        async fn close(&self) -> Result<(), DownloadError> {
            self.record("close".to_string());
            Ok(())
        }
    }

    /// Hands out one prepared page
    pub struct FakeLauncher {
        pub log: CallLog,
        page: StdMutex<Option<FakePage>>,
    }

    impl FakeLauncher {
        pub fn new(page: FakePage) -> Self {
            Self {
                log: page.log.clone(),
                page: StdMutex::new(Some(page)),
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BrowserLauncher for FakeLauncher {
        async fn launch(
            &self,
            options: &LaunchOptions,
        ) -> Result<Box<dyn BrowserPage>, DownloadError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("launch headless={}", options.headless));
            let page = self
                .page
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| DownloadError::Browser("launched twice".to_string()))?;
            Ok(Box::new(page))
        }
    }
}
