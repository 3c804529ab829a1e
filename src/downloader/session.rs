// Session persistence: cookies captured after an interactive login
//
// Files use the browser "storage state" layout ({"cookies": [...], "origins": []})
// so a state exported by other automation tools can be dropped in unchanged.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::errors::DownloadError;
use super::models::Platform;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Unix seconds; -1 marks a session cookie
    #[serde(default = "session_expiry")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_path() -> String {
    "/".to_string()
}

fn session_expiry() -> f64 {
    -1.0
}

impl SessionCookie {
    pub fn is_expired_at(&self, now_unix: f64) -> bool {
        self.expires > 0.0 && self.expires <= now_unix
    }

    /// RFC 3339 expiry for display, `None` for session cookies
    pub fn expiry_display(&self) -> Option<String> {
        if self.expires <= 0.0 {
            return None;
        }
        OffsetDateTime::from_unix_timestamp(self.expires as i64)
            .ok()
            .and_then(|t| t.format(&Rfc3339).ok())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StorageState {
    cookies: Vec<SessionCookie>,
    #[serde(default)]
    origins: Vec<serde_json::Value>,
}

/// Authenticated cookie set for one platform
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub platform: Platform,
    pub cookies: Vec<SessionCookie>,
    pub path: PathBuf,
}

impl Session {
    pub fn cookie(&self, name: &str) -> Option<&SessionCookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    /// The platform's login marker is present and not expired
    pub fn is_valid_at(&self, now_unix: f64) -> bool {
        match self.platform.login_marker_cookie() {
            Some(marker) => self
                .cookie(marker)
                .map_or(false, |c| !c.value.is_empty() && !c.is_expired_at(now_unix)),
            None => !self.cookies.is_empty(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_unix())
    }
}

pub fn now_unix() -> f64 {
    OffsetDateTime::now_utc().unix_timestamp() as f64
}

/// One cookie file per platform inside a configurable directory
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, platform: Platform) -> PathBuf {
        self.dir.join(format!("{}_cookies.json", platform.as_str()))
    }

    /// Stored session, or `None` when absent or unreadable (a fresh login replaces it)
    pub async fn load(&self, platform: Platform) -> Result<Option<Session>, DownloadError> {
        let path = self.path_for(platform);

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no stored session");
                return Ok(None);
            }
            Err(e) => {
                return Err(DownloadError::Session(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        match serde_json::from_str::<StorageState>(&raw) {
            Ok(state) => {
                debug!(path = %path.display(), cookies = state.cookies.len(), "loaded session");
                Ok(Some(Session {
                    platform,
                    cookies: state.cookies,
                    path,
                }))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    /// Write the session, replacing any previous file for the platform
    pub async fn save(
        &self,
        platform: Platform,
        cookies: Vec<SessionCookie>,
    ) -> Result<Session, DownloadError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            DownloadError::Session(format!("cannot create {}: {}", self.dir.display(), e))
        })?;

        let path = self.path_for(platform);
        let state = StorageState {
            cookies,
            origins: Vec::new(),
        };
        let json = serde_json::to_string_pretty(&state)?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| DownloadError::Session(format!("cannot write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| DownloadError::Session(format!("cannot write {}: {}", path.display(), e)))?;

        info!(path = %path.display(), cookies = state.cookies.len(), "session saved");

        Ok(Session {
            platform,
            cookies: state.cookies,
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cookie(name: &str, expires: f64) -> SessionCookie {
        SessionCookie {
            name: name.to_string(),
            value: "v".to_string(),
            domain: ".facebook.com".to_string(),
            path: "/".to_string(),
            expires,
            http_only: true,
            secure: true,
            same_site: Some("None".to_string()),
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let cookies = vec![cookie("c_user", 4_000_000_000.0), cookie("xs", -1.0)];

        let saved = store.save(Platform::Facebook, cookies.clone()).await.unwrap();
        assert_eq!(saved.path, dir.path().join("facebook_cookies.json"));

        let loaded = store.load(Platform::Facebook).await.unwrap().unwrap();
        assert_eq!(loaded.cookies, cookies);
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        assert!(store.load(Platform::Facebook).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        std::fs::write(store.path_for(Platform::Facebook), "{not json").unwrap();
        assert!(store.load(Platform::Facebook).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reads_foreign_storage_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let json = r#"{"cookies":[{"name":"c_user","value":"100","domain":".facebook.com","path":"/","expires":1999999999,"httpOnly":false,"secure":true,"sameSite":"None"}],"origins":[{"origin":"https://www.facebook.com","localStorage":[]}]}"#;
        std::fs::write(store.path_for(Platform::Facebook), json).unwrap();

        let session = store.load(Platform::Facebook).await.unwrap().unwrap();
        assert_eq!(session.cookie("c_user").unwrap().value, "100");
        assert!(session.is_valid_at(1_700_000_000.0));
        assert!(!session.is_valid_at(2_000_000_000.0));
    }

    #[test]
    fn validity_needs_marker_cookie() {
        let session = Session {
            platform: Platform::Facebook,
            cookies: vec![cookie("xs", -1.0)],
            path: PathBuf::from("facebook_cookies.json"),
        };
        assert!(!session.is_valid_at(0.0));
        assert_eq!(cookie("c_user", -1.0).expiry_display(), None);
        assert_eq!(
            cookie("c_user", 0.5e9).expiry_display().as_deref(),
            Some("1985-11-05T00:53:20Z")
        );
    }
}
