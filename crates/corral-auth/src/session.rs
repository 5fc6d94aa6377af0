//! Browser sessions identified by a cookie
//!
//! Sessions slide: once more than half of a session's lifetime has passed,
//! authenticating with it renews the session and hands back a replacement
//! cookie for the response.

use chrono::{DateTime, Duration, Utc};
use moka::future::Cache;
use tracing::{debug, info, instrument};

use corral_core::{BrowserSession, CorralError, Result};

/// Browser session settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub max_age_secs: i64,
    /// Add the `Secure` attribute to cookies
    pub secure: bool,
    pub max_sessions: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "corral-browser-session".to_string(),
            max_age_secs: 6 * 60 * 60,
            secure: true,
            max_sessions: 100_000,
        }
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    identity: String,
    issued_at: DateTime<Utc>,
}

/// Server-side browser session store
#[derive(Clone)]
pub struct BrowserSessionStore {
    config: SessionConfig,
    sessions: Cache<String, SessionEntry>,
}

impl BrowserSessionStore {
    pub fn new(config: SessionConfig) -> Self {
        let ttl = std::time::Duration::from_secs(config.max_age_secs.max(1) as u64);
        let sessions = Cache::builder()
            .max_capacity(config.max_sessions)
            .time_to_live(ttl)
            .build();
        Self { config, sessions }
    }

    /// Start a session for `identity` and return the `Set-Cookie` value
    #[instrument(skip(self))]
    pub async fn create(&self, identity: &str) -> String {
        let session_id = uuid::Uuid::new_v4().simple().to_string();
        self.sessions
            .insert(
                session_id.clone(),
                SessionEntry {
                    identity: identity.to_string(),
                    issued_at: Utc::now(),
                },
            )
            .await;
        info!(identity, "Started browser session");
        self.cookie(&session_id, self.config.max_age_secs)
    }

    /// End the session named in the cookie header and return a clearing cookie
    pub async fn revoke(&self, cookie_header: Option<&str>) -> String {
        if let Some(session_id) = self.session_id(cookie_header) {
            self.sessions.invalidate(&session_id).await;
            debug!("Revoked browser session");
        }
        self.cookie("", 0)
    }

    /// Resolve the cookie header to the session's identity
    #[instrument(skip(self, cookie_header))]
    pub async fn authenticate(&self, cookie_header: Option<&str>) -> Result<BrowserSession> {
        let session_id = self
            .session_id(cookie_header)
            .ok_or_else(|| CorralError::unauthenticated("no browser session cookie"))?;
        let entry = self
            .sessions
            .get(&session_id)
            .await
            .ok_or_else(|| CorralError::unauthenticated("browser session expired or unknown"))?;

        let age = Utc::now() - entry.issued_at;
        let refreshed_cookie = if age > Duration::seconds(self.config.max_age_secs / 2) {
            let renewed_entry = SessionEntry {
                identity: entry.identity.clone(),
                issued_at: Utc::now(),
            };
            self.sessions.insert(session_id.clone(), renewed_entry).await;
            debug!(identity = %entry.identity, "Renewed browser session");
            Some(self.cookie(&session_id, self.config.max_age_secs))
        } else {
            None
        };

        Ok(BrowserSession {
            identity: entry.identity,
            refreshed_cookie,
        })
    }

    #[cfg(test)]
    pub(crate) async fn backdate(&self, cookie_header: Option<&str>, secs: i64) {
        if let Some(session_id) = self.session_id(cookie_header) {
            if let Some(mut entry) = self.sessions.get(&session_id).await {
                entry.issued_at = entry.issued_at - Duration::seconds(secs);
                self.sessions.insert(session_id, entry).await;
            }
        }
    }

    fn session_id(&self, cookie_header: Option<&str>) -> Option<String> {
        cookie_header?
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.config.cookie_name)
            .map(|(_, value)| value.to_string())
            .filter(|value| !value.is_empty())
    }

    fn cookie(&self, value: &str, max_age_secs: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.config.cookie_name, value, max_age_secs
        );
        if self.config.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}
