//! Session token source.
//!
//! Keeps the host-issued credential fresh in the background. The first fetch
//! happens immediately on [`SessionTokenSource::start`]; afterwards one fetch
//! runs per refresh interval, and the next sleep only begins once the previous
//! fetch has settled, so there is never more than one fetch in flight.

use crate::auth::{Credential, TokenFetcher};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Refresh well inside the ~60 minute validity of a host session token.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(50 * 60);

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub credential: Option<Credential>,
    pub error: Option<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Number of fetches that have settled, successful or not.
    pub fetches: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Session token source stopped before a token was fetched")]
    Stopped,
}

/// Read access to the current credential.
pub trait TokenProvider: Send + Sync {
    fn current_token(&self) -> Option<Credential>;
}

/// A fixed credential, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<Credential>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(Credential::new(token)))
    }

    pub fn absent() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    fn current_token(&self) -> Option<Credential> {
        self.0.clone()
    }
}

pub struct SessionTokenSource {
    state: watch::Receiver<SessionState>,
    task: JoinHandle<()>,
}

impl SessionTokenSource {
    /// Spawns the refresh task on the current tokio runtime.
    pub fn start(fetcher: Arc<dyn TokenFetcher>, refresh_interval: Duration) -> Self {
        let (tx, rx) = watch::channel(SessionState::default());
        let task = tokio::spawn(refresh_loop(fetcher, refresh_interval, tx));

        Self { state: rx, task }
    }

    pub fn current_token(&self) -> Option<Credential> {
        self.state.borrow().credential.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn has_error(&self) -> bool {
        self.state.borrow().error.is_some()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Waits for the first fetch to settle.
    pub async fn ready(&self) -> Result<Credential, SessionError> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|state| state.fetches > 0)
            .await
            .map_err(|_| SessionError::Stopped)?
            .clone();

        match (state.credential, state.error) {
            (Some(credential), _) => Ok(credential),
            (None, Some(error)) => Err(SessionError::AuthenticationFailed(error)),
            (None, None) => Err(SessionError::Stopped),
        }
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl TokenProvider for SessionTokenSource {
    fn current_token(&self) -> Option<Credential> {
        SessionTokenSource::current_token(self)
    }
}

impl Drop for SessionTokenSource {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn refresh_loop(
    fetcher: Arc<dyn TokenFetcher>,
    refresh_interval: Duration,
    tx: watch::Sender<SessionState>,
) {
    loop {
        let result = fetcher.fetch_token().await;

        tx.send_modify(|state| {
            state.fetches += 1;
            match result {
                Ok(token) => {
                    tracing::debug!("Session token refreshed, expires_at={}", token.expires_at);
                    state.credential = Some(token.credential);
                    state.error = None;
                    state.refreshed_at = Some(Utc::now());
                }
                Err(e) => {
                    // A stale credential may still be accepted, so it is kept.
                    if state.credential.is_some() {
                        tracing::warn!("Session token refresh failed, keeping previous token: {}", e);
                    } else {
                        tracing::error!("Session token fetch failed: {}", e);
                    }
                    state.error = Some(e.to_string());
                }
            }
        });

        tokio::time::sleep(refresh_interval).await;
    }
}
