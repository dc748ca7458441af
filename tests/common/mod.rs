#![allow(dead_code)]

use async_trait::async_trait;
use bundle_admin::auth::{Credential, SessionClaims, SessionToken, TokenFetcher};
use bundle_admin::infrastructure::RequestExecutor;
use bundle_admin::notify::{Notice, NotificationSink};
use bundle_admin::session::StaticToken;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_TOKEN: &str = "test-session-token";

/// Keeps every notice for later inspection.
#[derive(Default)]
pub struct RecordingSink {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingSink {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices().into_iter().map(|n| n.message).collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub fn executor_with_token(base_url: String, token: Option<&str>) -> (Arc<RequestExecutor>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let tokens = match token {
        Some(token) => StaticToken::new(token),
        None => StaticToken::absent(),
    };
    let executor = RequestExecutor::new(base_url, Arc::new(tokens), sink.clone());
    (Arc::new(executor), sink)
}

pub fn executor(base_url: String) -> (Arc<RequestExecutor>, Arc<RecordingSink>) {
    executor_with_token(base_url, Some(TEST_TOKEN))
}

/// Token fetcher that follows a script of successes and failures and
/// records how many fetches overlap.
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<bool>>,
    latency: Duration,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<bool>, latency: Duration) -> Self {
        Self {
            script: Mutex::new(script.into()),
            latency,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn always_ok(latency: Duration) -> Self {
        Self::new(Vec::new(), latency)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenFetcher for ScriptedFetcher {
    async fn fetch_token(&self) -> anyhow::Result<SessionToken> {
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let succeed = self.script.lock().unwrap().pop_front().unwrap_or(true);

        if succeed {
            Ok(SessionToken {
                credential: Credential::new(format!("token-{}", call)),
                expires_at: 9999999999,
                claims: SessionClaims::default(),
            })
        } else {
            Err(anyhow::anyhow!("host unavailable"))
        }
    }
}
