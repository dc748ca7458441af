use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Opaque session credential. Cloning shares the same snapshot.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::from(token.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(len={})", self.0.len())
    }
}

#[derive(Debug, Clone)]
pub struct SessionToken {
    pub credential: Credential,
    pub expires_at: u64,
    pub claims: SessionClaims,
}

/// Claims carried by the host's session token. `dest` is the shop origin.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SessionClaims {
    pub iss: Option<String>,
    pub dest: Option<String>,
    pub sub: Option<String>,
    pub exp: Option<u64>,
    pub iat: Option<u64>,
}

impl SessionClaims {
    /// Shop domain without scheme, e.g. `demo.myshopify.com`.
    pub fn shop_domain(&self) -> Option<String> {
        self.dest.as_deref().map(|dest| {
            dest.trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
                .to_string()
        })
    }
}

/// Anything able to produce a fresh session token.
#[async_trait]
pub trait TokenFetcher: Send + Sync {
    async fn fetch_token(&self) -> Result<SessionToken>;
}

#[derive(Clone)]
pub struct HostTokenClient {
    api_key: String,
    token_url: String,
    client: reqwest::Client,
}

impl fmt::Debug for HostTokenClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostTokenClient")
            .field("api_key", &"<redacted>")
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest {
    #[serde(rename = "apiKey")]
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    #[serde(rename = "expiresIn", default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

impl HostTokenClient {
    pub fn new(api_key: String, token_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_key,
            token_url,
            client,
        }
    }

    pub async fn fetch_session_token(&self) -> Result<SessionToken> {
        let request = TokenRequest {
            api_key: self.api_key.clone(),
        };

        let response = self
            .client
            .post(&self.token_url)
            .json(&request)
            .send()
            .await
            .context("Failed to send session token request")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Session token request failed with status: {}",
                response.status()
            ));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .context("Failed to parse session token response")?;

        let claims = Self::parse_claims(&token_response.token).unwrap_or_default();
        let expires_at = claims
            .exp
            .unwrap_or_else(|| unix_now() + token_response.expires_in);

        tracing::debug!(
            "Fetched session token: len={}, expires_at={}, dest={:?}",
            token_response.token.len(),
            expires_at,
            claims.dest
        );

        Ok(SessionToken {
            credential: Credential::new(token_response.token),
            expires_at,
            claims,
        })
    }

    pub fn parse_claims(token: &str) -> Result<SessionClaims> {
        let parts: Vec<&str> = token.split('.').collect();
        let [_, payload, _] = parts.as_slice() else {
            return Err(anyhow::anyhow!("Invalid JWT format"));
        };

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .context("Failed to decode JWT payload")?;

        serde_json::from_slice(&payload).context("Failed to parse JWT claims")
    }

    pub fn is_expired(token: &SessionToken) -> bool {
        token.expires_at <= unix_now() + 60
    }
}

#[async_trait]
impl TokenFetcher for HostTokenClient {
    async fn fetch_token(&self) -> Result<SessionToken> {
        self.fetch_session_token().await
    }
}
