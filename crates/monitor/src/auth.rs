//! Twitch credential handling.
//!
//! A client-credentials grant against the vendor token endpoint, cached
//! process-wide and refreshed shortly before expiry.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::info;

use crate::error::WatchError;

const TOKEN_ENDPOINT: &str = "https://id.twitch.tv/oauth2/token";

/// Refresh this long before the vendor's expiry to stay clear of clock
/// skew on their side.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// A successful client-credentials exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: u64,
}

/// Capability for performing the token exchange, injectable for tests.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self) -> Result<TokenGrant, WatchError>;
}

/// Production exchange against the Twitch OAuth endpoint.
pub struct HelixTokenExchange {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    endpoint: String,
}

impl HelixTokenExchange {
    pub fn new(
        client: reqwest::Client,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            endpoint: TOKEN_ENDPOINT.to_string(),
        }
    }
}

#[async_trait]
impl TokenExchange for HelixTokenExchange {
    async fn exchange(&self) -> Result<TokenGrant, WatchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| WatchError::Auth(e.to_string()))?
            .error_for_status()
            .map_err(|e| WatchError::Auth(e.to_string()))?;

        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| WatchError::Auth(e.to_string()))
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Process-wide bearer-token cache.
///
/// The whole read-or-refresh runs under one async mutex, so concurrent
/// callers cannot trigger duplicate refreshes. A failed refresh leaves
/// the stored state untouched.
pub struct CredentialCache {
    exchange: Arc<dyn TokenExchange>,
    state: Mutex<Option<CachedToken>>,
    margin: Duration,
}

impl CredentialCache {
    pub fn new(exchange: Arc<dyn TokenExchange>) -> Self {
        Self::with_margin(exchange, EXPIRY_MARGIN)
    }

    pub fn with_margin(exchange: Arc<dyn TokenExchange>, margin: Duration) -> Self {
        Self {
            exchange,
            state: Mutex::new(None),
            margin,
        }
    }

    /// Cached bearer token, refreshed when past its safety margin.
    pub async fn bearer(&self) -> Result<String, WatchError> {
        let mut state = self.state.lock().await;

        if let Some(token) = state.as_ref()
            && Instant::now() < token.expires_at
        {
            return Ok(token.value.clone());
        }

        let grant = self.exchange.exchange().await?;
        let ttl = Duration::from_secs(grant.expires_in).saturating_sub(self.margin);
        info!("obtained new Twitch API token");

        let value = grant.access_token.clone();
        *state = Some(CachedToken {
            value: grant.access_token,
            expires_at: Instant::now() + ttl,
        });
        Ok(value)
    }
}
