//! Short-lived bearer token cache with single-flight refresh.
//!
//! A [`TokenCache`] hands out the current token while it is fresh. Once the
//! token is within [`EXPIRY_MARGIN`] of expiry (or was never issued), the first
//! caller registers a refresh and every concurrent caller awaits that same
//! refresh. A failed refresh is reported to all of its waiters and leaves the
//! cache empty, so the next call starts over.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::http::fetch_json;

/// Tokens are treated as stale this long before their declared expiry.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("client credentials are not configured")]
    NotConfigured,
    #[error("token refresh failed: {0}")]
    Refresh(String),
}

/// A token as returned by the issuer, before it is stamped with an expiry instant.
#[derive(custom_debug_derive::Debug, Clone)]
pub struct IssuedToken {
    #[debug(skip)]
    pub value: String,
    pub expires_in: Duration,
}

/// Issues new bearer tokens.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn issue(&self) -> Result<IssuedToken, CredentialError>;
}

#[derive(custom_debug_derive::Debug, Clone)]
struct Token {
    #[debug(skip)]
    value: String,
    expires_at: Instant,
}

impl Token {
    fn is_fresh(&self, now: Instant) -> bool {
        now + EXPIRY_MARGIN < self.expires_at
    }
}

type PendingToken = Shared<BoxFuture<'static, Result<Token, CredentialError>>>;

enum TokenState {
    Empty,
    Ready(Token),
    Refreshing(PendingToken),
}

pub struct TokenCache {
    source: Arc<dyn TokenSource>,
    state: Arc<Mutex<TokenState>>,
}

impl TokenCache {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(TokenState::Empty)),
        }
    }

    /// Return a fresh token value, refreshing at most once across concurrent callers.
    pub async fn get_token(&self) -> Result<String, CredentialError> {
        let pending = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let in_flight = match &*state {
                TokenState::Ready(token) if token.is_fresh(Instant::now()) => {
                    return Ok(token.value.clone());
                }
                TokenState::Refreshing(pending) => Some(pending.clone()),
                TokenState::Ready(_) | TokenState::Empty => None,
            };
            match in_flight {
                Some(pending) => pending,
                None => {
                    let pending = self.start_refresh();
                    *state = TokenState::Refreshing(pending.clone());
                    pending
                }
            }
        };

        pending.await.map(|token| token.value)
    }

    fn start_refresh(&self) -> PendingToken {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);

        async move {
            debug!("refreshing bearer token");
            let result = source.issue().await.map(|issued| Token {
                value: issued.value,
                expires_at: Instant::now() + issued.expires_in,
            });

            let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
            *guard = match &result {
                Ok(token) => TokenState::Ready(token.clone()),
                Err(e) => {
                    warn!(error = %e, "bearer token refresh failed");
                    TokenState::Empty
                }
            };
            result
        }
        .boxed()
        .shared()
    }
}

/// Client-credentials grant against the Spotify accounts service.
#[derive(custom_debug_derive::Debug)]
pub struct SpotifyTokenSource {
    #[debug(skip)]
    http: Client,
    token_url: String,
    client_id: String,
    #[debug(skip)]
    client_secret: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    token_type: String,
    expires_in: u64,
}

impl SpotifyTokenSource {
    pub fn new(http: Client, client_id: String, client_secret: String) -> Self {
        Self {
            http,
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            client_id,
            client_secret,
        }
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

#[async_trait]
impl TokenSource for SpotifyTokenSource {
    async fn issue(&self) -> Result<IssuedToken, CredentialError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(CredentialError::NotConfigured);
        }

        let request = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")]);

        let response: TokenResponse = fetch_json(request, "spotify-token")
            .await
            .map_err(|e| CredentialError::Refresh(format!("{e:#}")))?;

        Ok(IssuedToken {
            value: response.access_token,
            expires_in: Duration::from_secs(response.expires_in),
        })
    }
}
