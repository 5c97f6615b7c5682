//! Authentication against the vendor's B2C tenant
//!
//! [`AuthSession`] hands out bearer tokens. It reuses the cached token while
//! it is valid, tries the refresh grant once it expires, and falls back to the
//! full PKCE login ([`flow::LoginFlow`]) otherwise.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::config::Config;
use crate::error::{RemehaError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};

pub mod endpoints;
pub mod flow;
pub mod pkce;
pub mod token;

pub use endpoints::IdentityEndpoints;
pub use flow::{AuthState, LoginFlow, encode_state_properties};
pub use pkce::PkceChallenge;
pub use token::{TokenClaims, TokenResult, decode_claims, is_token_valid};

/// Account credentials; kept in memory only
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new<E: Into<String>, P: Into<String>>(email: E, password: P) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl From<&crate::config::CredentialsConfig> for Credentials {
    fn from(cfg: &crate::config::CredentialsConfig) -> Self {
        Self::new(cfg.email.trim(), cfg.password.clone())
    }
}

/// Lifecycle of the cached token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoToken,
    LoggingIn,
    Refreshing,
    Valid,
    Expiring,
    Failed(String),
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: TokenResult,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.access_token.is_empty()
            && self
                .expires_at
                .is_some_and(|exp| token::expiry_is_valid(exp, now))
    }
}

/// Token cache plus login driver for one account
pub struct AuthSession {
    endpoints: IdentityEndpoints,
    http_timeout: Duration,
    use_refresh_token: bool,
    clock: Arc<dyn Clock>,
    cached: Option<CachedToken>,
    state: SessionState,
    logins: u64,
    logger: StructuredLogger,
}

impl AuthSession {
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("auth").with_account(config.credentials.email.trim()),
        );
        Self {
            endpoints: IdentityEndpoints::new(&config.endpoints.identity_base_url),
            http_timeout: config.http_timeout(),
            use_refresh_token: config.auth.use_refresh_token,
            clock,
            cached: None,
            state: SessionState::NoToken,
            logins: 0,
            logger,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Number of full logins performed so far
    pub fn login_count(&self) -> u64 {
        self.logins
    }

    /// Currently cached token, valid or not
    pub fn cached_token(&self) -> Option<&TokenResult> {
        self.cached.as_ref().map(|c| &c.token)
    }

    /// Whether the cached token can be used right now
    pub fn has_valid_token(&self) -> bool {
        let now = self.clock.now();
        self.cached.as_ref().is_some_and(|c| c.is_valid_at(now))
    }

    /// Drop the cached token (stop, credential change)
    pub fn invalidate(&mut self) {
        self.cached = None;
        self.state = SessionState::NoToken;
    }

    /// Return a valid access token, logging in only when needed
    pub async fn ensure_token(&mut self, credentials: &Credentials) -> Result<String> {
        let now = self.clock.now();

        if let Some(cached) = &self.cached {
            if cached.is_valid_at(now) {
                self.state = SessionState::Valid;
                return Ok(cached.token.access_token.clone());
            }
            self.state = SessionState::Expiring;
            self.logger.debug("Cached token expired or about to expire");
        } else if matches!(self.state, SessionState::Failed(_)) {
            // A failed attempt is never resumed; start over
            self.state = SessionState::NoToken;
        }

        if credentials.email.is_empty() || credentials.password.is_empty() {
            let err = RemehaError::auth("credentials not configured");
            self.fail(&err);
            return Err(err);
        }

        let flow = match LoginFlow::new(
            self.endpoints.clone(),
            self.http_timeout,
            self.logger.clone(),
        ) {
            Ok(flow) => flow,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        let previous = self.cached.take();
        let refresh_token = previous
            .as_ref()
            .and_then(|c| c.token.refresh_token.clone())
            .filter(|_| self.use_refresh_token);

        if let Some(refresh_token) = refresh_token {
            self.state = SessionState::Refreshing;
            match flow.refresh(&refresh_token).await {
                Ok(mut token) => {
                    if token.refresh_token.is_none() {
                        token.refresh_token = Some(refresh_token);
                    }
                    self.logger.info("Access token refreshed");
                    return Ok(self.store(token));
                }
                Err(e) => {
                    self.logger
                        .warn(&format!("Token refresh failed, logging in again: {}", e));
                }
            }
        }

        self.state = SessionState::LoggingIn;
        self.logins += 1;
        match flow.login(credentials).await {
            Ok(token) => {
                self.logger.info("Logged in to Remeha Home");
                Ok(self.store(token))
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
        // `flow` (cookie jar + connections) is dropped here on every path
    }

    fn store(&mut self, token: TokenResult) -> String {
        let received_at = self.clock.now();
        let expires_at = token.expires_at(received_at);
        if expires_at.is_none() {
            self.logger
                .warn("Token response carries no expiry; it will not be reused");
        }
        let access_token = token.access_token.clone();
        self.cached = Some(CachedToken { token, expires_at });
        self.state = SessionState::Valid;
        access_token
    }

    fn fail(&mut self, err: &RemehaError) {
        self.cached = None;
        self.state = SessionState::Failed(err.to_string());
        if err.is_transient() {
            self.logger
                .warn(&format!("Login failed, will retry next cycle: {}", err));
        } else {
            self.logger.error(&format!("Login failed: {}", err));
        }
    }
}
