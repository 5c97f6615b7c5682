//! The five-step browser-emulated B2C login
//!
//! 1. authorize (collect request id + CSRF cookie)
//! 2. build the `StateProperties` transaction value
//! 3. post the credentials to `SelfAsserted`
//! 4. follow `confirmed` manually and pull the code out of the redirect
//! 5. exchange the code for tokens
//!
//! A `LoginFlow` owns the cookie jar and the HTTP clients of one attempt.
//! Dropping it releases the connections.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{LOCATION, USER_AGENT};
use reqwest::{Client, StatusCode, redirect};
use serde_json::{Value, json};
use url::Url;

use super::Credentials;
use super::endpoints::{
    CLIENT_ID, CSRF_COOKIE, CSRF_HEADER, IdentityEndpoints, POLICY, REDIRECT_URI,
    REQUEST_ID_HEADER, SCOPE,
};
use super::pkce::PkceChallenge;
use super::token::TokenResult;
use crate::error::{RemehaError, Result};
use crate::logging::StructuredLogger;

/// Values threaded through one login attempt
#[derive(Debug, Clone)]
pub struct AuthState {
    pub request_id: String,
    pub csrf_token: String,
    pub state_properties: String,
    pub authorization_code: Option<String>,
}

/// `base64url({"TID": request_id})` without padding
pub fn encode_state_properties(request_id: &str) -> Result<String> {
    let json = serde_json::to_string(&json!({ "TID": request_id }))?;
    Ok(URL_SAFE_NO_PAD.encode(json.as_bytes()))
}

pub(crate) fn user_agent() -> String {
    format!("remeha-home/{}", env!("CARGO_PKG_VERSION"))
}

/// HTTP session of a single login attempt
pub struct LoginFlow {
    endpoints: IdentityEndpoints,
    jar: Arc<Jar>,
    client: Client,
    no_redirect: Client,
    logger: StructuredLogger,
}

impl LoginFlow {
    pub fn new(
        endpoints: IdentityEndpoints,
        timeout: Duration,
        logger: StructuredLogger,
    ) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(timeout)
            .build()?;
        let no_redirect = Client::builder()
            .cookie_provider(jar.clone())
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            endpoints,
            jar,
            client,
            no_redirect,
            logger,
        })
    }

    /// Run the full authorization-code + PKCE login
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenResult> {
        let pkce = PkceChallenge::generate();

        let mut state = self.authorize(&pkce).await?;
        self.logger
            .debug(&format!("Login transaction started (request id {})", state.request_id));

        self.submit_credentials(&state, credentials).await?;

        let code = self.confirm(&state).await?;
        state.authorization_code = Some(code.clone());

        self.exchange_code(&code, &pkce.code_verifier).await
    }

    /// Redeem a refresh token at the token endpoint
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResult> {
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", CLIENT_ID),
        ])
        .await
    }

    async fn authorize(&self, pkce: &PkceChallenge) -> Result<AuthState> {
        let resp = self
            .client
            .get(self.endpoints.authorize_url())
            .header(USER_AGENT, user_agent())
            .query(&[
                ("response_type", "code"),
                ("client_id", CLIENT_ID),
                ("redirect_uri", REDIRECT_URI),
                ("scope", SCOPE),
                ("state", pkce.state.as_str()),
                ("code_challenge", pkce.code_challenge.as_str()),
                ("code_challenge_method", pkce.challenge_method()),
                ("p", POLICY),
                ("brand", "remeha"),
                ("lang", "en"),
                ("nonce", "defaultNonce"),
                ("prompt", "login"),
                ("signUp", "False"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RemehaError::auth(format!(
                "authorize request returned {}",
                status
            )));
        }

        let request_id = resp
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| RemehaError::auth("authorize response has no x-request-id header"))?;

        let csrf_token = self
            .csrf_cookie(resp.url())
            .ok_or_else(|| RemehaError::auth("no x-ms-cpim-csrf cookie after authorize"))?;

        let state_properties = encode_state_properties(&request_id)?;
        Ok(AuthState {
            request_id,
            csrf_token,
            state_properties,
            authorization_code: None,
        })
    }

    /// CSRF cookie as the jar would send it to the identity host
    fn csrf_cookie(&self, response_url: &Url) -> Option<String> {
        let mut candidates = vec![response_url.clone()];
        if let Ok(url) = Url::parse(&self.endpoints.self_asserted_url()) {
            candidates.push(url);
        }
        candidates.iter().find_map(|url| {
            let header = self.jar.cookies(url)?;
            let header = header.to_str().ok()?.to_string();
            header.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == CSRF_COOKIE && !value.is_empty()).then(|| value.to_string())
            })
        })
    }

    async fn submit_credentials(&self, state: &AuthState, credentials: &Credentials) -> Result<()> {
        let tx = format!("StateProperties={}", state.state_properties);
        let resp = self
            .client
            .post(self.endpoints.self_asserted_url())
            .header(USER_AGENT, user_agent())
            .header(CSRF_HEADER, state.csrf_token.as_str())
            .query(&[("tx", tx.as_str()), ("p", POLICY)])
            .form(&[
                ("request_type", "RESPONSE"),
                ("signInName", credentials.email.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RemehaError::auth(format!(
                "SelfAsserted returned {}",
                status
            )));
        }

        let body = resp.text().await?;
        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| RemehaError::auth(format!("malformed SelfAsserted response: {}", e)))?;
        let asserted = match parsed.get("status") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        if asserted != "200" {
            let message = parsed
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no message");
            return Err(RemehaError::auth(format!(
                "credentials rejected (status {}): {}",
                if asserted.is_empty() { "missing" } else { asserted.as_str() },
                message
            )));
        }
        Ok(())
    }

    async fn confirm(&self, state: &AuthState) -> Result<String> {
        let tx = format!("StateProperties={}", state.state_properties);
        let resp = self
            .no_redirect
            .get(self.endpoints.confirmed_url())
            .header(USER_AGENT, user_agent())
            .query(&[
                ("rememberMe", "false"),
                ("csrf_token", state.csrf_token.as_str()),
                ("tx", tx.as_str()),
                ("p", POLICY),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_redirection() {
            return Err(RemehaError::auth(format!(
                "confirmed endpoint returned {} instead of a redirect",
                status
            )));
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RemehaError::auth("redirect without Location header"))?;
        let callback = match Url::parse(location) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => resp.url().join(location)?,
            Err(e) => {
                return Err(RemehaError::auth(format!(
                    "unparseable callback location: {}",
                    e
                )));
            }
        };

        let mut code = None;
        let mut error = None;
        for (key, value) in callback.query_pairs() {
            match key.as_ref() {
                "code" if !value.is_empty() => code = Some(value.into_owned()),
                "error_description" | "error" if error.is_none() => {
                    error = Some(value.into_owned())
                }
                _ => {}
            }
        }
        code.ok_or_else(|| {
            RemehaError::auth(format!(
                "callback carries no authorization code ({})",
                error.unwrap_or_else(|| "no error given".to_string())
            ))
        })
    }

    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenResult> {
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", REDIRECT_URI),
            ("code_verifier", code_verifier),
            ("client_id", CLIENT_ID),
        ])
        .await
    }

    async fn request_token(&self, grant: &[(&str, &str)]) -> Result<TokenResult> {
        let resp = self
            .client
            .post(self.endpoints.token_url())
            .header(USER_AGENT, user_agent())
            .query(&[("p", POLICY)])
            .form(grant)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if status == StatusCode::BAD_REQUEST {
            // Seen intermittently from the tenant; a fresh login next cycle recovers
            let description = serde_json::from_str::<Value>(&body).ok().and_then(|v| {
                v.get("error_description")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
            if let Some(description) = description {
                self.logger.warn(&format!(
                    "OAuth2 token request returned '400 Bad Request': {}",
                    description
                ));
                return Err(RemehaError::token_exchange(description));
            }
        }
        if !status.is_success() {
            return Err(RemehaError::auth(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let token: TokenResult = serde_json::from_str(&body)
            .map_err(|e| RemehaError::auth(format!("malformed token response: {}", e)))?;
        if token.access_token.trim().is_empty() {
            return Err(RemehaError::auth("token response has an empty access_token"));
        }
        Ok(token)
    }
}
