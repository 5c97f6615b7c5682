//! Token endpoint results and expiry checks
//!
//! Access tokens are opaque to this client. The only thing ever read from
//! them is the `exp` claim, parsed as plain JSON from the payload segment.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{RemehaError, Result};

/// Tokens expiring within this margin are treated as expired
pub const EXPIRY_MARGIN_SECS: i64 = 5;

/// Successful response of the OAuth2 token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResult {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub expires_in: Option<i64>,
    /// Absolute expiry (unix seconds), when the endpoint reports it directly
    #[serde(default, deserialize_with = "lenient_i64")]
    pub exp: Option<i64>,
}

impl TokenResult {
    /// Absolute expiry: explicit `exp`, then `expires_in`, then the JWT claim
    pub fn expires_at(&self, received_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let Some(exp) = self.exp {
            return DateTime::from_timestamp(exp, 0);
        }
        if let Some(secs) = self.expires_in {
            // Out-of-range lifetimes count as no expiry
            return Duration::try_seconds(secs).and_then(|d| received_at.checked_add_signed(d));
        }
        decode_claims(&self.access_token)
            .ok()
            .and_then(|claims| claims.exp)
            .and_then(|exp| DateTime::from_timestamp(exp as i64, 0))
    }
}

/// The subset of JWT claims this client looks at
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub exp: Option<f64>,
    #[serde(default)]
    pub iat: Option<f64>,
    #[serde(default)]
    pub sub: Option<String>,
}

/// Decode the claim segment of a JWT without verifying its signature
pub fn decode_claims(token: &str) -> Result<TokenClaims> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(header), Some(payload)) if !header.is_empty() && !payload.is_empty() => payload,
        _ => return Err(RemehaError::decode("token is not a JWT")),
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| RemehaError::decode(format!("token payload is not base64url: {}", e)))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Whether a JWT access token is still usable at `now`.
///
/// Fails closed: any decode error or a missing `exp` claim means invalid.
pub fn is_token_valid(token: &str, now: DateTime<Utc>) -> bool {
    match decode_claims(token) {
        Ok(TokenClaims { exp: Some(exp), .. }) if exp.is_finite() => {
            exp > (now.timestamp() + EXPIRY_MARGIN_SECS) as f64
        }
        _ => false,
    }
}

/// Whether an absolute expiry leaves more than the safety margin at `now`
pub fn expiry_is_valid(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at > now + Duration::seconds(EXPIRY_MARGIN_SECS)
}

fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}
