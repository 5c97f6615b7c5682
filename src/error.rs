//! Error types and handling for the Remeha Home integration
//!
//! Every failure of a poll cycle or command maps onto one of these variants.
//! None of them is fatal to the process: the plugin catches them at the cycle
//! boundary, logs them and reports them to the host.

use thiserror::Error;

/// Result type alias for Remeha operations
pub type Result<T> = std::result::Result<T, RemehaError>;

/// Main error type for the integration
#[derive(Debug, Error)]
pub enum RemehaError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Login failed: non-2xx or malformed response, or rejected credentials
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Token endpoint answered 400 with an error description; retry next cycle
    #[error("Token exchange error: {message}")]
    TokenExchange { message: String },

    /// Dashboard or energy read failed
    #[error("Fetch error: {message}")]
    Fetch {
        message: String,
        /// HTTP status when the API answered
        status: Option<u16>,
    },

    /// Control write failed
    #[error("Write error: {message}")]
    Write { message: String },

    /// Malformed JSON, missing keys or unparseable token claims
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Transport-level failures (DNS, TLS, timeouts)
    #[error("Network error: {message}")]
    Network { message: String },

    /// Serialization errors (config files)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },
}

impl RemehaError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        RemehaError::Config {
            message: message.into(),
        }
    }

    /// Create a new authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        RemehaError::Auth {
            message: message.into(),
        }
    }

    /// Create a new transient token exchange error
    pub fn token_exchange<S: Into<String>>(message: S) -> Self {
        RemehaError::TokenExchange {
            message: message.into(),
        }
    }

    /// Create a new fetch error
    pub fn fetch<S: Into<String>>(message: S) -> Self {
        RemehaError::Fetch {
            message: message.into(),
            status: None,
        }
    }

    /// Create a fetch error for a non-success HTTP answer
    pub fn fetch_status<S: Into<String>>(status: u16, message: S) -> Self {
        RemehaError::Fetch {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Create a new write error
    pub fn write<S: Into<String>>(message: S) -> Self {
        RemehaError::Write {
            message: message.into(),
        }
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(message: S) -> Self {
        RemehaError::Decode {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        RemehaError::Network {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        RemehaError::Io {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        RemehaError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the failure is expected to heal on the next poll cycle
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemehaError::TokenExchange { .. } | RemehaError::Network { .. }
        )
    }

    /// Whether the API refused the access token
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RemehaError::Fetch { status: Some(401), .. })
    }

    /// Whether the failure happened while logging in
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            RemehaError::Auth { .. } | RemehaError::TokenExchange { .. }
        )
    }
}

impl From<std::io::Error> for RemehaError {
    fn from(err: std::io::Error) -> Self {
        RemehaError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for RemehaError {
    fn from(err: serde_yaml::Error) -> Self {
        RemehaError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RemehaError {
    fn from(err: serde_json::Error) -> Self {
        RemehaError::decode(err.to_string())
    }
}

impl From<reqwest::Error> for RemehaError {
    fn from(err: reqwest::Error) -> Self {
        RemehaError::network(err.to_string())
    }
}

impl From<url::ParseError> for RemehaError {
    fn from(err: url::ParseError) -> Self {
        RemehaError::decode(format!("invalid URL: {}", err))
    }
}
