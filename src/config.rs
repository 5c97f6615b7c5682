//! Configuration management for the Remeha Home integration
//!
//! This module handles loading, validation, and management of the plugin
//! configuration from YAML files with support for environment variable
//! overrides of the account credentials.

use crate::error::{RemehaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod defaults;

pub use defaults::{
    DEFAULT_API_BASE_URL, DEFAULT_IDENTITY_BASE_URL, MAX_POLL_INTERVAL_SECS,
    MIN_POLL_INTERVAL_SECS,
};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Vendor account used for the B2C login
    pub credentials: CredentialsConfig,

    /// Heartbeat interval requested from the host, clamped to [30, 300]
    pub poll_interval_secs: u64,

    /// Timezone used for the energy quiet hours and the energy date windows
    pub timezone: String,

    /// Energy consumption polling
    pub energy: EnergyConfig,

    /// Token lifecycle options
    pub auth: AuthConfig,

    /// Identity provider and vendor API locations
    pub endpoints: EndpointsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Account credentials. The password is never written back to disk.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Login e-mail address
    pub email: String,

    /// Login password
    #[serde(skip_serializing)]
    pub password: String,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Energy consumption polling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Fetch yearly/monthly/daily series and push the meter slots
    pub enabled: bool,
}

/// Token lifecycle options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Try the refresh-token grant before falling back to a full login
    pub use_refresh_token: bool,
}

/// Endpoint locations, overridable to point the client at a test server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// B2C tenant base, e.g. `https://<idp-host>/<tenant>`
    pub identity_base_url: String,

    /// Vendor API base, e.g. `https://<api-host>/Mobile/api`
    pub api_base_url: String,

    /// Per-request timeout in seconds
    pub http_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console level override
    pub console_level: Option<String>,

    /// Optional file level override
    pub file_level: Option<String>,

    /// Path to log file (or directory)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default locations, then apply env overrides
    pub fn load() -> Result<Self> {
        let default_paths = [
            "remeha_config.yaml",
            "/data/remeha_config.yaml",
            "/etc/remeha/config.yaml",
        ];

        let mut config = Config::default();
        for path in &default_paths {
            if Path::new(path).exists() {
                config = Self::from_file(path)?;
                break;
            }
        }
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override credentials from `REMEHA_EMAIL` / `REMEHA_PASSWORD`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(email) = std::env::var("REMEHA_EMAIL")
            && !email.trim().is_empty()
        {
            self.credentials.email = email.trim().to_string();
        }
        if let Ok(password) = std::env::var("REMEHA_PASSWORD")
            && !password.is_empty()
        {
            self.credentials.password = password;
        }
    }

    /// Save configuration to a YAML file (password excluded)
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Poll interval clamped to the range the host accepts
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.poll_interval_secs
                .clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS),
        )
    }

    /// Parsed timezone, UTC when the configured name is unknown
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }

    /// HTTP request timeout
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.endpoints.http_timeout_secs.max(1))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(RemehaError::validation(
                "timezone",
                format!("Unknown timezone '{}'", self.timezone),
            ));
        }

        if self.endpoints.http_timeout_secs == 0 {
            return Err(RemehaError::validation(
                "endpoints.http_timeout_secs",
                "Must be greater than 0",
            ));
        }

        for (field, value) in [
            (
                "endpoints.identity_base_url",
                &self.endpoints.identity_base_url,
            ),
            ("endpoints.api_base_url", &self.endpoints.api_base_url),
        ] {
            if url::Url::parse(value).is_err() {
                return Err(RemehaError::validation(field, "Must be an absolute URL"));
            }
        }

        Ok(())
    }

    /// Validate that the credentials needed for a login are present
    pub fn validate_credentials(&self) -> Result<()> {
        if self.credentials.email.trim().is_empty() {
            return Err(RemehaError::validation(
                "credentials.email",
                "E-mail not configured",
            ));
        }
        if self.credentials.password.is_empty() {
            return Err(RemehaError::validation(
                "credentials.password",
                "Password not configured",
            ));
        }
        Ok(())
    }
}
