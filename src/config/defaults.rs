use super::*;

/// Production B2C tenant of the vendor identity provider
pub const DEFAULT_IDENTITY_BASE_URL: &str =
    "https://remehalogin.bdrthermea.net/bdrb2cprod.onmicrosoft.com";

/// Production vendor API
pub const DEFAULT_API_BASE_URL: &str = "https://api.bdrthermea.net/Mobile/api";

pub const MIN_POLL_INTERVAL_SECS: u64 = 30;
pub const MAX_POLL_INTERVAL_SECS: u64 = 300;

impl Default for EnergyConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            use_refresh_token: true,
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            identity_base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_timeout_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/remeha.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: CredentialsConfig::default(),
            poll_interval_secs: 60,
            timezone: "Europe/Amsterdam".to_string(),
            energy: EnergyConfig::default(),
            auth: AuthConfig::default(),
            endpoints: EndpointsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
