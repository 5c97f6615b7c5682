//! Authenticated HTTP access to the vendor API

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::flow::user_agent;
use crate::error::{RemehaError, Result};

pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
/// API-management key shipped with the vendor's app
pub const SUBSCRIPTION_KEY: &str = "df605c5470d846fc91e848b1cc653ddf";

/// Token-bound client; built for one operation and then dropped
pub struct VendorClient {
    http: Client,
    base: String,
    bearer: String,
}

impl VendorClient {
    pub fn new(base: &str, access_token: &str, timeout: Duration) -> Result<Self> {
        let token = access_token.trim();
        if token.is_empty() {
            return Err(RemehaError::auth("no access token for vendor request"));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            bearer: format!("Bearer {}", token),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// GET and decode; non-2xx and transport failures are fetch errors
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let resp = self
            .http
            .get(self.url(path))
            .header(AUTHORIZATION, &self.bearer)
            .header(SUBSCRIPTION_KEY_HEADER, SUBSCRIPTION_KEY)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, user_agent())
            .query(query)
            .send()
            .await
            .map_err(|e| RemehaError::fetch(format!("GET {} failed: {}", path, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RemehaError::fetch_status(
                status.as_u16(),
                format!("GET {} returned {}", path, status),
            ));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| RemehaError::fetch(format!("GET {} body: {}", path, e)))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// POST a control write; `None` sends an empty body
    pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<()> {
        let mut req = self
            .http
            .post(self.url(path))
            .header(AUTHORIZATION, &self.bearer)
            .header(SUBSCRIPTION_KEY_HEADER, SUBSCRIPTION_KEY)
            .header(USER_AGENT, user_agent());
        if let Some(json) = body {
            req = req.json(json);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| RemehaError::write(format!("POST {} failed: {}", path, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RemehaError::write(format!(
                "POST {} returned {}",
                path, status
            )));
        }
        Ok(())
    }
}
