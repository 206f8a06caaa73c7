// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ApiError;
use reqwest::Url;
use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.logentries.com";
pub const DEFAULT_WEB_URL: &str = "https://logentries.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Website login used for Inactivity and Anomaly alerts.
///
/// Prefer a dedicated non-human account: these alerts are only reachable
/// through the interactive login flow.
#[derive(Clone, PartialEq, Eq)]
pub struct WebCredentials {
    pub username: String,
    pub password: String,
}

impl WebCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for WebCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration for [`crate::LogentriesClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Account key sent with every REST request
    pub account_key: String,
    /// Website credentials, required only for special alerts
    pub credentials: Option<WebCredentials>,
    /// REST backend base URL
    pub api_url: String,
    /// Website backend base URL
    pub web_url: String,
    /// Per-request timeout applied by the transport
    pub timeout: Duration,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            account_key: String::new(),
            credentials: None,
            api_url: DEFAULT_API_URL.to_string(),
            web_url: DEFAULT_WEB_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            https_proxy: None,
        }
    }
}

impl ClientConfig {
    pub fn new(account_key: impl Into<String>) -> Self {
        Self {
            account_key: account_key.into(),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, credentials: WebCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ApiError> {
        let account_key = env::var("LOGENTRIES_ACCOUNT_KEY").map_err(|_| {
            ApiError::Configuration("LOGENTRIES_ACCOUNT_KEY not present in environment".to_string())
        })?;
        let credentials = match (
            env::var("LOGENTRIES_USERNAME").ok(),
            env::var("LOGENTRIES_PASSWORD").ok(),
        ) {
            (Some(username), Some(password)) => Some(WebCredentials::new(username, password)),
            _ => None,
        };
        let api_url =
            env::var("LOGENTRIES_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let web_url =
            env::var("LOGENTRIES_WEB_URL").unwrap_or_else(|_| DEFAULT_WEB_URL.to_string());
        let timeout = env::var("LOGENTRIES_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let https_proxy = env::var("LOGENTRIES_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok();

        let config = Self {
            account_key,
            credentials,
            api_url,
            web_url,
            timeout,
            https_proxy,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.account_key.trim().is_empty() {
            return Err(ApiError::Configuration(
                "account key cannot be empty".to_string(),
            ));
        }

        for (name, url) in [("API", &self.api_url), ("website", &self.web_url)] {
            Url::parse(url).map_err(|e| {
                ApiError::Configuration(format!("invalid {name} URL '{url}': {e}"))
            })?;
        }

        if self.timeout.is_zero() {
            return Err(ApiError::Configuration(
                "timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(credentials) = &self.credentials {
            if credentials.username.trim().is_empty() {
                return Err(ApiError::Configuration(
                    "website username cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}
