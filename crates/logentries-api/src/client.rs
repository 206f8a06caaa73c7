// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::RestClient;
use crate::logs::LogSets;
use crate::resources::{Alerts, Hooks, Labels, Tags};
use crate::session::SessionManager;
use crate::special_alerts::{AnomalyAlerts, InactivityAlerts};
use tracing::debug;

/// Entry point: one REST transport and one website session per account.
///
/// Resource handles borrow the client. Special alert handles borrow it
/// mutably because they share the website session.
#[derive(Debug)]
pub struct LogentriesClient {
    rest: RestClient,
    sessions: SessionManager,
}

impl LogentriesClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let rest = RestClient::new(&config)?;
        let sessions = SessionManager::new(&config)?;
        debug!(
            api_url = %config.api_url,
            web_url = %config.web_url,
            special_alerts = config.credentials.is_some(),
            "logentries client created"
        );
        Ok(Self { rest, sessions })
    }

    /// Builds a client from `LOGENTRIES_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn labels(&self) -> Labels<'_> {
        Labels::new(&self.rest)
    }

    pub fn tags(&self) -> Tags<'_> {
        Tags::new(&self.rest)
    }

    pub fn hooks(&self) -> Hooks<'_> {
        Hooks::new(&self.rest)
    }

    pub fn alerts(&self) -> Alerts<'_> {
        Alerts::new(&self.rest)
    }

    pub fn log_sets(&self) -> LogSets<'_> {
        LogSets::new(&self.rest)
    }

    pub fn inactivity_alerts(&mut self) -> InactivityAlerts<'_> {
        InactivityAlerts::new(&self.rest, &mut self.sessions)
    }

    pub fn anomaly_alerts(&mut self) -> AnomalyAlerts<'_> {
        AnomalyAlerts::new(&self.rest, &mut self.sessions)
    }

    /// The website session, e.g. to log in eagerly or inspect the login count.
    pub fn sessions(&mut self) -> &mut SessionManager {
        &mut self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_config() {
        let err = LogentriesClient::new(ClientConfig::default()).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));

        assert!(LogentriesClient::new(ClientConfig::new("a-key")).is_ok());
    }

    #[test]
    fn test_special_alerts_without_credentials() {
        let mut client = LogentriesClient::new(ClientConfig::new("a-key")).unwrap();
        let err = client.inactivity_alerts().list_tags().unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
        assert_eq!(client.sessions().login_count(), 0);
    }
}
