// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Alert destinations.
//!
//! Every destination serializes to the same `{args, type}` shape consumed by
//! the REST alert actions. The website flavour used by special alerts renames
//! `args` to `params_set`, see [`AlertConfig::target`].

use crate::error::ApiError;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    PagerDuty,
    #[serde(rename = "mailto")]
    Email,
    WebHook,
    Slack,
    HipChat,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::PagerDuty => "pagerduty",
            AlertType::Email => "mailto",
            AlertType::WebHook => "webhook",
            AlertType::Slack => "slack",
            AlertType::HipChat => "hipchat",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pagerduty" => Some(AlertType::PagerDuty),
            "mailto" => Some(AlertType::Email),
            "webhook" => Some(AlertType::WebHook),
            "slack" => Some(AlertType::Slack),
            "hipchat" => Some(AlertType::HipChat),
            _ => None,
        }
    }
}

/// Where an alert is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertConfig {
    PagerDuty {
        description: String,
        service_key: String,
    },
    Email {
        address: String,
    },
    WebHook {
        url: String,
    },
    Slack {
        url: String,
    },
    HipChat {
        token: String,
        room_name: String,
    },
}

impl AlertConfig {
    pub fn pager_duty(description: impl Into<String>, service_key: impl Into<String>) -> Self {
        AlertConfig::PagerDuty {
            description: description.into(),
            service_key: service_key.into(),
        }
    }

    pub fn email(address: impl Into<String>) -> Self {
        AlertConfig::Email {
            address: address.into(),
        }
    }

    pub fn web_hook(url: impl Into<String>) -> Self {
        AlertConfig::WebHook { url: url.into() }
    }

    pub fn slack(url: impl Into<String>) -> Self {
        AlertConfig::Slack { url: url.into() }
    }

    pub fn hip_chat(token: impl Into<String>, room_name: impl Into<String>) -> Self {
        AlertConfig::HipChat {
            token: token.into(),
            room_name: room_name.into(),
        }
    }

    pub fn alert_type(&self) -> AlertType {
        match self {
            AlertConfig::PagerDuty { .. } => AlertType::PagerDuty,
            AlertConfig::Email { .. } => AlertType::Email,
            AlertConfig::WebHook { .. } => AlertType::WebHook,
            AlertConfig::Slack { .. } => AlertType::Slack,
            AlertConfig::HipChat { .. } => AlertType::HipChat,
        }
    }

    fn params(&self) -> Value {
        match self {
            AlertConfig::PagerDuty {
                description,
                service_key,
            } => json!({
                "service_key": service_key,
                "description": description,
            }),
            AlertConfig::Email { address } => json!({
                "direct": address,
                "teams": "",
                "users": "",
            }),
            AlertConfig::WebHook { url } | AlertConfig::Slack { url } => json!({ "url": url }),
            AlertConfig::HipChat { token, room_name } => json!({
                "notification_key": token,
                "room_name": room_name,
            }),
        }
    }

    /// REST payload: `{"args": {...}, "type": "..."}`.
    pub fn args(&self) -> Value {
        json!({
            "args": self.params(),
            "type": self.alert_type().as_str(),
        })
    }

    /// Website payload: `{"params_set": {...}, "type": "..."}`.
    pub fn target(&self) -> Value {
        json!({
            "params_set": self.params(),
            "type": self.alert_type().as_str(),
        })
    }

    /// Parses a website target back into a config.
    pub fn from_target(target: &Value) -> Result<Self, ApiError> {
        let kind = target
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Compatibility(format!("alert target without type: {target}")))?;
        let params = target.get("params_set").or_else(|| target.get("args"));
        let field = |name: &str| -> Result<String, ApiError> {
            params
                .and_then(|p| p.get(name))
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    ApiError::Compatibility(format!("{kind} alert target without '{name}'"))
                })
        };

        match AlertType::parse(kind) {
            Some(AlertType::PagerDuty) => Ok(AlertConfig::PagerDuty {
                description: field("description")?,
                service_key: field("service_key")?,
            }),
            Some(AlertType::Email) => Ok(AlertConfig::Email {
                address: field("direct")?,
            }),
            Some(AlertType::WebHook) => Ok(AlertConfig::WebHook { url: field("url")? }),
            Some(AlertType::Slack) => Ok(AlertConfig::Slack { url: field("url")? }),
            Some(AlertType::HipChat) => Ok(AlertConfig::HipChat {
                token: field("notification_key")?,
                room_name: field("room_name")?,
            }),
            None => Err(ApiError::Compatibility(format!(
                "unknown alert target type '{kind}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duplicate::duplicate_item;

    #[test]
    fn test_pagerduty() {
        let config = AlertConfig::pager_duty("Too many 404s", "service-key");
        assert_eq!(
            config.args(),
            json!({
                "args": {"service_key": "service-key", "description": "Too many 404s"},
                "type": "pagerduty"
            })
        );
    }

    #[test]
    fn test_email() {
        let config = AlertConfig::email("me@mydomain.com");
        assert_eq!(
            config.args(),
            json!({
                "args": {"direct": "me@mydomain.com", "teams": "", "users": ""},
                "type": "mailto"
            })
        );
    }

    #[test]
    fn test_hipchat() {
        let config = AlertConfig::hip_chat("token", "ops");
        assert_eq!(
            config.args(),
            json!({
                "args": {"notification_key": "token", "room_name": "ops"},
                "type": "hipchat"
            })
        );
    }

    #[duplicate_item(
        test_name           constructor                 expected_type;
        [test_webhook_url]  [AlertConfig::web_hook]     ["webhook"];
        [test_slack_url]    [AlertConfig::slack]        ["slack"];
    )]
    #[test]
    fn test_name() {
        let config = constructor("https://hooks.slack.com/services");
        assert_eq!(
            config.args(),
            json!({"args": {"url": "https://hooks.slack.com/services"}, "type": expected_type})
        );
        assert_eq!(
            config.target(),
            json!({"params_set": {"url": "https://hooks.slack.com/services"}, "type": expected_type})
        );
    }

    #[test]
    fn test_target_parses_back() {
        for config in [
            AlertConfig::pager_duty("d", "k"),
            AlertConfig::email("me@mydomain.com"),
            AlertConfig::web_hook("https://example.com/hook"),
            AlertConfig::slack("https://hooks.slack.com/services"),
            AlertConfig::hip_chat("token", "ops"),
        ] {
            assert_eq!(AlertConfig::from_target(&config.target()).unwrap(), config);
        }
    }

    #[test]
    fn test_unknown_target_is_compatibility_error() {
        let err = AlertConfig::from_target(&json!({"type": "carrier-pigeon", "params_set": {}}))
            .unwrap_err();
        assert!(matches!(err, ApiError::Compatibility(_)));

        let err = AlertConfig::from_target(&json!({"type": "slack", "params_set": {}})).unwrap_err();
        assert!(err.to_string().contains("'url'"));
    }
}
