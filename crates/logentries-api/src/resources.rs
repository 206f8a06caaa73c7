// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! REST resources: labels, tags, hooks and alerts.
//!
//! Creating a tag that marks every curl request on `someset/somelog`:
//!
//! ```no_run
//! # fn main() -> Result<(), logentries_api::ApiError> {
//! use logentries_api::{ClientConfig, LogentriesClient};
//!
//! let client = LogentriesClient::new(ClientConfig::from_env()?)?;
//! let label = client.labels().create("user_agent = curl", None, None)?;
//! let log = client.log_sets().get("someset/somelog")?;
//! let label_sn = label["sn"].as_str().unwrap_or_default();
//! let tag = client.tags().create(label_sn)?;
//! client.hooks().create(
//!     "user_agent = curl",
//!     &[r"user_agent = /curl\/[\d.]*/".to_string()],
//!     tag["id"].as_str().unwrap_or_default(),
//!     &[log["key"].as_str().unwrap_or_default().to_string()],
//! )?;
//! # Ok(())
//! # }
//! ```

use crate::alerts::AlertConfig;
use crate::error::ApiError;
use crate::http::{ApiAction, ApiUri, RestClient};
use serde_json::{json, Value};
use tracing::debug;

pub(crate) const TAG_ACTION_TYPE: &str = "tagit";

/// A few preselected hex colors for labels.
pub struct Colors;

impl Colors {
    pub const GREEN: &'static str = "18ab7e";
    pub const DARK_PURPLE: &'static str = "374259";
    pub const PURPLE: &'static str = "554973";
    pub const GRAY: &'static str = "b5bdc4";
    pub const BLUE: &'static str = "278abe";
    pub const YELLOW: &'static str = "f9d94f";
    pub const ORANGE: &'static str = "f26c36";
    pub const RED: &'static str = "e61e56";
}

/// A random hex color such as `1A2B3C`.
pub fn random_color() -> String {
    format!(
        "{:02X}{:02X}{:02X}",
        fastrand::u8(..),
        fastrand::u8(..),
        fastrand::u8(..)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Range {
    Hour,
    Day,
}

impl Range {
    pub fn as_str(&self) -> &'static str {
        match self {
            Range::Hour => "hour",
            Range::Day => "day",
        }
    }
}

/// Rate and limit settings shared by every action record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertLimits {
    pub rate_count: u32,
    pub rate_range: Range,
    pub limit_count: u32,
    pub limit_range: Range,
}

impl Default for AlertLimits {
    fn default() -> Self {
        Self {
            rate_count: 0,
            rate_range: Range::Day,
            limit_count: 0,
            limit_range: Range::Day,
        }
    }
}

fn list_field(mut response: Value, field: &str) -> Result<Vec<Value>, ApiError> {
    match response.get_mut(field).map(Value::take) {
        Some(Value::Array(items)) => Ok(items),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Err(ApiError::Compatibility(format!(
            "expected '{field}' to be a list, got {other}"
        ))),
    }
}

fn action_type(action: &Value) -> Option<&str> {
    action.get("type").and_then(Value::as_str)
}

/// Labels are text and a color; tags associate with them later.
#[derive(Debug, Clone, Copy)]
pub struct Labels<'a> {
    rest: &'a RestClient,
}

impl<'a> Labels<'a> {
    pub fn new(rest: &'a RestClient) -> Self {
        Self { rest }
    }

    /// Creates a label. `description` defaults to the name and `color` to a
    /// random one.
    pub fn create(
        &self,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
    ) -> Result<Value, ApiError> {
        let color = color.map(str::to_string).unwrap_or_else(random_color);
        let data = json!({
            "name": name,
            "title": name,
            "description": description.unwrap_or(name),
            "appearance": {
                "color": color,
            },
        });
        self.rest.post(ApiAction::Create, ApiUri::Tags, data)
    }

    pub fn list(&self) -> Result<Vec<Value>, ApiError> {
        let response = self.rest.post(ApiAction::List, ApiUri::Tags, Value::Null)?;
        list_field(response, "tags")
    }

    pub fn delete(&self, sn: &str) -> Result<Value, ApiError> {
        self.rest
            .post(ApiAction::Delete, ApiUri::Tags, json!({ "sn": sn }))
    }
}

/// Tags bind a label to matching log lines. They live in the `actions`
/// collection with type `tagit`.
#[derive(Debug, Clone, Copy)]
pub struct Tags<'a> {
    rest: &'a RestClient,
}

impl<'a> Tags<'a> {
    pub fn new(rest: &'a RestClient) -> Self {
        Self { rest }
    }

    /// Creates a tag for the label `sn` returned by [`Labels::create`].
    pub fn create(&self, label_sn: &str) -> Result<Value, ApiError> {
        let limits = AlertLimits::default();
        let data = json!({
            "type": TAG_ACTION_TYPE,
            "rate_count": limits.rate_count,
            "rate_range": limits.rate_range.as_str(),
            "limit_count": limits.limit_count,
            "limit_range": limits.limit_range.as_str(),
            "schedule": [],
            "enabled": true,
            "args": {
                "sn": label_sn,
                "tag_sn": label_sn,
            },
        });
        self.rest.post(ApiAction::Create, ApiUri::Actions, data)
    }

    pub fn list(&self) -> Result<Vec<Value>, ApiError> {
        let response = self
            .rest
            .post(ApiAction::List, ApiUri::Actions, Value::Null)?;
        Ok(list_field(response, "actions")?
            .into_iter()
            .filter(|action| action_type(action) == Some(TAG_ACTION_TYPE))
            .collect())
    }

    pub fn delete(&self, id: &str) -> Result<Value, ApiError> {
        self.rest
            .post(ApiAction::Delete, ApiUri::Actions, json!({ "id": id }))
    }
}

/// Hooks assign tags to the logs whose lines match their regexes.
#[derive(Debug, Clone, Copy)]
pub struct Hooks<'a> {
    rest: &'a RestClient,
}

impl<'a> Hooks<'a> {
    pub fn new(rest: &'a RestClient) -> Self {
        Self { rest }
    }

    /// Creates a hook.
    ///
    /// `regexes` use the backend syntax, e.g. `user_agent = /curl\/[\d.]*/`.
    /// `logs` are log keys.
    pub fn create(
        &self,
        name: &str,
        regexes: &[String],
        tag_id: &str,
        logs: &[String],
    ) -> Result<Value, ApiError> {
        let data = json!({
            "name": name,
            "triggers": regexes,
            "sources": logs,
            "groups": [],
            "actions": [tag_id],
        });
        self.rest.post(ApiAction::Create, ApiUri::Hooks, data)
    }

    pub fn list(&self) -> Result<Vec<Value>, ApiError> {
        let response = self.rest.post(ApiAction::List, ApiUri::Hooks, Value::Null)?;
        list_field(response, "hooks")
    }

    /// Adds `log_key` to an existing hook. Returns `None` without a request
    /// when the hook already covers the log.
    pub fn add_hook_to_log(&self, hook: &Value, log_key: &str) -> Result<Option<Value>, ApiError> {
        let mut sources = hook
            .get("sources")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if sources.iter().any(|source| source.as_str() == Some(log_key)) {
            debug!(log_key, "hook already bound to log");
            return Ok(None);
        }
        sources.push(Value::String(log_key.to_string()));

        let field = |name: &str| hook.get(name).cloned().unwrap_or(Value::Null);
        let data = json!({
            "id": field("id"),
            "name": field("name"),
            "triggers": field("triggers"),
            "sources": sources,
            "groups": field("groups"),
            "actions": field("actions"),
        });
        self.rest
            .post(ApiAction::Update, ApiUri::Hooks, data)
            .map(Some)
    }

    pub fn delete(&self, id: &str) -> Result<Value, ApiError> {
        self.rest
            .post(ApiAction::Delete, ApiUri::Hooks, json!({ "id": id }))
    }
}

/// Alerts are every action that is not a tag.
#[derive(Debug, Clone, Copy)]
pub struct Alerts<'a> {
    rest: &'a RestClient,
}

impl<'a> Alerts<'a> {
    pub fn new(rest: &'a RestClient) -> Self {
        Self { rest }
    }

    /// Creates an alert firing `alert_config` whenever the label `label_sn`
    /// is applied.
    pub fn create(
        &self,
        alert_config: &AlertConfig,
        label_sn: &str,
        limits: AlertLimits,
    ) -> Result<Value, ApiError> {
        let mut args = alert_config.args();
        let alert_type = args["type"].take();
        let mut params = args["args"].take();
        if let Value::Object(params) = &mut params {
            params.insert("tag_sn".into(), Value::String(label_sn.to_string()));
        }
        let data = json!({
            "type": alert_type,
            "rate_count": limits.rate_count,
            "rate_range": limits.rate_range.as_str(),
            "limit_count": limits.limit_count,
            "limit_range": limits.limit_range.as_str(),
            "schedule": [],
            "enabled": true,
            "args": params,
        });
        self.rest.post(ApiAction::Create, ApiUri::Actions, data)
    }

    pub fn list(&self) -> Result<Vec<Value>, ApiError> {
        let response = self
            .rest
            .post(ApiAction::List, ApiUri::Actions, Value::Null)?;
        Ok(list_field(response, "actions")?
            .into_iter()
            .filter(|action| action_type(action) != Some(TAG_ACTION_TYPE))
            .collect())
    }

    pub fn delete(&self, id: &str) -> Result<Value, ApiError> {
        self.rest
            .post(ApiAction::Delete, ApiUri::Actions, json!({ "id": id }))
    }
}
