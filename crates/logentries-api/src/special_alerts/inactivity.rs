// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::config::AlertTriggerConfig;
use super::AlertKind;
use crate::error::ApiError;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Fires when no line matching `patterns` arrives within the trigger window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InactivityCondition {
    pub patterns: Vec<String>,
}

impl InactivityCondition {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// LEQL counting the matching lines, e.g. `where(status=200) calculate(COUNT)`.
    fn query(&self) -> String {
        format!("where({}) calculate(COUNT)", self.patterns.join(" OR "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inactivity;

impl AlertKind for Inactivity {
    const NAME: &'static str = "inactivity alert";
    const SUB_TYPE: &'static str = "InactivityAlert";
    const QUERY_NAME: &'static str = "ForInactivityReport";

    type Condition = InactivityCondition;

    fn validate(condition: &InactivityCondition) -> Result<(), ApiError> {
        if condition.patterns.is_empty() {
            return Err(ApiError::Configuration(
                "inactivity alerts need at least one pattern".to_string(),
            ));
        }
        if condition.patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(ApiError::Configuration(
                "inactivity patterns cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn hook_triggers(condition: &InactivityCondition) -> Vec<String> {
        condition.patterns.clone()
    }

    fn scheduled_query(condition: &InactivityCondition, trigger: &AlertTriggerConfig) -> Value {
        json!({
            "name": Self::QUERY_NAME,
            "query": condition.query(),
            "threshold_type": "<",
            "threshold_value": "1",
            "time_period": trigger.timeframe_period().as_str(),
            "time_value": trigger.timeframe_value(),
        })
    }

    fn tag_fields(condition: &InactivityCondition) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("patterns".into(), json!(condition.patterns));
        fields
    }

    fn condition_from(tag: &Value, _scheduled_query: &Value) -> Result<InactivityCondition, ApiError> {
        tag.get("patterns")
            .and_then(Value::as_array)
            .map(|patterns| {
                InactivityCondition::new(patterns.iter().filter_map(Value::as_str))
            })
            .ok_or_else(|| {
                ApiError::Compatibility(format!("inactivity alert tag without patterns: {tag}"))
            })
    }
}
