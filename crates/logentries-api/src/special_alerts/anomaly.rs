// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::config::{as_u32, AlertTriggerConfig};
use super::AlertKind;
use crate::error::ApiError;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::str::FromStr;

/// Window the anomaly query is evaluated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeUnit {
    Hour,
    Day,
    Week,
}

impl ScopeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeUnit::Hour => "Hour",
            ScopeUnit::Day => "Day",
            ScopeUnit::Week => "Week",
        }
    }
}

impl FromStr for ScopeUnit {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "hour" => Ok(ScopeUnit::Hour),
            "day" => Ok(ScopeUnit::Day),
            "week" => Ok(ScopeUnit::Week),
            _ => Err(ApiError::Configuration(format!(
                "scope unit must be 'hour', 'day', or 'week', got '{value}'"
            ))),
        }
    }
}

/// Fires when `query` over the last `scope_count` `scope_unit`s moves by
/// `percentage_change` percent against the trigger window.
///
/// `query` must produce a number, e.g. `where(status=404) calculate(COUNT)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnomalyCondition {
    pub query: String,
    pub scope_count: u32,
    pub scope_unit: ScopeUnit,
    /// Detects increases when true, decreases otherwise.
    pub increase_positive: bool,
    pub percentage_change: u8,
}

impl AnomalyCondition {
    /// `"+25"` for a 25% increase, `"-25"` for a decrease.
    fn threshold_value(&self) -> String {
        let sign = if self.increase_positive { '+' } else { '-' };
        format!("{sign}{}", self.percentage_change)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anomaly;

impl AlertKind for Anomaly {
    const NAME: &'static str = "anomaly alert";
    const SUB_TYPE: &'static str = "AnomalyAlert";
    const QUERY_NAME: &'static str = "ForAnomalyReport";

    type Condition = AnomalyCondition;

    fn validate(condition: &AnomalyCondition) -> Result<(), ApiError> {
        if condition.query.trim().is_empty() {
            return Err(ApiError::Configuration(
                "anomaly query cannot be empty".to_string(),
            ));
        }
        if condition.scope_count == 0 {
            return Err(ApiError::Configuration(
                "scope count must be greater than 0".to_string(),
            ));
        }
        if condition.percentage_change > 100 {
            return Err(ApiError::Configuration(format!(
                "percentage change must be between 0 and 100, got {}",
                condition.percentage_change
            )));
        }
        Ok(())
    }

    fn hook_triggers(_condition: &AnomalyCondition) -> Vec<String> {
        Vec::new()
    }

    fn scheduled_query(condition: &AnomalyCondition, _trigger: &AlertTriggerConfig) -> Value {
        json!({
            "name": Self::QUERY_NAME,
            "query": condition.query,
            "threshold_type": "%",
            "threshold_value": condition.threshold_value(),
            "time_period": condition.scope_unit.as_str(),
            "time_value": condition.scope_count,
        })
    }

    fn tag_fields(_condition: &AnomalyCondition) -> Map<String, Value> {
        Map::new()
    }

    fn condition_from(_tag: &Value, scheduled_query: &Value) -> Result<AnomalyCondition, ApiError> {
        let incompatible = || {
            ApiError::Compatibility(format!(
                "anomaly scheduled query has an unexpected shape: {scheduled_query}"
            ))
        };
        let query = scheduled_query
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(incompatible)?;
        let scope_count = scheduled_query
            .get("time_value")
            .and_then(as_u32)
            .ok_or_else(incompatible)?;
        let scope_unit = scheduled_query
            .get("time_period")
            .and_then(Value::as_str)
            .and_then(|unit| unit.parse::<ScopeUnit>().ok())
            .ok_or_else(incompatible)?;
        let threshold = scheduled_query
            .get("threshold_value")
            .and_then(Value::as_str)
            .ok_or_else(incompatible)?;
        let (increase_positive, change) = match threshold.strip_prefix('-') {
            Some(change) => (false, change),
            None => (true, threshold.strip_prefix('+').unwrap_or(threshold)),
        };
        let percentage_change = change.trim().parse::<u8>().map_err(|_| incompatible())?;

        Ok(AnomalyCondition {
            query: query.to_string(),
            scope_count,
            scope_unit,
            increase_positive,
            percentage_change,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::special_alerts::TimeframePeriod;

    fn condition(increase_positive: bool) -> AnomalyCondition {
        AnomalyCondition {
            query: "where(status=404) calculate(COUNT)".to_string(),
            scope_count: 1,
            scope_unit: ScopeUnit::Day,
            increase_positive,
            percentage_change: 25,
        }
    }

    #[test]
    fn test_scheduled_query_payload() {
        let trigger = AlertTriggerConfig::new(14, TimeframePeriod::Day).unwrap();
        assert_eq!(
            Anomaly::scheduled_query(&condition(true), &trigger),
            json!({
                "name": "ForAnomalyReport",
                "query": "where(status=404) calculate(COUNT)",
                "threshold_type": "%",
                "threshold_value": "+25",
                "time_period": "Day",
                "time_value": 1,
            })
        );
        assert_eq!(
            Anomaly::scheduled_query(&condition(false), &trigger)["threshold_value"],
            "-25"
        );
    }

    #[test]
    fn test_condition_read_back_from_scheduled_query() {
        let trigger = AlertTriggerConfig::new(14, TimeframePeriod::Day).unwrap();
        for increase_positive in [true, false] {
            let expected = condition(increase_positive);
            let scheduled_query = Anomaly::scheduled_query(&expected, &trigger);
            assert_eq!(
                Anomaly::condition_from(&Value::Null, &scheduled_query).unwrap(),
                expected
            );
        }
    }

    #[test]
    fn test_unexpected_scheduled_query_is_compatibility_error() {
        let scheduled_query = json!({"query": "q", "time_value": 1, "time_period": "Day"});
        assert!(matches!(
            Anomaly::condition_from(&Value::Null, &scheduled_query),
            Err(ApiError::Compatibility(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert!(Anomaly::validate(&condition(true)).is_ok());

        let mut too_much = condition(true);
        too_much.percentage_change = 101;
        assert!(matches!(
            Anomaly::validate(&too_much),
            Err(ApiError::Configuration(_))
        ));

        let mut no_scope = condition(true);
        no_scope.scope_count = 0;
        assert!(Anomaly::validate(&no_scope).is_err());

        assert!(matches!(
            "minute".parse::<ScopeUnit>(),
            Err(ApiError::Configuration(_))
        ));
    }
}
