// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::alerts::AlertConfig;
use crate::error::ApiError;
use serde::Serialize;
use serde_json::{json, Value};
use std::str::FromStr;

const MIN_COUNT: u32 = 1;
const MAX_COUNT: u32 = 100;

/// Reads a number the website may send either as `5` or `"5"`.
pub(crate) fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Unit of the window a special alert inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeframePeriod {
    Minute,
    Hour,
    Day,
    Week,
}

impl TimeframePeriod {
    /// Website spelling, e.g. `Day`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeframePeriod::Minute => "Minute",
            TimeframePeriod::Hour => "Hour",
            TimeframePeriod::Day => "Day",
            TimeframePeriod::Week => "Week",
        }
    }
}

impl FromStr for TimeframePeriod {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "minute" => Ok(TimeframePeriod::Minute),
            "hour" => Ok(TimeframePeriod::Hour),
            "day" => Ok(TimeframePeriod::Day),
            "week" => Ok(TimeframePeriod::Week),
            _ => Err(ApiError::Configuration(format!(
                "timeframe_period must be 'minute', 'hour', 'day', or 'week', got '{value}'"
            ))),
        }
    }
}

/// How often reports are rate limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Hour,
    Day,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Hour => "Hour",
            ReportPeriod::Day => "Day",
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "hour" => Ok(ReportPeriod::Hour),
            "day" => Ok(ReportPeriod::Day),
            _ => Err(ApiError::Configuration(format!(
                "report period must be 'hour' or 'day', got '{value}'"
            ))),
        }
    }
}

/// How far back a special alert looks: inactivity is checked over this
/// window, anomalies are compared against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertTriggerConfig {
    timeframe_value: u32,
    timeframe_period: TimeframePeriod,
}

impl AlertTriggerConfig {
    /// `timeframe_value` must be between 1 and 100.
    pub fn new(timeframe_value: u32, timeframe_period: TimeframePeriod) -> Result<Self, ApiError> {
        if !(MIN_COUNT..=MAX_COUNT).contains(&timeframe_value) {
            return Err(ApiError::Configuration(format!(
                "timeframe_value must be between {MIN_COUNT} and {MAX_COUNT}, got {timeframe_value}"
            )));
        }
        Ok(Self {
            timeframe_value,
            timeframe_period,
        })
    }

    pub fn timeframe_value(&self) -> u32 {
        self.timeframe_value
    }

    pub fn timeframe_period(&self) -> TimeframePeriod {
        self.timeframe_period
    }

    pub(crate) fn to_value(&self) -> Value {
        json!({
            "timeframe_period": self.timeframe_period.as_str(),
            "timeframe_value": self.timeframe_value,
        })
    }

    /// Reads the trigger fields of a website alert tag.
    pub(crate) fn from_value(tag: &Value) -> Result<Self, ApiError> {
        let value = tag.get("timeframe_value").and_then(as_u32);
        let period = tag.get("timeframe_period").and_then(Value::as_str);
        let trigger = match (value, period) {
            (Some(value), Some(period)) => period.parse().and_then(|period| Self::new(value, period)),
            _ => Err(ApiError::Compatibility(format!(
                "alert tag without a usable timeframe: {tag}"
            ))),
        };
        trigger.map_err(into_compatibility)
    }
}

/// How often, and where, a special alert reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertReportConfig {
    report_count: u32,
    report_period: ReportPeriod,
    alert_config: AlertConfig,
}

impl AlertReportConfig {
    /// Sends at most `report_count` (1 to 100) alerts per `report_period`.
    pub fn new(
        report_count: u32,
        report_period: ReportPeriod,
        alert_config: AlertConfig,
    ) -> Result<Self, ApiError> {
        if !(MIN_COUNT..=MAX_COUNT).contains(&report_count) {
            return Err(ApiError::Configuration(format!(
                "report count must be between {MIN_COUNT} and {MAX_COUNT}, got {report_count}"
            )));
        }
        Ok(Self {
            report_count,
            report_period,
            alert_config,
        })
    }

    pub fn report_count(&self) -> u32 {
        self.report_count
    }

    pub fn report_period(&self) -> ReportPeriod {
        self.report_period
    }

    pub fn alert_config(&self) -> &AlertConfig {
        &self.alert_config
    }

    pub(crate) fn to_value(&self) -> Value {
        json!({
            "min_report_count": self.report_count,
            "min_report_period": self.report_period.as_str(),
            "type": "Alert",
            "enabled": true,
            "targets": [self.alert_config.target()],
        })
    }

    /// Reads one entry of a website alert tag's `actions`.
    pub(crate) fn from_value(action: &Value) -> Result<Self, ApiError> {
        let count = action.get("min_report_count").and_then(as_u32);
        let period = action.get("min_report_period").and_then(Value::as_str);
        let target = action
            .get("targets")
            .and_then(Value::as_array)
            .and_then(|targets| targets.first());
        let report = match (count, period, target) {
            (Some(count), Some(period), Some(target)) => period
                .parse()
                .and_then(|period| Self::new(count, period, AlertConfig::from_target(target)?)),
            _ => Err(ApiError::Compatibility(format!(
                "alert report without count, period or target: {action}"
            ))),
        };
        report.map_err(into_compatibility)
    }
}

/// Values read back from the website that fail validation mean the website
/// changed, not that the caller misconfigured anything.
fn into_compatibility(error: ApiError) -> ApiError {
    match error {
        ApiError::Configuration(message) => ApiError::Compatibility(message),
        other => other,
    }
}
