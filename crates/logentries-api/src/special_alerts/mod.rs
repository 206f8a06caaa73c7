// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Inactivity and Anomaly alerts.
//!
//! Neither has a REST representation. Each one is assembled from:
//!
//! - a REST label and tag (`tag_label`), shared between alerts using the same label
//! - a REST hook binding that tag to the watched logs
//! - a website scheduled query evaluated periodically
//! - a website alert tag (`type = "AlertNotify"`) holding the report targets
//!
//! The website alert tag id identifies the alert. Everything else is found
//! again from it by listing and matching ids.
//!
//! ```no_run
//! # fn main() -> Result<(), logentries_api::ApiError> {
//! use logentries_api::special_alerts::{
//!     AlertReportConfig, AlertTriggerConfig, InactivityCondition, ReportPeriod, TimeframePeriod,
//! };
//! use logentries_api::{AlertConfig, ClientConfig, LogentriesClient};
//!
//! let mut client = LogentriesClient::new(ClientConfig::from_env()?)?;
//! let log = client.log_sets().get("App1/nginx")?;
//! let log_key = log["key"].as_str().unwrap_or_default().to_string();
//!
//! let alert = client.inactivity_alerts().create(
//!     "No web activity",
//!     InactivityCondition::new(["status=200"]),
//!     AlertTriggerConfig::new(1, TimeframePeriod::Hour)?,
//!     vec![AlertReportConfig::new(
//!         1,
//!         ReportPeriod::Hour,
//!         AlertConfig::slack("https://hooks.slack.com/services/..."),
//!     )?],
//!     "inactivity",
//!     &[log_key],
//! )?;
//! client.inactivity_alerts().delete(&alert.tag_id)?;
//! # Ok(())
//! # }
//! ```

mod anomaly;
mod config;
mod engine;
mod inactivity;

pub use anomaly::{Anomaly, AnomalyCondition, ScopeUnit};
pub use config::{AlertReportConfig, AlertTriggerConfig, ReportPeriod, TimeframePeriod};
pub use engine::{AnomalyAlerts, InactivityAlerts, SpecialAlert, SpecialAlerts};
pub use inactivity::{Inactivity, InactivityCondition};

use crate::error::ApiError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Debug;

/// One flavour of special alert.
///
/// A kind decides what its hook triggers on, how its scheduled query looks
/// and how its condition is read back from the website.
pub trait AlertKind {
    /// Used in errors and logs.
    const NAME: &'static str;
    /// `sub_type` of the website alert tag.
    const SUB_TYPE: &'static str;
    /// `name` of the backing scheduled query.
    const QUERY_NAME: &'static str;

    type Condition: Clone + Debug + PartialEq + Serialize;

    fn validate(condition: &Self::Condition) -> Result<(), ApiError>;

    /// Regexes of the backing hook.
    fn hook_triggers(condition: &Self::Condition) -> Vec<String>;

    /// Body of the `scheduled_query` form.
    fn scheduled_query(condition: &Self::Condition, trigger: &AlertTriggerConfig) -> Value;

    /// Fields added to the alert tag form.
    fn tag_fields(condition: &Self::Condition) -> Map<String, Value>;

    fn condition_from(tag: &Value, scheduled_query: &Value) -> Result<Self::Condition, ApiError>;
}
