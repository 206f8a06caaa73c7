// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::anomaly::Anomaly;
use super::config::{AlertReportConfig, AlertTriggerConfig};
use super::inactivity::Inactivity;
use super::AlertKind;
use crate::error::ApiError;
use crate::http::RestClient;
use crate::resources::{Hooks, Labels, Tags};
use crate::session::SessionManager;
use serde::Serialize;
use serde_json::{json, Value};
use std::marker::PhantomData;
use tracing::{debug, info, warn};

const TAGS_PATH: &str = "tags";
const SCHEDULED_QUERIES_PATH: &str = "scheduled_queries";
const ALERT_TAG_TYPE: &str = "AlertNotify";
const MAX_NAME_LEN: usize = 30;

const STEP_SCHEDULED_QUERY: &str = "scheduled query";
const STEP_HOOK: &str = "hook";
const STEP_TAG: &str = "tag";
const STEP_ALERT_TAG: &str = "alert tag";

/// Ids come back as strings or numbers depending on the collection.
fn id_of(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Create responses carry the new record either flat or wrapped, e.g.
/// `{"id": ..}` or `{"hook": {"id": ..}}`.
fn created_id(response: &Value, field: &str) -> Option<String> {
    id_of(response, field).or_else(|| {
        response
            .as_object()?
            .values()
            .filter(|value| value.is_object())
            .find_map(|value| id_of(value, field))
    })
}

fn website_list(mut response: Value, field: &str) -> Result<Vec<Value>, ApiError> {
    match response.get_mut(field).map(Value::take) {
        Some(Value::Array(items)) => Ok(items),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Err(ApiError::Compatibility(format!(
            "expected website '{field}' to be a list, got {other}"
        ))),
    }
}

fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_NAME_LEN).collect()
}

fn references_tag(hook: &Value, rest_tag_id: &str) -> bool {
    hook.get("actions")
        .and_then(Value::as_array)
        .is_some_and(|actions| actions.iter().any(|a| a.as_str() == Some(rest_tag_id)))
}

fn tags_label(rest_tag: &Value, label_sn: &str) -> bool {
    let args = rest_tag.get("args");
    ["tag_sn", "sn"].iter().any(|field| {
        args.and_then(|args| args.get(*field))
            .and_then(Value::as_str)
            == Some(label_sn)
    })
}

/// A special alert as read back from the website.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecialAlert<C> {
    /// Website alert tag id, the identity of the alert.
    pub tag_id: String,
    pub name: String,
    pub condition: C,
    pub trigger: AlertTriggerConfig,
    pub reports: Vec<AlertReportConfig>,
    /// Log keys.
    pub logs: Vec<String>,
}

/// Inputs of the website forms submitted by `create`.
struct NewAlert<'c, C> {
    name: &'c str,
    condition: &'c C,
    trigger: &'c AlertTriggerConfig,
    reports: &'c [AlertReportConfig],
    label_sn: &'c str,
    hook_id: &'c str,
    logs: &'c [String],
}

/// Website records submitted so far by `create`.
#[derive(Default)]
struct WebsiteParts {
    scheduled_query_id: Option<String>,
    alert_tag_id: Option<String>,
}

/// Everything backing one alert tag. Only the alert tag is guaranteed: the
/// other parts may already be gone after an interrupted delete.
struct Resolved {
    alert_tag: Value,
    scheduled_query: Option<Value>,
    rest_tag: Option<Value>,
    hook: Option<Value>,
}

/// Create, read, update and delete for one kind of special alert.
///
/// Borrows the client's REST transport and, mutably, its website session.
pub struct SpecialAlerts<'a, K: AlertKind> {
    rest: &'a RestClient,
    sessions: &'a mut SessionManager,
    kind: PhantomData<K>,
}

pub type InactivityAlerts<'a> = SpecialAlerts<'a, Inactivity>;
pub type AnomalyAlerts<'a> = SpecialAlerts<'a, Anomaly>;

impl<'a, K: AlertKind> SpecialAlerts<'a, K> {
    pub fn new(rest: &'a RestClient, sessions: &'a mut SessionManager) -> Self {
        Self {
            rest,
            sessions,
            kind: PhantomData,
        }
    }

    /// Website alert tags of this kind.
    pub fn list_tags(&mut self) -> Result<Vec<Value>, ApiError> {
        let response = self.sessions.get_json(TAGS_PATH)?;
        Ok(website_list(response, "tags")?
            .into_iter()
            .filter(|tag| {
                tag.get("type").and_then(Value::as_str) == Some(ALERT_TAG_TYPE)
                    && tag.get("sub_type").and_then(Value::as_str) == Some(K::SUB_TYPE)
            })
            .collect())
    }

    /// Website scheduled queries created for this kind.
    pub fn list_scheduled_queries(&mut self) -> Result<Vec<Value>, ApiError> {
        let response = self.sessions.get_json(SCHEDULED_QUERIES_PATH)?;
        Ok(website_list(response, "scheduled_queries")?
            .into_iter()
            .filter(|query| query.get("name").and_then(Value::as_str) == Some(K::QUERY_NAME))
            .collect())
    }

    /// Every readable alert of this kind. Alert tags whose scheduled query is
    /// gone, or whose fields this client cannot parse, are skipped.
    pub fn list(&mut self) -> Result<Vec<SpecialAlert<K::Condition>>, ApiError> {
        let tags = self.list_tags()?;
        let queries = self.list_scheduled_queries()?;
        let mut alerts = Vec::with_capacity(tags.len());
        for tag in &tags {
            let scheduled_query = id_of(tag, "scheduled_query_id").and_then(|sq_id| {
                queries
                    .iter()
                    .find(|query| id_of(query, "id").as_deref() == Some(sq_id.as_str()))
            });
            let Some(scheduled_query) = scheduled_query else {
                debug!(tag = %tag, "{} without scheduled query skipped", K::NAME);
                continue;
            };
            match Self::record(tag, scheduled_query) {
                Ok(alert) => alerts.push(alert),
                Err(ApiError::Compatibility(reason)) => {
                    warn!(tag = %tag, reason = %reason, "unreadable {} skipped", K::NAME);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(alerts)
    }

    pub fn get(&mut self, tag_id: &str) -> Result<SpecialAlert<K::Condition>, ApiError> {
        let resolved = self
            .resolve(tag_id)?
            .ok_or_else(|| ApiError::not_found(K::NAME, tag_id))?;
        let scheduled_query = resolved
            .scheduled_query
            .as_ref()
            .ok_or_else(|| ApiError::not_found(STEP_SCHEDULED_QUERY, tag_id))?;
        Self::record(&resolved.alert_tag, scheduled_query)
    }

    /// Creates the label (if needed), tag (if needed), hook, scheduled query
    /// and alert tag of a new alert.
    ///
    /// `tag_label` names the REST label the alert's tag marks lines with.
    /// `logs` are log keys.
    pub fn create(
        &mut self,
        name: &str,
        condition: K::Condition,
        trigger: AlertTriggerConfig,
        reports: Vec<AlertReportConfig>,
        tag_label: &str,
        logs: &[String],
    ) -> Result<SpecialAlert<K::Condition>, ApiError> {
        K::validate(&condition)?;
        if name.trim().is_empty() {
            return Err(ApiError::Configuration(format!(
                "{} name cannot be empty",
                K::NAME
            )));
        }
        if logs.is_empty() {
            return Err(ApiError::Configuration(format!(
                "{} needs at least one log",
                K::NAME
            )));
        }

        let label_sn = self.label_sn(tag_label)?;
        let rest_tag_id = self.rest_tag_id(&label_sn)?;
        let hook = Hooks::new(self.rest).create(
            name,
            &K::hook_triggers(&condition),
            &rest_tag_id,
            logs,
        )?;
        let hook_id = created_id(&hook, "id")
            .ok_or_else(|| ApiError::Compatibility(format!("hook created without id: {hook}")))?;

        let new_alert = NewAlert {
            name,
            condition: &condition,
            trigger: &trigger,
            reports: &reports,
            label_sn: &label_sn,
            hook_id: &hook_id,
            logs,
        };
        let mut parts = WebsiteParts::default();
        let tag_id = match self.create_website_parts(&new_alert, &mut parts) {
            Ok(tag_id) => tag_id,
            Err(err) => {
                self.roll_back_create(&hook_id, &parts);
                return Err(err);
            }
        };

        info!(tag_id = %tag_id, name, "{} created", K::NAME);
        Ok(SpecialAlert {
            tag_id,
            name: truncate_name(name),
            condition,
            trigger,
            reports,
            logs: logs.to_vec(),
        })
    }

    /// Replaces the trigger and reports of an existing alert. The hook, and so
    /// the log bindings, are left untouched.
    ///
    /// The scheduled query is updated first. If the alert tag update then
    /// fails, the previous scheduled query is submitted again before the error
    /// is returned.
    pub fn update(
        &mut self,
        tag_id: &str,
        trigger: AlertTriggerConfig,
        reports: Vec<AlertReportConfig>,
    ) -> Result<SpecialAlert<K::Condition>, ApiError> {
        let Resolved {
            mut alert_tag,
            scheduled_query,
            ..
        } = self
            .resolve(tag_id)?
            .ok_or_else(|| ApiError::not_found(K::NAME, tag_id))?;
        let scheduled_query = scheduled_query
            .ok_or_else(|| ApiError::not_found(STEP_SCHEDULED_QUERY, tag_id))?;
        let sq_id = id_of(&scheduled_query, "id")
            .ok_or_else(|| ApiError::not_found(STEP_SCHEDULED_QUERY, tag_id))?;
        let condition = K::condition_from(&alert_tag, &scheduled_query)?;

        let mut query_form = K::scheduled_query(&condition, &trigger);
        query_form["id"] = Value::String(sq_id.clone());
        self.sessions.put_json(
            &format!("{SCHEDULED_QUERIES_PATH}/{sq_id}"),
            &json!({ "scheduled_query": query_form }),
        )?;

        if let Value::Object(fields) = &mut alert_tag {
            fields.insert(
                "actions".into(),
                Value::Array(reports.iter().map(AlertReportConfig::to_value).collect()),
            );
            if let Value::Object(timeframe) = trigger.to_value() {
                fields.extend(timeframe);
            }
        }
        if let Err(err) = self.sessions.put_json(
            &format!("{TAGS_PATH}/{tag_id}"),
            &json!({ "tag": alert_tag }),
        ) {
            // Put the scheduled query back so it keeps matching the alert tag.
            if let Err(restore_err) = self.sessions.put_json(
                &format!("{SCHEDULED_QUERIES_PATH}/{sq_id}"),
                &json!({ "scheduled_query": scheduled_query }),
            ) {
                warn!(tag_id, error = %restore_err, "could not restore scheduled query of {}", K::NAME);
            }
            return Err(err);
        }

        info!(tag_id, "{} updated", K::NAME);
        let mut alert = Self::record(&alert_tag, &scheduled_query)?;
        alert.trigger = trigger;
        alert.reports = reports;
        Ok(alert)
    }

    /// Deletes the scheduled query, hook, tag and alert tag, in that order.
    ///
    /// Deleting an alert that does not exist succeeds. Parts that are already
    /// gone are skipped. The tag is kept while another hook still uses it.
    pub fn delete(&mut self, tag_id: &str) -> Result<(), ApiError> {
        let Some(resolved) = self.resolve(tag_id)? else {
            debug!(tag_id, "{} already absent", K::NAME);
            return Ok(());
        };

        let mut completed: Vec<&'static str> = Vec::new();
        let fail = |completed: Vec<&'static str>, failed: &'static str, source: ApiError| {
            if completed.is_empty() {
                return source;
            }
            warn!(tag_id, ?completed, failed, error = %source, "{} partially deleted", K::NAME);
            ApiError::PartialFailure {
                completed,
                failed,
                source: Box::new(source),
            }
        };

        if let Some(sq_id) = resolved
            .scheduled_query
            .as_ref()
            .and_then(|query| id_of(query, "id"))
        {
            self.sessions
                .delete(&format!("{SCHEDULED_QUERIES_PATH}/{sq_id}"))
                .map_err(|e| fail(completed.clone(), STEP_SCHEDULED_QUERY, e))?;
            completed.push(STEP_SCHEDULED_QUERY);
        }

        if let Some(hook_id) = resolved.hook.as_ref().and_then(|hook| id_of(hook, "id")) {
            absent_is_ok(Hooks::new(self.rest).delete(&hook_id))
                .map_err(|e| fail(completed.clone(), STEP_HOOK, e))?;
            completed.push(STEP_HOOK);
        }

        if let Some(rest_tag_id) = resolved.rest_tag.as_ref().and_then(|tag| id_of(tag, "id")) {
            let still_used = Hooks::new(self.rest)
                .list()
                .map_err(|e| fail(completed.clone(), STEP_TAG, e))?
                .iter()
                .any(|hook| references_tag(hook, &rest_tag_id));
            if still_used {
                debug!(rest_tag_id = %rest_tag_id, "tag still used by another hook, kept");
            } else {
                absent_is_ok(Tags::new(self.rest).delete(&rest_tag_id))
                    .map_err(|e| fail(completed.clone(), STEP_TAG, e))?;
                completed.push(STEP_TAG);
            }
        }

        self.sessions
            .delete(&format!("{TAGS_PATH}/{tag_id}"))
            .map_err(|e| fail(completed.clone(), STEP_ALERT_TAG, e))?;

        info!(tag_id, "{} deleted", K::NAME);
        Ok(())
    }

    /// Finds the alert tag `tag_id` and whatever still backs it, matching on
    /// ids only so renamed alerts are still found.
    fn resolve(&mut self, tag_id: &str) -> Result<Option<Resolved>, ApiError> {
        let Some(alert_tag) = self
            .list_tags()?
            .into_iter()
            .find(|tag| id_of(tag, "id").as_deref() == Some(tag_id))
        else {
            return Ok(None);
        };

        let scheduled_query = match id_of(&alert_tag, "scheduled_query_id") {
            Some(sq_id) => self
                .list_scheduled_queries()?
                .into_iter()
                .find(|query| id_of(query, "id").as_deref() == Some(sq_id.as_str())),
            None => None,
        };

        let rest_tag = match alert_tag.get("tag_sn").and_then(Value::as_str) {
            Some(label_sn) => Tags::new(self.rest)
                .list()?
                .into_iter()
                .find(|tag| tags_label(tag, label_sn)),
            None => None,
        };

        // Hooks sharing the tag are told apart by the recorded hook id. Older
        // alert tags without one only match a hook that is alone on the tag.
        let hook = match rest_tag.as_ref().and_then(|tag| id_of(tag, "id")) {
            Some(rest_tag_id) => {
                let mut hooks: Vec<Value> = Hooks::new(self.rest)
                    .list()?
                    .into_iter()
                    .filter(|hook| references_tag(hook, &rest_tag_id))
                    .collect();
                match id_of(&alert_tag, "hook_id") {
                    Some(hook_id) => hooks
                        .into_iter()
                        .find(|hook| id_of(hook, "id").as_deref() == Some(hook_id.as_str())),
                    None if hooks.len() == 1 => hooks.pop(),
                    None => None,
                }
            }
            None => None,
        };

        debug!(
            tag_id,
            scheduled_query = scheduled_query.is_some(),
            rest_tag = rest_tag.is_some(),
            hook = hook.is_some(),
            "{} resolved",
            K::NAME
        );
        Ok(Some(Resolved {
            alert_tag,
            scheduled_query,
            rest_tag,
            hook,
        }))
    }

    fn record(tag: &Value, scheduled_query: &Value) -> Result<SpecialAlert<K::Condition>, ApiError> {
        let tag_id = id_of(tag, "id")
            .ok_or_else(|| ApiError::Compatibility(format!("alert tag without id: {tag}")))?;
        let reports = tag
            .get("actions")
            .and_then(Value::as_array)
            .map(|actions| {
                actions
                    .iter()
                    .map(AlertReportConfig::from_value)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();
        let logs = tag
            .get("sources")
            .and_then(Value::as_array)
            .map(|sources| {
                sources
                    .iter()
                    .filter_map(|source| id_of(source, "id"))
                    .collect()
            })
            .unwrap_or_default();

        Ok(SpecialAlert {
            tag_id,
            name: tag
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            condition: K::condition_from(tag, scheduled_query)?,
            trigger: AlertTriggerConfig::from_value(tag)?,
            reports,
            logs,
        })
    }

    /// Label `sn` for `tag_label`, creating the label if needed.
    fn label_sn(&self, tag_label: &str) -> Result<String, ApiError> {
        let labels = Labels::new(self.rest);
        if let Some(sn) = labels
            .list()?
            .iter()
            .find(|label| label.get("name").and_then(Value::as_str) == Some(tag_label))
            .and_then(|label| id_of(label, "sn"))
        {
            return Ok(sn);
        }
        let label = labels.create(tag_label, None, None)?;
        created_id(&label, "sn")
            .ok_or_else(|| ApiError::Compatibility(format!("label created without sn: {label}")))
    }

    /// Id of the REST tag marking lines with `label_sn`, creating it if needed.
    fn rest_tag_id(&self, label_sn: &str) -> Result<String, ApiError> {
        let tags = Tags::new(self.rest);
        if let Some(id) = tags
            .list()?
            .iter()
            .find(|tag| tags_label(tag, label_sn))
            .and_then(|tag| id_of(tag, "id"))
        {
            return Ok(id);
        }
        let tag = tags.create(label_sn)?;
        created_id(&tag, "id")
            .ok_or_else(|| ApiError::Compatibility(format!("tag created without id: {tag}")))
    }

    /// Submits the scheduled query and alert tag forms, then confirms the pair
    /// shows up in a fresh listing. Returns the alert tag id.
    fn create_website_parts(
        &mut self,
        alert: &NewAlert<'_, K::Condition>,
        parts: &mut WebsiteParts,
    ) -> Result<String, ApiError> {
        let response = self.sessions.post_json(
            SCHEDULED_QUERIES_PATH,
            &json!({ "scheduled_query": K::scheduled_query(alert.condition, alert.trigger) }),
        )?;
        let sq_id = response
            .get("scheduled_query")
            .and_then(|query| id_of(query, "id"))
            .ok_or_else(|| {
                ApiError::Compatibility(format!("scheduled query created without id: {response}"))
            })?;
        parts.scheduled_query_id = Some(sq_id.clone());

        let mut tag = json!({
            "actions": alert.reports.iter().map(AlertReportConfig::to_value).collect::<Vec<_>>(),
            "hook_id": alert.hook_id,
            "name": truncate_name(alert.name),
            "scheduled_query_id": sq_id,
            "sources": alert.logs.iter().map(|log| json!({ "id": log })).collect::<Vec<_>>(),
            "sub_type": K::SUB_TYPE,
            "tag_sn": alert.label_sn,
            "type": ALERT_TAG_TYPE,
        });
        if let Value::Object(fields) = &mut tag {
            fields.extend(K::tag_fields(alert.condition));
            if let Value::Object(timeframe) = alert.trigger.to_value() {
                fields.extend(timeframe);
            }
        }
        let response = self.sessions.post_json(TAGS_PATH, &json!({ "tag": tag }))?;
        let returned_id = response.get("tag").and_then(|tag| id_of(tag, "id"));
        parts.alert_tag_id.clone_from(&returned_id);

        self.list_tags()?
            .iter()
            .filter(|tag| id_of(tag, "scheduled_query_id").as_deref() == Some(sq_id.as_str()))
            .filter_map(|tag| id_of(tag, "id"))
            .find(|id| match &returned_id {
                Some(returned) => returned == id,
                None => true,
            })
            .ok_or_else(|| {
                ApiError::Compatibility(format!(
                    "created {} is missing from the alert tag listing",
                    K::NAME
                ))
            })
    }

    /// Best effort removal of the parts created for a failed `create`. The
    /// label and tag are shared and stay.
    fn roll_back_create(&mut self, hook_id: &str, parts: &WebsiteParts) {
        if let Some(alert_tag_id) = &parts.alert_tag_id {
            if let Err(err) = self.sessions.delete(&format!("{TAGS_PATH}/{alert_tag_id}")) {
                warn!(alert_tag_id = %alert_tag_id, error = %err, "could not remove alert tag of failed {}", K::NAME);
            }
        }
        if let Some(sq_id) = &parts.scheduled_query_id {
            if let Err(err) = self
                .sessions
                .delete(&format!("{SCHEDULED_QUERIES_PATH}/{sq_id}"))
            {
                warn!(sq_id = %sq_id, error = %err, "could not remove scheduled query of failed {}", K::NAME);
            }
        }
        if let Err(err) = absent_is_ok(Hooks::new(self.rest).delete(hook_id)) {
            warn!(hook_id, error = %err, "could not remove hook of failed {}", K::NAME);
        }
    }
}

fn absent_is_ok(result: Result<Value, ApiError>) -> Result<(), ApiError> {
    match result {
        Ok(_) => Ok(()),
        Err(err) if err.is_not_found() => Ok(()),
        Err(err) => Err(err),
    }
}
