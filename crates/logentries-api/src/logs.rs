// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ApiError;
use crate::http::RestClient;
use serde_json::Value;
use std::collections::BTreeMap;

/// Host based resources of the older `/{account_key}/hosts/` API.
#[derive(Debug, Clone, Copy)]
pub struct LogSets<'a> {
    rest: &'a RestClient,
}

impl<'a> LogSets<'a> {
    pub fn new(rest: &'a RestClient) -> Self {
        Self { rest }
    }

    fn base_path(&self) -> String {
        format!("{}/hosts/", self.rest.account_key())
    }

    /// Maps each log set name to the keys of its logs.
    pub fn list(&self) -> Result<BTreeMap<String, Vec<String>>, ApiError> {
        let response = self.rest.get(&self.base_path())?;
        let hosts = response
            .get("list")
            .and_then(Value::as_array)
            .ok_or_else(|| ApiError::Compatibility("log set listing without 'list'".into()))?;

        Ok(hosts
            .iter()
            .filter_map(|host| {
                let name = host.get("name")?.as_str()?.to_string();
                let keys = host
                    .get("logs")
                    .and_then(Value::as_array)
                    .map(|logs| {
                        logs.iter()
                            .filter_map(|log| log.get("key").and_then(Value::as_str))
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                Some((name, keys))
            })
            .collect())
    }

    /// Gets a log set (`"app"`) or a single log (`"app/nginx"`).
    pub fn get(&self, log_set: &str) -> Result<Value, ApiError> {
        let path = format!("{}{}", self.base_path(), log_set.trim_end_matches('/'));
        self.rest.get(&path)
    }
}
