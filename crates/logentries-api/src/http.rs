// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Transport for both Logentries backends.
//!
//! The REST backend is authenticated by the account key carried in every JSON
//! request envelope. The website backend reuses [`build_client`] with a cookie
//! jar, see [`crate::session`].

use crate::config::ClientConfig;
use crate::error::ApiError;
use core::time::Duration;
use logentries_fips::reqwest_adapter::create_reqwest_client_builder;
use reqwest::blocking::{Client, Response};
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// REST collections. The naming is the backend's: `tags` holds labels and
/// `actions` holds tags and alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiUri {
    Tags,
    Actions,
    Hooks,
}

impl ApiUri {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiUri::Tags => "tags",
            ApiUri::Actions => "actions",
            ApiUri::Hooks => "hooks",
        }
    }
}

/// Values of the `request` field of the REST envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiAction {
    List,
    Create,
    Delete,
    Update,
}

impl ApiAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiAction::List => "list",
            ApiAction::Create => "create",
            ApiAction::Delete => "delete",
            ApiAction::Update => "update",
        }
    }
}

/// Builds a blocking reqwest client with optional proxy configuration, timeout
/// and cookie jar. Uses rustls TLS by default. FIPS-compliant TLS is available
/// via the fips feature.
pub fn build_client(
    proxy_url: Option<&str>,
    timeout: Duration,
    cookie_jar: Option<Arc<Jar>>,
) -> Result<Client, ApiError> {
    let mut builder = create_reqwest_client_builder()
        .map_err(|e| ApiError::Configuration(format!("TLS setup failed: {e}")))?
        .timeout(timeout);
    if let Some(proxy) = proxy_url {
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }
    if let Some(jar) = cookie_jar {
        builder = builder.cookie_provider(jar);
    }
    Ok(builder.build()?)
}

/// Converts a non-success response into [`ApiError::Http`], keeping the body
/// for diagnostics.
pub(crate) fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let body = if body.is_empty() {
        status.canonical_reason().unwrap_or_default().to_string()
    } else {
        body
    };
    Err(ApiError::Http { status, body })
}

/// Surfaces the REST backend's in-band `{"response": "error"}` replies, which
/// arrive with a 200 status, as [`ApiError::Rejected`].
fn reject_error_reply(value: Value) -> Result<Value, ApiError> {
    if value.get("response").and_then(Value::as_str) != Some("error") {
        return Ok(value);
    }
    let reason = match value.get("reason") {
        Some(Value::String(reason)) => reason.clone(),
        Some(reason) if !reason.is_null() => reason.to_string(),
        _ => value.to_string(),
    };
    Err(ApiError::Rejected(reason))
}

/// Client for the token-authenticated REST backend.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    api_url: String,
    account_key: String,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = build_client(config.https_proxy.as_deref(), config.timeout, None)?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            account_key: config.account_key.clone(),
        })
    }

    pub fn account_key(&self) -> &str {
        &self.account_key
    }

    /// Posts an action envelope to `/v2/{uri}`.
    ///
    /// `params` is merged over the `acl`/`account`/`request` envelope and
    /// must be a JSON object (or null).
    pub fn post(&self, request: ApiAction, uri: ApiUri, params: Value) -> Result<Value, ApiError> {
        let mut body = Map::new();
        body.insert("acl".into(), Value::String(self.account_key.clone()));
        body.insert("account".into(), Value::String(self.account_key.clone()));
        body.insert("request".into(), Value::String(request.as_str().into()));
        match params {
            Value::Object(params) => body.extend(params),
            Value::Null => {}
            other => {
                return Err(ApiError::Configuration(format!(
                    "request parameters must be a JSON object, got {other}"
                )))
            }
        }

        let url = format!("{}/v2/{}", self.api_url, uri.as_str());
        debug!(url = %url, request = request.as_str(), "logentries REST request");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(Value::Object(body).to_string())
            .send()?;
        let response = ensure_success(response)?;
        reject_error_reply(response.json()?)
    }

    /// GETs a path relative to the REST base URL, e.g. `{key}/hosts/`.
    pub fn get(&self, path: &str) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.api_url, path.trim_start_matches('/'));
        debug!(url = %url, "logentries REST request");

        let response = ensure_success(self.client.get(&url).send()?)?;
        reject_error_reply(response.json()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn rest_client(server: &Server) -> RestClient {
        let config = ClientConfig {
            api_url: server.url(),
            ..ClientConfig::new("test-account-key")
        };
        RestClient::new(&config).expect("client should build")
    }

    #[test]
    fn test_post_wraps_params_in_envelope() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/v2/hooks")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "acl": "test-account-key",
                "account": "test-account-key",
                "request": "list",
                "extra": 1
            })))
            .with_status(200)
            .with_body(r#"{"hooks": []}"#)
            .create();

        let response = rest_client(&server)
            .post(ApiAction::List, ApiUri::Hooks, json!({"extra": 1}))
            .unwrap();

        assert_eq!(response, json!({"hooks": []}));
        mock.assert();
    }

    #[test]
    fn test_post_surfaces_http_error() {
        let mut server = Server::new();
        let _mock = server
            .mock("POST", "/v2/actions")
            .with_status(500)
            .with_body("Server error")
            .create();

        let err = rest_client(&server)
            .post(ApiAction::List, ApiUri::Actions, Value::Null)
            .unwrap_err();

        match err {
            ApiError::Http { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "Server error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_post_surfaces_error_reply() {
        let mut server = Server::new();
        let _mock = server
            .mock("POST", "/v2/hooks")
            .with_status(200)
            .with_body(r#"{"response": "error", "reason": "Hook not found"}"#)
            .create();

        let err = rest_client(&server)
            .post(ApiAction::Delete, ApiUri::Hooks, json!({"id": "hook-1"}))
            .unwrap_err();

        match err {
            ApiError::Rejected(reason) => assert_eq!(reason, "Hook not found"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reject_error_reply() {
        let ok = json!({"response": "ok", "hooks": []});
        assert_eq!(reject_error_reply(ok.clone()).unwrap(), ok);
        assert_eq!(reject_error_reply(json!({"list": []})).unwrap(), json!({"list": []}));
        assert!(matches!(
            reject_error_reply(json!({"response": "error"})),
            Err(ApiError::Rejected(reason)) if reason.contains("error")
        ));
    }

    #[test]
    fn test_post_rejects_non_object_params() {
        let server = Server::new();
        let err = rest_client(&server)
            .post(ApiAction::Create, ApiUri::Tags, json!(["not", "an", "object"]))
            .unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }

    #[test]
    fn test_get_joins_relative_path() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/test-account-key/hosts/")
            .with_status(200)
            .with_body(r#"{"list": []}"#)
            .create();

        let response = rest_client(&server).get("/test-account-key/hosts/").unwrap();
        assert_eq!(response, json!({"list": []}));
        mock.assert();
    }
}
