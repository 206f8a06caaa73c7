// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Authenticated website session.
//!
//! Inactivity and Anomaly alerts only exist behind the interactive website, so
//! the client simulates a browser login:
//!
//! 1. `GET /login/` sets the `csrftoken` cookie.
//! 2. `POST /login/ajax/` with the token and credentials sets the session cookie.
//! 3. `GET /app/` redirects to `/app/{account_id}`.
//!
//! The cookie jar, CSRF token and account id live in a [`Session`] owned by the
//! [`SessionManager`]. A rejected request drops the session, logs in again and
//! is resent once.

use crate::config::{ClientConfig, WebCredentials};
use crate::error::ApiError;
use crate::http::{build_client, ensure_success};
use core::time::Duration;
use regex::Regex;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION, CONTENT_TYPE,
    PRAGMA, REFERER,
};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

const LOGIN_PATH: &str = "/login/";
const LOGIN_AJAX_PATH: &str = "/login/ajax/";
const APP_PATH: &str = "/app/";
const CSRF_COOKIE: &str = "csrftoken";

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers
}

fn csrf_input_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    PATTERN.get_or_init(|| {
        Regex::new(r#"name=["']csrfmiddlewaretoken["'][^>]*?value=["']([^"']+)["']"#)
            .expect("CSRF input pattern is valid")
    })
}

/// Reads the CSRF cookie the jar would send to `url`.
fn csrf_from_jar(jar: &Jar, url: &Url) -> Option<String> {
    let cookies = jar.cookies(url)?;
    let cookies = cookies.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == CSRF_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

/// Reads the hidden `csrfmiddlewaretoken` input of the login page.
fn csrf_from_page(page: &str) -> Option<String> {
    csrf_input_pattern()
        .captures(page)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_string())
}

/// The account id is the last path segment of the `/app/` redirect target.
fn account_id_from(url: &Url) -> Result<String, ApiError> {
    url.path_segments()
        .and_then(|segments| segments.filter(|segment| !segment.is_empty()).last())
        .filter(|segment| *segment != "app")
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError::Compatibility(format!(
                "could not find the account id in the app URL '{url}'"
            ))
        })
}

/// The AJAX login answers 200 with an error payload for bad credentials.
fn login_error(body: &str) -> Option<String> {
    let payload: Value = serde_json::from_str(body).ok()?;
    if let Some(error) = payload.get("error").filter(|error| !error.is_null()) {
        return Some(error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string()));
    }
    if payload.get("success").and_then(Value::as_bool) == Some(false) {
        return Some("login was not successful".to_string());
    }
    match payload.get("status").and_then(Value::as_str) {
        Some("error" | "fail" | "failed") => Some(format!("login status '{}'", payload["status"])),
        _ => None,
    }
}

fn is_login_page(url: &Url) -> bool {
    url.path().starts_with(LOGIN_PATH)
}

fn is_auth_failure(response: &Response) -> bool {
    matches!(
        response.status(),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    ) || is_login_page(response.url())
}

/// Parses a website JSON answer, surfacing error payloads as
/// [`ApiError::Rejected`].
fn parse_website_body(response: Response) -> Result<Value, ApiError> {
    let url = response.url().clone();
    let body = ensure_success(response)?.text()?;
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    let value: Value = serde_json::from_str(&body).map_err(|e| {
        ApiError::Compatibility(format!("non-JSON response from {}: {e}", url.path()))
    })?;
    for key in ["error", "errors"] {
        if let Some(error) = value.get(key).filter(|error| reports_error(error)) {
            return Err(ApiError::Rejected(error.to_string()));
        }
    }
    Ok(value)
}

/// Successful website replies may still carry an empty `errors` field.
fn reports_error(error: &Value) -> bool {
    match error {
        Value::Null | Value::Bool(false) => false,
        Value::String(message) => !message.is_empty(),
        Value::Array(errors) => !errors.is_empty(),
        Value::Object(errors) => !errors.is_empty(),
        _ => true,
    }
}

/// One authenticated login.
pub(crate) struct Session {
    client: Client,
    account_id: String,
    csrf_token: String,
    api_base: String,
    referer: String,
}

impl Session {
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.api_base, path.trim_start_matches('/'));
        debug!(method = %method, url = %url, "logentries website request");
        self.client
            .request(method, url)
            .headers(default_headers())
            .header(CONTENT_TYPE, "application/json;charset=utf-8")
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(REFERER, &self.referer)
            .header("X-CSRFToken", &self.csrf_token)
    }
}

/// Owns the website session for the lifetime of the client.
pub struct SessionManager {
    web_url: Url,
    credentials: Option<WebCredentials>,
    timeout: Duration,
    https_proxy: Option<String>,
    session: Option<Session>,
    logins: u32,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("web_url", &self.web_url.as_str())
            .field("credentials", &self.credentials)
            .field("authenticated", &self.session.is_some())
            .field("logins", &self.logins)
            .finish()
    }
}

impl SessionManager {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let web_url = Url::parse(config.web_url.trim_end_matches('/')).map_err(|e| {
            ApiError::Configuration(format!("invalid website URL '{}': {e}", config.web_url))
        })?;
        Ok(Self {
            web_url,
            credentials: config.credentials.clone(),
            timeout: config.timeout,
            https_proxy: config.https_proxy.clone(),
            session: None,
            logins: 0,
        })
    }

    /// Logs in unless a session is already held.
    pub fn ensure_session(&mut self) -> Result<(), ApiError> {
        self.session().map(|_| ())
    }

    /// Drops the held session, cookies included.
    pub fn invalidate(&mut self) {
        if self.session.take().is_some() {
            debug!("website session invalidated");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Account id discovered by the last login.
    pub fn account_id(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.account_id.as_str())
    }

    /// Number of logins performed so far.
    pub fn login_count(&self) -> u32 {
        self.logins
    }

    fn session(&mut self) -> Result<&Session, ApiError> {
        if self.session.is_none() {
            let session = self.login()?;
            self.logins += 1;
            self.session = Some(session);
        }
        self.session
            .as_ref()
            .ok_or_else(|| ApiError::Authentication("no website session".to_string()))
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.web_url
            .join(path)
            .map_err(|e| ApiError::Configuration(format!("invalid website path '{path}': {e}")))
    }

    fn login(&self) -> Result<Session, ApiError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            ApiError::Configuration(
                "website username and password are required for special alerts".to_string(),
            )
        })?;

        let jar = Arc::new(Jar::default());
        let client = build_client(self.https_proxy.as_deref(), self.timeout, Some(jar.clone()))?;

        let login_url = self.url(LOGIN_PATH)?;
        let login_page = ensure_success(
            client
                .get(login_url.clone())
                .headers(default_headers())
                .send()?,
        )?;
        let page = login_page.text()?;
        let csrf_token = csrf_from_jar(&jar, &login_url)
            .or_else(|| csrf_from_page(&page))
            .ok_or_else(|| {
                ApiError::Compatibility("login page did not provide a CSRF token".to_string())
            })?;

        let form = [
            ("csrfmiddlewaretoken", csrf_token.as_str()),
            ("ajax", "1"),
            ("next", APP_PATH),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];
        let login_response = client
            .post(self.url(LOGIN_AJAX_PATH)?)
            .headers(default_headers())
            .header(REFERER, login_url.as_str())
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&form)
            .send()?;
        if matches!(
            login_response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(ApiError::Authentication(format!(
                "credentials for '{}' were rejected ({})",
                credentials.username,
                login_response.status()
            )));
        }
        let body = ensure_success(login_response)?.text()?;
        if let Some(reason) = login_error(&body) {
            return Err(ApiError::Authentication(format!(
                "credentials for '{}' were rejected: {reason}",
                credentials.username
            )));
        }

        let app_response = ensure_success(
            client
                .get(self.url(APP_PATH)?)
                .headers(default_headers())
                .send()?,
        )?;
        let app_url = app_response.url().clone();
        if is_login_page(&app_url) {
            return Err(ApiError::Authentication(format!(
                "website redirected '{}' back to the login page",
                credentials.username
            )));
        }
        let account_id = account_id_from(&app_url)?;

        // Django rotates the token on login.
        let csrf_token = csrf_from_jar(&jar, &self.web_url).unwrap_or(csrf_token);

        info!(account_id = %account_id, "logged in to the Logentries website");
        Ok(Session {
            client,
            api_base: format!(
                "{}/rest/{}/api",
                self.web_url.as_str().trim_end_matches('/'),
                account_id
            ),
            referer: format!(
                "{}/app/{}",
                self.web_url.as_str().trim_end_matches('/'),
                account_id
            ),
            account_id,
            csrf_token,
        })
    }

    fn send_once(
        &mut self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, ApiError> {
        let session = self.session()?;
        let request = session.request(method.clone(), path);
        let request = match body {
            Some(body) => request.body(serde_json::to_string(body)?),
            None => request,
        };
        Ok(request.send()?)
    }

    /// Sends a website API request, logging in again once if the session was
    /// rejected.
    fn send(&mut self, method: Method, path: &str, body: Option<&Value>) -> Result<Response, ApiError> {
        let response = self.send_once(&method, path, body)?;
        if !is_auth_failure(&response) {
            return Ok(response);
        }

        warn!(
            status = %response.status(),
            path,
            "website session rejected, logging in again"
        );
        self.invalidate();
        let response = self.send_once(&method, path, body)?;
        if is_auth_failure(&response) {
            self.invalidate();
            return Err(ApiError::Authentication(format!(
                "website rejected the session after logging in again ({})",
                response.status()
            )));
        }
        Ok(response)
    }

    pub(crate) fn get_json(&mut self, path: &str) -> Result<Value, ApiError> {
        parse_website_body(self.send(Method::GET, path, None)?)
    }

    pub(crate) fn post_json(&mut self, path: &str, body: &Value) -> Result<Value, ApiError> {
        parse_website_body(self.send(Method::POST, path, Some(body))?)
    }

    pub(crate) fn put_json(&mut self, path: &str, body: &Value) -> Result<Value, ApiError> {
        parse_website_body(self.send(Method::PUT, path, Some(body))?)
    }

    /// Deletes a website object. Returns `false` when it was already gone.
    pub(crate) fn delete(&mut self, path: &str) -> Result<bool, ApiError> {
        let response = self.send(Method::DELETE, path, None)?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(path, "website object already absent");
            return Ok(false);
        }
        parse_website_body(response)?;
        Ok(true)
    }
}
