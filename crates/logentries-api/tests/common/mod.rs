// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory Logentries backend served by mockito.
//!
//! REST and website collections share one [`State`], so records created
//! through one backend are visible from the other like on the real service.

#![allow(dead_code)]

use logentries_api::{ClientConfig, LogentriesClient, WebCredentials};
use mockito::{Matcher, Mock, Request, Server, ServerGuard};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};

pub const ACCOUNT_KEY: &str = "test-account-key";
pub const ACCOUNT_ID: &str = "30c586e0";
pub const CSRF_TOKEN: &str = "39391011f8864144b7bfb73fca2cd510";

#[derive(Debug, Default)]
pub struct State {
    pub labels: Vec<Value>,
    pub actions: Vec<Value>,
    pub hooks: Vec<Value>,
    pub alert_tags: Vec<Value>,
    pub scheduled_queries: Vec<Value>,
    pub logins: usize,
    /// `"METHOD /path"` of every REST and website API request.
    pub requests: Vec<String>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    pub fn hook(&self, id: &str) -> Option<&Value> {
        self.hooks.iter().find(|hook| hook["id"] == id)
    }

    pub fn count_requests(&self, prefix: &str) -> usize {
        self.requests.iter().filter(|r| r.starts_with(prefix)).count()
    }
}

pub struct FakeLogentries {
    pub server: ServerGuard,
    state: Arc<Mutex<State>>,
    mocks: Vec<Mock>,
}

fn body_json(request: &Request) -> Value {
    request
        .body()
        .ok()
        .and_then(|body| serde_json::from_slice(body).ok())
        .unwrap_or(Value::Null)
}

fn wrap(key: &str, value: Value) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn remove_where(items: &mut Vec<Value>, field: &str, id: &str) {
    items.retain(|item| item[field] != id);
}

fn rest_response(state: &Arc<Mutex<State>>, uri: &str, request: &Request) -> Vec<u8> {
    let mut state = state.lock().unwrap();
    state
        .requests
        .push(format!("{} {}", request.method(), request.path()));
    let body = body_json(request);
    let action = body["request"].as_str().unwrap_or_default().to_string();

    let response = match (uri, action.as_str()) {
        ("tags", "list") => json!({"response": "ok", "tags": state.labels}),
        ("tags", "create") => {
            let label = json!({
                "sn": state.next_id("label"),
                "name": body["name"],
                "title": body["title"],
                "description": body["description"],
                "appearance": body["appearance"],
            });
            state.labels.push(label.clone());
            json!({"response": "ok", "tag": label})
        }
        ("tags", "delete") => {
            let sn = body["sn"].as_str().unwrap_or_default().to_string();
            remove_where(&mut state.labels, "sn", &sn);
            json!({"response": "ok"})
        }
        ("actions", "list") => json!({"response": "ok", "actions": state.actions}),
        ("actions", "create") => {
            let mut action = body.clone();
            for envelope in ["acl", "account", "request"] {
                action.as_object_mut().unwrap().remove(envelope);
            }
            action["id"] = json!(state.next_id("action"));
            state.actions.push(action.clone());
            json!({"response": "ok", "action": action})
        }
        ("actions", "delete") => {
            let id = body["id"].as_str().unwrap_or_default().to_string();
            remove_where(&mut state.actions, "id", &id);
            json!({"response": "ok"})
        }
        ("hooks", "list") => json!({"response": "ok", "hooks": state.hooks}),
        ("hooks", "create") | ("hooks", "update") => {
            let mut hook = body.clone();
            for envelope in ["acl", "account", "request"] {
                hook.as_object_mut().unwrap().remove(envelope);
            }
            if action == "create" {
                hook["id"] = json!(state.next_id("hook"));
            } else {
                let id = hook["id"].as_str().unwrap_or_default().to_string();
                remove_where(&mut state.hooks, "id", &id);
            }
            state.hooks.push(hook.clone());
            json!({"response": "ok", "hook": hook})
        }
        ("hooks", "delete") => {
            let id = body["id"].as_str().unwrap_or_default().to_string();
            remove_where(&mut state.hooks, "id", &id);
            json!({"response": "ok"})
        }
        _ => json!({"response": "error", "reason": format!("unknown {uri} request {action}")}),
    };
    response.to_string().into_bytes()
}

fn website_response(state: &Arc<Mutex<State>>, collection: &str, request: &Request) -> Vec<u8> {
    let mut state = state.lock().unwrap();
    state
        .requests
        .push(format!("{} {}", request.method(), request.path()));
    let id = request
        .path()
        .rsplit('/')
        .next()
        .filter(|segment| *segment != collection)
        .map(str::to_string);
    let wrapper = if collection == "tags" {
        "tag"
    } else {
        "scheduled_query"
    };

    let response = match request.method() {
        "GET" => {
            let items = if collection == "tags" {
                &state.alert_tags
            } else {
                &state.scheduled_queries
            };
            wrap(collection, Value::Array(items.clone()))
        }
        "POST" | "PUT" => {
            let mut item = body_json(request)[wrapper].clone();
            let item_id = match id {
                Some(id) => id,
                None => state.next_id(if collection == "tags" { "alert-tag" } else { "sq" }),
            };
            item["id"] = json!(item_id);
            let items = if collection == "tags" {
                &mut state.alert_tags
            } else {
                &mut state.scheduled_queries
            };
            remove_where(items, "id", &item_id);
            items.push(item.clone());
            wrap(wrapper, item)
        }
        "DELETE" => {
            let id = id.unwrap_or_default();
            let items = if collection == "tags" {
                &mut state.alert_tags
            } else {
                &mut state.scheduled_queries
            };
            remove_where(items, "id", &id);
            return Vec::new();
        }
        _ => json!({"error": "unsupported"}),
    };
    response.to_string().into_bytes()
}

fn website_path(collection: &str) -> Matcher {
    Matcher::Regex(format!(r"^/rest/{ACCOUNT_ID}/api/{collection}(/[^/]+)?$"))
}

impl FakeLogentries {
    pub fn start() -> Self {
        let mut fake = Self {
            server: Server::new(),
            state: Arc::new(Mutex::new(State::default())),
            mocks: Vec::new(),
        };
        fake.mount_login();
        for uri in ["tags", "actions", "hooks"] {
            fake.mount_rest(uri);
        }
        for collection in ["tags", "scheduled_queries"] {
            for method in ["GET", "POST", "PUT", "DELETE"] {
                let mock = fake.mount_website(method, collection);
                fake.mocks.push(mock);
            }
        }
        fake
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            api_url: self.server.url(),
            web_url: self.server.url(),
            ..ClientConfig::new(ACCOUNT_KEY)
        }
        .with_credentials(WebCredentials::new("headless@example.com", "password"))
    }

    pub fn client(&self) -> LogentriesClient {
        LogentriesClient::new(self.config()).unwrap()
    }

    fn mount_login(&mut self) {
        let page = self
            .server
            .mock("GET", "/login/")
            .with_status(200)
            .with_header("set-cookie", &format!("csrftoken={CSRF_TOKEN}; Path=/"))
            .with_body(format!(
                r#"<form><input type="hidden" name="csrfmiddlewaretoken" value="{CSRF_TOKEN}"></form>"#
            ))
            .expect_at_least(0)
            .create();

        let state = self.state.clone();
        let login = self
            .server
            .mock("POST", "/login/ajax/")
            .match_body(Matcher::UrlEncoded(
                "csrfmiddlewaretoken".into(),
                CSRF_TOKEN.into(),
            ))
            .with_status(200)
            .with_header("set-cookie", "sessionid=fake-session; Path=/")
            .with_body_from_request(move |_| {
                state.lock().unwrap().logins += 1;
                b"OK".to_vec()
            })
            .expect_at_least(0)
            .create();

        let app = self
            .server
            .mock("GET", "/app/")
            .with_status(302)
            .with_header("location", &format!("/app/{ACCOUNT_ID}"))
            .expect_at_least(0)
            .create();
        let account = self
            .server
            .mock("GET", format!("/app/{ACCOUNT_ID}").as_str())
            .with_status(200)
            .with_body("<html></html>")
            .expect_at_least(0)
            .create();
        self.mocks.extend([page, login, app, account]);
    }

    fn mount_rest(&mut self, uri: &'static str) {
        let state = self.state.clone();
        let mock = self
            .server
            .mock("POST", format!("/v2/{uri}").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body_from_request(move |request| rest_response(&state, uri, request))
            .expect_at_least(0)
            .create();
        self.mocks.push(mock);
    }

    fn mount_website(&mut self, method: &str, collection: &'static str) -> Mock {
        let state = self.state.clone();
        self.server
            .mock(method, website_path(collection))
            .match_header("x-csrftoken", CSRF_TOKEN)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body_from_request(move |request| website_response(&state, collection, request))
            .expect_at_least(0)
            .create()
    }

    /// The next `method` request on the website `collection` is answered with
    /// 403, later ones by the fake again.
    pub fn reject_next_website_request(&mut self, method: &str, collection: &'static str) -> Mock {
        let rejection = self
            .server
            .mock(method, website_path(collection))
            .with_status(403)
            .with_body("CSRF verification failed.")
            .expect(1)
            .create();
        let mock = self.mount_website(method, collection);
        self.mocks.push(mock);
        rejection
    }

    /// Answers every REST `request` on `/v2/{uri}` with a server error until
    /// the returned mock is removed.
    pub fn fail_rest_request(&mut self, uri: &str, request: &str) -> Mock {
        self.server
            .mock("POST", format!("/v2/{uri}").as_str())
            .match_body(Matcher::PartialJson(json!({ "request": request })))
            .with_status(500)
            .with_body("Internal Server Error")
            .create()
    }

    /// Answers the next `method` request on the website `collection` with
    /// `status` and `body` instead of the fake's state.
    pub fn answer_next_website_request(
        &mut self,
        method: &str,
        collection: &str,
        status: usize,
        body: &str,
    ) -> Mock {
        self.server
            .mock(method, website_path(collection))
            .with_status(status)
            .with_body(body)
            .expect(1)
            .create()
    }

    /// Answers the next `method` request on the website `collection` with a
    /// server error.
    pub fn fail_next_website_request(&mut self, method: &str, collection: &str) -> Mock {
        self.answer_next_website_request(method, collection, 500, "Internal Server Error")
    }

    /// Answers every REST `request` on `/v2/{uri}` with the backend's in-band
    /// error reply until the returned mock is removed.
    pub fn reject_rest_request(&mut self, uri: &str, request: &str) -> Mock {
        self.server
            .mock("POST", format!("/v2/{uri}").as_str())
            .match_body(Matcher::PartialJson(json!({ "request": request })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response": "error", "reason": "Unable to delete hook"}"#)
            .create()
    }

    /// Adds a website tag that is not an alert of any kind.
    pub fn seed_plain_website_tag(&self) {
        self.state().alert_tags.push(json!({
            "id": "plain-tag",
            "name": "errors",
            "type": "Tag",
            "patterns": ["level=ERROR"],
        }));
    }
}

pub fn log_keys(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|key| key.to_string()).collect()
}
