// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

/// Errors surfaced by the Logentries client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The website rejected the configured username/password. Not retried.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A website response did not have the expected shape. The undocumented
    /// interface has most likely changed upstream.
    #[error("unexpected response from the Logentries website: {0}")]
    Compatibility(String),

    /// The resolve step found no matching entity.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Network level failure (DNS, TLS, socket, timeout). Safe to retry.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{status}: {body}")]
    Http { status: StatusCode, body: String },

    /// The request was accepted but the reply reported an error in its payload.
    #[error("request rejected by Logentries: {0}")]
    Rejected(String),

    /// A multi-step delete stopped partway.
    #[error("delete stopped after [{}] while attempting {failed}: {source}", .completed.join(", "))]
    PartialFailure {
        completed: Vec<&'static str>,
        failed: &'static str,
        #[source]
        source: Box<ApiError>,
    },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        ApiError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// True for the crate's own not-found kind and for HTTP 404 responses.
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::NotFound { .. } => true,
            ApiError::Http { status, .. } => *status == StatusCode::NOT_FOUND,
            _ => false,
        }
    }

    /// True when the same call may succeed if issued again unchanged.
    pub fn is_retriable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Http { status, .. } => status.is_server_error(),
            ApiError::PartialFailure { .. } => true,
            _ => false,
        }
    }
}
