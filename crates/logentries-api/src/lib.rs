// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client for the Logentries management APIs.
//!
//! Labels, tags, hooks, alerts and log sets go through the account-key REST
//! API. Inactivity and Anomaly alerts only exist on the website and are
//! managed through a simulated login, see [`special_alerts`].

#![deny(clippy::all)]

pub mod alerts;
mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod logs;
pub mod resources;
pub mod session;
pub mod special_alerts;

pub use alerts::{AlertConfig, AlertType};
pub use client::LogentriesClient;
pub use config::{ClientConfig, WebCredentials};
pub use error::ApiError;
pub use logs::LogSets;
pub use resources::{random_color, AlertLimits, Alerts, Colors, Hooks, Labels, Range, Tags};
pub use session::SessionManager;
