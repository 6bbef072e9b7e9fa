//! gamcli-core - Core library for gamcli
//!
//! Provides config handling, response normalization, and thin clients for the
//! Ad Manager SOAP/report APIs and the GA4 reporting API.

pub mod admanager;
pub mod auth;
pub mod config;
pub mod dates;
pub mod errlog;
pub mod error;
pub mod ga4;
pub mod normalize;
pub mod presets;
pub mod render;
pub mod report;

pub use admanager::AdManager;
pub use config::GamConfig;
pub use error::CoreError;
pub use normalize::{attr, attr_str, Record};
pub use render::{format_table, to_json_pretty};
