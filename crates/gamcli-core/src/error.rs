//! Error types for gamcli-core
//!
//! Config and vendor-call failures are fatal for primary listings; the
//! metrics side channel downgrades its errors before they reach callers
//! (see `report`), and per-row normalization never errors at all.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for gamcli operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // Config Errors
    // ===================
    #[error("No config found at {path}\nRun with: gam init <path-to-gam.yaml>")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to read config: {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML in {path}: {message}")]
    YamlParse {
        path: PathBuf,
        message: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config: missing \"{key}\"")]
    MissingConfigKey { key: &'static str },

    #[error("Could not determine home directory")]
    HomeDirNotFound,

    // ===================
    // Vendor Call Errors
    // ===================
    #[error("HTTP request to {endpoint} failed")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned HTTP {status}: {body}")]
    HttpStatus {
        service: String,
        status: u16,
        body: String,
    },

    #[error("SOAP fault from {service}: {fault}")]
    SoapFault { service: String, fault: String },

    #[error("Unexpected {service} response: {message}")]
    MalformedResponse { service: String, message: String },

    // ===================
    // User Input Errors
    // ===================
    #[error("{message}")]
    InvalidArgument { message: String },

    // ===================
    // Auth Errors
    // ===================
    #[error("No credentials available: set GOOGLE_OAUTH_ACCESS_TOKEN, or GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET/GOOGLE_REFRESH_TOKEN")]
    NoCredentials,

    #[error("Token exchange failed: {message}")]
    TokenExchange { message: String },

    #[error("Service account key files require the vendor SDK for signing; provide an authorized_user credentials file or OAuth env vars instead")]
    ServiceAccountUnsupported,

    #[error("Unusable credentials file {path}: {message}")]
    CredentialsFile { path: PathBuf, message: String },
}
