//! Credentials for Google API calls
//!
//! Token acquisition against the OAuth token endpoint. Service-account key
//! signing belongs to the vendor SDK and is deliberately not reimplemented;
//! supported sources are a ready access token from the environment, a
//! refresh-token grant from the environment, or an `authorized_user`
//! credentials JSON file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::CoreError;

pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Tokens returned by the OAuth token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

/// Where a Bearer token comes from.
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// Pre-obtained access token.
    Static(String),
    /// Refresh-token grant executed against the token endpoint.
    Refresh {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

impl TokenSource {
    /// Environment lookup: `GOOGLE_OAUTH_ACCESS_TOKEN` wins, then the
    /// `GOOGLE_CLIENT_ID`/`GOOGLE_CLIENT_SECRET`/`GOOGLE_REFRESH_TOKEN`
    /// triple.
    pub fn from_env() -> Option<Self> {
        if let Ok(token) = std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN") {
            if !token.is_empty() {
                return Some(TokenSource::Static(token));
            }
        }

        let client_id = std::env::var("GOOGLE_CLIENT_ID").ok()?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET").ok()?;
        let refresh_token = std::env::var("GOOGLE_REFRESH_TOKEN").ok()?;
        if client_id.is_empty() || client_secret.is_empty() || refresh_token.is_empty() {
            return None;
        }
        Some(TokenSource::Refresh {
            client_id,
            client_secret,
            refresh_token,
        })
    }

    /// Read a Google credentials JSON file.
    ///
    /// `authorized_user` files carry a refresh token and map onto the
    /// refresh grant; `service_account` files are recognized but rejected.
    pub fn from_credentials_file(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::CredentialsFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let parsed: Value =
            serde_json::from_str(&content).map_err(|e| CoreError::CredentialsFile {
                path: path.to_path_buf(),
                message: format!("invalid JSON: {}", e),
            })?;

        match parsed.get("type").and_then(|v| v.as_str()) {
            Some("authorized_user") => {
                let get = |key: &str| {
                    parsed
                        .get(key)
                        .and_then(|v| v.as_str())
                        .map(String::from)
                        .ok_or_else(|| CoreError::CredentialsFile {
                            path: path.to_path_buf(),
                            message: format!("missing \"{}\"", key),
                        })
                };
                Ok(TokenSource::Refresh {
                    client_id: get("client_id")?,
                    client_secret: get("client_secret")?,
                    refresh_token: get("refresh_token")?,
                })
            }
            Some("service_account") => Err(CoreError::ServiceAccountUnsupported),
            other => Err(CoreError::CredentialsFile {
                path: path.to_path_buf(),
                message: format!("unsupported credentials type {:?}", other),
            }),
        }
    }

    /// Produce a Bearer token, hitting the token endpoint when needed.
    pub async fn access_token(&self, http: &reqwest::Client) -> Result<String, CoreError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Refresh {
                client_id,
                client_secret,
                refresh_token,
            } => {
                let mut params = HashMap::new();
                params.insert("client_id", client_id.as_str());
                params.insert("client_secret", client_secret.as_str());
                params.insert("refresh_token", refresh_token.as_str());
                params.insert("grant_type", "refresh_token");

                let tokens = post_token_form(http, &params).await?;
                Ok(tokens.access_token)
            }
        }
    }
}

/// Resolve a token for API calls: environment first, then an optional
/// credentials file.
pub async fn access_token_for(
    http: &reqwest::Client,
    credentials_file: Option<&Path>,
) -> Result<String, CoreError> {
    if let Some(source) = TokenSource::from_env() {
        return source.access_token(http).await;
    }
    if let Some(path) = credentials_file {
        return TokenSource::from_credentials_file(path)?
            .access_token(http)
            .await;
    }
    Err(CoreError::NoCredentials)
}

/// POST a form to the token endpoint and parse the token response.
pub async fn post_token_form(
    http: &reqwest::Client,
    params: &HashMap<&str, &str>,
) -> Result<OAuthTokens, CoreError> {
    let response = http
        .post(TOKEN_ENDPOINT)
        .form(params)
        .send()
        .await
        .map_err(|e| CoreError::Http {
            endpoint: TOKEN_ENDPOINT.to_string(),
            source: e,
        })?;

    let body = response.text().await.map_err(|e| CoreError::Http {
        endpoint: TOKEN_ENDPOINT.to_string(),
        source: e,
    })?;

    parse_token_response(&body)
}

/// Parse a Google OAuth token response body, surfacing endpoint errors.
pub fn parse_token_response(body: &str) -> Result<OAuthTokens, CoreError> {
    let parsed: Value = serde_json::from_str(body).map_err(|e| CoreError::TokenExchange {
        message: format!("invalid JSON response: {}", e),
    })?;

    if let Some(err) = parsed.get("error").and_then(|v| v.as_str()) {
        let desc = parsed
            .get("error_description")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error");
        return Err(CoreError::TokenExchange {
            message: format!("{}: {}", err, desc),
        });
    }

    let access_token = parsed
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CoreError::TokenExchange {
            message: "missing access_token in response".to_string(),
        })?
        .to_string();

    Ok(OAuthTokens {
        access_token,
        refresh_token: parsed
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .map(String::from),
        expires_in: parsed
            .get("expires_in")
            .and_then(|v| v.as_u64())
            .unwrap_or(3600),
    })
}

/// Resolve the credentials file for the reporting side channel.
///
/// Order: absolute path as-is, then relative to the current working
/// directory, then the file's basename inside the config directory. First
/// existing file wins; `None` means the report client runs without
/// credentials.
pub fn resolve_report_credentials(
    configured: Option<&str>,
    config_dir: &Path,
) -> Option<PathBuf> {
    let configured = configured?;
    if configured.trim().is_empty() {
        return None;
    }

    let raw = PathBuf::from(configured);
    if raw.is_absolute() {
        return raw.exists().then_some(raw);
    }

    if let Ok(cwd) = std::env::current_dir() {
        let resolved = cwd.join(&raw);
        if resolved.exists() {
            return Some(resolved);
        }
    }

    let basename = raw.file_name()?;
    let fallback = config_dir.join(basename);
    fallback.exists().then_some(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_parse_token_response_success() {
        let body = r#"{
            "access_token": "ya29.test",
            "refresh_token": "1//0e.test",
            "token_type": "Bearer",
            "expires_in": 3599
        }"#;

        let tokens = parse_token_response(body).unwrap();
        assert_eq!(tokens.access_token, "ya29.test");
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//0e.test"));
        assert_eq!(tokens.expires_in, 3599);
    }

    #[test]
    fn test_parse_token_response_error_body() {
        let body = r#"{"error": "invalid_grant", "error_description": "Bad code"}"#;
        let err = parse_token_response(body).unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
        assert!(err.to_string().contains("Bad code"));
    }

    #[test]
    fn test_parse_token_response_not_json() {
        assert!(parse_token_response("<html>gateway timeout</html>").is_err());
    }

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_authorized_user_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "creds.json",
            r#"{"type": "authorized_user", "client_id": "cid", "client_secret": "sec", "refresh_token": "rt"}"#,
        );

        match TokenSource::from_credentials_file(&path).unwrap() {
            TokenSource::Refresh {
                client_id,
                refresh_token,
                ..
            } => {
                assert_eq!(client_id, "cid");
                assert_eq!(refresh_token, "rt");
            }
            other => panic!("expected refresh source, got {:?}", other),
        }
    }

    #[test]
    fn test_service_account_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "sa.json",
            r#"{"type": "service_account", "private_key": "-----BEGIN..."}"#,
        );

        assert!(matches!(
            TokenSource::from_credentials_file(&path),
            Err(CoreError::ServiceAccountUnsupported)
        ));
    }

    #[test]
    fn test_unknown_credentials_type_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "odd.json", r#"{"type": "external_account"}"#);

        assert!(matches!(
            TokenSource::from_credentials_file(&path),
            Err(CoreError::CredentialsFile { .. })
        ));
    }

    #[test]
    fn test_resolve_absolute_path() {
        let dir = TempDir::new().unwrap();
        let existing = write_file(&dir, "sa.json", "{}");
        let config_dir = dir.path().join("config");

        let resolved =
            resolve_report_credentials(Some(existing.to_str().unwrap()), &config_dir).unwrap();
        assert_eq!(resolved, existing);

        let missing = dir.path().join("gone.json");
        assert_eq!(
            resolve_report_credentials(Some(missing.to_str().unwrap()), &config_dir),
            None
        );
    }

    #[test]
    fn test_resolve_config_dir_fallback() {
        let dir = TempDir::new().unwrap();
        let config_dir = dir.path().join("gam-cli");
        std::fs::create_dir_all(&config_dir).unwrap();
        let dest = config_dir.join("sa.json");
        std::fs::write(&dest, "{}").unwrap();

        // Relative path that exists nowhere near cwd; basename found in the
        // config dir.
        let resolved =
            resolve_report_credentials(Some("keys/elsewhere/sa.json"), &config_dir).unwrap();
        assert_eq!(resolved, dest);
    }

    #[test]
    fn test_resolve_none_and_empty() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_report_credentials(None, dir.path()), None);
        assert_eq!(resolve_report_credentials(Some("  "), dir.path()), None);
    }
}
