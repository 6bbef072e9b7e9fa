//! GA4 OAuth setup helpers
//!
//! Generates the authorization URL and exchanges the resulting code for
//! tokens. The token endpoint itself is shared with `auth`.

use std::collections::HashMap;

use crate::auth::{post_token_form, OAuthTokens};
use crate::error::CoreError;

use super::GA4_SCOPE;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/";

/// Build the offline-access authorization URL the user opens in a browser.
pub fn authorization_url(client_id: &str, redirect_uri: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&scope={}&response_type=code&access_type=offline&prompt=consent",
        AUTH_ENDPOINT,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(GA4_SCOPE),
    )
}

/// Exchange an authorization code for access/refresh tokens.
pub async fn exchange_code(
    http: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<OAuthTokens, CoreError> {
    let mut params = HashMap::new();
    params.insert("client_id", client_id);
    params.insert("client_secret", client_secret);
    params.insert("code", code);
    params.insert("grant_type", "authorization_code");
    params.insert("redirect_uri", redirect_uri);

    post_token_form(http, &params).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_url_params() {
        let url = authorization_url("my-client.apps.googleusercontent.com", DEFAULT_REDIRECT_URI);
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.contains("client_id=my-client.apps.googleusercontent.com"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2F"));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fanalytics.readonly"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
    }

    #[test]
    fn test_authorization_url_escapes_client_id() {
        let url = authorization_url("a b&c", "http://localhost/");
        assert!(url.contains("client_id=a%20b%26c"));
    }
}
