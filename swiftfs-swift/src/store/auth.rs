//! Swift authentication.
//!
//! Supports a pre-issued token with its storage URL, or TempAuth (v1)
//! credentials exchanged for both at connect time.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::StoreError;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AuthConfig {
    Token { storage_url: String, token: String },
    TempAuth { auth_url: String, user: String, key: String },
}

/// Where to send requests and which token to send them with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub storage_url: String,
    pub token: String,
}

impl AuthConfig {
    pub async fn authenticate(&self, client: &Client) -> Result<Session, StoreError> {
        match self {
            AuthConfig::Token { storage_url, token } => Ok(Session {
                storage_url: storage_url.trim_end_matches('/').to_string(),
                token: token.clone(),
            }),
            AuthConfig::TempAuth { auth_url, user, key } => {
                temp_auth(client, auth_url, user, key).await
            }
        }
    }
}

async fn temp_auth(
    client: &Client,
    auth_url: &str,
    user: &str,
    key: &str,
) -> Result<Session, StoreError> {
    let resp = client
        .get(auth_url)
        .header("X-Auth-User", user)
        .header("X-Auth-Key", key)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(StoreError::Auth(format!(
            "TempAuth at {} returned HTTP {}",
            auth_url,
            resp.status()
        )));
    }

    let session = session_from_headers(resp.headers())?;
    debug!(storage_url = %session.storage_url, "Swift TempAuth complete");
    Ok(session)
}

fn session_from_headers(headers: &reqwest::header::HeaderMap) -> Result<Session, StoreError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| StoreError::Auth(format!("missing {} header in auth response", name)))
    };
    Ok(Session {
        storage_url: header("x-storage-url")?.trim_end_matches('/').to_string(),
        token: header("x-auth-token")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_parse_token_config() {
        let auth: AuthConfig = toml::from_str(
            r#"
storage_url = "https://swift.example.com/v1/AUTH_test/"
token = "AUTH_tk123"
"#,
        )
        .unwrap();
        assert!(matches!(auth, AuthConfig::Token { .. }));
    }

    #[test]
    fn test_parse_temp_auth_config() {
        let auth: AuthConfig = toml::from_str(
            r#"
auth_url = "https://swift.example.com/auth/v1.0"
user = "test:tester"
key = "testing"
"#,
        )
        .unwrap();
        assert_eq!(
            auth,
            AuthConfig::TempAuth {
                auth_url: "https://swift.example.com/auth/v1.0".into(),
                user: "test:tester".into(),
                key: "testing".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_token_session_trims_slash() {
        let auth = AuthConfig::Token {
            storage_url: "https://swift.example.com/v1/AUTH_test/".into(),
            token: "AUTH_tk123".into(),
        };
        let session = auth.authenticate(&Client::new()).await.unwrap();
        assert_eq!(session.storage_url, "https://swift.example.com/v1/AUTH_test");
        assert_eq!(session.token, "AUTH_tk123");
    }

    #[test]
    fn test_session_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-storage-url", HeaderValue::from_static("http://127.0.0.1:8080/v1/AUTH_test"));
        headers.insert("x-auth-token", HeaderValue::from_static("AUTH_tk"));
        let session = session_from_headers(&headers).unwrap();
        assert_eq!(session.storage_url, "http://127.0.0.1:8080/v1/AUTH_test");

        headers.remove("x-auth-token");
        assert!(matches!(session_from_headers(&headers), Err(StoreError::Auth(_))));
    }
}
