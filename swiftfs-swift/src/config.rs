use serde::Deserialize;
use std::path::Path;

use crate::store::auth::AuthConfig;
use crate::store::StoreError;

const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Connection settings for one container binding.
#[derive(Debug, Clone, Deserialize)]
pub struct SwiftConfig {
    pub container: String,
    /// Root prefix prepended to every logical path.
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Account or container `Temp-URL-Key` used to sign temporary URLs.
    #[serde(default)]
    pub temp_url_key: Option<String>,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl SwiftConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config: SwiftConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Settings for an in-process store, where no credentials are needed.
    pub fn in_memory(container: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            prefix: prefix.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temp_url_key: None,
            auth: None,
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.container.is_empty() {
            anyhow::bail!("container must not be empty");
        }
        if self.container.contains('/') {
            anyhow::bail!("container must not contain '/': {}", self.container);
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if let Some(key) = &self.temp_url_key {
            if key.is_empty() {
                anyhow::bail!("temp_url_key must not be empty when set");
            }
        }
        match &self.auth {
            Some(AuthConfig::Token { storage_url, token }) => {
                if storage_url.is_empty() || token.is_empty() {
                    anyhow::bail!("auth.storage_url and auth.token must not be empty");
                }
            }
            Some(AuthConfig::TempAuth { auth_url, user, key }) => {
                if auth_url.is_empty() || user.is_empty() || key.is_empty() {
                    anyhow::bail!("auth.auth_url, auth.user and auth.key must not be empty");
                }
            }
            None => {}
        }
        Ok(())
    }

    /// The configured credentials, falling back to `SWIFT_STORAGE_URL` and
    /// `SWIFT_AUTH_TOKEN` from the environment.
    pub fn resolve_auth(&self) -> Result<AuthConfig, StoreError> {
        if let Some(auth) = &self.auth {
            return Ok(auth.clone());
        }
        let storage_url = std::env::var("SWIFT_STORAGE_URL").unwrap_or_default();
        let token = std::env::var("SWIFT_AUTH_TOKEN").unwrap_or_default();
        if storage_url.is_empty() || token.is_empty() {
            return Err(StoreError::Auth(format!(
                "Swift credentials not found for container '{}'",
                self.container
            )));
        }
        Ok(AuthConfig::Token { storage_url, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let toml_str = r#"
container = "files"
prefix = "root"
temp_url_key = "secret"

[auth]
storage_url = "https://swift.example.com/v1/AUTH_test"
token = "AUTH_tk123"
"#;
        let config: SwiftConfig = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();
        assert_eq!(config.prefix, "root");
        assert_eq!(config.timeout_secs, 300);
        assert!(matches!(config.resolve_auth().unwrap(), AuthConfig::Token { .. }));
    }

    #[test]
    fn test_parse_temp_auth_config() {
        let toml_str = r#"
container = "files"

[auth]
auth_url = "http://127.0.0.1:8080/auth/v1.0"
user = "test:tester"
key = "testing"
"#;
        let config: SwiftConfig = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();
        assert_eq!(config.prefix, "");
        assert!(matches!(config.auth, Some(AuthConfig::TempAuth { .. })));
    }

    #[test]
    fn test_container_with_slash_rejected() {
        let config: SwiftConfig = toml::from_str(r#"container = "a/b""#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_token_rejected() {
        let toml_str = r#"
container = "files"

[auth]
storage_url = "https://swift.example.com/v1/AUTH_test"
token = ""
"#;
        let config: SwiftConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swiftfs.toml");
        std::fs::write(&path, "container = \"files\"\ntimeout_secs = 30\n").unwrap();
        let config = SwiftConfig::load(&path).unwrap();
        assert_eq!(config.timeout_secs, 30);

        std::fs::write(&path, "container = \"\"\n").unwrap();
        assert!(SwiftConfig::load(&path).is_err());
        assert!(SwiftConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
