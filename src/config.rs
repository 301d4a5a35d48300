//! Provider configuration
//!
//! Read from `~/.config/stacklet/provider.toml` (or `--config`), then
//! overridden by `STACKLET_ENDPOINT` and `STACKLET_API_KEY`.

use declarative::{Error, Result};
use graphql::transport::http::HttpConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENDPOINT_VAR: &str = "STACKLET_ENDPOINT";
pub const API_KEY_VAR: &str = "STACKLET_API_KEY";

#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// GraphQL API URL
    pub endpoint: Option<String>,
    /// Bearer token
    pub api_key: Option<String>,
    /// Appended to the User-Agent; defaults to the crate version
    pub version: Option<String>,
    /// Log request and response bodies
    pub debug: bool,
    /// Per-request network timeout
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("version", &self.version)
            .field("debug", &self.debug)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Default config file location
pub fn default_path() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .ok_or_else(|| Error::InvalidProvider("could not determine the configuration directory".into()))?;
    Ok(dir.join("stacklet").join("provider.toml"))
}

impl ProviderConfig {
    /// Load from `path` (the default location when `None`) and apply
    /// environment overrides
    ///
    /// A missing file at the default location is not an error; the
    /// environment may carry everything.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_path()?, false),
        };
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else if explicit {
            return Err(Error::InvalidProvider(format!("config file {} does not exist", path.display())));
        } else {
            log::debug!("no provider config at {}, using environment", path.display());
            Self::default()
        };
        config.apply_env(|var| std::env::var(var).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::InvalidProvider(format!("failed to read {}: {e}", path.display())))?;
        let config = toml::from_str(&content)
            .map_err(|e| Error::InvalidProvider(format!("failed to parse {}: {e}", path.display())))?;
        log::debug!("loaded provider config from {}", path.display());
        Ok(config)
    }

    /// Environment wins over the file; empty variables are ignored
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        if let Some(endpoint) = set(ENDPOINT_VAR) {
            self.endpoint = Some(endpoint);
        }
        if let Some(api_key) = set(API_KEY_VAR) {
            self.api_key = Some(api_key);
        }
    }

    /// Validate and turn into transport settings
    pub fn http_config(&self) -> Result<HttpConfig> {
        let endpoint = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| Error::InvalidProvider(format!("endpoint is not set (config file or {ENDPOINT_VAR})")))?;
        check_endpoint(endpoint)?;
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::InvalidProvider(format!("api_key is not set (config file or {API_KEY_VAR})")))?;

        Ok(HttpConfig {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            version: self
                .version
                .clone()
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            debug: self.debug,
            timeout: self.timeout_secs.map(Duration::from_secs),
        })
    }
}

fn check_endpoint(endpoint: &str) -> Result<()> {
    let rest = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .ok_or_else(|| Error::InvalidProvider(format!("endpoint \"{endpoint}\" must be an http or https URL")))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(Error::InvalidProvider(format!("endpoint \"{endpoint}\" has no host")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_file() {
        let file = write_config(
            r#"
endpoint = "https://api.dev.stacklet.io/"
api_key = "key"
timeout_secs = 30
"#,
        );
        let config = ProviderConfig::from_file(file.path()).unwrap();
        let http = config.http_config().unwrap();
        assert_eq!(http.endpoint, "https://api.dev.stacklet.io/");
        assert_eq!(http.timeout, Some(Duration::from_secs(30)));
        assert_eq!(http.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = ProviderConfig {
            endpoint: Some("https://file.example.com".into()),
            api_key: Some("file-key".into()),
            ..ProviderConfig::default()
        };
        config.apply_env(|var| match var {
            ENDPOINT_VAR => Some("https://env.example.com".into()),
            API_KEY_VAR => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.endpoint.as_deref(), Some("https://env.example.com"));
        assert_eq!(config.api_key.as_deref(), Some("file-key"));
    }

    #[test]
    fn test_missing_key_is_invalid_provider() {
        let config = ProviderConfig {
            endpoint: Some("https://api.example.com".into()),
            ..ProviderConfig::default()
        };
        let err = config.http_config().unwrap_err();
        assert!(matches!(err, Error::InvalidProvider(ref m) if m.contains("api_key")));
    }

    #[test]
    fn test_endpoint_must_be_http() {
        for endpoint in ["ftp://x", "api.example.com", "https://"] {
            let config = ProviderConfig {
                endpoint: Some(endpoint.into()),
                api_key: Some("k".into()),
                ..ProviderConfig::default()
            };
            assert!(config.http_config().is_err(), "{endpoint}");
        }
    }

    #[test]
    fn test_unknown_key_rejected() {
        let file = write_config("endpoint = \"https://x\"\napi_token = \"k\"\n");
        assert!(matches!(ProviderConfig::from_file(file.path()), Err(Error::InvalidProvider(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ProviderConfig {
            api_key: Some("super-secret".into()),
            ..ProviderConfig::default()
        };
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
