//! Backend connection settings.
//!
//! Settings come from a TOML file or from `TOMBO_*` environment variables.
//! See `config/tombo.example.toml` for the file format.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::SourceError;

/// Environment variable holding the backend base URL.
pub const URL_VAR: &str = "TOMBO_BACKEND_URL";
/// Environment variable holding the backend API key.
pub const KEY_VAR: &str = "TOMBO_BACKEND_KEY";
/// Environment variable overriding the request timeout, in seconds.
pub const TIMEOUT_VAR: &str = "TOMBO_TIMEOUT_SECS";
/// Environment variable overriding the length of the recent-reports list.
pub const RECENT_LIMIT_VAR: &str = "TOMBO_RECENT_LIMIT";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Recent-list length used when none is configured.
pub const DEFAULT_RECENT_LIMIT: u32 = 5;

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_recent_limit() -> u32 {
    DEFAULT_RECENT_LIMIT
}

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`.
    pub url: String,
    /// Anonymous API key, sent as both `apikey` and bearer token.
    pub api_key: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Number of reports in the recent list.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: u32,
}

impl BackendConfig {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if the URL or key is missing, or a
    /// numeric override does not parse.
    pub fn from_env() -> Result<Self, SourceError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SourceError> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| SourceError::Config {
                    message: format!("{name} is not set"),
                })
        };

        let config = Self {
            url: required(URL_VAR)?,
            api_key: required(KEY_VAR)?,
            timeout_secs: parse_override(&lookup, TIMEOUT_VAR)?.unwrap_or(default_timeout_secs()),
            recent_limit: parse_override(&lookup, RECENT_LIMIT_VAR)?
                .unwrap_or(default_recent_limit()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses settings from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the TOML is malformed or the settings are
    /// invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self, SourceError> {
        let config: Self = toml::de::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML settings file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let contents = std::fs::read_to_string(path)?;
        log::debug!("Loaded backend config from {}", path.display());
        Self::from_toml(&contents)
    }

    fn validate(&self) -> Result<(), SourceError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(SourceError::Config {
                message: format!("backend url must be http(s), got '{}'", self.url),
            });
        }
        if self.timeout_secs == 0 {
            return Err(SourceError::Config {
                message: "timeout_secs must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, SourceError> {
    lookup(name)
        .map(|raw| {
            raw.trim().parse().map_err(|_| SourceError::Config {
                message: format!("{name} must be a number, got '{raw}'"),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    const EXAMPLE_TOML: &str = include_str!("../../../config/tombo.example.toml");

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn example_config_parses() {
        let config = BackendConfig::from_toml(EXAMPLE_TOML).unwrap();
        assert!(config.url.starts_with("https://"));
        assert!(config.timeout_secs > 0);
    }

    #[test]
    fn toml_defaults_apply() {
        let config = BackendConfig::from_toml(
            r#"
            url = "https://example.supabase.co"
            api_key = "anon"
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.recent_limit, 5);
    }

    #[test]
    fn reads_environment() {
        let config = BackendConfig::from_lookup(lookup(&[
            (URL_VAR, "http://localhost:54321"),
            (KEY_VAR, "secret"),
            (RECENT_LIMIT_VAR, "10"),
        ]))
        .unwrap();
        assert_eq!(config.url, "http://localhost:54321");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.recent_limit, 10);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn missing_key_is_an_error() {
        let err = BackendConfig::from_lookup(lookup(&[(URL_VAR, "https://x.supabase.co")]))
            .unwrap_err();
        assert!(err.to_string().contains(KEY_VAR));
    }

    #[test]
    fn bad_override_is_an_error() {
        let err = BackendConfig::from_lookup(lookup(&[
            (URL_VAR, "https://x.supabase.co"),
            (KEY_VAR, "k"),
            (TIMEOUT_VAR, "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, SourceError::Config { .. }));
    }

    #[test]
    fn rejects_non_http_url() {
        assert!(BackendConfig::from_toml("url = \"ftp://x\"\napi_key = \"k\"").is_err());
    }
}
