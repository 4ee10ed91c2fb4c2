//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Backend client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub base_url: String,
    /// Bearer token sent with every request, if logged in.
    pub access_token: Option<SecretString>,
    /// Timeout for ordinary requests (bookings, log entries, reads).
    pub request_timeout: Duration,
    /// Timeout for diet plan generation, which runs an LLM server-side.
    pub generation_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(30),
            generation_timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    /// Build a config from the process environment, falling back to defaults.
    ///
    /// - `NUTRI_API_URL`
    /// - `NUTRI_ACCESS_TOKEN`
    /// - `NUTRI_TIMEOUT_SECS`
    /// - `NUTRI_GENERATE_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("NUTRI_API_URL") {
            let url = url.trim().trim_end_matches('/').to_string();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    key: "NUTRI_API_URL".to_string(),
                    message: format!("expected an http(s) URL, got {url:?}"),
                });
            }
            config.base_url = url;
        }

        config.access_token = lookup("NUTRI_ACCESS_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(SecretString::from);

        if let Some(secs) = lookup("NUTRI_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("NUTRI_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("NUTRI_GENERATE_TIMEOUT_SECS") {
            config.generation_timeout = parse_secs("NUTRI_GENERATE_TIMEOUT_SECS", &secs)?;
        }

        Ok(config)
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "timeout must be at least one second".to_string(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url, "http://localhost:8000/api");
        assert!(config.access_token.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.generation_timeout, Duration::from_secs(60));
    }

    #[test]
    fn reads_all_keys() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("NUTRI_API_URL", "https://api.example.com/api/"),
            ("NUTRI_ACCESS_TOKEN", "tok-123"),
            ("NUTRI_TIMEOUT_SECS", "5"),
            ("NUTRI_GENERATE_TIMEOUT_SECS", "90"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://api.example.com/api");
        assert_eq!(
            config.access_token.as_ref().map(|t| t.expose_secret().to_string()),
            Some("tok-123".to_string())
        );
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.generation_timeout, Duration::from_secs(90));
    }

    #[test]
    fn blank_token_is_no_token() {
        let config = ClientConfig::from_lookup(lookup(&[("NUTRI_ACCESS_TOKEN", "  ")])).unwrap();
        assert!(config.access_token.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        let err = ClientConfig::from_lookup(lookup(&[("NUTRI_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "NUTRI_TIMEOUT_SECS"
        ));

        let err = ClientConfig::from_lookup(lookup(&[("NUTRI_GENERATE_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = ClientConfig::from_lookup(lookup(&[("NUTRI_API_URL", "localhost:8000")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "NUTRI_API_URL"));
    }
}
