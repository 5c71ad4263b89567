use std::fmt;
use std::time::Duration;

pub const DEFAULT_ENDPOINT_URL: &str =
    "https://d0ltfp2kv5l7u1h9.us-east-1.aws.endpoints.huggingface.cloud";

pub const ENDPOINT_URL_ENV: &str = "INFERENCE_ENDPOINT_URL";
pub const API_TOKEN_ENV: &str = "INFERENCE_API_TOKEN";
pub const TIMEOUT_MS_ENV: &str = "INFERENCE_TIMEOUT_MS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set to the endpoint bearer token")]
    MissingToken(&'static str),
    #[error("{var} must be a whole number of milliseconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },
}

/// Where to send queries and how to authenticate. The token is supplied at
/// process start and never compiled in.
#[derive(Clone)]
pub struct EndpointConfig {
    url: String,
    token: String,
    timeout: Option<Duration>,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = non_empty(lookup(ENDPOINT_URL_ENV))
            .unwrap_or_else(|| DEFAULT_ENDPOINT_URL.to_string());
        let token =
            non_empty(lookup(API_TOKEN_ENV)).ok_or(ConfigError::MissingToken(API_TOKEN_ENV))?;
        let timeout = parse_timeout_ms(lookup(TIMEOUT_MS_ENV).as_deref())?;

        Ok(Self {
            url,
            token,
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

// Absent or blank means no timeout at all.
fn parse_timeout_ms(value: Option<&str>) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<u64>()
        .map(|ms| Some(Duration::from_millis(ms)))
        .map_err(|_| ConfigError::InvalidTimeout {
            var: TIMEOUT_MS_ENV,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_to_hosted_endpoint_without_timeout() {
        let config = EndpointConfig::from_lookup(lookup_from(&[(API_TOKEN_ENV, "hf_abc")]))
            .expect("token is set");
        assert_eq!(config.url(), DEFAULT_ENDPOINT_URL);
        assert_eq!(config.token(), "hf_abc");
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn missing_or_blank_token_is_rejected() {
        let err = EndpointConfig::from_lookup(lookup_from(&[])).expect_err("no token");
        assert!(matches!(err, ConfigError::MissingToken(API_TOKEN_ENV)));

        let err = EndpointConfig::from_lookup(lookup_from(&[(API_TOKEN_ENV, "  ")]))
            .expect_err("blank token");
        assert!(matches!(err, ConfigError::MissingToken(_)));
    }

    #[test]
    fn overrides_url_and_timeout() {
        let config = EndpointConfig::from_lookup(lookup_from(&[
            (API_TOKEN_ENV, "hf_abc"),
            (ENDPOINT_URL_ENV, " http://127.0.0.1:8080/infer "),
            (TIMEOUT_MS_ENV, "1500"),
        ]))
        .expect("valid config");
        assert_eq!(config.url(), "http://127.0.0.1:8080/infer");
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn parse_timeout_ms_handles_blank_and_garbage() {
        assert_eq!(parse_timeout_ms(None).expect("absent"), None);
        assert_eq!(parse_timeout_ms(Some("")).expect("blank"), None);
        assert!(matches!(
            parse_timeout_ms(Some("soon")),
            Err(ConfigError::InvalidTimeout { .. })
        ));
    }

    #[test]
    fn debug_output_redacts_token() {
        let config = EndpointConfig::new(DEFAULT_ENDPOINT_URL, "hf_secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hf_secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
