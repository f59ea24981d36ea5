//! Client configuration

use auditor_shared::utils::parse_duration;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

const ENV_PREFIX: &str = "AUDITOR";
const DEFAULT_CONFIG_NAME: &str = "auditor";

/// Client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Auditor service host name
    pub host: String,

    /// Auditor service port
    pub port: u16,

    /// Use https instead of http
    pub secure: bool,

    /// How often buffered details are flushed (None = write-through, every
    /// detail call commits immediately)
    pub buffer_interval: Option<Duration>,

    /// Upper bound for a single request to the service
    pub request_timeout: Duration,

    /// Explicit user to record on events (None = derive from the environment)
    pub user: Option<String>,

    /// Page size used when iterating the event listing
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            secure: false,
            buffer_interval: None,
            request_timeout: Duration::from_secs(10),
            user: None,
            page_size: 50,
        }
    }
}

/// On-disk / environment representation; durations are human strings.
#[derive(Debug, Deserialize)]
struct RawConfig {
    host: String,
    port: u16,
    secure: bool,
    buffer_interval: Option<String>,
    request_timeout: String,
    user: Option<String>,
    page_size: u32,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_buffer_interval(mut self, interval: Duration) -> Self {
        self.buffer_interval = Some(interval);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Load configuration: defaults, then `auditor.{toml,json,...}` in the
    /// working directory (or the given file), then `AUDITOR_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    pub(crate) fn load_with_env_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("host", defaults.host.clone())?
            .set_default("port", i64::from(defaults.port))?
            .set_default("secure", defaults.secure)?
            .set_default("request_timeout", "10s")?
            .set_default("page_size", i64::from(defaults.page_size))?;

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        let raw: RawConfig = builder
            .add_source(config::Environment::with_prefix(prefix).try_parsing(true))
            .build()?
            .try_deserialize()?;

        let config = Self::from_raw(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let buffer_interval = match raw.buffer_interval.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(
                parse_duration(s)
                    .map_err(|e| Error::Config(format!("buffer_interval {:?}: {}", s, e)))?,
            ),
        };
        let request_timeout = parse_duration(&raw.request_timeout).map_err(|e| {
            Error::Config(format!("request_timeout {:?}: {}", raw.request_timeout, e))
        })?;

        Ok(Self {
            host: raw.host,
            port: raw.port,
            secure: raw.secure,
            // A zero interval means "no buffering"
            buffer_interval: buffer_interval.filter(|d| !d.is_zero()),
            request_timeout,
            user: raw.user.filter(|u| !u.trim().is_empty()),
            page_size: raw.page_size,
        })
    }

    /// Base URL of the service, without a trailing slash
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Buffer interval, with a zero duration treated as unbuffered.
    pub fn effective_buffer_interval(&self) -> Option<Duration> {
        self.buffer_interval.filter(|d| !d.is_zero())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Config("port must be greater than 0".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "request_timeout must be greater than 0".to_string(),
            ));
        }
        if self.page_size == 0 || self.page_size > 1000 {
            return Err(Error::Config("page_size must be within 1..=1000".to_string()));
        }
        Ok(())
    }
}

/// Resolve the user recorded on an event.
///
/// An explicit user wins. Otherwise `$USER` is used, annotated with the
/// invoking account as `user(sudo_user)` when running under sudo.
pub fn resolve_user<F>(explicit: Option<&str>, env: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(user) = explicit.filter(|u| !u.trim().is_empty()) {
        return Ok(user.to_string());
    }
    let user = env("USER").ok_or_else(|| {
        Error::Config("no user configured and USER is not set".to_string())
    })?;
    match env("SUDO_USER") {
        Some(sudo_user) => Ok(format!("{}({})", user, sudo_user)),
        None => Ok(user),
    }
}

/// [`resolve_user`] against the process environment.
pub fn resolve_user_from_env(explicit: Option<&str>) -> Result<String> {
    resolve_user(explicit, |key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url(), "http://localhost:8000");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.effective_buffer_interval(), None);
    }

    #[test]
    fn test_secure_base_url() {
        let config = ClientConfig {
            secure: true,
            ..ClientConfig::new("audit.example.com", 443)
        };
        assert_eq!(config.base_url(), "https://audit.example.com:443");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(ClientConfig::new("", 8000).validate().is_err());
        assert!(ClientConfig::new("localhost", 0).validate().is_err());

        let zero_timeout = ClientConfig {
            request_timeout: Duration::ZERO,
            ..ClientConfig::default()
        };
        assert!(zero_timeout.validate().is_err());

        let huge_page = ClientConfig {
            page_size: 5000,
            ..ClientConfig::default()
        };
        assert!(huge_page.validate().is_err());
    }

    #[test]
    fn test_zero_interval_means_unbuffered() {
        let config = ClientConfig::default().with_buffer_interval(Duration::ZERO);
        assert_eq!(config.effective_buffer_interval(), None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "host = \"audit.internal\"\nport = 9100\nbuffer_interval = \"2s\"\nrequest_timeout = \"3s\"\nuser = \"deploy-bot\""
        )
        .unwrap();

        let config =
            ClientConfig::load_with_env_prefix(Some(file.path()), "AUDITOR_TEST_FILE").unwrap();
        assert_eq!(config.host, "audit.internal");
        assert_eq!(config.port, 9100);
        assert_eq!(config.buffer_interval, Some(Duration::from_secs(2)));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.user.as_deref(), Some("deploy-bot"));
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_load_rejects_bad_duration() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "buffer_interval = \"later\"").unwrap();

        let err = ClientConfig::load_with_env_prefix(Some(file.path()), "AUDITOR_TEST_BAD")
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_resolve_user_prefers_explicit() {
        let env = env_of(&[("USER", "root"), ("SUDO_USER", "alice")]);
        assert_eq!(resolve_user(Some("bob"), &env).unwrap(), "bob");
    }

    #[test]
    fn test_resolve_user_under_sudo() {
        let env = env_of(&[("USER", "root"), ("SUDO_USER", "alice")]);
        assert_eq!(resolve_user(None, &env).unwrap(), "root(alice)");
    }

    #[test]
    fn test_resolve_user_plain_and_missing() {
        assert_eq!(resolve_user(None, env_of(&[("USER", "carol")])).unwrap(), "carol");
        assert!(resolve_user(None, env_of(&[])).is_err());
    }
}
