//! Optional TOML configuration file.
//!
//! ```toml
//! app-url = "https://api.xooa.com/api/v1/"
//! api-token = "..."
//! gateway-timeout = "5s"
//!
//! [events]
//! url = "wss://api.xooa.com"
//! retries = 10
//! reconnect-delay = "1s"
//! ```

use {
    crate::{events, gateway::DEFAULT_APP_URL},
    anyhow::{Context, Result},
    serde::Deserialize,
    std::{
        fmt::{self, Debug, Formatter},
        path::Path,
        time::Duration,
    },
    url::Url,
};

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Base URL of the application's gateway API.
    #[serde(default = "default_app_url")]
    pub app_url: Url,

    #[serde(default)]
    pub api_token: Option<String>,

    /// How long the gateway may block before answering with a pending
    /// result.
    #[serde(default, with = "humantime_serde")]
    pub gateway_timeout: Option<Duration>,

    #[serde(default)]
    pub events: events::Config,
}

fn default_app_url() -> Url {
    Url::parse(DEFAULT_APP_URL).unwrap()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_url: default_app_url(),
            api_token: None,
            gateway_timeout: None,
            events: Default::default(),
        }
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("app_url", &self.app_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "SECRET"))
            .field("gateway_timeout", &self.gateway_timeout)
            .field("events", &self.events)
            .finish()
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("I/O error while reading {path:?}"))?;
        // Not printing the parser error because it could leak the api token.
        toml::from_str(&data).map_err(|_| anyhow::anyhow!("TOML syntax error while reading {path:?}"))
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::io::Write};

    #[test]
    fn load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            app-url = "http://localhost:3000/api/v1/"
            api-token = "secret-token"
            gateway-timeout = "5s"

            [events]
            url = "ws://localhost:3000"
            retries = 3
            "#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.app_url.as_str(), "http://localhost:3000/api/v1/");
        assert_eq!(config.api_token.as_deref(), Some("secret-token"));
        assert_eq!(config.gateway_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.events.retries, 3);
        assert_eq!(config.events.reconnect_delay, Duration::from_secs(1));
        assert!(!format!("{config:?}").contains("secret-token"));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(Config::load(file.path()).unwrap(), Config::default());
    }

    #[test]
    fn syntax_errors_do_not_leak_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "api-token = \"secret-token\"\nunknown = 1\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(!format!("{err:?}").contains("secret-token"));
    }

    #[test]
    fn missing_file() {
        assert!(Config::load(Path::new("/nonexistent/xooa.toml")).is_err());
    }
}
