use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::api::DEFAULT_BASE_URL;
use crate::poller::{PollerConfig, ReconnectPolicy, DEFAULT_LIMIT, DEFAULT_TIMEOUT_SECS};
use crate::router::{RouterOptions, DEFAULT_SKIP_CHARS};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub router: RouterConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Empty means everyone may talk to the bot.
    #[serde(default)]
    pub allowed_user_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Long-poll timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,
    #[serde(default = "default_reconnect_delays")]
    pub reconnect_delays: Vec<u64>,
    #[serde(default = "default_max_reconnect_delay")]
    pub max_reconnect_delay: u64,
    #[serde(default)]
    pub only_addressed_to_self: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            timeout: default_timeout(),
            auto_reconnect: true,
            reconnect_delays: default_reconnect_delays(),
            max_reconnect_delay: default_max_reconnect_delay(),
            only_addressed_to_self: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RouterConfig {
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "default_skip_chars")]
    pub skip_chars: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            skip_chars: default_skip_chars(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

fn default_reconnect_delays() -> Vec<u64> {
    ReconnectPolicy::default().delays_secs
}

fn default_max_reconnect_delay() -> u64 {
    ReconnectPolicy::default().max_delay_secs
}

fn default_skip_chars() -> String {
    DEFAULT_SKIP_CHARS.to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        if config.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("telegram.bot_token must not be empty");
        }
        if config.polling.limit == 0 || config.polling.limit > 100 {
            anyhow::bail!("polling.limit must be between 1 and 100");
        }
        Ok(config)
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            limit: self.polling.limit,
            timeout_secs: self.polling.timeout,
            auto_reconnect: self.polling.auto_reconnect,
            reconnect: ReconnectPolicy {
                delays_secs: self.polling.reconnect_delays.clone(),
                max_delay_secs: self.polling.max_reconnect_delay,
            },
        }
    }

    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            case_sensitive: self.router.case_sensitive,
            skip_chars: self.router.skip_chars.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::parse("[telegram]\nbot_token = \"1:abc\"\n").unwrap();
        assert_eq!(config.telegram.base_url, "https://api.telegram.org");
        assert!(config.telegram.allowed_user_ids.is_empty());

        let poller = config.poller_config();
        assert_eq!(poller, PollerConfig::default());
        assert_eq!(config.router_options(), RouterOptions::default());
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
            [telegram]
            bot_token = "1:abc"
            base_url = "http://localhost:8081"
            allowed_user_ids = [11, 22]

            [polling]
            limit = 10
            timeout = 5
            auto_reconnect = false
            reconnect_delays = [1, 3]
            max_reconnect_delay = 9
            only_addressed_to_self = true

            [router]
            case_sensitive = true
            skip_chars = " "
            "#,
        )
        .unwrap();

        let poller = config.poller_config();
        assert_eq!(poller.limit, 10);
        assert_eq!(poller.timeout_secs, 5);
        assert!(!poller.auto_reconnect);
        assert_eq!(poller.reconnect.delay_for(1).as_secs(), 3);
        assert_eq!(poller.reconnect.delay_for(2).as_secs(), 9);
        assert!(config.polling.only_addressed_to_self);
        assert_eq!(config.telegram.allowed_user_ids, vec![11, 22]);
        assert!(config.router_options().case_sensitive);
    }

    #[test]
    fn test_rejects_empty_token() {
        assert!(Config::parse("[telegram]\nbot_token = \" \"\n").is_err());
    }

    #[test]
    fn test_rejects_out_of_range_limit() {
        let err = Config::parse("[telegram]\nbot_token = \"t\"\n[polling]\nlimit = 500\n").unwrap_err();
        assert!(err.to_string().contains("polling.limit"));
    }
}
