use anyhow::Context;
use std::env;
use std::time::Duration;

pub const DEFAULT_BITFINEX_WS_URL: &str = "wss://api-pub.bitfinex.com/ws/2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub pairs: Vec<String>,
    pub api_port: u16,
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    pub bitfinex_ws_url: String,
    pub reconnect_delay: Duration,
    pub sink_timeout: Duration,
    pub resync_on_checksum_failure: bool,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pairs: vec!["BTCUSD".to_string()],
            api_port: 3000,
            redis_url: None,
            key_prefix: None,
            bitfinex_ws_url: DEFAULT_BITFINEX_WS_URL.to_string(),
            reconnect_delay: Duration::from_millis(5000),
            sink_timeout: Duration::from_millis(2000),
            resync_on_checksum_failure: false,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let pairs = match non_empty("PAIRS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.pairs,
        };

        let api_port = match non_empty("API_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("API_PORT must be a valid port number, got {raw:?}"))?,
            None => defaults.api_port,
        };

        let reconnect_delay = match non_empty("RECONNECT_DELAY_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("RECONNECT_DELAY_MS must be milliseconds, got {raw:?}"))?,
            ),
            None => defaults.reconnect_delay,
        };

        let sink_timeout = match non_empty("SINK_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("SINK_TIMEOUT_MS must be milliseconds, got {raw:?}"))?,
            ),
            None => defaults.sink_timeout,
        };

        let resync_on_checksum_failure = match non_empty("RESYNC_ON_CHECKSUM_FAILURE") {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("RESYNC_ON_CHECKSUM_FAILURE must be true/false, got {raw:?}"))?,
            None => defaults.resync_on_checksum_failure,
        };

        let log_format = match non_empty("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be text or json, got {other:?}"),
        };

        Ok(Self {
            pairs,
            api_port,
            redis_url: non_empty("REDIS_URL"),
            key_prefix: non_empty("KEY_PREFIX"),
            bitfinex_ws_url: non_empty("BITFINEX_WS_URL").unwrap_or(defaults.bitfinex_ws_url),
            reconnect_delay,
            sink_timeout,
            resync_on_checksum_failure,
            log_format,
        })
    }

    /// Key namespace for one feed and pair, e.g. `prod:bitfinex:BTCUSD`.
    pub fn namespace(&self, feed: &str, pair: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}:{feed}:{pair}"),
            None => format!("{feed}:{pair}"),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.pairs, vec!["BTCUSD"]);
        assert_eq!(config.api_port, 3000);
        assert!(config.redis_url.is_none());
        assert!(!config.resync_on_checksum_failure);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.bitfinex_ws_url, DEFAULT_BITFINEX_WS_URL);
    }

    #[test]
    fn parses_overrides() {
        let config = config(&[
            ("PAIRS", "btcusd, ethusd ,"),
            ("API_PORT", "8080"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("KEY_PREFIX", "prod"),
            ("RECONNECT_DELAY_MS", "250"),
            ("SINK_TIMEOUT_MS", "750"),
            ("RESYNC_ON_CHECKSUM_FAILURE", "TRUE"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.pairs, vec!["BTCUSD", "ETHUSD"]);
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.sink_timeout, Duration::from_millis(750));
        assert!(config.resync_on_checksum_failure);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.namespace("bitfinex", "ETHUSD"), "prod:bitfinex:ETHUSD");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("API_PORT", "70000")]).is_err());
        assert!(config(&[("SINK_TIMEOUT_MS", "soon")]).is_err());
        assert!(config(&[("RESYNC_ON_CHECKSUM_FAILURE", "maybe")]).is_err());
        assert!(config(&[("LOG_FORMAT", "xml")]).is_err());
    }
}
