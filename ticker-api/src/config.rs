//! Runtime configuration
//!
//! Every setting has a built-in default and can be overridden through the
//! environment (or `.env.local`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use ticker_core::DEFAULT_SYMBOLS;
use ticker_yahoo::YAHOO_API_BASE;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `SERVER_PORT`
    pub port: u16,
    /// `STOCKS_DB_PATH`
    pub db_path: PathBuf,
    /// `DASHBOARD_DIR`: holds `index.html`, also served under `/static`
    pub dashboard_dir: PathBuf,
    /// `FETCH_INTERVAL_SECS`
    pub fetch_interval: Duration,
    /// `WS_PUSH_INTERVAL_SECS`
    pub ws_push_interval: Duration,
    /// `TICKER_SYMBOLS`, comma separated
    pub symbols: Vec<String>,
    /// `YAHOO_BASE_URL`
    pub yahoo_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            db_path: PathBuf::from("data/stocks.db"),
            dashboard_dir: PathBuf::from("frontend"),
            fetch_interval: Duration::from_secs(120),
            ws_push_interval: Duration::from_secs(30),
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            yahoo_base_url: YAHOO_API_BASE.to_string(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let symbols = lookup("TICKER_SYMBOLS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|symbols| !symbols.is_empty())
            .unwrap_or(defaults.symbols);

        Self {
            port: parse_or(&lookup, "SERVER_PORT", defaults.port),
            db_path: lookup("STOCKS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            dashboard_dir: lookup("DASHBOARD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.dashboard_dir),
            fetch_interval: Duration::from_secs(parse_or(
                &lookup,
                "FETCH_INTERVAL_SECS",
                defaults.fetch_interval.as_secs(),
            )),
            ws_push_interval: Duration::from_secs(parse_or(
                &lookup,
                "WS_PUSH_INTERVAL_SECS",
                defaults.ws_push_interval.as_secs(),
            )),
            symbols,
            yahoo_base_url: lookup("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
        }
    }
}

fn parse_or<T: FromStr + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);

        assert_eq!(config.port, 8000);
        assert_eq!(config.fetch_interval, Duration::from_secs(120));
        assert_eq!(config.ws_push_interval, Duration::from_secs(30));
        assert_eq!(config.symbols.len(), 13);
        assert_eq!(config.db_path, PathBuf::from("data/stocks.db"));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("SERVER_PORT", "9100"),
            ("FETCH_INTERVAL_SECS", "30"),
            ("TICKER_SYMBOLS", " aapl, msft ,,"),
            ("DASHBOARD_DIR", "/srv/dashboard"),
        ]);

        assert_eq!(config.port, 9100);
        assert_eq!(config.fetch_interval, Duration::from_secs(30));
        assert_eq!(config.symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(config.dashboard_dir, PathBuf::from("/srv/dashboard"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[("SERVER_PORT", "eighty"), ("TICKER_SYMBOLS", " , ")]);

        assert_eq!(config.port, 8000);
        assert_eq!(config.symbols.len(), 13);
    }
}
