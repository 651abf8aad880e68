use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::Context;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    /// How often the price refresh job wakes up.
    pub refresh_interval: Duration,
    pub breaker_max_failures: u32,
    pub breaker_reset_timeout: Duration,
    /// Upper bound on one provider round-trip for the whole symbol batch.
    pub fetch_timeout: Duration,
    pub market_timezone: String,
    pub log_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 18072)),
            db_path: "./db/tickerwatch.db".into(),
            cors_allow: vec!["*".into()],
            request_timeout: Duration::from_millis(30_000),
            refresh_interval: Duration::from_secs(150),
            breaker_max_failures: 5,
            breaker_reset_timeout: Duration::from_secs(20),
            fetch_timeout: Duration::from_secs(30),
            market_timezone: "Europe/Rome".into(),
            log_format: "text".into(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unset means `default`; set but unparsable is an error.
fn env_number<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Read `TW_*` variables, after loading `.env` if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr: SocketAddr = env_or("TW_LISTEN_ADDR", "0.0.0.0:18072")
            .parse()
            .context("Invalid TW_LISTEN_ADDR")?;
        let cors_allow = env_or("TW_CORS_ALLOW_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let max_failures = env_number("TW_BREAKER_MAX_FAILURES", defaults.breaker_max_failures)?;
        if max_failures == 0 {
            anyhow::bail!("TW_BREAKER_MAX_FAILURES must be at least 1");
        }

        Ok(Self {
            listen_addr,
            db_path: env_or("TW_DB_PATH", &defaults.db_path),
            cors_allow,
            request_timeout: Duration::from_millis(env_number("TW_REQUEST_TIMEOUT_MS", 30_000)?),
            refresh_interval: Duration::from_secs(env_number("TW_REFRESH_INTERVAL_SECS", 150)?),
            breaker_max_failures: max_failures,
            breaker_reset_timeout: Duration::from_secs(env_number("TW_BREAKER_RESET_SECS", 20)?),
            fetch_timeout: Duration::from_secs(env_number("TW_FETCH_TIMEOUT_SECS", 30)?),
            market_timezone: env_or("TW_MARKET_TIMEZONE", &defaults.market_timezone),
            log_format: env_or("TW_LOG_FORMAT", &defaults.log_format),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_number_defaults_when_unset() {
        std::env::remove_var("TW_TEST_UNSET_NUMBER");
        assert_eq!(env_number("TW_TEST_UNSET_NUMBER", 20u64).unwrap(), 20);
    }

    #[test]
    fn test_env_number_parses_trimmed_value() {
        std::env::set_var("TW_TEST_PADDED_NUMBER", " 45 ");
        assert_eq!(env_number("TW_TEST_PADDED_NUMBER", 20u64).unwrap(), 45);
    }

    #[test]
    fn test_env_number_rejects_malformed_value() {
        std::env::set_var("TW_TEST_MALFORMED_NUMBER", "2O");
        let err = env_number("TW_TEST_MALFORMED_NUMBER", 20u64).unwrap_err();
        assert!(err.to_string().contains("TW_TEST_MALFORMED_NUMBER"));
    }
}
