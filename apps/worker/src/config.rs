use std::time::Duration;

use anyhow::Context;

const DEFAULT_DB_PATH: &str = "./db/fintrack.db";
const DEFAULT_INTERVAL_SECS: u64 = 60;
const DEFAULT_INITIAL_DELAY_SECS: u64 = 5;
const DEFAULT_MAX_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub runner_interval: Duration,
    pub runner_initial_delay: Duration,
    pub runner_max_concurrency: usize,
    pub json_logs: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unset keys take their defaults;
    /// set but malformed numbers are an error.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("FT_DB_PATH")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let interval_secs: u64 =
            parse_or(&lookup, "FT_RUNNER_INTERVAL_SECS", DEFAULT_INTERVAL_SECS)?;
        let initial_delay_secs: u64 = parse_or(
            &lookup,
            "FT_RUNNER_INITIAL_DELAY_SECS",
            DEFAULT_INITIAL_DELAY_SECS,
        )?;
        let max_concurrency: usize =
            parse_or(&lookup, "FT_RUNNER_MAX_CONCURRENCY", DEFAULT_MAX_CONCURRENCY)?;
        if interval_secs == 0 {
            anyhow::bail!("FT_RUNNER_INTERVAL_SECS must be greater than zero");
        }

        let json_logs = lookup("FT_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            db_path,
            runner_interval: Duration::from_secs(interval_secs),
            runner_initial_delay: Duration::from_secs(initial_delay_secs),
            runner_max_concurrency: max_concurrency.max(1),
            json_logs,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {:?}", key, raw)),
        _ => Ok(default),
    }
}
