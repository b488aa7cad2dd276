use std::time::Duration;

// Config is the single place where runtime settings are read.
// Values come from environment variables (optionally a .env file).
#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub ws_url: Option<String>,
    pub user_id: Option<String>,
    pub api_token: Option<String>,
    pub connect_timeout_secs: u64,
    pub timing: DispatchTiming,
}

/// Timers driving the dispatch coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchTiming {
    /// Period of the status poll loop.
    pub poll_interval: Duration,
    /// Delay between a completed job and clearing/closing the dispatch view.
    pub close_delay: Duration,
    /// Pause between tearing down and re-establishing the push channel.
    pub reconnect_pause: Duration,
}

impl Default for DispatchTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            close_delay: Duration::from_secs(3),
            reconnect_pause: Duration::from_secs(1),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_url = env_or_fallback("LIQFLOW_API_URL", "API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .ok_or_else(|| anyhow::anyhow!("LIQFLOW_API_URL is missing"))?;

        let ws_url = env_or_fallback("LIQFLOW_WS_URL", "WS_URL")
            .and_then(|s| normalize_optional_url(&s));

        let user_id = env_or_fallback("LIQFLOW_USER_ID", "USER_ID");
        let api_token = env_or_fallback("LIQFLOW_API_TOKEN", "API_TOKEN");

        let connect_timeout_secs = env_or_fallback(
            "LIQFLOW_HTTP_CONNECT_TIMEOUT_SECS",
            "HTTP_CONNECT_TIMEOUT_SECS",
        )
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10)
        .clamp(1, 60);

        let defaults = DispatchTiming::default();
        let timing = DispatchTiming {
            poll_interval: env_millis("LIQFLOW_POLL_INTERVAL_MS").unwrap_or(defaults.poll_interval),
            close_delay: env_millis("LIQFLOW_CLOSE_DELAY_MS").unwrap_or(defaults.close_delay),
            reconnect_pause: env_millis("LIQFLOW_RECONNECT_PAUSE_MS")
                .unwrap_or(defaults.reconnect_pause),
        };

        Ok(Self {
            api_url,
            ws_url,
            user_id,
            api_token,
            connect_timeout_secs,
            timing,
        })
    }
}

fn env_or_fallback(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| std::env::var(fallback).ok().filter(|s| !s.trim().is_empty()))
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

fn normalize_optional_url(value: &str) -> Option<String> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    if matches!(v.to_lowercase().as_str(), "0" | "off" | "false" | "none") {
        return None;
    }
    Some(v.to_string())
}
