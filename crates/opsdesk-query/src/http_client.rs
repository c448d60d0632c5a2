use std::time::Duration;

const FALLBACK_TIMEOUT_SECS: u64 = 20;

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

/// Transport knobs for the admin API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub tcp_keepalive: Duration,
    pub pool_idle: Duration,
}

impl ClientSettings {
    /// Defaults overlaid with `OPSDESK_HTTP_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            timeout: Duration::from_secs(
                env_u64("OPSDESK_HTTP_TIMEOUT_SECS", FALLBACK_TIMEOUT_SECS).max(1),
            ),
            connect_timeout: Duration::from_secs(
                env_u64("OPSDESK_HTTP_CONNECT_TIMEOUT_SECS", 3).max(1),
            ),
            tcp_keepalive: Duration::from_secs(env_u64("OPSDESK_HTTP_TCP_KEEPALIVE_SECS", 60).max(1)),
            pool_idle: Duration::from_secs(env_u64("OPSDESK_HTTP_POOL_IDLE_SECS", 90).max(1)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.max(Duration::from_secs(1));
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout.max(Duration::from_secs(1));
        self
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from_env()
    }
}

fn user_agent() -> String {
    format!("opsdesk/{}", env!("CARGO_PKG_VERSION"))
}

/// Base client builder with harmonized defaults.
pub fn builder(settings: &ClientSettings) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(user_agent())
        .connect_timeout(settings.connect_timeout)
        .tcp_keepalive(settings.tcp_keepalive)
        .pool_idle_timeout(settings.pool_idle)
        .timeout(settings.timeout)
}

pub fn client(settings: &ClientSettings) -> reqwest::Result<reqwest::Client> {
    builder(settings).build()
}
