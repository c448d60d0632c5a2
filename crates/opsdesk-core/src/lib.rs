//! Configuration for opsdesk consumers: file discovery, schema validation
//! and the environment overlay.

pub mod config;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use config::{
    config_schema_json, load_config, parse_config, write_schema_file, ApiConfig, Config,
    ConfigError, PollConfig, ResourceConfig,
};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8091";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_POLL_MS: u64 = 30_000;
pub const DEFAULT_MIN_POLL_MS: u64 = 1_000;

/// Resource overrides after merging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSettings {
    pub interval: Option<Duration>,
    pub params: Vec<(String, String)>,
}

/// Defaults, then the config file, then `OPSDESK_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub base_url: String,
    pub admin_token: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// `None` disables background polling.
    pub default_interval: Option<Duration>,
    pub min_interval: Duration,
    pub resources: BTreeMap<String, ResourceSettings>,
    pub source: Option<PathBuf>,
}

impl Default for EffectiveSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl EffectiveSettings {
    pub fn from_config(cfg: &Config) -> Self {
        let min_interval =
            Duration::from_millis(cfg.poll.min_interval_ms.unwrap_or(DEFAULT_MIN_POLL_MS));
        let default_interval = clamp_interval(
            cfg.poll.default_interval_ms.unwrap_or(DEFAULT_POLL_MS),
            min_interval,
        );
        let resources = cfg
            .resources
            .iter()
            .map(|(name, rc)| {
                let settings = ResourceSettings {
                    interval: rc
                        .interval_ms
                        .map(|ms| clamp_interval(ms, min_interval))
                        .unwrap_or(default_interval),
                    params: rc
                        .params
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                };
                (name.trim().to_ascii_lowercase(), settings)
            })
            .collect();
        Self {
            base_url: non_blank(cfg.api.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            admin_token: non_blank(cfg.api.admin_token.clone()),
            timeout: Duration::from_secs(cfg.api.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            connect_timeout: Duration::from_secs(
                cfg.api
                    .connect_timeout_secs
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            default_interval,
            min_interval,
            resources,
            source: None,
        }
    }

    /// Applies `OPSDESK_BASE`, `OPSDESK_ADMIN_TOKEN`, `OPSDESK_HTTP_TIMEOUT_SECS`
    /// and `OPSDESK_POLL_MS`.
    pub fn overlay_env(mut self) -> Self {
        if let Some(base) = env_string("OPSDESK_BASE") {
            self.base_url = base;
        }
        if let Some(token) = env_string("OPSDESK_ADMIN_TOKEN") {
            self.admin_token = Some(token);
        }
        if let Some(secs) = env_u64("OPSDESK_HTTP_TIMEOUT_SECS") {
            self.timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(ms) = env_u64("OPSDESK_POLL_MS") {
            let interval = clamp_interval(ms, self.min_interval);
            for settings in self.resources.values_mut() {
                if settings.interval == self.default_interval {
                    settings.interval = interval;
                }
            }
            self.default_interval = interval;
        }
        self
    }

    /// Poll interval for a resource, falling back to the default.
    pub fn interval_for(&self, resource: &str) -> Option<Duration> {
        self.resources
            .get(resource)
            .map(|r| r.interval)
            .unwrap_or(self.default_interval)
    }

    pub fn params_for(&self, resource: &str) -> Vec<(String, String)> {
        self.resources
            .get(resource)
            .map(|r| r.params.clone())
            .unwrap_or_default()
    }

    /// Clamps an ad-hoc interval the same way configured ones are.
    pub fn clamp(&self, millis: u64) -> Option<Duration> {
        clamp_interval(millis, self.min_interval)
    }
}

fn clamp_interval(millis: u64, min: Duration) -> Option<Duration> {
    if millis == 0 {
        None
    } else {
        Some(Duration::from_millis(millis).max(min))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_string(key: &str) -> Option<String> {
    non_blank(std::env::var(key).ok())
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Config file in effect: `OPSDESK_CONFIG`, else `configs/default.toml`.
pub fn config_path() -> Option<PathBuf> {
    match env_string("OPSDESK_CONFIG") {
        Some(p) => Some(PathBuf::from(p)),
        None => resolve_config_path("configs/default.toml"),
    }
}

/// Resolve a relative config path against common roots.
///
/// Search order:
/// - `OPSDESK_CONFIG_DIR` environment variable if set
/// - Directory of the current executable, then its parent
/// - Workspace root during development
/// - Current working directory
///
/// If `rel` is absolute, it is returned if it exists.
pub fn resolve_config_path(rel: &str) -> Option<PathBuf> {
    let rel_path = Path::new(rel);
    if rel_path.is_absolute() {
        return rel_path.exists().then(|| rel_path.to_path_buf());
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(cfg_dir) = env_string("OPSDESK_CONFIG_DIR") {
        candidates.push(PathBuf::from(cfg_dir));
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.push(exe_dir.to_path_buf());
            if let Some(parent) = exe_dir.parent() {
                candidates.push(parent.to_path_buf());
            }
        }
    }
    candidates.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("../../"));
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd);
    }

    candidates
        .into_iter()
        .map(|base| base.join(rel))
        .find(|p| p.exists())
}

/// Loads the effective settings. An invalid config file is logged and
/// ignored so the environment and defaults still apply.
pub fn effective_settings() -> EffectiveSettings {
    effective_settings_from(config_path().as_deref())
}

pub fn effective_settings_from(path: Option<&Path>) -> EffectiveSettings {
    let loaded = path.and_then(|p| match load_config(p) {
        Ok(cfg) => Some((cfg, p.to_path_buf())),
        Err(err) => {
            tracing::error!(path = %p.display(), error = %err, "invalid config");
            None
        }
    });
    let settings = match loaded {
        Some((cfg, source)) => EffectiveSettings {
            source: Some(source),
            ..EffectiveSettings::from_config(&cfg)
        },
        None => EffectiveSettings::default(),
    };
    settings.overlay_env()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals_clamp_to_minimum() {
        let cfg = parse_config(
            r#"
            [poll]
            default_interval_ms = 200
            min_interval_ms = 500

            [resources.events]
            interval_ms = 0

            [resources.http]
            interval_ms = 4000
            params = { window = "15m" }
            "#,
        )
        .unwrap();
        let settings = EffectiveSettings::from_config(&cfg);
        assert_eq!(settings.default_interval, Some(Duration::from_millis(500)));
        assert_eq!(settings.interval_for("events"), None);
        assert_eq!(settings.interval_for("http"), Some(Duration::from_secs(4)));
        assert_eq!(settings.interval_for("llm"), Some(Duration::from_millis(500)));
        assert_eq!(
            settings.params_for("http"),
            vec![("window".to_string(), "15m".to_string())]
        );
        assert!(settings.params_for("llm").is_empty());
    }

    #[test]
    fn defaults_without_file() {
        let settings = EffectiveSettings::default();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.admin_token, None);
        assert_eq!(settings.default_interval, Some(Duration::from_secs(30)));
        assert_eq!(settings.clamp(10), Some(Duration::from_secs(1)));
        assert_eq!(settings.clamp(0), None);
    }

    #[test]
    fn blank_values_fall_back() {
        let cfg = parse_config("[api]\nbase_url = \"  \"\nadmin_token = \"\"\n").unwrap();
        let settings = EffectiveSettings::from_config(&cfg);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.admin_token, None);
    }
}
