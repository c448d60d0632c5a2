//! Tracing setup shared by opsdesk binaries.

use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

/// Target used by the fetch executor for per-request records.
pub const FETCH_TARGET: &str = "opsdesk.fetch";

static FETCH_LOG_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Rolling request log, enabled with `OPSDESK_LOG_ROLL=1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchLogSettings {
    pub dir: PathBuf,
    pub prefix: String,
    pub rotation: String,
}

impl FetchLogSettings {
    pub fn from_env() -> Option<Self> {
        if std::env::var("OPSDESK_LOG_ROLL").ok().as_deref() != Some("1") {
            return None;
        }
        Some(Self {
            dir: std::env::var("OPSDESK_LOG_DIR")
                .unwrap_or_else(|_| "logs".to_string())
                .into(),
            prefix: std::env::var("OPSDESK_LOG_PREFIX").unwrap_or_else(|_| "fetch".into()),
            rotation: std::env::var("OPSDESK_LOG_ROTATION").unwrap_or_else(|_| "daily".into()),
        })
    }

    pub fn rotation(&self) -> Rotation {
        match self.rotation.trim().to_lowercase().as_str() {
            "hourly" => Rotation::HOURLY,
            "minutely" => Rotation::MINUTELY,
            _ => Rotation::DAILY,
        }
    }
}

/// Installs the global subscriber. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    install(filter, FetchLogSettings::from_env());
}

fn install(filter: EnvFilter, fetch_log: Option<FetchLogSettings>) {
    let registry = tracing_subscriber::registry().with(fmt::layer().with_filter(filter));
    let Some(settings) = fetch_log else {
        let _ = registry.try_init();
        return;
    };
    if std::fs::create_dir_all(&settings.dir).is_err() {
        tracing::warn!(directory = %settings.dir.display(), "failed to create fetch log directory");
    }
    let writer = tracing_appender::rolling::RollingFileAppender::new(
        settings.rotation(),
        &settings.dir,
        &settings.prefix,
    );
    let (nb, guard) = tracing_appender::non_blocking(writer);
    let _ = FETCH_LOG_GUARD.set(guard);
    let targets = Targets::new().with_target(FETCH_TARGET, tracing::Level::DEBUG);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(nb)
        .with_filter(targets);
    let _ = registry.with(file_layer).try_init();
}
