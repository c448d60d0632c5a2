mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use opsdesk_core::EffectiveSettings;
use opsdesk_query::{
    resources, ClientSettings, FetchExecutor, HttpExecutor, QueryOptions, QueryParams,
    QueryState, Resource, ResourceFetcher, Subscription,
};
use serde::Serialize;
use tracing::info;

use crate::render::Summary;

#[derive(Debug, Parser)]
#[command(
    name = "opsdesk-watch",
    version,
    about = "Terminal watcher for the opsdesk admin API"
)]
struct Args {
    /// Admin API base URL (overrides the config file)
    #[arg(long, env = "OPSDESK_BASE")]
    base: Option<String>,
    #[arg(long, env = "OPSDESK_ADMIN_TOKEN")]
    admin_token: Option<String>,
    /// Resource to watch: http, llm, workers, events, routes, rum, models, moderation, billing
    #[arg(long, default_value = "http")]
    resource: Resource,
    /// Extra query parameter as key=value; repeatable
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
    /// Poll interval in milliseconds; 0 disables polling
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Print the full state JSON on every update instead of a one-line summary
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Emit the first settled state and exit
    #[arg(long, default_value_t = false)]
    once: bool,
    /// Config file (defaults to configs/default.toml)
    #[arg(long, env = "OPSDESK_CONFIG")]
    config: Option<PathBuf>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in `{raw}`"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Config params first, CLI params replace same-named ones.
fn merge_params(configured: Vec<(String, String)>, cli: &[(String, String)]) -> QueryParams {
    let mut merged: Vec<(String, String)> = configured
        .into_iter()
        .filter(|(k, _)| !cli.iter().any(|(ck, _)| ck == k))
        .collect();
    merged.extend(cli.iter().cloned());
    merged.into_iter().collect()
}

fn load_settings(args: &Args) -> Result<EffectiveSettings> {
    let Some(path) = args.config.as_deref() else {
        return Ok(opsdesk_core::effective_settings());
    };
    let cfg = opsdesk_core::load_config(path)
        .with_context(|| format!("loading config {}", path.display()))?;
    Ok(EffectiveSettings {
        source: Some(path.to_path_buf()),
        ..EffectiveSettings::from_config(&cfg)
    }
    .overlay_env())
}

struct Output {
    resource: Resource,
    json: bool,
    once: bool,
}

impl Output {
    fn emit<T: Summary + Serialize>(&self, state: &QueryState<T>) -> Result<()> {
        if self.json {
            println!(
                "{}",
                serde_json::to_string(state).context("encoding state json")?
            );
        } else {
            println!("{}", render::render_line(self.resource, state));
        }
        Ok(())
    }
}

async fn watch<T>(
    fetcher: ResourceFetcher<T>,
    params: QueryParams,
    options: QueryOptions,
    out: Output,
) -> Result<()>
where
    T: Summary + Serialize + Clone + Send + Sync + 'static,
{
    info!(
        resource = %out.resource,
        path = fetcher.path(),
        poll_ms = options.poll_interval().map(|d| d.as_millis() as u64),
        "watching"
    );
    let sub = Subscription::activate(fetcher, params, options);
    let mut rx = sub.watch();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut emitted: Option<(Option<DateTime<Utc>>, Option<String>)> = None;
    loop {
        let state = rx.borrow_and_update().clone();
        let key = (state.last_updated, state.error.clone());
        if state.is_settled() && emitted.as_ref() != Some(&key) {
            out.emit(&state)?;
            emitted = Some(key);
            if out.once {
                break;
            }
        }
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!(resource = %out.resource, "interrupted");
                break;
            }
        }
    }
    sub.deactivate();
    if out.once {
        if let Some((_, Some(err))) = emitted {
            bail!("{} failed: {}", out.resource, err);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    opsdesk_otel::init();
    let args = Args::parse();
    let settings = load_settings(&args)?;
    let resource = args.resource;

    let base = args
        .base
        .clone()
        .unwrap_or_else(|| settings.base_url.clone());
    let token = args
        .admin_token
        .clone()
        .or_else(|| settings.admin_token.clone());
    let client_settings = ClientSettings::from_env()
        .with_timeout(settings.timeout)
        .with_connect_timeout(settings.connect_timeout);
    let executor: Arc<dyn FetchExecutor> = Arc::new(
        HttpExecutor::new(&base, &client_settings)
            .context("building http client")?
            .with_admin_token(token),
    );

    let params = merge_params(settings.params_for(resource.as_str()), &args.params);
    let interval = match (args.once, args.interval_ms) {
        (true, _) => None,
        (false, Some(ms)) => settings.clamp(ms),
        (false, None) => settings.interval_for(resource.as_str()),
    };
    let options = match interval {
        Some(period) => QueryOptions::new().poll_every(period),
        None => QueryOptions::new(),
    };
    if let Some(source) = settings.source.as_deref() {
        info!(config = %source.display(), base = %base, "settings loaded");
    }
    let out = Output {
        resource,
        json: args.json,
        once: args.once,
    };

    match resource {
        Resource::Http => watch(resources::http(executor), params, options, out).await,
        Resource::Llm => watch(resources::llm(executor), params, options, out).await,
        Resource::Workers => watch(resources::workers(executor), params, options, out).await,
        Resource::Events => watch(resources::events(executor), params, options, out).await,
        Resource::Routes => watch(resources::routes(executor), params, options, out).await,
        Resource::Rum => watch(resources::rum(executor), params, options, out).await,
        Resource::Models => watch(resources::models(executor), params, options, out).await,
        Resource::Moderation => {
            watch(resources::moderation(executor), params, options, out).await
        }
        Resource::Billing => watch(resources::billing(executor), params, options, out).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_parse_key_value() {
        assert_eq!(
            parse_param("window = 1h"),
            Ok(("window".to_string(), "1h".to_string()))
        );
        assert_eq!(
            parse_param("q=a=b"),
            Ok(("q".to_string(), "a=b".to_string()))
        );
        assert!(parse_param("window").is_err());
        assert!(parse_param("=1h").is_err());
    }

    #[test]
    fn cli_params_replace_configured() {
        let merged = merge_params(
            vec![
                ("window".into(), "1h".into()),
                ("limit".into(), "20".into()),
            ],
            &[("window".into(), "15m".into())],
        );
        assert_eq!(
            merged.pairs(),
            &[
                ("limit".to_string(), "20".to_string()),
                ("window".to_string(), "15m".to_string())
            ]
        );
    }

    #[test]
    fn args_parse_resource_and_params() {
        let args = Args::try_parse_from([
            "opsdesk-watch",
            "--resource",
            "Workers",
            "--param",
            "limit=5",
            "--once",
        ])
        .unwrap();
        assert_eq!(args.resource, Resource::Workers);
        assert_eq!(args.params, vec![("limit".to_string(), "5".to_string())]);
        assert!(args.once);
        assert!(Args::try_parse_from(["opsdesk-watch", "--resource", "metrics"]).is_err());
    }
}
