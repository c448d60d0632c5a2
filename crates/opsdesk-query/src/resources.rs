//! Catalog of the console's admin API resources.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use opsdesk_normalize::{
    BillingOverview, EventsSummary, HttpSummary, LlmSummary, ModelCatalog, ModerationQueue,
    RoutesSummary, RumSummary, WorkersSummary,
};

use crate::executor::FetchExecutor;
use crate::fetcher::ResourceFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Http,
    Llm,
    Workers,
    Events,
    Routes,
    Rum,
    Models,
    Moderation,
    Billing,
}

impl Resource {
    pub const ALL: [Resource; 9] = [
        Resource::Http,
        Resource::Llm,
        Resource::Workers,
        Resource::Events,
        Resource::Routes,
        Resource::Rum,
        Resource::Models,
        Resource::Moderation,
        Resource::Billing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Http => "http",
            Resource::Llm => "llm",
            Resource::Workers => "workers",
            Resource::Events => "events",
            Resource::Routes => "routes",
            Resource::Rum => "rum",
            Resource::Models => "models",
            Resource::Moderation => "moderation",
            Resource::Billing => "billing",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Resource::Http => "/admin/telemetry/http",
            Resource::Llm => "/admin/telemetry/llm",
            Resource::Workers => "/admin/telemetry/workers",
            Resource::Events => "/admin/telemetry/events",
            Resource::Routes => "/admin/telemetry/routes",
            Resource::Rum => "/admin/telemetry/rum",
            Resource::Models => "/admin/models",
            Resource::Moderation => "/admin/moderation/queue",
            Resource::Billing => "/admin/billing/overview",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let needle = raw.trim().to_ascii_lowercase();
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == needle)
            .ok_or_else(|| {
                let known: Vec<&str> = Resource::ALL.iter().map(|r| r.as_str()).collect();
                format!("unknown resource `{raw}` (expected one of: {})", known.join(", "))
            })
    }
}

pub fn http(executor: Arc<dyn FetchExecutor>) -> ResourceFetcher<HttpSummary> {
    ResourceFetcher::new(executor, Resource::Http.path())
}

pub fn llm(executor: Arc<dyn FetchExecutor>) -> ResourceFetcher<LlmSummary> {
    ResourceFetcher::new(executor, Resource::Llm.path())
}

pub fn workers(executor: Arc<dyn FetchExecutor>) -> ResourceFetcher<WorkersSummary> {
    ResourceFetcher::new(executor, Resource::Workers.path())
}

pub fn events(executor: Arc<dyn FetchExecutor>) -> ResourceFetcher<EventsSummary> {
    ResourceFetcher::new(executor, Resource::Events.path())
}

pub fn routes(executor: Arc<dyn FetchExecutor>) -> ResourceFetcher<RoutesSummary> {
    ResourceFetcher::new(executor, Resource::Routes.path())
}

pub fn rum(executor: Arc<dyn FetchExecutor>) -> ResourceFetcher<RumSummary> {
    ResourceFetcher::new(executor, Resource::Rum.path())
}

pub fn models(executor: Arc<dyn FetchExecutor>) -> ResourceFetcher<ModelCatalog> {
    ResourceFetcher::new(executor, Resource::Models.path())
}

pub fn moderation(executor: Arc<dyn FetchExecutor>) -> ResourceFetcher<ModerationQueue> {
    ResourceFetcher::new(executor, Resource::Moderation.path())
}

pub fn billing(executor: Arc<dyn FetchExecutor>) -> ResourceFetcher<BillingOverview> {
    ResourceFetcher::new(executor, Resource::Billing.path())
}
