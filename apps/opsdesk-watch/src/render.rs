use chrono::Local;
use opsdesk_normalize::{
    BillingOverview, EventsSummary, HttpSummary, LlmSummary, ModelCatalog, ModerationQueue,
    RoutesSummary, RumSummary, WorkerState, WorkersSummary,
};
use opsdesk_query::{QueryState, Resource};

/// One-line terminal rendering of a snapshot.
pub trait Summary {
    fn summary(&self) -> String;
}

pub fn render_line<T: Summary>(resource: Resource, state: &QueryState<T>) -> String {
    let now = Local::now().format("%H:%M:%S");
    format!("[{}] {}", now, state_summary(resource, state))
}

pub fn state_summary<T: Summary>(resource: Resource, state: &QueryState<T>) -> String {
    match (&state.error, &state.data) {
        (Some(err), _) => format!("{resource} error: {err}"),
        (None, Some(data)) => format!("{resource} {}", data.summary()),
        (None, None) if state.loading => format!("{resource} loading"),
        (None, None) => format!("{resource} no data"),
    }
}

fn join_top<I: IntoIterator<Item = String>>(items: I) -> String {
    items.into_iter().take(3).collect::<Vec<_>>().join(", ")
}

fn money(cents: u64, currency: &str) -> String {
    format!("{} {}.{:02}", currency, cents / 100, cents % 100)
}

impl Summary for HttpSummary {
    fn summary(&self) -> String {
        let mut by_latency: Vec<_> = self.paths.iter().collect();
        by_latency.sort_by(|a, b| {
            b.avg_duration_ms
                .partial_cmp(&a.avg_duration_ms)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let p95 = self
            .p95_duration_ms
            .map(|p| format!(" p95={p:.0}ms"))
            .unwrap_or_default();
        format!(
            "window={} requests={} 4xx={} 5xx={} ({:.1}%) avg={:.1}ms{} slowest=[{}]",
            self.window.as_deref().unwrap_or("-"),
            self.requests_total,
            self.error4xx_total,
            self.error5xx_total,
            self.error5xx_ratio() * 100.0,
            self.avg_duration_ms,
            p95,
            join_top(
                by_latency
                    .iter()
                    .map(|p| format!("{} {}:{:.0}", p.method, p.path, p.avg_duration_ms))
            )
        )
    }
}

impl Summary for LlmSummary {
    fn summary(&self) -> String {
        let mut by_calls: Vec<_> = self.by_model.iter().collect();
        by_calls.sort_by(|a, b| b.calls_total.cmp(&a.calls_total));
        format!(
            "calls={} errors={} tokens={} cost=${:.2} models=[{}]",
            self.calls_total,
            self.errors_total,
            self.tokens_total,
            self.cost_usd,
            join_top(by_calls.iter().map(|m| format!("{}:{}", m.model, m.calls_total)))
        )
    }
}

impl Summary for WorkersSummary {
    fn summary(&self) -> String {
        let offline = self
            .workers
            .iter()
            .filter(|w| w.state == WorkerState::Offline)
            .count();
        let unhealthy = self.workers.iter().filter(|w| !w.healthy).count();
        format!(
            "total={} busy={} idle={} offline={} unhealthy={} queue={}",
            self.total, self.busy, self.idle, offline, unhealthy, self.queue_depth
        )
    }
}

impl Summary for EventsSummary {
    fn summary(&self) -> String {
        format!(
            "total={} since={} top=[{}]",
            self.total,
            self.start.as_deref().unwrap_or("-"),
            join_top(self.kinds.iter().map(|k| format!("{}:{}", k.kind, k.count)))
        )
    }
}

impl Summary for RoutesSummary {
    fn summary(&self) -> String {
        let mut by_errors: Vec<_> = self.routes.iter().filter(|r| r.errors > 0).collect();
        by_errors.sort_by(|a, b| b.errors.cmp(&a.errors));
        format!(
            "routes={} hits={} top(p95/ewma)=[{}] top(errors)=[{}]",
            self.routes.len(),
            self.total_hits(),
            join_top(
                self.slowest(3)
                    .into_iter()
                    .map(|r| format!("{}:{:.0}/{:.0}", r.path, r.p95_ms, r.ewma_ms))
            ),
            join_top(by_errors.iter().map(|r| format!("{}:{}", r.path, r.errors)))
        )
    }
}

impl Summary for RumSummary {
    fn summary(&self) -> String {
        format!(
            "sessions={} vitals=[{}]",
            self.sessions,
            join_top(self.vitals.iter().map(|v| format!(
                "{}:{:.0}({:.0}% good)",
                v.metric,
                v.p75,
                v.good_ratio * 100.0
            )))
        )
    }
}

impl Summary for ModelCatalog {
    fn summary(&self) -> String {
        format!(
            "total={} enabled=[{}]",
            self.models.len(),
            join_top(self.enabled().map(|m| m.display_name.clone()))
        )
    }
}

impl Summary for ModerationQueue {
    fn summary(&self) -> String {
        let flagged = self
            .items
            .iter()
            .filter_map(|item| item.top_score().map(|(label, score)| (item, label, score)))
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(item, label, score)| format!(" top={}:{}={:.2}", item.id, label, score))
            .unwrap_or_default();
        format!("pending={} items={}{}", self.pending, self.items.len(), flagged)
    }
}

impl Summary for BillingOverview {
    fn summary(&self) -> String {
        format!(
            "mrr={} outstanding={} invoices={}",
            money(self.mrr_cents, &self.currency),
            money(self.outstanding_cents(), &self.currency),
            self.invoices.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdesk_normalize::NormalizeSnapshot;
    use serde_json::json;

    #[test]
    fn route_summary_lists_slowest_first() {
        let snap = RoutesSummary::normalize(&json!({
            "by_path": {
                "/admin/models": {"hits": 10, "errors": 0, "ewma_ms": 12.3, "p95_ms": 45.6},
                "/admin/billing/overview": {"hits": 7, "errors": 1, "ewma_ms": 30.0, "p95_ms": 90.0}
            }
        }));
        let line = snap.summary();
        assert!(line.starts_with("routes=2 hits=17"), "{line}");
        assert!(line.contains("top(p95/ewma)=[/admin/billing/overview:90/30, /admin/models:46/12]"));
        assert!(line.contains("top(errors)=[/admin/billing/overview:1]"));
    }

    #[test]
    fn billing_formats_cents() {
        let snap = BillingOverview::normalize(&json!({
            "currency": "eur",
            "mrr_cents": 123456,
            "invoices": [
                {"id": "in_1", "customer": "acme", "amount_cents": 1005, "status": "open"},
                {"id": "in_2", "customer": "globex", "amount_cents": 999, "status": "paid"}
            ]
        }));
        assert_eq!(
            snap.summary(),
            "mrr=EUR 1234.56 outstanding=EUR 10.05 invoices=2"
        );
    }

    #[test]
    fn state_prefers_error_then_data() {
        let mut state: QueryState<WorkersSummary> = QueryState {
            loading: true,
            ..QueryState::default()
        };
        assert_eq!(state_summary(Resource::Workers, &state), "workers loading");

        state.loading = false;
        state.error = Some("admin token required".into());
        assert_eq!(
            state_summary(Resource::Workers, &state),
            "workers error: admin token required"
        );

        state.error = None;
        state.data = Some(WorkersSummary::normalize(&json!({
            "workers": [
                {"id": "w1", "state": "busy"},
                {"id": "w2", "state": "offline"}
            ],
            "queue_depth": 4
        })));
        let line = state_summary(Resource::Workers, &state);
        assert!(line.contains("total=2 busy=1"), "{line}");
        assert!(line.contains("offline=1 unhealthy=1 queue=4"), "{line}");
    }

    #[test]
    fn garbage_snapshots_render() {
        let empty = json!("nope");
        let lines = [
            HttpSummary::normalize(&empty).summary(),
            LlmSummary::normalize(&empty).summary(),
            EventsSummary::normalize(&empty).summary(),
            RumSummary::normalize(&empty).summary(),
            ModelCatalog::normalize(&empty).summary(),
            ModerationQueue::normalize(&empty).summary(),
        ];
        assert!(lines.iter().all(|l| !l.is_empty()));
        assert_eq!(lines[4], "total=0 enabled=[]");
    }
}
