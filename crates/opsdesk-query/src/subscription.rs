//! Polling query controller.
//!
//! A [`Subscription`] owns one request session at a time. Every issued
//! request gets a fresh generation number and cancellation token; a
//! response only reaches the visible state if its generation is still the
//! current one when it completes. Poll ticks run in the background, never
//! overlap, and never touch `loading` or `error` on their own.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::FetchError;
use crate::fetcher::DomainFetcher;
use crate::state::QueryState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    poll_interval: Option<Duration>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll in the background every `interval`. Zero disables polling.
    pub fn poll_every(mut self, interval: Duration) -> Self {
        self.poll_interval = non_zero(Some(interval));
        self
    }

    pub fn poll_millis(self, millis: u64) -> Self {
        self.poll_every(Duration::from_millis(millis))
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval
    }
}

fn non_zero(interval: Option<Duration>) -> Option<Duration> {
    interval.filter(|d| !d.is_zero())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Foreground,
    Background,
}

struct Ticket<D> {
    generation: u64,
    token: CancellationToken,
    deps: D,
    trigger: Trigger,
}

struct Control<D> {
    deps: D,
    generation: u64,
    in_flight: Option<CancellationToken>,
    busy: Arc<AtomicBool>,
    interval: Option<Duration>,
    timer: Option<PollTimer>,
    active: bool,
}

impl<D> Control<D> {
    /// Makes every outstanding request stale and releases the timer.
    fn invalidate(&mut self) {
        self.generation += 1;
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.timer = None;
    }
}

/// The poll task; aborted as soon as the handle is dropped.
struct PollTimer {
    handle: JoinHandle<()>,
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Shared<F: DomainFetcher> {
    fetcher: F,
    control: Mutex<Control<F::Deps>>,
    state: watch::Sender<QueryState<F::Output>>,
}

impl<F: DomainFetcher> Shared<F> {
    fn begin(&self, trigger: Trigger) -> Option<Ticket<F::Deps>> {
        let mut control = self.control.lock();
        self.begin_locked(&mut control, trigger)
    }

    fn begin_locked(
        &self,
        control: &mut Control<F::Deps>,
        trigger: Trigger,
    ) -> Option<Ticket<F::Deps>> {
        if !control.active {
            return None;
        }
        control.generation += 1;
        let token = CancellationToken::new();
        if let Some(previous) = control.in_flight.replace(token.clone()) {
            previous.cancel();
        }
        if trigger == Trigger::Foreground {
            self.state.send_if_modified(|state| {
                let changed = !state.loading || state.error.is_some();
                state.loading = true;
                state.error = None;
                changed
            });
        }
        trace!(
            target: "opsdesk.query",
            generation = control.generation,
            ?trigger,
            "request issued"
        );
        Some(Ticket {
            generation: control.generation,
            token,
            deps: control.deps.clone(),
            trigger,
        })
    }

    async fn complete(&self, ticket: Ticket<F::Deps>) -> Option<F::Output> {
        let Ticket {
            generation,
            token,
            deps,
            trigger,
        } = ticket;
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(FetchError::Aborted),
            res = self.fetcher.fetch(&deps, &token) => res,
        };

        let mut control = self.control.lock();
        if control.generation != generation || token.is_cancelled() {
            debug!(
                target: "opsdesk.query",
                generation,
                current = control.generation,
                "discarding superseded response"
            );
            return None;
        }
        control.in_flight = None;
        match outcome {
            Ok(value) => {
                self.state.send_modify(|state| {
                    state.data = Some(value.clone());
                    state.error = None;
                    state.loading = false;
                    state.last_updated = Some(Utc::now());
                });
                Some(value)
            }
            Err(FetchError::Aborted) => {
                debug!(target: "opsdesk.query", generation, "fetch reported abort");
                None
            }
            Err(err) if trigger == Trigger::Background => {
                warn!(
                    target: "opsdesk.query",
                    generation,
                    error = %err,
                    "background refresh failed; keeping previous data"
                );
                // A poll may have superseded a foreground load.
                self.state
                    .send_if_modified(|state| std::mem::replace(&mut state.loading, false));
                None
            }
            Err(err) => {
                self.state.send_modify(|state| {
                    state.data = None;
                    state.error = Some(err.to_string());
                    state.loading = false;
                });
                None
            }
        }
    }
}

fn start_session<F: DomainFetcher>(shared: &Arc<Shared<F>>, control: &mut Control<F::Deps>) {
    if let Some(ticket) = shared.begin_locked(control, Trigger::Foreground) {
        let task_shared = Arc::clone(shared);
        tokio::spawn(async move {
            task_shared.complete(ticket).await;
        });
    }
    arm_timer(shared, control);
}

fn arm_timer<F: DomainFetcher>(shared: &Arc<Shared<F>>, control: &mut Control<F::Deps>) {
    control.timer = None;
    if !control.active {
        return;
    }
    if let Some(period) = control.interval {
        let handle = tokio::spawn(poll_loop(
            Arc::downgrade(shared),
            Arc::clone(&control.busy),
            period,
        ));
        control.timer = Some(PollTimer { handle });
    }
}

async fn poll_loop<F: DomainFetcher>(
    shared: Weak<Shared<F>>,
    busy: Arc<AtomicBool>,
    period: Duration,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(strong) = shared.upgrade() else {
            break;
        };
        if busy.swap(true, Ordering::AcqRel) {
            debug!(target: "opsdesk.query", "poll tick skipped; previous poll still running");
            continue;
        }
        let guard = BusyGuard(Arc::clone(&busy));
        let Some(ticket) = strong.begin(Trigger::Background) else {
            break;
        };
        tokio::spawn(async move {
            let _guard = guard;
            strong.complete(ticket).await;
        });
    }
}

/// Binding of one consumer to a domain fetcher, its dependencies and an
/// optional poll interval. Dropping the handle tears it down.
pub struct Subscription<F: DomainFetcher> {
    shared: Arc<Shared<F>>,
}

impl<F: DomainFetcher> Subscription<F> {
    /// Starts the first foreground load and, if configured, the poll timer.
    /// Must be called from within a tokio runtime.
    pub fn activate(fetcher: F, deps: F::Deps, options: QueryOptions) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        let shared = Arc::new(Shared {
            fetcher,
            control: Mutex::new(Control {
                deps,
                generation: 0,
                in_flight: None,
                busy: Arc::new(AtomicBool::new(false)),
                interval: non_zero(options.poll_interval),
                timer: None,
                active: true,
            }),
            state,
        });
        {
            let mut control = shared.control.lock();
            start_session(&shared, &mut control);
        }
        debug!(
            target: "opsdesk.query",
            poll_ms = options.poll_interval.map(|d| d.as_millis() as u64),
            "subscription activated"
        );
        Self { shared }
    }

    /// Issues a foreground request now. The fetch runs on its own task, so
    /// dropping the returned future does not stop it. The future resolves
    /// to `None` when the request was superseded, aborted or failed.
    pub fn refresh(&self) -> impl Future<Output = Option<F::Output>> + Send + 'static {
        let task = self.shared.begin(Trigger::Foreground).map(|ticket| {
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move { shared.complete(ticket).await })
        });
        async move {
            match task {
                Some(handle) => handle.await.ok().flatten(),
                None => None,
            }
        }
    }

    /// Replaces the dependency fingerprint. Equal fingerprints are a no-op;
    /// otherwise the running session is torn down and a new one started.
    pub fn set_dependencies(&self, deps: F::Deps) -> bool {
        let mut control = self.shared.control.lock();
        if !control.active || control.deps == deps {
            return false;
        }
        control.invalidate();
        control.deps = deps;
        control.busy = Arc::new(AtomicBool::new(false));
        start_session(&self.shared, &mut control);
        debug!(
            target: "opsdesk.query",
            generation = control.generation,
            "dependencies changed; session restarted"
        );
        true
    }

    /// Re-arms (or clears) the poll timer.
    pub fn set_poll_interval(&self, interval: Option<Duration>) {
        let interval = non_zero(interval);
        let mut control = self.shared.control.lock();
        if control.interval == interval {
            return;
        }
        control.interval = interval;
        arm_timer(&self.shared, &mut control);
    }

    /// Snapshot of the visible state. The internal borrow is released
    /// before returning.
    pub fn state(&self) -> QueryState<F::Output> {
        self.shared.state.borrow().clone()
    }

    /// Change stream of the visible state.
    ///
    /// Results are published while the subscription's internal lock is
    /// held, so a response can never land after a teardown. A `Ref` from
    /// `borrow()` or `borrow_and_update()` must not be held across a call
    /// to `refresh`, `set_dependencies`, `set_poll_interval`, `deactivate`
    /// or a drop of the subscription: a fetch completing at the same time
    /// waits on the borrow while holding that lock, and the call waits on
    /// the lock. Clone the state out of the borrow first.
    pub fn watch(&self) -> watch::Receiver<QueryState<F::Output>> {
        self.shared.state.subscribe()
    }

    pub fn dependencies(&self) -> F::Deps {
        self.shared.control.lock().deps.clone()
    }

    pub fn generation(&self) -> u64 {
        self.shared.control.lock().generation
    }

    pub fn is_polling(&self) -> bool {
        self.shared.control.lock().timer.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.shared.control.lock().active
    }

    /// Cancels the in-flight request, invalidates its generation and stops
    /// polling. Idempotent.
    pub fn deactivate(&self) {
        let mut control = self.shared.control.lock();
        if !control.active {
            return;
        }
        control.active = false;
        control.invalidate();
        debug!(
            target: "opsdesk.query",
            generation = control.generation,
            "subscription torn down"
        );
    }
}

impl<F: DomainFetcher> Drop for Subscription<F> {
    fn drop(&mut self) {
        self.deactivate();
    }
}
