//! Admission scheduler: bounded concurrency with a FIFO wait queue.
//!
//! All bookkeeping (the active set, the wait queue and the ready list) sits
//! behind one `parking_lot::Mutex`, so admit, release and cancel are
//! linearizable. Operation factories, operation polls and drops of user values
//! never run while that lock is held. An attached [`AuditSink`] does: it is
//! called under the lock so events arrive in transition order, and it must not
//! call back into the scheduler.
//!
//! Admission is split in two steps. Under the lock a waiter is moved into the
//! active set and its launch closure is pushed onto the ready list. Outside
//! the lock a single pumping caller drains the ready list, invoking factories
//! and spawning drivers. A release that happens while another caller is
//! pumping only appends to the ready list, so a chain of operations that
//! finish synchronously is drained by a loop instead of nested calls.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;

use futures::stream;
use futures::{FutureExt, Stream, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::core::audit::{build_audit_event, AuditAction, AuditSink};
use crate::core::handle::{Handle, HandleId, HandleState};
use crate::core::operation::Operation;
use crate::core::SchedulerError;
use crate::infra::queue::WaitQueue;
use crate::runtime::TokioSpawner;

/// Abstraction for spawning operation drivers on a runtime.
pub trait Spawn {
    /// Spawn a future that runs to completion in the background.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Point-in-time view of a scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Configured concurrency limit.
    pub concurrency: usize,
    /// Operations currently occupying a slot.
    pub active: usize,
    /// Submissions waiting for a slot.
    pub queued: usize,
    /// Total submissions accepted.
    pub submitted: u64,
    /// Operations that completed normally.
    pub completed: u64,
    /// Operations that failed.
    pub failed: u64,
    /// Submissions cancelled, queued or running.
    pub cancelled: u64,
}

type Launch = Box<dyn FnOnce(Admission) + Send>;

/// Items taken inline at launch before the rest is handed to a driver.
const INLINE_POLL_BUDGET: usize = 64;

/// What a launch closure receives once its submission holds a slot.
struct Admission {
    slot: SlotGuard,
    cancel: oneshot::Receiver<()>,
}

struct Waiting {
    state: watch::Sender<HandleState>,
    launch: Launch,
}

struct Active {
    state: watch::Sender<HandleState>,
    cancel: Option<oneshot::Sender<()>>,
}

/// Admitted but not yet launched.
struct Ready {
    id: HandleId,
    launch: Launch,
    cancel: oneshot::Receiver<()>,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: u64,
    completed: u64,
    failed: u64,
    cancelled: u64,
}

struct Inner {
    next_id: HandleId,
    active: HashMap<HandleId, Active>,
    waiting: WaitQueue<Waiting>,
    ready: VecDeque<Ready>,
    pumping: bool,
    counters: Counters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Failed,
    Cancelled,
}

impl Outcome {
    const fn state(self) -> HandleState {
        match self {
            Self::Completed => HandleState::Completed,
            Self::Failed => HandleState::Failed,
            Self::Cancelled => HandleState::Cancelled,
        }
    }
}

/// State shared between the scheduler, its handles and running drivers.
pub(crate) struct Shared {
    name: String,
    concurrency: usize,
    inner: Mutex<Inner>,
    audit: Mutex<Option<Box<dyn AuditSink>>>,
}

impl Shared {
    fn new(name: String, concurrency: usize) -> Self {
        Self {
            name,
            concurrency,
            inner: Mutex::new(Inner {
                next_id: 0,
                active: HashMap::with_capacity(concurrency.min(1024)),
                waiting: WaitQueue::new(),
                ready: VecDeque::new(),
                pumping: false,
                counters: Counters::default(),
            }),
            audit: Mutex::new(None),
        }
    }

    /// Register a submission at the back of the queue and admit whatever fits.
    ///
    /// Every submission goes through the queue, so a newcomer never overtakes
    /// an earlier waiter.
    fn enqueue(&self, launch: Launch) -> (HandleId, watch::Receiver<HandleState>) {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        let (state, state_rx) = watch::channel(HandleState::Queued);
        inner.waiting.push_back(id, Waiting { state, launch });
        inner.counters.submitted += 1;
        self.record(&inner, id, AuditAction::Enqueue);
        debug!(
            scheduler = %self.name,
            handle = id,
            queued = inner.waiting.len(),
            "submission enqueued"
        );

        self.admit_ready(&mut inner);
        (id, state_rx)
    }

    /// Move waiters into free slots, oldest first.
    fn admit_ready(&self, inner: &mut Inner) {
        while inner.active.len() < self.concurrency {
            let Some((id, waiting)) = inner.waiting.pop_front() else {
                break;
            };
            let Waiting { state, launch } = waiting;
            let (cancel_tx, cancel_rx) = oneshot::channel();

            state.send_replace(HandleState::Running);
            inner.active.insert(
                id,
                Active {
                    state,
                    cancel: Some(cancel_tx),
                },
            );
            inner.ready.push_back(Ready {
                id,
                launch,
                cancel: cancel_rx,
            });
            self.record(inner, id, AuditAction::Admit);
            debug!(
                scheduler = %self.name,
                handle = id,
                active = inner.active.len(),
                queued = inner.waiting.len(),
                "submission admitted"
            );
        }
    }

    /// Launch everything on the ready list.
    ///
    /// Only one caller pumps at a time; others return immediately and leave
    /// their admissions to the active pump.
    fn pump(self: &Arc<Self>) {
        {
            let mut inner = self.inner.lock();
            if inner.pumping {
                return;
            }
            inner.pumping = true;
        }
        let _reset = PumpReset(self.as_ref());

        loop {
            let next = {
                let mut inner = self.inner.lock();
                let next = inner.ready.pop_front();
                if next.is_none() {
                    inner.pumping = false;
                }
                next
            };
            let Some(ready) = next else {
                break;
            };
            let id = ready.id;
            let slot = SlotGuard {
                id,
                shared: Arc::clone(self),
                released: false,
            };
            let launch = ready.launch;
            let admission = Admission {
                slot,
                cancel: ready.cancel,
            };
            // A panicking factory drops its slot guard, which admits the next
            // waiter onto the ready list; keep draining so it still launches.
            if panic::catch_unwind(AssertUnwindSafe(move || launch(admission))).is_err() {
                error!(scheduler = %self.name, handle = id, "operation panicked while starting");
            }
        }
    }

    /// Release the slot held by `id` and admit the next waiters.
    fn finish(self: &Arc<Self>, id: HandleId, outcome: Outcome) {
        {
            let mut inner = self.inner.lock();
            let Some(active) = inner.active.remove(&id) else {
                warn!(scheduler = %self.name, handle = id, "release for unknown slot ignored");
                return;
            };

            let terminal = outcome.state();
            let settled = active.state.send_if_modified(|state| {
                if *state == HandleState::Running {
                    *state = terminal;
                    true
                } else {
                    false
                }
            });
            if settled {
                let action = match outcome {
                    Outcome::Completed => {
                        inner.counters.completed += 1;
                        AuditAction::Complete
                    }
                    Outcome::Failed => {
                        inner.counters.failed += 1;
                        AuditAction::Fail
                    }
                    Outcome::Cancelled => {
                        inner.counters.cancelled += 1;
                        AuditAction::Cancel
                    }
                };
                self.record(&inner, id, action);
            }
            let final_state = *active.state.borrow();
            debug!(
                scheduler = %self.name,
                handle = id,
                state = ?final_state,
                active = inner.active.len(),
                queued = inner.waiting.len(),
                "slot released"
            );

            self.admit_ready(&mut inner);
        }
        self.pump();
    }

    /// Cancel a submission in whatever state it is in.
    pub(crate) fn cancel(&self, id: HandleId) {
        let mut inner = self.inner.lock();

        if let Some(waiting) = inner.waiting.remove(id) {
            waiting.state.send_replace(HandleState::Cancelled);
            inner.counters.cancelled += 1;
            self.record(&inner, id, AuditAction::Cancel);
            debug!(scheduler = %self.name, handle = id, "queued submission cancelled");
            drop(inner);
            // The factory is dropped unstarted, outside the lock.
            drop(waiting);
            return;
        }

        let Some(active) = inner.active.get_mut(&id) else {
            return;
        };
        let cancelled = active.state.send_if_modified(|state| {
            if *state == HandleState::Running {
                *state = HandleState::Cancelled;
                true
            } else {
                false
            }
        });
        if !cancelled {
            return;
        }
        if let Some(signal) = active.cancel.take() {
            let _ = signal.send(());
        }
        inner.counters.cancelled += 1;
        self.record(&inner, id, AuditAction::Cancel);
        debug!(scheduler = %self.name, handle = id, "running operation cancelled");
    }

    fn record(&self, inner: &Inner, id: HandleId, action: AuditAction) {
        if let Some(sink) = self.audit.lock().as_mut() {
            sink.record(build_audit_event(
                id,
                self.name.as_str(),
                action,
                inner.active.len(),
                inner.waiting.len(),
            ));
        }
    }

    fn stats(&self) -> SchedulerStats {
        let inner = self.inner.lock();
        SchedulerStats {
            concurrency: self.concurrency,
            active: inner.active.len(),
            queued: inner.waiting.len(),
            submitted: inner.counters.submitted,
            completed: inner.counters.completed,
            failed: inner.counters.failed,
            cancelled: inner.counters.cancelled,
        }
    }
}

/// Clears the pumping flag if the drain itself unwinds.
struct PumpReset<'a>(&'a Shared);

impl Drop for PumpReset<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.inner.lock().pumping = false;
        }
    }
}

/// Ownership of one occupied slot.
///
/// Released exactly once: explicitly by the driver, or on drop if the driver
/// never got to finish (factory panic, runtime shut down).
struct SlotGuard {
    id: HandleId,
    shared: Arc<Shared>,
    released: bool,
}

impl SlotGuard {
    fn release(mut self, outcome: Outcome) {
        self.released = true;
        self.shared.finish(self.id, outcome);
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                scheduler = %self.shared.name,
                handle = self.id,
                "operation dropped before settling"
            );
            self.shared.finish(self.id, Outcome::Cancelled);
        }
    }
}

/// Start an admitted operation.
///
/// Whatever the stream has ready right away is forwarded inline, so an
/// operation that is already finished when created releases its slot before
/// the submitting call returns. Anything still pending goes to a driver.
fn start_admitted<S, F, St, T, E>(
    spawner: &S,
    factory: F,
    admission: Admission,
    values: mpsc::UnboundedSender<Result<T, E>>,
) where
    S: Spawn,
    F: FnOnce() -> St,
    St: Stream<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let Admission { slot, mut cancel } = admission;
    if cancel.try_recv().is_ok() {
        slot.release(Outcome::Cancelled);
        return;
    }

    let mut operation = Box::pin(factory());
    for _ in 0..INLINE_POLL_BUDGET {
        let outcome = match operation.next().now_or_never() {
            None => break,
            Some(Some(Ok(value))) => {
                let _ = values.send(Ok(value));
                continue;
            }
            Some(Some(Err(error))) => {
                let _ = values.send(Err(error));
                Outcome::Failed
            }
            Some(None) => Outcome::Completed,
        };
        drop(operation);
        drop(values);
        slot.release(outcome);
        return;
    }
    spawner.spawn(drive(operation, cancel, values, slot));
}

/// Run one admitted operation, forwarding its values to the handle.
///
/// The operation is dropped before the slot is released, so a cancelled
/// operation has wound down by the time the next waiter starts.
async fn drive<St, T, E>(
    mut operation: Pin<Box<St>>,
    mut cancel: oneshot::Receiver<()>,
    values: mpsc::UnboundedSender<Result<T, E>>,
    slot: SlotGuard,
) where
    St: Stream<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let outcome = loop {
        tokio::select! {
            biased;
            _ = &mut cancel => break Outcome::Cancelled,
            item = operation.next() => match item {
                Some(Ok(value)) => {
                    let _ = values.send(Ok(value));
                }
                Some(Err(error)) => {
                    let _ = values.send(Err(error));
                    break Outcome::Failed;
                }
                None => break Outcome::Completed,
            },
        }
    };
    drop(operation);
    drop(values);
    slot.release(outcome);
}

/// Bounded-concurrency admission scheduler.
///
/// At most `concurrency` submitted operations run at once; the rest wait in
/// strict submission order. Cloning is cheap and clones share the same slots
/// and queue.
///
/// ```rust,ignore
/// use prometheus_admission::core::Scheduler;
/// use futures::StreamExt;
///
/// let scheduler = Scheduler::new(2)?;
/// let mut upload = scheduler.submit_future(|| async { Ok::<_, std::io::Error>(42) });
/// assert_eq!(upload.next().await.transpose()?, Some(42));
/// ```
#[derive(Clone)]
pub struct Scheduler<S = TokioSpawner> {
    shared: Arc<Shared>,
    spawner: S,
}

impl Scheduler<TokioSpawner> {
    /// Create a scheduler that drives operations on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InvalidConcurrency` if `concurrency` is zero
    /// - `SchedulerError::RuntimeUnavailable` outside a tokio runtime
    pub fn new(concurrency: usize) -> Result<Self, SchedulerError> {
        Self::with_spawner(concurrency, TokioSpawner::current()?)
    }
}

impl<S> Scheduler<S>
where
    S: Spawn + Clone + Send + 'static,
{
    /// Create a scheduler with a custom spawner.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConcurrency` if `concurrency` is zero.
    pub fn with_spawner(concurrency: usize, spawner: S) -> Result<Self, SchedulerError> {
        Self::named("default", concurrency, spawner)
    }

    /// Create a named scheduler; the name shows up in logs and audit events.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConcurrency` if `concurrency` is zero.
    pub fn named(
        name: impl Into<String>,
        concurrency: usize,
        spawner: S,
    ) -> Result<Self, SchedulerError> {
        if concurrency == 0 {
            return Err(SchedulerError::InvalidConcurrency(concurrency));
        }
        let name = name.into();
        info!(scheduler = %name, concurrency, "admission scheduler initialized");
        Ok(Self {
            shared: Arc::new(Shared::new(name, concurrency)),
            spawner,
        })
    }

    /// Create a named scheduler from configuration.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Config` if the configuration is invalid.
    pub fn from_config(
        name: impl Into<String>,
        cfg: &SchedulerConfig,
        spawner: S,
    ) -> Result<Self, SchedulerError> {
        cfg.validate().map_err(SchedulerError::Config)?;
        Self::named(name, cfg.concurrency, spawner)
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(self, audit: Box<dyn AuditSink>) -> Self {
        *self.shared.audit.lock() = Some(audit);
        self
    }

    /// Scheduler name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.shared.concurrency
    }

    /// Current counters and occupancy.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.shared.stats()
    }

    /// Ids of waiting submissions, next to be admitted first.
    #[must_use]
    pub fn queued(&self) -> Vec<HandleId> {
        self.shared.inner.lock().waiting.ids().collect()
    }

    /// Submit an operation.
    ///
    /// Never blocks. If a slot is free and nobody is waiting the operation is
    /// started before this returns; otherwise it waits its turn. An operation
    /// that is already finished when started settles, and frees its slot for
    /// the next waiter, before this returns.
    pub fn submit<O>(&self, operation: O) -> Handle<O::Item, O::Error>
    where
        O: Operation,
    {
        self.submit_stream(move || operation.start())
    }

    /// Submit a single-value operation given as a future factory.
    pub fn submit_future<F, Fut, T, E>(&self, factory: F) -> Handle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.submit_stream(move || stream::once(factory()))
    }

    /// Wrap an operation-producing function so every call goes through this
    /// scheduler.
    ///
    /// ```rust,ignore
    /// let upload = scheduler.throttle(|file: PathBuf| move || upload_stream(file));
    /// let first = upload(a);
    /// let second = upload(b);
    /// ```
    pub fn throttle<A, F, O>(&self, func: F) -> impl Fn(A) -> Handle<O::Item, O::Error>
    where
        F: Fn(A) -> O,
        O: Operation,
    {
        let scheduler = self.clone();
        move |args| scheduler.submit(func(args))
    }

    fn submit_stream<F, St, T, E>(&self, factory: F) -> Handle<T, E>
    where
        F: FnOnce() -> St + Send + 'static,
        St: Stream<Item = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (values_tx, values_rx) = mpsc::unbounded_channel();
        let spawner = self.spawner.clone();
        let launch: Launch = Box::new(move |admission: Admission| {
            start_admitted(&spawner, factory, admission, values_tx);
        });

        let (id, state) = self.shared.enqueue(launch);
        self.shared.pump();
        Handle::new(id, Arc::clone(&self.shared), state, values_rx)
    }
}
