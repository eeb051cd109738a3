//! Single-worker request dispatcher.
//!
//! Every catalog and scan request is queued onto one worker thread and run in
//! submission order. The queue is bounded: a full queue rejects new work
//! instead of blocking the submitter. Callers wait for query results with a
//! timeout; a timed-out caller cancels its request's token, so the worker
//! skips the request if it has not started yet and running scans stop at the
//! next record boundary.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};

/// Name given to the worker thread
const WORKER_THREAD_NAME: &str = "table-service-worker";

/// Lifecycle of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Submitted,
    Queued,
    Running,
    Completed,
    Failed,
    TimedOut,
    /// Refused by a full queue; surfaces to the caller as `Error::Rejected`
    Rejected,
    /// Skipped or stopped because its token was cancelled
    Cancelled,
}

impl RequestState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => RequestState::Submitted,
            1 => RequestState::Queued,
            2 => RequestState::Running,
            3 => RequestState::Completed,
            4 => RequestState::Failed,
            5 => RequestState::TimedOut,
            6 => RequestState::Rejected,
            _ => RequestState::Cancelled,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            RequestState::Submitted | RequestState::Queued | RequestState::Running
        )
    }
}

/// Shared, atomically updated state of one request
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Arc<Self> {
        Arc::new(Self(AtomicU8::new(RequestState::Submitted as u8)))
    }

    fn get(&self) -> RequestState {
        RequestState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: RequestState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move `from -> to` only if nobody got there first.
    fn advance(&self, from: RequestState, to: RequestState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Enter a terminal state unless one was already reached.
    fn finish(&self, to: RequestState) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if RequestState::from_u8(current).is_terminal() {
                return false;
            }
            match self
                .0
                .compare_exchange(current, to as u8, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Snapshot of dispatcher counters for logging/monitoring.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
    pub timed_out: u64,
    pub cancelled: u64,
}

/// Internal counters used to build `DispatcherStats`.
#[derive(Default, Debug)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    timed_out: AtomicU64,
    cancelled: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DispatcherStats {
        DispatcherStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A queued unit of work
struct Envelope {
    id: u64,
    token: CancellationToken,
    state: Arc<StateCell>,
    job: Job,
}

/// Caller-side handle to a submitted query.
#[must_use = "a query result is only observed through wait()"]
pub struct PendingQuery<T> {
    id: u64,
    rx: Receiver<Result<T>>,
    token: CancellationToken,
    state: Arc<StateCell>,
    counters: Arc<Counters>,
}

impl<T> PendingQuery<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> RequestState {
        self.state.get()
    }

    /// Ask the worker to skip or stop this request.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Block for the result for at most `timeout`.
    ///
    /// On timeout the request is cancelled and `Error::TimedOut` returned.
    pub fn wait(self, timeout: Duration) -> Result<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                self.token.cancel();
                if self.state.finish(RequestState::TimedOut) {
                    Counters::bump(&self.counters.timed_out);
                }
                debug!(request = self.id, ?timeout, "request timed out, cancelling");
                Err(Error::TimedOut(timeout))
            }
            // The worker dropped the reply without answering
            Err(RecvTimeoutError::Disconnected) => {
                if self.token.is_cancelled() {
                    Err(Error::Cancelled)
                } else {
                    Err(Error::ServiceStopped)
                }
            }
        }
    }
}

impl<T> std::fmt::Debug for PendingQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingQuery")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

/// Owns the bounded queue and its single worker thread.
///
/// Lifecycle: [`RequestDispatcher::start`] → submit requests →
/// [`RequestDispatcher::shutdown`] (also run on drop).
pub struct RequestDispatcher {
    tx: Mutex<Option<SyncSender<Envelope>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    capacity: usize,
    counters: Arc<Counters>,
    next_id: AtomicU64,
}

impl RequestDispatcher {
    /// Spawn the worker with a queue holding up to `capacity` pending requests.
    pub fn start(capacity: usize) -> Result<Self> {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::sync_channel::<Envelope>(capacity);
        let counters = Arc::new(Counters::default());

        let worker_counters = counters.clone();
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker_loop(rx, worker_counters))
            .map_err(Error::Worker)?;
        info!(capacity, "request dispatcher started");

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            worker_id: handle.thread().id(),
            worker: Mutex::new(Some(handle)),
            capacity,
            counters,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> DispatcherStats {
        self.counters.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.tx.lock().map(|tx| tx.is_some()).unwrap_or(false)
    }

    /// Queue a query; the result is collected through the returned handle.
    pub fn submit_query<T, F>(&self, op: F) -> Result<PendingQuery<T>>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> Result<T> + Send + 'static,
    {
        let token = CancellationToken::new();
        let state = StateCell::new();
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);

        let job_token = token.clone();
        let job_state = state.clone();
        let counters = self.counters.clone();
        let job: Job = Box::new(move || {
            let result = run_guarded(|| op(&job_token));
            record_outcome(&job_state, &counters, &result);
            // The caller may have given up already
            let _ = reply_tx.send(result);
        });

        let id = self.enqueue(job, token.clone(), state.clone())?;
        Ok(PendingQuery {
            id,
            rx: reply_rx,
            token,
            state,
            counters: self.counters.clone(),
        })
    }

    /// Submit a query and wait for its result.
    pub fn query<T, F>(&self, timeout: Duration, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> Result<T> + Send + 'static,
    {
        self.submit_query(op)?.wait(timeout)
    }

    /// Queue a command. Returns once the command is accepted; failures are
    /// only logged.
    pub fn submit_command<F>(&self, op: F) -> Result<u64>
    where
        F: FnOnce(&CancellationToken) -> Result<()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let state = StateCell::new();

        let job_token = token.clone();
        let job_state = state.clone();
        let counters = self.counters.clone();
        let job: Job = Box::new(move || {
            let result = run_guarded(|| op(&job_token));
            record_outcome(&job_state, &counters, &result);
            if let Err(e) = result {
                warn!(error = %e, "command failed");
            }
        });

        self.enqueue(job, token, state)
    }

    fn enqueue(&self, job: Job, token: CancellationToken, state: Arc<StateCell>) -> Result<u64> {
        let tx = self
            .tx
            .lock()
            .map_err(|_| Error::ServiceStopped)?
            .clone()
            .ok_or(Error::ServiceStopped)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = Envelope {
            id,
            token,
            state: state.clone(),
            job,
        };

        // The worker may dequeue before try_send returns
        state.advance(RequestState::Submitted, RequestState::Queued);
        match tx.try_send(envelope) {
            Ok(()) => {
                Counters::bump(&self.counters.submitted);
                debug!(request = id, "request queued");
                Ok(id)
            }
            Err(TrySendError::Full(_)) => {
                state.set(RequestState::Rejected);
                Counters::bump(&self.counters.rejected);
                debug!(request = id, capacity = self.capacity, "queue full, rejecting request");
                Err(Error::Rejected {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Disconnected(_)) => {
                state.set(RequestState::Rejected);
                Err(Error::ServiceStopped)
            }
        }
    }

    /// Stop accepting requests, drain the queue and join the worker.
    pub fn shutdown(&self) {
        let sender = match self.tx.lock() {
            Ok(mut tx) => tx.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if sender.is_none() {
            return;
        }
        drop(sender);

        let handle = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        // A request shutting the dispatcher down cannot join its own thread
        if thread::current().id() == self.worker_id {
            return;
        }
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("dispatcher worker exited with a panic");
            }
        }
        let stats = self.stats();
        info!(?stats, "request dispatcher stopped");
    }
}

impl Drop for RequestDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("capacity", &self.capacity)
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Worker: run envelopes in arrival order until every sender is gone.
fn worker_loop(rx: Receiver<Envelope>, counters: Arc<Counters>) {
    while let Ok(envelope) = rx.recv() {
        if envelope.token.is_cancelled() {
            // Cancelled while queued; dropping the job drops its reply sender
            // A request that timed out while queued is already counted
            if envelope.state.finish(RequestState::Cancelled) {
                Counters::bump(&counters.cancelled);
            }
            debug!(request = envelope.id, "skipping cancelled request");
            continue;
        }
        envelope
            .state
            .advance(RequestState::Queued, RequestState::Running);
        debug!(request = envelope.id, "running request");
        (envelope.job)();
    }
    debug!("dispatcher queue closed, worker exiting");
}

fn run_guarded<T>(op: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(op))
        .unwrap_or_else(|_| Err(Error::InvalidState("request handler panicked")))
}

fn record_outcome<T>(state: &StateCell, counters: &Counters, result: &Result<T>) {
    let (next, counter) = match result {
        Ok(_) => (RequestState::Completed, &counters.completed),
        Err(Error::Cancelled) => (RequestState::Cancelled, &counters.cancelled),
        Err(_) => (RequestState::Failed, &counters.failed),
    };
    // A timed-out request keeps its TimedOut state; only count it once.
    if state.finish(next) {
        Counters::bump(counter);
    }
}
