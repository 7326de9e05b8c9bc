use crate::{
    slot::{Outcome, Slot},
    TaskError, TaskHandle, TaskState,
};
use log::{debug, error, warn};
use parking_lot::Mutex;
use std::{
    mem,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// What happens to a worker that lost the race against its timeout.
///
/// The worker is never interrupted: it always runs to completion and its result is discarded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrphanPolicy {
    /// Forget the worker thread.
    #[default]
    Detach,
    /// Keep the worker thread so it can be joined with [`Scheduler::join_orphans`].
    Track,
}

/// Settings of threads spawned by a [`Scheduler`].
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub thread_name: Option<String>,
    pub stack_size: Option<usize>,
    pub orphan_policy: OrphanPolicy,
}

impl Config {
    /// Threads are named `<prefix>-worker`, `<prefix>-timer` and `<prefix>-delayed`.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = Some(prefix.into());
        self
    }
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }
    pub fn orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.orphan_policy = policy;
        self
    }
}

/// Runs callables on dedicated threads.
///
/// Every submitted task gets its own thread (and its own timer thread for
/// [`execute_with_timeout`](Self::execute_with_timeout)). There is no queue and no pool.
///
/// Cloned schedulers share tracked orphans.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    config: Arc<Config>,
    orphans: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Scheduler {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            orphans: Arc::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `f` on a new thread right away.
    pub fn execute<F, R>(&self, f: F) -> Result<TaskHandle<R>, TaskError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let slot = Arc::new(Slot::new(TaskState::Running));
        self.spawn("worker", {
            let slot = slot.clone();
            move || run(&slot, f)
        })?;
        Ok(TaskHandle::new(slot))
    }

    /// Run `f` on a new thread after `delay` measured from this call.
    ///
    /// The task stays [`Pending`](TaskState::Pending) until the delay elapses.
    pub fn execute_with_delay<F, R>(
        &self,
        delay: Duration,
        f: F,
    ) -> Result<TaskHandle<R>, TaskError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let deadline = Instant::now().checked_add(delay);
        let slot = Arc::new(Slot::new(TaskState::Pending));
        self.spawn("delayed", {
            let slot = slot.clone();
            move || {
                sleep_until(deadline, delay);
                if slot.start() {
                    run(&slot, f);
                }
            }
        })?;
        Ok(TaskHandle::new(slot))
    }

    /// Run `f` on a new thread racing it against a timer.
    ///
    /// The handle resolves to [`TaskError::TimedOut`] if `timeout` elapses first.
    ///
    /// *The worker is not cancelled on timeout.* It keeps running in the background until `f` returns,
    /// then its result is dropped. What happens with the thread is decided by [`OrphanPolicy`].
    /// If `f` never returns, the thread is leaked.
    pub fn execute_with_timeout<F, R>(
        &self,
        timeout: Duration,
        f: F,
    ) -> Result<TaskHandle<R>, TaskError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let deadline = Instant::now().checked_add(timeout);
        let slot = Arc::new(Slot::new(TaskState::Running));
        let worker = self.spawn("worker", {
            let slot = slot.clone();
            move || run(&slot, f)
        })?;

        let timer = {
            let slot = slot.clone();
            let orphans = self.orphans.clone();
            let policy = self.config.orphan_policy;
            move || {
                if slot.wait_until(deadline) {
                    return;
                }
                if slot.resolve(Err(TaskError::TimedOut(timeout))).is_ok() {
                    debug!("task timed out after {timeout:?}, worker keeps running");
                    if policy == OrphanPolicy::Track {
                        let mut orphans = orphans.lock();
                        orphans.retain(|orphan| !orphan.is_finished());
                        orphans.push(worker);
                    }
                }
            }
        };
        if let Err(err) = self.spawn("timer", timer) {
            warn!("worker of a task without timer is left running");
            return Err(err);
        }
        Ok(TaskHandle::new(slot))
    }

    /// Number of tracked workers that lost against their timeout and are still running.
    pub fn orphan_count(&self) -> usize {
        let mut orphans = self.orphans.lock();
        orphans.retain(|orphan| !orphan.is_finished());
        orphans.len()
    }

    /// Block until all tracked orphan workers finish. Returns how many were joined.
    ///
    /// Does nothing with [`OrphanPolicy::Detach`].
    pub fn join_orphans(&self) -> usize {
        let orphans = mem::take(&mut *self.orphans.lock());
        let count = orphans.len();
        for orphan in orphans {
            if orphan.join().is_err() {
                warn!("orphan worker thread panicked");
            }
        }
        count
    }

    fn spawn<F>(&self, role: &str, body: F) -> Result<JoinHandle<()>, TaskError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut builder = thread::Builder::new();
        if let Some(prefix) = &self.config.thread_name {
            builder = builder.name(format!("{prefix}-{role}"));
        }
        if let Some(size) = self.config.stack_size {
            builder = builder.stack_size(size);
        }
        builder.spawn(body).map_err(|err| {
            error!("failed to spawn {role} thread: {err}");
            TaskError::SpawnFailed(err)
        })
    }
}

/// Sleep until `deadline`, or for `fallback` if the deadline is not representable.
pub(crate) fn sleep_until(deadline: Option<Instant>, fallback: Duration) {
    match deadline {
        Some(deadline) => thread::sleep(deadline.saturating_duration_since(Instant::now())),
        None => thread::sleep(fallback),
    }
}

fn run<F, R>(slot: &Slot<R>, f: F)
where
    F: FnOnce() -> R,
{
    let outcome: Outcome<R> =
        panic::catch_unwind(AssertUnwindSafe(f)).map_err(TaskError::from_panic);
    let failure = outcome.as_ref().err().map(ToString::to_string);
    match slot.resolve(outcome) {
        Ok(()) => {
            if let Some(failure) = failure {
                if slot.is_abandoned() {
                    warn!("unobserved failure of a task with dropped handle: {failure}");
                }
            }
        }
        Err(Ok(_)) => debug!("discarding result of a task that already timed out"),
        Err(Err(err)) => debug!("discarding failure of a task that already timed out: {err}"),
    }
}
