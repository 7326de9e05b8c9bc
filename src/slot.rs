use crate::{TaskError, TaskState};
use atomic::Atomic;
use core::sync::atomic::{AtomicBool, Ordering};
use futures::task::AtomicWaker;
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

pub(crate) type Outcome<T> = Result<T, TaskError>;

/// One-shot outcome shared between the writers of a task and its handle.
///
/// Only the first call to [`resolve`](Self::resolve) is accepted. Later writes are handed back to the caller.
pub(crate) struct Slot<T> {
    state: Atomic<TaskState>,
    outcome: Mutex<Option<Outcome<T>>>,
    resolved: Condvar,
    pub(crate) waker: AtomicWaker,
    abandoned: AtomicBool,
}

impl<T> Slot<T> {
    pub fn new(state: TaskState) -> Self {
        Self {
            state: Atomic::new(state),
            outcome: Mutex::new(None),
            resolved: Condvar::new(),
            waker: AtomicWaker::new(),
            abandoned: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> TaskState {
        self.state.load(Ordering::Acquire)
    }
    pub fn is_resolved(&self) -> bool {
        self.state().is_terminal()
    }

    /// `Pending -> Running`. Fails if the task is not pending.
    pub fn start(&self) -> bool {
        self.state
            .compare_exchange(
                TaskState::Pending,
                TaskState::Running,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Write the outcome if nothing was written yet.
    ///
    /// Returns the rejected outcome back if the slot is already resolved.
    pub fn resolve(&self, outcome: Outcome<T>) -> Result<(), Outcome<T>> {
        let mut slot = self.outcome.lock();
        if self.is_resolved() {
            return Err(outcome);
        }
        let state = match &outcome {
            Ok(_) => TaskState::Completed,
            Err(TaskError::TimedOut(_)) => TaskState::TimedOut,
            Err(_) => TaskState::Failed,
        };
        *slot = Some(outcome);
        self.state.store(state, Ordering::Release);
        drop(slot);

        self.resolved.notify_all();
        self.waker.wake();
        Ok(())
    }

    /// Block until resolved.
    pub fn wait(&self) {
        let mut slot = self.outcome.lock();
        while !self.is_resolved() {
            self.resolved.wait(&mut slot);
        }
    }
    /// Block until resolved or `timeout` elapsed. Returns whether the slot is resolved.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.wait_until(Instant::now().checked_add(timeout))
    }
    /// Block until resolved or `deadline` passed. `None` is a deadline that never comes.
    pub fn wait_until(&self, deadline: Option<Instant>) -> bool {
        let Some(deadline) = deadline else {
            self.wait();
            return true;
        };
        let mut slot = self.outcome.lock();
        while !self.is_resolved() {
            if self.resolved.wait_until(&mut slot, deadline).timed_out() {
                return self.is_resolved();
            }
        }
        true
    }

    /// Take the outcome out. `None` if unresolved or already taken.
    pub fn take(&self) -> Option<Outcome<T>> {
        self.outcome.lock().take()
    }

    pub fn abandon(&self) {
        self.abandoned.store(true, Ordering::Release);
    }
    /// Whether the handle was dropped.
    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::Acquire)
    }
}
