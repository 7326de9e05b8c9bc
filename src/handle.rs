use crate::{slot::Slot, TaskError};
use core::{
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use std::{sync::Arc, time::Duration};

/// Lifecycle of a submitted task.
///
/// `Pending` is only observed for delayed tasks.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl TaskState {
    /// Whether the task outcome is already decided.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::TimedOut
        )
    }
}

/// Handle to the outcome of a task submitted to a [`Scheduler`](crate::Scheduler).
///
/// The outcome can be retrieved by blocking with [`get`](Self::get) or by `.await`ing the handle.
///
/// Dropping the handle does not stop the task. Failures of tasks with dropped handles are only logged.
pub struct TaskHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(slot: Arc<Slot<T>>) -> Self {
        Self { slot }
    }

    /// Check whether the outcome is available without blocking.
    pub fn is_ready(&self) -> bool {
        self.slot.is_resolved()
    }
    pub fn state(&self) -> TaskState {
        self.slot.state()
    }

    /// Block until the outcome is available.
    pub fn wait(&self) {
        self.slot.wait();
    }
    /// Block until the outcome is available or `timeout` elapsed.
    ///
    /// Returns `true` if the outcome is available.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.slot.wait_for(timeout)
    }

    /// Block until the outcome is available and return it.
    ///
    /// # Panics
    ///
    /// Panics if the outcome was already taken by polling the handle as a future.
    pub fn get(self) -> Result<T, TaskError> {
        self.slot.wait();
        match self.slot.take() {
            Some(outcome) => outcome,
            None => panic!("task outcome was already taken by polling the handle"),
        }
    }
}

impl<T> Drop for TaskHandle<T> {
    fn drop(&mut self) {
        self.slot.abandon();
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.slot.waker.register(cx.waker());
        if !self.slot.is_resolved() {
            return Poll::Pending;
        }
        match self.slot.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => panic!("`TaskHandle` polled after completion"),
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("state", &self.state())
            .finish()
    }
}
