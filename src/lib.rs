//! Lock-guarded atomic values and fire-and-forget tasks.
//!
//! [`AtomicGuard`] serializes atomic-style operations on a value of any type through its own lock.
//!
//! ```
//! use async_guard::AtomicGuard;
//!
//! let counter = AtomicGuard::new(0i32);
//! counter.increment(5);
//! counter.decrement(1);
//! assert_eq!(counter.exchange(10), 4);
//! assert_eq!(counter.load(), 10);
//! ```
//!
//! [`execute`], [`execute_with_delay`] and [`execute_with_timeout`] run a callable on its own thread
//! and return a [`TaskHandle`] to its outcome.
//!
//! ```
//! use async_guard::{execute, execute_with_timeout, TaskError};
//! use std::{thread, time::Duration};
//!
//! let x = 21;
//! assert_eq!(execute(move || x * 2).unwrap().get().unwrap(), 42);
//!
//! let slow = execute_with_timeout(Duration::from_millis(10), || {
//!     thread::sleep(Duration::from_millis(200));
//! })
//! .unwrap();
//! assert!(matches!(slow.get(), Err(TaskError::TimedOut(_))));
//! ```


mod error;
mod guard;
mod handle;
mod scheduler;
mod slot;

pub use error::TaskError;
pub use guard::{AtomicGuard, Wait, WaitAndUpdate};
pub use handle::{TaskHandle, TaskState};
pub use scheduler::{Config, OrphanPolicy, Scheduler};

use std::time::Duration;

/// Run `f` on a new thread with default [`Scheduler`].
///
/// See [`Scheduler::execute`].
pub fn execute<F, R>(f: F) -> Result<TaskHandle<R>, TaskError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    Scheduler::default().execute(f)
}

/// Run `f` on a new thread after `delay` with default [`Scheduler`].
///
/// See [`Scheduler::execute_with_delay`].
pub fn execute_with_delay<F, R>(delay: Duration, f: F) -> Result<TaskHandle<R>, TaskError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    Scheduler::default().execute_with_delay(delay, f)
}

/// Run `f` on a new thread limited by `timeout` with default [`Scheduler`].
///
/// Timed out workers are detached and keep running. See [`Scheduler::execute_with_timeout`].
pub fn execute_with_timeout<F, R>(timeout: Duration, f: F) -> Result<TaskHandle<R>, TaskError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    Scheduler::default().execute_with_timeout(timeout, f)
}
