use std::{any::Any, io, time::Duration};
use thiserror::Error;

/// Failure delivered through a [`TaskHandle`](crate::TaskHandle) or returned at submission.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The callable panicked. Carries the panic message.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The timer fired before the callable finished.
    ///
    /// The result is unknown and the worker may still be running.
    #[error("task timed out after {0:?}")]
    TimedOut(Duration),
    /// A thread could not be spawned for the task.
    #[error("failed to spawn task thread")]
    SpawnFailed(#[source] io::Error),
}

impl TaskError {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<&'static str>() {
            Ok(s) => (*s).to_owned(),
            Err(payload) => match payload.downcast::<String>() {
                Ok(s) => *s,
                Err(_) => "Box<dyn Any>".to_owned(),
            },
        };
        TaskError::Panicked(message)
    }

    /// Whether the timer fired before the task finished.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TaskError::TimedOut(_))
    }
}
