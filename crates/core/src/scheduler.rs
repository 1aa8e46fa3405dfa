use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("no tokio runtime is available to run scheduled tasks")]
    NoRuntime,
}

/// Runs delayed callbacks on a tokio runtime.
#[derive(Clone, Debug)]
pub struct Scheduler {
    handle: Handle,
}

impl Scheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn current() -> Result<Self, SchedulerError> {
        Handle::try_current().map(Self::new).map_err(|_| SchedulerError::NoRuntime)
    }

    pub fn schedule<F>(&self, name: &'static str, delay: Duration, task: F) -> ScheduledTask
    where
        F: FnOnce() + Send + 'static,
    {
        let fired = Arc::new(AtomicBool::new(false));
        let fired_flag = Arc::clone(&fired);
        let handle = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            fired_flag.store(true, Ordering::SeqCst);
            debug!(event_name = "scheduler.task_fired", task = name, "scheduled task fired");
            task();
        });

        ScheduledTask { name, handle: Some(handle), fired }
    }
}

/// Handle to a pending delayed callback. Dropping the handle cancels the callback.
#[derive(Debug)]
pub struct ScheduledTask {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
    fired: Arc<AtomicBool>,
}

impl ScheduledTask {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    pub fn is_pending(&self) -> bool {
        self.handle.is_some() && !self.has_fired()
    }

    /// Returns `true` when a callback that had not yet fired was cancelled.
    pub fn cancel(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        let pending = !self.has_fired();
        handle.abort();
        if pending {
            debug!(event_name = "scheduler.task_cancelled", task = self.name, "scheduled task cancelled");
        }
        pending
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
