//! Units of deferred work handed between cores.
use alloc::boxed::Box;
use core::fmt;

/// The work half of a [`Task`]. Runs exactly once on the core that drains it.
pub type WorkFn = Box<dyn FnOnce() + Send + 'static>;

/// A completion callback. Staged on the core that executed the task, then run by the bootstrap
/// processor once it observes that core's notification bit.
pub type DoneFn = Box<dyn FnOnce() + Send + 'static>;

/// A unit of deferred work: a work function and an optional completion callback.
pub struct Task {
    work: WorkFn,
    done: Option<DoneFn>,
}

impl Task {
    /// Creates a task without a completion callback.
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            work: Box::new(work),
            done: None,
        }
    }

    /// Attaches a completion callback to this task.
    pub fn with_done<F>(mut self, done: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.done = Some(Box::new(done));
        self
    }

    /// Returns true if the task carries a completion callback.
    pub fn has_done(&self) -> bool {
        self.done.is_some()
    }

    /// Runs the work function and hands back the completion callback, if any.
    pub(crate) fn run(self) -> Option<DoneFn> {
        (self.work)();
        self.done
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("has_done", &self.has_done())
            .finish_non_exhaustive()
    }
}
