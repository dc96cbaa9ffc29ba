//! The per-core task queue.
use alloc::vec::Vec;
use core::{
    fmt, mem,
    sync::atomic::{AtomicBool, Ordering},
};

use spin::Once;

use crate::{
    DoneFn, SmpError, Task, ThreadId,
    lock::{InterruptMask, InterruptMutex},
};

/// A core's pair of task lists.
///
/// Any core may push to the pending list. Only the owning core's dispatcher drains it, and it holds
/// the pending lock just long enough to swap the list out. Completion callbacks live behind a second
/// lock so producers are never serialized behind callback staging. Both locks mask interrupts while
/// held, since the dispatcher takes them from the task interrupt.
pub struct TaskQueue {
    pending: InterruptMutex<Vec<Task>>,
    completed: InterruptMutex<Vec<DoneFn>>,
    work_done: AtomicBool,
    main_thread: Once<ThreadId>,
}

impl TaskQueue {
    /// Creates an empty queue with no main thread assigned, whose locks leave interrupts alone.
    pub const fn new() -> Self {
        Self::with_mask(InterruptMask::NONE)
    }

    /// Creates an empty queue whose locks disable interrupts through `mask`.
    pub const fn with_mask(mask: InterruptMask) -> Self {
        Self {
            pending: InterruptMutex::new(Vec::new(), mask),
            completed: InterruptMutex::new(Vec::new(), mask),
            work_done: AtomicBool::new(false),
            main_thread: Once::new(),
        }
    }

    /// Appends a task to the pending list.
    ///
    /// Returns [`SmpError::OutOfMemory`] if the list could not grow. The task is dropped in that case.
    pub fn push(&self, task: Task) -> Result<(), SmpError> {
        let mut pending = self.pending.lock();
        pending.try_reserve(1).map_err(|_| SmpError::OutOfMemory)?;
        pending.push(task);
        Ok(())
    }

    /// Swaps the pending list out, or returns `None` if it is empty.
    pub(crate) fn take_pending(&self) -> Option<Vec<Task>> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            return None;
        }
        Some(mem::take(&mut *pending))
    }

    /// Stages a completion callback on this queue and records that work was done.
    pub(crate) fn stage(&self, done: DoneFn) {
        self.completed.lock().push(done);
        self.work_done.store(true, Ordering::Relaxed);
    }

    pub(crate) fn reset_work_done(&self) {
        self.work_done.store(false, Ordering::Relaxed);
    }

    pub(crate) fn work_done(&self) -> bool {
        self.work_done.load(Ordering::Relaxed)
    }

    /// Swaps out every staged completion callback.
    pub fn take_completed(&self) -> Vec<DoneFn> {
        mem::take(&mut *self.completed.lock())
    }

    /// The number of tasks waiting to be drained.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// The number of staged completion callbacks.
    pub fn completed_len(&self) -> usize {
        self.completed.lock().len()
    }

    /// The scheduler thread this core resumes into after bring-up.
    pub fn main_thread(&self) -> Option<ThreadId> {
        self.main_thread.get().copied()
    }

    /// Assigns the main thread. Later assignments are ignored.
    pub(crate) fn set_main_thread(&self, id: ThreadId) {
        self.main_thread.call_once(|| id);
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // try_lock: Debug may be printed from interrupt context.
        f.debug_struct("TaskQueue")
            .field("pending", &self.pending.try_lock().map(|p| p.len()))
            .field("completed", &self.completed.try_lock().map(|c| c.len()))
            .field("main_thread", &self.main_thread())
            .finish()
    }
}
