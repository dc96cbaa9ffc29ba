//! The process-wide SMP context.
use alloc::{boxed::Box, vec::Vec};
use core::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

use log::{info, trace};
use spin::{Mutex, MutexGuard, Once};

use crate::{
    CoreBitmap, CoreId, GLOBAL_QUEUE, SmpConfig, SmpError, Task, TaskQueue, ThreadId,
    hal::InterruptController,
};

static CONTEXT: Once<SmpContext> = Once::new();

/// State behind the global SMP lock. Only touched during bring-up.
#[derive(Debug, Default)]
pub struct BootState {
    initialized: Vec<CoreId>,
}

impl BootState {
    /// The cores that finished bring-up, in the order they finished.
    pub fn initialized(&self) -> &[CoreId] {
        &self.initialized
    }

    pub(crate) fn mark_initialized(&mut self, core: CoreId) {
        self.initialized.push(core);
    }
}

/// Shared state of every core: the task queues, the notification bitmap and the boot barrier.
///
/// Built on the bootstrap processor before any AP starts and never torn down.
pub struct SmpContext {
    config: SmpConfig,
    boot_barrier: AtomicUsize,
    bitmap: CoreBitmap,
    queues: Box<[TaskQueue]>,
    global: Mutex<BootState>,
    init_hook: Once<fn(CoreId)>,
}

impl SmpContext {
    /// Builds the context for `config`, asking `main_thread_id` for the main thread of each core.
    pub fn new<F>(config: SmpConfig, mut main_thread_id: F) -> Result<Self, SmpError>
    where
        F: FnMut(CoreId) -> ThreadId,
    {
        config.validate()?;
        let count = config.core_count();

        let queues = (0..count)
            .map(|core| {
                let queue = TaskQueue::with_mask(config.interrupt_mask());
                queue.set_main_thread(main_thread_id(core));
                queue
            })
            .collect();

        info!("SMP context created for {} cores ({} APs)", count, count - 1);

        Ok(Self {
            config,
            boot_barrier: AtomicUsize::new(0),
            bitmap: CoreBitmap::new(count),
            queues,
            global: Mutex::new(BootState::default()),
            init_hook: Once::new(),
        })
    }

    /// The configuration this context was built from.
    pub fn config(&self) -> &SmpConfig {
        &self.config
    }

    /// The number of cores, BSP included.
    pub fn core_count(&self) -> usize {
        self.queues.len()
    }

    /// Returns the queue owned by `core`.
    pub fn queue(&self, core: CoreId) -> Result<&TaskQueue, SmpError> {
        self.queues.get(core).ok_or(SmpError::UnknownCore {
            core,
            count: self.queues.len(),
        })
    }

    /// The global queue, drained by every AP once its own queue is empty.
    pub fn global_queue(&self) -> &TaskQueue {
        &self.queues[GLOBAL_QUEUE]
    }

    /// The private stack address of `core`.
    pub fn stack_for(&self, core: CoreId) -> u64 {
        self.config.stack_for(core)
    }

    /// The completion notification bitmap.
    pub fn bitmap(&self) -> &CoreBitmap {
        &self.bitmap
    }

    /// The number of APs that reached the end of bring-up.
    pub fn boot_barrier(&self) -> usize {
        self.boot_barrier.load(Ordering::Acquire)
    }

    /// Counts the calling AP as ready. Returns the new barrier value.
    pub(crate) fn arrive(&self) -> usize {
        self.boot_barrier.fetch_add(1, Ordering::Release) + 1
    }

    /// Takes the global SMP lock.
    pub fn global_lock(&self) -> MutexGuard<'_, BootState> {
        self.global.lock()
    }

    /// The cores that finished bring-up, in the order they finished.
    pub fn initialized_cores(&self) -> Vec<CoreId> {
        self.global.lock().initialized().to_vec()
    }

    /// Registers the hook every AP runs at the end of bring-up. Returns false if one was already set.
    pub fn set_init_hook(&self, hook: fn(CoreId)) -> bool {
        let mut registered = false;
        self.init_hook.call_once(|| {
            registered = true;
            hook
        });
        registered
    }

    pub(crate) fn run_init_hook(&self, core: CoreId) {
        if let Some(hook) = self.init_hook.get() {
            hook(core);
        }
    }

    /// Queues `task` on `target`. Does not wait for it to run.
    ///
    /// The target only notices the task on its next task interrupt; see [`signal`](Self::signal).
    pub fn submit(&self, target: CoreId, task: Task) -> Result<(), SmpError> {
        self.queue(target)?.push(task)?;
        trace!("Queued task on core {}", target);
        Ok(())
    }

    /// Queues `task` on the global queue, to be picked up by whichever AP drains it first.
    pub fn submit_global(&self, task: Task) -> Result<(), SmpError> {
        self.submit(GLOBAL_QUEUE, task)
    }

    /// Raises the task interrupt on the application processor `core`.
    pub fn signal<A>(&self, apic: &A, core: CoreId) -> Result<(), SmpError>
    where
        A: InterruptController + ?Sized,
    {
        self.queue(core)?;
        if core == GLOBAL_QUEUE {
            return Err(SmpError::NotApplicationCore(core));
        }
        apic.send_interrupt_to(core);
        Ok(())
    }

    /// Raises the task interrupt on every AP that finished bring-up.
    ///
    /// An AP joins the boot barrier just before it registers itself, so once the barrier counts every
    /// AP all of them are signalled, registered or not.
    pub fn signal_all<A>(&self, apic: &A)
    where
        A: InterruptController + ?Sized,
    {
        if self.boot_barrier() >= self.core_count() - 1 {
            for core in 1..self.core_count() {
                apic.send_interrupt_to(core);
            }
            return;
        }
        for core in self.initialized_cores() {
            apic.send_interrupt_to(core);
        }
    }
}

impl fmt::Debug for SmpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmpContext")
            .field("config", &self.config)
            .field("boot_barrier", &self.boot_barrier())
            .field("bitmap", &self.bitmap)
            .field("queues", &self.queues)
            .finish_non_exhaustive()
    }
}

/// Publishes `ctx` as the kernel's SMP context.
///
/// Interrupt entry points that cannot carry arguments reach the context through [`context`].
pub fn install(ctx: SmpContext) -> Result<&'static SmpContext, SmpError> {
    let mut installed = false;
    let ctx = CONTEXT.call_once(|| {
        installed = true;
        ctx
    });
    if !installed {
        return Err(SmpError::AlreadyInstalled);
    }
    Ok(ctx)
}

/// Returns the installed context, spinning until [`install`] has run.
pub fn context() -> &'static SmpContext {
    CONTEXT.wait()
}

/// Returns true once [`install`] has run.
pub fn is_installed() -> bool {
    CONTEXT.is_completed()
}
