//! The hardware boundary used by bring-up and dispatch.
//!
//! Each collaborator gets its own trait with one method per operation, so bring-up and dispatch can be
//! driven by a mock on the host and by `ksmp_x86` on real hardware.
use alloc::boxed::Box;

use crate::{CoreId, ThreadId};

/// An interrupt handler subscribed to a core-local event index.
pub type Handler = Box<dyn Fn() + Send + Sync + 'static>;

/// The local interrupt controller of the running core.
pub trait InterruptController {
    /// Enables the local interrupt controller in multiprocessing mode.
    fn enable_multiprocessing_mode(&self);
    /// Raises the completion notification interrupt on the bootstrap processor.
    fn send_interrupt_to_bsp(&self);
    /// Raises the task dispatch interrupt on `core`.
    fn send_interrupt_to(&self, core: CoreId);
}

/// Per-core descriptor and vector tables.
pub trait DescriptorTables {
    /// Builds and loads the segment and task descriptors of `core`.
    fn build_tables_for_core(&self, core: CoreId);
    /// Installs the exception and interrupt vector table of `core`.
    fn install_exception_vectors_for_core(&self, core: CoreId);
    /// Points the interrupt stack table of `core` at `stack`.
    fn install_interrupt_stack_table_entry(&self, core: CoreId, stack: u64);
}

/// Control over the running processor.
pub trait Processor {
    /// The hardware-reported id of the running core.
    fn current_core_id(&self) -> CoreId;

    /// Writes a model specific register.
    ///
    /// # Safety
    /// The caller must ensure `value` is valid for `register` and that writing it does not break any
    /// state the running code depends on.
    unsafe fn write_msr(&self, register: u32, value: u64);

    /// Enables interrupts on the running core.
    fn enable_interrupts(&self);

    /// Halts the running core until the next interrupt.
    fn halt(&self);
}

/// A scheduler thread that can be switched to.
pub trait MainThread {
    /// Switches to this thread. Never returns to the caller.
    fn resume(self) -> !;
}

/// The core-local scheduler.
pub trait Scheduler {
    /// The handle returned by [`setup_main_thread`](Self::setup_main_thread).
    type Thread: MainThread;

    /// Gives the scheduler a chance to settle the current execution context.
    fn yield_now(&self);

    /// Allocates or looks up the main execution context with id `id`.
    fn setup_main_thread(&self, id: ThreadId) -> Self::Thread;
}

/// The core-local event notification subsystem.
pub trait EventSource {
    /// Initializes event delivery on `core`.
    fn init_local(&self, core: CoreId);
    /// Subscribes `handler` to the event index `index` on `core`.
    fn subscribe(&self, core: CoreId, index: u8, handler: Handler);
    /// Runs the handlers of every pending event on `core`.
    fn process_pending(&self, core: CoreId);
}

/// Core-local timer, clock and random number services. Every method is idempotent.
pub trait LocalServices {
    /// Initializes the periodic timer hardware.
    fn init_timer(&self);
    /// Starts the periodic timers.
    fn start_timers(&self);
    /// Initializes the wall and monotonic clock sources.
    fn init_clocks(&self);
    /// Seeds the random number generator.
    fn seed_rng(&self);
}

/// Everything an application processor needs during bring-up and while idle.
pub trait Platform:
    InterruptController + DescriptorTables + Processor + Scheduler + EventSource + LocalServices + Sync
{
}

impl<T> Platform for T where
    T: InterruptController
        + DescriptorTables
        + Processor
        + Scheduler
        + EventSource
        + LocalServices
        + Sync
{
}
