//! A recording mock of the hardware boundary.
use std::{
    boxed::Box,
    cell::{Cell, RefCell},
    vec::Vec,
};

use spin::Mutex;

use crate::{
    CoreId, SmpConfig, SmpContext, ThreadId,
    config::FastSyscall,
    hal::{
        DescriptorTables, EventSource, Handler, InterruptController, LocalServices, MainThread,
        Processor, Scheduler,
    },
    lock::InterruptMask,
};

pub const SYSCALL_ENTRY: u64 = 0xffff_8000_0010_0000;
pub const STACK_BASE: u64 = 0x4000_0000;
pub const STACK_SIZE: u64 = 0x4000;

#[ctor::ctor]
unsafe fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A change of the simulated interrupt flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Irq {
    Disable,
    Enable,
}

// Each test thread plays one core, with its own interrupt flag.
std::thread_local! {
    static INTERRUPT_FLAG: Cell<bool> = const { Cell::new(true) };
    static IRQ_LOG: RefCell<Vec<Irq>> = const { RefCell::new(Vec::new()) };
    static DEFERRED: RefCell<Vec<Box<dyn FnOnce()>>> = const { RefCell::new(Vec::new()) };
}

fn flag_enabled() -> bool {
    INTERRUPT_FLAG.get()
}

fn flag_disable() {
    IRQ_LOG.with_borrow_mut(|log| log.push(Irq::Disable));
    INTERRUPT_FLAG.set(false);
}

fn flag_enable() {
    IRQ_LOG.with_borrow_mut(|log| log.push(Irq::Enable));
    INTERRUPT_FLAG.set(true);
    while let Some(handler) =
        DEFERRED.with_borrow_mut(|deferred| (!deferred.is_empty()).then(|| deferred.remove(0)))
    {
        deliver(handler);
    }
}

fn deliver(handler: Box<dyn FnOnce()>) {
    INTERRUPT_FLAG.set(false);
    handler();
    INTERRUPT_FLAG.set(true);
}

/// Masks the calling thread's simulated interrupt flag.
pub fn test_mask() -> InterruptMask {
    InterruptMask::new(flag_enabled, flag_disable, flag_enable)
}

/// Whether the calling thread's simulated interrupts are enabled.
pub fn interrupt_flag() -> bool {
    flag_enabled()
}

/// Takes the calling thread's interrupt flag changes so far.
pub fn irq_log() -> Vec<Irq> {
    IRQ_LOG.take()
}

/// Runs `handler` now if interrupts are enabled, otherwise once they are enabled again.
pub fn raise_interrupt(handler: impl FnOnce() + 'static) {
    if flag_enabled() {
        deliver(Box::new(handler));
    } else {
        DEFERRED.with_borrow_mut(|deferred| deferred.push(Box::new(handler)));
    }
}

/// A context with fast syscalls enabled, leaked so handlers can hold on to it.
/// Core `n` gets main thread `100 + n`.
pub fn test_context(cores: usize) -> &'static SmpContext {
    let config = SmpConfig::new(cores)
        .with_stacks(STACK_BASE, STACK_SIZE)
        .with_fast_syscall(FastSyscall::new(SYSCALL_ENTRY))
        .with_interrupt_mask(test_mask());
    let ctx = SmpContext::new(config, |core| 100 + core as ThreadId).expect("valid test config");
    Box::leak(Box::new(ctx))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    EnableMp,
    SendToBsp,
    SendTo(CoreId),
    BuildTables(CoreId),
    InstallVectors(CoreId),
    InstallIst(CoreId, u64),
    WriteMsr(u32, u64),
    EnableInterrupts,
    Halt,
    Yield,
    SetupThread(ThreadId),
    InitLocal(CoreId),
    Subscribe(CoreId, u8),
    ProcessPending(CoreId),
    InitTimer,
    StartTimers,
    InitClocks,
    SeedRng,
}

/// Pretends to be core `core` and records every call made through the hardware traits.
pub struct MockPlatform {
    core: CoreId,
    calls: Mutex<Vec<Call>>,
    handlers: Mutex<Vec<(u8, Handler)>>,
}

impl MockPlatform {
    pub fn new(core: CoreId) -> Self {
        Self {
            core,
            calls: Mutex::new(Vec::new()),
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn leak(core: CoreId) -> &'static Self {
        Box::leak(Box::new(Self::new(core)))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    /// Delivers event `index`, as the event subsystem would from an interrupt.
    pub fn fire(&self, index: u8) {
        let handlers = self.handlers.lock();
        for (_, handler) in handlers.iter().filter(|(i, _)| *i == index) {
            handler();
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl core::fmt::Debug for MockPlatform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MockPlatform")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct MockThread(ThreadId);

impl MockThread {
    pub fn id(&self) -> ThreadId {
        self.0
    }
}

impl MainThread for MockThread {
    fn resume(self) -> ! {
        panic!("Resumed main thread {}", self.0)
    }
}

impl InterruptController for MockPlatform {
    fn enable_multiprocessing_mode(&self) {
        self.record(Call::EnableMp);
    }

    fn send_interrupt_to_bsp(&self) {
        self.record(Call::SendToBsp);
    }

    fn send_interrupt_to(&self, core: CoreId) {
        self.record(Call::SendTo(core));
    }
}

impl DescriptorTables for MockPlatform {
    fn build_tables_for_core(&self, core: CoreId) {
        self.record(Call::BuildTables(core));
    }

    fn install_exception_vectors_for_core(&self, core: CoreId) {
        self.record(Call::InstallVectors(core));
    }

    fn install_interrupt_stack_table_entry(&self, core: CoreId, stack: u64) {
        self.record(Call::InstallIst(core, stack));
    }
}

impl Processor for MockPlatform {
    fn current_core_id(&self) -> CoreId {
        self.core
    }

    unsafe fn write_msr(&self, register: u32, value: u64) {
        self.record(Call::WriteMsr(register, value));
    }

    fn enable_interrupts(&self) {
        self.record(Call::EnableInterrupts);
    }

    fn halt(&self) {
        self.record(Call::Halt);
    }
}

impl Scheduler for MockPlatform {
    type Thread = MockThread;

    fn yield_now(&self) {
        self.record(Call::Yield);
    }

    fn setup_main_thread(&self, id: ThreadId) -> MockThread {
        self.record(Call::SetupThread(id));
        MockThread(id)
    }
}

impl EventSource for MockPlatform {
    fn init_local(&self, core: CoreId) {
        self.record(Call::InitLocal(core));
    }

    fn subscribe(&self, core: CoreId, index: u8, handler: Handler) {
        self.record(Call::Subscribe(core, index));
        self.handlers.lock().push((index, handler));
    }

    fn process_pending(&self, core: CoreId) {
        self.record(Call::ProcessPending(core));
    }
}

impl LocalServices for MockPlatform {
    fn init_timer(&self) {
        self.record(Call::InitTimer);
    }

    fn start_timers(&self) {
        self.record(Call::StartTimers);
    }

    fn init_clocks(&self) {
        self.record(Call::InitClocks);
    }

    fn seed_rng(&self) {
        self.record(Call::SeedRng);
    }
}
