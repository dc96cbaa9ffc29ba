//! Bring-up configuration for the SMP subsystem.
use crate::{CoreId, SmpError, lock::InterruptMask};

/// The maximum number of cores (BSP included) a context can describe.
pub const MAX_CORES: usize = 256;

/// `IA32_STAR`: segment selectors loaded by `syscall`/`sysret`.
pub const IA32_STAR: u32 = 0xC000_0081;
/// `IA32_LSTAR`: the 64-bit `syscall` entry point.
pub const IA32_LSTAR: u32 = 0xC000_0082;

/// Fast system call setup, for architectures that enter the kernel through `syscall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastSyscall {
    kernel_cs: u16,
    user_cs: u16,
    entry: u64,
}

impl FastSyscall {
    /// Creates a fast syscall setup that lands in `entry`, using selector `8` for both halves of `STAR`.
    pub const fn new(entry: u64) -> Self {
        Self {
            kernel_cs: 8,
            user_cs: 8,
            entry,
        }
    }

    /// Overrides the kernel and user code segment selectors.
    pub const fn with_selectors(mut self, kernel_cs: u16, user_cs: u16) -> Self {
        self.kernel_cs = kernel_cs;
        self.user_cs = user_cs;
        self
    }

    /// The value programmed into [`IA32_STAR`].
    pub const fn star(&self) -> u64 {
        (self.kernel_cs as u64) << 32 | (self.user_cs as u64) << 48
    }

    /// The value programmed into [`IA32_LSTAR`].
    pub const fn entry(&self) -> u64 {
        self.entry
    }
}

/// Immutable configuration for bringing up the application processors.
#[derive(Debug, Clone, Copy)]
pub struct SmpConfig {
    core_count: usize,
    stack_base: u64,
    stack_size: u64,
    task_event: u8,
    timer_event: u8,
    fast_syscall: Option<FastSyscall>,
    interrupt_mask: InterruptMask,
}

impl SmpConfig {
    /// Creates a configuration for `core_count` cores, BSP included.
    ///
    /// Tasks are delivered on event index `0` and timers start on event index `1`.
    pub const fn new(core_count: usize) -> Self {
        Self {
            core_count,
            stack_base: 0,
            stack_size: 0,
            task_event: 0,
            timer_event: 1,
            fast_syscall: None,
            interrupt_mask: InterruptMask::NONE,
        }
    }

    /// Sets the base and per-core stride of the AP stack region.
    pub const fn with_stacks(mut self, base: u64, size: u64) -> Self {
        self.stack_base = base;
        self.stack_size = size;
        self
    }

    /// Sets the event indices used for task dispatch and timer start.
    pub const fn with_events(mut self, task: u8, timer: u8) -> Self {
        self.task_event = task;
        self.timer_event = timer;
        self
    }

    /// Enables fast syscall programming during AP bring-up.
    pub const fn with_fast_syscall(mut self, fast_syscall: FastSyscall) -> Self {
        self.fast_syscall = Some(fast_syscall);
        self
    }

    /// Sets how the task queue locks mask interrupts on the running core.
    ///
    /// Kernels that dispatch from the task interrupt must set this; the default leaves interrupts
    /// alone.
    pub const fn with_interrupt_mask(mut self, mask: InterruptMask) -> Self {
        self.interrupt_mask = mask;
        self
    }

    /// The number of cores, BSP included.
    pub const fn core_count(&self) -> usize {
        self.core_count
    }

    /// The per-core stack stride.
    pub const fn stack_size(&self) -> u64 {
        self.stack_size
    }

    /// The event index subscribed to the task dispatcher.
    pub const fn task_event(&self) -> u8 {
        self.task_event
    }

    /// The event index subscribed to the timer start routine.
    pub const fn timer_event(&self) -> u8 {
        self.timer_event
    }

    /// The fast syscall setup, if any.
    pub const fn fast_syscall(&self) -> Option<FastSyscall> {
        self.fast_syscall
    }

    /// The interrupt mask used by the task queue locks.
    pub const fn interrupt_mask(&self) -> InterruptMask {
        self.interrupt_mask
    }

    /// Returns the private stack address of `core`.
    pub const fn stack_for(&self, core: CoreId) -> u64 {
        self.stack_base + core as u64 * self.stack_size
    }

    /// Checks the configuration for values bring-up cannot work with.
    pub fn validate(&self) -> Result<(), SmpError> {
        if self.core_count == 0 {
            return Err(SmpError::InvalidConfig("at least one core is required"));
        }
        if self.core_count > MAX_CORES {
            return Err(SmpError::InvalidConfig("too many cores"));
        }
        if self.core_count > 1 && self.stack_size == 0 {
            return Err(SmpError::InvalidConfig("AP stack stride is zero"));
        }
        if self.task_event == self.timer_event {
            return Err(SmpError::InvalidConfig(
                "task and timer events share an index",
            ));
        }
        let last = (self.core_count as u64 - 1).checked_mul(self.stack_size);
        if last.and_then(|off| self.stack_base.checked_add(off)).is_none() {
            return Err(SmpError::InvalidConfig("AP stack region overflows"));
        }
        Ok(())
    }
}
