//! A spin lock that keeps interrupts masked on the running core while it is held.
//!
//! The task interrupt takes the same queue locks that producers on that core take. If it fires while
//! the interrupted code holds one, the handler would spin on a lock that can never be released.
use core::{
    fmt,
    mem::ManuallyDrop,
    ops::{Deref, DerefMut},
};

use spin::{Mutex, MutexGuard};

/// Access to the running core's interrupt flag.
#[derive(Clone, Copy)]
pub struct InterruptMask {
    are_enabled: fn() -> bool,
    disable: fn(),
    enable: fn(),
}

fn never_enabled() -> bool {
    false
}

fn unmasked() {}

impl InterruptMask {
    /// A mask that never touches the interrupt flag.
    ///
    /// Only sound where no lock holder can be interrupted by a handler taking the same lock, such as on
    /// a host.
    pub const NONE: Self = Self {
        are_enabled: never_enabled,
        disable: unmasked,
        enable: unmasked,
    };

    /// Builds a mask from the three interrupt flag operations of the platform.
    pub const fn new(are_enabled: fn() -> bool, disable: fn(), enable: fn()) -> Self {
        Self {
            are_enabled,
            disable,
            enable,
        }
    }

    /// Disables interrupts, returning whether they were enabled before.
    fn save(&self) -> bool {
        let enabled = (self.are_enabled)();
        (self.disable)();
        enabled
    }

    fn restore(&self, enabled: bool) {
        if enabled {
            (self.enable)();
        }
    }
}

impl Default for InterruptMask {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Debug for InterruptMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptMask").finish_non_exhaustive()
    }
}

/// A mutex that disables interrupts while locked.
pub struct InterruptMutex<T> {
    data: Mutex<T>,
    mask: InterruptMask,
}

/// Releases the lock, then restores the interrupt flag.
pub struct InterruptMutexGuard<'a, T> {
    guard: ManuallyDrop<MutexGuard<'a, T>>,
    mask: InterruptMask,
    reenable: bool,
}

impl<T> InterruptMutex<T> {
    /// Creates a new `InterruptMutex` that masks interrupts through `mask`.
    pub const fn new(data: T, mask: InterruptMask) -> Self {
        Self {
            data: Mutex::new(data),
            mask,
        }
    }

    /// Locks the mutex, disabling interrupts.
    pub fn lock(&self) -> InterruptMutexGuard<'_, T> {
        let reenable = self.mask.save();
        let guard = self.data.lock();
        InterruptMutexGuard {
            guard: ManuallyDrop::new(guard),
            mask: self.mask,
            reenable,
        }
    }

    /// Locks the mutex if it is free. Interrupts are left as they were if it is not.
    pub fn try_lock(&self) -> Option<InterruptMutexGuard<'_, T>> {
        let reenable = self.mask.save();
        match self.data.try_lock() {
            Some(guard) => Some(InterruptMutexGuard {
                guard: ManuallyDrop::new(guard),
                mask: self.mask,
                reenable,
            }),
            None => {
                self.mask.restore(reenable);
                None
            }
        }
    }
}

impl<T> Drop for InterruptMutexGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: `guard` is never touched again after this.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        self.mask.restore(self.reenable);
    }
}

impl<T> Deref for InterruptMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> DerefMut for InterruptMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<T: fmt::Debug> fmt::Debug for InterruptMutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptMutex")
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

impl<T: fmt::Debug> fmt::Debug for InterruptMutexGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
