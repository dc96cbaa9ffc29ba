//! The cross-core completion notification bitmap.
use alloc::boxed::Box;
use core::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::CoreId;

const WORD_BITS: usize = u64::BITS as usize;

/// One bit per core, set by a core that staged completion callbacks.
///
/// Every access is a single atomic operation, so it is safe to touch from interrupt context.
/// Cores only ever [`set`](Self::set) their own bit. The bootstrap processor is the only party that
/// clears bits, through [`take`](Self::take).
pub struct CoreBitmap {
    words: Box<[AtomicU64]>,
    len: usize,
}

impl CoreBitmap {
    /// Creates a cleared bitmap covering `len` cores.
    pub fn new(len: usize) -> Self {
        let words = (0..len.div_ceil(WORD_BITS))
            .map(|_| AtomicU64::new(0))
            .collect();
        Self { words, len }
    }

    /// The number of cores covered.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the bitmap covers no cores.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[track_caller]
    fn locate(&self, core: CoreId) -> (&AtomicU64, u64) {
        assert!(
            core < self.len,
            "core {} outside notification bitmap of {} cores",
            core,
            self.len
        );
        (&self.words[core / WORD_BITS], 1 << (core % WORD_BITS))
    }

    /// Sets the bit for `core`. Returns the previous value.
    #[track_caller]
    pub fn set(&self, core: CoreId) -> bool {
        let (word, mask) = self.locate(core);
        word.fetch_or(mask, Ordering::AcqRel) & mask != 0
    }

    /// Returns the current value of the bit for `core`.
    #[track_caller]
    pub fn test(&self, core: CoreId) -> bool {
        let (word, mask) = self.locate(core);
        word.load(Ordering::Acquire) & mask != 0
    }

    /// Clears the bit for `core`, returning whether it was set.
    #[track_caller]
    pub fn take(&self, core: CoreId) -> bool {
        let (word, mask) = self.locate(core);
        word.fetch_and(!mask, Ordering::AcqRel) & mask != 0
    }

    /// Returns true if any bit is set.
    pub fn any(&self) -> bool {
        self.words.iter().any(|w| w.load(Ordering::Acquire) != 0)
    }

    /// Iterates over the cores whose bit is currently set.
    pub fn iter_set(&self) -> impl Iterator<Item = CoreId> + '_ {
        (0..self.len).filter(|&core| self.test(core))
    }
}

impl fmt::Debug for CoreBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter_set()).finish()
    }
}
