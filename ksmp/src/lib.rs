//! ksmp - Application processor bring-up and cross-core task dispatch.
//!
//! The bootstrap processor (BSP) builds an [`SmpContext`] before starting any application processor
//! (AP). Each AP enters [`boot::ap_entry`], which sets up its hardware and switches to its scheduler
//! main thread. That thread runs [`core_loop::core_main`], which finishes bring-up, joins the boot
//! barrier and idles.
//!
//! Work reaches a core through [`SmpContext::submit`] and runs in [`dispatch::dispatch`] when the core
//! takes its task interrupt. Completion callbacks are staged on the core that ran the task and handed
//! back to the BSP through the notification bitmap and [`bsp::collect_completions`].
#![cfg_attr(not(test), no_std)]
#![warn(missing_debug_implementations)]
#![forbid(unsafe_op_in_unsafe_fn)]

extern crate alloc;

mod bitmap;
pub mod boot;
pub mod bsp;
pub mod config;
mod context;
pub mod core_loop;
pub mod dispatch;
mod error;
pub mod hal;
pub mod lock;
mod queue;
mod task;

#[cfg(test)]
mod scenarios;
#[cfg(test)]
pub(crate) mod test_common;

pub use bitmap::CoreBitmap;
pub use config::{FastSyscall, MAX_CORES, SmpConfig};
pub use context::{BootState, SmpContext, context, install, is_installed};
pub use error::SmpError;
pub use lock::InterruptMask;
pub use queue::TaskQueue;
pub use task::{DoneFn, Task, WorkFn};

/// A logical core index. Core `0` is the bootstrap processor.
pub type CoreId = usize;

/// Identifies a scheduler thread.
pub type ThreadId = u64;

/// The queue every AP drains after its own. It is also the BSP's queue.
pub const GLOBAL_QUEUE: CoreId = 0;
