//! x86_64 hardware backend for `ksmp`.
//!
//! Provides the [`InterruptController`](ksmp::hal::InterruptController) and
//! [`Processor`](ksmp::hal::Processor) halves of the hardware boundary. Descriptor tables, the
//! scheduler, events and timers belong to the embedding kernel.
#![cfg_attr(not(test), no_std)]
#![warn(missing_debug_implementations)]
#![forbid(unsafe_op_in_unsafe_fn)]

mod apic;
pub mod core_map;
pub mod ipi;
pub mod lapic;
mod processor;

pub use apic::{IpiVectors, X86Apic};
pub use core_map::CoreMap;
pub use processor::{INTERRUPT_MASK, X86Processor, current_apic_id};

#[cfg(test)]
#[ctor::ctor]
unsafe fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
