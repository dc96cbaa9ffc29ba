//! Early hardware bring-up of an application processor.
//!
//! [`ap_entry`] is the first Rust code an AP runs once the trampoline has given it a stack. It sets up
//! the hardware state that everything after it is indexed by, then switches to the core's scheduler
//! main thread, which runs [`core_main`](crate::core_loop::core_main).
use log::{debug, info};

use crate::{
    CoreId, GLOBAL_QUEUE, SmpContext,
    config::{IA32_LSTAR, IA32_STAR},
    hal::{MainThread, Platform},
};

/// Brings up the hardware of `cpu` and returns its main thread without resuming it.
///
/// In order: enables the local interrupt controller, builds the descriptor tables, installs the
/// exception vectors, and (with fast syscalls configured) points the interrupt stack table at the
/// core's private stack and programs `STAR`/`LSTAR`.
///
/// # Panics
/// Panics if `cpu` is the BSP, has no queue, or is not the core actually running this code. All of
/// these leave per-core state indexed by the wrong id, so there is nothing to recover.
pub fn prepare_core<P>(ctx: &SmpContext, platform: &P, cpu: CoreId) -> P::Thread
where
    P: Platform + ?Sized,
{
    assert_ne!(cpu, GLOBAL_QUEUE, "AP bring-up started on the BSP");
    let queue = ctx
        .queue(cpu)
        .unwrap_or_else(|e| panic!("AP bring-up for core {}: {}", cpu, e));

    platform.enable_multiprocessing_mode();
    platform.build_tables_for_core(cpu);
    // Exceptions have to be installed before the first assertion can be reported.
    platform.install_exception_vectors_for_core(cpu);

    let running = platform.current_core_id();
    assert_eq!(
        running, cpu,
        "Core {} is running bring-up for core {}",
        running, cpu
    );

    if let Some(syscall) = ctx.config().fast_syscall() {
        let stack = ctx.stack_for(cpu);
        platform.install_interrupt_stack_table_entry(cpu, stack);
        // SAFETY: STAR and LSTAR only affect `syscall`/`sysret`, which nothing on this core has
        // executed yet. The selectors and entry come from the validated configuration.
        unsafe {
            platform.write_msr(IA32_STAR, syscall.star());
            platform.write_msr(IA32_LSTAR, syscall.entry());
        }
        debug!("Core {} syscall stack at {:#x}", cpu, stack);
    }

    let thread = queue
        .main_thread()
        .unwrap_or_else(|| panic!("Core {} has no main thread", cpu));
    info!("Core {} hardware ready, resuming thread {}", cpu, thread);
    platform.setup_main_thread(thread)
}

/// Brings up `cpu` and switches to its main thread. Never returns.
pub fn ap_entry<P>(ctx: &SmpContext, platform: &P, cpu: CoreId) -> !
where
    P: Platform + ?Sized,
{
    prepare_core(ctx, platform, cpu).resume()
}
