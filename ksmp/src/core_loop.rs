//! The application processor main loop.
//!
//! This is the body of every AP's scheduler main thread. It finishes bring-up, joins the boot
//! barrier and then idles, waking only to service interrupts.
use alloc::boxed::Box;

use log::{debug, info};

use crate::{CoreId, SmpContext, dispatch::dispatch, hal::Platform};

/// Finishes bring-up of `cpu` and marks it ready.
///
/// Subscribes the task dispatcher and the timer start routine, enables interrupts, initializes the
/// core-local timer, clocks and RNG, runs the init hook, then counts the core in the boot barrier and
/// the initialized-cores list.
///
/// # Panics
/// Panics if `cpu` is not a configured core, or if the running core is not `cpu`.
pub fn bring_up<P>(ctx: &'static SmpContext, platform: &'static P, cpu: CoreId)
where
    P: Platform,
{
    ctx.queue(cpu)
        .unwrap_or_else(|e| panic!("AP bring-up for core {}: {}", cpu, e));
    platform.yield_now();

    let stack = ctx.stack_for(cpu);
    {
        let _global = ctx.global_lock();
        let running = platform.current_core_id();
        info!("AP {} started at {:#x}", running, stack);
        assert_eq!(running, cpu, "AP {} reports itself as core {}", cpu, running);
    }

    platform.init_local(cpu);
    let config = ctx.config();
    platform.subscribe(
        cpu,
        config.task_event(),
        Box::new(move || {
            dispatch(ctx, platform, cpu);
        }),
    );
    platform.subscribe(
        cpu,
        config.timer_event(),
        Box::new(move || platform.start_timers()),
    );
    platform.enable_interrupts();

    platform.init_timer();
    platform.init_clocks();
    platform.seed_rng();

    ctx.run_init_hook(cpu);

    let online = ctx.arrive();
    ctx.global_lock().mark_initialized(cpu);
    debug!("AP {} ready, {} APs online", cpu, online);
}

/// Processes pending events, then halts until the next interrupt.
pub fn idle_once<P>(platform: &P, cpu: CoreId)
where
    P: Platform + ?Sized,
{
    platform.process_pending(cpu);
    platform.halt();
}

/// The main thread of `cpu`. Never returns.
pub fn core_main<P>(ctx: &'static SmpContext, platform: &'static P, cpu: CoreId) -> !
where
    P: Platform,
{
    bring_up(ctx, platform, cpu);
    loop {
        idle_once(platform, cpu);
    }
}
