//! The bootstrap processor's side of bring-up and completion handling.
use log::{debug, info};

use crate::{CoreId, SmpContext};

/// Spins until `expected` APs have passed the boot barrier, calling `relax` between checks.
///
/// Everything an AP did before joining the barrier is visible to the caller once this returns.
pub fn wait_for_aps<F>(ctx: &SmpContext, expected: usize, mut relax: F)
where
    F: FnMut(),
{
    while ctx.boot_barrier() < expected {
        relax();
    }
    info!("{} APs online", ctx.boot_barrier());
}

/// Runs every completion callback that cores have flagged in the notification bitmap.
///
/// This is the body of the bootstrap processor's completion interrupt. For each flagged core the bit
/// is cleared first and the completed list swapped out second, so a core that flags itself again in
/// between is seen on the next call instead of being lost. The bootstrap processor is the only party
/// that clears bits. Returns the number of callbacks run.
pub fn collect_completions(ctx: &SmpContext) -> usize {
    let mut ran = 0;
    for core in 0..ctx.core_count() {
        if !ctx.bitmap().take(core) {
            continue;
        }
        ran += collect_from(ctx, core);
    }
    ran
}

fn collect_from(ctx: &SmpContext, core: CoreId) -> usize {
    let Ok(queue) = ctx.queue(core) else {
        return 0;
    };
    let callbacks = queue.take_completed();
    let count = callbacks.len();
    for done in callbacks {
        done();
    }
    debug!("Ran {} completions from core {}", count, core);
    count
}
