//! The task dispatcher, run from a core's task interrupt.
//!
//! A dispatch cycle drains the running core's own queue, then the global queue. Each pass swaps the
//! pending list out under its lock and runs the tasks with the lock released, so producers only ever
//! wait for the swap. Passes repeat until a queue reports empty, which means tasks that arrive while
//! a batch runs are picked up in the same cycle. The global queue is not looked at until the local
//! queue is empty, so a core that keeps refilling its own queue never reaches global work.
//!
//! Completion callbacks always land on the running core's completed list, whichever queue the task
//! came from. If any were staged, the core sets its bit in the notification bitmap and interrupts the
//! bootstrap processor once for the whole cycle.
use log::{debug, trace};

use crate::{CoreId, SmpContext, TaskQueue, hal::InterruptController};

/// What a single dispatch cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Tasks executed from the core's own queue.
    pub local: usize,
    /// Tasks executed from the global queue.
    pub global: usize,
    /// Completion callbacks staged on the core's completed list.
    pub staged: usize,
    /// Whether the bootstrap processor was interrupted.
    pub signalled: bool,
}

impl DispatchReport {
    /// The total number of tasks executed.
    pub fn executed(&self) -> usize {
        self.local + self.global
    }
}

/// Runs one dispatch cycle on `cpu`.
///
/// # Panics
/// Panics if `cpu` has no queue in `ctx`. Dispatch is only ever wired up for cores that passed bring-up.
pub fn dispatch<A>(ctx: &SmpContext, apic: &A, cpu: CoreId) -> DispatchReport
where
    A: InterruptController + ?Sized,
{
    let home = ctx
        .queue(cpu)
        .unwrap_or_else(|e| panic!("Dispatch on core {}: {}", cpu, e));
    home.reset_work_done();

    let mut report = DispatchReport::default();
    while let Some(ran) = drain(home, home, &mut report.staged) {
        report.local += ran;
    }
    while let Some(ran) = drain(ctx.global_queue(), home, &mut report.staged) {
        report.global += ran;
    }

    if home.work_done() {
        ctx.bitmap().set(cpu);
        apic.send_interrupt_to_bsp();
        report.signalled = true;
        debug!(
            "Core {} staged {} completions, notified BSP",
            cpu, report.staged
        );
    }

    trace!("Dispatch on core {}: {:?}", cpu, report);
    report
}

/// One swap-and-run pass over `source`, staging callbacks on `home`.
/// Returns `None` if `source` had nothing pending.
fn drain(source: &TaskQueue, home: &TaskQueue, staged: &mut usize) -> Option<usize> {
    let tasks = source.take_pending()?;
    let count = tasks.len();
    for task in tasks {
        if let Some(done) = task.run() {
            home.stage(done);
            *staged += 1;
        }
    }
    Some(count)
}
