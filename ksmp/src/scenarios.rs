//! Multi-core scenarios, with one host thread standing in for each core.
use std::{
    string::{String, ToString},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread,
    vec::Vec,
};

use spin::Mutex;

use crate::{
    CoreId, Task,
    bsp::{collect_completions, wait_for_aps},
    core_loop::bring_up,
    dispatch::{DispatchReport, dispatch},
    test_common::{Call, MockPlatform, test_context},
};

fn core_name(core: CoreId) -> String {
    std::format!("core-{}", core)
}

/// Runs `f` on a thread named after `core`.
fn on_core<T, F>(core: CoreId, f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    thread::Builder::new()
        .name(core_name(core))
        .spawn(f)
        .unwrap()
        .join()
        .unwrap()
}

fn running_core() -> String {
    thread::current().name().unwrap_or("unnamed").to_string()
}

#[test]
fn local_callbacks_and_global_work() {
    let ctx = test_context(4);
    let platform = MockPlatform::leak(2);
    let ran_on = Arc::new(Mutex::new(Vec::new()));

    for _ in 0..3 {
        let log = ran_on.clone();
        ctx.submit(
            2,
            Task::new(move || log.lock().push(running_core())).with_done(|| {}),
        )
        .unwrap();
    }
    for _ in 0..2 {
        let log = ran_on.clone();
        ctx.submit_global(Task::new(move || log.lock().push(running_core())))
            .unwrap();
    }

    let report = on_core(2, move || dispatch(ctx, platform, 2));

    assert_eq!(
        report,
        DispatchReport {
            local: 3,
            global: 2,
            staged: 3,
            signalled: true,
        }
    );
    let ran_on = ran_on.lock();
    assert_eq!(ran_on.len(), 5);
    assert!(ran_on.iter().all(|name| *name == core_name(2)));
    assert_eq!(ctx.queue(2).unwrap().completed_len(), 3);
    assert!(ctx.bitmap().test(2));
    assert_eq!(platform.count(&Call::SendToBsp), 1);
}

#[test]
fn idle_core_stays_quiet() {
    let ctx = test_context(4);
    let platform = MockPlatform::leak(3);

    let report = on_core(3, move || dispatch(ctx, platform, 3));

    assert_eq!(report.executed(), 0);
    assert!(!ctx.bitmap().any());
    assert!(platform.calls().is_empty());
}

#[test]
fn concurrent_producers_lose_nothing() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 250;

    let ctx = test_context(PRODUCERS + 2);
    let target = PRODUCERS + 1;
    let seen = Arc::new(Mutex::new(Vec::new()));

    let producers: Vec<_> = (1..=PRODUCERS)
        .map(|producer| {
            let seen = seen.clone();
            thread::Builder::new()
                .name(core_name(producer))
                .spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        let seen = seen.clone();
                        ctx.submit(target, Task::new(move || seen.lock().push((producer, seq))))
                            .unwrap();
                    }
                })
                .unwrap()
        })
        .collect();

    let consumer = {
        let seen = seen.clone();
        let platform = MockPlatform::leak(target);
        thread::Builder::new()
            .name(core_name(target))
            .spawn(move || {
                while seen.lock().len() < PRODUCERS * PER_PRODUCER {
                    dispatch(ctx, platform, target);
                    thread::yield_now();
                }
            })
            .unwrap()
    };

    for producer in producers {
        producer.join().unwrap();
    }
    consumer.join().unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
    for producer in 1..=PRODUCERS {
        let order: Vec<_> = seen
            .iter()
            .filter(|(p, _)| *p == producer)
            .map(|(_, seq)| *seq)
            .collect();
        assert_eq!(order, (0..PER_PRODUCER).collect::<Vec<_>>());
    }
}

#[test]
fn busy_local_queue_delays_global_work() {
    const CHAIN: usize = 1000;

    fn chain(ctx: &'static crate::SmpContext, left: usize, local_runs: Arc<AtomicUsize>) {
        local_runs.fetch_add(1, Ordering::SeqCst);
        if left > 0 {
            ctx.submit(1, Task::new(move || chain(ctx, left - 1, local_runs)))
                .unwrap();
        }
    }

    let ctx = test_context(2);
    let local_runs = Arc::new(AtomicUsize::new(0));
    let seen_at_global = Arc::new(AtomicUsize::new(usize::MAX));

    let seen = seen_at_global.clone();
    let runs = local_runs.clone();
    ctx.submit_global(Task::new(move || {
        seen.store(runs.load(Ordering::SeqCst), Ordering::SeqCst);
    }))
    .unwrap();

    let runs = local_runs.clone();
    ctx.submit(1, Task::new(move || chain(ctx, CHAIN - 1, runs)))
        .unwrap();

    let report = dispatch(ctx, &MockPlatform::new(1), 1);

    // The global task only ran once the local chain stopped refilling the queue.
    assert_eq!(report.local, CHAIN);
    assert_eq!(report.global, 1);
    assert_eq!(seen_at_global.load(Ordering::SeqCst), CHAIN);
}

#[test]
fn boot_barrier_counts_every_ap() {
    const APS: usize = 7;
    static HOOK_RAN: [AtomicBool; APS + 1] = [const { AtomicBool::new(false) }; APS + 1];

    fn hook(core: CoreId) {
        HOOK_RAN[core].store(true, Ordering::Relaxed);
    }

    let ctx = test_context(APS + 1);
    assert!(ctx.set_init_hook(hook));

    let aps: Vec<_> = (1..=APS)
        .map(|core| {
            thread::Builder::new()
                .name(core_name(core))
                .spawn(move || bring_up(ctx, MockPlatform::leak(core), core))
                .unwrap()
        })
        .collect();

    wait_for_aps(ctx, APS, core::hint::spin_loop);

    assert_eq!(ctx.boot_barrier(), APS);
    assert!((1..=APS).all(|core| HOOK_RAN[core].load(Ordering::Relaxed)));

    for ap in aps {
        ap.join().unwrap();
    }
    let mut cores = ctx.initialized_cores();
    cores.sort_unstable();
    assert_eq!(cores, (1..=APS).collect::<Vec<_>>());
    assert_eq!(ctx.boot_barrier(), APS);
}

#[test]
fn submit_signal_complete() {
    let ctx = test_context(3);
    let ap = MockPlatform::leak(1);
    bring_up(ctx, ap, 1);

    let worked = Arc::new(AtomicBool::new(false));
    let completed = Arc::new(AtomicBool::new(false));
    let (w, c) = (worked.clone(), completed.clone());
    ctx.submit(
        1,
        Task::new(move || w.store(true, Ordering::SeqCst))
            .with_done(move || c.store(true, Ordering::SeqCst)),
    )
    .unwrap();

    let bsp = MockPlatform::new(0);
    ctx.signal(&bsp, 1).unwrap();
    assert_eq!(bsp.calls(), [Call::SendTo(1)]);

    // The IPI lands on core 1 as its task event.
    on_core(1, move || ap.fire(ctx.config().task_event()));
    assert!(worked.load(Ordering::SeqCst));
    assert!(!completed.load(Ordering::SeqCst));
    assert_eq!(ap.count(&Call::SendToBsp), 1);

    assert_eq!(collect_completions(ctx), 1);
    assert!(completed.load(Ordering::SeqCst));
    assert!(!ctx.bitmap().any());
}
