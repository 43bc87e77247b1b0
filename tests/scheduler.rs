use async_nursery::Nursery;
use crossbeam_queue::SegQueue;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering},
        Arc,
    },
    time::Duration,
};

use pushbag::{
    for_each, from_iter, interval, map, observe_on, pipe,
    scheduler::{
        ImmediateScheduler, NurseryScheduler, PeriodicWork, Scheduler, SequentialScheduler,
        VirtualTimeScheduler, Work,
    },
    subscribe_on, take, Source, Subject, Subscription,
};

use crate::common::{items, items_then_complete, Recorder};

pub mod common;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn counter() -> (Arc<AtomicUsize>, Box<dyn FnOnce() + Send>) {
    let count = Arc::new(AtomicUsize::new(0));
    let work = Box::new({
        let count = Arc::clone(&count);
        move || {
            count.fetch_add(1, AtomicOrdering::AcqRel);
        }
    });
    (count, work)
}

#[test_log::test]
fn immediate_scheduler_runs_work_inline() {
    let scheduler = ImmediateScheduler::new();
    let (count, work) = counter();

    let subscription = scheduler.schedule(work, None);

    assert_eq!(count.load(AtomicOrdering::Acquire), 1);
    assert!(subscription.is_closed());
    assert!(!subscription.is_cancelled());
}

#[test_log::test]
fn immediate_periodic_work_stops_itself() {
    let scheduler = ImmediateScheduler::new();
    let ticks = Arc::new(AtomicUsize::new(0));

    let subscription = scheduler.schedule_periodic(
        Box::new({
            let ticks = Arc::clone(&ticks);
            move |subscription: &Subscription| {
                if ticks.fetch_add(1, AtomicOrdering::AcqRel) + 1 == 3 {
                    subscription.cancel();
                }
            }
        }),
        ms(1),
    );

    assert_eq!(ticks.load(AtomicOrdering::Acquire), 3);
    assert!(subscription.is_cancelled());
}

#[test_log::test]
fn virtual_time_runs_work_in_due_order() {
    let scheduler = VirtualTimeScheduler::new();
    let order = Arc::new(SegQueue::new());
    for (label, delay) in [("c", 30), ("a", 10), ("b", 20), ("a2", 10)] {
        let order = Arc::clone(&order);
        scheduler.schedule(Box::new(move || order.push(label)), Some(ms(delay)));
    }

    scheduler.advance_by(ms(25));
    assert_eq!(scheduler.elapsed(), ms(25));
    assert_eq!(scheduler.pending(), 1);
    scheduler.advance_by(ms(5));

    let order: Vec<_> = std::iter::from_fn(|| order.pop()).collect();
    assert_eq!(order, ["a", "a2", "b", "c"]);
}

#[test_log::test]
fn virtual_time_skips_cancelled_work() {
    let scheduler = VirtualTimeScheduler::new();
    let (count, work) = counter();

    let subscription = scheduler.schedule(work, Some(ms(10)));
    subscription.cancel();
    scheduler.advance_by(ms(10));

    assert_eq!(count.load(AtomicOrdering::Acquire), 0);
    assert_eq!(scheduler.pending(), 0);
}

#[test_log::test]
fn virtual_time_now_follows_the_virtual_clock() {
    let scheduler = VirtualTimeScheduler::new();
    let start = scheduler.now();

    scheduler.advance_by(ms(1_500));

    assert_eq!(scheduler.now() - start, ms(1_500));
}

#[test_log::test]
fn sequential_scheduler_keeps_submission_order() {
    let virtual_time = Arc::new(VirtualTimeScheduler::new());
    let scheduler = SequentialScheduler::new(virtual_time.clone());
    let order = Arc::new(SegQueue::new());

    for i in 0..5 {
        let order = Arc::clone(&order);
        scheduler.schedule(Box::new(move || order.push(i)), None);
    }
    let late = {
        let order = Arc::clone(&order);
        scheduler.schedule(Box::new(move || order.push(99)), Some(ms(10)))
    };
    assert!(order.is_empty());
    virtual_time.flush();
    assert_eq!(order.len(), 5);
    late.cancel();
    virtual_time.advance_by(ms(10));

    let order: Vec<_> = std::iter::from_fn(|| order.pop()).collect();
    assert_eq!(order, [0, 1, 2, 3, 4]);
}

/// Runs work inline, or turns it away with a cancelled subscription while `refuse` is set.
#[derive(Default)]
struct Picky {
    refuse: AtomicBool,
}

impl Scheduler for Picky {
    fn schedule(&self, work: Work, _delay: Option<Duration>) -> Subscription {
        let subscription = Subscription::new();
        if self.refuse.load(AtomicOrdering::Acquire) {
            subscription.cancel();
        } else {
            work();
        }
        subscription
    }

    fn schedule_periodic(&self, _work: PeriodicWork, _period: Duration) -> Subscription {
        let subscription = Subscription::new();
        subscription.cancel();
        subscription
    }
}

#[test_log::test]
fn sequential_scheduler_recovers_when_the_inner_scheduler_refuses() {
    let inner = Arc::new(Picky::default());
    let scheduler = SequentialScheduler::new(inner.clone());

    inner.refuse.store(true, AtomicOrdering::Release);
    let (first, work) = counter();
    let refused = scheduler.schedule(work, None);
    assert!(refused.is_cancelled());
    assert_eq!(first.load(AtomicOrdering::Acquire), 0);

    inner.refuse.store(false, AtomicOrdering::Release);
    let (second, work) = counter();
    let accepted = scheduler.schedule(work, None);
    assert!(!accepted.is_cancelled());
    assert_eq!(second.load(AtomicOrdering::Acquire), 1);
    assert_eq!(first.load(AtomicOrdering::Acquire), 0);
}

#[test_log::test]
fn subscribe_on_defers_the_subscription_to_the_scheduler() {
    let scheduler = Arc::new(VirtualTimeScheduler::new());
    let recorder = Recorder::new();

    subscribe_on(scheduler.clone())(from_iter([1, 2])).subscribe(recorder.sink());
    assert!(recorder.is_empty());
    scheduler.flush();

    assert_eq!(recorder.take(), items_then_complete([1, 2]));
}

#[test_log::test]
fn subscribe_on_cancelled_before_running_never_subscribes() {
    let scheduler = Arc::new(VirtualTimeScheduler::new());
    let subject = Subject::<i32>::new();
    let recorder = Recorder::new();

    let subscription = subscribe_on(scheduler.clone())(subject.source()).subscribe(recorder.sink());
    subscription.cancel();
    scheduler.flush();

    assert_eq!(subject.subscriber_count(), 0);
    assert!(recorder.is_empty());
}

#[test_log::test]
fn subscribe_on_closest_to_the_source_decides_where_it_starts() {
    let outer = Arc::new(VirtualTimeScheduler::new());
    let inner = Arc::new(VirtualTimeScheduler::new());
    let recorder = Recorder::new();

    let source: Source<i32> = pipe!(
        from_iter([7]),
        subscribe_on(inner.clone()),
        subscribe_on(outer.clone()),
    );
    source.subscribe(recorder.sink());
    inner.flush();
    assert!(recorder.is_empty());
    outer.flush();
    assert!(recorder.is_empty());
    inner.flush();

    assert_eq!(recorder.take(), items_then_complete([7]));
}

#[test_log::test]
fn observe_on_delivers_in_order_from_the_scheduler() {
    let scheduler = Arc::new(VirtualTimeScheduler::new());
    let subject = Subject::new();
    let recorder = Recorder::new();

    observe_on(scheduler.clone())(subject.source()).subscribe(recorder.sink());
    subject.next(1);
    subject.next(2);
    assert!(recorder.is_empty());
    scheduler.flush();
    assert_eq!(recorder.take(), items([1, 2]));
    subject.next(3);
    subject.complete();
    scheduler.flush();

    assert_eq!(recorder.take(), items_then_complete([3]));
}

#[test_log::test]
fn observe_on_drops_queued_signals_on_cancellation() {
    let scheduler = Arc::new(VirtualTimeScheduler::new());
    let subject = Subject::new();
    let recorder = Recorder::new();

    let subscription = observe_on(scheduler.clone())(subject.source()).subscribe(recorder.sink());
    subject.next(1);
    subscription.cancel();
    subject.next(2);
    scheduler.flush();

    assert!(recorder.is_empty());
    assert_eq!(scheduler.pending(), 0);
    assert_eq!(subject.subscriber_count(), 0);
}

#[test_log::test(async_std::test)]
async fn nursery_scheduler_drives_interval() {
    let (nursery, nursery_out) = Nursery::new(async_executors::AsyncStd);
    let scheduler = Arc::new(NurseryScheduler::new(nursery.clone()));
    let actual = Arc::new(SegQueue::new());

    for_each({
        let actual = Arc::clone(&actual);
        move |x| actual.push(x)
    })(take(3)(interval(ms(20), scheduler.clone())));

    drop(scheduler);
    drop(nursery);
    nursery_out.await;

    let actual: Vec<_> = std::iter::from_fn(|| actual.pop()).collect();
    assert_eq!(actual, [0, 1, 2]);
}

#[test_log::test(async_std::test)]
async fn observe_on_a_sequential_pool_keeps_order() {
    let (nursery, nursery_out) = Nursery::new(async_executors::AsyncStd);
    let pool: Arc<dyn Scheduler> = Arc::new(NurseryScheduler::new(nursery.clone()));
    let scheduler = Arc::new(SequentialScheduler::new(pool));
    let actual = Arc::new(SegQueue::new());

    for_each({
        let actual = Arc::clone(&actual);
        move |x| actual.push(x)
    })(pipe!(
        from_iter(0..100),
        subscribe_on(scheduler.clone()),
        map(|x: i32| x * 2),
        observe_on(scheduler.clone()),
    ));

    drop(scheduler);
    drop(nursery);
    nursery_out.await;

    let actual: Vec<_> = std::iter::from_fn(|| actual.pop()).collect();
    assert_eq!(actual, (0..100).map(|x| x * 2).collect::<Vec<_>>());
}

#[test_log::test(async_std::test)]
async fn nursery_scheduler_releases_cancelled_timers_at_once() {
    let (nursery, nursery_out) = Nursery::new(async_executors::AsyncStd);
    let scheduler = NurseryScheduler::new(nursery.clone());

    let (count, work) = counter();
    let delayed = scheduler.schedule(work, Some(Duration::from_secs(600)));
    let periodic = scheduler.schedule_periodic(
        Box::new({
            let count = Arc::clone(&count);
            move |_: &Subscription| {
                count.fetch_add(1, AtomicOrdering::AcqRel);
            }
        }),
        Duration::from_secs(600),
    );
    delayed.cancel();
    periodic.cancel();

    drop(scheduler);
    drop(nursery);
    let finished = async_std::future::timeout(Duration::from_secs(5), nursery_out).await;

    assert!(finished.is_ok());
    assert_eq!(count.load(AtomicOrdering::Acquire), 0);
}
