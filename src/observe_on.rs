use crossbeam_queue::SegQueue;
use std::sync::{
    atomic::{AtomicUsize, Ordering as AtomicOrdering},
    Arc,
};

use crate::{
    scheduler::Scheduler,
    utils::tracing::{instrument, trace},
    SerialSubscription, Signal, Source, Subscriber,
};

struct Hop<T> {
    queue: SegQueue<Signal<T>>,
    wip: AtomicUsize,
    subscriber: Subscriber<T>,
    scheduler: Arc<dyn Scheduler>,
    pending: SerialSubscription,
}

impl<T: Send + 'static> Hop<T> {
    fn enqueue(self: &Arc<Self>, signal: Signal<T>) {
        if self.subscriber.is_closed() {
            return;
        }
        self.queue.push(signal);
        if self.wip.fetch_add(1, AtomicOrdering::AcqRel) == 0 {
            let job = self.scheduler.schedule(
                Box::new({
                    let hop = Arc::clone(self);
                    move || hop.drain()
                }),
                None,
            );
            self.pending.set(job);
        }
    }

    fn drain(&self) {
        let mut missed = 1;
        loop {
            while let Some(signal) = self.queue.pop() {
                if self.subscriber.is_closed() {
                    trace!("dropping signals queued before cancellation");
                    while self.queue.pop().is_some() {}
                    return;
                }
                self.subscriber.emit(signal);
            }
            missed = self.wip.fetch_sub(missed, AtomicOrdering::AcqRel) - missed;
            if missed == 0 {
                break;
            }
        }
    }
}

/// Delivers the source's signals from jobs on `scheduler`, in the order they were sent.
///
/// Signals are queued per subscription and handed over by one scheduled job at a time.
/// Cancelling drops whatever is still queued and cancels the pending job.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::sync::Arc;
///
/// use pushbag::{for_each, from_iter, observe_on, scheduler::VirtualTimeScheduler};
///
/// let scheduler = Arc::new(VirtualTimeScheduler::new());
///
/// let actual = Arc::new(SegQueue::new());
///
/// for_each({
///     let actual = Arc::clone(&actual);
///     move |x| actual.push(x)
/// })(observe_on(scheduler.clone())(from_iter([1, 2, 3])));
///
/// assert!(actual.is_empty());
/// scheduler.flush();
/// assert_eq!(actual.len(), 3);
/// ```
pub fn observe_on<T: 'static, S>(scheduler: Arc<dyn Scheduler>) -> Box<dyn Fn(S) -> Source<T>>
where
    T: Send,
    S: Into<Arc<Source<T>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        let scheduler = Arc::clone(&scheduler);
        (move |subscriber: Subscriber<T>| {
            instrument!("observe_on");
            let hop = Arc::new(Hop {
                queue: SegQueue::new(),
                wip: AtomicUsize::new(0),
                subscriber: subscriber.clone(),
                scheduler: Arc::clone(&scheduler),
                pending: SerialSubscription::new(),
            });
            subscriber.add_teardown({
                let pending = hop.pending.clone();
                move || pending.cancel()
            });
            let upstream = subscriber.child();
            source.subscribe_with(
                move |signal: Signal<T>| hop.enqueue(signal),
                upstream,
            );
        })
        .into()
    })
}
