use std::sync::Arc;

use crate::{
    scheduler::Scheduler,
    utils::tracing::{instrument, trace},
    Source, Subscriber,
};

/// Subscribes to the source from a job on `scheduler` instead of the subscribing thread.
///
/// When several `subscribe_on` are chained, the one closest to the source decides where the
/// source starts; the others only add a hop before it. Cancelling before the job ran prevents
/// the subscription from ever reaching the source.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::sync::Arc;
///
/// use pushbag::{for_each, from_iter, scheduler::VirtualTimeScheduler, subscribe_on};
///
/// let scheduler = Arc::new(VirtualTimeScheduler::new());
///
/// let actual = Arc::new(SegQueue::new());
///
/// for_each({
///     let actual = Arc::clone(&actual);
///     move |x| actual.push(x)
/// })(subscribe_on(scheduler.clone())(from_iter([1, 2, 3])));
///
/// assert!(actual.is_empty());
/// scheduler.flush();
/// assert_eq!(actual.len(), 3);
/// ```
pub fn subscribe_on<T: 'static, S>(scheduler: Arc<dyn Scheduler>) -> Box<dyn Fn(S) -> Source<T>>
where
    S: Into<Arc<Source<T>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        let scheduler = Arc::clone(&scheduler);
        (move |subscriber: Subscriber<T>| {
            instrument!("subscribe_on");
            let job = scheduler.schedule(
                Box::new({
                    let source = Arc::clone(&source);
                    let subscriber = subscriber.clone();
                    move || {
                        if subscriber.is_closed() {
                            trace!("cancelled before subscribing");
                            return;
                        }
                        source(subscriber);
                    }
                }),
                None,
            );
            subscriber.add(job);
        })
        .into()
    })
}
