use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use crate::{scheduler::Scheduler, utils::tracing::instrument, Signal, Source, Subscriber};

/// Delivers the first item of every `span`, dropping the rest.
///
/// A span opens with the first item after the previous span ended, measured with
/// [`Scheduler::now`].
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::{sync::Arc, time::Duration};
///
/// use pushbag::{for_each, interval, scheduler::VirtualTimeScheduler, throttle_first};
///
/// let scheduler = Arc::new(VirtualTimeScheduler::new());
///
/// let actual = Arc::new(SegQueue::new());
///
/// let subscription = for_each({
///     let actual = Arc::clone(&actual);
///     move |x| actual.push(x)
/// })(throttle_first(Duration::from_millis(250), scheduler.clone())(interval(
///     Duration::from_millis(100),
///     scheduler.clone(),
/// )));
///
/// scheduler.advance_by(Duration::from_millis(1_000));
/// subscription.cancel();
///
/// assert_eq!(actual.pop(), Some(0));
/// assert_eq!(actual.pop(), Some(3));
/// assert_eq!(actual.pop(), Some(6));
/// assert_eq!(actual.pop(), Some(9));
/// assert_eq!(actual.pop(), None);
/// ```
pub fn throttle_first<T: 'static, S>(
    span: Duration,
    scheduler: Arc<dyn Scheduler>,
) -> Box<dyn Fn(S) -> Source<T>>
where
    S: Into<Arc<Source<T>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        let scheduler = Arc::clone(&scheduler);
        (move |subscriber: Subscriber<T>| {
            instrument!("throttle_first", ?span);
            let scheduler = Arc::clone(&scheduler);
            let opened: Mutex<Option<Instant>> = Mutex::new(None);
            let upstream = subscriber.child();
            source.subscribe_with(
                move |signal: Signal<T>| match signal {
                    Signal::Item(item) => {
                        let now = scheduler.now();
                        let pass = {
                            let opened = &mut *opened.lock().unwrap();
                            let pass = opened.map_or(true, |start| now.duration_since(start) >= span);
                            if pass {
                                *opened = Some(now);
                            }
                            pass
                        };
                        if pass {
                            subscriber.next(item);
                        }
                    },
                    signal => subscriber.emit(signal),
                },
                upstream,
            );
        })
        .into()
    })
}
