use std::{sync::Arc, time::Duration};

use crate::{
    amb, error::TimeoutError, scheduler::Scheduler, timer, try_map, utils::tracing::instrument,
    Source, Subscriber,
};

/// Fails with [`TimeoutError`] unless the source signals within `span` of subscription.
///
/// The source and a timer race: whichever signals first wins and the other is cancelled. Once
/// the source has signalled anything, later gaps between items are not timed.
///
/// # Examples
///
/// ```
/// use assert_matches::assert_matches;
/// use std::{
///     sync::{Arc, Mutex},
///     time::Duration,
/// };
///
/// use pushbag::{never, scheduler::VirtualTimeScheduler, timeout, Signal, TimeoutError};
///
/// let scheduler = Arc::new(VirtualTimeScheduler::new());
/// let last = Arc::new(Mutex::new(None));
///
/// timeout(Duration::from_millis(100), scheduler.clone())(never::<i32>()).subscribe({
///     let last = Arc::clone(&last);
///     move |signal: Signal<i32>| *last.lock().unwrap() = Some(signal)
/// });
///
/// scheduler.advance_by(Duration::from_millis(100));
///
/// assert_matches!(
///     &*last.lock().unwrap(),
///     Some(Signal::Error(error)) if error.downcast_ref::<TimeoutError>().is_some()
/// );
/// ```
pub fn timeout<T: 'static, S>(
    span: Duration,
    scheduler: Arc<dyn Scheduler>,
) -> Box<dyn Fn(S) -> Source<T>>
where
    S: Into<Arc<Source<T>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        let alarm: Arc<Source<T>> = Arc::new(try_map(move |()| Err::<T, _>(TimeoutError(span)))(
            timer(span, Arc::clone(&scheduler)),
        ));
        let raced = amb!(source, alarm);
        (move |subscriber: Subscriber<T>| {
            instrument!("timeout", ?span);
            raced(subscriber);
        })
        .into()
    })
}
