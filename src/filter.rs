use std::sync::Arc;

use crate::{utils::tracing::instrument, Signal, Source, Subscriber};

/// Operator that lets through only the items satisfying `condition`.
///
/// Rejected items are dropped without any signal.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::sync::Arc;
///
/// use pushbag::{filter, for_each, range};
///
/// let multiples = Arc::new(SegQueue::new());
///
/// for_each({
///     let multiples = Arc::clone(&multiples);
///     move |x| multiples.push(x)
/// })(filter(|x: &i64| x % 3 == 0)(range(1, 10)));
///
/// assert_eq!(multiples.pop(), Some(3));
/// assert_eq!(multiples.pop(), Some(6));
/// assert_eq!(multiples.pop(), Some(9));
/// assert_eq!(multiples.pop(), None);
/// ```
pub fn filter<I: 'static, F: 'static, S>(condition: F) -> Box<dyn Fn(S) -> Source<I>>
where
    F: Fn(&I) -> bool + Clone + Send + Sync,
    S: Into<Arc<Source<I>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<I>> = source.into();
        let condition = condition.clone();
        (move |subscriber: Subscriber<I>| {
            instrument!("filter");
            let condition = condition.clone();
            let upstream = subscriber.child();
            source.subscribe_with(
                move |signal: Signal<I>| match signal {
                    Signal::Item(item) => {
                        if condition(&item) {
                            subscriber.next(item);
                        }
                    },
                    Signal::Error(error) => subscriber.error(error),
                    Signal::Complete => subscriber.complete(),
                },
                upstream,
            );
        })
        .into()
    })
}
