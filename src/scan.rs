use std::sync::{Arc, Mutex};

use crate::{utils::tracing::instrument, Signal, Source, Subscriber};

/// Operator that combines consecutive items from the same source.
///
/// It's essentially like [`Iterator::scan`], delivering a new accumulated value for each item
/// from the source. Every subscription starts again from `seed`.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::sync::Arc;
///
/// use pushbag::{for_each, from_iter, scan};
///
/// let actual = Arc::new(SegQueue::new());
///
/// let running_max = scan(|max: i32, x: i32| max.max(x), i32::MIN)(from_iter([3, 1, 4, 1, 5]));
///
/// for_each({
///     let actual = Arc::clone(&actual);
///     move |x| actual.push(x)
/// })(running_max);
///
/// let actual: Vec<_> = std::iter::from_fn(|| actual.pop()).collect();
/// assert_eq!(actual, [3, 3, 4, 4, 5]);
/// ```
pub fn scan<I: 'static, O: 'static, F: 'static, S>(
    reducer: F,
    seed: O,
) -> Box<dyn Fn(S) -> Source<O>>
where
    O: Clone + Send + Sync,
    F: Fn(O, I) -> O + Clone + Send + Sync,
    S: Into<Arc<Source<I>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<I>> = source.into();
        let reducer = reducer.clone();
        let seed = seed.clone();
        (move |subscriber: Subscriber<O>| {
            instrument!("scan");
            let reducer = reducer.clone();
            let acc = Mutex::new(seed.clone());
            let upstream = subscriber.child();
            source.subscribe_with(
                move |signal: Signal<I>| match signal {
                    Signal::Item(item) => {
                        let next = {
                            let acc = &mut *acc.lock().unwrap();
                            *acc = reducer(acc.clone(), item);
                            acc.clone()
                        };
                        subscriber.next(next);
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
