use crate::{
    utils::tracing::{instrument, trace},
    Source, Subscriber,
};

/// Converts an [iterable][`IntoIterator`] or [`Iterator`] to a source.
///
/// Each subscriber iterates a fresh clone of `iter`, synchronously during the subscribe call,
/// and stops as soon as its subscription closes.
///
/// # Examples
///
/// Convert an iterable:
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::sync::Arc;
///
/// use pushbag::{for_each, from_iter};
///
/// let actual = Arc::new(SegQueue::new());
///
/// let source = from_iter([10, 20, 30, 40]);
///
/// for_each({
///     let actual = Arc::clone(&actual);
///     move |x| {
///         println!("{x}");
///         actual.push(x);
///     }
/// })(source);
///
/// assert_eq!(
///     &{
///         let mut v = vec![];
///         while let Some(x) = actual.pop() {
///             v.push(x);
///         }
///         v
///     }[..],
///     [10, 20, 30, 40]
/// );
/// ```
///
/// Every subscriber gets its own run over the iterator:
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::sync::Arc;
///
/// use pushbag::{for_each, from_iter};
///
/// let actual = Arc::new(SegQueue::new());
///
/// let source = Arc::new(from_iter(["a", "b"].into_iter().enumerate()));
///
/// for _ in 0..2 {
///     for_each({
///         let actual = Arc::clone(&actual);
///         move |x| actual.push(x)
///     })(Arc::clone(&source));
/// }
///
/// let actual: Vec<_> = std::iter::from_fn(|| actual.pop()).collect();
/// assert_eq!(actual, [(0, "a"), (1, "b"), (0, "a"), (1, "b")]);
/// ```
pub fn from_iter<T: 'static, I: 'static>(iter: I) -> Source<T>
where
    I: IntoIterator<Item = T> + Clone + Send + Sync,
{
    (move |subscriber: Subscriber<T>| {
        instrument!("from_iter");
        for item in iter.clone() {
            if subscriber.is_closed() {
                trace!("subscription closed, iteration stopped");
                return;
            }
            subscriber.next(item);
        }
        subscriber.complete();
    })
    .into()
}

/// A source of the given values, in order.
pub fn from_values<T: 'static>(values: Vec<T>) -> Source<T>
where
    T: Clone + Send + Sync,
{
    from_iter(values)
}

/// A source of `count` consecutive integers starting at `start`.
///
/// Stops early at `i64::MAX` rather than wrapping around.
pub fn range(start: i64, count: usize) -> Source<i64> {
    from_iter((start..=i64::MAX).take(count))
}
