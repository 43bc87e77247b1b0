use std::sync::{
    atomic::{AtomicUsize, Ordering as AtomicOrdering},
    Arc,
};

use crate::{
    utils::tracing::{instrument, trace},
    Signal, Source, Subscriber,
};

/// Operator that limits the amount of items sent by a source.
///
/// After the `max`-th item it cancels the upstream subscription and completes. `take(0)`
/// completes without subscribing upstream at all.
///
/// # Examples
///
/// On an infinite source:
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::sync::Arc;
///
/// use pushbag::{for_each, from_iter, take};
///
/// let actual = Arc::new(SegQueue::new());
///
/// let source = take(4)(from_iter(100..));
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
///     [100, 101, 102, 103]
/// );
/// ```
pub fn take<T: 'static, S>(max: usize) -> Box<dyn Fn(S) -> Source<T>>
where
    S: Into<Arc<Source<T>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        (move |subscriber: Subscriber<T>| {
            instrument!("take", max);
            if max == 0 {
                subscriber.complete();
                return;
            }
            let taken = AtomicUsize::new(0);
            let upstream = subscriber.child();
            source.subscribe_with(
                {
                    let upstream = upstream.clone();
                    move |signal: Signal<T>| match signal {
                        Signal::Item(item) => {
                            let taken = taken.fetch_add(1, AtomicOrdering::AcqRel) + 1;
                            if taken > max {
                                return;
                            }
                            subscriber.next(item);
                            if taken == max {
                                trace!("took {max}, cancelling upstream");
                                upstream.cancel();
                                subscriber.complete();
                            }
                        },
                        Signal::Error(error) => subscriber.error(error),
                        Signal::Complete => subscriber.complete(),
                    }
                },
                upstream,
            );
        })
        .into()
    })
}

/// Operator that forwards items while `predicate` holds, then cancels upstream and completes.
///
/// The first item failing the predicate is dropped.
pub fn take_while<T: 'static, F: 'static, S>(predicate: F) -> Box<dyn Fn(S) -> Source<T>>
where
    F: Fn(&T) -> bool + Clone + Send + Sync,
    S: Into<Arc<Source<T>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        let predicate = predicate.clone();
        (move |subscriber: Subscriber<T>| {
            instrument!("take_while");
            let predicate = predicate.clone();
            let upstream = subscriber.child();
            source.subscribe_with(
                {
                    let upstream = upstream.clone();
                    move |signal: Signal<T>| match signal {
                        Signal::Item(item) => {
                            if predicate(&item) {
                                subscriber.next(item);
                            } else {
                                upstream.cancel();
                                subscriber.complete();
                            }
                        },
                        Signal::Error(error) => subscriber.error(error),
                        Signal::Complete => subscriber.complete(),
                    }
                },
                upstream,
            );
        })
        .into()
    })
}
