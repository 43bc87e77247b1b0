use std::sync::{
    atomic::{AtomicUsize, Ordering as AtomicOrdering},
    Arc,
};

use crate::{
    utils::{
        serialize::Serializer,
        tracing::{instrument, trace},
    },
    Signal, Source, Subscriber,
};

/// Merges items from multiple sources into one, in arrival order.
///
/// Completes once every source has completed; the first error from any source is forwarded and
/// cancels the others. Items from sources running on different threads are delivered one at a
/// time.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::{sync::Arc, time::Duration};
///
/// use pushbag::{for_each, interval, map, merge, pipe, scheduler::VirtualTimeScheduler, take};
///
/// let scheduler = Arc::new(VirtualTimeScheduler::new());
///
/// let actual = Arc::new(SegQueue::new());
///
/// let source = merge!(
///     pipe!(
///         interval(Duration::from_millis(100), scheduler.clone()),
///         map(|x: usize| format!("fast {x}")),
///     ),
///     pipe!(
///         interval(Duration::from_millis(350), scheduler.clone()),
///         map(|x: usize| format!("slow {x}")),
///     ),
/// );
///
/// for_each({
///     let actual = Arc::clone(&actual);
///     move |x| {
///         println!("{x}");
///         actual.push(x);
///     }
/// })(take(5)(source));
///
/// scheduler.advance_by(Duration::from_millis(650));
///
/// assert_eq!(
///     &{
///         let mut v = vec![];
///         while let Some(x) = actual.pop() {
///             v.push(x);
///         }
///         v
///     }[..],
///     ["fast 0", "fast 1", "fast 2", "slow 0", "fast 3"]
/// );
/// ```
#[macro_export]
macro_rules! merge {
    ($($s:expr),* $(,)?) => {
        $crate::merge(::std::vec![$($s),*].into_boxed_slice())
    };
}

/// Merges items from multiple sources into one, in arrival order.
///
/// See [`merge!`].
#[doc(hidden)]
pub fn merge<T: 'static, S>(sources: Box<[S]>) -> Source<T>
where
    T: Send,
    S: Into<Arc<Source<T>>>,
{
    let sources: Box<[Arc<Source<T>>]> = Vec::from(sources).into_iter().map(|s| s.into()).collect();
    (move |subscriber: Subscriber<T>| {
        instrument!("merge", n = sources.len());
        let n = sources.len();
        if n == 0 {
            subscriber.complete();
            return;
        }
        let serializer = Arc::new(Serializer::new(subscriber.clone()));
        let completed = Arc::new(AtomicUsize::new(0));
        for source in sources.iter() {
            if subscriber.is_closed() {
                trace!("merge closed while subscribing");
                return;
            }
            source.subscribe_with(
                {
                    let serializer = Arc::clone(&serializer);
                    let completed = Arc::clone(&completed);
                    move |signal: Signal<T>| match signal {
                        Signal::Complete => {
                            if completed.fetch_add(1, AtomicOrdering::AcqRel) + 1 == n {
                                serializer.emit(Signal::Complete);
                            }
                        },
                        signal => serializer.emit(signal),
                    }
                },
                subscriber.child(),
            );
        }
    })
    .into()
}
