use std::sync::Arc;

use crate::{
    utils::tracing::{instrument, trace},
    SerialSubscription, Signal, Source, Subscriber, Subscription,
};

/// Emits all items of each source in turn, subscribing to the next only after the previous one
/// completed.
///
/// An error from any source is forwarded and nothing further is subscribed.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::sync::Arc;
///
/// use pushbag::{concat, for_each, from_iter};
///
/// let actual = Arc::new(SegQueue::new());
///
/// let source = concat!(from_iter(["10", "20", "30"]), from_iter(["a", "b"]));
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
///     ["10", "20", "30", "a", "b"]
/// );
/// ```
#[macro_export]
macro_rules! concat {
    ($($s:expr),* $(,)?) => {
        $crate::concat(::std::vec![$($s),*].into_boxed_slice())
    };
}

/// Emits all items of each source in turn.
///
/// See [`concat!`].
#[doc(hidden)]
pub fn concat<T: 'static, S>(sources: Box<[S]>) -> Source<T>
where
    S: Into<Arc<Source<T>>>,
{
    let sources: Arc<[Arc<Source<T>>]> =
        Vec::from(sources).into_iter().map(|s| s.into()).collect();
    (move |subscriber: Subscriber<T>| {
        instrument!("concat", n = sources.len());
        let current = SerialSubscription::new();
        subscriber.add_teardown({
            let current = current.clone();
            move || current.cancel()
        });
        subscribe_next(Arc::clone(&sources), 0, subscriber, current);
    })
    .into()
}

fn subscribe_next<T: 'static>(
    sources: Arc<[Arc<Source<T>>]>,
    i: usize,
    subscriber: Subscriber<T>,
    current: SerialSubscription,
) {
    let Some(source) = sources.get(i).cloned() else {
        subscriber.complete();
        return;
    };
    if subscriber.is_closed() {
        return;
    }
    trace!("concat subscribing to source {i}");
    let upstream = Subscription::new();
    current.set(upstream.clone());
    source.subscribe_with(
        {
            let current = current.clone();
            let upstream = upstream.clone();
            move |signal: Signal<T>| match signal {
                Signal::Item(item) => subscriber.next(item),
                Signal::Error(error) => subscriber.error(error),
                Signal::Complete => {
                    current.clear_if(&upstream);
                    subscribe_next(
                        Arc::clone(&sources),
                        i + 1,
                        subscriber.clone(),
                        current.clone(),
                    );
                },
            }
        },
        upstream,
    );
}
