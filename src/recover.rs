use std::sync::Arc;

use crate::{
    error::BoxError,
    utils::tracing::{instrument, trace},
    SerialSubscription, Signal, Source, Subscriber, Subscription,
};

/// Replaces an error with one last item produced from it, then completes.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::{fmt, sync::Arc};
///
/// use pushbag::{concat, error, for_each, from_iter, on_error_return};
///
/// #[derive(Debug)]
/// struct Oops;
///
/// impl fmt::Display for Oops {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "oops")
///     }
/// }
///
/// impl std::error::Error for Oops {}
///
/// let actual = Arc::new(SegQueue::new());
///
/// for_each({
///     let actual = Arc::clone(&actual);
///     move |x| actual.push(x)
/// })(on_error_return(|error| error.to_string())(concat!(
///     from_iter(["a".to_owned()]),
///     error(Oops),
/// )));
///
/// assert_eq!(actual.pop(), Some("a".to_owned()));
/// assert_eq!(actual.pop(), Some("oops".to_owned()));
/// assert_eq!(actual.pop(), None);
/// ```
pub fn on_error_return<T: 'static, F: 'static, S>(f: F) -> Box<dyn Fn(S) -> Source<T>>
where
    F: Fn(BoxError) -> T + Send + Sync + Clone,
    S: Into<Arc<Source<T>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        let f = f.clone();
        (move |subscriber: Subscriber<T>| {
            instrument!("on_error_return");
            let f = f.clone();
            let upstream = subscriber.child();
            source.subscribe_with(
                move |signal: Signal<T>| match signal {
                    Signal::Error(error) => {
                        trace!("recovering with a final item");
                        subscriber.next(f(error));
                        subscriber.complete();
                    },
                    signal => subscriber.emit(signal),
                },
                upstream,
            );
        })
        .into()
    })
}

/// Replaces an error with the source returned by `f`, continuing with its signals.
///
/// The fallback source's own errors are forwarded as they are.
pub fn on_error_resume_next<T: 'static, F: 'static, S, R>(f: F) -> Box<dyn Fn(S) -> Source<T>>
where
    F: Fn(BoxError) -> R + Send + Sync + Clone,
    S: Into<Arc<Source<T>>>,
    R: Into<Arc<Source<T>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        let f = f.clone();
        (move |subscriber: Subscriber<T>| {
            instrument!("on_error_resume_next");
            let f = f.clone();
            let current = SerialSubscription::new();
            subscriber.add_teardown({
                let current = current.clone();
                move || current.cancel()
            });
            let upstream = Subscription::new();
            current.set(upstream.clone());
            source.subscribe_with(
                move |signal: Signal<T>| match signal {
                    Signal::Error(error) => {
                        trace!("resuming with a fallback source");
                        let fallback: Arc<Source<T>> = f(error).into();
                        let resumed = Subscription::new();
                        current.set(resumed.clone());
                        fallback.subscribe_with(
                            {
                                let subscriber = subscriber.clone();
                                move |signal: Signal<T>| subscriber.emit(signal)
                            },
                            resumed,
                        );
                    },
                    signal => subscriber.emit(signal),
                },
                upstream,
            );
        })
        .into()
    })
}

/// Resubscribes to the source after an error, up to `attempts` times.
///
/// Items delivered before an error are not taken back. The error is forwarded once the
/// attempts are used up. Every resubscription reruns the source from the start, so the source
/// should be safe to subscribe to repeatedly, as with [`defer`][crate::defer()].
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::{
///     fmt,
///     sync::{
///         atomic::{AtomicUsize, Ordering},
///         Arc,
///     },
/// };
///
/// use pushbag::{for_each, generate, retry};
///
/// #[derive(Debug)]
/// struct Flaky;
///
/// impl fmt::Display for Flaky {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "flaky")
///     }
/// }
///
/// impl std::error::Error for Flaky {}
///
/// let attempts = Arc::new(AtomicUsize::new(0));
/// let actual = Arc::new(SegQueue::new());
///
/// let source = generate({
///     let attempts = Arc::clone(&attempts);
///     move |subscriber| {
///         if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
///             return Err(Flaky);
///         }
///         subscriber.next("done");
///         subscriber.complete();
///         Ok(())
///     }
/// });
///
/// for_each({
///     let actual = Arc::clone(&actual);
///     move |x| actual.push(x)
/// })(retry(3)(source));
///
/// assert_eq!(attempts.load(Ordering::SeqCst), 3);
/// assert_eq!(actual.pop(), Some("done"));
/// ```
pub fn retry<T: 'static, S>(attempts: usize) -> Box<dyn Fn(S) -> Source<T>>
where
    S: Into<Arc<Source<T>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        (move |subscriber: Subscriber<T>| {
            instrument!("retry", attempts);
            let current = SerialSubscription::new();
            subscriber.add_teardown({
                let current = current.clone();
                move || current.cancel()
            });
            attempt(Arc::clone(&source), attempts, subscriber, current);
        })
        .into()
    })
}

fn attempt<T: 'static>(
    source: Arc<Source<T>>,
    remaining: usize,
    subscriber: Subscriber<T>,
    current: SerialSubscription,
) {
    if subscriber.is_closed() {
        return;
    }
    let subscription = Subscription::new();
    current.set(subscription.clone());
    source.clone().subscribe_with(
        move |signal: Signal<T>| match signal {
            Signal::Error(_) if remaining > 0 => {
                trace!(remaining, "retrying after error");
                attempt(
                    Arc::clone(&source),
                    remaining - 1,
                    subscriber.clone(),
                    current.clone(),
                );
            },
            signal => subscriber.emit(signal),
        },
        subscription,
    );
}
