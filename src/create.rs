use std::{error::Error, sync::Arc};

use crate::{error::BoxError, utils::tracing::instrument, Source, Subscriber};

/// A source that completes immediately.
pub fn empty<T: 'static>() -> Source<T> {
    (|subscriber: Subscriber<T>| subscriber.complete()).into()
}

/// A source that fails immediately with `error`.
pub fn error<T: 'static, E>(error: E) -> Source<T>
where
    E: Error + Send + Sync + 'static,
{
    let error: BoxError = Arc::new(error);
    (move |subscriber: Subscriber<T>| subscriber.error(Arc::clone(&error))).into()
}

/// A source that never signals anything.
pub fn never<T: 'static>() -> Source<T> {
    (|_subscriber: Subscriber<T>| {}).into()
}

/// A source that calls `factory` on every subscribe and delivers the source it returns.
///
/// This is how per-subscriber ("cold") state is obtained: everything the factory creates is
/// private to one subscription, so two subscribers may observe different sequences.
///
/// # Examples
///
/// ```
/// use std::sync::{
///     atomic::{AtomicUsize, Ordering},
///     Arc, Mutex,
/// };
///
/// use pushbag::{defer, from_iter, Signal};
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let source = defer({
///     let calls = Arc::clone(&calls);
///     move || {
///         let n = calls.fetch_add(1, Ordering::SeqCst);
///         from_iter([n])
///     }
/// });
///
/// let seen = Arc::new(Mutex::new(vec![]));
/// for _ in 0..2 {
///     source.subscribe({
///         let seen = Arc::clone(&seen);
///         move |signal: Signal<usize>| {
///             if let Signal::Item(n) = signal {
///                 seen.lock().unwrap().push(n);
///             }
///         }
///     });
/// }
///
/// assert_eq!(*seen.lock().unwrap(), [0, 1]);
/// ```
pub fn defer<T: 'static, F: 'static, S>(factory: F) -> Source<T>
where
    F: Fn() -> S + Send + Sync,
    S: Into<Arc<Source<T>>>,
{
    (move |subscriber: Subscriber<T>| {
        instrument!("defer");
        let source: Arc<Source<T>> = factory().into();
        source(subscriber);
    })
    .into()
}

/// A source driven by a custom emit function.
///
/// `emit` receives the [`Subscriber`], which offers `next`/`error`/`complete` and the
/// cancellation check `is_closed`. Completion is up to `emit`, which may hand the subscriber to
/// another thread and return early. An `Err` returned by `emit` is delivered as the terminal
/// error.
///
/// # Examples
///
/// ```
/// use std::{
///     convert::Infallible,
///     sync::{Arc, Mutex},
/// };
///
/// use pushbag::{generate, take, Signal};
///
/// let naturals = generate(|subscriber| {
///     let mut n = 0;
///     while !subscriber.is_closed() {
///         subscriber.next(n);
///         n += 1;
///     }
///     Ok::<(), Infallible>(())
/// });
///
/// let seen = Arc::new(Mutex::new(vec![]));
/// take(3)(naturals).subscribe({
///     let seen = Arc::clone(&seen);
///     move |signal: Signal<u64>| {
///         if let Signal::Item(n) = signal {
///             seen.lock().unwrap().push(n);
///         }
///     }
/// });
///
/// assert_eq!(*seen.lock().unwrap(), [0, 1, 2]);
/// ```
pub fn generate<T: 'static, F: 'static, E>(emit: F) -> Source<T>
where
    F: Fn(&Subscriber<T>) -> Result<(), E> + Send + Sync,
    E: Error + Send + Sync + 'static,
{
    (move |subscriber: Subscriber<T>| {
        instrument!("generate");
        if let Err(error) = emit(&subscriber) {
            subscriber.error(Arc::new(error));
        }
    })
    .into()
}
