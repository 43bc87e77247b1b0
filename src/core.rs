use std::{
    fmt::{self, Debug},
    ops::Deref,
    sync::Arc,
};

use crate::{
    error::BoxError,
    subscription::Subscription,
    utils::tracing::{instrument, trace},
};

/// A signal passed from a [`Source`] to a [`Sink`].
///
/// Zero or more `Item`s are followed by at most one terminal signal, `Error` or `Complete`.
/// Nothing is delivered after the terminal signal.
#[derive(Clone, Debug)]
pub enum Signal<T> {
    Item(T),
    Error(BoxError),
    Complete,
}

impl<T> Signal<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Signal::Item(_))
    }

    /// The variant name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Signal::Item(_) => "Item",
            Signal::Error(_) => "Error",
            Signal::Complete => "Complete",
        }
    }
}

pub type SinkFn<T> = Box<dyn Fn(Signal<T>) + Send + Sync>;

/// A `Sink` receives the signals delivered by a [`Source`].
///
/// Sinks may be called from any thread, but never concurrently for the same subscription.
pub struct Sink<T>(SinkFn<T>);

impl<T: 'static> Sink<T> {
    /// Builds a sink from one callback per signal.
    pub fn new<N, E, C>(on_item: N, on_error: E, on_complete: C) -> Self
    where
        N: Fn(T) + Send + Sync + 'static,
        E: Fn(BoxError) + Send + Sync + 'static,
        C: Fn() + Send + Sync + 'static,
    {
        Sink(Box::new(move |signal: Signal<T>| match signal {
            Signal::Item(item) => on_item(item),
            Signal::Error(error) => on_error(error),
            Signal::Complete => on_complete(),
        }))
    }

    pub fn on_item(&self, item: T) {
        (self.0)(Signal::Item(item));
    }

    pub fn on_error(&self, error: BoxError) {
        (self.0)(Signal::Error(error));
    }

    pub fn on_complete(&self) {
        (self.0)(Signal::Complete);
    }
}

impl<T> Deref for Sink<T> {
    type Target = SinkFn<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> Debug for Sink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sink<{}>", std::any::type_name::<T>())
    }
}

impl<T, F: 'static> From<F> for Sink<T>
where
    F: Fn(Signal<T>) + Send + Sync,
{
    fn from(handler: F) -> Self {
        Sink(Box::new(handler))
    }
}

pub type SourceFn<T> = Box<dyn Fn(Subscriber<T>) + Send + Sync>;

/// A `Source` is a lazy recipe for a sequence of signals.
///
/// Nothing happens until [`subscribe`][Source::subscribe] is called, and every call starts the
/// recipe over for that subscriber alone, unless the source was made hot with
/// [`publish`][crate::publish()] or [`share`][crate::share()].
///
/// Sources are immutable; share them through [`Arc`]. Every operator in this crate accepts
/// anything that is `Into<Arc<Source<T>>>`.
pub struct Source<T>(SourceFn<T>);

impl<T: 'static> Source<T> {
    /// Starts delivering this source's signals to `sink`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::{Arc, Mutex};
    ///
    /// use pushbag::{from_iter, Signal};
    ///
    /// let seen = Arc::new(Mutex::new(vec![]));
    ///
    /// let subscription = from_iter([1, 2, 3]).subscribe({
    ///     let seen = Arc::clone(&seen);
    ///     move |signal: Signal<i32>| {
    ///         if let Signal::Item(x) = signal {
    ///             seen.lock().unwrap().push(x);
    ///         }
    ///     }
    /// });
    ///
    /// assert_eq!(*seen.lock().unwrap(), [1, 2, 3]);
    /// assert!(subscription.is_closed());
    /// assert!(!subscription.is_cancelled());
    /// ```
    pub fn subscribe<K>(&self, sink: K) -> Subscription
    where
        K: Into<Sink<T>>,
    {
        let subscription = Subscription::new();
        self.subscribe_with(sink, subscription.clone());
        subscription
    }

    /// Like [`subscribe`][Source::subscribe], but delivers under a subscription created by the
    /// caller. Does nothing if `subscription` is already closed.
    pub fn subscribe_with<K>(&self, sink: K, subscription: Subscription)
    where
        K: Into<Sink<T>>,
    {
        if subscription.is_closed() {
            trace!("skipped subscribe on a closed subscription");
            return;
        }
        instrument!("subscribe");
        (self.0)(Subscriber::new(sink.into(), subscription));
    }
}

impl<T> Deref for Source<T> {
    type Target = SourceFn<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source<{}>", std::any::type_name::<T>())
    }
}

impl<T, F: 'static> From<F> for Source<T>
where
    F: Fn(Subscriber<T>) + Send + Sync,
{
    fn from(producer: F) -> Self {
        Source(Box::new(producer))
    }
}

/// The producer side of one subscription: a [`Sink`] paired with its [`Subscription`].
///
/// A `Subscriber` upholds the signal contract on behalf of whatever drives it. Items arriving
/// after the subscription closed are dropped, only the first terminal signal gets through, and
/// the subscription releases its resources right after that terminal signal.
pub struct Subscriber<T> {
    sink: Arc<Sink<T>>,
    subscription: Subscription,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Subscriber {
            sink: Arc::clone(&self.sink),
            subscription: self.subscription.clone(),
        }
    }
}

impl<T> Subscriber<T> {
    pub fn new(sink: Sink<T>, subscription: Subscription) -> Self {
        Subscriber {
            sink: Arc::new(sink),
            subscription,
        }
    }

    pub fn emit(&self, signal: Signal<T>) {
        trace!(signal = signal.kind(), "emit");
        if signal.is_terminal() {
            if self.subscription.terminate() {
                (self.sink)(signal);
                self.subscription.release();
            }
        } else if !self.subscription.is_closed() {
            (self.sink)(signal);
        }
    }

    pub fn next(&self, item: T) {
        self.emit(Signal::Item(item));
    }

    pub fn error(&self, error: BoxError) {
        self.emit(Signal::Error(error));
    }

    pub fn complete(&self) {
        self.emit(Signal::Complete);
    }

    /// Producers check this before every emission and stop once it returns `true`.
    pub fn is_closed(&self) -> bool {
        self.subscription.is_closed()
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// A new subscription that is cancelled when this one closes, for subscribing upstream.
    pub fn child(&self) -> Subscription {
        let child = Subscription::new();
        self.subscription.add(child.clone());
        child
    }

    pub fn add(&self, child: Subscription) {
        self.subscription.add(child);
    }

    pub fn add_teardown<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.subscription.add_teardown(action);
    }
}

impl<T> Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("sink", &self.sink)
            .field("subscription", &self.subscription)
            .finish()
    }
}

/// Conversion into a shared [`Source`], naming the item type so tuple impls can be written.
pub trait IntoArcSource {
    type Output;

    fn into_arc_source(self) -> Arc<Source<Self::Output>>;
}

impl<T> IntoArcSource for Arc<Source<T>> {
    type Output = T;

    fn into_arc_source(self) -> Arc<Source<Self::Output>> {
        self
    }
}

impl<T> IntoArcSource for Source<T> {
    type Output = T;

    fn into_arc_source(self) -> Arc<Source<Self::Output>> {
        Arc::new(self)
    }
}

impl<T> IntoArcSource for Box<Source<T>> {
    type Output = T;

    fn into_arc_source(self) -> Arc<Source<Self::Output>> {
        Arc::from(self)
    }
}
