use arc_swap::ArcSwap;
use std::{
    fmt,
    sync::{Arc, Mutex},
};

use crate::{error::BoxError, utils::tracing::trace, Signal, Sink, Source, Subscriber};

struct Hub<T> {
    subscribers: ArcSwap<Vec<Subscriber<T>>>,
    terminal: Mutex<Option<Signal<T>>>,
}

/// A multicast hub: every signal pushed in is delivered to all current subscribers.
///
/// Subscribers only see what is pushed after they attached. Once the subject has terminated,
/// new subscribers immediately receive the same terminal signal. Pushing is expected to be
/// serialized by the caller, as for any [`Sink`].
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::sync::Arc;
///
/// use pushbag::{for_each, Subject};
///
/// let subject = Subject::new();
/// let actual = Arc::new(SegQueue::new());
///
/// subject.next(1);
///
/// for_each({
///     let actual = Arc::clone(&actual);
///     move |x| actual.push(x)
/// })(subject.source());
///
/// subject.next(2);
/// subject.next(3);
/// subject.complete();
/// subject.next(4);
///
/// assert_eq!(actual.pop(), Some(2));
/// assert_eq!(actual.pop(), Some(3));
/// assert_eq!(actual.pop(), None);
/// ```
pub struct Subject<T>(Arc<Hub<T>>);

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Subject(Arc::clone(&self.0))
    }
}

impl<T: Clone + Send + 'static> Subject<T> {
    pub fn new() -> Self {
        Subject(Arc::new(Hub {
            subscribers: ArcSwap::from_pointee(vec![]),
            terminal: Mutex::new(None),
        }))
    }

    pub fn next(&self, item: T) {
        for subscriber in self.0.subscribers.load().iter() {
            subscriber.next(item.clone());
        }
    }

    pub fn error(&self, error: BoxError) {
        self.emit(Signal::Error(error));
    }

    pub fn complete(&self) {
        self.emit(Signal::Complete);
    }

    pub fn emit(&self, signal: Signal<T>) {
        match signal {
            Signal::Item(item) => self.next(item),
            signal => {
                let subscribers = {
                    let terminal = &mut *self.0.terminal.lock().unwrap();
                    if terminal.is_some() {
                        return;
                    }
                    *terminal = Some(signal.clone());
                    self.0.subscribers.swap(Arc::new(vec![]))
                };
                trace!(subscribers = subscribers.len(), "subject terminated");
                for subscriber in subscribers.iter() {
                    subscriber.emit(signal.clone());
                }
            },
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.0.terminal.lock().unwrap().is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.subscribers.load().len()
    }

    /// Attaches `subscriber`, or hands it the terminal signal if the subject already ended.
    pub(crate) fn attach(&self, subscriber: Subscriber<T>) {
        let terminal = self.0.terminal.lock().unwrap();
        if let Some(signal) = terminal.clone() {
            drop(terminal);
            subscriber.emit(signal);
            return;
        }
        self.0.subscribers.rcu(|subscribers| {
            let mut subscribers = (**subscribers).clone();
            subscribers.push(subscriber.clone());
            subscribers
        });
        drop(terminal);
        let hub = Arc::downgrade(&self.0);
        let subscription = subscriber.subscription().clone();
        subscriber.add_teardown(move || {
            if let Some(hub) = hub.upgrade() {
                hub.subscribers.rcu(|subscribers| {
                    let mut subscribers = (**subscribers).clone();
                    subscribers.retain(|s| *s.subscription() != subscription);
                    subscribers
                });
            }
        });
    }

    /// A source attaching every subscriber to this subject.
    pub fn source(&self) -> Source<T> {
        let subject = self.clone();
        (move |subscriber: Subscriber<T>| subject.attach(subscriber)).into()
    }
}

impl<T: Clone + Send + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> From<Subject<T>> for Sink<T> {
    fn from(subject: Subject<T>) -> Self {
        (move |signal: Signal<T>| subject.emit(signal)).into()
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("subscribers", &self.0.subscribers.load().len())
            .finish()
    }
}
