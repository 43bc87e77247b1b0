use std::{
    fmt,
    ops::Deref,
    sync::{Arc, Mutex},
};

use crate::{
    utils::tracing::{instrument, trace},
    Signal, Source, Subject, Subscriber, Subscription,
};

struct Connection<T> {
    subject: Subject<T>,
    live: Option<Subscription>,
}

struct Hot<T> {
    upstream: Arc<Source<T>>,
    state: Mutex<Connection<T>>,
}

/// A hot view of a source: every subscriber shares one upstream subscription, started by
/// [`connect`][ConnectableSource::connect].
///
/// Created by [`publish`].
pub struct ConnectableSource<T> {
    hot: Arc<Hot<T>>,
    source: Arc<Source<T>>,
}

impl<T: Clone + Send + 'static> ConnectableSource<T> {
    /// The hot view as a shareable source, for operators that want ownership.
    pub fn source(&self) -> Arc<Source<T>> {
        Arc::clone(&self.source)
    }

    /// Subscribes the shared subject to the upstream source.
    ///
    /// While connected, returns the live connection instead of connecting again. Cancelling
    /// the returned subscription disconnects. Once a connection has ended, subscribers attach
    /// to a fresh subject that waits for the next `connect`.
    pub fn connect(&self) -> Subscription {
        let (subject, connection) = {
            let state = &mut *self.hot.state.lock().unwrap();
            if let Some(live) = &state.live {
                if !live.is_closed() {
                    return live.clone();
                }
            }
            if state.subject.is_terminated() {
                state.subject = Subject::new();
            }
            let connection = Subscription::new();
            state.live = Some(connection.clone());
            (state.subject.clone(), connection)
        };
        trace!("connecting");
        self.hot.upstream.subscribe_with(
            {
                let hot = Arc::clone(&self.hot);
                move |signal: Signal<T>| {
                    let terminal = signal.is_terminal();
                    subject.emit(signal);
                    if terminal {
                        let state = &mut *hot.state.lock().unwrap();
                        if state.subject.is_terminated() {
                            state.subject = Subject::new();
                            state.live = None;
                        }
                    }
                }
            },
            connection.clone(),
        );
        connection
    }

    /// A source that connects when its first subscriber arrives and disconnects when its last
    /// subscriber leaves.
    pub fn ref_count(self) -> Source<T> {
        let source = self.source();
        let connectable = Arc::new(self);
        let counter: Arc<Mutex<RefCount>> = Arc::new(Mutex::new(RefCount::default()));
        (move |subscriber: Subscriber<T>| {
            instrument!("ref_count");
            let first = {
                let counter = &mut *counter.lock().unwrap();
                counter.subscribers += 1;
                counter.subscribers == 1
            };
            subscriber.add_teardown({
                let counter = Arc::clone(&counter);
                move || {
                    let connection = {
                        let counter = &mut *counter.lock().unwrap();
                        counter.subscribers -= 1;
                        if counter.subscribers == 0 {
                            counter.connection.take()
                        } else {
                            None
                        }
                    };
                    if let Some(connection) = connection {
                        trace!("last subscriber left, disconnecting");
                        connection.cancel();
                    }
                }
            });
            source(subscriber);
            if first {
                let connection = connectable.connect();
                let stale = {
                    let counter = &mut *counter.lock().unwrap();
                    if counter.subscribers > 0 {
                        counter.connection.replace(connection)
                    } else {
                        Some(connection)
                    }
                };
                if let Some(stale) = stale {
                    stale.cancel();
                }
            }
        })
        .into()
    }
}

#[derive(Default)]
struct RefCount {
    subscribers: usize,
    connection: Option<Subscription>,
}

impl<T> Deref for ConnectableSource<T> {
    type Target = Source<T>;

    fn deref(&self) -> &Self::Target {
        &*self.source
    }
}

impl<T> fmt::Debug for ConnectableSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectableSource<{}>", std::any::type_name::<T>())
    }
}

/// Turns a source into a [`ConnectableSource`].
///
/// Subscribing to the result attaches to a [`Subject`] without subscribing upstream. Nothing
/// flows until [`connect`][ConnectableSource::connect] is called.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::sync::Arc;
///
/// use pushbag::{for_each, from_iter, publish};
///
/// let actual = Arc::new(SegQueue::new());
///
/// let connectable = publish(from_iter([1, 2, 3]));
///
/// for tag in ["a", "b"] {
///     for_each({
///         let actual = Arc::clone(&actual);
///         move |x: i32| actual.push(format!("{tag}{x}"))
///     })(connectable.source());
/// }
///
/// assert!(actual.is_empty());
/// connectable.connect();
///
/// assert_eq!(
///     &{
///         let mut v = vec![];
///         while let Some(x) = actual.pop() {
///             v.push(x);
///         }
///         v
///     }[..],
///     ["a1", "b1", "a2", "b2", "a3", "b3"]
/// );
/// ```
pub fn publish<T: 'static, S>(source: S) -> ConnectableSource<T>
where
    T: Clone + Send,
    S: Into<Arc<Source<T>>>,
{
    let hot = Arc::new(Hot {
        upstream: source.into(),
        state: Mutex::new(Connection {
            subject: Subject::new(),
            live: None,
        }),
    });
    let source: Arc<Source<T>> = {
        let hot = Arc::clone(&hot);
        Arc::new(
            (move |subscriber: Subscriber<T>| {
                instrument!("publish");
                let subject = hot.state.lock().unwrap().subject.clone();
                subject.attach(subscriber);
            })
            .into(),
        )
    };
    ConnectableSource { hot, source }
}

/// Broadcasts a single source to multiple subscribers.
///
/// Does reference counting on subscribers and starts the source when the first subscriber
/// arrives, similar to [RxJS `.share()`][rxjs-share]. When the last subscriber leaves the
/// upstream subscription is cancelled; a later subscriber starts it again.
///
/// # Examples
///
/// Share a source to two subscribers, the second joining late:
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::{sync::Arc, time::Duration};
///
/// use pushbag::{for_each, interval, scheduler::VirtualTimeScheduler, share};
///
/// let scheduler = Arc::new(VirtualTimeScheduler::new());
///
/// let actual_1 = Arc::new(SegQueue::new());
/// let actual_2 = Arc::new(SegQueue::new());
///
/// let source = Arc::new(share(interval(Duration::from_millis(1_000), scheduler.clone())));
///
/// let subscription_1 = for_each({
///     let actual_1 = Arc::clone(&actual_1);
///     move |x| actual_1.push(x)
/// })(Arc::clone(&source));
///
/// scheduler.advance_by(Duration::from_millis(3_500));
///
/// let subscription_2 = for_each({
///     let actual_2 = Arc::clone(&actual_2);
///     move |x| actual_2.push(x)
/// })(Arc::clone(&source));
///
/// scheduler.advance_by(Duration::from_millis(2_000));
/// subscription_1.cancel();
/// subscription_2.cancel();
/// scheduler.advance_by(Duration::from_millis(2_000));
///
/// assert_eq!(
///     &{
///         let mut v = vec![];
///         while let Some(x) = actual_1.pop() {
///             v.push(x);
///         }
///         v
///     }[..],
///     [0, 1, 2, 3, 4]
/// );
/// assert_eq!(
///     &{
///         let mut v = vec![];
///         while let Some(x) = actual_2.pop() {
///             v.push(x);
///         }
///         v
///     }[..],
///     [3, 4]
/// );
/// assert_eq!(scheduler.pending(), 0);
/// ```
///
/// [rxjs-share]: https://rxjs.dev/api/operators/share
pub fn share<T: 'static, S>(source: S) -> Source<T>
where
    T: Clone + Send,
    S: Into<Arc<Source<T>>>,
{
    publish(source).ref_count()
}
