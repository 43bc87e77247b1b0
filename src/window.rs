use std::sync::{Arc, Mutex};

use crate::{utils::tracing::instrument, Signal, Source, Subject, Subscriber};

struct Window<T> {
    subject: Subject<T>,
    len: usize,
}

/// Splits the source into consecutive windows of `count` items, each delivered as its own
/// source.
///
/// A window is opened by the first item that belongs to it, and completes after its `count`-th
/// item or when the source ends. Windows are hot: a subscriber only receives the items that
/// arrive after it subscribed, so subscribe to each window as it is delivered.
///
/// # Panics
///
/// Panics if `count` is zero.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::sync::Arc;
///
/// use pushbag::{buffer_count, for_each, range, window_count};
///
/// let actual = Arc::new(SegQueue::new());
///
/// for_each({
///     let actual = Arc::clone(&actual);
///     move |window| {
///         for_each({
///             let actual = Arc::clone(&actual);
///             move |items| actual.push(items)
///         })(buffer_count(10)(window));
///     }
/// })(window_count(2)(range(1, 5)));
///
/// assert_eq!(actual.pop(), Some(vec![1, 2]));
/// assert_eq!(actual.pop(), Some(vec![3, 4]));
/// assert_eq!(actual.pop(), Some(vec![5]));
/// assert_eq!(actual.pop(), None);
/// ```
pub fn window_count<T: 'static, S>(count: usize) -> Box<dyn Fn(S) -> Source<Source<T>>>
where
    T: Clone + Send,
    S: Into<Arc<Source<T>>>,
{
    assert!(count > 0, "window count must be positive");
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        (move |subscriber: Subscriber<Source<T>>| {
            instrument!("window_count", count);
            let current: Mutex<Option<Window<T>>> = Mutex::new(None);
            let upstream = subscriber.child();
            source.subscribe_with(
                move |signal: Signal<T>| match signal {
                    Signal::Item(item) => {
                        let (subject, opened, full) = {
                            let current = &mut *current.lock().unwrap();
                            let opened = current.is_none();
                            let window = current.get_or_insert_with(|| Window {
                                subject: Subject::new(),
                                len: 0,
                            });
                            window.len += 1;
                            let subject = window.subject.clone();
                            let full = window.len == count;
                            if full {
                                *current = None;
                            }
                            (subject, opened, full)
                        };
                        if opened {
                            subscriber.next(subject.source());
                        }
                        subject.next(item);
                        if full {
                            subject.complete();
                        }
                    },
                    Signal::Error(error) => {
                        let window = current.lock().unwrap().take();
                        if let Some(window) = window {
                            window.subject.error(Arc::clone(&error));
                        }
                        subscriber.error(error);
                    },
                    Signal::Complete => {
                        let window = current.lock().unwrap().take();
                        if let Some(window) = window {
                            window.subject.complete();
                        }
                        subscriber.complete();
                    },
                },
                upstream,
            );
        })
        .into()
    })
}
