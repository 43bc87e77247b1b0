use std::sync::{Arc, Mutex};

use crate::{utils::serialize::Serializer, utils::tracing::instrument, Signal, Source, Subscriber};

/// Pairs every item of the source with the latest item of `other`.
///
/// Items of the source arriving before `other` has sent anything are dropped. Completion of
/// `other` is ignored; its errors are forwarded.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::{sync::Arc, time::Duration};
///
/// use pushbag::{for_each, interval, scheduler::VirtualTimeScheduler, take, with_latest_from};
///
/// let scheduler = Arc::new(VirtualTimeScheduler::new());
///
/// let actual = Arc::new(SegQueue::new());
///
/// let source = with_latest_from(interval(Duration::from_millis(250), scheduler.clone()))(
///     take(5)(interval(Duration::from_millis(100), scheduler.clone())),
/// );
///
/// for_each({
///     let actual = Arc::clone(&actual);
///     move |x| {
///         println!("{:?}", x);
///         actual.push(x);
///     }
/// })(source);
///
/// scheduler.advance_by(Duration::from_millis(1_000));
///
/// assert_eq!(
///     &{
///         let mut v = vec![];
///         while let Some(x) = actual.pop() {
///             v.push(x);
///         }
///         v
///     }[..],
///     [(2, 0), (3, 0), (4, 1)]
/// );
/// ```
pub fn with_latest_from<T: 'static, U: 'static, S, O>(
    other: O,
) -> Box<dyn Fn(S) -> Source<(T, U)>>
where
    T: Send,
    U: Send + Clone,
    S: Into<Arc<Source<T>>>,
    O: Into<Arc<Source<U>>>,
{
    let other: Arc<Source<U>> = other.into();
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        let other = Arc::clone(&other);
        (move |subscriber: Subscriber<(T, U)>| {
            instrument!("with_latest_from");
            let serializer = Arc::new(Serializer::new(subscriber.clone()));
            let latest: Arc<Mutex<Option<U>>> = Arc::new(Mutex::new(None));
            other.subscribe_with(
                {
                    let serializer = Arc::clone(&serializer);
                    let latest = Arc::clone(&latest);
                    move |signal: Signal<U>| match signal {
                        Signal::Item(item) => {
                            *latest.lock().unwrap() = Some(item);
                        },
                        Signal::Error(error) => serializer.emit(Signal::Error(error)),
                        Signal::Complete => {},
                    }
                },
                subscriber.child(),
            );
            if subscriber.is_closed() {
                return;
            }
            source.subscribe_with(
                move |signal: Signal<T>| match signal {
                    Signal::Item(item) => {
                        let latest = latest.lock().unwrap().clone();
                        if let Some(latest) = latest {
                            serializer.emit(Signal::Item((item, latest)));
                        }
                    },
                    Signal::Error(error) => serializer.emit(Signal::Error(error)),
                    Signal::Complete => serializer.emit(Signal::Complete),
                },
                subscriber.child(),
            );
        })
        .into()
    })
}
