use std::{
    mem,
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{
    scheduler::Scheduler,
    utils::{
        serialize::Serializer,
        tracing::{instrument, trace},
    },
    Signal, Source, Subscriber, Subscription,
};

/// Collects items into `Vec`s of `count` items each.
///
/// A trailing partial buffer is delivered when the source completes, unless it is empty.
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
/// use pushbag::{buffer_count, for_each, range};
///
/// let actual = Arc::new(SegQueue::new());
///
/// for_each({
///     let actual = Arc::clone(&actual);
///     move |x| actual.push(x)
/// })(buffer_count(2)(range(1, 5)));
///
/// assert_eq!(actual.pop(), Some(vec![1, 2]));
/// assert_eq!(actual.pop(), Some(vec![3, 4]));
/// assert_eq!(actual.pop(), Some(vec![5]));
/// assert_eq!(actual.pop(), None);
/// ```
pub fn buffer_count<T: 'static, S>(count: usize) -> Box<dyn Fn(S) -> Source<Vec<T>>>
where
    T: Send,
    S: Into<Arc<Source<T>>>,
{
    assert!(count > 0, "buffer count must be positive");
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        (move |subscriber: Subscriber<Vec<T>>| {
            instrument!("buffer_count", count);
            let buffer = Mutex::new(Vec::with_capacity(count));
            let upstream = subscriber.child();
            source.subscribe_with(
                move |signal: Signal<T>| match signal {
                    Signal::Item(item) => {
                        let full = {
                            let buffer = &mut *buffer.lock().unwrap();
                            buffer.push(item);
                            if buffer.len() == count {
                                Some(mem::replace(buffer, Vec::with_capacity(count)))
                            } else {
                                None
                            }
                        };
                        if let Some(full) = full {
                            subscriber.next(full);
                        }
                    },
                    Signal::Error(error) => subscriber.error(error),
                    Signal::Complete => {
                        let rest = mem::take(&mut *buffer.lock().unwrap());
                        if !rest.is_empty() {
                            subscriber.next(rest);
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

/// Collects the items arriving during each `span` into a `Vec`.
///
/// Spans in which nothing arrived deliver nothing. Whatever is buffered when the source
/// completes is delivered right before completion.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::{sync::Arc, time::Duration};
///
/// use pushbag::{buffer_time, for_each, interval, scheduler::VirtualTimeScheduler};
///
/// let scheduler = Arc::new(VirtualTimeScheduler::new());
///
/// let actual = Arc::new(SegQueue::new());
///
/// let subscription = for_each({
///     let actual = Arc::clone(&actual);
///     move |x| actual.push(x)
/// })(buffer_time(Duration::from_millis(250), scheduler.clone())(interval(
///     Duration::from_millis(100),
///     scheduler.clone(),
/// )));
///
/// scheduler.advance_by(Duration::from_millis(500));
/// subscription.cancel();
///
/// assert_eq!(actual.pop(), Some(vec![0, 1]));
/// assert_eq!(actual.pop(), Some(vec![2, 3]));
/// assert_eq!(actual.pop(), None);
/// ```
pub fn buffer_time<T: 'static, S>(
    span: Duration,
    scheduler: Arc<dyn Scheduler>,
) -> Box<dyn Fn(S) -> Source<Vec<T>>>
where
    T: Send,
    S: Into<Arc<Source<T>>>,
{
    buffered(span, None, scheduler)
}

/// Like [`buffer_time`], but also delivers a buffer as soon as it holds `count` items.
///
/// The span timer keeps its own pace; filling a buffer does not restart it.
///
/// # Panics
///
/// Panics if `count` is zero.
pub fn buffer_time_or_count<T: 'static, S>(
    span: Duration,
    count: usize,
    scheduler: Arc<dyn Scheduler>,
) -> Box<dyn Fn(S) -> Source<Vec<T>>>
where
    T: Send,
    S: Into<Arc<Source<T>>>,
{
    assert!(count > 0, "buffer count must be positive");
    buffered(span, Some(count), scheduler)
}

fn buffered<T: 'static, S>(
    span: Duration,
    count: Option<usize>,
    scheduler: Arc<dyn Scheduler>,
) -> Box<dyn Fn(S) -> Source<Vec<T>>>
where
    T: Send,
    S: Into<Arc<Source<T>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        let scheduler = Arc::clone(&scheduler);
        (move |subscriber: Subscriber<Vec<T>>| {
            instrument!("buffer_time", ?span, ?count);
            let serializer = Arc::new(Serializer::new(subscriber.clone()));
            let buffer: Arc<Mutex<Vec<T>>> = Arc::new(Mutex::new(vec![]));
            let ticks = scheduler.schedule_periodic(
                Box::new({
                    let serializer = Arc::clone(&serializer);
                    let buffer = Arc::clone(&buffer);
                    move |_ticks: &Subscription| {
                        {
                            let buffer = &mut *buffer.lock().unwrap();
                            if buffer.is_empty() {
                                trace!("nothing buffered this span");
                            } else {
                                serializer.push(Signal::Item(mem::take(buffer)));
                            }
                        }
                        serializer.drain();
                    }
                }),
                span,
            );
            subscriber.add(ticks);
            source.subscribe_with(
                move |signal: Signal<T>| {
                    {
                        let buffer = &mut *buffer.lock().unwrap();
                        match signal {
                            Signal::Item(item) => {
                                buffer.push(item);
                                if Some(buffer.len()) == count {
                                    serializer.push(Signal::Item(mem::take(buffer)));
                                }
                            },
                            Signal::Error(error) => serializer.push(Signal::Error(error)),
                            Signal::Complete => {
                                if !buffer.is_empty() {
                                    serializer.push(Signal::Item(mem::take(buffer)));
                                }
                                serializer.push(Signal::Complete);
                            },
                        }
                    }
                    serializer.drain();
                },
                subscriber.child(),
            );
        })
        .into()
    })
}
