use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{
    scheduler::Scheduler,
    utils::{
        serialize::Serializer,
        tracing::{instrument, trace},
    },
    SerialSubscription, Signal, Source, Subscriber,
};

struct Pending<T> {
    generation: u64,
    latest: Option<T>,
}

/// Delivers an item only once `span` has passed without another item arriving.
///
/// Every item replaces the pending one and restarts the wait. When the source completes, the
/// pending item is delivered right away, followed by completion.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::{sync::Arc, time::Duration};
///
/// use pushbag::{debounce, for_each, interval, scheduler::VirtualTimeScheduler, take};
///
/// let scheduler = Arc::new(VirtualTimeScheduler::new());
///
/// let actual = Arc::new(SegQueue::new());
///
/// for_each({
///     let actual = Arc::clone(&actual);
///     move |x| actual.push(x)
/// })(debounce(Duration::from_millis(50), scheduler.clone())(take(3)(interval(
///     Duration::from_millis(10),
///     scheduler.clone(),
/// ))));
///
/// scheduler.advance_by(Duration::from_millis(100));
///
/// assert_eq!(actual.pop(), Some(2));
/// assert_eq!(actual.pop(), None);
/// ```
pub fn debounce<T: 'static, S>(
    span: Duration,
    scheduler: Arc<dyn Scheduler>,
) -> Box<dyn Fn(S) -> Source<T>>
where
    T: Send,
    S: Into<Arc<Source<T>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        let scheduler = Arc::clone(&scheduler);
        (move |subscriber: Subscriber<T>| {
            instrument!("debounce", ?span);
            let serializer = Arc::new(Serializer::new(subscriber.clone()));
            let state = Arc::new(Mutex::new(Pending {
                generation: 0,
                latest: None,
            }));
            let timer = SerialSubscription::new();
            subscriber.add_teardown({
                let timer = timer.clone();
                move || timer.cancel()
            });
            let scheduler = Arc::clone(&scheduler);
            source.subscribe_with(
                move |signal: Signal<T>| match signal {
                    Signal::Item(item) => {
                        let generation = {
                            let state = &mut *state.lock().unwrap();
                            state.generation += 1;
                            state.latest = Some(item);
                            state.generation
                        };
                        let job = scheduler.schedule(
                            Box::new({
                                let serializer = Arc::clone(&serializer);
                                let state = Arc::clone(&state);
                                move || {
                                    {
                                        let state = &mut *state.lock().unwrap();
                                        if state.generation != generation {
                                            trace!("superseded before the quiet period ended");
                                        } else if let Some(item) = state.latest.take() {
                                            serializer.push(Signal::Item(item));
                                        }
                                    }
                                    serializer.drain();
                                }
                            }),
                            Some(span),
                        );
                        timer.set(job);
                    },
                    Signal::Error(error) => serializer.emit(Signal::Error(error)),
                    Signal::Complete => {
                        {
                            let state = &mut *state.lock().unwrap();
                            state.generation += 1;
                            if let Some(item) = state.latest.take() {
                                serializer.push(Signal::Item(item));
                            }
                            serializer.push(Signal::Complete);
                        }
                        serializer.drain();
                    },
                },
                subscriber.child(),
            );
        })
        .into()
    })
}
