use std::sync::{Arc, Mutex};

use crate::{
    utils::{
        serialize::Serializer,
        tracing::{instrument, trace},
    },
    IntoArcSource, SerialSubscription, Signal, Source, Subscriber, Subscription,
};

#[derive(Default)]
struct SwitchState {
    outer_done: bool,
    current: u64,
    inner_active: bool,
}

/// Flattens a source of sources by always following the most recent inner source.
///
/// Each new inner source cancels the previous one before it is subscribed. Completes when the
/// outer source and the current inner source have both completed. Errors from either are
/// forwarded.
///
/// Like [ReactiveX `switch`][reactivex-switch]. Use it with [`map`] to get behavior equivalent
/// to [RxJS `switchMap`][rxjs-switch-map].
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::sync::Arc;
///
/// use pushbag::{for_each, from_iter, map, pipe, switch_latest};
///
/// let actual = Arc::new(SegQueue::new());
///
/// let source = pipe!(
///     from_iter("hi".chars()),
///     map(|r#char: char| pipe!(
///         from_iter([10, 20, 30]),
///         map(move |num: i32| format!("{}{}", r#char, num)),
///     )),
///     switch_latest,
///     for_each({
///         let actual = Arc::clone(&actual);
///         move |x: String| {
///             println!("{}", x);
///             actual.push(x.clone());
///         }
///     }),
/// );
///
/// assert_eq!(
///     &{
///         let mut v = vec![];
///         while let Some(x) = actual.pop() {
///             v.push(x);
///         }
///         v
///     }[..],
///     ["h10", "h20", "h30", "i10", "i20", "i30"]
/// );
/// ```
///
/// [`map`]: crate::map()
/// [reactivex-switch]: https://reactivex.io/documentation/operators/switch.html
/// [rxjs-switch-map]: https://rxjs.dev/api/operators/switchMap
pub fn switch_latest<T: 'static, S, R: 'static>(source: S) -> Source<T>
where
    T: Send,
    S: Into<Arc<Source<R>>>,
    R: IntoArcSource<Output = T>,
{
    let source: Arc<Source<R>> = source.into();
    (move |subscriber: Subscriber<T>| {
        instrument!("switch_latest");
        let serializer = Arc::new(Serializer::new(subscriber.clone()));
        let state = Arc::new(Mutex::new(SwitchState::default()));
        let inner = SerialSubscription::new();
        subscriber.add_teardown({
            let inner = inner.clone();
            move || inner.cancel()
        });
        source.subscribe_with(
            move |signal: Signal<R>| match signal {
                Signal::Item(next) => {
                    let id = {
                        let state = &mut *state.lock().unwrap();
                        state.current += 1;
                        state.inner_active = true;
                        state.current
                    };
                    trace!("switching to inner source {id}");
                    let subscription = Subscription::new();
                    inner.set(subscription.clone());
                    next.into_arc_source().subscribe_with(
                        {
                            let serializer = Arc::clone(&serializer);
                            let state = Arc::clone(&state);
                            move |signal: Signal<T>| {
                                {
                                    let state = &mut *state.lock().unwrap();
                                    if state.current != id {
                                        trace!("dropping a signal from replaced inner source {id}");
                                        return;
                                    }
                                    match signal {
                                        Signal::Complete => {
                                            state.inner_active = false;
                                            if state.outer_done {
                                                serializer.push(Signal::Complete);
                                            }
                                        },
                                        signal => serializer.push(signal),
                                    }
                                }
                                serializer.drain();
                            }
                        },
                        subscription,
                    );
                },
                Signal::Error(error) => {
                    serializer.push(Signal::Error(error));
                    serializer.drain();
                },
                Signal::Complete => {
                    {
                        let state = &mut *state.lock().unwrap();
                        state.outer_done = true;
                        if !state.inner_active {
                            serializer.push(Signal::Complete);
                        }
                    }
                    serializer.drain();
                },
            },
            subscriber.child(),
        );
    })
    .into()
}
