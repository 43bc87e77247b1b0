use std::{error::Error, sync::Arc};

use crate::{utils::tracing::instrument, Signal, Source, Subscriber};

/// Operator that applies a transformation on items passing through it.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::sync::Arc;
///
/// use pushbag::{for_each, from_iter, map};
///
/// let actual = Arc::new(SegQueue::new());
///
/// let source = map(|x: i32| x * 2)(from_iter([10, 20, 30, 40]));
///
/// for_each({
///     let actual = Arc::clone(&actual);
///     move |x| {
///         println!("{x}");
///         actual.push(x);
///     }
/// })(source);
///
/// assert_eq!(
///     &{
///         let mut v = vec![];
///         while let Some(x) = actual.pop() {
///             v.push(x);
///         }
///         v
///     }[..],
///     [20, 40, 60, 80]
/// );
/// ```
pub fn map<I: 'static, O: 'static, F: 'static, S>(f: F) -> Box<dyn Fn(S) -> Source<O>>
where
    F: Fn(I) -> O + Send + Sync + Clone,
    S: Into<Arc<Source<I>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<I>> = source.into();
        let f = f.clone();
        (move |subscriber: Subscriber<O>| {
            instrument!("map");
            let f = f.clone();
            let upstream = subscriber.child();
            source.subscribe_with(
                move |signal: Signal<I>| match signal {
                    Signal::Item(item) => subscriber.next(f(item)),
                    Signal::Error(error) => subscriber.error(error),
                    Signal::Complete => subscriber.complete(),
                },
                upstream,
            );
        })
        .into()
    })
}

/// Like [`map`], for a transformation that can fail.
///
/// The first `Err` cancels the upstream subscription and is delivered as the terminal error.
pub fn try_map<I: 'static, O: 'static, E, F: 'static, S>(f: F) -> Box<dyn Fn(S) -> Source<O>>
where
    F: Fn(I) -> Result<O, E> + Send + Sync + Clone,
    E: Error + Send + Sync + 'static,
    S: Into<Arc<Source<I>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<I>> = source.into();
        let f = f.clone();
        (move |subscriber: Subscriber<O>| {
            instrument!("try_map");
            let f = f.clone();
            let upstream = subscriber.child();
            source.subscribe_with(
                {
                    let upstream = upstream.clone();
                    move |signal: Signal<I>| match signal {
                        Signal::Item(item) => match f(item) {
                            Ok(item) => subscriber.next(item),
                            Err(error) => {
                                upstream.cancel();
                                subscriber.error(Arc::new(error));
                            },
                        },
                        Signal::Error(error) => subscriber.error(error),
                        Signal::Complete => subscriber.complete(),
                    }
                },
                upstream,
            );
        })
        .into()
    })
}
