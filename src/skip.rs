use std::sync::{
    atomic::{AtomicUsize, Ordering as AtomicOrdering},
    Arc,
};

use crate::{utils::tracing::instrument, Signal, Source, Subscriber};

/// Operator that skips the first `max` items of a source.
pub fn skip<T: 'static, S>(max: usize) -> Box<dyn Fn(S) -> Source<T>>
where
    S: Into<Arc<Source<T>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        (move |subscriber: Subscriber<T>| {
            instrument!("skip", max);
            let skipped = AtomicUsize::new(0);
            let upstream = subscriber.child();
            source.subscribe_with(
                move |signal: Signal<T>| match signal {
                    Signal::Item(item) => {
                        if skipped.load(AtomicOrdering::Acquire) < max {
                            skipped.fetch_add(1, AtomicOrdering::AcqRel);
                        } else {
                            subscriber.next(item);
                        }
                    },
                    Signal::Error(error) => subscriber.error(error),
                    Signal::Complete => subscriber.complete(),
                },
                upstream,
            );
        })
        .into()
    })
}
