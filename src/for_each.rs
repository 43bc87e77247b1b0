use std::sync::Arc;

use crate::{Signal, Source, Subscription};

/// Sink that calls `f` with every item of a source, ignoring how the source ends.
///
/// Returns the subscription, so the consumer can stop early.
pub fn for_each<T: 'static, F: 'static, S>(f: F) -> Box<dyn Fn(S) -> Subscription>
where
    F: Fn(T) + Send + Sync + Clone,
    S: Into<Arc<Source<T>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        let f = f.clone();
        source.subscribe(move |signal: Signal<T>| {
            if let Signal::Item(item) = signal {
                f(item);
            }
        })
    })
}
