use std::{
    collections::HashSet,
    hash::Hash,
    sync::{Arc, Mutex},
};

use crate::{utils::tracing::instrument, Signal, Source, Subscriber};

/// Operator that drops every item equal to one already forwarded.
///
/// Remembers every forwarded item for the lifetime of the subscription, so memory grows with the
/// number of distinct items.
pub fn distinct<T: 'static, S>() -> Box<dyn Fn(S) -> Source<T>>
where
    T: Eq + Hash + Clone + Send,
    S: Into<Arc<Source<T>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        (move |subscriber: Subscriber<T>| {
            instrument!("distinct");
            let seen = Mutex::new(HashSet::new());
            let upstream = subscriber.child();
            source.subscribe_with(
                move |signal: Signal<T>| match signal {
                    Signal::Item(item) => {
                        let fresh = seen.lock().unwrap().insert(item.clone());
                        if fresh {
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

/// Operator that drops items equal to the item right before them.
pub fn distinct_until_changed<T: 'static, S>() -> Box<dyn Fn(S) -> Source<T>>
where
    T: PartialEq + Clone + Send,
    S: Into<Arc<Source<T>>>,
{
    Box::new(move |source| {
        let source: Arc<Source<T>> = source.into();
        (move |subscriber: Subscriber<T>| {
            instrument!("distinct_until_changed");
            let last: Mutex<Option<T>> = Mutex::new(None);
            let upstream = subscriber.child();
            source.subscribe_with(
                move |signal: Signal<T>| match signal {
                    Signal::Item(item) => {
                        let changed = {
                            let last = &mut *last.lock().unwrap();
                            if last.as_ref() == Some(&item) {
                                false
                            } else {
                                *last = Some(item.clone());
                                true
                            }
                        };
                        if changed {
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
