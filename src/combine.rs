use paste::paste;
use std::sync::{Arc, Mutex};

use crate::{
    utils::{serialize::Serializer, tracing::instrument},
    IntoArcSource, Signal, Source, Subscriber,
};

/// Combines the latest items from multiple (2 to 8) sources.
///
/// Nothing is delivered until every source has sent at least one item. From then on, each item
/// from any source delivers a tuple of the latest item of every source. Completes once every
/// source has completed; the first error is forwarded and cancels the others.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::{sync::Arc, time::Duration};
///
/// use pushbag::{combine_latest, for_each, interval, scheduler::VirtualTimeScheduler};
///
/// let scheduler = Arc::new(VirtualTimeScheduler::new());
///
/// let actual = Arc::new(SegQueue::new());
///
/// let source = combine_latest!(
///     interval(Duration::from_millis(100), scheduler.clone()),
///     interval(Duration::from_millis(350), scheduler.clone()),
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
/// scheduler.advance_by(Duration::from_millis(950));
///
/// assert_eq!(
///     &{
///         let mut v = vec![];
///         while let Some(x) = actual.pop() {
///             v.push(x);
///         }
///         v
///     }[..],
///     [
///         (2, 0),
///         (3, 0),
///         (4, 0),
///         (5, 0),
///         (5, 1),
///         (6, 1),
///         (7, 1),
///         (8, 1),
///     ]
/// );
/// ```
///
/// # Implementation notes
///
/// The `CombineLatest` trait is implemented on tuples of arity 2 to 8.
#[macro_export]
macro_rules! combine_latest {
    ($($s:expr),+ $(,)?) => {
        $crate::combine_latest(($($s,)+))
    };
}

macro_rules! combine_latest_impls {
    ($(
        $CombineLatest:ident {
            $(($idx:tt) -> $T:ident)+
        }
    )+) => { paste! {
        $(
            impl<$($T: Clone),+> Snapshot for ($(Option<$T>,)+) {
                type Output = ($($T,)+);

                fn snapshot(&self) -> Option<Self::Output> {
                    Some(($(self.$idx.clone()?,)+))
                }
            }

            impl<$($T: 'static, [<S $T>]),+> CombineLatest for ($([<S $T>],)+)
            where
                $(
                    $T: Send + Clone,
                    [<S $T>]: IntoArcSource<Output = $T>,
                )+
            {
                type Output = ($($T,)+);

                fn combine_latest(self) -> Source<Self::Output> {
                    $(
                        let [<source_ $idx>] = self.$idx.into_arc_source();
                    )+
                    (move |subscriber: Subscriber<Self::Output>| {
                        instrument!("combine_latest");
                        const N: usize = last_literal!($($idx,)+) + 1;
                        let serializer = Arc::new(Serializer::new(subscriber.clone()));
                        let state: Arc<Mutex<Latest<($(Option<$T>,)+)>>> =
                            Arc::new(Mutex::new(Latest {
                                values: Default::default(),
                                active: N,
                            }));
                        $(
                            if subscriber.is_closed() {
                                return;
                            }
                            [<source_ $idx>].subscribe_with(
                                {
                                    let serializer = Arc::clone(&serializer);
                                    let state = Arc::clone(&state);
                                    move |signal: Signal<$T>| {
                                        {
                                            let state = &mut *state.lock().unwrap();
                                            match signal {
                                                Signal::Item(item) => {
                                                    state.values.$idx = Some(item);
                                                    if let Some(values) = state.values.snapshot() {
                                                        serializer.push(Signal::Item(values));
                                                    }
                                                },
                                                Signal::Error(error) => {
                                                    serializer.push(Signal::Error(error));
                                                },
                                                Signal::Complete => {
                                                    state.active -= 1;
                                                    if state.active == 0 {
                                                        serializer.push(Signal::Complete);
                                                    }
                                                },
                                            }
                                        }
                                        serializer.drain();
                                    }
                                },
                                subscriber.child(),
                            );
                        )+
                    })
                    .into()
                }
            }
        )+
    } };
}

macro_rules! last_literal {
    ($a:literal,) => { $a };
    ($a:literal, $($rest_a:literal,)+) => { last_literal!($($rest_a,)+) };
}
pub(crate) use last_literal;

struct Latest<V> {
    values: V,
    active: usize,
}

/// The tuple of latest values, once every slot is filled.
trait Snapshot {
    type Output;

    fn snapshot(&self) -> Option<Self::Output>;
}

combine_latest_impls! {
    CombineLatest2 {
        (0) -> A
        (1) -> B
    }
    CombineLatest3 {
        (0) -> A
        (1) -> B
        (2) -> C
    }
    CombineLatest4 {
        (0) -> A
        (1) -> B
        (2) -> C
        (3) -> D
    }
    CombineLatest5 {
        (0) -> A
        (1) -> B
        (2) -> C
        (3) -> D
        (4) -> E
    }
    CombineLatest6 {
        (0) -> A
        (1) -> B
        (2) -> C
        (3) -> D
        (4) -> E
        (5) -> F
    }
    CombineLatest7 {
        (0) -> A
        (1) -> B
        (2) -> C
        (3) -> D
        (4) -> E
        (5) -> F
        (6) -> G
    }
    CombineLatest8 {
        (0) -> A
        (1) -> B
        (2) -> C
        (3) -> D
        (4) -> E
        (5) -> F
        (6) -> G
        (7) -> H
    }
}

pub trait CombineLatest {
    type Output;

    fn combine_latest(self) -> Source<Self::Output>;
}

/// Combines the latest items from multiple (2 to 8) sources.
///
/// See [`combine_latest!`].
#[doc(hidden)]
pub fn combine_latest<T: CombineLatest>(sources: T) -> Source<<T as CombineLatest>::Output> {
    sources.combine_latest()
}
