use paste::paste;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use crate::{
    combine::last_literal,
    utils::{
        serialize::Serializer,
        tracing::{instrument, trace},
    },
    IntoArcSource, Signal, Source, Subscriber,
};

/// Pairs up items from multiple (2 to 8) sources by position.
///
/// The n-th tuple holds the n-th item of every source. Items are buffered per source until every
/// source has one to contribute. Completes as soon as a source that has completed has no
/// buffered item left, dropping whatever the other sources buffered.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::sync::Arc;
///
/// use pushbag::{for_each, from_iter, zip};
///
/// let actual = Arc::new(SegQueue::new());
///
/// let source = zip!(from_iter([1, 2, 3]), from_iter(["a", "b"]));
///
/// for_each({
///     let actual = Arc::clone(&actual);
///     move |x| {
///         println!("{:?}", x);
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
///     [(1, "a"), (2, "b")]
/// );
/// ```
///
/// # Implementation notes
///
/// The `Zip` trait is implemented on tuples of arity 2 to 8.
#[macro_export]
macro_rules! zip {
    ($($s:expr),+ $(,)?) => {
        $crate::zip(($($s,)+))
    };
}

macro_rules! zip_impls {
    ($(
        $Zip:ident {
            $(($idx:tt) -> $T:ident)+
        }
    )+) => { paste! {
        $(
            impl<$($T),+> Fronts for ($(VecDeque<$T>,)+) {
                type Output = ($($T,)+);

                fn pop_fronts(&mut self) -> Option<Self::Output> {
                    if $(self.$idx.is_empty())||+ {
                        return None;
                    }
                    Some(($(self.$idx.pop_front()?,)+))
                }

                fn exhausted(&self, completed: &[bool]) -> bool {
                    $((completed[$idx] && self.$idx.is_empty()))||+
                }
            }

            impl<$($T: 'static, [<S $T>]),+> Zip for ($([<S $T>],)+)
            where
                $(
                    $T: Send,
                    [<S $T>]: IntoArcSource<Output = $T>,
                )+
            {
                type Output = ($($T,)+);

                fn zip(self) -> Source<Self::Output> {
                    $(
                        let [<source_ $idx>] = self.$idx.into_arc_source();
                    )+
                    (move |subscriber: Subscriber<Self::Output>| {
                        instrument!("zip");
                        const N: usize = last_literal!($($idx,)+) + 1;
                        let serializer = Arc::new(Serializer::new(subscriber.clone()));
                        let state: Arc<Mutex<Queues<($(VecDeque<$T>,)+), N>>> =
                            Arc::new(Mutex::new(Queues {
                                queues: Default::default(),
                                completed: [false; N],
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
                                                    state.queues.$idx.push_back(item);
                                                    if let Some(values) = state.queues.pop_fronts() {
                                                        serializer.push(Signal::Item(values));
                                                    }
                                                },
                                                Signal::Error(error) => {
                                                    serializer.push(Signal::Error(error));
                                                },
                                                Signal::Complete => {
                                                    state.completed[$idx] = true;
                                                },
                                            }
                                            if state.queues.exhausted(&state.completed) {
                                                trace!("zip source exhausted");
                                                serializer.push(Signal::Complete);
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

struct Queues<Q, const N: usize> {
    queues: Q,
    completed: [bool; N],
}

/// One queue per source, popped together.
trait Fronts {
    type Output;

    /// Pops the front of every queue, or nothing if any queue is empty.
    fn pop_fronts(&mut self) -> Option<Self::Output>;

    /// Whether a completed source has nothing left to pair.
    fn exhausted(&self, completed: &[bool]) -> bool;
}

zip_impls! {
    Zip2 {
        (0) -> A
        (1) -> B
    }
    Zip3 {
        (0) -> A
        (1) -> B
        (2) -> C
    }
    Zip4 {
        (0) -> A
        (1) -> B
        (2) -> C
        (3) -> D
    }
    Zip5 {
        (0) -> A
        (1) -> B
        (2) -> C
        (3) -> D
        (4) -> E
    }
    Zip6 {
        (0) -> A
        (1) -> B
        (2) -> C
        (3) -> D
        (4) -> E
        (5) -> F
    }
    Zip7 {
        (0) -> A
        (1) -> B
        (2) -> C
        (3) -> D
        (4) -> E
        (5) -> F
        (6) -> G
    }
    Zip8 {
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

pub trait Zip {
    type Output;

    fn zip(self) -> Source<Self::Output>;
}

/// Pairs up items from multiple (2 to 8) sources by position.
///
/// See [`zip!`].
#[doc(hidden)]
pub fn zip<T: Zip>(sources: T) -> Source<<T as Zip>::Output> {
    sources.zip()
}
