use std::sync::{
    atomic::{AtomicUsize, Ordering as AtomicOrdering},
    Arc,
};

use crate::{
    utils::tracing::{instrument, trace},
    Signal, Source, Subscriber, Subscription,
};

const UNDECIDED: usize = usize::MAX;

/// Mirrors whichever source signals first, cancelling all the others.
///
/// Any signal counts, so a source that completes or fails first wins too. With no sources at
/// all, completes immediately.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::{sync::Arc, time::Duration};
///
/// use pushbag::{amb, for_each, interval, map, pipe, scheduler::VirtualTimeScheduler};
///
/// let scheduler = Arc::new(VirtualTimeScheduler::new());
///
/// let actual = Arc::new(SegQueue::new());
///
/// let source = amb!(
///     pipe!(
///         interval(Duration::from_millis(300), scheduler.clone()),
///         map(|x: usize| x * 10),
///     ),
///     interval(Duration::from_millis(200), scheduler.clone()),
/// );
///
/// for_each({
///     let actual = Arc::clone(&actual);
///     move |x| {
///         println!("{x}");
///         actual.push(x);
///     }
/// })(source);
///
/// scheduler.advance_by(Duration::from_millis(700));
///
/// assert_eq!(
///     &{
///         let mut v = vec![];
///         while let Some(x) = actual.pop() {
///             v.push(x);
///         }
///         v
///     }[..],
///     [0, 1, 2]
/// );
/// assert_eq!(scheduler.pending(), 1);
/// ```
#[macro_export]
macro_rules! amb {
    ($($s:expr),* $(,)?) => {
        $crate::amb(::std::vec![$($s),*].into_boxed_slice())
    };
}

/// Mirrors whichever source signals first.
///
/// See [`amb!`].
#[doc(hidden)]
pub fn amb<T: 'static, S>(sources: Box<[S]>) -> Source<T>
where
    S: Into<Arc<Source<T>>>,
{
    let sources: Box<[Arc<Source<T>>]> = Vec::from(sources).into_iter().map(|s| s.into()).collect();
    (move |subscriber: Subscriber<T>| {
        instrument!("amb", n = sources.len());
        if sources.is_empty() {
            subscriber.complete();
            return;
        }
        let winner = Arc::new(AtomicUsize::new(UNDECIDED));
        let contenders: Arc<[Subscription]> =
            sources.iter().map(|_| subscriber.child()).collect();
        for (i, source) in sources.iter().enumerate() {
            if winner.load(AtomicOrdering::Acquire) != UNDECIDED {
                break;
            }
            source.subscribe_with(
                {
                    let subscriber = subscriber.clone();
                    let winner = Arc::clone(&winner);
                    let contenders = Arc::clone(&contenders);
                    move |signal: Signal<T>| {
                        let won = match winner.compare_exchange(
                            UNDECIDED,
                            i,
                            AtomicOrdering::AcqRel,
                            AtomicOrdering::Acquire,
                        ) {
                            Ok(_) => {
                                trace!("amb decided for source {i}");
                                for (j, contender) in contenders.iter().enumerate() {
                                    if j != i {
                                        contender.cancel();
                                    }
                                }
                                true
                            },
                            Err(current) => current == i,
                        };
                        if won {
                            subscriber.emit(signal);
                        }
                    }
                },
                contenders[i].clone(),
            );
        }
    })
    .into()
}
