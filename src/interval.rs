use std::{sync::Arc, time::Duration};

use crate::{scheduler::Scheduler, Source, Subscriber, Subscription};

/// A source that sends incremental numbers every `period`, starting one `period` after
/// subscription.
///
/// # Examples
///
/// ```
/// use arc_swap::ArcSwap;
/// use std::{sync::Arc, time::Duration};
///
/// use pushbag::{
///     for_each, interval,
///     scheduler::{Scheduler, VirtualTimeScheduler},
/// };
///
/// let scheduler = Arc::new(VirtualTimeScheduler::new());
///
/// let vec = Arc::new(ArcSwap::from_pointee(vec![]));
///
/// let source = interval(Duration::from_millis(1_000), scheduler.clone());
///
/// let subscription = for_each({
///     let vec = Arc::clone(&vec);
///     move |x| {
///         vec.rcu(move |vec| {
///             let mut vec = (**vec).clone();
///             vec.push(x);
///             vec
///         });
///     }
/// })(source);
///
/// scheduler.advance_by(Duration::from_millis(4_500));
/// subscription.cancel();
/// scheduler.advance_by(Duration::from_millis(2_000));
///
/// assert_eq!(vec.load()[..], [0, 1, 2, 3]);
/// ```
pub fn interval(period: Duration, scheduler: Arc<dyn Scheduler>) -> Source<usize> {
    (move |subscriber: Subscriber<usize>| {
        let ticks = scheduler.schedule_periodic(
            Box::new({
                let subscriber = subscriber.clone();
                let mut i = 0;
                move |ticks: &Subscription| {
                    if subscriber.is_closed() {
                        ticks.cancel();
                        return;
                    }
                    subscriber.next(i);
                    i += 1;
                }
            }),
            period,
        );
        subscriber.add(ticks);
    })
    .into()
}

/// A source that sends `()` once after `delay`, then completes.
pub fn timer(delay: Duration, scheduler: Arc<dyn Scheduler>) -> Source<()> {
    (move |subscriber: Subscriber<()>| {
        let fire = scheduler.schedule(
            Box::new({
                let subscriber = subscriber.clone();
                move || {
                    subscriber.next(());
                    subscriber.complete();
                }
            }),
            Some(delay),
        );
        subscriber.add(fire);
    })
    .into()
}
