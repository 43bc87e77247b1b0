use async_nursery::{Nurse, NurseExt};
use futures::{
    channel::oneshot,
    future::{self, Either},
};
use futures_timer::Delay;
use std::{fmt, pin::Pin, time::Duration};

use crate::{
    scheduler::{PeriodicWork, Scheduler, Work},
    utils::tracing::{trace, warn_event},
    Subscription,
};

/// Resolves when `subscription` closes, so sleeping tasks can wake up and exit early.
fn closed(subscription: &Subscription) -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    subscription.add_teardown(move || {
        let _ = tx.send(());
    });
    rx
}

/// Runs work as tasks spawned on a nursery, so on whatever executor backs it.
///
/// Distinct nurseries over distinct executors act as distinct worker pools. Timers are
/// [`futures_timer::Delay`]s, which work with any executor. Cancelling delayed or periodic work
/// wakes its task at once, so cancelled timers do not linger until their deadline.
///
/// # Examples
///
/// ```
/// use async_nursery::Nursery;
/// use std::{
///     sync::{mpsc, Arc},
///     time::Duration,
/// };
///
/// use pushbag::scheduler::{NurseryScheduler, Scheduler};
///
/// let (nursery, nursery_out) = Nursery::new(async_executors::AsyncStd);
/// let scheduler = NurseryScheduler::new(nursery);
///
/// let (tx, rx) = mpsc::channel();
/// scheduler.schedule(
///     Box::new(move || tx.send("ran").unwrap()),
///     Some(Duration::from_millis(10)),
/// );
///
/// assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok("ran"));
///
/// drop(scheduler);
/// async_std::task::block_on(nursery_out);
/// ```
pub struct NurseryScheduler<N> {
    nursery: N,
}

impl<N> NurseryScheduler<N> {
    pub fn new(nursery: N) -> Self {
        NurseryScheduler { nursery }
    }
}

impl<N> fmt::Debug for NurseryScheduler<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NurseryScheduler<{}>", std::any::type_name::<N>())
    }
}

impl<N> Scheduler for NurseryScheduler<N>
where
    N: Nurse<()> + Send + Sync + 'static,
{
    fn schedule(&self, work: Work, delay: Option<Duration>) -> Subscription {
        let subscription = Subscription::new();
        let task = {
            let subscription = subscription.clone();
            let closed = delay.map(|_| closed(&subscription));
            async move {
                if let (Some(delay), Some(closed)) = (delay, closed) {
                    if let Either::Right(_) = future::select(Delay::new(delay), closed).await {
                        trace!("delayed work cancelled while waiting");
                        return;
                    }
                }
                if subscription.terminate() {
                    work();
                    subscription.release();
                }
            }
        };
        if self.nursery.nurse(task).is_err() {
            warn_event!("nursery refused scheduled work");
            subscription.cancel();
        }
        subscription
    }

    fn schedule_periodic(&self, mut work: PeriodicWork, period: Duration) -> Subscription {
        let subscription = Subscription::new();
        let task = {
            let subscription = subscription.clone();
            let mut interval = Delay::new(period);
            let mut closed = closed(&subscription);
            async move {
                loop {
                    let tick = future::select(Pin::new(&mut interval), &mut closed).await;
                    if matches!(tick, Either::Right(_)) || subscription.is_closed() {
                        break;
                    }
                    interval.reset(period);
                    work(&subscription);
                }
            }
        };
        if self.nursery.nurse(task).is_err() {
            warn_event!("nursery refused periodic work");
            subscription.cancel();
        }
        subscription
    }
}
