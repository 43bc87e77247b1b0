use std::{thread, time::Duration};

use crate::{
    scheduler::{PeriodicWork, Scheduler, Work},
    Subscription,
};

/// Runs work inline on the calling thread.
///
/// Delays block the calling thread. A periodic schedule keeps the calling thread until the work
/// cancels the subscription it is handed.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateScheduler;

impl ImmediateScheduler {
    pub fn new() -> Self {
        ImmediateScheduler
    }
}

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, work: Work, delay: Option<Duration>) -> Subscription {
        let subscription = Subscription::new();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        if subscription.terminate() {
            work();
            subscription.release();
        }
        subscription
    }

    fn schedule_periodic(&self, mut work: PeriodicWork, period: Duration) -> Subscription {
        let subscription = Subscription::new();
        loop {
            thread::sleep(period);
            if subscription.is_closed() {
                break;
            }
            work(&subscription);
        }
        subscription
    }
}
