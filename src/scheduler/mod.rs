//! Where work runs next.
//!
//! Every thread hop in this crate goes through a [`Scheduler`]: timers of the time-based
//! operators, [`interval`][crate::interval()], [`subscribe_on`][crate::subscribe_on()] and
//! [`observe_on`][crate::observe_on()]. Scheduled work returns a [`Subscription`] so that it
//! can be cancelled before it runs.

use std::time::{Duration, Instant};

use crate::Subscription;

pub use self::{
    immediate::ImmediateScheduler, sequential::SequentialScheduler,
    virtual_time::VirtualTimeScheduler,
};

#[cfg(feature = "nursery")]
pub use self::nursery::NurseryScheduler;

mod immediate;
#[cfg(feature = "nursery")]
mod nursery;
mod sequential;
mod virtual_time;

/// A one-shot unit of work.
pub type Work = Box<dyn FnOnce() + Send>;

/// Work run on every tick of [`Scheduler::schedule_periodic`].
///
/// It receives the subscription of the periodic schedule, so it can stop itself.
pub type PeriodicWork = Box<dyn FnMut(&Subscription) + Send>;

pub trait Scheduler: Send + Sync {
    /// The scheduler's notion of the current time.
    fn now(&self) -> Instant {
        Instant::now()
    }

    /// Runs `work` once, after `delay` if given.
    ///
    /// Cancelling the returned subscription before the work starts prevents it from running.
    fn schedule(&self, work: Work, delay: Option<Duration>) -> Subscription;

    /// Runs `work` every `period`, the first time one `period` from now, until the returned
    /// subscription is cancelled.
    fn schedule_periodic(&self, work: PeriodicWork, period: Duration) -> Subscription;
}
