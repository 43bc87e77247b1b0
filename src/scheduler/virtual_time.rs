use std::{
    collections::BTreeMap,
    fmt,
    sync::Mutex,
    time::{Duration, Instant},
};

use crate::{
    scheduler::{PeriodicWork, Scheduler, Work},
    Subscription,
};

enum Task {
    Once(Work),
    Periodic(PeriodicWork, Duration),
}

#[derive(Default)]
struct State {
    clock: Duration,
    sequence: u64,
    queue: BTreeMap<(Duration, u64), (Task, Subscription)>,
}

impl State {
    fn insert(&mut self, due: Duration, task: Task, subscription: Subscription) {
        self.sequence += 1;
        self.queue.insert((due, self.sequence), (task, subscription));
    }
}

/// A scheduler whose clock only moves when told to.
///
/// Work runs on the thread that advances the clock, in due-time order, ties broken by
/// submission order. Work scheduled without a delay is due at the current virtual time and runs
/// on the next [`flush`][VirtualTimeScheduler::flush] or advance.
///
/// # Examples
///
/// ```
/// use std::{
///     sync::{
///         atomic::{AtomicBool, Ordering},
///         Arc,
///     },
///     time::Duration,
/// };
///
/// use pushbag::scheduler::{Scheduler, VirtualTimeScheduler};
///
/// let scheduler = VirtualTimeScheduler::new();
/// let ran = Arc::new(AtomicBool::new(false));
///
/// scheduler.schedule(
///     Box::new({
///         let ran = Arc::clone(&ran);
///         move || ran.store(true, Ordering::SeqCst)
///     }),
///     Some(Duration::from_millis(50)),
/// );
///
/// scheduler.advance_by(Duration::from_millis(49));
/// assert!(!ran.load(Ordering::SeqCst));
/// scheduler.advance_by(Duration::from_millis(1));
/// assert!(ran.load(Ordering::SeqCst));
/// ```
pub struct VirtualTimeScheduler {
    origin: Instant,
    state: Mutex<State>,
}

impl VirtualTimeScheduler {
    pub fn new() -> Self {
        VirtualTimeScheduler {
            origin: Instant::now(),
            state: Mutex::new(State::default()),
        }
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().unwrap().clock
    }

    /// Number of scheduled entries that have not run and were not cancelled.
    pub fn pending(&self) -> usize {
        let state = &*self.state.lock().unwrap();
        state
            .queue
            .values()
            .filter(|(_, subscription)| !subscription.is_closed())
            .count()
    }

    /// Runs everything due at the current virtual time.
    pub fn flush(&self) {
        self.advance_by(Duration::ZERO);
    }

    pub fn advance_by(&self, duration: Duration) {
        let target = self.elapsed() + duration;
        self.advance_to(target);
    }

    /// Moves the clock forward to `target`, running everything due on the way.
    ///
    /// Does nothing to the clock if `target` is in the virtual past, but still runs work that is
    /// already due.
    pub fn advance_to(&self, target: Duration) {
        loop {
            let next = {
                let state = &mut *self.state.lock().unwrap();
                let due = state.queue.keys().next().map(|&(due, _)| due);
                match due {
                    Some(due) if due <= target.max(state.clock) => {
                        state.clock = state.clock.max(due);
                        state.queue.pop_first().map(|((due, _), entry)| (due, entry))
                    },
                    _ => None,
                }
            };
            let Some((due, (task, subscription))) = next else {
                break;
            };
            if subscription.is_closed() {
                continue;
            }
            match task {
                Task::Once(work) => {
                    if subscription.terminate() {
                        work();
                        subscription.release();
                    }
                },
                Task::Periodic(mut work, period) => {
                    work(&subscription);
                    if !subscription.is_closed() {
                        let state = &mut *self.state.lock().unwrap();
                        state.insert(due + period, Task::Periodic(work, period), subscription);
                    }
                },
            }
        }
        let state = &mut *self.state.lock().unwrap();
        state.clock = state.clock.max(target);
    }
}

impl Default for VirtualTimeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VirtualTimeScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualTimeScheduler")
            .field("elapsed", &self.elapsed())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Scheduler for VirtualTimeScheduler {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn schedule(&self, work: Work, delay: Option<Duration>) -> Subscription {
        let subscription = Subscription::new();
        let state = &mut *self.state.lock().unwrap();
        let due = state.clock + delay.unwrap_or_default();
        state.insert(due, Task::Once(work), subscription.clone());
        subscription
    }

    fn schedule_periodic(&self, work: PeriodicWork, period: Duration) -> Subscription {
        let subscription = Subscription::new();
        let state = &mut *self.state.lock().unwrap();
        let due = state.clock + period;
        state.insert(due, Task::Periodic(work, period), subscription.clone());
        subscription
    }
}
