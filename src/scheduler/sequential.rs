use crossbeam_queue::SegQueue;
use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use crate::{
    scheduler::{PeriodicWork, Scheduler, Work},
    utils::tracing::warn_event,
    Subscription,
};

struct Job {
    work: Work,
    subscription: Subscription,
}

struct Queue {
    jobs: SegQueue<Job>,
    wip: AtomicUsize,
}

impl Queue {
    fn enqueue(self: &Arc<Self>, inner: &Arc<dyn Scheduler>, job: Job) {
        self.jobs.push(job);
        if self.wip.fetch_add(1, AtomicOrdering::AcqRel) == 0 {
            let queue = Arc::clone(self);
            let drain = inner.schedule(Box::new(move || queue.drain()), None);
            if drain.is_cancelled() {
                warn_event!("inner scheduler refused the drain, cancelling queued jobs");
                self.discard();
            }
        }
    }

    /// Cancels every queued job and hands the queue back to the next `enqueue`.
    fn discard(&self) {
        let mut missed = 1;
        loop {
            while let Some(job) = self.jobs.pop() {
                job.subscription.cancel();
            }
            missed = self.wip.fetch_sub(missed, AtomicOrdering::AcqRel) - missed;
            if missed == 0 {
                break;
            }
        }
    }

    fn drain(&self) {
        let mut missed = 1;
        loop {
            while let Some(job) = self.jobs.pop() {
                if job.subscription.terminate() {
                    (job.work)();
                    job.subscription.release();
                }
            }
            missed = self.wip.fetch_sub(missed, AtomicOrdering::AcqRel) - missed;
            if missed == 0 {
                break;
            }
        }
    }
}

/// Runs work one job at a time, in submission order, on top of another scheduler.
///
/// Jobs never overlap even when the inner scheduler is a multi-threaded pool, which makes this
/// the single sequential worker of the crate. Delayed jobs join the queue when their delay
/// elapses. If the inner scheduler refuses to run the queue, the queued jobs are cancelled and
/// the next job tries again.
#[derive(Clone)]
pub struct SequentialScheduler {
    inner: Arc<dyn Scheduler>,
    queue: Arc<Queue>,
}

impl SequentialScheduler {
    pub fn new(inner: Arc<dyn Scheduler>) -> Self {
        SequentialScheduler {
            inner,
            queue: Arc::new(Queue {
                jobs: SegQueue::new(),
                wip: AtomicUsize::new(0),
            }),
        }
    }
}

impl fmt::Debug for SequentialScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequentialScheduler")
            .field("queued", &self.queue.jobs.len())
            .finish()
    }
}

impl Scheduler for SequentialScheduler {
    fn now(&self) -> Instant {
        self.inner.now()
    }

    fn schedule(&self, work: Work, delay: Option<Duration>) -> Subscription {
        let subscription = Subscription::new();
        let job = Job {
            work,
            subscription: subscription.clone(),
        };
        match delay {
            None => self.queue.enqueue(&self.inner, job),
            Some(delay) => {
                let queue = Arc::clone(&self.queue);
                let inner = Arc::clone(&self.inner);
                let timer = self
                    .inner
                    .schedule(Box::new(move || queue.enqueue(&inner, job)), Some(delay));
                subscription.add(timer);
            },
        }
        subscription
    }

    fn schedule_periodic(&self, work: PeriodicWork, period: Duration) -> Subscription {
        let subscription = Subscription::new();
        let work = Arc::new(Mutex::new(work));
        let ticks = {
            let queue = Arc::clone(&self.queue);
            let inner = Arc::clone(&self.inner);
            let subscription = subscription.clone();
            self.inner.schedule_periodic(
                Box::new(move |_ticks: &Subscription| {
                    let work = Arc::clone(&work);
                    let subscription = subscription.clone();
                    queue.enqueue(
                        &inner,
                        Job {
                            work: Box::new(move || {
                                if !subscription.is_closed() {
                                    let work = &mut *work.lock().unwrap();
                                    work(&subscription);
                                }
                            }),
                            subscription: Subscription::new(),
                        },
                    );
                }),
                period,
            )
        };
        subscription.add(ticks);
        subscription
    }
}
