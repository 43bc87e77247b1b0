use crossbeam_queue::SegQueue;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use crate::{Signal, Subscriber};

/// Funnels signals from several threads into one subscriber, one at a time, in push order.
///
/// Whichever thread finds the queue idle drains it; the others only enqueue. Re-entrant pushes
/// from inside the subscriber's sink are picked up by the drain loop already running.
pub(crate) struct Serializer<T> {
    queue: SegQueue<Signal<T>>,
    wip: AtomicUsize,
    subscriber: Subscriber<T>,
}

impl<T> Serializer<T> {
    pub(crate) fn new(subscriber: Subscriber<T>) -> Self {
        Serializer {
            queue: SegQueue::new(),
            wip: AtomicUsize::new(0),
            subscriber,
        }
    }

    pub(crate) fn subscriber(&self) -> &Subscriber<T> {
        &self.subscriber
    }

    /// Enqueues without delivering. Callers holding a lock push under it and drain after.
    pub(crate) fn push(&self, signal: Signal<T>) {
        self.queue.push(signal);
    }

    pub(crate) fn drain(&self) {
        if self.wip.fetch_add(1, AtomicOrdering::AcqRel) != 0 {
            return;
        }
        let mut missed = 1;
        loop {
            while let Some(signal) = self.queue.pop() {
                self.subscriber.emit(signal);
            }
            missed = self.wip.fetch_sub(missed, AtomicOrdering::AcqRel) - missed;
            if missed == 0 {
                break;
            }
        }
    }

    pub(crate) fn emit(&self, signal: Signal<T>) {
        self.push(signal);
        self.drain();
    }
}
