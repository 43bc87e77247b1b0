//! Combinators fed by sources that emit from their own threads.

use std::{
    convert::Infallible,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering},
        mpsc, Arc, Mutex,
    },
    thread,
    time::Duration,
};

use pushbag::{generate, merge, switch_latest, zip, Signal, Source, Subject, Subscriber};

pub mod common;

const WAIT: Duration = Duration::from_secs(10);

/// Emits `base..base + count` from a freshly spawned thread, then completes.
fn threaded(base: u32, count: u32) -> Source<u32> {
    generate(move |subscriber: &Subscriber<u32>| {
        let subscriber = subscriber.clone();
        thread::spawn(move || {
            for i in 0..count {
                if subscriber.is_closed() {
                    return;
                }
                subscriber.next(base + i);
            }
            subscriber.complete();
        });
        Ok::<(), Infallible>(())
    })
}

/// Records items, counts terminal signals and flags any call made while another is in flight.
struct Overlapping<T> {
    busy: AtomicBool,
    overlaps: AtomicUsize,
    terminals: AtomicUsize,
    items: Mutex<Vec<T>>,
    done: Mutex<mpsc::Sender<()>>,
}

impl<T: Send + 'static> Overlapping<T> {
    fn new() -> (Arc<Self>, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel();
        let watcher = Arc::new(Overlapping {
            busy: AtomicBool::new(false),
            overlaps: AtomicUsize::new(0),
            terminals: AtomicUsize::new(0),
            items: Mutex::new(vec![]),
            done: Mutex::new(tx),
        });
        (watcher, rx)
    }

    fn sink(self: &Arc<Self>) -> impl Fn(Signal<T>) + Send + Sync + 'static {
        let watcher = Arc::clone(self);
        move |signal: Signal<T>| {
            if watcher.busy.swap(true, AtomicOrdering::AcqRel) {
                watcher.overlaps.fetch_add(1, AtomicOrdering::AcqRel);
            }
            match signal {
                Signal::Item(item) => watcher.items.lock().unwrap().push(item),
                Signal::Error(_) | Signal::Complete => {
                    watcher.terminals.fetch_add(1, AtomicOrdering::AcqRel);
                    let _ = watcher.done.lock().unwrap().send(());
                },
            }
            watcher.busy.store(false, AtomicOrdering::Release);
        }
    }
}

#[test_log::test]
fn merge_serializes_items_from_many_threads() {
    const PER_SOURCE: u32 = 2_000;
    let (watcher, done) = Overlapping::<u32>::new();

    merge!(
        threaded(0, PER_SOURCE),
        threaded(PER_SOURCE, PER_SOURCE),
        threaded(2 * PER_SOURCE, PER_SOURCE),
        threaded(3 * PER_SOURCE, PER_SOURCE),
    )
    .subscribe(watcher.sink());

    done.recv_timeout(WAIT).unwrap();
    let mut items = watcher.items.lock().unwrap().clone();
    items.sort_unstable();
    assert_eq!(items, (0..4 * PER_SOURCE).collect::<Vec<_>>());
    assert_eq!(watcher.overlaps.load(AtomicOrdering::Acquire), 0);
    assert_eq!(watcher.terminals.load(AtomicOrdering::Acquire), 1);
}

#[test_log::test]
fn zip_pairs_items_from_two_threads_in_order() {
    const COUNT: u32 = 2_000;
    let (watcher, done) = Overlapping::<(u32, u32)>::new();

    zip!(threaded(0, COUNT), threaded(0, COUNT)).subscribe(watcher.sink());

    done.recv_timeout(WAIT).unwrap();
    assert_eq!(
        *watcher.items.lock().unwrap(),
        (0..COUNT).map(|i| (i, i)).collect::<Vec<_>>()
    );
    assert_eq!(watcher.overlaps.load(AtomicOrdering::Acquire), 0);
    assert_eq!(watcher.terminals.load(AtomicOrdering::Acquire), 1);
}

/// Emits `(id, n)` for increasing `n` from its own thread until cancelled.
fn endless(id: u32) -> Arc<Source<(u32, u64)>> {
    Arc::new(generate(move |subscriber: &Subscriber<(u32, u64)>| {
        let subscriber = subscriber.clone();
        thread::spawn(move || {
            let mut n = 0;
            while !subscriber.is_closed() {
                subscriber.next((id, n));
                n += 1;
                thread::sleep(Duration::from_micros(20));
            }
        });
        Ok::<(), Infallible>(())
    }))
}

#[test_log::test]
fn switch_latest_never_goes_back_to_a_replaced_thread() {
    let outer: Subject<Arc<Source<(u32, u64)>>> = Subject::new();
    let latest = Arc::new(AtomicUsize::new(0));
    let regressions = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let busy = Arc::new(AtomicBool::new(false));

    let subscription = switch_latest(outer.source()).subscribe({
        let latest = Arc::clone(&latest);
        let regressions = Arc::clone(&regressions);
        let overlaps = Arc::clone(&overlaps);
        let busy = Arc::clone(&busy);
        move |signal: Signal<(u32, u64)>| {
            if busy.swap(true, AtomicOrdering::AcqRel) {
                overlaps.fetch_add(1, AtomicOrdering::AcqRel);
            }
            if let Signal::Item((id, _)) = signal {
                let id = id as usize;
                if id < latest.fetch_max(id, AtomicOrdering::AcqRel) {
                    regressions.fetch_add(1, AtomicOrdering::AcqRel);
                }
            }
            busy.store(false, AtomicOrdering::Release);
        }
    });

    for id in 1..=30 {
        outer.next(endless(id));
        thread::sleep(Duration::from_millis(2));
    }
    subscription.cancel();
    thread::sleep(Duration::from_millis(10));

    assert_eq!(regressions.load(AtomicOrdering::Acquire), 0);
    assert_eq!(overlaps.load(AtomicOrdering::Acquire), 0);
}
