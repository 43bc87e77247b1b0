use std::sync::{Arc, Mutex};

use pushbag::{buffer_count, for_each, from_iter, range, window_count, Signal, Source, Subject};

use crate::common::{items_then_complete, Boom, Event, Recorder};

pub mod common;

#[test_log::test]
fn buffer_count_flushes_the_partial_tail_on_completion() {
    let recorder = Recorder::new();

    buffer_count(3)(range(1, 7)).subscribe(recorder.sink());

    assert_eq!(
        recorder.take(),
        items_then_complete([vec![1, 2, 3], vec![4, 5, 6], vec![7]])
    );
}

#[test_log::test]
fn buffer_count_skips_an_empty_tail() {
    let recorder = Recorder::new();

    buffer_count(2)(from_iter([1, 2])).subscribe(recorder.sink());

    assert_eq!(recorder.take(), items_then_complete([vec![1, 2]]));
}

#[test_log::test]
fn buffer_count_drops_the_buffer_on_error() {
    let subject = Subject::new();
    let recorder = Recorder::new();

    buffer_count(2)(subject.source()).subscribe(recorder.sink());
    subject.next(1);
    subject.error(Arc::new(Boom(6)));

    assert_eq!(recorder.take(), [Event::Error("boom 6".to_owned())]);
}

#[test_log::test]
#[should_panic(expected = "buffer count must be positive")]
fn buffer_count_rejects_zero() {
    let _ = buffer_count::<i32, Source<i32>>(0);
}

#[test_log::test]
fn window_count_delivers_windows_of_items() {
    let windows = Arc::new(Mutex::new(vec![]));

    for_each({
        let windows = Arc::clone(&windows);
        move |window: Source<i64>| {
            let recorder = Recorder::new();
            window.subscribe(recorder.sink());
            windows.lock().unwrap().push(recorder);
        }
    })(window_count(2)(range(1, 5)));

    let windows: Vec<_> = windows.lock().unwrap().iter().map(Recorder::take).collect();
    assert_eq!(
        windows,
        [
            items_then_complete([1, 2]),
            items_then_complete([3, 4]),
            items_then_complete([5]),
        ]
    );
}

#[test_log::test]
fn window_subscribers_only_see_items_after_attaching() {
    let subject = Subject::new();
    let windows = Arc::new(Mutex::new(vec![]));

    for_each({
        let windows = Arc::clone(&windows);
        move |window: Source<&'static str>| windows.lock().unwrap().push(window)
    })(window_count(3)(subject.source()));
    subject.next("a");
    let late = Recorder::new();
    windows.lock().unwrap()[0].subscribe(late.sink());
    subject.next("b");
    subject.next("c");

    assert_eq!(late.take(), items_then_complete(["b", "c"]));
}

#[test_log::test]
fn window_count_closes_the_open_window_on_upstream_error() {
    let subject = Subject::new();
    let inner = Recorder::new();
    let outer_errors = Arc::new(Mutex::new(vec![]));

    window_count(3)(subject.source()).subscribe({
        let inner = inner.clone();
        let outer_errors = Arc::clone(&outer_errors);
        move |signal: Signal<Source<i32>>| match signal {
            Signal::Item(window) => {
                window.subscribe(inner.sink());
            },
            Signal::Error(error) => outer_errors.lock().unwrap().push(error.to_string()),
            Signal::Complete => {},
        }
    });
    subject.next(1);
    subject.error(Arc::new(Boom(9)));

    assert_eq!(
        inner.take(),
        [Event::Item(1), Event::Error("boom 9".to_owned())]
    );
    assert_eq!(*outer_errors.lock().unwrap(), ["boom 9"]);
}
