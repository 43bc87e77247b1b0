use std::sync::{
    atomic::{AtomicUsize, Ordering as AtomicOrdering},
    Arc,
};

use pushbag::{
    concat, error, from_iter, generate, on_error_resume_next, on_error_return, retry, Source,
    Subject,
};

use crate::common::{items, items_then_complete, Boom, Event, Recorder};

pub mod common;

fn failing_after(values: Vec<i32>, code: u32) -> Source<i32> {
    concat!(from_iter(values), error(Boom(code)))
}

/// Fails `failures` times before delivering `1, 2` and completing.
fn flaky(failures: usize) -> (Arc<AtomicUsize>, Source<i32>) {
    let attempts = Arc::new(AtomicUsize::new(0));
    let source = generate({
        let attempts = Arc::clone(&attempts);
        move |subscriber| {
            let attempt = attempts.fetch_add(1, AtomicOrdering::AcqRel);
            subscriber.next(0);
            if attempt < failures {
                return Err(Boom(attempt as u32));
            }
            subscriber.next(1);
            subscriber.next(2);
            subscriber.complete();
            Ok(())
        }
    });
    (attempts, source)
}

#[test_log::test]
fn on_error_return_ends_with_a_replacement_item() {
    let recorder = Recorder::new();

    on_error_return(|error| error.to_string().len() as i32)(failing_after(vec![1, 2], 7))
        .subscribe(recorder.sink());

    assert_eq!(recorder.take(), items_then_complete([1, 2, 6]));
}

#[test_log::test]
fn on_error_return_leaves_completion_alone() {
    let recorder = Recorder::new();

    on_error_return(|_| -1)(from_iter([1, 2])).subscribe(recorder.sink());

    assert_eq!(recorder.take(), items_then_complete([1, 2]));
}

#[test_log::test]
fn on_error_resume_next_continues_with_the_fallback() {
    let recorder = Recorder::new();

    on_error_resume_next(|_| from_iter([10, 20]))(failing_after(vec![1], 1))
        .subscribe(recorder.sink());

    assert_eq!(recorder.take(), items_then_complete([1, 10, 20]));
}

#[test_log::test]
fn on_error_resume_next_forwards_fallback_errors() {
    let recorder = Recorder::new();

    on_error_resume_next(|_| failing_after(vec![10], 2))(failing_after(vec![1], 1))
        .subscribe(recorder.sink());

    let mut expected = items([1, 10]);
    expected.push(Event::Error("boom 2".to_owned()));
    assert_eq!(recorder.take(), expected);
}

#[test_log::test]
fn cancelling_reaches_the_fallback() {
    let upstream = Subject::new();
    let fallback = Subject::new();
    let recorder = Recorder::new();

    let subscription = on_error_resume_next({
        let fallback = fallback.clone();
        move |_| fallback.source()
    })(upstream.source())
    .subscribe(recorder.sink());
    upstream.error(Arc::new(Boom(1)));
    assert_eq!(fallback.subscriber_count(), 1);

    fallback.next(5);
    subscription.cancel();
    fallback.next(6);

    assert_eq!(fallback.subscriber_count(), 0);
    assert_eq!(recorder.take(), items([5]));
}

#[test_log::test]
fn retry_resubscribes_until_the_source_succeeds() {
    let (attempts, source) = flaky(2);
    let recorder = Recorder::new();

    retry(3)(source).subscribe(recorder.sink());

    assert_eq!(attempts.load(AtomicOrdering::Acquire), 3);
    assert_eq!(recorder.take(), items_then_complete([0, 0, 0, 1, 2]));
}

#[test_log::test]
fn retry_gives_up_with_the_last_error() {
    let (attempts, source) = flaky(usize::MAX);
    let recorder = Recorder::new();

    retry(2)(source).subscribe(recorder.sink());

    assert_eq!(attempts.load(AtomicOrdering::Acquire), 3);
    let mut expected = items([0, 0, 0]);
    expected.push(Event::Error("boom 2".to_owned()));
    assert_eq!(recorder.take(), expected);
}

#[test_log::test]
fn retry_zero_forwards_the_first_error() {
    let (attempts, source) = flaky(1);
    let recorder = Recorder::new();

    retry(0)(source).subscribe(recorder.sink());

    assert_eq!(attempts.load(AtomicOrdering::Acquire), 1);
    let mut expected = items([0]);
    expected.push(Event::Error("boom 0".to_owned()));
    assert_eq!(recorder.take(), expected);
}
