//! Property-based tests for the signal contract: items, then at most one terminal signal, then
//! nothing.

use proptest::prelude::*;
use std::{convert::Infallible, sync::Arc};

use pushbag::{combine_latest, filter, generate, map, merge, take, zip, Source, Subject};

use crate::common::{Boom, Event, Recorder};

pub mod common;

#[derive(Clone, Debug)]
enum Op {
    Next(i32),
    Error(u32),
    Complete,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (-1_000i32..1_000).prop_map(Op::Next),
        1 => (0u32..10).prop_map(Op::Error),
        1 => Just(Op::Complete),
    ]
}

fn event(op: &Op) -> Event<i32> {
    match op {
        Op::Next(x) => Event::Item(*x),
        Op::Error(code) => Event::Error(Boom(*code).to_string()),
        Op::Complete => Event::Complete,
    }
}

/// What a well-behaved subscriber sees when `script` is pushed at it.
fn expected(script: &[Op]) -> Vec<Event<i32>> {
    let mut events = vec![];
    for op in script {
        events.push(event(op));
        if !matches!(op, Op::Next(_)) {
            break;
        }
    }
    events
}

fn scripted(script: Vec<Op>) -> Source<i32> {
    generate(move |subscriber| {
        for op in &script {
            match op {
                Op::Next(x) => subscriber.next(*x),
                Op::Error(code) => subscriber.error(Arc::new(Boom(*code))),
                Op::Complete => subscriber.complete(),
            }
        }
        Ok::<(), Infallible>(())
    })
}

fn terminals(events: &[Event<i32>]) -> usize {
    events
        .iter()
        .filter(|event| !matches!(event, Event::Item(_)))
        .count()
}

/// Items, then at most one terminal signal, which must come last.
fn well_formed<T>(events: &[Event<T>]) -> bool {
    match events.iter().position(|event| !matches!(event, Event::Item(_))) {
        Some(at) => at + 1 == events.len(),
        None => true,
    }
}

proptest! {
    /// Whatever a producer pushes, the sink sees the items up to and including the first
    /// terminal signal.
    #[test]
    fn producers_stop_at_the_first_terminal(script in prop::collection::vec(op(), 0..40)) {
        let recorder = Recorder::new();

        let subscription = scripted(script.clone()).subscribe(recorder.sink());

        let events = recorder.take();
        prop_assert!(terminals(&events) <= 1);
        prop_assert_eq!(subscription.is_closed(), terminals(&events) == 1);
        prop_assert!(!subscription.is_cancelled());
        prop_assert_eq!(events, expected(&script));
    }

    /// Every subscriber of a subject gets the same, well-formed sequence.
    #[test]
    fn subjects_keep_the_contract_for_every_subscriber(
        script in prop::collection::vec(op(), 0..40),
    ) {
        let subject = Subject::new();
        let recorders = [Recorder::new(), Recorder::new()];
        for recorder in &recorders {
            subject.source().subscribe(recorder.sink());
        }

        for op in &script {
            match op {
                Op::Next(x) => subject.next(*x),
                Op::Error(code) => subject.error(Arc::new(Boom(*code))),
                Op::Complete => subject.complete(),
            }
        }

        for recorder in &recorders {
            prop_assert_eq!(recorder.take(), expected(&script));
        }
        let attached = if terminals(&expected(&script)) == 0 { 2 } else { 0 };
        prop_assert_eq!(subject.subscriber_count(), attached);
    }

    /// Operators pass the contract on: `take` cuts the sequence short with a completion of its
    /// own, but never adds a second terminal.
    #[test]
    fn operators_never_add_a_second_terminal(
        script in prop::collection::vec(op(), 0..40),
        count in 0usize..10,
    ) {
        let recorder = Recorder::new();

        pushbag::pipe!(
            scripted(script.clone()),
            map(|x: i32| x * 2),
            filter(|x: &i32| x % 3 != 0),
            take(count),
        )
        .subscribe(recorder.sink());

        let mut wanted = vec![];
        if count == 0 {
            wanted.push(Event::Complete);
        } else {
            for event in expected(&script) {
                match event {
                    Event::Item(x) if (x * 2) % 3 == 0 => continue,
                    Event::Item(x) => {
                        wanted.push(Event::Item(x * 2));
                        if wanted.len() == count {
                            wanted.push(Event::Complete);
                            break;
                        }
                    },
                    terminal => wanted.push(terminal),
                }
            }
        }
        let events = recorder.take();
        prop_assert!(terminals(&events) <= 1);
        prop_assert_eq!(events, wanted);
    }

    /// Combinators joining several producers still deliver a single, final terminal.
    #[test]
    fn combinators_end_with_a_single_terminal(
        left in prop::collection::vec(op(), 0..20),
        right in prop::collection::vec(op(), 0..20),
    ) {
        let recorder = Recorder::new();
        merge!(scripted(left.clone()), scripted(right.clone())).subscribe(recorder.sink());
        let merged = recorder.take();
        prop_assert!(well_formed(&merged));
        let (left_events, right_events) = (expected(&left), expected(&right));
        if left_events.last() == Some(&Event::Complete)
            && right_events.last() == Some(&Event::Complete)
        {
            let mut wanted: Vec<_> = left_events
                .into_iter()
                .chain(right_events)
                .filter(|event| matches!(event, Event::Item(_)))
                .collect();
            wanted.push(Event::Complete);
            prop_assert_eq!(merged, wanted);
        }

        let recorder = Recorder::new();
        zip!(scripted(left.clone()), scripted(right.clone())).subscribe(recorder.sink());
        let zipped = recorder.take();
        prop_assert!(well_formed(&zipped));

        let recorder = Recorder::new();
        combine_latest!(scripted(left), scripted(right)).subscribe(recorder.sink());
        let combined = recorder.take();
        prop_assert!(well_formed(&combined));
    }
}
