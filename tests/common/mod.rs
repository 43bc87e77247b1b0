#![allow(dead_code)]

use crossbeam_queue::SegQueue;
use std::sync::Arc;
use thiserror::Error;

use pushbag::{Signal, Sink};

/// What a [`Recorder`] saw, with errors flattened to their message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event<T> {
    Item(T),
    Error(String),
    Complete,
}

/// A sink that records every signal it receives.
pub struct Recorder<T> {
    events: Arc<SegQueue<Event<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Recorder {
            events: Arc::clone(&self.events),
        }
    }
}

impl<T: Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Recorder {
            events: Arc::new(SegQueue::new()),
        }
    }

    pub fn sink(&self) -> Sink<T> {
        let events = Arc::clone(&self.events);
        (move |signal: Signal<T>| {
            events.push(match signal {
                Signal::Item(item) => Event::Item(item),
                Signal::Error(error) => Event::Error(error.to_string()),
                Signal::Complete => Event::Complete,
            });
        })
        .into()
    }

    /// Drains everything recorded so far.
    pub fn take(&self) -> Vec<Event<T>> {
        let mut v = vec![];
        while let Some(event) = self.events.pop() {
            v.push(event);
        }
        v
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

pub fn items<T>(values: impl IntoIterator<Item = T>) -> Vec<Event<T>> {
    values.into_iter().map(Event::Item).collect()
}

pub fn items_then_complete<T>(values: impl IntoIterator<Item = T>) -> Vec<Event<T>> {
    let mut events = items(values);
    events.push(Event::Complete);
    events
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("boom {0}")]
pub struct Boom(pub u32);
