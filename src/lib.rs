//! Push-based reactive streams.
//!
//! A [`Source`] is a lazy recipe for a sequence of items that ends with at most one terminal
//! signal. Subscribing a [`Sink`] runs the recipe and returns a [`Subscription`] that cancels
//! it. Operators are plain functions returning `Box<dyn Fn(Source) -> Source>`, so they chain
//! with [`pipe!`]. Thread hops and timers go through a [`scheduler::Scheduler`].

pub use crate::{
    amb::amb,
    buffer::{buffer_count, buffer_time, buffer_time_or_count},
    combine::{combine_latest, CombineLatest},
    concat::concat,
    core::{IntoArcSource, Signal, Sink, SinkFn, Source, SourceFn, Subscriber},
    create::{defer, empty, error, generate, never},
    debounce::debounce,
    distinct::{distinct, distinct_until_changed},
    error::{BoxError, TimeoutError},
    filter::filter,
    for_each::for_each,
    from_iter::{from_iter, from_values, range},
    interval::{interval, timer},
    map::{map, try_map},
    merge::merge,
    observe_on::observe_on,
    recover::{on_error_resume_next, on_error_return, retry},
    scan::scan,
    share::{publish, share, ConnectableSource},
    skip::skip,
    subject::Subject,
    subscribe_on::subscribe_on,
    subscription::{CompositeSubscription, SerialSubscription, Subscription},
    switch::switch_latest,
    take::{take, take_while},
    throttle::throttle_first,
    timeout::timeout,
    window::window_count,
    with_latest_from::with_latest_from,
    zip::{zip, Zip},
};

mod amb;
mod buffer;
mod combine;
mod concat;
mod core;
mod create;
mod debounce;
mod distinct;
mod error;
mod filter;
mod for_each;
mod from_iter;
mod interval;
mod map;
mod merge;
mod observe_on;
mod pipe;
mod recover;
mod scan;
pub mod scheduler;
mod share;
mod skip;
mod subject;
mod subscribe_on;
mod subscription;
mod switch;
mod take;
mod throttle;
mod timeout;
mod utils;
mod window;
mod with_latest_from;
mod zip;
