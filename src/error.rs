use std::{error::Error as StdError, sync::Arc, time::Duration};

use thiserror::Error;

/// The payload of [`Signal::Error`][crate::Signal::Error].
///
/// Reference-counted so that multicasting sources and combinators can hand the same error to
/// several sinks.
pub type BoxError = Arc<dyn StdError + Send + Sync + 'static>;

/// Raised by [`timeout`][crate::timeout()] when no signal arrived in time.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("no signal within {0:?}")]
pub struct TimeoutError(pub Duration);
