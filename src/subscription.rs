use std::{
    fmt, mem,
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering as AtomicOrdering},
        Arc, Mutex,
    },
};

const ACTIVE: u8 = 0;
const CANCELLED: u8 = 1;
const TERMINATED: u8 = 2;

enum Teardown {
    Child(Subscription),
    Action(Box<dyn FnOnce() + Send>),
}

impl Teardown {
    fn run(self) {
        match self {
            Teardown::Child(child) => child.cancel(),
            Teardown::Action(action) => action(),
        }
    }
}

struct Inner {
    state: AtomicU8,
    teardowns: Mutex<Vec<Teardown>>,
}

/// A handle on one active delivery of a [`Source`][crate::Source] to a [`Sink`][crate::Sink].
///
/// A subscription ends in exactly one of two ways: it is cancelled through [`cancel`], or its
/// source delivers a terminal signal. Either way every teardown action and child subscription
/// registered on it is released once. Cancelling after natural termination is a no-op, and
/// [`is_cancelled`] keeps returning `false`.
///
/// Cloning a subscription shares the same handle.
///
/// [`cancel`]: Subscription::cancel
/// [`is_cancelled`]: Subscription::is_cancelled
#[derive(Clone)]
pub struct Subscription(Arc<Inner>);

impl Subscription {
    pub fn new() -> Self {
        Subscription(Arc::new(Inner {
            state: AtomicU8::new(ACTIVE),
            teardowns: Mutex::new(vec![]),
        }))
    }

    /// Whether [`cancel`][Subscription::cancel] ended this subscription.
    pub fn is_cancelled(&self) -> bool {
        self.0.state.load(AtomicOrdering::Acquire) == CANCELLED
    }

    /// Whether this subscription was cancelled or has terminated.
    pub fn is_closed(&self) -> bool {
        self.0.state.load(AtomicOrdering::Acquire) != ACTIVE
    }

    /// Cancels this subscription and releases everything attached to it.
    ///
    /// Idempotent, and safe to call from any thread, including from inside a sink callback of
    /// the very subscription being cancelled.
    pub fn cancel(&self) {
        if self
            .0
            .state
            .compare_exchange(
                ACTIVE,
                CANCELLED,
                AtomicOrdering::AcqRel,
                AtomicOrdering::Acquire,
            )
            .is_ok()
        {
            self.release();
        }
    }

    /// Attaches a child subscription, cancelled when this one closes.
    ///
    /// If this subscription is already closed the child is cancelled right away.
    pub fn add(&self, child: Subscription) {
        self.push(Teardown::Child(child));
    }

    /// Attaches an action to run once when this subscription closes.
    ///
    /// If this subscription is already closed the action runs right away.
    pub fn add_teardown<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Teardown::Action(Box::new(action)));
    }

    /// Detaches a child previously passed to [`add`][Subscription::add] without cancelling it.
    pub fn remove(&self, child: &Subscription) {
        let teardowns = &mut *self.0.teardowns.lock().unwrap();
        teardowns.retain(|teardown| match teardown {
            Teardown::Child(c) => !Arc::ptr_eq(&c.0, &child.0),
            Teardown::Action(_) => true,
        });
    }

    /// Marks natural termination. Returns `false` if the subscription was already closed.
    pub(crate) fn terminate(&self) -> bool {
        self.0
            .state
            .compare_exchange(
                ACTIVE,
                TERMINATED,
                AtomicOrdering::AcqRel,
                AtomicOrdering::Acquire,
            )
            .is_ok()
    }

    /// Runs every pending teardown. Only called after the state left `ACTIVE`.
    pub(crate) fn release(&self) {
        let teardowns = mem::take(&mut *self.0.teardowns.lock().unwrap());
        for teardown in teardowns {
            teardown.run();
        }
    }

    fn push(&self, teardown: Teardown) {
        {
            let teardowns = &mut *self.0.teardowns.lock().unwrap();
            if !self.is_closed() {
                teardowns.push(teardown);
                return;
            }
        }
        teardown.run();
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Subscription {}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.0.state.load(AtomicOrdering::Acquire) {
            ACTIVE => "active",
            CANCELLED => "cancelled",
            _ => "terminated",
        };
        f.debug_tuple("Subscription").field(&state).finish()
    }
}

/// A dynamic set of subscriptions cancelled together.
///
/// Cancelling the composite cancels every child it holds exactly once. A child added after the
/// composite was cancelled is cancelled immediately instead of being leaked.
///
/// # Examples
///
/// ```
/// use pushbag::{CompositeSubscription, Subscription};
///
/// let composite = CompositeSubscription::new();
/// let children = [Subscription::new(), Subscription::new()];
/// for child in &children {
///     composite.add(child.clone());
/// }
///
/// composite.cancel();
///
/// assert!(children.iter().all(Subscription::is_cancelled));
///
/// let late = Subscription::new();
/// composite.add(late.clone());
/// assert!(late.is_cancelled());
/// ```
#[derive(Clone, Default)]
pub struct CompositeSubscription(Arc<CompositeInner>);

#[derive(Default)]
struct CompositeInner {
    cancelled: AtomicBool,
    children: Mutex<Vec<Subscription>>,
}

impl CompositeSubscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, child: Subscription) {
        {
            let children = &mut *self.0.children.lock().unwrap();
            if !self.0.cancelled.load(AtomicOrdering::Acquire) {
                children.push(child);
                return;
            }
        }
        child.cancel();
    }

    /// Removes `child` from the set without cancelling it. Returns whether it was present.
    pub fn remove(&self, child: &Subscription) -> bool {
        let children = &mut *self.0.children.lock().unwrap();
        let len = children.len();
        children.retain(|c| c != child);
        children.len() != len
    }

    pub fn len(&self) -> usize {
        self.0.children.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(AtomicOrdering::Acquire)
    }

    pub fn cancel(&self) {
        let children = {
            let children = &mut *self.0.children.lock().unwrap();
            if self.0.cancelled.swap(true, AtomicOrdering::AcqRel) {
                return;
            }
            mem::take(children)
        };
        for child in children {
            child.cancel();
        }
    }
}

impl From<CompositeSubscription> for Subscription {
    fn from(composite: CompositeSubscription) -> Self {
        let subscription = Subscription::new();
        subscription.add_teardown(move || composite.cancel());
        subscription
    }
}

impl fmt::Debug for CompositeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeSubscription")
            .field("cancelled", &self.is_cancelled())
            .field("len", &self.len())
            .finish()
    }
}

/// Holds at most one child subscription; replacing the child cancels the previous one.
///
/// Once cancelled, every child handed to [`set`][SerialSubscription::set] is cancelled on
/// arrival.
#[derive(Clone, Default)]
pub struct SerialSubscription(Arc<Mutex<SerialState>>);

#[derive(Default)]
struct SerialState {
    cancelled: bool,
    current: Option<Subscription>,
}

impl SerialSubscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, child: Subscription) {
        let previous = {
            let state = &mut *self.0.lock().unwrap();
            if state.cancelled {
                Some(child)
            } else {
                state.current.replace(child)
            }
        };
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    /// Forgets `child` if it is still the current one, without cancelling it.
    pub fn clear_if(&self, child: &Subscription) {
        let state = &mut *self.0.lock().unwrap();
        if state.current.as_ref() == Some(child) {
            state.current = None;
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.lock().unwrap().cancelled
    }

    pub fn cancel(&self) {
        let current = {
            let state = &mut *self.0.lock().unwrap();
            state.cancelled = true;
            state.current.take()
        };
        if let Some(current) = current {
            current.cancel();
        }
    }
}

impl fmt::Debug for SerialSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = &*self.0.lock().unwrap();
        f.debug_struct("SerialSubscription")
            .field("cancelled", &state.cancelled)
            .field("current", &state.current)
            .finish()
    }
}
