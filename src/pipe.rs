/// Chains operators onto a source, left to right.
///
/// `pipe!(source, f, g)` is `g(f(source))`. Nothing about it is specific to sources, so it
/// chains any one-argument functions, like Ramda's `pipe` or lodash's `flow`.
///
/// # Examples
///
/// ```
/// use crossbeam_queue::SegQueue;
/// use std::sync::Arc;
///
/// use pushbag::{filter, for_each, from_iter, map, pipe, take};
///
/// let actual = Arc::new(SegQueue::new());
///
/// pipe!(
///     from_iter(1..),
///     filter(|x: &u32| x % 2 == 1),
///     map(|x: u32| x * 10),
///     take(3),
///     for_each({
///         let actual = Arc::clone(&actual);
///         move |x| actual.push(x)
///     }),
/// );
///
/// assert_eq!(actual.pop(), Some(10));
/// assert_eq!(actual.pop(), Some(30));
/// assert_eq!(actual.pop(), Some(50));
/// assert_eq!(actual.pop(), None);
/// ```
#[macro_export]
macro_rules! pipe {
    ($a:expr, $b:expr $(,)?) => { $b($a) };
    ($a:expr, $b:expr, $($rest:expr),* $(,)?) => {
        $crate::pipe!($b($a), $($rest),*)
    };
}
