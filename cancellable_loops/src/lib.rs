//! # cancellable_loops
//!
//! A small utility crate for creating cancellable loops in both sequential and parallel contexts.
//!
//! Every loop checks an abort flag before each item and reports an abort as `Err(Aborted)`, so
//! the caller can tell a finished computation from an interrupted one and discard partial work.
//!
//! ## Features
//!
//! - Sequential loop with cancellation and early stop support
//! - Parallel loop with cancellation support using Rayon
//! - Parallel loop with cancellation and fallible bodies
//!
//! ## Example
//!
//! ```
//! use std::ops::ControlFlow;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use cancellable_loops::{for_each_cancellable, Aborted};
//!
//! let abort_flag = AtomicBool::new(false);
//! let mut visited = 0;
//!
//! let result = for_each_cancellable(0..1000, &abort_flag, |i| {
//!     visited += 1;
//!     if i == 9 {
//!         // e.g. another thread requests an abort
//!         abort_flag.store(true, Ordering::Relaxed);
//!     }
//!     ControlFlow::Continue(())
//! });
//!
//! assert_eq!(result, Err(Aborted));
//! assert_eq!(visited, 10);
//! ```

use rayon::prelude::*;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};

/// Error returned when a loop was interrupted by its abort flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aborted;

impl fmt::Display for Aborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loop aborted")
    }
}

impl std::error::Error for Aborted {}

/// How a sequential loop ended when it was not aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The iterator was exhausted.
    Exhausted,
    /// The loop body returned `ControlFlow::Break`.
    Stopped,
}

/// Executes a sequential loop that can be cancelled via an abort flag.
///
/// The loop body returns a `ControlFlow`, so iterative algorithms can stop on their own
/// (e.g. once converged) while still being interruptible from the outside.
///
/// # Arguments
///
/// * `iter` - Any iterator to process
/// * `abort_flag` - An atomic boolean that can be set to `true` to cancel the loop
/// * `func` - A function to apply to each element in the iterator
///
/// # Returns
///
/// `Ok(Completion::Exhausted)` when all items were processed, `Ok(Completion::Stopped)` when the
/// body stopped the loop and `Err(Aborted)` when the abort flag was observed.
///
/// # Examples
///
/// ```
/// use std::ops::ControlFlow;
/// use std::sync::atomic::AtomicBool;
/// use cancellable_loops::{for_each_cancellable, Completion};
///
/// let abort_flag = AtomicBool::new(false);
/// let mut sum = 0;
///
/// let completion = for_each_cancellable(1..=10, &abort_flag, |i| {
///     sum += i;
///     if sum >= 15 {
///         ControlFlow::Break(())
///     } else {
///         ControlFlow::Continue(())
///     }
/// });
///
/// // The loop stopped after processing 5 elements (1+2+3+4+5=15)
/// assert_eq!(completion, Ok(Completion::Stopped));
/// assert_eq!(sum, 15);
/// ```
pub fn for_each_cancellable<I, F, T>(
    iter: I,
    abort_flag: &AtomicBool,
    mut func: F,
) -> Result<Completion, Aborted>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> ControlFlow<()>,
{
    for item in iter {
        if abort_flag.load(Ordering::Relaxed) {
            return Err(Aborted);
        }
        if func(item).is_break() {
            return Ok(Completion::Stopped);
        }
    }
    Ok(Completion::Exhausted)
}

/// Executes a parallel loop that can be cancelled via an abort flag.
///
/// This function parallelizes the iteration over the provided iterator using Rayon
/// and applies the given function to each element. If the abort flag is set to `true`
/// at any point, remaining work is skipped and `Err(Aborted)` is returned.
///
/// # Arguments
///
/// * `iter` - Any parallel iterator to process
/// * `abort_flag` - An atomic boolean that can be set to `true` to cancel the loop
/// * `func` - A function to apply to each element in the iterator
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
/// use cancellable_loops::{par_for_each_cancellable, Aborted};
///
/// let abort_flag = AtomicBool::new(false);
/// let counter = AtomicUsize::new(0);
///
/// let result = par_for_each_cancellable(0..100, &abort_flag, |_| {
///     counter.fetch_add(1, Ordering::Relaxed);
/// });
/// assert_eq!(result, Ok(()));
/// assert_eq!(counter.load(Ordering::Relaxed), 100);
///
/// abort_flag.store(true, Ordering::Relaxed);
/// assert_eq!(par_for_each_cancellable(0..100, &abort_flag, |_| {}), Err(Aborted));
/// ```
pub fn par_for_each_cancellable<I, F>(iter: I, abort_flag: &AtomicBool, func: F) -> Result<(), Aborted>
where
    I: IntoParallelIterator,
    F: Fn(I::Item) + Sync + Send,
    I::Item: Send,
{
    iter.into_par_iter().try_for_each(|item| {
        if abort_flag.load(Ordering::Relaxed) {
            Err(Aborted)
        } else {
            func(item);
            Ok(())
        }
    })
}

/// Executes a parallel loop with a fallible body that can be cancelled via an abort flag.
///
/// The first error returned by `func` stops the loop and is returned to the caller. An observed
/// abort flag is converted into the caller's error type through `From<Aborted>`.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::AtomicBool;
/// use cancellable_loops::{par_try_for_each_cancellable, Aborted};
///
/// #[derive(Debug, PartialEq)]
/// enum Error {
///     Negative(i32),
///     Aborted,
/// }
///
/// impl From<Aborted> for Error {
///     fn from(_: Aborted) -> Self {
///         Error::Aborted
///     }
/// }
///
/// let abort_flag = AtomicBool::new(false);
/// let values = vec![3, 1, -4, 1, 5];
///
/// let result = par_try_for_each_cancellable(values, &abort_flag, |v| {
///     if v < 0 { Err(Error::Negative(v)) } else { Ok(()) }
/// });
/// assert_eq!(result, Err(Error::Negative(-4)));
/// ```
pub fn par_try_for_each_cancellable<I, F, E>(iter: I, abort_flag: &AtomicBool, func: F) -> Result<(), E>
where
    I: IntoParallelIterator,
    F: Fn(I::Item) -> Result<(), E> + Sync + Send,
    I::Item: Send,
    E: From<Aborted> + Send,
{
    iter.into_par_iter().try_for_each(|item| {
        if abort_flag.load(Ordering::Relaxed) {
            Err(E::from(Aborted))
        } else {
            func(item)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_sequential_loop_exhausts_iterator() {
        let abort_flag = AtomicBool::new(false);
        let mut count = 0;
        let result = for_each_cancellable(0..7, &abort_flag, |_| {
            count += 1;
            ControlFlow::Continue(())
        });
        assert_eq!(result, Ok(Completion::Exhausted));
        assert_eq!(count, 7);
    }

    #[test]
    fn test_sequential_loop_does_not_reset_abort_flag() {
        let abort_flag = AtomicBool::new(true);
        let result = for_each_cancellable(0..3, &abort_flag, |_| ControlFlow::Continue(()));
        assert_eq!(result, Err(Aborted));
        // the flag belongs to the caller, a second loop sees it as well
        assert!(abort_flag.load(Ordering::Relaxed));
        let result = for_each_cancellable(0..3, &abort_flag, |_| ControlFlow::Continue(()));
        assert_eq!(result, Err(Aborted));
    }

    #[test]
    fn test_parallel_loop_skips_everything_when_aborted_up_front() {
        let abort_flag = AtomicBool::new(true);
        let counter = AtomicUsize::new(0);
        let result = par_for_each_cancellable(0..1000, &abort_flag, |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(result, Err(Aborted));
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_parallel_try_loop_converts_abort() {
        #[derive(Debug, PartialEq)]
        struct Interrupted;
        impl From<Aborted> for Interrupted {
            fn from(_: Aborted) -> Self {
                Interrupted
            }
        }

        let abort_flag = AtomicBool::new(true);
        let result: Result<(), Interrupted> =
            par_try_for_each_cancellable(0..10, &abort_flag, |_| Ok(()));
        assert_eq!(result, Err(Interrupted));

        abort_flag.store(false, Ordering::Relaxed);
        let result: Result<(), Interrupted> =
            par_try_for_each_cancellable(0..10, &abort_flag, |_| Ok(()));
        assert_eq!(result, Ok(()));
    }
}
