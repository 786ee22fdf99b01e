// sptl: fork-join primitive `fork2`
//
// `fork2` is the accounting wrapper; `primitive_fork2` is the pluggable
// fork-join substrate it wraps. This implementation backs `primitive_fork2`
// with `rayon::join` (work-stealing, migration-capable), matching the
// dependency already present in this codebase's workspace stack, and offers
// a sequential fallback for hosts that never construct a `rayon::ThreadPool`.

use crate::guard::{measured_window, worker_states};
use crate::timer::cycles_now;

/// Any fork-join substrate providing "both run; return after both complete;
/// either may migrate" semantics.
pub trait Primitive: Send + Sync {
    fn fork2<L, R>(&self, bl: impl FnOnce() -> L + Send, br: impl FnOnce() -> R + Send) -> (L, R)
    where
        L: Send,
        R: Send;
}

/// The default substrate: `rayon::join`.
pub struct RayonPrimitive;

impl Primitive for RayonPrimitive {
    #[inline]
    fn fork2<L, R>(&self, bl: impl FnOnce() -> L + Send, br: impl FnOnce() -> R + Send) -> (L, R)
    where
        L: Send,
        R: Send,
    {
        rayon::join(bl, br)
    }
}

/// A trivial sequential fallback, for tests and hosts with no thread pool.
pub struct SequentialPrimitive;

impl Primitive for SequentialPrimitive {
    #[inline]
    fn fork2<L, R>(&self, bl: impl FnOnce() -> L + Send, br: impl FnOnce() -> R + Send) -> (L, R)
    where
        L: Send,
        R: Send,
    {
        let l = bl();
        let r = br();
        (l, r)
    }
}

/// Fork two bodies under the current mode, keeping per-worker accounting
/// coherent across the join. Uses `RayonPrimitive` as the
/// underlying substrate.
pub fn fork2<L, R>(bl: impl FnOnce() -> L + Send, br: impl FnOnce() -> R + Send) -> (L, R)
where
    L: Send,
    R: Send,
{
    fork2_with(&RayonPrimitive, bl, br)
}

/// `fork2`, parameterized over the fork-join substrate. Exposed so tests and
/// alternative hosts can swap in `SequentialPrimitive`.
pub fn fork2_with<P: Primitive, L, R>(
    primitive: &P,
    bl: impl FnOnce() -> L + Send,
    br: impl FnOnce() -> R + Send,
) -> (L, R)
where
    L: Send,
    R: Send,
{
    let state = worker_states().mine();
    if state.is_small() {
        let l = bl();
        let r = br();
        return (l, r);
    }

    let t_before = state.close_window();

    let ((l, t_left), (r, t_right)) =
        primitive.fork2(move || measured_window(bl), move || measured_window(br));

    // Re-fetch `mine()`: the joining worker may differ from the forking one.
    let state = worker_states().mine();
    state.resume_after_join(t_before, t_left, t_right);

    (l, r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork2_runs_both_sides_and_returns_both_results() {
        let (l, r) = fork2(|| 1 + 1, || 2 + 2);
        assert_eq!(l, 2);
        assert_eq!(r, 4);
    }

    #[test]
    fn fork2_small_subtree_runs_sequentially() {
        let state = worker_states().mine();
        state.set_is_small(true);
        let order = std::sync::Mutex::new(Vec::new());
        fork2(
            || order.lock().unwrap().push("left"),
            || order.lock().unwrap().push("right"),
        );
        assert_eq!(*order.lock().unwrap(), vec!["left", "right"]);
        state.set_is_small(false);
    }

    #[test]
    fn fork2_leaves_a_consistent_window_and_advances_timer() {
        let state = worker_states().mine();
        let before = cycles_now();
        fork2(|| 1, || 2);
        let (_total, timer) = state.snapshot();
        assert!(timer >= before);
    }

    #[test]
    fn panic_in_one_forked_body_restores_the_prior_window_and_recovers() {
        let state = worker_states().mine();
        state.set_is_small(false);
        let before = state.snapshot();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            fork2_with(&SequentialPrimitive, || panic!("boom in left body"), || 2)
        }));
        assert!(outcome.is_err());
        assert_eq!(
            state.snapshot(),
            before,
            "a panicking forked body must not leave the window mid-flight"
        );

        // Subsequent fork2 calls on this worker still behave normally.
        let (l, r) = fork2_with(&SequentialPrimitive, || 1 + 1, || 2 + 2);
        assert_eq!((l, r), (2, 4));
    }
}
