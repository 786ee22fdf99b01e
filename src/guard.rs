// sptl: granularity controller and `spguard`
//
// Each worker owns one `WorkerState`: a short execution-mode stack, the
// `is_small` short-circuit flag, and the `total`/`timer` accounting pair that
// `spguard` and `fork2` (see `fork.rs`) keep consistent across measured
// windows. Only the thread holding a given worker id ever touches that
// worker's slot (see `perworker::my_id`), so `WorkerState` uses a documented
// single-owner `UnsafeCell` rather than per-field atomics or a mutex.

use std::cell::UnsafeCell;
use std::sync::OnceLock;

use arrayvec::ArrayVec;

use crate::config;
use crate::estimator::{self, Complexity};
use crate::logging;
use crate::perworker::PerWorker;
use crate::timer::cycles_now;

const MAX_MODE_DEPTH: usize = 8;

/// The execution mode in effect at the top of a worker's nesting stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    ForceSequential,
    ForceParallel,
    Sequential,
    Parallel,
}

struct Inner {
    execmode: ArrayVec<ExecMode, MAX_MODE_DEPTH>,
    is_small: bool,
    total: u64,
    timer: u64,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            execmode: ArrayVec::new(),
            is_small: false,
            total: 0,
            timer: 0,
        }
    }
}

pub struct WorkerState {
    inner: UnsafeCell<Inner>,
}

impl Default for WorkerState {
    fn default() -> Self {
        Self {
            inner: UnsafeCell::new(Inner::default()),
        }
    }
}

// SAFETY: a `WorkerState` slot in the per-worker table is read and written
// only by the single thread whose thread-local worker id indexes that slot
// (see `perworker::my_id`); no two threads ever alias the same slot.
unsafe impl Sync for WorkerState {}

impl WorkerState {
    #[inline(always)]
    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        // SAFETY: see the `unsafe impl Sync` justification above.
        unsafe { f(&mut *self.inner.get()) }
    }

    #[inline(always)]
    pub fn is_small(&self) -> bool {
        self.with(|s| s.is_small)
    }

    #[doc(hidden)]
    pub fn set_is_small(&self, value: bool) {
        self.with(|s| s.is_small = value);
    }

    /// Close the current accounting window, returning its elapsed total.
    /// Used by `fork2` just before opening measured sub-windows.
    pub(crate) fn close_window(&self) -> u64 {
        self.with(|s| s.total + cycles_now().saturating_sub(s.timer))
    }

    /// After a join, resume accounting on the (possibly different) joining
    /// worker: `total = t_before + t_left + t_right`, `timer = now()`.
    pub(crate) fn resume_after_join(&self, t_before: u64, t_left: u64, t_right: u64) {
        self.with(|s| {
            s.total = t_before + t_left + t_right;
            s.timer = cycles_now();
        });
    }

    /// Current `(total, timer)`, for tests and diagnostics.
    pub fn snapshot(&self) -> (u64, u64) {
        self.with(|s| (s.total, s.timer))
    }

    pub fn push_mode(&self, mode: ExecMode) {
        self.with(|s| {
            crate::hot_debug_assert!(s.execmode.len() < MAX_MODE_DEPTH);
            if s.execmode.try_push(mode).is_err() {
                crate::error::fail_invariant("execmode stack overflow");
            }
        });
    }

    pub fn pop_mode(&self) -> Option<ExecMode> {
        self.with(|s| s.execmode.pop())
    }
}

static WORKER_STATES: OnceLock<PerWorker<WorkerState>> = OnceLock::new();

pub fn worker_states() -> &'static PerWorker<WorkerState> {
    WORKER_STATES.get_or_init(PerWorker::new)
}

/// Restores a worker's `(total, timer)` pair to its pre-window value on
/// drop, unless `commit()` has run first. Covers the case where the body
/// running inside a measured window panics: without this, the window is
/// left zeroed/mid-flight forever on that worker, skewing every later
/// `is_small` decision it makes.
struct WindowGuard<'a> {
    state: &'a WorkerState,
    prev_total: u64,
    prev_timer: u64,
    committed: bool,
}

impl<'a> WindowGuard<'a> {
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for WindowGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.state.with(|s| {
                s.total = self.prev_total;
                s.timer = self.prev_timer;
            });
        }
    }
}

/// Resets a worker's `is_small` flag to `false` on drop, regardless of
/// whether the guarded body returned normally or panicked. Without this,
/// a panic inside the sequential body of `spguard`'s small branch leaves
/// `is_small` stuck at `true` for the rest of the worker's life: every
/// later `spguard` call on that thread would silently take the sequential
/// path forever.
struct IsSmallGuard<'a> {
    state: &'a WorkerState,
}

impl Drop for IsSmallGuard<'_> {
    fn drop(&mut self) {
        self.state.set_is_small(false);
    }
}

/// Run `f` with exclusive access to a fresh measured window on the calling
/// worker, returning `f`'s result alongside the window's own elapsed time
/// (`total` accumulated during `f`, plus the time since the window reopened).
/// Used by both `spguard`'s large branch and `fork2`'s sub-bodies. If `f`
/// panics, the worker's window is restored to what it was before this call
/// rather than left mid-flight.
#[inline]
pub(crate) fn measured_window<T>(f: impl FnOnce() -> T) -> (T, u64) {
    let state = worker_states().mine();
    let (prev_total, prev_timer) = state.snapshot();
    state.with(|s| {
        s.total = 0;
        s.timer = cycles_now();
    });
    let guard = WindowGuard {
        state,
        prev_total,
        prev_timer,
        committed: false,
    };
    let result = f();
    let t_body = state.with(|s| s.total + cycles_now().saturating_sub(s.timer));
    guard.commit();
    (result, t_body)
}

/// Pick sequential or parallel for a call site tagged `tag`, run the chosen
/// body, and keep the worker's accounting window consistent.
pub fn spguard<R>(
    tag: &'static str,
    complexity_fn: impl FnOnce() -> Complexity,
    parallel_body: impl FnOnce() -> R,
    sequential_body: impl FnOnce() -> R,
) -> R {
    let state = worker_states().mine();
    if state.is_small() {
        return sequential_body();
    }

    let complexity = complexity_fn();
    let est = estimator::table().get_or_create(tag);
    let params = config::global_params();

    if est.is_small(complexity, &params) {
        state.with(|s| s.is_small = true);
        let _is_small_guard = IsSmallGuard { state };
        let t0 = cycles_now();
        let result = sequential_body();
        let elapsed = cycles_now().saturating_sub(t0);
        est.report(complexity, elapsed, &params);
        logging::buffer().push_sequential_run(tag, complexity as f64, elapsed as f64);
        result
    } else {
        crate::hot_debug_assert!(!state.is_small());
        let t_before = state.with(|s| s.total + cycles_now().saturating_sub(s.timer));
        let (result, t_body) = measured_window(parallel_body);
        est.report(complexity, t_body, &params);
        state.with(|s| {
            s.total = t_before + t_body;
            s.timer = cycles_now();
        });
        result
    }
}

/// `spguard` with a single body used on both branches.
pub fn spguard1<R>(
    tag: &'static str,
    complexity_fn: impl FnOnce() -> Complexity,
    body: impl Fn() -> R,
) -> R {
    spguard(tag, complexity_fn, || body(), || body())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_subtree_short_circuits_the_estimator() {
        let state = worker_states().mine();
        state.with(|s| s.is_small = true);
        let ran = std::cell::Cell::new(false);
        spguard(
            "test::inner",
            || panic!("complexity_fn must not run inside a small subtree"),
            || panic!("parallel body must not run inside a small subtree"),
            || ran.set(true),
        );
        assert!(ran.get());
        state.with(|s| s.is_small = false);
    }

    #[test]
    fn undefined_estimator_takes_the_parallel_branch() {
        let ran_parallel = std::cell::Cell::new(false);
        spguard(
            "test::undefined",
            || 100,
            || ran_parallel.set(true),
            || panic!("sequential body must not run when the estimator is undefined"),
        );
        assert!(ran_parallel.get());
    }

    #[test]
    fn panic_in_small_sequential_body_does_not_wedge_is_small() {
        let tag = "test::guard_panic_small_body";
        crate::timer::set_cpu_frequency_ghz(1.0);
        let params = config::global_params();
        // 50 cycles at 1GHz under kappa=100us defines the cell and marks
        // complexity 10 as small for the next call.
        estimator::table().get_or_create(tag).report(10, 50, &params);

        let state = worker_states().mine();
        assert!(!state.is_small());

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            spguard(
                tag,
                || 10,
                || panic!("parallel body must not run on a small call site"),
                || panic!("boom"),
            )
        }));
        assert!(outcome.is_err());
        assert!(
            !state.is_small(),
            "a panicking sequential body must not leave is_small stuck at true"
        );

        // The worker must still make a normal small-branch decision afterward.
        let ran = std::cell::Cell::new(false);
        spguard(
            tag,
            || 10,
            || panic!("parallel body must not run on a small call site"),
            || ran.set(true),
        );
        assert!(ran.get());
    }

    #[test]
    fn panic_in_measured_window_restores_the_prior_window() {
        let state = worker_states().mine();
        state.with(|s| {
            s.total = 0;
            s.timer = cycles_now();
        });
        let before = state.snapshot();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            measured_window(|| panic!("boom in measured body"))
        }));
        assert!(outcome.is_err());
        assert_eq!(
            state.snapshot(),
            before,
            "a panicking body must not leave the window zeroed/mid-flight"
        );
    }
}
