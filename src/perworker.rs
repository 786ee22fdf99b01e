// sptl: per-worker identity and cache-padded per-worker storage

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

/// Compile-time bound on the number of distinct workers the runtime tracks.
pub const MAX_WORKERS: usize = 128;

static NEXT_WORKER_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static MY_WORKER_ID: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Return the calling thread's worker id, assigning a fresh one (from a
/// process-wide counter) on first call. Wait-free after the first call: the
/// id is cached in a thread-local.
///
/// Panics if more than `MAX_WORKERS` distinct threads ever call this. That
/// is an invariant violation, not a recoverable condition.
#[inline]
pub fn my_id() -> usize {
    MY_WORKER_ID.with(|cell| {
        if let Some(id) = cell.get() {
            return id;
        }
        let id = NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed);
        assert!(
            id < MAX_WORKERS,
            "worker id {} exceeds MAX_WORKERS ({}): invariant violation",
            id,
            MAX_WORKERS
        );
        cell.set(Some(id));
        id
    })
}

/// Number of distinct workers that have called `my_id()` so far. Not the
/// same as the configured worker-pool size; it only grows.
pub fn live_worker_count() -> usize {
    NEXT_WORKER_ID.load(Ordering::Relaxed).min(MAX_WORKERS)
}

/// A fixed-capacity, cache-line-padded table mapping worker id to a `T`.
///
/// Every slot is wrapped in `CachePadded<T>` (padding to the platform's cache
/// line, at least 64B and in practice the 128B the original design asks
/// for on typical x86_64 line sizes) so that worker `i` writing its slot
/// never evicts worker `i+1`'s cache line.
pub struct PerWorker<T> {
    slots: Box<[CachePadded<T>]>,
}

impl<T: Default> PerWorker<T> {
    pub fn new() -> Self {
        Self::with_capacity(MAX_WORKERS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| CachePadded::new(T::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { slots }
    }
}

impl<T> PerWorker<T> {
    /// Build a table where each slot is initialized by `f(index)`.
    pub fn from_fn(capacity: usize, f: impl FnMut(usize) -> T) -> Self {
        let slots = (0..capacity)
            .map(f)
            .map(CachePadded::new)
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { slots }
    }

    /// Access the calling worker's slot.
    #[inline(always)]
    pub fn mine(&self) -> &T {
        self.slot(my_id())
    }

    #[inline(always)]
    pub fn slot(&self, i: usize) -> &T {
        &self.slots[i]
    }

    /// Iterate over every slot that has been assigned to a live worker so far.
    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        for i in 0..live_worker_count().min(self.slots.len()) {
            f(&self.slots[i]);
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
