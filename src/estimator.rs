// sptl: per-call-site cost estimator
//
// An estimator cell packs `cst` (cost per unit complexity, microseconds) and
// `nmax` (the largest complexity ever observed to complete within `kappa`)
// as two f32 lanes of a single AtomicU64, so the hot-path `is_small` check
// is one lock-free load and `report` can publish both fields in one CAS.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::config::RuntimeParams;
use crate::logging;
use crate::timer::{cas_with_backoff, microseconds_of};

pub type Complexity = u64;

/// Process-wide map from call-site tag to its estimator cell.
pub struct EstimatorTable {
    cells: RwLock<FxHashMap<&'static str, Arc<Estimator>>>,
}

impl EstimatorTable {
    fn new() -> Self {
        Self {
            cells: RwLock::new(FxHashMap::default()),
        }
    }

    /// Fetch the estimator for `tag`, creating it on first reference.
    pub fn get_or_create(&self, tag: &'static str) -> Arc<Estimator> {
        if let Some(existing) = self.cells.read().get(tag) {
            return existing.clone();
        }
        self.cells
            .write()
            .entry(tag)
            .or_insert_with(|| Arc::new(Estimator::new(tag)))
            .clone()
    }

    /// Seed `cst` values from a parsed constants file. Unknown
    /// names in the file are ignored; names absent from the file are left
    /// untouched (possibly still undefined).
    pub fn load_constants(&self, text: &str) {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(name), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            let Ok(cst) = value.parse::<f32>() else {
                continue;
            };
            if let Some(cell) = self.cells.read().get(name) {
                cell.seed_cst(cst);
            }
            // Names with no existing cell are ignored: they name a call site
            // not yet reached in this run, and seeding a cell the controller
            // hasn't created yet would require fabricating it speculatively.
        }
    }

    /// Dump every known `(name, cst)` pair in the constants-file format.
    pub fn dump_constants(&self) -> String {
        let mut out = String::new();
        for (name, cell) in self.cells.read().iter() {
            if cell.is_defined() {
                let (cst, _) = unpack(cell.state.load(Ordering::Acquire));
                out.push_str(&format!("{name} {cst}\n"));
            }
        }
        out
    }
}

static TABLE: OnceLock<EstimatorTable> = OnceLock::new();

pub fn table() -> &'static EstimatorTable {
    TABLE.get_or_init(EstimatorTable::new)
}

#[inline(always)]
fn pack(cst: f32, nmax: f32) -> u64 {
    ((cst.to_bits() as u64) << 32) | (nmax.to_bits() as u64)
}

#[inline(always)]
fn unpack(word: u64) -> (f32, f32) {
    let cst = f32::from_bits((word >> 32) as u32);
    let nmax = f32::from_bits((word & 0xFFFF_FFFF) as u32);
    (cst, nmax)
}

/// A single call site's learned cost model.
///
/// `state == 0` denotes "undefined": no measurement has ever been published.
/// Two 128-byte padding regions sandwich `state` to keep it off a cache line
/// shared with neighboring estimator cells in the table.
pub struct Estimator {
    _pad0: [u8; 128],
    state: AtomicU64,
    _pad1: [u8; 128],
    name: String,
}

impl Estimator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            _pad0: [0; 128],
            state: AtomicU64::new(0),
            _pad1: [0; 128],
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn is_undefined(&self) -> bool {
        self.state.load(Ordering::Acquire) == 0
    }

    #[inline(always)]
    pub fn is_defined(&self) -> bool {
        !self.is_undefined()
    }

    /// Seed `cst` from a persisted constants file. Never fabricates
    /// an `nmax`: a loaded cell starts with `nmax = 1`, so the very next
    /// `report` establishes a real, measured bound.
    pub fn seed_cst(&self, cst: f32) {
        self.state.store(pack(cst, 1.0), Ordering::Release);
    }

    /// Report that a body of the given `complexity` took `elapsed` cycles.
    /// Drops the report (no-op) if the elapsed time exceeds `kappa`.
    pub fn report(&self, complexity: Complexity, elapsed_cycles: u64, params: &RuntimeParams) {
        let elapsed_us = microseconds_of(elapsed_cycles);
        if elapsed_us > params.kappa {
            logging::buffer().push_dropped_report(&self.name, complexity, elapsed_us);
            return;
        }
        let cst = (elapsed_us / complexity.max(1) as f64) as f32;
        loop {
            let current = self.state.load(Ordering::Acquire);
            let (_, nmax0) = unpack(current);
            if (complexity as f32) <= nmax0 {
                break;
            }
            let desired = pack(cst, complexity as f32);
            if cas_with_backoff(&self.state, current, desired) {
                logging::buffer().push_measured_run(&self.name, complexity as f64, elapsed_cycles as f64);
                break;
            }
            // cas_with_backoff already spun for the backoff interval; reread and retry
        }
    }

    /// Is a request of the given complexity "small" (safe to run sequentially)?
    ///
    /// Pessimistic when undefined: returns `false` so the first observation
    /// is made by the parallel path.
    #[inline(always)]
    pub fn is_small(&self, complexity: Complexity, params: &RuntimeParams) -> bool {
        let word = self.state.load(Ordering::Acquire);
        if word == 0 {
            return false;
        }
        let (cst, nmax) = unpack(word);
        let c = complexity as f32;
        if c <= nmax {
            return true;
        }
        let alpha = params.alpha as f32;
        c <= alpha * nmax && (c as f64) * (cst as f64) <= params.alpha * params.kappa
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeParams;

    fn params() -> RuntimeParams {
        RuntimeParams {
            kappa: 100.0,
            alpha: 1.2,
            ..RuntimeParams::defaults()
        }
    }

    #[test]
    fn undefined_cell_is_never_small() {
        let est = Estimator::new("site");
        assert!(est.is_undefined());
        assert!(!est.is_small(1, &params()));
    }

    #[test]
    fn report_within_kappa_defines_the_cell_and_sets_nmax() {
        let est = Estimator::new("site");
        crate::timer::set_cpu_frequency_ghz(1.0);
        // 50 cycles at 1 GHz == 50 ns == 0.05 us, well under kappa=100us
        est.report(10, 50, &params());
        assert!(est.is_defined());
        assert!(est.is_small(10, &params()));
    }

    #[test]
    fn report_above_kappa_is_dropped() {
        let est = Estimator::new("site");
        crate::timer::set_cpu_frequency_ghz(1.0);
        // 1_000_000 cycles at 1GHz == 1ms == 1000us > kappa=100us
        est.report(10, 1_000_000, &params());
        assert!(est.is_undefined());
    }

    #[test]
    fn nmax_is_monotone_non_decreasing() {
        let est = Estimator::new("site");
        crate::timer::set_cpu_frequency_ghz(1.0);
        est.report(10, 50, &params());
        let (_, nmax_after_first) = unpack(est.state.load(Ordering::Acquire));
        est.report(5, 50, &params()); // smaller complexity must not shrink nmax
        let (_, nmax_after_second) = unpack(est.state.load(Ordering::Acquire));
        assert!(nmax_after_second >= nmax_after_first);
        est.report(20, 50, &params());
        let (_, nmax_after_third) = unpack(est.state.load(Ordering::Acquire));
        assert!(nmax_after_third >= nmax_after_second);
    }

    #[test]
    fn is_small_is_pure_given_fixed_state_and_complexity() {
        let est = Estimator::new("site");
        crate::timer::set_cpu_frequency_ghz(1.0);
        est.report(10, 50, &params());
        let a = est.is_small(7, &params());
        let b = est.is_small(7, &params());
        assert_eq!(a, b);
    }
}
