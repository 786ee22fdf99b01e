// sptl: a parallel-programming runtime with online granularity control
// Decides, at every fork point, whether to run sequentially or in parallel
// by learning per-call-site cost models from measurement.

#![warn(clippy::all)]
#![warn(rust_2018_idioms)]
// Note: unsafe code is isolated to platform/guard/fork and documented with
// safety justifications at each use.

//! # sptl
//!
//! A series-parallel fork-join runtime with online granularity control:
//! nested `spguard`/`fork2` calls let divide-and-conquer algorithms express
//! unbounded parallelism while a per-call-site cost estimator decides, from
//! actual measurements, how far down the recursion to keep forking before
//! falling back to straight-line sequential code.
//!
//! ## Key components
//!
//! - **Timer**: RDTSC-based cycle counting and CAS-with-backoff primitives.
//! - **Per-worker state**: thread-local worker ids and cache-padded arrays.
//! - **Estimator**: the learned cost model behind `is_small`.
//! - **Guard**: the granularity controller (`spguard`) and its mode stack.
//! - **Fork**: `fork2`, the pluggable fork-join primitive.
//! - **Skeletons**: `parallel_for`, `reduce`, `scan`, `pack`/`filter`,
//!   `sums`/`weights`.
//! - **Launch**: process bootstrap tying configuration, logging, the
//!   estimator table, and the worker pool together.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sptl::prelude::*;
//!
//! sptl::launch(|| {
//!     let values: Vec<u64> = (0..1_000_000).collect();
//!     let total = reduce(&values, 0u64, |a, b| a + b);
//!     println!("{total}");
//! }).unwrap();
//! ```

pub mod callback;
pub mod config;
pub mod error;
pub mod estimator;
pub mod fork;
pub mod guard;
pub mod launch;
pub mod logging;
#[macro_use]
pub mod macros;
pub mod pack;
pub mod parallel_for;
pub mod perworker;
pub mod platform;
pub mod reduce;
pub mod scan;
pub mod sums;
pub mod timer;

pub use fork::fork2;
pub use guard::spguard;
pub use launch::launch;
pub use pack::{filter, filteri, pack, pack_index, pack_with};
pub use parallel_for::{parallel_for, parallel_for_default, parallel_for_with_weights};
pub use reduce::{max_index, reduce, reduce_with, TiePolicy};
pub use scan::{scan, ScanType};
pub use sums::{sums, weights};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::error::LaunchError;
    pub use crate::fork::fork2;
    pub use crate::guard::spguard;
    pub use crate::launch::launch;
    pub use crate::pack::{filter, filteri, pack, pack_index};
    pub use crate::parallel_for::{parallel_for, parallel_for_default, parallel_for_with_weights};
    pub use crate::reduce::{max_index, reduce, TiePolicy};
    pub use crate::scan::{scan, ScanType};
    pub use crate::sums::{sums, weights};
}
