// sptl: parallel-for

use crate::fork::fork2;
use crate::guard::spguard;

/// Execute `body(i)` for each `i` in `[lo, hi)`, splitting the range by
/// recursive binary halving guarded by `spguard` at each level. `comp_rng`
/// estimates the cost of a subrange; `seq_body` runs a whole subrange
/// sequentially once the controller decides that subrange is small.
pub fn parallel_for(
    lo: usize,
    hi: usize,
    comp_rng: impl Fn(usize, usize) -> u64 + Sync + Copy,
    body: impl Fn(usize) + Sync + Copy,
    seq_body: impl Fn(usize, usize) + Sync + Copy,
) {
    let c = comp_rng(lo, hi);
    spguard(
        "sptl::parallel_for",
        || c,
        || parallel_rec(lo, hi, comp_rng, body, seq_body),
        || seq_body(lo, hi),
    );
}

fn parallel_rec(
    lo: usize,
    hi: usize,
    comp_rng: impl Fn(usize, usize) -> u64 + Sync + Copy,
    body: impl Fn(usize) + Sync + Copy,
    seq_body: impl Fn(usize, usize) + Sync + Copy,
) {
    let n = hi - lo;
    if n == 0 {
        return;
    }
    if n == 1 {
        body(lo);
        return;
    }
    let mid = lo + n / 2;
    fork2(
        || parallel_for(lo, mid, comp_rng, body, seq_body),
        || parallel_for(mid, hi, comp_rng, body, seq_body),
    );
}

/// `parallel_for` with the default range-cost function `hi - lo` and a
/// synthesized straight-loop `seq_body`.
pub fn parallel_for_default(lo: usize, hi: usize, body: impl Fn(usize) + Sync + Copy) {
    parallel_for(
        lo,
        hi,
        |l, h| (h - l) as u64,
        body,
        move |l, h| {
            for i in l..h {
                body(i);
            }
        },
    );
}

/// Weighted variant: ranges are split by cumulative
/// weight rather than by index count, using a precomputed `weights` prefix
/// table (see `sums::weights`) as the source of `comp_rng`.
pub fn parallel_for_with_weights(
    lo: usize,
    hi: usize,
    weights: &[u64],
    body: impl Fn(usize) + Sync + Copy,
) {
    let comp_rng = |l: usize, h: usize| weights[h] - weights[l];
    parallel_for(
        lo,
        hi,
        comp_rng,
        body,
        move |l, h| {
            for i in l..h {
                body(i);
            }
        },
    );
}
