// sptl: block-parallel prefix sums and weights
//
// Grounded in the original source's `spsums.hpp`/`spweight.hpp`: partition
// into blocks of size `k`, reduce each block sequentially, scan the block
// partials, then let each block absorb its seed. Used internally by scan's
// block-partial pass and by the weighted `parallel_for` variant.

use crate::fork::fork2;
use crate::guard::spguard;

const BLOCK_SIZE: usize = 1024;

/// Block-parallel prefix sums over `[lo, hi)`: `combine` is the associative
/// operator, `lift(i)` maps an index to the value contributed at `i`.
/// Returns `(prefix, total)` where `prefix[j]` is the sum of `lift` over
/// `[lo, lo + j)` and `total` is the grand sum over the whole range.
pub fn sums(
    lo: usize,
    hi: usize,
    identity: u64,
    combine: impl Fn(u64, u64) -> u64 + Sync + Copy,
    lift: impl Fn(usize) -> u64 + Sync + Copy,
) -> (Vec<u64>, u64) {
    let n = hi - lo;
    if n == 0 {
        return (Vec::new(), identity);
    }
    let mut prefix = vec![identity; n];
    rec(lo, hi, lo, identity, combine, lift, &mut prefix);
    let total = combine(prefix[n - 1], lift(hi - 1));
    (prefix, total)
}

/// `weights` specialized to a unary weight function: `weights(lo, hi, w)[j]`
/// is `sum(w(lo..lo+j))`, with a trailing grand total at index `hi - lo`,
/// giving an `(hi - lo + 1)`-length prefix table directly usable as the
/// `comp_rng` source for `parallel_for_with_weights`.
pub fn weights(lo: usize, hi: usize, weight_fn: impl Fn(usize) -> u64 + Sync + Copy) -> Vec<u64> {
    let (prefix, total) = sums(lo, hi, 0, |a, b| a + b, weight_fn);
    let mut out = prefix;
    out.push(total);
    out
}

fn block_range(lo: usize, hi: usize, b: usize) -> (usize, usize) {
    let l = lo + b * BLOCK_SIZE;
    let h = (lo + (b + 1) * BLOCK_SIZE).min(hi);
    (l, h)
}

fn sequential_scan(
    lo: usize,
    hi: usize,
    base: usize,
    seed: u64,
    combine: impl Fn(u64, u64) -> u64,
    lift: impl Fn(usize) -> u64,
    dst: &mut [u64],
) {
    let mut acc = seed;
    for i in lo..hi {
        dst[i - base] = acc;
        acc = combine(acc, lift(i));
    }
}

#[allow(clippy::too_many_arguments)]
fn rec(
    lo: usize,
    hi: usize,
    base: usize,
    identity: u64,
    combine: impl Fn(u64, u64) -> u64 + Sync + Copy,
    lift: impl Fn(usize) -> u64 + Sync + Copy,
    dst: &mut [u64],
) {
    let n = hi - lo;
    if n == 0 {
        return;
    }
    let nb_blocks = (n + BLOCK_SIZE - 1) / BLOCK_SIZE;
    if nb_blocks <= 1 {
        sequential_scan(lo, hi, base, identity, combine, lift, dst);
        return;
    }

    let mut block_sums = vec![identity; nb_blocks];
    spguard(
        "sptl::sums::block_reduce",
        || n as u64,
        || {
            parallel_fill_blocks(0, nb_blocks, &mut block_sums, |b, slot| {
                let (l, h) = block_range(lo, hi, b);
                let mut acc = identity;
                for i in l..h {
                    acc = combine(acc, lift(i));
                }
                *slot = acc;
            })
        },
        || {
            for (b, slot) in block_sums.iter_mut().enumerate() {
                let (l, h) = block_range(lo, hi, b);
                let mut acc = identity;
                for i in l..h {
                    acc = combine(acc, lift(i));
                }
                *slot = acc;
            }
        },
    );

    // Exclusive scan of the (small, nb_blocks-sized) block-partials array.
    let mut block_prefix = vec![identity; nb_blocks];
    let mut running = identity;
    for b in 0..nb_blocks {
        block_prefix[b] = running;
        running = combine(running, block_sums[b]);
    }

    spguard(
        "sptl::sums::block_scan",
        || n as u64,
        || {
            parallel_scan_blocks(lo, hi, base, nb_blocks, &block_prefix, combine, lift, dst)
        },
        || {
            for b in 0..nb_blocks {
                let (l, h) = block_range(lo, hi, b);
                sequential_scan(l, h, base, block_prefix[b], combine, lift, dst);
            }
        },
    );
}

/// Recursive binary halving over a block index range; `body(b, &mut out[b])`
/// fills one block's partial-sum slot.
fn parallel_fill_blocks(
    lo: usize,
    hi: usize,
    out: &mut [u64],
    body: impl Fn(usize, &mut u64) + Sync + Copy,
) {
    let n = hi - lo;
    if n == 0 {
        return;
    }
    if n == 1 {
        body(lo, &mut out[0]);
        return;
    }
    let mid = lo + n / 2;
    let (left, right) = out.split_at_mut(mid - lo);
    fork2(
        || parallel_fill_blocks(lo, mid, left, body),
        || parallel_fill_blocks(mid, hi, right, body),
    );
}

/// Recursive binary halving over the block range for the per-block
/// sequential-scan pass, seeded from `block_prefix`.
fn parallel_scan_blocks(
    lo: usize,
    hi: usize,
    base: usize,
    nb_blocks: usize,
    block_prefix: &[u64],
    combine: impl Fn(u64, u64) -> u64 + Sync + Copy,
    lift: impl Fn(usize) -> u64 + Sync + Copy,
    dst: &mut [u64],
) {
    scan_block_range(0, nb_blocks, lo, hi, base, block_prefix, combine, lift, dst)
}

#[allow(clippy::too_many_arguments)]
fn scan_block_range(
    b_lo: usize,
    b_hi: usize,
    lo: usize,
    hi: usize,
    base: usize,
    block_prefix: &[u64],
    combine: impl Fn(u64, u64) -> u64 + Sync + Copy,
    lift: impl Fn(usize) -> u64 + Sync + Copy,
    dst: &mut [u64],
) {
    let nb = b_hi - b_lo;
    if nb == 0 {
        return;
    }
    if nb == 1 {
        let (l, h) = block_range(lo, hi, b_lo);
        sequential_scan(l, h, base, block_prefix[b_lo], combine, lift, dst);
        return;
    }
    let b_mid = b_lo + nb / 2;
    let (split_l, _) = block_range(lo, hi, b_mid);
    let (left, right) = dst.split_at_mut(split_l - base);
    fork2(
        || scan_block_range(b_lo, b_mid, lo, hi, base, block_prefix, combine, lift, left),
        || {
            scan_block_range(
                b_mid,
                b_hi,
                lo,
                hi,
                base,
                block_prefix,
                combine,
                lift,
                right,
            )
        },
    );
}
