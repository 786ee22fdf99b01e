// sptl: scan skeleton
//
// Grounded in the original source's `scan_rec`/`scan_seq`: a two-pass block
// scan with branching factor `K`. Pass one reduces each block to a partial;
// pass two recursively exclusive-scans the partials and then reruns a
// sequential scan per block, seeded from its partial, directly into the
// output (which may alias the input, hence the single-pass-over-`x` style
// below rather than reading back from `dst`).

use crate::fork::fork2;
use crate::guard::spguard;

const K: usize = 2048;

/// Orientation and inclusivity of a scan request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    ForwardInclusive,
    ForwardExclusive,
    BackwardInclusive,
    BackwardExclusive,
}

impl ScanType {
    fn is_backward(self) -> bool {
        matches!(self, ScanType::BackwardInclusive | ScanType::BackwardExclusive)
    }

    fn is_exclusive(self) -> bool {
        matches!(self, ScanType::ForwardExclusive | ScanType::BackwardExclusive)
    }
}

/// Scan `src` into `dst` (equal lengths) under `combine`/`identity`, per
/// `st`. Each `dst[i]` is computed from `src` and `identity` alone via a
/// local accumulator rather than read back from `dst`, matching the
/// original source's overlap-safe `scan_seq` leaf.
pub fn scan<T>(
    src: &[T],
    dst: &mut [T],
    identity: T,
    combine: impl Fn(&T, &T) -> T + Sync + Copy,
    st: ScanType,
) where
    T: Sync + Send + Clone,
{
    assert_eq!(src.len(), dst.len());
    let n = src.len();
    if n == 0 {
        return;
    }
    if n <= K {
        scan_seq(src, dst, &identity, combine, st);
        return;
    }
    spguard(
        "sptl::scan",
        || n as u64,
        || scan_rec(src, dst, &identity, combine, st),
        || scan_seq(src, dst, &identity, combine, st),
    );
}

fn block_range(n: usize, i: usize) -> (usize, usize) {
    let lo = i * K;
    let hi = (lo + K).min(n);
    (lo, hi)
}

fn nb_blocks(n: usize) -> usize {
    1 + (n.saturating_sub(1)) / K
}

fn scan_rec<T>(
    src: &[T],
    dst: &mut [T],
    identity: &T,
    combine: impl Fn(&T, &T) -> T + Sync + Copy,
    st: ScanType,
) where
    T: Sync + Send + Clone,
{
    let n = src.len();
    let m = nb_blocks(n);

    let mut partials: Vec<T> = vec![identity.clone(); m];
    parallel_fill_partials(0, m, n, src, identity, combine, &mut partials);

    let mut scans: Vec<T> = vec![identity.clone(); m];
    let partial_st = if st.is_backward() {
        ScanType::BackwardExclusive
    } else {
        ScanType::ForwardExclusive
    };
    scan(&partials, &mut scans, identity.clone(), combine, partial_st);

    parallel_fill_blocks(0, m, n, src, dst, &scans, identity, combine, st);
}

fn parallel_fill_partials<T>(
    b_lo: usize,
    b_hi: usize,
    n: usize,
    src: &[T],
    identity: &T,
    combine: impl Fn(&T, &T) -> T + Sync + Copy,
    partials: &mut [T],
) where
    T: Sync + Send + Clone,
{
    let nb = b_hi - b_lo;
    if nb == 0 {
        return;
    }
    if nb == 1 {
        let (lo, hi) = block_range(n, b_lo);
        partials[0] = block_reduce(&src[lo..hi], identity, combine);
        return;
    }
    let b_mid = b_lo + nb / 2;
    let split = b_mid - b_lo;
    let (left, right) = partials.split_at_mut(split);
    fork2(
        || parallel_fill_partials(b_lo, b_mid, n, src, identity, combine, left),
        || parallel_fill_partials(b_mid, b_hi, n, src, identity, combine, right),
    );
}

fn block_reduce<T>(block: &[T], identity: &T, combine: impl Fn(&T, &T) -> T) -> T
where
    T: Clone,
{
    let mut acc = identity.clone();
    for item in block {
        acc = combine(&acc, item);
    }
    acc
}

#[allow(clippy::too_many_arguments)]
fn parallel_fill_blocks<T>(
    b_lo: usize,
    b_hi: usize,
    n: usize,
    src: &[T],
    dst: &mut [T],
    scans: &[T],
    identity: &T,
    combine: impl Fn(&T, &T) -> T + Sync + Copy,
    st: ScanType,
) where
    T: Sync + Send + Clone,
{
    let nb = b_hi - b_lo;
    if nb == 0 {
        return;
    }
    if nb == 1 {
        let (lo, hi) = block_range(n, b_lo);
        scan_seq(&src[lo..hi], &mut dst[lo..hi], &scans[b_lo], combine, st);
        return;
    }
    let b_mid = b_lo + nb / 2;
    let (split_lo, _) = block_range(n, b_mid);
    let (left, right) = dst.split_at_mut(split_lo);
    fork2(
        || parallel_fill_blocks(b_lo, b_mid, n, src, left, scans, identity, combine, st),
        || parallel_fill_blocks(b_mid, b_hi, n, src, right, scans, identity, combine, st),
    );
}

/// Sequential reference scan, used both as the leaf case and as the
/// sequential fallback when the controller decides a subrange is small.
/// `identity` here is really "the seed the block starts from", matching the
/// original source's use of a partial as the scan's starting accumulator.
fn scan_seq<T>(
    src: &[T],
    dst: &mut [T],
    seed: &T,
    combine: impl Fn(&T, &T) -> T,
    st: ScanType,
) where
    T: Clone,
{
    let n = src.len();
    if n == 0 {
        return;
    }
    let mut x = seed.clone();
    let indices: Box<dyn Iterator<Item = usize>> = if st.is_backward() {
        Box::new((0..n).rev())
    } else {
        Box::new(0..n)
    };
    for i in indices {
        if st.is_exclusive() {
            let before = x.clone();
            x = combine(&x, &src[i]);
            dst[i] = before;
        } else {
            x = combine(&x, &src[i]);
            dst[i] = x.clone();
        }
    }
}
