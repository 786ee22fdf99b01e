// sptl: reduction skeleton
//
// Grounded in the original source's `level4::reduce`: split the input in two,
// fork2 over the halves, merge the two partial results. A `&[T]` is already
// size/split/slice-capable, so levels 1-3's iterator-pair and lift/combine
// adapters collapse here into one generic function parameterized over a
// per-element `lift` and an associative `combine`; `reduce` itself is the
// level-1 entry point most call sites want.

use crate::fork::fork2;
use crate::guard::spguard;

/// Sequential leaf size below which `reduce` never forks, independent of the
/// granularity controller's own decision; keeps recursion depth sane for
/// tiny inputs without paying for an `spguard` call per element.
const LEAF: usize = 1;

/// Reduce `slice` with `identity` and the associative `combine`, applying
/// `lift` to each element before combining (level 2's lift/combine split).
/// `comp` estimates the cost of reducing a subslice, defaulting to its
/// length when the caller has no sharper model.
pub fn reduce_with<T, R>(
    slice: &[T],
    identity: R,
    comp: impl Fn(&[T]) -> u64 + Sync + Copy,
    lift: impl Fn(&T) -> R + Sync + Copy,
    combine: impl Fn(R, R) -> R + Sync + Copy,
) -> R
where
    T: Sync,
    R: Send + Clone,
{
    if slice.is_empty() {
        return identity;
    }
    spguard(
        "sptl::reduce",
        || comp(slice),
        || reduce_rec(slice, &identity, comp, lift, combine),
        || sequential_reduce(slice, identity.clone(), lift, combine),
    )
}

fn reduce_rec<T, R>(
    slice: &[T],
    identity: &R,
    comp: impl Fn(&[T]) -> u64 + Sync + Copy,
    lift: impl Fn(&T) -> R + Sync + Copy,
    combine: impl Fn(R, R) -> R + Sync + Copy,
) -> R
where
    T: Sync,
    R: Send + Clone,
{
    if slice.len() <= LEAF {
        return sequential_reduce(slice, identity.clone(), lift, combine);
    }
    let mid = slice.len() / 2;
    let (left, right) = slice.split_at(mid);
    let (l, r) = fork2(
        || reduce_with(left, identity.clone(), comp, lift, combine),
        || reduce_with(right, identity.clone(), comp, lift, combine),
    );
    combine(l, r)
}

fn sequential_reduce<T, R>(
    slice: &[T],
    identity: R,
    lift: impl Fn(&T) -> R,
    combine: impl Fn(R, R) -> R,
) -> R {
    let mut acc = identity;
    for item in slice {
        acc = combine(acc, lift(item));
    }
    acc
}

/// `reduce_with` specialized to `T: Clone` values combined directly, with the
/// default range-cost function (level 1: plain lift-and-combine, no
/// separate complexity model).
pub fn reduce<T>(slice: &[T], identity: T, combine: impl Fn(T, T) -> T + Sync + Copy) -> T
where
    T: Sync + Send + Clone,
{
    reduce_with(slice, identity, |s| s.len() as u64, |x: &T| x.clone(), combine)
}

/// Tie-breaking policy for `max_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiePolicy {
    /// Among equal elements, keep the lowest index.
    Lowest,
    /// Among equal elements, keep the highest index.
    Highest,
}

/// Reduce over `(index, &T)` pairs to find the index of the maximal element
/// under `less`, breaking ties per `tie_policy`. Returns `None` for an empty
/// slice.
pub fn max_index<T>(
    slice: &[T],
    tie_policy: TiePolicy,
    less: impl Fn(&T, &T) -> bool + Sync + Copy,
) -> Option<usize>
where
    T: Sync,
{
    if slice.is_empty() {
        return None;
    }
    let combine = move |a: (usize, usize), b: (usize, usize)| {
        let (ia, ja) = a;
        let (ib, jb) = b;
        let va = &slice[ja];
        let vb = &slice[jb];
        if less(va, vb) {
            b
        } else if less(vb, va) {
            a
        } else {
            match tie_policy {
                TiePolicy::Lowest => {
                    if ia <= ib {
                        a
                    } else {
                        b
                    }
                }
                TiePolicy::Highest => {
                    if ia >= ib {
                        a
                    } else {
                        b
                    }
                }
            }
        }
    };
    let indexed: Vec<(usize, usize)> = (0..slice.len()).map(|i| (i, i)).collect();
    let (winner, _) = reduce_with(
        &indexed,
        (0usize, 0usize),
        |s| s.len() as u64,
        |pair: &(usize, usize)| *pair,
        combine,
    );
    Some(winner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_sum_matches_expected() {
        let values = [10, 20, 30, 40, 50];
        assert_eq!(reduce(&values, 0, |a, b| a + b), 150);
    }

    #[test]
    fn reduce_over_empty_slice_returns_identity() {
        let values: [i32; 0] = [];
        assert_eq!(reduce(&values, 0, |a, b| a + b), 0);
    }

    #[test]
    fn reduce_over_large_slice_matches_sequential_reference() {
        let values: Vec<u64> = (0..10_000).collect();
        let expect: u64 = values.iter().sum();
        assert_eq!(reduce(&values, 0, |a, b| a + b), expect);
    }

    #[test]
    fn max_index_returns_a_maximal_elements_index() {
        let values = [3, 7, 1, 7, 4];
        let idx = max_index(&values, TiePolicy::Lowest, |a, b| a < b).unwrap();
        assert_eq!(values[idx], 7);
    }

    #[test]
    fn max_index_lowest_tie_policy_prefers_earliest() {
        let values = [1, 5, 5, 2];
        let idx = max_index(&values, TiePolicy::Lowest, |a, b| a < b).unwrap();
        assert_eq!(idx, 1);
    }

    #[test]
    fn max_index_highest_tie_policy_prefers_latest() {
        let values = [1, 5, 5, 2];
        let idx = max_index(&values, TiePolicy::Highest, |a, b| a < b).unwrap();
        assert_eq!(idx, 2);
    }

    #[test]
    fn max_index_of_empty_slice_is_none() {
        let values: [i32; 0] = [];
        assert!(max_index(&values, TiePolicy::Lowest, |a, b| a < b).is_none());
    }

    proptest::proptest! {
        #[test]
        fn reduce_matches_sequential_sum_for_arbitrary_inputs(values in proptest::collection::vec(0u64..1_000, 0..500)) {
            let expect: u64 = values.iter().sum();
            proptest::prop_assert_eq!(reduce(&values, 0u64, |a, b| a + b), expect);
        }

        #[test]
        fn reduce_matches_sequential_max_for_arbitrary_inputs(values in proptest::collection::vec(0i64..1_000, 1..500)) {
            let expect = *values.iter().max().unwrap();
            proptest::prop_assert_eq!(reduce(&values, i64::MIN, |a, b| a.max(b)), expect);
        }
    }
}
