// sptl: ergonomic call-site macros
//
// `spguard!`/`fork2!` save callers from naming their own call-site tag by
// deriving one from `file!()`/`line!()`, matching the original source's
// macro-based call sites (every `spguard`/`fork2` invocation there is a
// macro, not a bare function call).

/// `spguard!(complexity, parallel_body, sequential_body)`: like
/// `$crate::guard::spguard`, but the call-site tag is derived from the
/// macro's own expansion site rather than passed explicitly.
#[macro_export]
macro_rules! spguard {
    ($complexity:expr, $parallel:expr, $sequential:expr) => {
        $crate::guard::spguard(
            concat!(file!(), ":", line!()),
            $complexity,
            $parallel,
            $sequential,
        )
    };
}

/// `fork2!(left, right)`: like `$crate::fork::fork2`, provided as a macro
/// purely for symmetry with `spguard!` at call sites that use both.
#[macro_export]
macro_rules! fork2 {
    ($left:expr, $right:expr) => {
        $crate::fork::fork2($left, $right)
    };
}

/// Debug-only assertion for granularity-controller invariants, compiled out
/// in release builds. Used on the hot paths in `guard`/`fork` where a full
/// `assert!` would cost more than the bug it guards against is worth paying
/// for in production.
#[macro_export]
macro_rules! hot_debug_assert {
    ($cond:expr) => {
        #[cfg(debug_assertions)]
        if !($cond) {
            $crate::error::fail_invariant(concat!("assertion failed: ", stringify!($cond)));
        }
    };
}
