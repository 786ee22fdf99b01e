// sptl: platform-specific unsafe operations
// This module contains ONLY unavoidable unsafe code that has no safe alternative.
// All unsafe code here is documented and justified.

#[allow(unsafe_code)]
pub mod unsafe_ops {
    /// Read Time Stamp Counter (x86-64 only)
    /// SAFETY: RDTSC is a read-only instruction with no side effects.
    #[cfg(target_arch = "x86_64")]
    #[inline(always)]
    pub fn read_tsc() -> u64 {
        unsafe { std::arch::x86_64::_rdtsc() }
    }

    /// Read TSC with serialization via CPUID.
    /// SAFETY: CPUID and RDTSC are read-only instructions.
    #[cfg(target_arch = "x86_64")]
    #[inline(always)]
    pub fn read_tsc_serialized() -> u64 {
        unsafe {
            std::arch::x86_64::__cpuid(0);
            std::arch::x86_64::_rdtsc()
        }
    }

    /// Read TSC bracketed by memory fences.
    /// SAFETY: memory fences and RDTSC carry no side effects beyond ordering.
    #[cfg(target_arch = "x86_64")]
    #[inline(always)]
    pub fn read_tsc_fenced() -> u64 {
        unsafe {
            std::arch::x86_64::_mm_mfence();
            let tsc = std::arch::x86_64::_rdtsc();
            std::arch::x86_64::_mm_mfence();
            tsc
        }
    }

    /// Issue a PAUSE hint, used by the backoff spin loop.
    /// SAFETY: PAUSE has no side effects beyond a scheduling hint to the core.
    #[cfg(target_arch = "x86_64")]
    #[inline(always)]
    pub fn spin_pause_once() {
        unsafe { std::arch::x86_64::_mm_pause() }
    }

    /// Process-start instant backing the non-x86_64 `read_tsc` fallback,
    /// so it returns a monotonically increasing, cumulative count rather
    /// than a fresh (near-zero) `Instant::now().elapsed()` every call.
    #[cfg(not(target_arch = "x86_64"))]
    static PROCESS_START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();

    #[cfg(not(target_arch = "x86_64"))]
    #[inline(always)]
    pub fn read_tsc() -> u64 {
        let start = PROCESS_START.get_or_init(std::time::Instant::now);
        start.elapsed().as_nanos() as u64
    }

    #[cfg(not(target_arch = "x86_64"))]
    #[inline(always)]
    pub fn read_tsc_serialized() -> u64 {
        read_tsc()
    }

    #[cfg(not(target_arch = "x86_64"))]
    #[inline(always)]
    pub fn read_tsc_fenced() -> u64 {
        read_tsc()
    }

    #[cfg(not(target_arch = "x86_64"))]
    #[inline(always)]
    pub fn spin_pause_once() {
        std::hint::spin_loop()
    }
}
