// sptl: cycle-counter time utilities and the backoff CAS primitive

use std::sync::atomic::{AtomicU64, Ordering};

use crate::platform::unsafe_ops;

/// CPU frequency in GHz, measured once during `launch` and read thereafter.
static CPU_FREQUENCY_GHZ_BITS: AtomicU64 = AtomicU64::new(0);

/// Read the monotonic cycle counter (RDTSC on x86_64, a nanosecond clock elsewhere).
#[inline(always)]
pub fn cycles_now() -> u64 {
    unsafe_ops::read_tsc()
}

/// Read the cycle counter with CPUID serialization; use at the boundary of a
/// measured window where instruction reordering would skew the reading.
#[inline(always)]
pub fn cycles_now_serialized() -> u64 {
    unsafe_ops::read_tsc_serialized()
}

/// Calibration result produced once at `launch` and stored in `CPU_FREQUENCY_GHZ_BITS`.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationResult {
    pub cpu_frequency_ghz: f64,
    pub rdtsc_overhead_ticks: u64,
    pub confidence: f64,
}

/// Measure `cpu_frequency_ghz` by racing the cycle counter against a wall clock.
///
/// Takes the median of 100 short rounds; a low `confidence` (high relative
/// std-dev across rounds) is surfaced to the caller, who may treat it as a
/// configuration failure under a noisy host.
pub fn calibrate() -> CalibrationResult {
    const ROUNDS: usize = 100;
    const ROUND_MS: u64 = 2;

    let overhead = measure_rdtsc_overhead();

    let mut freqs_ghz = Vec::with_capacity(ROUNDS);
    for _ in 0..ROUNDS {
        let wall_start = std::time::Instant::now();
        let tsc_start = cycles_now_serialized();
        while wall_start.elapsed().as_millis() < ROUND_MS as u128 {
            std::hint::spin_loop();
        }
        let tsc_end = cycles_now_serialized();
        let elapsed_ns = wall_start.elapsed().as_nanos() as f64;
        let ticks = (tsc_end - tsc_start) as f64;
        freqs_ghz.push(ticks / elapsed_ns);
    }
    freqs_ghz.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median = freqs_ghz[freqs_ghz.len() / 2];

    let mean = freqs_ghz.iter().sum::<f64>() / freqs_ghz.len() as f64;
    let variance =
        freqs_ghz.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / freqs_ghz.len() as f64;
    let std_dev = variance.sqrt();
    let confidence = if std_dev > 0.0 {
        1.0 / (1.0 + std_dev / mean)
    } else {
        1.0
    };

    CPU_FREQUENCY_GHZ_BITS.store(median.to_bits(), Ordering::Relaxed);

    CalibrationResult {
        cpu_frequency_ghz: median,
        rdtsc_overhead_ticks: overhead,
        confidence,
    }
}

fn measure_rdtsc_overhead() -> u64 {
    const ROUNDS: usize = 10_000;
    let mut samples = Vec::with_capacity(ROUNDS);
    for _ in 0..100 {
        let _ = cycles_now();
    }
    for _ in 0..ROUNDS {
        let start = cycles_now_serialized();
        std::hint::black_box(cycles_now());
        let end = cycles_now_serialized();
        samples.push(end.saturating_sub(start));
    }
    samples.sort_unstable();
    samples[ROUNDS / 10]
}

/// Directly install a known CPU frequency, bypassing `calibrate`. Used by
/// tests and by hosts that already know their frequency (e.g. from `/proc/cpuinfo`).
pub fn set_cpu_frequency_ghz(ghz: f64) {
    CPU_FREQUENCY_GHZ_BITS.store(ghz.to_bits(), Ordering::Relaxed);
}

/// Current `cpu_frequency_ghz`, or the conservative default of 1.2 GHz if
/// `calibrate`/`set_cpu_frequency_ghz` has not yet run.
pub fn cpu_frequency_ghz() -> f64 {
    let bits = CPU_FREQUENCY_GHZ_BITS.load(Ordering::Relaxed);
    if bits == 0 {
        1.2
    } else {
        f64::from_bits(bits)
    }
}

/// Convert a cycle count to microseconds using the measured `cpu_frequency_ghz`.
#[inline(always)]
pub fn microseconds_of(cycles: u64) -> f64 {
    cycles as f64 / (cpu_frequency_ghz() * 1_000.0)
}

/// Busy-wait for at least `cycles` cycles, yielding the core via PAUSE hints.
#[inline]
pub fn spin_pause(cycles: u64) {
    let start = cycles_now();
    while cycles_now().saturating_sub(start) < cycles {
        unsafe_ops::spin_pause_once();
    }
}

/// Attempt one strong compare-exchange; on failure, spin for a backoff
/// interval and return `false` so the caller can reread and retry at its own
/// discretion. Contention on estimator cells is rare enough that a single
/// failed CAS per call is expected to be the common case.
#[inline]
pub fn cas_with_backoff(cell: &AtomicU64, expected: u64, desired: u64) -> bool {
    match cell.compare_exchange(expected, desired, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => true,
        Err(_) => {
            spin_pause(BACKOFF_MIN_CYCLES);
            false
        }
    }
}

const BACKOFF_MIN_CYCLES: u64 = 1 << 12;
#[allow(dead_code)]
const BACKOFF_MAX_CYCLES: u64 = 1 << 17;
