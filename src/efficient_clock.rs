#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::_rdtsc;

/// Timestamp source for log messages.
///
/// Every `log` call reads the clock once, so the read has to be a handful of
/// cycles. Hardware counters are used where the architecture exposes one;
/// elsewhere the value is nanoseconds since the first clock read in the
/// process, taken from the OS monotonic clock.
///
/// Raw values are only meaningful relative to each other. They are written
/// to the output files untouched.

/// Returns a monotonic timestamp with the highest precision available.
///
/// This function uses architecture-specific instructions when available:
/// - x86_64: RDTSC instruction (CPU time stamp counter)
/// - aarch64: CNTVCT_EL0 register (ARM virtual counter)
/// - Other platforms: `Instant`-based nanoseconds since the first call
///
/// # Performance
///
/// - On x86_64: ~25 CPU cycles
/// - On aarch64: ~10-20 CPU cycles
/// - Other platforms: one `clock_gettime` (or equivalent) call
#[inline(always)]
pub fn get_timestamp() -> u64 {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        _rdtsc()
    }

    #[cfg(target_arch = "aarch64")]
    unsafe {
        let mut value: u64;
        std::arch::asm!("mrs {}, cntvct_el0", out(reg) value);
        value
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        fallback::nanos_since_anchor()
    }
}

/// Ticks elapsed since `start`, saturating at zero if the counter appears
/// to go backwards (possible across cores on some older x86 parts).
#[inline(always)]
pub fn ticks_since(start: u64) -> u64 {
    get_timestamp().saturating_sub(start)
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
mod fallback {
    use std::sync::OnceLock;
    use std::time::Instant;

    static ANCHOR: OnceLock<Instant> = OnceLock::new();

    #[inline]
    pub(super) fn nanos_since_anchor() -> u64 {
        let anchor = ANCHOR.get_or_init(Instant::now);
        anchor.elapsed().as_nanos() as u64
    }
}
