//! Wrap-safe arithmetic on the 32-bit microsecond clock.
//!
//! The clock is a free-running `u32` that wraps every ~71.6 minutes.
//! Timestamps are never compared with `<`; durations are always taken
//! as `later.wrapping_sub(earlier)`, which yields the forward distance
//! on the circle as long as the real gap is below half the range.

/// Microsecond timestamp from [`Clock`](crate::app::ports::Clock).
pub type Micros = u32;

/// Largest forward distance [`elapsed_us`] reports unambiguously.
pub const HALF_RANGE_US: u32 = u32::MAX / 2;

/// Forward distance from `earlier` to `later`, correct across wraparound.
#[inline]
pub const fn elapsed_us(earlier: Micros, later: Micros) -> u32 {
    later.wrapping_sub(earlier)
}

/// True once at least `period_us` have passed since `since`.
#[inline]
pub const fn has_elapsed(since: Micros, now: Micros, period_us: u32) -> bool {
    elapsed_us(since, now) >= period_us
}

/// Milliseconds to microseconds, saturating at `u32::MAX`.
#[inline]
pub const fn ms_to_us(ms: u32) -> u32 {
    ms.saturating_mul(1_000)
}
