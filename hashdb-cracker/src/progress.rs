use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Shared run counters, written by the session task and polled by the
/// progress display.
#[derive(Debug, Default)]
pub struct RunCounters {
    processed: AtomicU64,
    found: AtomicU64,
    remaining: AtomicU64,
}

impl RunCounters {
    pub fn record(&self, processed: u64, found: u64, remaining: u64) {
        self.processed.store(processed, Ordering::Relaxed);
        self.found.store(found, Ordering::Relaxed);
        self.remaining.store(remaining, Ordering::Relaxed);
    }

    /// `(processed, found, remaining)` as last recorded.
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.processed.load(Ordering::Relaxed),
            self.found.load(Ordering::Relaxed),
            self.remaining.load(Ordering::Relaxed),
        )
    }
}

/// Throughput snapshot derived from elapsed time and counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Candidates hashed per second; zero until any time has elapsed.
    pub rate: f64,
    /// Predicted time to exhaust the remaining corpus. `None` while the
    /// rate is still zero.
    pub eta: Option<Duration>,
}

/// Derives rate and ETA from the work done so far. Pure function; safe to
/// call at any cadence.
pub fn estimate(elapsed: Duration, processed: u64, total: u64) -> Estimate {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 { processed as f64 / secs } else { 0.0 };
    let eta = if rate > 0.0 {
        Some(Duration::from_secs_f64(total.saturating_sub(processed) as f64 / rate))
    } else {
        None
    };
    Estimate { rate, eta }
}

/// Renders a duration as human-scaled text, dropping larger units that are
/// zero. Below one minute the seconds keep two decimals.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs_f64();
    let hours = (total / 3600.0) as u64;
    let minutes = ((total % 3600.0) / 60.0) as u64;
    let seconds = (total % 60.0) as u64;

    if hours >= 1 {
        format!("{hours} hours, {minutes} minutes, {seconds} seconds")
    } else if minutes >= 1 {
        format!("{minutes} minutes, {seconds} seconds")
    } else {
        format!("{total:.2} seconds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_and_eta_from_progress() {
        let est = estimate(Duration::from_secs(10), 1_000, 3_000);
        assert_eq!(est.rate, 100.0);
        assert_eq!(est.eta, Some(Duration::from_secs(20)));
    }

    #[test]
    fn zero_elapsed_means_no_estimate() {
        let est = estimate(Duration::ZERO, 0, 1_000);
        assert_eq!(est.rate, 0.0);
        assert_eq!(est.eta, None);
    }

    #[test]
    fn zero_rate_means_no_eta() {
        let est = estimate(Duration::from_secs(5), 0, 1_000);
        assert_eq!(est.rate, 0.0);
        assert_eq!(est.eta, None);
    }

    #[test]
    fn durations_drop_zero_leading_units() {
        assert_eq!(format_duration(Duration::from_secs_f64(42.5)), "42.50 seconds");
        assert_eq!(format_duration(Duration::from_secs(90)), "1 minutes, 30 seconds");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "1 hours, 2 minutes, 5 seconds");
    }

    #[test]
    fn counters_round_trip() {
        let counters = RunCounters::default();
        assert_eq!(counters.snapshot(), (0, 0, 0));
        counters.record(50, 2, 3);
        assert_eq!(counters.snapshot(), (50, 2, 3));
    }
}
