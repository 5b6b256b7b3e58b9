use std::time::{Duration, Instant};

/// Format a `Duration` as a human-readable string with automatic unit scaling.
///
/// Produces output like `1.94ms` or `2.34s` using Rust's Debug format.
pub fn fmt_duration(d: Duration) -> String {
    format!("{d:.2?}")
}

/// Log a warning if an external call took longer than `threshold`.
pub fn log_if_slow(start: Instant, threshold: Duration, source: &str) {
    let elapsed = start.elapsed();
    if elapsed > threshold {
        tracing::warn!(
            source,
            duration = fmt_duration(elapsed),
            "slow upstream response"
        );
    }
}
