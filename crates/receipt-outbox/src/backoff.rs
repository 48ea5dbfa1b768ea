//! Redelivery backoff policy.

/// Longest wait between redelivery attempts (10 minutes).
pub const MAX_BACKOFF_MS: i64 = 600_000;

/// Exponent saturates here so the shift cannot overflow.
const MAX_SHIFT: u32 = 10;

/// Delay before the next attempt, given how many attempts have been made:
/// `min(600_000, 2^min(attempts, 10) × 1000)` milliseconds.
pub fn retry_backoff_ms(attempts: u32) -> i64 {
    let shift = attempts.min(MAX_SHIFT);
    ((1i64 << shift) * 1000).min(MAX_BACKOFF_MS)
}

/// Epoch-millisecond timestamp of the next attempt, counted from now.
pub fn next_attempt_at(attempts: u32) -> i64 {
    chrono::Utc::now().timestamp_millis() + retry_backoff_ms(attempts)
}
