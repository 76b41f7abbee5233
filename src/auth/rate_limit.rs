use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

/// Cleanup cadence for the background worker
const WINDOW_SECS: u64 = 300;

/// Fixed-window counters keyed by caller-chosen strings (e.g. `token:<enrollment>`).
/// In-memory, so limits are per instance.
#[derive(Clone, Default)]
pub struct RateLimitState {
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
    window: Duration,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns Ok(remaining) or Err(retry_after) when limited.
    pub async fn check_with_limits(
        &self,
        key: &str,
        max_requests: u32,
        window_secs: u64,
    ) -> Result<u32, Duration> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(window_secs);

        let entry = entries.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
            window,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start) > window {
            entry.count = 0;
            entry.window_start = now;
        }
        entry.window = window;

        if entry.count >= max_requests {
            let retry_after = window.saturating_sub(now.duration_since(entry.window_start));
            return Err(retry_after);
        }

        entry.count += 1;
        Ok(max_requests - entry.count)
    }

    /// Drop entries whose window has long passed. Run from a background task.
    pub async fn cleanup(&self) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        entries.retain(|_, entry| now.duration_since(entry.window_start) < entry.window * 2);
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

/// Periodic cleanup so per-enrollment keys do not accumulate forever.
pub fn spawn_cleanup_worker(limiter: RateLimitState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(WINDOW_SECS));
        loop {
            interval.tick().await;
            limiter.cleanup().await;
            tracing::debug!("Rate limit entries cleaned up");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u32 = 5;

    #[tokio::test]
    async fn test_rate_limit_allows_under_limit() {
        let limiter = RateLimitState::new();

        for i in 0..MAX {
            let result = limiter.check_with_limits("token:a", MAX, WINDOW_SECS).await;
            assert!(result.is_ok(), "Request {} should be allowed", i + 1);
        }
    }

    #[tokio::test]
    async fn test_rate_limit_blocks_over_limit() {
        let limiter = RateLimitState::new();

        for _ in 0..MAX {
            let _ = limiter.check_with_limits("token:a", MAX, WINDOW_SECS).await;
        }

        let result = limiter.check_with_limits("token:a", MAX, WINDOW_SECS).await;
        assert!(result.is_err(), "Request over limit should be blocked");
    }

    #[tokio::test]
    async fn test_different_keys_have_separate_limits() {
        let limiter = RateLimitState::new();

        for _ in 0..MAX {
            let _ = limiter.check_with_limits("token:a", MAX, WINDOW_SECS).await;
        }

        let result = limiter.check_with_limits("token:b", MAX, WINDOW_SECS).await;
        assert!(result.is_ok(), "Different key should have separate limit");
    }

    #[tokio::test]
    async fn test_custom_limits_report_remaining() {
        let limiter = RateLimitState::new();
        assert_eq!(limiter.check_with_limits("k", 2, 60).await, Ok(1));
        assert_eq!(limiter.check_with_limits("k", 2, 60).await, Ok(0));
        assert!(limiter.check_with_limits("k", 2, 60).await.is_err());
    }

    #[tokio::test]
    async fn test_cleanup_keeps_live_windows() {
        let limiter = RateLimitState::new();
        let _ = limiter.check_with_limits("token:a", MAX, WINDOW_SECS).await;
        limiter.cleanup().await;
        assert_eq!(limiter.len().await, 1);
    }
}
