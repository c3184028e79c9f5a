//! Proactive request pacing.
//!
//! The remote API answers bursts with 429s; sleeping a fixed interval between
//! page fetches keeps a job under the limit most of the time, so the reactive
//! backoff in the client is the exception rather than the rule.

use std::time::Duration;

/// Delays applied by the pager and the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause between consecutive message pages.
    pub page_delay: Duration,
    /// Pause after finishing one forum thread.
    pub thread_delay: Duration,
}

impl Pacing {
    pub fn new(page_delay: Duration) -> Self {
        Self {
            page_delay,
            thread_delay: page_delay,
        }
    }

    /// No pauses at all, for tests and mocked transports.
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn with_thread_delay(mut self, delay: Duration) -> Self {
        self.thread_delay = delay;
        self
    }

    pub async fn between_pages(&self) {
        pause(self.page_delay).await;
    }

    pub async fn between_threads(&self) {
        pause(self.thread_delay).await;
    }
}

impl Default for Pacing {
    /// 300ms between pages and between threads.
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

async fn pause(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    tracing::debug!(delay_ms = %delay.as_millis(), "Pacing request");
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn default_pacing() {
        let p = Pacing::default();
        assert_eq!(p.page_delay, Duration::from_millis(300));
        assert_eq!(p.thread_delay, Duration::from_millis(300));
    }

    #[test]
    fn thread_delay_override() {
        let p = Pacing::new(Duration::from_millis(10)).with_thread_delay(Duration::ZERO);
        assert_eq!(p.page_delay, Duration::from_millis(10));
        assert!(p.thread_delay.is_zero());
    }

    #[tokio::test]
    async fn between_pages_sleeps() {
        let p = Pacing::new(Duration::from_millis(50));
        let start = Instant::now();
        p.between_pages().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn none_does_not_sleep() {
        let start = Instant::now();
        Pacing::none().between_pages().await;
        Pacing::none().between_threads().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
