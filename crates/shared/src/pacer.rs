use std::time::Duration;

/// Pause applied after every summarization call to stay under the
/// provider's request-rate ceiling.
#[allow(async_fn_in_trait)]
pub trait Pacer {
    async fn pause(&self);
}

/// Sleeps for a fixed duration on every call
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl FixedDelay {
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::from_secs(1)
    }
}

impl Pacer for FixedDelay {
    async fn pause(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

/// Never waits. Used by tests and dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    async fn pause(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_fixed_delay_waits_at_least_duration() {
        let pacer = FixedDelay(Duration::from_millis(20));
        let start = Instant::now();
        pacer.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_no_delay_returns_immediately() {
        let start = Instant::now();
        NoDelay.pause().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_default_delay_is_one_second() {
        assert_eq!(FixedDelay::default().0, Duration::from_secs(1));
    }
}
