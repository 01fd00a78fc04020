use std::time::Duration;

use async_trait::async_trait;

/// Source of monotonic time and suspension for every wait in the pipeline
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created
    fn elapsed(&self) -> Duration;

    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by `tokio::time`
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Poll `condition` every `interval` until it holds or `deadline` has elapsed.
///
/// The condition is checked once before any sleep, so an already-true
/// condition returns immediately. Returns whether the condition was observed.
pub async fn wait_for<F>(clock: &dyn Clock, interval: Duration, deadline: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool + Send,
{
    let started = clock.elapsed();
    loop {
        if condition() {
            return true;
        }
        if clock.elapsed().saturating_sub(started) >= deadline {
            return false;
        }
        clock.sleep(interval).await;
    }
}
