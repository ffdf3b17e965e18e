//! Cancellable debounce timer.
//!
//! Holds at most one pending value. Pushing a new value replaces the old one
//! and restarts the quiet period, so a superseded value can never fire.

use std::time::Duration;

use tokio::time::Instant;

/// Single-slot debounce timer for use inside `tokio::select!`.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replace any pending value and restart the timer.
    pub fn push(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.delay));
    }

    /// Drop the pending value without firing it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Resolve with the pending value once its quiet period has elapsed.
    ///
    /// Never resolves while nothing is pending. Cancel-safe: dropping the
    /// future keeps the pending value and its deadline.
    pub async fn fired(&mut self) -> T {
        let Some(deadline) = self.pending.as_ref().map(|(_, deadline)| *deadline) else {
            return std::future::pending().await;
        };

        tokio::time::sleep_until(deadline).await;
        match self.pending.take() {
            Some((value, _)) => value,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let start = Instant::now();
        debouncer.push("p");

        assert_eq!(debouncer.fired().await, "p");
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_value_supersedes_pending() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let start = Instant::now();

        debouncer.push("p");
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.push("py");
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.push("pyt");

        assert_eq!(debouncer.fired().await, "pyt");
        assert!(start.elapsed() >= Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_never_fires() {
        let mut debouncer: Debouncer<&str> = Debouncer::new(Duration::from_millis(10));
        let result = tokio::time::timeout(Duration::from_secs(5), debouncer.fired()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.push(1);
        assert_eq!(debouncer.cancel(), Some(1));

        let result = tokio::time::timeout(Duration::from_secs(1), debouncer.fired()).await;
        assert!(result.is_err());
    }
}
