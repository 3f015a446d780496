//! Global cool-down counter.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Number of cool-down periods currently running.
///
/// While any period is running the trigger engine stays quiet. Cloning is
/// cheap and shares the same counter.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    in_flight: Arc<AtomicUsize>,
}

impl Bucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_engaged(&self) -> bool {
        self.count() > 0
    }

    /// Start a cool-down period.
    ///
    /// The counter goes up immediately and comes back down after `period`
    /// in a separate task. The task is not cancelled on shutdown.
    pub fn engage(&self, period: Duration) -> JoinHandle<()> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let in_flight = Arc::clone(&self.in_flight);

        tokio::spawn(async move {
            tokio::time::sleep(period).await;
            let left = in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            debug!(left, "cool-down period over");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn engage_counts_up_then_expires() {
        let bucket = Bucket::new();
        assert!(!bucket.is_engaged());

        let first = bucket.engage(Duration::from_secs(300));
        bucket.engage(Duration::from_secs(600));
        assert_eq!(bucket.count(), 2);

        first.await.unwrap();
        assert_eq!(bucket.count(), 1);

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(bucket.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_the_counter() {
        let bucket = Bucket::new();
        let observer = bucket.clone();

        bucket.engage(Duration::from_secs(1));

        assert!(observer.is_engaged());
    }
}
