//! Global request spacing.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

/// Serializes outbound request timing across all callers.
///
/// Holds the instant of the last permitted call. A caller takes the lock,
/// sleeps out whatever remains of `delay`, stamps the current time and
/// releases, so queued callers are spaced by at least `delay` each. Tokio's
/// mutex is FIFO, so no caller starves.
#[derive(Debug, Default)]
pub struct RateGate {
    last_permitted: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until at least `delay` has passed since the previous permitted call.
    pub async fn throttle(&self, delay: Duration) {
        let mut last = self.last_permitted.lock().await;

        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < delay {
                let wait = delay - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Rate gate waiting");
                tokio::time::sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }
}
