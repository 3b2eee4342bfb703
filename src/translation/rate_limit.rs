/*!
 * Minimum spacing between outbound requests.
 */

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Shared gate that lets at most one request through per `min_interval`.
///
/// Callers queue on the lock, so the spacing holds across every task that
/// shares the gate.
#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until a request may be issued and record it
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }
}
