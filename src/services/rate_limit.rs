use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Fixed-window submission quota keyed by client identity.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    clients: Mutex<HashMap<String, Window>>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaExceeded {
    pub retry_after: Duration,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request for `client` and reject it once the window's quota is used up.
    pub async fn check(&self, client: &str) -> Result<(), QuotaExceeded> {
        self.check_at(client, Instant::now()).await
    }

    pub async fn check_at(&self, client: &str, now: Instant) -> Result<(), QuotaExceeded> {
        let mut clients = self.clients.lock().await;

        // Expired windows from other clients are dropped on the way.
        clients.retain(|_, w| now.saturating_duration_since(w.started) < self.window);

        let window = clients.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if window.count >= self.max_requests {
            let elapsed = now.saturating_duration_since(window.started);
            return Err(QuotaExceeded {
                retry_after: self.window.saturating_sub(elapsed),
            });
        }

        window.count += 1;
        Ok(())
    }
}
