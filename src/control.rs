// Control plane: swap admission
//
// Bounds the number of in-flight protected swaps and smooths entry with a
// one-second sliding-window rate limit. Admission only delays a swap; it
// never changes the outcome of one.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::trace;

#[derive(Clone)]
pub struct AdmissionControl {
    max_inflight: Arc<Semaphore>,
    inner: Arc<Mutex<RateLimiter>>,
}

struct RateLimiter {
    rate_per_sec: u32,
    timestamps: VecDeque<Instant>,
    window: Duration,
}

impl AdmissionControl {
    pub fn new(max_inflight: usize, rate_per_sec: Option<u32>) -> Self {
        let limiter = RateLimiter {
            rate_per_sec: rate_per_sec.unwrap_or(200),
            timestamps: VecDeque::with_capacity(256),
            window: Duration::from_secs(1),
        };
        Self {
            max_inflight: Arc::new(Semaphore::new(max_inflight)),
            inner: Arc::new(Mutex::new(limiter)),
        }
    }

    /// Wait for an admission permit. The permit is held for the life of the
    /// swap; dropping it releases the in-flight slot.
    pub async fn acquire(&self) -> AdmissionPermit {
        loop {
            let mut guard = self.inner.lock().await;
            let now = Instant::now();
            while let Some(front) = guard.timestamps.front() {
                if now.duration_since(*front) > guard.window {
                    guard.timestamps.pop_front();
                } else {
                    break;
                }
            }
            if (guard.timestamps.len() as u32) < guard.rate_per_sec {
                guard.timestamps.push_back(now);
                break;
            }
            drop(guard);
            trace!("admission rate limited; backing off");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let permit = self
            .max_inflight
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore not closed");
        AdmissionPermit { _permit: permit }
    }
}

pub struct AdmissionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
