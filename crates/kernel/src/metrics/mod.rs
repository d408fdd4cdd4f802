//! Sliding-window request rate tracking.

use std::collections::VecDeque;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Span of history kept by the tracker.
const WINDOW: Duration = Duration::from_secs(10);

static TRACKER: LazyLock<MetricsTracker> = LazyLock::new(MetricsTracker::new);

/// Process-wide tracker.
pub fn tracker() -> &'static MetricsTracker {
    &TRACKER
}

/// Counts requests over the last ten seconds.
///
/// Timestamps older than the window are pruned on every call.
#[derive(Debug, Default)]
pub struct MetricsTracker {
    requests: Mutex<VecDeque<Instant>>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.record_request_at(Instant::now());
    }

    /// Requests seen in the last second.
    pub fn requests_per_second(&self) -> usize {
        self.requests_per_second_at(Instant::now())
    }

    /// Requests seen in the window.
    pub fn total_requests(&self) -> usize {
        self.total_requests_at(Instant::now())
    }

    /// Mean requests per second across the window.
    pub fn average_rps(&self) -> f64 {
        self.average_rps_at(Instant::now())
    }

    fn record_request_at(&self, now: Instant) {
        let mut requests = self.requests.lock();
        requests.push_back(now);
        prune(&mut requests, now);
    }

    fn requests_per_second_at(&self, now: Instant) -> usize {
        let mut requests = self.requests.lock();
        prune(&mut requests, now);
        requests
            .iter()
            .rev()
            .take_while(|t| now.saturating_duration_since(**t) < Duration::from_secs(1))
            .count()
    }

    fn total_requests_at(&self, now: Instant) -> usize {
        let mut requests = self.requests.lock();
        prune(&mut requests, now);
        requests.len()
    }

    fn average_rps_at(&self, now: Instant) -> f64 {
        self.total_requests_at(now) as f64 / WINDOW.as_secs_f64()
    }
}

fn prune(requests: &mut VecDeque<Instant>, now: Instant) {
    while let Some(oldest) = requests.front() {
        if now.saturating_duration_since(*oldest) >= WINDOW {
            requests.pop_front();
        } else {
            break;
        }
    }
}
