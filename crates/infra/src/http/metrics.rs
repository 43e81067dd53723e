//! Client request metrics
//!
//! ## Design
//! - **SeqCst ordering** for the counters behind the hit rate (derived metric)
//! - **Ring buffer** of the last attempts' response times for the rolling
//!   average; `VecDeque` so eviction is O(1)

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use stockbridge_domain::constants::RESPONSE_TIME_WINDOW;
use stockbridge_domain::{MetricsSnapshot, TransportKind};

#[derive(Debug, Default)]
pub struct ClientMetrics {
    total: AtomicU64,
    cache_hits: AtomicU64,
    success: AtomicU64,
    errors: AtomicU64,
    direct_success: AtomicU64,
    direct_errors: AtomicU64,
    proxy_success: AtomicU64,
    proxy_errors: AtomicU64,
    response_times: Mutex<VecDeque<Duration>>,
}

impl ClientMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::SeqCst);
    }

    /// Count a request outcome against the transport that settled it.
    ///
    /// MDM gateway requests are counted on the proxy side.
    pub fn record_outcome(&self, transport: TransportKind, ok: bool) {
        let (overall, per_transport) = match (transport, ok) {
            (TransportKind::Direct, true) => (&self.success, &self.direct_success),
            (TransportKind::Direct, false) => (&self.errors, &self.direct_errors),
            (TransportKind::Proxy | TransportKind::Mdm, true) => {
                (&self.success, &self.proxy_success)
            }
            (TransportKind::Proxy | TransportKind::Mdm, false) => {
                (&self.errors, &self.proxy_errors)
            }
        };
        overall.fetch_add(1, Ordering::SeqCst);
        per_transport.fetch_add(1, Ordering::SeqCst);
    }

    /// Count a failed direct attempt that was then handed to the proxy.
    pub fn record_direct_failover(&self) {
        self.direct_errors.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_response_time(&self, elapsed: Duration) {
        let mut window = self.response_times.lock();
        if window.len() == RESPONSE_TIME_WINDOW {
            window.pop_front();
        }
        window.push_back(elapsed);
    }

    pub fn avg_response_ms(&self) -> f64 {
        let window = self.response_times.lock();
        if window.is_empty() {
            return 0.0;
        }
        let sum: f64 = window.iter().map(|d| d.as_secs_f64() * 1000.0).sum();
        sum / window.len() as f64
    }

    pub fn snapshot(&self, cache_size: usize) -> MetricsSnapshot {
        let total = self.total.load(Ordering::SeqCst);
        let cache_hits = self.cache_hits.load(Ordering::SeqCst);
        let cache_hit_rate = if total == 0 { 0.0 } else { cache_hits as f64 / total as f64 };

        MetricsSnapshot {
            total,
            cache_hits,
            success: self.success.load(Ordering::SeqCst),
            errors: self.errors.load(Ordering::SeqCst),
            direct_success: self.direct_success.load(Ordering::SeqCst),
            direct_errors: self.direct_errors.load(Ordering::SeqCst),
            proxy_success: self.proxy_success.load(Ordering::SeqCst),
            proxy_errors: self.proxy_errors.load(Ordering::SeqCst),
            cache_size,
            cache_hit_rate,
            avg_response_ms: self.avg_response_ms(),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.total,
            &self.cache_hits,
            &self.success,
            &self.errors,
            &self.direct_success,
            &self.direct_errors,
            &self.proxy_success,
            &self.proxy_errors,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
        self.response_times.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_is_hits_over_total() {
        let metrics = ClientMetrics::new();
        assert_eq!(metrics.snapshot(0).cache_hit_rate, 0.0);

        for _ in 0..4 {
            metrics.record_request();
        }
        metrics.record_cache_hit();

        let snapshot = metrics.snapshot(3);
        assert_eq!(snapshot.total, 4);
        assert!((snapshot.cache_hit_rate - 0.25).abs() < f64::EPSILON);
        assert_eq!(snapshot.cache_size, 3);
    }

    #[test]
    fn outcomes_split_by_transport() {
        let metrics = ClientMetrics::new();
        metrics.record_outcome(TransportKind::Direct, true);
        metrics.record_outcome(TransportKind::Proxy, false);
        metrics.record_outcome(TransportKind::Mdm, true);

        let snapshot = metrics.snapshot(0);
        assert_eq!((snapshot.success, snapshot.errors), (2, 1));
        assert_eq!(snapshot.direct_success, 1);
        assert_eq!((snapshot.proxy_success, snapshot.proxy_errors), (1, 1));
    }

    #[test]
    fn rolling_average_keeps_the_last_window() {
        let metrics = ClientMetrics::new();
        metrics.record_response_time(Duration::from_millis(1000));
        for _ in 0..RESPONSE_TIME_WINDOW {
            metrics.record_response_time(Duration::from_millis(10));
        }
        assert!((metrics.avg_response_ms() - 10.0).abs() < 1e-6);

        metrics.reset();
        assert_eq!(metrics.snapshot(0), MetricsSnapshot::default());
    }
}
