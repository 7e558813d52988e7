//! In-process metrics collection
//!
//! Self-tracked counters behind a single lock. Derived values (average
//! latency, error rate, uptime, estimated cost) are computed when a snapshot
//! is taken, never stored.

use crate::config::PricingConfig;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug)]
struct MetricsData {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,

    /// Deepgram-style STT usage, audio seconds
    total_stt_seconds: u64,
    total_llm_input_tokens: u64,
    total_llm_output_tokens: u64,

    total_stt_latency_ms: f64,
    stt_calls: u64,
    total_llm_latency_ms: f64,
    llm_calls: u64,

    total_latency_ms: f64,
    request_count_for_latency: u64,

    active_sessions: u64,
    total_sessions: u64,

    start_time: Instant,
}

impl MetricsData {
    fn new() -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            total_stt_seconds: 0,
            total_llm_input_tokens: 0,
            total_llm_output_tokens: 0,
            total_stt_latency_ms: 0.0,
            stt_calls: 0,
            total_llm_latency_ms: 0.0,
            llm_calls: 0,
            total_latency_ms: 0.0,
            request_count_for_latency: 0,
            active_sessions: 0,
            total_sessions: 0,
            start_time: Instant::now(),
        }
    }
}

/// Estimated spend derived from recorded usage, in USD
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CostBreakdown {
    pub stt_usd: f64,
    pub llm_input_usd: f64,
    pub llm_output_usd: f64,
    pub total_usd: f64,
}

/// Point-in-time copy of all counters plus derived values
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_stt_seconds: u64,
    pub total_llm_input_tokens: u64,
    pub total_llm_output_tokens: u64,
    pub average_latency_ms: f64,
    pub average_stt_latency_ms: f64,
    pub average_llm_latency_ms: f64,
    pub error_rate: f64,
    pub uptime_seconds: u64,
    pub active_sessions: u64,
    pub total_sessions: u64,
    pub estimated_costs: CostBreakdown,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Thread-safe metrics collector
///
/// All mutation goes through one lock per collector instance; `snapshot()`
/// reads under the same lock so no field is torn relative to another.
#[derive(Debug)]
pub struct MetricsCollector {
    pricing: PricingConfig,
    metrics: RwLock<MetricsData>,
}

impl MetricsCollector {
    pub fn new(pricing: PricingConfig) -> Self {
        Self {
            pricing,
            metrics: RwLock::new(MetricsData::new()),
        }
    }

    /// Record a completed request with its outcome and latency
    pub fn record_request(&self, success: bool, latency_ms: f64) {
        let mut metrics = self.metrics.write();
        metrics.total_requests += 1;
        if success {
            metrics.successful_requests += 1;
        } else {
            metrics.failed_requests += 1;
        }
        metrics.total_latency_ms += latency_ms;
        metrics.request_count_for_latency += 1;
    }

    /// Record one STT call: audio duration in seconds plus call latency
    pub fn record_stt_usage(&self, audio_duration_seconds: f64, latency_ms: f64) {
        let mut metrics = self.metrics.write();
        metrics.total_stt_seconds += audio_duration_seconds as u64;
        metrics.total_stt_latency_ms += latency_ms;
        metrics.stt_calls += 1;
    }

    /// Record one LLM call: token usage plus call latency
    pub fn record_llm_usage(&self, input_tokens: u64, output_tokens: u64, latency_ms: f64) {
        let mut metrics = self.metrics.write();
        metrics.total_llm_input_tokens += input_tokens;
        metrics.total_llm_output_tokens += output_tokens;
        metrics.total_llm_latency_ms += latency_ms;
        metrics.llm_calls += 1;
    }

    pub fn increment_active_sessions(&self) {
        let mut metrics = self.metrics.write();
        metrics.active_sessions += 1;
        metrics.total_sessions += 1;
    }

    /// Floors at zero, a stray decrement must not underflow
    pub fn decrement_active_sessions(&self) {
        let mut metrics = self.metrics.write();
        metrics.active_sessions = metrics.active_sessions.saturating_sub(1);
    }

    /// Consistent point-in-time snapshot with derived values
    pub fn snapshot(&self) -> MetricsSnapshot {
        let metrics = self.metrics.read();

        let average_latency_ms = if metrics.request_count_for_latency == 0 {
            0.0
        } else {
            metrics.total_latency_ms / metrics.request_count_for_latency as f64
        };

        let average_stt_latency_ms = if metrics.stt_calls == 0 {
            0.0
        } else {
            metrics.total_stt_latency_ms / metrics.stt_calls as f64
        };

        let average_llm_latency_ms = if metrics.llm_calls == 0 {
            0.0
        } else {
            metrics.total_llm_latency_ms / metrics.llm_calls as f64
        };

        let error_rate = if metrics.total_requests == 0 {
            0.0
        } else {
            (metrics.failed_requests as f64 / metrics.total_requests as f64) * 100.0
        };

        MetricsSnapshot {
            total_requests: metrics.total_requests,
            successful_requests: metrics.successful_requests,
            failed_requests: metrics.failed_requests,
            total_stt_seconds: metrics.total_stt_seconds,
            total_llm_input_tokens: metrics.total_llm_input_tokens,
            total_llm_output_tokens: metrics.total_llm_output_tokens,
            average_latency_ms,
            average_stt_latency_ms,
            average_llm_latency_ms,
            error_rate,
            uptime_seconds: metrics.start_time.elapsed().as_secs(),
            active_sessions: metrics.active_sessions,
            total_sessions: metrics.total_sessions,
            estimated_costs: self.estimate_cost(&metrics),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Replace every counter with a fresh zero state. Test harnesses only.
    pub fn reset(&self) {
        *self.metrics.write() = MetricsData::new();
    }

    fn estimate_cost(&self, metrics: &MetricsData) -> CostBreakdown {
        let stt_minutes = metrics.total_stt_seconds as f64 / 60.0;
        let stt_usd = round4(stt_minutes * self.pricing.stt_cost_per_minute);

        let llm_input_usd = round4(
            (metrics.total_llm_input_tokens as f64 / 1000.0)
                * self.pricing.llm_input_cost_per_1k_tokens,
        );
        let llm_output_usd = round4(
            (metrics.total_llm_output_tokens as f64 / 1000.0)
                * self.pricing.llm_output_cost_per_1k_tokens,
        );

        CostBreakdown {
            stt_usd,
            llm_input_usd,
            llm_output_usd,
            total_usd: round4(stt_usd + llm_input_usd + llm_output_usd),
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// RAII guard for the active-session gauge.
///
/// Increments on creation and decrements on drop, so a cancelled request
/// still releases its slot.
pub struct SessionGuard {
    metrics: Arc<MetricsCollector>,
}

impl SessionGuard {
    pub fn begin(metrics: Arc<MetricsCollector>) -> Self {
        metrics.increment_active_sessions();
        Self { metrics }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.metrics.decrement_active_sessions();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> MetricsCollector {
        MetricsCollector::new(PricingConfig::default())
    }

    #[test]
    fn test_error_rate() {
        let metrics = collector();
        for i in 0..10 {
            metrics.record_request(i >= 3, 50.0);
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 10);
        assert_eq!(snapshot.failed_requests, 3);
        assert_eq!(snapshot.successful_requests, 7);
        assert_eq!(snapshot.error_rate, 30.0);
    }

    #[test]
    fn test_average_latency() {
        let metrics = collector();
        metrics.record_request(true, 100.0);
        metrics.record_request(true, 200.0);
        metrics.record_request(true, 300.0);

        assert_eq!(metrics.snapshot().average_latency_ms, 200.0);
    }

    #[test]
    fn test_empty_collector_divides_nothing() {
        let snapshot = collector().snapshot();
        assert_eq!(snapshot.average_latency_ms, 0.0);
        assert_eq!(snapshot.error_rate, 0.0);
        assert_eq!(snapshot.estimated_costs.total_usd, 0.0);
    }

    #[test]
    fn test_active_sessions_floor_at_zero() {
        let metrics = collector();
        metrics.decrement_active_sessions();
        metrics.decrement_active_sessions();
        assert_eq!(metrics.snapshot().active_sessions, 0);

        metrics.increment_active_sessions();
        metrics.increment_active_sessions();
        metrics.decrement_active_sessions();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.active_sessions, 1);
        assert_eq!(snapshot.total_sessions, 2);
    }

    #[test]
    fn test_cost_estimate_uses_configured_pricing() {
        let metrics = MetricsCollector::new(PricingConfig {
            stt_cost_per_minute: 0.0125,
            llm_input_cost_per_1k_tokens: 0.003,
            llm_output_cost_per_1k_tokens: 0.015,
        });

        metrics.record_stt_usage(120.0, 80.0); // 2 minutes
        metrics.record_llm_usage(2_000, 1_000, 40.0);

        let costs = metrics.snapshot().estimated_costs;
        assert_eq!(costs.stt_usd, 0.025);
        assert_eq!(costs.llm_input_usd, 0.006);
        assert_eq!(costs.llm_output_usd, 0.015);
        assert_eq!(costs.total_usd, 0.046);
    }

    #[test]
    fn test_upstream_latency_averages() {
        let metrics = collector();
        metrics.record_stt_usage(10.0, 100.0);
        metrics.record_stt_usage(10.0, 300.0);
        metrics.record_llm_usage(500, 200, 40.0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.average_stt_latency_ms, 200.0);
        assert_eq!(snapshot.average_llm_latency_ms, 40.0);

        // Unrecorded services report zero rather than dividing by zero
        assert_eq!(collector().snapshot().average_stt_latency_ms, 0.0);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let metrics = collector();
        metrics.record_request(false, 10.0);
        metrics.record_stt_usage(30.0, 12.0);
        metrics.increment_active_sessions();

        metrics.reset();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.total_stt_seconds, 0);
        assert_eq!(snapshot.active_sessions, 0);
        assert_eq!(snapshot.total_sessions, 0);
    }

    #[test]
    fn test_session_guard_releases_on_drop() {
        let metrics = Arc::new(collector());
        {
            let _guard = SessionGuard::begin(Arc::clone(&metrics));
            assert_eq!(metrics.snapshot().active_sessions, 1);
        }
        assert_eq!(metrics.snapshot().active_sessions, 0);
    }

    #[test]
    fn test_concurrent_recording_is_consistent() {
        let metrics = Arc::new(collector());
        let mut handles = Vec::new();

        for _ in 0..4 {
            let metrics = Arc::clone(&metrics);
            handles.push(std::thread::spawn(move || {
                for _ in 0..250 {
                    metrics.record_request(true, 10.0);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 1000);
        assert_eq!(snapshot.successful_requests, 1000);
        assert_eq!(snapshot.average_latency_ms, 10.0);
    }
}
