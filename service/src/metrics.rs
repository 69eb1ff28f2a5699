//! Prometheus metrics for the merit service.
//!
//! Exposes counters and gauges covering the review flow, queue claims, and
//! the payout pipeline.  The [`ServiceMetrics`] struct owns a dedicated
//! [`Registry`] that a host `/metrics` endpoint can encode into the
//! Prometheus text exposition format via [`ServiceMetrics::render_text`].

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

use crate::error::ServiceError;

/// Central collection of all service-level Prometheus metrics.
pub struct ServiceMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Total number of work items submitted into the review queue.
    pub submissions: IntCounter,
    /// Total number of items accepted by reviewers.
    pub accepts: IntCounter,
    /// Total number of items rejected by reviewers.
    pub rejects: IntCounter,
    /// Total number of successful queue claims (fresh, resumed, or taken over).
    pub claims: IntCounter,
    /// Total number of explicit claim releases.
    pub releases: IntCounter,
    /// Total number of payout requests accepted into the PENDING state.
    pub payout_requests: IntCounter,
    /// Total number of payout requests confirmed as PAID.
    pub payouts_confirmed: IntCounter,
    /// Total number of payout requests cancelled with balance restored.
    pub payouts_cancelled: IntCounter,
    /// Total number of rate lookups that failed or returned an unusable quote.
    pub rate_failures: IntCounter,
    /// Total number of transfer attempts that were rejected or timed out.
    pub transfer_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Current number of items in the review queue.
    pub queue_depth: IntGauge,
    /// Current number of payout requests in the PENDING state.
    pub pending_payouts: IntGauge,
}

impl ServiceMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        // Counters
        let submissions = register_int_counter_with_registry!(
            Opts::new(
                "merit_submissions_total",
                "Total work items submitted into the review queue"
            ),
            registry
        )
        .expect("failed to register submissions counter");

        let accepts = register_int_counter_with_registry!(
            Opts::new("merit_accepts_total", "Total items accepted by reviewers"),
            registry
        )
        .expect("failed to register accepts counter");

        let rejects = register_int_counter_with_registry!(
            Opts::new("merit_rejects_total", "Total items rejected by reviewers"),
            registry
        )
        .expect("failed to register rejects counter");

        let claims = register_int_counter_with_registry!(
            Opts::new("merit_claims_total", "Total successful queue claims"),
            registry
        )
        .expect("failed to register claims counter");

        let releases = register_int_counter_with_registry!(
            Opts::new("merit_releases_total", "Total explicit claim releases"),
            registry
        )
        .expect("failed to register releases counter");

        let payout_requests = register_int_counter_with_registry!(
            Opts::new(
                "merit_payout_requests_total",
                "Total payout requests accepted as pending"
            ),
            registry
        )
        .expect("failed to register payout_requests counter");

        let payouts_confirmed = register_int_counter_with_registry!(
            Opts::new(
                "merit_payouts_confirmed_total",
                "Total payout requests confirmed as paid"
            ),
            registry
        )
        .expect("failed to register payouts_confirmed counter");

        let payouts_cancelled = register_int_counter_with_registry!(
            Opts::new(
                "merit_payouts_cancelled_total",
                "Total payout requests cancelled with balance restored"
            ),
            registry
        )
        .expect("failed to register payouts_cancelled counter");

        let rate_failures = register_int_counter_with_registry!(
            Opts::new(
                "merit_rate_failures_total",
                "Total failed or unusable exchange-rate lookups"
            ),
            registry
        )
        .expect("failed to register rate_failures counter");

        let transfer_failures = register_int_counter_with_registry!(
            Opts::new(
                "merit_transfer_failures_total",
                "Total rejected or timed-out transfer attempts"
            ),
            registry
        )
        .expect("failed to register transfer_failures counter");

        // Gauges
        let queue_depth = register_int_gauge_with_registry!(
            Opts::new(
                "merit_queue_depth",
                "Current number of items in the review queue"
            ),
            registry
        )
        .expect("failed to register queue_depth gauge");

        let pending_payouts = register_int_gauge_with_registry!(
            Opts::new(
                "merit_pending_payouts",
                "Current number of pending payout requests"
            ),
            registry
        )
        .expect("failed to register pending_payouts gauge");

        Self {
            registry,
            submissions,
            accepts,
            rejects,
            claims,
            releases,
            payout_requests,
            payouts_confirmed,
            payouts_cancelled,
            rate_failures,
            transfer_failures,
            queue_depth,
            pending_payouts,
        }
    }

    /// Encode every registered metric in the Prometheus text exposition
    /// format.
    pub fn render_text(&self) -> Result<String, ServiceError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| ServiceError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| ServiceError::Metrics(e.to_string()))
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_metrics_appear_in_text_exposition() {
        let metrics = ServiceMetrics::new();
        metrics.submissions.inc();
        metrics.queue_depth.set(3);

        let text = metrics.render_text().expect("encode metrics");
        assert!(text.contains("merit_submissions_total 1"));
        assert!(text.contains("merit_queue_depth 3"));
    }
}
