//! Funnel metrics
//!
//! # Metrics
//!
//! - `checkout_plan_selections_total` - Plans selected, by plan
//! - `checkout_submissions_total` - Submit attempts, by outcome
//! - `checkout_field_errors_total` - Inline errors raised, by field
//! - `checkout_settlements_total` - Settlements finished, by method and result
//! - `checkout_settlement_duration_seconds` - Gateway latency

use crate::types::{FieldKind, PaymentMethod};
use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Plan selections
    pub plan_selections: IntCounterVec,

    /// Submit attempts
    pub submissions: IntCounterVec,

    /// Inline field errors
    pub field_errors: IntCounterVec,

    /// Finished settlements
    pub settlements: IntCounterVec,

    /// Settlement latency
    pub settlement_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let plan_selections = IntCounterVec::new(
            Opts::new("checkout_plan_selections_total", "Plans selected"),
            &["plan"],
        )?;
        registry.register(Box::new(plan_selections.clone()))?;

        let submissions = IntCounterVec::new(
            Opts::new("checkout_submissions_total", "Submit attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(submissions.clone()))?;

        let field_errors = IntCounterVec::new(
            Opts::new("checkout_field_errors_total", "Inline field errors raised"),
            &["field"],
        )?;
        registry.register(Box::new(field_errors.clone()))?;

        let settlements = IntCounterVec::new(
            Opts::new("checkout_settlements_total", "Settlements finished"),
            &["method", "result"],
        )?;
        registry.register(Box::new(settlements.clone()))?;

        let settlement_duration = Histogram::with_opts(
            HistogramOpts::new(
                "checkout_settlement_duration_seconds",
                "Settlement gateway latency",
            )
            .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        registry.register(Box::new(settlement_duration.clone()))?;

        Ok(Self {
            plan_selections,
            submissions,
            field_errors,
            settlements,
            settlement_duration,
            registry,
        })
    }

    /// Record a plan selection
    pub fn record_plan_selected(&self, plan_id: &str) {
        self.plan_selections.with_label_values(&[plan_id]).inc();
    }

    /// Record a submit attempt (`proceed`, `rejected`, `duplicate`)
    pub fn record_submission(&self, outcome: &str) {
        self.submissions.with_label_values(&[outcome]).inc();
    }

    /// Record an inline field error
    pub fn record_field_error(&self, field: FieldKind) {
        self.field_errors.with_label_values(&[field.name()]).inc();
    }

    /// Record a finished settlement
    pub fn record_settlement(&self, method: PaymentMethod, success: bool, duration_seconds: f64) {
        let method = method.to_string();
        let result = if success { "success" } else { "failure" };
        self.settlements
            .with_label_values(&[method.as_str(), result])
            .inc();
        self.settlement_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
