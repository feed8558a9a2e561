//! Prometheus metrics setup and metric definitions

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle> {
    // Permission checks are store lookups, mostly sub-millisecond to tens of ms.
    let buckets = vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .context("failed to set histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit initial zero values so Prometheus output
/// includes HELP/TYPE lines for all metrics from startup.
pub fn describe_metrics() {
    describe_counter!(
        "tenantry_permission_checks_total",
        "Permission checks by outcome (granted/denied/error)"
    );
    describe_histogram!(
        "tenantry_permission_check_duration_seconds",
        "Permission check duration in seconds"
    );
    describe_counter!(
        "tenantry_membership_writes_total",
        "Membership writes by operation"
    );
    describe_counter!(
        "tenantry_membership_cascade_total",
        "Membership cascade outcomes (granted/existing/error)"
    );

    counter!("tenantry_permission_checks_total", "outcome" => "granted").absolute(0);
    counter!("tenantry_permission_checks_total", "outcome" => "denied").absolute(0);
    histogram!("tenantry_permission_check_duration_seconds").record(0.0);
    counter!("tenantry_membership_writes_total", "operation" => "add_or_update").absolute(0);
    counter!("tenantry_membership_cascade_total", "outcome" => "granted").absolute(0);
    counter!("tenantry_membership_cascade_total", "outcome" => "existing").absolute(0);
}

pub fn record_permission_check(outcome: &'static str, elapsed: Duration) {
    counter!("tenantry_permission_checks_total", "outcome" => outcome).increment(1);
    histogram!("tenantry_permission_check_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_membership_write(operation: &'static str) {
    counter!("tenantry_membership_writes_total", "operation" => operation).increment(1);
}

pub fn record_cascade(outcome: &'static str) {
    counter!("tenantry_membership_cascade_total", "outcome" => outcome).increment(1);
}
