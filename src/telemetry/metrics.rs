//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Opportunities emitted
    Opportunities,
    /// Evaluations skipped, labelled by reason
    Skips,
    /// Lines dropped as malformed
    MalformedLines,
    /// Scheduler ticks, labelled by outcome
    SchedulerTicks,
    /// Completed scans
    Scans,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Remaining provider request budget
    QuotaRemaining,
    /// Opportunities in the most recent scan
    LastScanOpportunities,
}

impl CounterMetric {
    pub fn name(&self) -> &'static str {
        match self {
            CounterMetric::Opportunities => "floorscan_opportunities_total",
            CounterMetric::Skips => "floorscan_skips_total",
            CounterMetric::MalformedLines => "floorscan_malformed_lines_total",
            CounterMetric::SchedulerTicks => "floorscan_scheduler_ticks_total",
            CounterMetric::Scans => "floorscan_scans_total",
        }
    }
}

impl GaugeMetric {
    pub fn name(&self) -> &'static str {
        match self {
            GaugeMetric::QuotaRemaining => "floorscan_quota_remaining",
            GaugeMetric::LastScanOpportunities => "floorscan_last_scan_opportunities",
        }
    }
}

/// Increment a counter
pub fn increment(metric: CounterMetric, value: u64) {
    metrics::counter!(metric.name()).increment(value);
}

/// Increment a counter carrying one label
pub fn increment_labeled(metric: CounterMetric, label: &'static str, value: &'static str) {
    metrics::counter!(metric.name(), label => value).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
    tracing::trace!(metric = metric.name(), value = value, "Setting gauge");
}

/// Serve metrics for scraping on `port`
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;

    tracing::info!(addr = %addr, "Metrics exporter listening");
    Ok(())
}
