use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Prometheus collectors for the HTTP surface and the OTP/alert flows.
pub struct MetricsRegistry {
    registry: Registry,

    // HTTP
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,

    // OTP
    pub otp_issued_total: CounterVec,
    pub otp_verified_total: CounterVec,

    // Alerts
    pub alerts_triggered_total: CounterVec,
    pub sms_attempts_total: CounterVec,
}

fn counter(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> prometheus::Result<CounterVec> {
    let counter = CounterVec::new(Opts::new(name, help).namespace("safetrip"), labels)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl MetricsRegistry {
    pub fn new() -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        let http_requests_total = counter(
            &registry,
            "http_requests_total",
            "Total HTTP requests",
            &["method", "endpoint", "status"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request duration")
                .namespace("safetrip")
                .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["method", "endpoint"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        let otp_issued_total = counter(
            &registry,
            "otp_issued_total",
            "OTP issuance attempts by outcome",
            &["outcome"],
        )?;

        let otp_verified_total = counter(
            &registry,
            "otp_verified_total",
            "OTP verification attempts by outcome",
            &["outcome"],
        )?;

        let alerts_triggered_total = counter(
            &registry,
            "alerts_triggered_total",
            "Emergency alert triggers by outcome",
            &["outcome"],
        )?;

        let sms_attempts_total = counter(
            &registry,
            "sms_attempts_total",
            "Per-number SMS attempts by outcome",
            &["outcome"],
        )?;

        Ok(Arc::new(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            otp_issued_total,
            otp_verified_total,
            alerts_triggered_total,
            sms_attempts_total,
        }))
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
