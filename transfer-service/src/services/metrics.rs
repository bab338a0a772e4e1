use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static TRANSFERS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static DB_QUERY_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

/// Transfer lifecycle outcomes recorded under `transfers_total{outcome}`.
#[derive(Debug, Clone, Copy)]
pub enum TransferOutcome {
    Initiated,
    Completed,
    AlreadyCompleted,
    Rejected,
}

impl TransferOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Completed => "completed",
            Self::AlreadyCompleted => "already_completed",
            Self::Rejected => "rejected",
        }
    }
}

struct Collectors {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    transfers_total: IntCounterVec,
    db_query_duration: HistogramVec,
}

fn build_metrics() -> Result<Collectors, prometheus::Error> {
    let registry = Registry::new();

    let requests_total = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    )?;
    let request_duration = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        ),
        &["method", "path", "status"],
    )?;
    let transfers_total = IntCounterVec::new(
        Opts::new("transfers_total", "Item transfers by lifecycle outcome"),
        &["outcome"],
    )?;
    let db_query_duration = HistogramVec::new(
        HistogramOpts::new(
            "db_query_duration_seconds",
            "Database query duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["operation"],
    )?;

    registry.register(Box::new(requests_total.clone()))?;
    registry.register(Box::new(request_duration.clone()))?;
    registry.register(Box::new(transfers_total.clone()))?;
    registry.register(Box::new(db_query_duration.clone()))?;

    Ok(Collectors {
        registry,
        requests_total,
        request_duration,
        transfers_total,
        db_query_duration,
    })
}

/// Create and register all collectors. Safe to call more than once; only
/// the first call wins.
pub fn init_metrics() {
    if REGISTRY.get().is_some() {
        return;
    }

    match build_metrics() {
        Ok(c) => {
            let _ = REGISTRY.set(c.registry);
            let _ = HTTP_REQUESTS_TOTAL.set(c.requests_total);
            let _ = HTTP_REQUEST_DURATION_SECONDS.set(c.request_duration);
            let _ = TRANSFERS_TOTAL.set(c.transfers_total);
            let _ = DB_QUERY_DURATION_SECONDS.set(c.db_query_duration);
        }
        Err(e) => {
            tracing::error!("Failed to initialize metrics: {}", e);
        }
    }
}

/// Count one transfer outcome. A no-op until [`init_metrics`] has run.
pub fn record_transfer(outcome: TransferOutcome) {
    if let Some(counter) = TRANSFERS_TOTAL.get() {
        counter.with_label_values(&[outcome.as_str()]).inc();
    }
}

/// Start a query timer that records on drop.
pub fn db_timer(operation: &str) -> Option<prometheus::HistogramTimer> {
    DB_QUERY_DURATION_SECONDS
        .get()
        .map(|h| h.with_label_values(&[operation]).start_timer())
}

pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return format!("# Failed to encode metrics: {}\n", e);
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to UTF-8: {}", e);
        format!("# Failed to convert metrics to UTF-8: {}\n", e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_outcomes_are_exported() {
        init_metrics();
        init_metrics();
        record_transfer(TransferOutcome::Initiated);
        record_transfer(TransferOutcome::AlreadyCompleted);

        let text = get_metrics();
        assert!(text.contains("transfers_total"));
        assert!(text.contains("outcome=\"already_completed\""));
    }
}
