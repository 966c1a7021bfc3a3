use anyhow::{anyhow, Context as AnyhowContext, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header::CONTENT_TYPE, Response as HttpResponse, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use exchange_gate::{GateEvent, GateEventSink, LogEventSink};
use exchange_protocol::CalculatorKind;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct SiteMetrics {
    registry: Arc<Registry>,
    gate_attempts: IntCounterVec,
    gate_denials: IntCounter,
    calculator_requests: IntCounterVec,
}

impl SiteMetrics {
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let gate_attempts = IntCounterVec::new(
            Opts::new(
                "exchange_gate_attempts_total",
                "Login attempts at the password gate",
            ),
            &["outcome"],
        )?;
        let gate_denials = IntCounter::with_opts(Opts::new(
            "exchange_gate_denials_total",
            "Protected requests redirected to the gate",
        ))?;
        let calculator_requests = IntCounterVec::new(
            Opts::new(
                "exchange_calculator_requests_total",
                "Calculator evaluations served over HTTP",
            ),
            &["calculator"],
        )?;

        registry.register(Box::new(gate_attempts.clone()))?;
        registry.register(Box::new(gate_denials.clone()))?;
        registry.register(Box::new(calculator_requests.clone()))?;

        Ok(Self {
            registry,
            gate_attempts,
            gate_denials,
            calculator_requests,
        })
    }

    pub fn record_gate_attempt(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.gate_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn record_denial(&self) {
        self.gate_denials.inc();
    }

    pub fn record_calculation(&self, kind: &CalculatorKind) {
        let label = match kind {
            CalculatorKind::BrandSavings => "brand_savings",
            CalculatorKind::CostComparison => "cost_comparison",
            CalculatorKind::ProviderEarnings => "provider_earnings",
        };
        self.calculator_requests.with_label_values(&[label]).inc();
    }

    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).context("metrics exposition is not UTF-8")
    }
}

/// Gate audit sink: the structured log line plus the attempt counter.
pub struct MetricsEventSink {
    metrics: SiteMetrics,
    log: LogEventSink,
}

impl MetricsEventSink {
    pub fn new(metrics: SiteMetrics) -> Self {
        Self {
            metrics,
            log: LogEventSink,
        }
    }
}

impl GateEventSink for MetricsEventSink {
    fn record(&self, event: &GateEvent) {
        self.log.record(event);
        self.metrics.record_gate_attempt(event.success);
    }
}

/// Prometheus text endpoint on its own listener, away from the gated site.
pub struct MetricsExporter {
    local_addr: SocketAddr,
    _server_handle: Arc<JoinHandle<()>>,
}

impl MetricsExporter {
    pub async fn start(bind: &str, metrics: SiteMetrics) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(bind)
            .await
            .map_err(|err| anyhow!("failed to bind metrics endpoint on {bind}: {err}"))?;
        let local_addr = listener.local_addr()?;
        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(metrics);

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                log::error!("Prometheus endpoint failed: {err}");
            }
        });

        Ok(Self {
            local_addr,
            _server_handle: Arc::new(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

async fn metrics_handler(State(metrics): State<SiteMetrics>) -> Result<Response, StatusCode> {
    let body = metrics.render().map_err(|err| {
        log::error!("failed to encode metrics: {err:#}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(HttpResponse::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, TextEncoder::new().format_type())
        .body(Body::from(body))
        .expect("valid HTTP response"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_counts_attempts_by_outcome() {
        let metrics = SiteMetrics::new().unwrap();
        let sink = MetricsEventSink::new(metrics.clone());
        sink.record(&GateEvent::now(Some("de"), true));
        sink.record(&GateEvent::now(None, false));
        sink.record(&GateEvent::now(None, false));
        metrics.record_denial();
        metrics.record_calculation(&CalculatorKind::BrandSavings);

        let text = metrics.render().unwrap();
        assert!(text.contains("exchange_gate_attempts_total{outcome=\"success\"} 1"));
        assert!(text.contains("exchange_gate_attempts_total{outcome=\"failure\"} 2"));
        assert!(text.contains("exchange_gate_denials_total 1"));
        assert!(text.contains("exchange_calculator_requests_total{calculator=\"brand_savings\"} 1"));
    }

    #[tokio::test]
    async fn exporter_serves_text_format() {
        let metrics = SiteMetrics::new().unwrap();
        metrics.record_denial();
        let exporter = MetricsExporter::start("127.0.0.1:0", metrics).await.unwrap();

        let body = reqwest::get(format!("http://{}/metrics", exporter.local_addr()))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("exchange_gate_denials_total 1"));
    }
}
