use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::env;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

use crate::events::{EventSink, RequestEvent};

lazy_static::lazy_static! {
    pub static ref METRIC_NAMESPACE: String =
        env::var("METRIC_NAMESPACE").unwrap_or_else(|_| "dc_loadtest".to_string());

    // === Action Metrics ===

    pub static ref ACTIONS_TOTAL: IntCounterVec =
        IntCounterVec::new(
            Opts::new("actions_total", "Total number of reported actions and requests")
                .namespace(METRIC_NAMESPACE.as_str()),
            &["request_type", "name", "status"]  // status: success, failure
        ).unwrap();

    pub static ref ACTION_DURATION_SECONDS: HistogramVec =
        HistogramVec::new(
            HistogramOpts::new(
                "action_duration_seconds",
                "Reported action response times in seconds"
            ).namespace(METRIC_NAMESPACE.as_str()),
            &["request_type", "name"]
        ).unwrap();

    pub static ref THROTTLE_SLEEP_SECONDS: Histogram =
        Histogram::with_opts(
            HistogramOpts::new(
                "throttle_sleep_seconds",
                "Time spent sleeping to hold the configured action rate"
            ).namespace(METRIC_NAMESPACE.as_str())
        ).unwrap();

    // === Session Metrics ===

    pub static ref ACTIVE_USERS: IntGauge =
        IntGauge::with_opts(
            Opts::new("active_users", "Number of virtual users currently running")
                .namespace(METRIC_NAMESPACE.as_str())
        ).unwrap();

    pub static ref STOPPED_USERS_TOTAL: IntCounterVec =
        IntCounterVec::new(
            Opts::new("stopped_users_total", "Virtual users that stopped early")
                .namespace(METRIC_NAMESPACE.as_str()),
            &["reason"]  // reason: login_failed
        ).unwrap();
}

/// Registers all metrics with the default Prometheus registry.
pub fn register_metrics() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    prometheus::default_registry().register(Box::new(ACTIONS_TOTAL.clone()))?;
    prometheus::default_registry().register(Box::new(ACTION_DURATION_SECONDS.clone()))?;
    prometheus::default_registry().register(Box::new(THROTTLE_SLEEP_SECONDS.clone()))?;
    prometheus::default_registry().register(Box::new(ACTIVE_USERS.clone()))?;
    prometheus::default_registry().register(Box::new(STOPPED_USERS_TOTAL.clone()))?;

    Ok(())
}

/// Event sink that feeds the Prometheus counters and histograms.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusSink;

impl PrometheusSink {
    fn record(&self, event: &RequestEvent, status: &str) {
        ACTIONS_TOTAL
            .with_label_values(&[&event.request_type, &event.name, status])
            .inc();
        ACTION_DURATION_SECONDS
            .with_label_values(&[&event.request_type, &event.name])
            .observe(event.response_time_ms as f64 / 1000.0);
    }
}

impl EventSink for PrometheusSink {
    fn request_success(&self, event: &RequestEvent) {
        self.record(event, "success");
    }

    fn request_failure(&self, event: &RequestEvent) {
        self.record(event, "failure");
    }
}

/// HTTP handler for the Prometheus metrics endpoint.
pub async fn metrics_handler(
    _req: Request<Body>,
    registry: Arc<Mutex<Registry>>,
) -> Result<Response<Body>, hyper::Error> {
    let body = gather_metrics_string(&registry);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", TextEncoder::new().format_type())
        .body(Body::from(body))
        .unwrap_or_else(|_| Response::new(Body::empty()));

    Ok(response)
}

/// Starts the Prometheus metrics HTTP server.
pub async fn start_metrics_server(port: u16, registry: Arc<Mutex<Registry>>) {
    let addr = ([0, 0, 0, 0], port).into();

    let make_svc = make_service_fn(move |_conn| {
        let registry_clone = registry.clone();
        async move {
            Ok::<_, hyper::Error>(service_fn(move |req| {
                let registry_clone_inner = registry_clone.clone();
                async move { metrics_handler(req, registry_clone_inner).await }
            }))
        }
    });

    let server = match Server::try_bind(&addr) {
        Ok(builder) => builder.serve(make_svc),
        Err(e) => {
            error!(port = port, error = %e, "Failed to bind metrics server");
            return;
        }
    };
    info!(
        port = port,
        addr = %addr,
        "Metrics server listening"
    );

    if let Err(e) = server.await {
        error!(error = %e, "Metrics server error");
    }
}

/// Gathers and encodes metrics as a string for final output.
pub fn gather_metrics_string(registry: &Arc<Mutex<Registry>>) -> String {
    let encoder = TextEncoder::new();
    let metric_families = match registry.lock() {
        Ok(registry) => registry.gather(),
        Err(poisoned) => poisoned.into_inner().gather(),
    };
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Error encoding metrics");
        return String::from("# ERROR ENCODING METRICS");
    }
    String::from_utf8(buffer).unwrap_or_else(|e| {
        error!(error = %e, "Error encoding metrics to UTF-8");
        String::from("# ERROR ENCODING METRICS TO UTF-8")
    })
}
