//! Observability infrastructure - Prometheus metrics

mod config;
mod metrics;

pub use config::MetricsConfig;
pub use metrics::{
    create_metrics_router, init_metrics, record_cache_event, record_http_request,
    record_pipeline_operation, set_registered_pipelines, PrometheusMetrics,
};
