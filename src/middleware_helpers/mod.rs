pub mod http_metrics;
pub mod request_id;

pub use http_metrics::http_metrics_middleware;
pub use request_id::request_id_middleware;
