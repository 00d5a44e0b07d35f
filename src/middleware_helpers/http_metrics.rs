use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS, HTTP_REQUEST_DURATION};

/// Counts requests by method/status and records their latency.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_owned();
    let start = Instant::now();

    let response = next.run(request).await;

    HTTP_REQUEST_DURATION
        .with_label_values(&[method.as_str()])
        .observe(start.elapsed().as_secs_f64());
    HTTP_REQUESTS
        .with_label_values(&[method.as_str(), response.status().as_str()])
        .inc();

    response
}
