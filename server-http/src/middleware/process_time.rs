use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;

pub const X_PROCESS_TIME: &str = "x-process-time";

/// Stamp every response with its handling time in seconds
pub async fn process_time(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let mut response = next.run(request).await;

    let elapsed = started.elapsed().as_secs_f64();
    if let Ok(value) = HeaderValue::from_str(&format!("{:.6}", elapsed)) {
        response.headers_mut().insert(X_PROCESS_TIME, value);
    }
    response
}
