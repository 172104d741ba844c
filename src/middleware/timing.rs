use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};
use tracing::debug;

const RESPONSE_TIME_US: HeaderName = HeaderName::from_static("x-response-time-us");
const SERVER_TIMING: HeaderName = HeaderName::from_static("server-timing");

/// Stamps every response with its handler wall time and logs one `debug`
/// line per API request. The long-lived SSE stream is left out of the log
/// since its duration is the lifetime of the connection.
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();

    stamp_elapsed(response.headers_mut(), elapsed);

    if path.starts_with("/api/") && !path.ends_with("/stream") {
        debug!(
            status = response.status().as_u16(),
            %method,
            path = %path,
            us = elapsed.as_micros() as u64,
            "handled request"
        );
    }

    response
}

/// Microseconds in `X-Response-Time-Us`, milliseconds in `Server-Timing`
/// (`total;dur=<ms>`) so browser devtools pick it up.
fn stamp_elapsed(headers: &mut HeaderMap, elapsed: Duration) {
    headers.insert(RESPONSE_TIME_US, HeaderValue::from(elapsed.as_micros() as u64));
    let ms = elapsed.as_secs_f64() * 1000.0;
    if let Ok(value) = HeaderValue::from_str(&format!("total;dur={ms:.3}")) {
        headers.insert(SERVER_TIMING, value);
    }
}
