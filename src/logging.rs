//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Bodies longer than this many bytes are truncated in `info` logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a text body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level. Binary bodies,
/// such as PDF reports, are logged by size only.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body = match read_body(body).await {
        Ok(body) => body,
        Err(response) => return response,
    };
    tracing::info!(
        "Received request: {parts:#?}\nbody: {}",
        describe_body(&parts.headers, &body)
    );
    log_full_body("request", &parts.headers, &body);

    let response = next.run(Request::from_parts(parts, Body::from(body))).await;

    let (parts, body) = response.into_parts();
    let body = match read_body(body).await {
        Ok(body) => body,
        Err(response) => return response,
    };
    tracing::info!(
        "Sending response: {parts:#?}\nbody: {}",
        describe_body(&parts.headers, &body)
    );
    log_full_body("response", &parts.headers, &body);

    Response::from_parts(parts, Body::from(body))
}

async fn read_body(body: Body) -> Result<Bytes, Response> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .inspect_err(|error| tracing::error!("could not read body for logging: {error}"))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn is_text(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return true;
    };

    content_type.starts_with("text/")
        || content_type.contains("json")
        || content_type.starts_with("application/x-www-form-urlencoded")
}

fn describe_body(headers: &HeaderMap, body: &Bytes) -> String {
    if !is_text(headers) {
        return format!("<{} bytes>", body.len());
    }

    let text = String::from_utf8_lossy(body);

    if text.len() > LOG_BODY_LENGTH_LIMIT {
        let mut end = LOG_BODY_LENGTH_LIMIT;
        while !text.is_char_boundary(end) {
            end -= 1;
        }

        format!("{}...", &text[..end])
    } else {
        format!("{text:?}")
    }
}

fn log_full_body(direction: &str, headers: &HeaderMap, body: &Bytes) {
    if is_text(headers) && body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::debug!("Full {direction} body: {:?}", String::from_utf8_lossy(body));
    }
}
