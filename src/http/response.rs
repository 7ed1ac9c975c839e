//! Response sinks.
//!
//! # Responsibilities
//! - Give delegates one write surface: headers, status, body
//! - Capture an authority response in memory until we decide what to do with it
//! - Turn whatever was written into the response the client receives
//!
//! # Design Decisions
//! - `InterceptedResponse` buffers; nothing leaves the process until `flush`
//! - `ClientResponse` is the passthrough sink backing the real client response
//! - `flush` consumes the interceptor, so a captured response is sent at most once

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use thiserror::Error;

/// Failure to accept written bytes.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read response body: {0}")]
    Body(#[from] axum::Error),
}

/// The capability set handed to whoever produces a response.
pub trait ResponseSink {
    fn headers_mut(&mut self) -> &mut HeaderMap;

    fn write_status(&mut self, status: StatusCode);

    fn write_body(&mut self, chunk: &[u8]) -> Result<(), SinkError>;
}

/// Buffers a response instead of transmitting it.
#[derive(Debug)]
pub struct InterceptedResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    limit: usize,
}

impl InterceptedResponse {
    pub fn new(limit: usize) -> Self {
        Self {
            status: None,
            headers: HeaderMap::new(),
            body: Vec::new(),
            limit,
        }
    }

    /// Captured status, 200 if the delegate never set one.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of `name` as a string, if present and visible ASCII.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Copy headers, then status, then body into `sink`.
    pub fn flush(self, sink: &mut dyn ResponseSink) -> Result<(), SinkError> {
        let status = self.status();
        let target = sink.headers_mut();
        for (name, value) in self.headers.iter() {
            target.append(name.clone(), value.clone());
        }
        sink.write_status(status);
        sink.write_body(&self.body)
    }
}

impl ResponseSink for InterceptedResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    fn write_body(&mut self, chunk: &[u8]) -> Result<(), SinkError> {
        if self.body.len() + chunk.len() > self.limit {
            return Err(SinkError::TooLarge { limit: self.limit });
        }
        self.body.extend_from_slice(chunk);
        Ok(())
    }
}

/// Passthrough sink: what is written here is what the client gets.
///
/// Like a live connection, the status is fixed by the first `write_status`
/// or by the first body write (implicit 200).
#[derive(Debug, Default)]
pub struct ClientResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ClientResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(Bytes::from(self.body)));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseSink for ClientResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    fn write_body(&mut self, chunk: &[u8]) -> Result<(), SinkError> {
        self.write_status(StatusCode::OK);
        self.body.extend_from_slice(chunk);
        Ok(())
    }
}

/// Drain a produced response into a sink, reading at most `limit` body bytes.
pub async fn write_response<S>(response: Response<Body>, sink: &mut S, limit: usize) -> Result<(), SinkError>
where
    S: ResponseSink + ?Sized,
{
    let (parts, body) = response.into_parts();
    let headers = sink.headers_mut();
    for (name, value) in parts.headers.iter() {
        headers.append(name.clone(), value.clone());
    }
    sink.write_status(parts.status);

    let bytes = axum::body::to_bytes(body, limit).await.map_err(|e| {
        // to_bytes reports an over-limit body as a generic error.
        tracing::debug!(error = %e, limit, "Failed to buffer response body");
        SinkError::Body(e)
    })?;
    sink.write_body(&bytes)
}
