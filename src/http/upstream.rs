//! Upstream relay.
//!
//! # Responsibilities
//! - Normalize and parse upstream addresses (`host:port` or scheme-qualified)
//! - Rewrite a buffered request for the upstream and send it
//! - Stream the upstream response back unbuffered
//!
//! # Design Decisions
//! - Bare addresses are assumed to be plain HTTP
//! - The connector speaks plain HTTP only; config validation rejects https targets
//! - The client's Host header is forwarded unchanged
//! - Hop-by-hop headers are stripped in both directions
//! - Single shot: no retries, only the connector's connect timeout

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode, Uri, Version};
use axum::response::{IntoResponse, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::{Duration, Instant};
use url::Url;

use crate::http::request::BufferedRequest;
use crate::observability::metrics;
use crate::replay::error::ReplayError;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Headers that describe a single connection and must not be relayed.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Prefix bare `host:port` addresses with `http://`.
pub fn normalize_address(address: &str) -> String {
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

/// Normalize a configured address and parse it as a network location.
pub fn parse_target(address: &str) -> Result<Url, ReplayError> {
    let normalized = normalize_address(address);

    let invalid = |reason: String| ReplayError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let url = Url::parse(&normalized).map_err(|e| invalid(e.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// Build the upstream URI: target scheme and authority, target base path
/// joined with the request path, request query.
pub fn upstream_uri(target: &Url, original: &Uri) -> Result<Uri, ReplayError> {
    let base = target.path().trim_end_matches('/');
    let path = original.path();
    let mut uri = format!("{}://{}", target.scheme(), authority_of(target));
    uri.push_str(base);
    if !path.starts_with('/') {
        uri.push('/');
    }
    uri.push_str(path);
    if let Some(query) = original.query() {
        uri.push('?');
        uri.push_str(query);
    }

    uri.parse::<Uri>().map_err(|e| ReplayError::InvalidAddress {
        address: target.to_string(),
        reason: e.to_string(),
    })
}

fn authority_of(target: &Url) -> String {
    let host = target.host_str().unwrap_or_default();
    match target.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in Connection are hop-by-hop too.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}

/// Relays buffered requests to upstream addresses.
#[derive(Clone, Debug)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
}

impl Forwarder {
    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }

    /// Send `request` to `address` and return the upstream response.
    ///
    /// Transport failures are errors; upstream status codes are not.
    pub async fn send(&self, address: &str, request: &BufferedRequest) -> Result<Response, ReplayError> {
        let target = parse_target(address)?;
        let uri = upstream_uri(&target, &request.uri)?;

        let mut outbound = request.to_request();
        *outbound.uri_mut() = uri;
        // The pooled connections speak HTTP/1.1 regardless of the client's version.
        *outbound.version_mut() = Version::HTTP_11;
        let headers = outbound.headers_mut();
        strip_hop_by_hop(headers);
        if let Some(addr) = request.client_addr() {
            append_forwarded_for(headers, &addr.ip().to_string());
        }

        let start = Instant::now();
        let response = self
            .client
            .request(outbound)
            .await
            .map_err(|e| ReplayError::Upstream {
                address: address.to_string(),
                reason: e.to_string(),
            })?;
        metrics::record_relay(address, response.status().as_u16(), start);

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }

    /// Relay to a backend application.
    ///
    /// An unparseable address is an error for the caller. A backend that
    /// cannot be reached yields `502 Bad Gateway`, like any reverse proxy.
    pub async fn forward(&self, address: &str, request: &BufferedRequest) -> Result<Response, ReplayError> {
        match self.send(address, request).await {
            Ok(response) => Ok(response),
            Err(ReplayError::Upstream { address, reason }) => {
                tracing::error!(address = %address, error = %reason, "Upstream error");
                Ok((StatusCode::BAD_GATEWAY, "Upstream request failed").into_response())
            }
            Err(e) => Err(e),
        }
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, client_ip: &str) {
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, client_ip),
        None => client_ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
