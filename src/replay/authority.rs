//! The routing authority seam.
//!
//! The orchestrator never talks to the authority directly. It hands an
//! [`Authority`] the buffered request and a sink, and inspects whatever the
//! authority wrote into it.

use futures_util::future::BoxFuture;

use crate::http::request::BufferedRequest;
use crate::http::response::{write_response, ResponseSink};
use crate::http::upstream::Forwarder;
use crate::replay::error::ReplayError;

/// The "next" delegate consulted when no cached decision applies.
pub trait Authority: Send {
    /// Serve `request`, writing the response into `sink`.
    ///
    /// Errors are fatal for the request and are propagated unchanged.
    fn delegate<'a>(
        &'a mut self,
        request: &'a BufferedRequest,
        sink: &'a mut (dyn ResponseSink + Send),
    ) -> BoxFuture<'a, Result<(), ReplayError>>;
}

/// An authority reached over HTTP at a fixed address.
#[derive(Clone, Debug)]
pub struct UpstreamAuthority {
    forwarder: Forwarder,
    address: String,
    body_limit: usize,
}

impl UpstreamAuthority {
    pub fn new(forwarder: Forwarder, address: impl Into<String>, body_limit: usize) -> Self {
        Self {
            forwarder,
            address: address.into(),
            body_limit,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// A copy reading at most `body_limit` response bytes.
    pub fn with_body_limit(&self, body_limit: usize) -> Self {
        Self {
            body_limit,
            ..self.clone()
        }
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }
}

impl Authority for UpstreamAuthority {
    fn delegate<'a>(
        &'a mut self,
        request: &'a BufferedRequest,
        sink: &'a mut (dyn ResponseSink + Send),
    ) -> BoxFuture<'a, Result<(), ReplayError>> {
        Box::pin(async move {
            let response = self.forwarder.send(&self.address, request).await?;
            write_response(response, sink, self.body_limit).await?;
            Ok(())
        })
    }
}
