//! Replay as an axum middleware.
//! The wrapped handler plays the routing authority.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use futures_util::future::BoxFuture;
use std::sync::Arc;

use crate::http::request::BufferedRequest;
use crate::http::response::{write_response, ResponseSink};
use crate::replay::{Authority, ReplayError, ReplayOrchestrator};

/// Authority backed by the next service in the stack.
pub struct NextAuthority {
    next: Next,
    body_limit: usize,
}

impl NextAuthority {
    pub fn new(next: Next, body_limit: usize) -> Self {
        Self { next, body_limit }
    }
}

impl Authority for NextAuthority {
    fn delegate<'a>(
        &'a mut self,
        request: &'a BufferedRequest,
        sink: &'a mut (dyn ResponseSink + Send),
    ) -> BoxFuture<'a, Result<(), ReplayError>> {
        Box::pin(async move {
            let response = self.next.clone().run(request.to_request()).await;
            write_response(response, sink, self.body_limit).await?;
            Ok(())
        })
    }
}

/// Wrap any router so its responses may carry replay instructions.
///
/// ```ignore
/// let app = Router::new()
///     .route("/{*path}", any(authority_handler))
///     .layer(middleware::from_fn_with_state(orchestrator, replay_middleware));
/// ```
pub async fn replay_middleware(
    State(orchestrator): State<Arc<ReplayOrchestrator>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ReplayError> {
    let body_limit = orchestrator.settings().max_body_bytes;
    let mut authority = NextAuthority::new(next, body_limit);
    orchestrator.handle(request, &mut authority).await
}
