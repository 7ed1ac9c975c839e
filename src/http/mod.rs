//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, tracing)
//!     → request.rs (buffer body, host + path)
//!     → replay orchestrator
//!         → response.rs (intercept the authority response)
//!         → upstream.rs (relay to authority or backend)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use middleware::replay_middleware;
pub use request::{BufferedRequest, MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use response::{ClientResponse, InterceptedResponse, ResponseSink};
pub use server::HttpServer;
