//! fly-replay routing proxy library.
//!
//! A request is first offered to a routing authority. If the authority answers
//! with a `fly-replay` header, the proxy replays the original request to the
//! named application, optionally caching the decision for matching paths.

pub mod config;
pub mod http;
pub mod replay;
pub mod routing;
pub mod lifecycle;
pub mod observability;
pub mod admin;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use replay::{Authority, ReplayOrchestrator};
pub use routing::RoutingCache;
