//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → replay settings shared via ArcSwap<ReplayConfig>
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the replay settings
//!     → next request observes the new app table
//! ```
//!
//! # Design Decisions
//! - Each request takes one snapshot of the replay settings and uses it throughout
//! - All fields have defaults to allow minimal configs
//! - Listener, authority and admin changes need a restart; only replay settings reload

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::ProxyConfig;
pub use schema::ListenerConfig;
pub use schema::AuthorityConfig;
pub use schema::ReplayConfig;
pub use schema::AppConfig;
pub use schema::{AdminConfig, ObservabilityConfig, TimeoutConfig};
