//! fly-replay request replay.
//!
//! # Data Flow
//! ```text
//! client request
//!     → orchestrator.rs (cache check)
//!     → authority.rs (delegate into an intercepted response)
//!     → instruction.rs (fly-replay / fly-replay-cache*)
//!     → http::upstream (forward to the chosen app)
//! ```

pub mod authority;
pub mod error;
pub mod headers;
pub mod instruction;
pub mod orchestrator;

pub use authority::{Authority, UpstreamAuthority};
pub use error::ReplayError;
pub use instruction::{CacheDirective, CacheInstruction, ReplayInstruction};
pub use orchestrator::{CacheStatus, ReplayOrchestrator};
