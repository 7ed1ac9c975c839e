//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → server stops accepting, drains
//!               → sweeper, config reload and admin tasks exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
