//! Middleware layers.

pub mod replay;

pub use replay::{replay_middleware, NextAuthority};
