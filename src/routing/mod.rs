//! Routing cache subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (host + path)
//!     → cache.rs (exact key, then scan live entries)
//!     → matcher.rs (evaluate wildcard pattern)
//!     → Return: cached decision or miss
//!
//! Authority instruction:
//!     → cache.rs store / invalidate
//!
//! Background:
//!     sweeper.rs → cache.rs sweep (drop expired entries)
//! ```
//!
//! # Design Decisions
//! - Keys are patterns, not literal paths
//! - Expiry is honoured on read; physical removal is the sweeper's job
//! - Overlapping patterns have no precedence; any live match is acceptable
//! - No single-flight: concurrent misses race, last store wins

pub mod cache;
pub mod matcher;
pub mod sweeper;

pub use cache::{CacheEntry, RoutingCache};
pub use matcher::matches_pattern;
pub use sweeper::CacheSweeper;
