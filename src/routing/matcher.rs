//! Cache pattern matching.
//!
//! # Responsibilities
//! - Decide whether a concrete `host + path` is covered by a cached pattern
//!
//! # Rules
//! 1. Exact string equality always matches.
//! 2. A pattern without `*` matches nothing else.
//! 3. A trailing `*` turns the rest of the pattern into a required prefix.
//! 4. A pattern with exactly one `*` matches when the path starts with the
//!    text before it and ends with the text after it. Overlap is allowed.
//!
//! Rules 3 and 4 are checked independently; either one is enough.
//!
//! # Design Decisions
//! - Case-sensitive, byte-wise comparison (host is part of the key as sent)
//! - No regex, no allocation on the match path

/// The wildcard marker inside a cache pattern.
pub const WILDCARD: char = '*';

/// Returns true if `path` is covered by `pattern`.
pub fn matches_pattern(path: &str, pattern: &str) -> bool {
    if path == pattern {
        return true;
    }

    if !pattern.contains(WILDCARD) {
        return false;
    }

    if let Some(prefix) = pattern.strip_suffix(WILDCARD) {
        if path.starts_with(prefix) {
            return true;
        }
    }

    let mut pieces = pattern.split(WILDCARD);
    if let (Some(head), Some(tail), None) = (pieces.next(), pieces.next(), pieces.next()) {
        if path.starts_with(head) && path.ends_with(tail) {
            return true;
        }
    }

    false
}
