//! Request dispatch table.
//!
//! Maps normalized request paths to per-method handlers. Paths are matched
//! segment by segment against a trie of static segments; there is no
//! parameter capture.

pub mod trie;

pub use trie::{normalize_path, RouteMatch, Router};
