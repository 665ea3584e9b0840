//! Fieldscope core library: keyword-seeded code context extraction for Java
//! sources.
//!
//! Given a source tree and a handful of field keywords, the crate finds the
//! files that mention every keyword, segments them into methods, follows the
//! call graph outward from the matching methods, and packs the resulting
//! snippets into a size-bounded context string. It is usable as a plain Rust
//! library and, with the `python` feature, as the `_fieldscope_core` Python
//! extension module.

pub mod config;
pub mod errors;
pub mod indexer;
pub mod models;
pub mod query;

#[cfg(feature = "python")]
mod python;
