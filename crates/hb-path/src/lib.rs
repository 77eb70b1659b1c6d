//! Canonical paths, path sets, and a per-context stat cache.
//!
//! This crate implements the "path subsystem" of `hb`: root discovery,
//! path canonicalization, `.list` file expansion, and a filesystem stat
//! cache, all scoped to a single [`PathContext`].

mod canonical;
mod context;
mod pathset;
mod stat;

mod error;

pub use canonical::CanonicalPath;
pub use context::PathContext;
pub use error::{BuildError, Result};
pub use pathset::{PathInput, PathSet};
pub use stat::StatEntry;
