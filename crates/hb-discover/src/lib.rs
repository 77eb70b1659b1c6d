//! Upward-walking directory scan that discovers build scripts.
//!
//! Given a set of directories (typically the directories of a build
//! edge's inputs), this walks each one upward toward the project root
//! looking for a script file with a configured name (`hb.rhai` by
//! default), stopping at the first directory that either has the script
//! or marks the project root. Each directory is only ever walked once,
//! tracked by a `scanned` set that persists across calls — this is what
//! makes repeated `build()` calls cheap once a subtree has been covered.

use std::collections::VecDeque;

use hb_path::{CanonicalPath, PathContext, PathSet};
use tracing::trace;

/// Tracks directories already scanned for build scripts, across however
/// many [`ScriptLoader::scan`] calls happen during one evaluation.
pub struct ScriptLoader {
    filename: String,
    scanned: PathSet,
}

impl ScriptLoader {
    pub fn new(filename: impl Into<String>) -> Self {
        ScriptLoader {
            filename: filename.into(),
            scanned: PathSet::new(),
        }
    }

    /// Directories scanned so far, in the order they were first visited.
    pub fn scanned(&self) -> &PathSet {
        &self.scanned
    }

    /// Scan `directories` (and their ancestors) for the configured
    /// script file. Returns the scripts found by this call; directories
    /// already scanned by a previous call are skipped.
    ///
    /// Implemented as an explicit worklist rather than recursion, since
    /// `build()` can trigger scans transitively, to unbounded depth, as
    /// scripts load further scripts that declare further builds.
    pub fn scan(&mut self, ctx: &PathContext, directories: &PathSet) -> PathSet {
        let mut found = PathSet::new();
        let mut worklist: VecDeque<CanonicalPath> = directories.iter().cloned().collect();

        while let Some(dir) = worklist.pop_front() {
            if self.scanned.contains(&dir) {
                continue;
            }
            self.scanned.insert(dir.clone());

            if !ctx.exists(&dir) {
                worklist.push_back(self.parent_of(ctx, &dir));
                continue;
            }

            let candidate = ctx.canonical(&format!("{}/{}", dir.as_str(), self.filename));
            if ctx.exists(&candidate) {
                trace!(script = %candidate, "found build script");
                found.insert(candidate);
                continue;
            }

            let marker = ctx.canonical(&format!("{}/.hbroot", dir.as_str()));
            if ctx.exists(&marker) || dir.as_str() == "/" {
                continue;
            }

            worklist.push_back(self.parent_of(ctx, &dir));
        }

        found
    }

    fn parent_of(&self, ctx: &PathContext, dir: &CanonicalPath) -> CanonicalPath {
        ctx.canonical(&format!("{}/..", dir.as_str()))
    }
}
