use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::{debug, trace};

use crate::canonical::{canonicalize, find_root, CanonicalPath};
use crate::error::{BuildError, Result};
use crate::pathset::{PathInput, PathSet};
use crate::stat::{stat_path, StatEntry};

fn dirname(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
        None => "/".to_string(),
    }
}

fn split_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn relative_path(from: &str, to: &str) -> String {
    let comps = |p: &str| -> Vec<&str> { p.split('/').filter(|s| !s.is_empty()).collect() };
    let from_c = comps(from);
    let to_c = comps(to);
    let common = from_c
        .iter()
        .zip(to_c.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<String> = std::iter::repeat("..".to_string())
        .take(from_c.len() - common)
        .collect();
    parts.extend(to_c[common..].iter().map(|s| s.to_string()));
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Holds everything a single project evaluation needs: root/cwd/anchor,
/// and three caches (stat, directory, list-file). A `PathContext` is
/// constructed once, mutated throughout evaluation, and discarded
/// wholesale — there is no incremental invalidation, matching a
/// single-threaded, single-pass evaluation model.
///
/// Caches use `RefCell`/`Cell` rather than locks: a context is never
/// shared across threads, so a lock would misrepresent the concurrency
/// model for no benefit.
pub struct PathContext {
    root: CanonicalPath,
    cwd: CanonicalPath,
    anchor: RefCell<String>,
    stat_cache: RefCell<HashMap<CanonicalPath, StatEntry>>,
    dir_cache: RefCell<HashMap<CanonicalPath, CanonicalPath>>,
    list_cache: RefCell<HashMap<String, PathSet>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl PathContext {
    /// Construct a context rooted at `start` (or the process cwd, if
    /// `start` is empty). Walks ancestors of `start` looking for a
    /// `.hbroot` marker file; fails if none is found.
    pub fn new(start: impl AsRef<Path>) -> Result<Self> {
        let start = start.as_ref();
        let start = if start.as_os_str().is_empty() {
            std::env::current_dir().expect("current directory must be readable")
        } else {
            start.to_path_buf()
        };
        let start_str = start.to_string_lossy().into_owned();
        let cwd = crate::canonical::normalize(&start_str);
        let root = find_root(&cwd)?;
        debug!(root = %root, cwd = %cwd, "discovered project root");
        Ok(PathContext {
            root,
            cwd: CanonicalPath::new_unchecked(cwd.clone()),
            anchor: RefCell::new(cwd),
            stat_cache: RefCell::new(HashMap::new()),
            dir_cache: RefCell::new(HashMap::new()),
            list_cache: RefCell::new(HashMap::new()),
            hits: Cell::new(0),
            misses: Cell::new(0),
        })
    }

    pub fn root(&self) -> &CanonicalPath {
        &self.root
    }

    pub fn cwd(&self) -> &CanonicalPath {
        &self.cwd
    }

    pub fn anchor(&self) -> String {
        self.anchor.borrow().clone()
    }

    /// Set a new anchor, returning the previous one so callers can
    /// restore it (used while expanding list files and while loading
    /// scripts).
    pub fn set_anchor(&self, new_anchor: impl Into<String>) -> String {
        self.anchor.replace(new_anchor.into())
    }

    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    pub fn misses(&self) -> u64 {
        self.misses.get()
    }

    /// Drop all cached filesystem state and reset the hit/miss counters.
    /// A single evaluation never needs this itself; it exists so tests
    /// can exercise cache-invalidation behavior directly.
    pub fn clear_stat_cache(&self) {
        self.stat_cache.borrow_mut().clear();
        self.dir_cache.borrow_mut().clear();
        self.hits.set(0);
        self.misses.set(0);
    }

    pub fn canonical(&self, path: &str) -> CanonicalPath {
        canonicalize(&self.anchor(), self.root.as_str(), path)
    }

    /// Coerce `input` (a string, an existing [`PathSet`], or a finite
    /// iterable of either) into a single ordered, de-duplicating
    /// [`PathSet`].
    pub fn pathset(&self, input: impl Into<PathInput>) -> Result<PathSet> {
        let mut out = PathSet::new();
        self.extend_pathset(input.into(), &mut out)?;
        Ok(out)
    }

    fn extend_pathset(&self, input: PathInput, out: &mut PathSet) -> Result<()> {
        match input {
            PathInput::Str(s) => {
                let canonical = self.canonical(&s);
                if canonical.ends_with_suffix(".list") {
                    let expanded = self.expand_list(&canonical)?;
                    out.extend(expanded);
                } else {
                    out.insert(canonical);
                }
            }
            PathInput::Set(set) => {
                out.extend(set);
            }
            PathInput::Iter(items) => {
                for item in items {
                    self.extend_pathset(item, out)?;
                }
            }
        }
        Ok(())
    }

    /// Expand a `.list` file: one path per non-blank, non-comment line,
    /// resolved relative to the list file's own directory, with nested
    /// `.list` references inlined recursively. Result is memoized by the
    /// list file's canonical path.
    fn expand_list(&self, list_path: &CanonicalPath) -> Result<PathSet> {
        if let Some(cached) = self.list_cache.borrow().get(list_path.as_str()) {
            return Ok(cached.clone());
        }

        let directory = dirname(list_path.as_str());
        let previous_anchor = self.set_anchor(directory);

        let contents = fs::read_to_string(list_path.as_path()).map_err(|source| {
            BuildError::MissingListFile {
                path: list_path.as_path().to_path_buf(),
                source,
            }
        });
        let contents = match contents {
            Ok(c) => c,
            Err(err) => {
                self.set_anchor(previous_anchor);
                return Err(err);
            }
        };

        let mut pset = PathSet::new();
        for raw_line in contents.lines() {
            let line = split_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }
            let canonical = self.canonical(line);
            if canonical.ends_with_suffix(".list") {
                let nested = self.expand_list(&canonical)?;
                pset.extend(nested);
            } else {
                pset.insert(canonical);
            }
        }

        self.set_anchor(previous_anchor);
        self.list_cache
            .borrow_mut()
            .insert(list_path.as_str().to_string(), pset.clone());
        Ok(pset)
    }

    /// Return the (possibly cached) filesystem metadata for `path`,
    /// or the sentinel entry if it does not exist.
    pub fn stat(&self, path: &CanonicalPath) -> StatEntry {
        if let Some(entry) = self.stat_cache.borrow().get(path) {
            self.hits.set(self.hits.get() + 1);
            return *entry;
        }
        let entry = stat_path(path.as_str());
        trace!(path = %path, is_dir = entry.is_dir, "stat");
        self.stat_cache.borrow_mut().insert(path.clone(), entry);
        self.misses.set(self.misses.get() + 1);
        entry
    }

    pub fn isdir(&self, path: &CanonicalPath) -> bool {
        self.stat(path).is_dir
    }

    /// `true` iff `stat(path)` is not the sentinel — a true zero `ctime`
    /// on a real file is not observed in practice, an accepted trade-off.
    pub fn exists(&self, path: &CanonicalPath) -> bool {
        self.stat(path).ctime != 0
    }

    pub fn newest<'a>(&self, set: &'a PathSet) -> Result<&'a CanonicalPath> {
        self.extreme(set, "newest", |a, b| a > b)
    }

    pub fn oldest<'a>(&self, set: &'a PathSet) -> Result<&'a CanonicalPath> {
        self.extreme(set, "oldest", |a, b| a < b)
    }

    fn extreme<'a>(
        &self,
        set: &'a PathSet,
        operation: &'static str,
        better: fn(i64, i64) -> bool,
    ) -> Result<&'a CanonicalPath> {
        let mut iter = set.iter();
        let mut best = iter.next().ok_or(BuildError::EmptySetArgument { operation })?;
        let mut best_mtime = self.stat(best).mtime;
        for candidate in iter {
            let mtime = self.stat(candidate).mtime;
            if better(mtime, best_mtime) {
                best = candidate;
                best_mtime = mtime;
            }
        }
        Ok(best)
    }

    /// For each path, its own path if it is a directory, otherwise its
    /// parent directory. Results are memoized in `dir_cache`.
    pub fn directories(&self, set: &PathSet) -> PathSet {
        let mut result = PathSet::new();
        for path in set {
            if let Some(cached) = self.dir_cache.borrow().get(path) {
                result.insert(cached.clone());
                continue;
            }
            let dir = if self.isdir(path) {
                path.clone()
            } else {
                CanonicalPath::new_unchecked(dirname(path.as_str()))
            };
            self.dir_cache.borrow_mut().insert(path.clone(), dir.clone());
            result.insert(dir);
        }
        result
    }

    pub fn files(&self, set: &PathSet) -> PathSet {
        set.iter().filter(|p| !self.isdir(p)).cloned().collect()
    }

    /// Compile each pattern as a regex and return one [`PathSet`] per
    /// pattern, containing the paths whose textual form contains a
    /// match anywhere (not an anchored full match).
    pub fn filter(&self, set: &PathSet, patterns: &[&str]) -> Result<Vec<PathSet>> {
        let regexes: Vec<Regex> = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| BuildError::InvalidPattern {
                    pattern: (*p).to_string(),
                    source,
                })
            })
            .collect::<Result<_>>()?;
        Ok(regexes
            .iter()
            .map(|re| {
                set.iter()
                    .filter(|p| re.is_match(p.as_str()))
                    .cloned()
                    .collect()
            })
            .collect())
    }

    /// Convenience for the common single-pattern case, returning the one
    /// matching [`PathSet`] directly instead of a one-element `Vec`.
    pub fn filter_one(&self, set: &PathSet, pattern: &str) -> Result<PathSet> {
        Ok(self.filter(set, &[pattern])?.remove(0))
    }

    pub fn relative(&self, from: &CanonicalPath, set: &PathSet) -> Vec<String> {
        set.iter()
            .map(|p| relative_path(from.as_str(), p.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn marked_root() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        File::create(dir.path().join(".hbroot")).unwrap();
        dir
    }

    #[test]
    fn pathset_dedups_keeping_first_occurrence() {
        let dir = marked_root();
        let ctx = PathContext::new(dir.path()).unwrap();
        let set = ctx.pathset(["a.c", "b.c", "a.c"]).unwrap();
        let paths: Vec<_> = set.iter().map(|p| p.as_str().to_string()).collect();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("/a.c"));
        assert!(paths[1].ends_with("/b.c"));
    }

    #[test]
    fn stat_cache_counts_hits_and_misses() {
        let dir = marked_root();
        let ctx = PathContext::new(dir.path()).unwrap();
        let file = dir.path().join("f.txt");
        File::create(&file).unwrap();
        let path = ctx.canonical(&file.to_string_lossy());

        assert_eq!((ctx.hits(), ctx.misses()), (0, 0));
        ctx.stat(&path);
        assert_eq!((ctx.hits(), ctx.misses()), (0, 1));
        ctx.stat(&path);
        assert_eq!((ctx.hits(), ctx.misses()), (1, 1));

        ctx.clear_stat_cache();
        assert_eq!((ctx.hits(), ctx.misses()), (0, 0));
    }

    #[test]
    fn exists_treats_sentinel_as_absent() {
        let dir = marked_root();
        let ctx = PathContext::new(dir.path()).unwrap();
        let missing = ctx.canonical("nope");
        assert!(!ctx.exists(&missing));
    }

    #[test]
    fn newest_and_oldest_reject_empty_sets() {
        let dir = marked_root();
        let ctx = PathContext::new(dir.path()).unwrap();
        let empty = PathSet::new();
        assert!(ctx.newest(&empty).is_err());
        assert!(ctx.oldest(&empty).is_err());
    }

    #[test]
    fn list_file_expands_in_order_and_dedups() {
        let dir = marked_root();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        let mut nested = File::create(sub.join("nested.list")).unwrap();
        writeln!(nested, "inner.c").unwrap();

        let mut top = File::create(dir.path().join("top.list")).unwrap();
        writeln!(top, "# comment line").unwrap();
        writeln!(top, "foo.c  # trailing comment").unwrap();
        writeln!(top, "sub/nested.list").unwrap();
        writeln!(top, "bar.c").unwrap();
        writeln!(top, "foo.c").unwrap(); // duplicate

        let ctx = PathContext::new(dir.path()).unwrap();
        let set = ctx.pathset("top.list").unwrap();
        let paths: Vec<_> = set.iter().map(|p| p.as_str().to_string()).collect();
        assert_eq!(
            paths,
            vec![
                format!("{}/foo.c", dir.path().display()),
                format!("{}/sub/inner.c", dir.path().display()),
                format!("{}/bar.c", dir.path().display()),
            ]
        );
    }

    #[test]
    fn filter_single_pattern_is_unary_convenience() {
        let dir = marked_root();
        let ctx = PathContext::new(dir.path()).unwrap();
        let set = ctx.pathset(["foo/a.bar", "b.baz"]).unwrap();
        let foo = ctx.filter_one(&set, "/foo/").unwrap();
        assert_eq!(foo.len(), 1);
    }

    #[test]
    fn relative_preserves_set_order() {
        let dir = marked_root();
        let ctx = PathContext::new(dir.path()).unwrap();
        let set = ctx.pathset(["a/x", "b/y"]).unwrap();
        let from = ctx.canonical("start");
        let rel = ctx.relative(&from, &set);
        assert_eq!(rel, vec!["../a/x", "../b/y"]);
    }
}
