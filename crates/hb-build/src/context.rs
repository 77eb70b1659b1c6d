//! The `Context` facade: glues the path subsystem, script discovery,
//! rule registry, build ledger and Ninja emitter into the one object
//! build scripts interact with.
//!
//! Nothing is installed as a dynamic attribute: `rule()` returns a
//! [`RuleHandle`] and `build()` takes one directly. `Context` itself is
//! a cheap `Clone` (an `Rc` handle) so it can be threaded into Rhai
//! script calls and back out again across arbitrarily deep re-entrant
//! `build()` calls without any lifetime gymnastics.

use std::cell::{Cell, Ref, RefCell};
use std::path::Path;
use std::rc::Rc;

use indexmap::IndexMap;
use rhai::Engine;
use tracing::{debug, trace};

use hb_discover::ScriptLoader;
use hb_path::{BuildError, CanonicalPath, PathContext, PathInput, PathSet, Result, StatEntry};

use crate::ledger::{BuildEdge, BuildLedger};
use crate::rule::{RuleHandle, RuleOptions, RuleRegistry};

struct Inner {
    paths: PathContext,
    loader: RefCell<ScriptLoader>,
    loaded: RefCell<PathSet>,
    registry: RefCell<RuleRegistry>,
    ledger: RefCell<BuildLedger>,
    engine: Engine,
    emitted: Cell<bool>,
}

#[derive(Clone)]
pub struct Context(Rc<Inner>);

impl Context {
    /// Construct a context rooted above `start`, configured to look for
    /// `script_filename` (`hb.rhai` by default) while discovering
    /// scripts.
    pub fn new(start: impl AsRef<Path>, script_filename: impl Into<String>) -> Result<Self> {
        let paths = PathContext::new(start)?;
        let filename = script_filename.into();
        debug!(script_filename = %filename, "context constructed");
        Ok(Context(Rc::new(Inner {
            paths,
            loader: RefCell::new(ScriptLoader::new(filename)),
            loaded: RefCell::new(PathSet::new()),
            registry: RefCell::new(RuleRegistry::new()),
            ledger: RefCell::new(BuildLedger::new()),
            engine: crate::bindings::new_engine(),
            emitted: Cell::new(false),
        })))
    }

    // -- path subsystem passthroughs -------------------------------------

    pub fn paths(&self) -> &PathContext {
        &self.0.paths
    }

    pub fn root(&self) -> &CanonicalPath {
        self.0.paths.root()
    }

    pub fn cwd(&self) -> &CanonicalPath {
        self.0.paths.cwd()
    }

    pub fn anchor(&self) -> String {
        self.0.paths.anchor()
    }

    pub fn hits(&self) -> u64 {
        self.0.paths.hits()
    }

    pub fn misses(&self) -> u64 {
        self.0.paths.misses()
    }

    pub fn canonical(&self, path: &str) -> CanonicalPath {
        self.0.paths.canonical(path)
    }

    pub fn pathset(&self, input: impl Into<PathInput>) -> Result<PathSet> {
        self.0.paths.pathset(input)
    }

    pub fn stat(&self, path: &CanonicalPath) -> StatEntry {
        self.0.paths.stat(path)
    }

    pub fn isdir(&self, path: &CanonicalPath) -> bool {
        self.0.paths.isdir(path)
    }

    pub fn exists(&self, path: &CanonicalPath) -> bool {
        self.0.paths.exists(path)
    }

    pub fn newest<'a>(&self, set: &'a PathSet) -> Result<&'a CanonicalPath> {
        self.0.paths.newest(set)
    }

    pub fn oldest<'a>(&self, set: &'a PathSet) -> Result<&'a CanonicalPath> {
        self.0.paths.oldest(set)
    }

    pub fn directories(&self, set: &PathSet) -> PathSet {
        self.0.paths.directories(set)
    }

    pub fn files(&self, set: &PathSet) -> PathSet {
        self.0.paths.files(set)
    }

    pub fn filter(&self, set: &PathSet, patterns: &[&str]) -> Result<Vec<PathSet>> {
        self.0.paths.filter(set, patterns)
    }

    pub fn filter_one(&self, set: &PathSet, pattern: &str) -> Result<PathSet> {
        self.0.paths.filter_one(set, pattern)
    }

    pub fn relative(&self, from: &CanonicalPath, set: &PathSet) -> Vec<String> {
        self.0.paths.relative(from, set)
    }

    // -- rule/build registry ---------------------------------------------

    fn ensure_not_frozen(&self, what: &'static str) -> Result<()> {
        if self.0.emitted.get() {
            return Err(BuildError::EvaluationFrozen { what });
        }
        Ok(())
    }

    /// Register a rule, returning a handle to pass to [`Context::build`].
    /// Fails if `name` is already registered, or if the manifest has
    /// already been emitted.
    pub fn rule(
        &self,
        name: impl Into<String>,
        command: impl Into<String>,
        opts: RuleOptions,
    ) -> Result<RuleHandle> {
        self.ensure_not_frozen("declaring a rule")?;
        self.0.registry.borrow_mut().define(name.into(), command.into(), opts)
    }

    /// Register a build edge for `handle`, triggering discovery of any
    /// build scripts under the directories of its inputs. Newly found
    /// scripts are loaded and their entry function invoked before this
    /// call returns, which may itself register more rules and edges —
    /// evaluation proceeds to a demand-driven fixed point.
    pub fn build(
        &self,
        handle: &RuleHandle,
        dst: impl Into<PathInput>,
        src: impl Into<PathInput>,
        deps: impl Into<PathInput>,
        oodeps: impl Into<PathInput>,
        vars: IndexMap<String, String>,
    ) -> Result<()> {
        self.ensure_not_frozen("declaring a build edge")?;

        let dst = self.pathset(dst)?;
        if dst.is_empty() {
            return Err(BuildError::EmptySetArgument { operation: "build edge dst" });
        }
        let src = self.pathset(src)?;
        let deps = self.pathset(deps)?;
        let oodeps = self.pathset(oodeps)?;

        {
            let registry = self.0.registry.borrow();
            registry.mark_used(handle);
            if registry.get(handle).is_none() {
                trace!(rule = handle.name(), "build() called with an unregistered rule handle");
            }
        }

        let mut scan_targets = src.clone();
        scan_targets.extend(deps.iter().cloned());
        scan_targets.extend(oodeps.iter().cloned());
        let scan_dirs = self.directories(&scan_targets);

        self.0.ledger.borrow_mut().push(BuildEdge {
            rule: handle.clone(),
            dst,
            src,
            deps,
            oodeps,
            vars,
        });

        self.discover_and_run(&scan_dirs)
    }

    /// Load and run the top-level entry script directly, bypassing
    /// discovery. The demand-driven scan in [`Context::build`] only ever
    /// *finds* scripts reachable from an existing edge's inputs; the very
    /// first script of an evaluation has no such edge yet, so a driver
    /// loads it explicitly with this method before calling any rule or
    /// build on the context.
    pub fn run_entry_script(&self, path: &Path) -> Result<()> {
        let script = self.canonical(&path.to_string_lossy());
        let already_loaded = !self.0.loaded.borrow_mut().insert(script.clone());
        if already_loaded {
            return Ok(());
        }
        self.load_and_run(&script)
    }

    fn discover_and_run(&self, directories: &PathSet) -> Result<()> {
        let found = self.0.loader.borrow_mut().scan(&self.0.paths, directories);
        for script in found {
            let already_loaded = !self.0.loaded.borrow_mut().insert(script.clone());
            if already_loaded {
                continue;
            }
            self.load_and_run(&script)?;
        }
        Ok(())
    }

    fn load_and_run(&self, script: &CanonicalPath) -> Result<()> {
        let dir = script
            .as_path()
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string());
        let previous_anchor = self.0.paths.set_anchor(dir);

        let outcome = hb_script::load(&self.0.engine, script.as_path()).and_then(|ast| {
            hb_script::run_entry(&self.0.engine, &ast, script.as_path(), rhai::Dynamic::from(self.clone()))
        });

        self.0.paths.set_anchor(previous_anchor);
        outcome
    }

    /// Rule names in registration order.
    pub fn rule_names(&self) -> Vec<String> {
        self.0.registry.borrow().names().into_iter().collect()
    }

    pub fn targets(&self) -> PathSet {
        self.0.ledger.borrow().targets().clone()
    }

    pub(crate) fn registry(&self) -> Ref<'_, RuleRegistry> {
        self.0.registry.borrow()
    }

    pub(crate) fn ledger(&self) -> Ref<'_, BuildLedger> {
        self.0.ledger.borrow()
    }

    /// Render and return the Ninja manifest. Terminal: every `rule()`
    /// and `build()` call after this one fails with
    /// `BuildError::EvaluationFrozen`.
    pub fn emit(&self) -> Result<String> {
        self.ensure_not_frozen("emitting the manifest")?;
        self.0.emitted.set(true);
        crate::emitter::emit(self)
    }
}
