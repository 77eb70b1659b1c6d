//! Rule declarations and the registry that enforces name uniqueness.
//!
//! `Context::rule` returns a [`RuleHandle`] rather than installing a
//! dynamic attribute on the context; `used` flips the first time that
//! handle is passed to `Context::build`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use hb_path::{BuildError, PathSet, Result};

use crate::Context;

/// Command-template tokens Ninja itself understands. Any other
/// identifier in a rule's command is rule-scoped and gets renamed at
/// emission time so two rules never collide on the same variable name.
pub const STANDARD_VARS: &[&str] = &[
    "in",
    "out",
    "depfile",
    "deps",
    "description",
    "generator",
    "pool",
    "restat",
    "rspfile",
    "rspfile_content",
];

pub fn is_standard_var(name: &str) -> bool {
    STANDARD_VARS.contains(&name)
}

/// Late-bound dependency callback: invoked once per used rule at
/// emission time, returning deps/oodeps to merge into the rule's
/// declared sets. May inspect `targets`, since callbacks run after
/// every edge has been registered.
pub type RuleCallback = Box<dyn Fn(&Context) -> Result<(PathSet, PathSet)>>;

pub struct Rule {
    pub name: String,
    pub command: String,
    pub doc: String,
    pub default_vars: IndexMap<String, String>,
    pub pool: String,
    pub max_parallel: u32,
    /// Deps/oodeps attached to every edge of this rule. `RefCell`
    /// because the emitter's rule callback merges extra paths into these
    /// sets once, at emission time — the only place they are ever
    /// mutated after registration.
    pub decl_deps: RefCell<PathSet>,
    pub decl_oodeps: RefCell<PathSet>,
    pub callback: Option<RuleCallback>,
    pub used: Cell<bool>,
}

/// A cheap, cloneable reference to a registered rule by name. Holding
/// one is proof the rule was successfully registered; it carries no
/// borrow of the registry, so it can be stashed in a script's own
/// variables and passed to `Context::build` arbitrarily later.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RuleHandle(pub(crate) Rc<str>);

impl RuleHandle {
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Options accepted by [`crate::Context::rule`], bundled into one struct
/// rather than threaded as positional parameters.
#[derive(Default)]
pub struct RuleOptions {
    pub doc: String,
    pub max_parallel: u32,
    pub pool: String,
    pub decl_deps: PathSet,
    pub decl_oodeps: PathSet,
    pub default_vars: IndexMap<String, String>,
    pub callback: Option<RuleCallback>,
}

/// Rules keyed by name, in registration order. Registration order is
/// emission order, filtered to rules that were actually used.
#[derive(Default)]
pub struct RuleRegistry {
    rules: IndexMap<String, Rule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        RuleRegistry::default()
    }

    /// Register a new rule. Fails if `name` already names a rule in this
    /// registry — re-registration is rejected unconditionally, whether
    /// or not the existing rule was ever used or emitted.
    pub fn define(&mut self, name: String, command: String, opts: RuleOptions) -> Result<RuleHandle> {
        if self.rules.contains_key(&name) {
            return Err(BuildError::NameAlreadyDefined { name });
        }
        let handle = RuleHandle(Rc::from(name.as_str()));
        let rule = Rule {
            name: name.clone(),
            command,
            doc: opts.doc,
            default_vars: opts.default_vars,
            pool: opts.pool,
            max_parallel: opts.max_parallel,
            decl_deps: RefCell::new(opts.decl_deps),
            decl_oodeps: RefCell::new(opts.decl_oodeps),
            callback: opts.callback,
            used: Cell::new(false),
        };
        self.rules.insert(name, rule);
        Ok(handle)
    }

    pub fn get(&self, handle: &RuleHandle) -> Option<&Rule> {
        self.rules.get(handle.name())
    }

    pub fn mark_used(&self, handle: &RuleHandle) {
        if let Some(rule) = self.rules.get(handle.name()) {
            rule.used.set(true);
        }
    }

    /// Rules in registration order, the order the emitter walks them.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn names(&self) -> IndexSet<String> {
        self.rules.keys().cloned().collect()
    }
}
