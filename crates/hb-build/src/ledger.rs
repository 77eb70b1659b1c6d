//! Build edges and the ordered ledger of them.

use indexmap::IndexMap;

use hb_path::{CanonicalPath, PathSet};

use crate::rule::RuleHandle;

pub struct BuildEdge {
    pub rule: RuleHandle,
    pub dst: PathSet,
    pub src: PathSet,
    pub deps: PathSet,
    pub oodeps: PathSet,
    pub vars: IndexMap<String, String>,
}

impl BuildEdge {
    /// The first path in `dst` — used for depfile naming and
    /// default-target eligibility.
    pub fn primary_output(&self) -> &CanonicalPath {
        self.dst
            .first()
            .expect("a BuildEdge always has at least one dst (enforced at construction)")
    }
}

/// Mangle a path for use as a depfile name: `/` becomes `__`, `..`
/// becomes `up`. Order matters — `..` is replaced before `/`, so `../x`
/// becomes `up__x` rather than `..__x`.
pub fn mangle(path: &str) -> String {
    path.replace("..", "up").replace('/', "__")
}

/// The ordered sequence of build edges plus the running union of their
/// outputs (`targets`).
#[derive(Default)]
pub struct BuildLedger {
    edges: Vec<BuildEdge>,
    targets: PathSet,
}

impl BuildLedger {
    pub fn new() -> Self {
        BuildLedger::default()
    }

    pub fn push(&mut self, edge: BuildEdge) {
        self.targets.extend(edge.dst.iter().cloned());
        self.edges.push(edge);
    }

    pub fn edges(&self) -> &[BuildEdge] {
        &self.edges
    }

    pub fn targets(&self) -> &PathSet {
        &self.targets
    }
}
