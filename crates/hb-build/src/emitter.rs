//! Walks a [`Context`]'s registry and ledger and renders a Ninja
//! manifest. All policy lives here; `hb-ninja-writer` underneath only
//! knows how to format the statements this module hands it.

use indexmap::IndexMap;
use regex::Regex;

use hb_path::{PathSet, Result};
use hb_ninja_writer::Writer;

use crate::ledger::mangle;
use crate::rule::{is_standard_var, Rule};
use crate::Context;

const DOLLAR_SENTINEL: char = '\u{0}';

/// Rewrite `command`'s non-standard `$var`/`${var}` references to
/// `${rule_name}_{var}`, returning the rewritten command and the
/// first-seen values for each renamed variable. A variable with no
/// declared default is not an error; it is filled in as the empty
/// string.
fn rewrite_command(
    command: &str,
    rule_name: &str,
    default_vars: &IndexMap<String, String>,
) -> (String, IndexMap<String, String>) {
    let protected = command.replace("$$", &DOLLAR_SENTINEL.to_string());
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("static pattern");

    let mut seen: IndexMap<String, String> = IndexMap::new();
    let rewritten = re.replace_all(&protected, |caps: &regex::Captures| {
        let (var, braced) = match (caps.get(1), caps.get(2)) {
            (Some(m), _) => (m.as_str(), true),
            (None, Some(m)) => (m.as_str(), false),
            _ => unreachable!("regex has exactly two alternatives"),
        };
        if is_standard_var(var) {
            return caps.get(0).expect("full match always present").as_str().to_string();
        }
        seen.entry(var.to_string())
            .or_insert_with(|| default_vars.get(var).cloned().unwrap_or_default());
        let renamed = format!("{rule_name}_{var}");
        if braced {
            format!("${{{renamed}}}")
        } else {
            format!("${renamed}")
        }
    });

    (rewritten.replace(DOLLAR_SENTINEL, "$$"), seen)
}

fn wants_depfile(rule: &Rule) -> bool {
    rule.default_vars.contains_key("depfile")
}

fn union_ordered(a: &PathSet, b: &PathSet) -> PathSet {
    let mut out = a.clone();
    out.extend(b.iter().cloned());
    out
}

/// Render the whole manifest for `ctx`. Called exactly once, from
/// [`Context::emit`], which has already frozen the context.
pub fn emit(ctx: &Context) -> Result<String> {
    let mut w = Writer::new();
    w.variable("builddir", ".hb");
    w.newline();

    let registry = ctx.registry();
    for rule in registry.iter() {
        if !rule.used.get() {
            continue;
        }

        let (rewritten_command, renamed_vars) =
            rewrite_command(&rule.command, &rule.name, &rule.default_vars);
        for (var, value) in &renamed_vars {
            w.variable(&format!("{}_{}", rule.name, var), value);
        }

        let pool_name = if rule.max_parallel > 0 {
            let pool = format!("{}_pool", rule.name);
            w.pool(&pool, rule.max_parallel);
            Some(pool)
        } else if !rule.pool.is_empty() {
            Some(rule.pool.clone())
        } else {
            None
        };

        if let Some(callback) = &rule.callback {
            let (extra_deps, extra_oodeps) = callback(ctx)?;
            rule.decl_deps.borrow_mut().extend(extra_deps);
            rule.decl_oodeps.borrow_mut().extend(extra_oodeps);
        }

        let depfile_line = wants_depfile(rule).then_some("$depfile");
        w.rule(&rule.name, &rewritten_command, depfile_line, pool_name.as_deref());
        w.newline();
    }

    let cwd = ctx.cwd().clone();
    let mut default_targets: Vec<String> = Vec::new();

    for edge in ctx.ledger().edges() {
        let rule = registry
            .get(&edge.rule)
            .expect("every edge references a rule registered in this context");

        let dst = ctx.relative(&cwd, &edge.dst);
        let src = ctx.relative(&cwd, &edge.src);
        let deps = ctx.relative(&cwd, &union_ordered(&edge.deps, &rule.decl_deps.borrow()));
        let oodeps = ctx.relative(&cwd, &union_ordered(&edge.oodeps, &rule.decl_oodeps.borrow()));

        let mut vars: Vec<(String, String)> = edge
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if wants_depfile(rule) {
            let depfile_path = format!(".hb/{}.d", mangle(&dst[0]));
            vars.push(("depfile".to_string(), depfile_path));
        }

        w.build(&dst, &rule.name, &src, &deps, &oodeps, &vars);

        if !dst[0].contains('/') {
            default_targets.push(dst[0].clone());
        }
    }

    if !default_targets.is_empty() {
        w.newline();
        w.default(&default_targets);
    }

    Ok(w.finish())
}
