//! The evaluation engine: rule registry, build ledger, Ninja emitter,
//! and the `Context` facade that ties them to `hb-path`'s path subsystem
//! and `hb-discover`'s script scanner.
//!
//! `Context` walks a demand-driven graph of rules and build edges
//! declared by user scripts, scanning for more scripts as it goes, and
//! lowers the resulting graph to a Ninja manifest.

mod bindings;
mod context;
mod emitter;
mod ledger;
mod rule;

pub use context::Context;
pub use ledger::{mangle, BuildEdge, BuildLedger};
pub use rule::{is_standard_var, Rule, RuleCallback, RuleHandle, RuleOptions, RuleRegistry, STANDARD_VARS};

pub use hb_path::{BuildError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use indexmap::IndexMap;
    use tempfile::tempdir;

    fn marked_root() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".hbroot"), "").unwrap();
        dir
    }

    #[test]
    fn duplicate_rule_name_is_rejected() {
        let dir = marked_root();
        let ctx = Context::new(dir.path(), "hb.rhai").unwrap();
        ctx.rule("gcc", "gcc -c $in -o $out", RuleOptions::default()).unwrap();
        let err = ctx
            .rule("gcc", "gcc -c $in -o $out", RuleOptions::default())
            .unwrap_err();
        assert!(matches!(err, BuildError::NameAlreadyDefined { .. }));
    }

    #[test]
    fn build_requires_at_least_one_output() {
        let dir = marked_root();
        let ctx = Context::new(dir.path(), "hb.rhai").unwrap();
        let handle = ctx.rule("touch", "touch $out", RuleOptions::default()).unwrap();
        let empty: Vec<String> = vec![];
        let err = ctx
            .build(&handle, empty, "a.c", "", "", IndexMap::new())
            .unwrap_err();
        assert!(matches!(err, BuildError::EmptySetArgument { .. }));
    }

    #[test]
    fn build_marks_rule_used_and_populates_targets() {
        let dir = marked_root();
        let ctx = Context::new(dir.path(), "hb.rhai").unwrap();
        let handle = ctx.rule("cc", "cc -c $in -o $out", RuleOptions::default()).unwrap();
        ctx.build(&handle, "a.o", "a.c", Vec::<String>::new(), Vec::<String>::new(), IndexMap::new()).unwrap();

        assert_eq!(ctx.targets().len(), 1);
        assert!(ctx.registry().get(&handle).unwrap().used.get());
    }

    #[test]
    fn operations_after_emit_are_rejected() {
        let dir = marked_root();
        let ctx = Context::new(dir.path(), "hb.rhai").unwrap();
        let handle = ctx.rule("cc", "cc -c $in -o $out", RuleOptions::default()).unwrap();
        ctx.build(&handle, "a.o", "a.c", Vec::<String>::new(), Vec::<String>::new(), IndexMap::new()).unwrap();
        ctx.emit().unwrap();

        let err = ctx
            .rule("ld", "ld -o $out $in", RuleOptions::default())
            .unwrap_err();
        assert!(matches!(err, BuildError::EvaluationFrozen { .. }));

        let err = ctx
            .build(&handle, "b.o", "b.c", "", "", IndexMap::new())
            .unwrap_err();
        assert!(matches!(err, BuildError::EvaluationFrozen { .. }));
    }

    #[test]
    fn emit_renames_non_standard_variables_and_marks_default_targets() {
        let dir = marked_root();
        let ctx = Context::new(dir.path(), "hb.rhai").unwrap();
        let mut default_vars = IndexMap::new();
        default_vars.insert("opts".to_string(), "-O2".to_string());
        let opts = RuleOptions {
            default_vars,
            ..Default::default()
        };
        let handle = ctx
            .rule("gcc", "gcc -c ${opts} -o $out $in", opts)
            .unwrap();
        ctx.build(&handle, "a.o", "a.c", Vec::<String>::new(), Vec::<String>::new(), IndexMap::new()).unwrap();

        let manifest = ctx.emit().unwrap();
        assert!(manifest.contains("gcc_opts = -O2"));
        assert!(manifest.contains("rule gcc"));
        assert!(manifest.contains("command = gcc -c ${gcc_opts} -o $out $in"));
        assert!(manifest.contains("default a.o"));
    }

    #[test]
    fn unused_rule_produces_no_output() {
        let dir = marked_root();
        let ctx = Context::new(dir.path(), "hb.rhai").unwrap();
        ctx.rule("unused", "echo $out", RuleOptions::default()).unwrap();
        let manifest = ctx.emit().unwrap();
        assert!(!manifest.contains("rule unused"));
    }

    #[test]
    fn pool_is_emitted_when_max_parallel_is_set() {
        let dir = marked_root();
        let ctx = Context::new(dir.path(), "hb.rhai").unwrap();
        let opts = RuleOptions {
            max_parallel: 2,
            ..Default::default()
        };
        let handle = ctx.rule("hello", "echo $out", opts).unwrap();
        ctx.build(&handle, "hello.txt", Vec::<String>::new(), Vec::<String>::new(), Vec::<String>::new(), IndexMap::new()).unwrap();

        let manifest = ctx.emit().unwrap();
        assert!(manifest.contains("pool hello_pool"));
        assert!(manifest.contains("depth = 2"));
        assert!(manifest.contains("pool = hello_pool"));
    }

    #[test]
    fn build_triggers_script_discovery_and_mutates_context() {
        let dir = marked_root();
        let sub = dir.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(
            sub.join("hb.rhai"),
            r#"
            fn build(ctx) {
                let h = ctx.rule("touch", "touch $out", #{});
                ctx.build(h, "touched", "", [], [], #{});
            }
            "#,
        )
        .unwrap();
        fs::write(sub.join("input.c"), "").unwrap();

        let ctx = Context::new(dir.path(), "hb.rhai").unwrap();
        let handle = ctx.rule("noop", "true", RuleOptions::default()).unwrap();
        let input = sub.join("input.c").to_string_lossy().into_owned();
        ctx.build(&handle, "noop.out", input.as_str(), Vec::<String>::new(), Vec::<String>::new(), IndexMap::new())
            .unwrap();

        assert!(ctx.rule_names().contains(&"touch".to_string()));
        assert_eq!(ctx.targets().len(), 2);
    }
}
