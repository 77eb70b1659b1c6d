//! Registers [`Context`] and [`RuleHandle`] as native Rhai types so that
//! build scripts can call `ctx.rule(...)`, `ctx.build(...)`,
//! `ctx.pathset(...)` and friends directly.
//!
//! Every path-accepting argument is registered as `Dynamic` rather than a
//! fixed Rhai `Array`, and coerced through [`dynamic_to_path_input`] into
//! an `hb_path::PathInput`: a bare string, an array, or a pathset value
//! are all accepted, and arrays nest recursively. Rhai's static overload
//! resolution has no notion of "accepts a string or an iterable of the
//! same," so the coercion is done by hand here instead.
//!
//! Rule callbacks (`Rule::callback`, invoked at emission time) are a
//! Rust-only extension point: Rhai has no ergonomic way to hand a
//! script-defined closure back across this boundary with the right
//! `Fn(&Context) -> Result<...>` shape, so scripts get pool/depfile/
//! default-variable declarations but not callback registration.

use indexmap::IndexMap;
use rhai::{Array, Dynamic, Engine, EvalAltResult, Map};

use hb_path::{BuildError, PathInput, PathSet};

use crate::rule::{RuleHandle, RuleOptions};
use crate::Context;

fn to_rhai_err(err: BuildError) -> Box<EvalAltResult> {
    err.to_string().into()
}

/// Coerce a script-supplied value into a [`PathInput`]: a string is a
/// single path, an array is coerced recursively (element by element), and
/// anything else (notably `()` for "no paths") becomes an empty input.
fn dynamic_to_path_input(value: Dynamic) -> PathInput {
    if let Some(s) = value.clone().try_cast::<String>() {
        return PathInput::Str(s);
    }
    if let Some(arr) = value.clone().try_cast::<Array>() {
        return PathInput::Iter(arr.into_iter().map(dynamic_to_path_input).collect());
    }
    if value.is_unit() {
        return PathInput::Iter(Vec::new());
    }
    PathInput::Str(value.to_string())
}

fn dynamic_to_pathset(ctx: &Context, value: Dynamic) -> Result<PathSet, Box<EvalAltResult>> {
    ctx.pathset(dynamic_to_path_input(value)).map_err(to_rhai_err)
}

fn pathset_to_array(set: &PathSet) -> Array {
    set.iter().map(|p| Dynamic::from(p.as_str().to_string())).collect()
}

fn map_to_vars(map: Map) -> IndexMap<String, String> {
    map.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

/// Build a `rhai::Engine` with [`Context`] and [`RuleHandle`] registered.
/// Every `hb-build::Context` owns one of these (see `Context::new`).
pub fn new_engine() -> Engine {
    let mut engine = hb_script::new_engine();
    engine.register_type_with_name::<Context>("Context");
    engine.register_type_with_name::<RuleHandle>("RuleHandle");

    engine.register_get("root", |ctx: &mut Context| ctx.root().as_str().to_string());
    engine.register_get("cwd", |ctx: &mut Context| ctx.cwd().as_str().to_string());
    engine.register_get("anchor", |ctx: &mut Context| ctx.anchor());
    engine.register_set("anchor", |ctx: &mut Context, value: String| {
        ctx.paths().set_anchor(value);
    });
    engine.register_get("hits", |ctx: &mut Context| ctx.hits() as i64);
    engine.register_get("misses", |ctx: &mut Context| ctx.misses() as i64);

    engine.register_fn("canonical", |ctx: &mut Context, path: &str| {
        ctx.canonical(path).into_string()
    });

    engine.register_fn("pathset", |ctx: &mut Context, items: Dynamic| {
        dynamic_to_pathset(ctx, items).map(|set| pathset_to_array(&set))
    });

    engine.register_fn("isdir", |ctx: &mut Context, path: &str| {
        ctx.isdir(&ctx.canonical(path))
    });

    engine.register_fn("exists", |ctx: &mut Context, path: &str| {
        ctx.exists(&ctx.canonical(path))
    });

    engine.register_fn("directories", |ctx: &mut Context, items: Dynamic| {
        dynamic_to_pathset(ctx, items).map(|set| pathset_to_array(&ctx.directories(&set)))
    });

    engine.register_fn("files", |ctx: &mut Context, items: Dynamic| {
        dynamic_to_pathset(ctx, items).map(|set| pathset_to_array(&ctx.files(&set)))
    });

    engine.register_fn("newest", |ctx: &mut Context, items: Dynamic| {
        dynamic_to_pathset(ctx, items)
            .and_then(|set| ctx.newest(&set).map(|p| p.as_str().to_string()).map_err(to_rhai_err))
    });

    engine.register_fn("oldest", |ctx: &mut Context, items: Dynamic| {
        dynamic_to_pathset(ctx, items)
            .and_then(|set| ctx.oldest(&set).map(|p| p.as_str().to_string()).map_err(to_rhai_err))
    });

    engine.register_fn("filter", |ctx: &mut Context, items: Dynamic, pattern: &str| {
        dynamic_to_pathset(ctx, items)
            .and_then(|set| ctx.filter_one(&set, pattern).map_err(to_rhai_err))
            .map(|set| pathset_to_array(&set))
    });

    engine.register_fn("relative", |ctx: &mut Context, from: &str, items: Dynamic| {
        let from = ctx.canonical(from);
        dynamic_to_pathset(ctx, items).map(|set| {
            ctx.relative(&from, &set)
                .into_iter()
                .map(Dynamic::from)
                .collect::<Array>()
        })
    });

    engine.register_fn("rule", |ctx: &mut Context, name: &str, command: &str, opts: Map| {
        let mut options = RuleOptions::default();
        if let Some(v) = opts.get("doc") {
            options.doc = v.to_string();
        }
        if let Some(v) = opts.get("pool") {
            options.pool = v.to_string();
        }
        if let Some(v) = opts.get("max_parallel") {
            options.max_parallel = v.as_int().unwrap_or(0).max(0) as u32;
        }
        if let Some(v) = opts.get("decl_deps") {
            options.decl_deps = dynamic_to_pathset(ctx, v.clone())?;
        }
        if let Some(v) = opts.get("decl_oodeps") {
            options.decl_oodeps = dynamic_to_pathset(ctx, v.clone())?;
        }
        if let Some(v) = opts.get("vars") {
            let map = v.clone().try_cast::<Map>().unwrap_or_default();
            options.default_vars = map_to_vars(map);
        }
        ctx.rule(name, command, options).map_err(to_rhai_err)
    });

    engine.register_fn(
        "build",
        |ctx: &mut Context,
         handle: RuleHandle,
         dst: Dynamic,
         src: Dynamic,
         deps: Dynamic,
         oodeps: Dynamic,
         vars: Map| {
            let dst = dynamic_to_path_input(dst);
            let src = dynamic_to_path_input(src);
            let deps = dynamic_to_path_input(deps);
            let oodeps = dynamic_to_path_input(oodeps);
            ctx.build(&handle, dst, src, deps, oodeps, map_to_vars(vars))
                .map_err(to_rhai_err)
        },
    );

    engine.register_fn("targets", |ctx: &mut Context| pathset_to_array(&ctx.targets()));
    engine.register_fn("rule_names", |ctx: &mut Context| {
        ctx.rule_names().into_iter().map(Dynamic::from).collect::<Array>()
    });
    engine.register_fn("emit", |ctx: &mut Context| ctx.emit().map_err(to_rhai_err));

    engine
}
