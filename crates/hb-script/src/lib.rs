//! The embedding-language boundary.
//!
//! Build scripts (`hb.rhai` by default) are Rhai scripts, compiled in
//! isolation and, if they define a top-level `build` function taking one
//! argument, invoked with a host-supplied context value after loading.
//!
//! Rhai is picked over a general-purpose embedded interpreter because it
//! is sandboxed by default (no filesystem or process access unless a
//! host explicitly registers it) and its `Engine`/`AST`/`Scope` split
//! maps directly onto "compile once, run entry function once."

use std::fs;
use std::path::{Path, PathBuf};

use hb_path::BuildError;
use rhai::{Dynamic, Engine, Scope, AST};
use tracing::{trace, warn};

/// The name of the function a script must define to be run after
/// loading. Scripts without one are loaded for their side effects on
/// rule/build registration alone.
pub const ENTRY_FN: &str = "build";

/// Construct a `rhai::Engine` with hb's default limits. Callers (the
/// `hb-build` crate) register `Context` and its methods on top of this.
pub fn new_engine() -> Engine {
    let mut engine = Engine::new();
    // Scripts can recurse while declaring rules/builds (a script's
    // `build` function may itself trigger further discovery); bound it
    // generously rather than leaving it unlimited.
    engine.set_max_expr_depths(64, 64);
    engine.set_max_call_levels(256);
    engine
}

/// Compile `path` to an AST without running anything in it. Loading
/// never executes top-level statements from a prior script's scope or
/// leaks state between scripts; each script is compiled fresh.
pub fn load(engine: &Engine, path: &Path) -> Result<AST, BuildError> {
    let source = fs::read_to_string(path).map_err(|source| BuildError::MissingScript {
        path: path.to_path_buf(),
        source,
    })?;
    trace!(path = %path.display(), "compiling script");
    engine
        .compile(&source)
        .map_err(|cause| BuildError::ScriptExecutionError {
            path: path.to_path_buf(),
            cause: cause.to_string(),
        })
}

/// Returns whether `ast` defines a top-level function named [`ENTRY_FN`]
/// taking exactly one parameter — the function scripts use to receive
/// the context.
pub fn has_entry_fn(ast: &AST) -> bool {
    ast.iter_functions()
        .any(|f| f.name == ENTRY_FN && f.params.len() == 1)
}

/// Run the script's entry function (if it has one) with `context` as its
/// sole argument. A script that never defines an entry point is not an
/// error; it is simply loaded for whatever top-level side effects it had
/// and nothing further happens.
pub fn run_entry(
    engine: &Engine,
    ast: &AST,
    path: &Path,
    context: Dynamic,
) -> Result<(), BuildError> {
    if !has_entry_fn(ast) {
        warn!(path = %path.display(), "script defines no `build` entry function");
        return Ok(());
    }
    let mut scope = Scope::new();
    engine
        .call_fn::<()>(&mut scope, ast, ENTRY_FN, (context,))
        .map_err(|cause| BuildError::ScriptExecutionError {
            path: path.to_path_buf(),
            cause: cause.to_string(),
        })
}

/// Compile and run a script's entry function in one step.
pub fn load_and_run(
    engine: &Engine,
    path: &PathBuf,
    context: Dynamic,
) -> Result<(), BuildError> {
    let ast = load(engine, path)?;
    run_entry(engine, &ast, path, context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_entry_function_is_not_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hb.rhai");
        fs::write(&path, "let x = 1;").unwrap();

        let engine = new_engine();
        let ast = load(&engine, &path).unwrap();
        assert!(!has_entry_fn(&ast));
        assert!(run_entry(&engine, &ast, &path, Dynamic::UNIT).is_ok());
    }

    #[test]
    fn entry_function_is_detected_and_invoked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hb.rhai");
        fs::write(&path, "fn build(ctx) { }").unwrap();

        let engine = new_engine();
        let ast = load(&engine, &path).unwrap();
        assert!(has_entry_fn(&ast));
        assert!(run_entry(&engine, &ast, &path, Dynamic::UNIT).is_ok());
    }

    #[test]
    fn syntax_error_is_reported_as_script_execution_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hb.rhai");
        fs::write(&path, "fn build(ctx) {").unwrap();

        let engine = new_engine();
        let err = load(&engine, &path).unwrap_err();
        assert!(matches!(err, BuildError::ScriptExecutionError { .. }));
    }

    #[test]
    fn missing_file_is_reported_as_missing_script() {
        let engine = new_engine();
        let err = load(&engine, Path::new("/does/not/exist.rhai")).unwrap_err();
        assert!(matches!(err, BuildError::MissingScript { .. }));
    }
}
