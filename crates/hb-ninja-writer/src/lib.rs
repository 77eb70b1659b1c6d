//! A minimal Ninja manifest writer.
//!
//! Owns no knowledge of rules, build edges, or dependency graphs — only
//! the textual shape of `variable`/`pool`/`rule`/`build`/`default`
//! statements and the escaping Ninja's own grammar requires. All policy
//! (which variables get renamed, which edges use which pool,
//! default-target detection) lives in the emitter, one layer up, in
//! `hb-build`.

use std::fmt::Write as _;

/// Escape a path token for use inside a `build` statement: Ninja treats
/// unescaped `$`, `:` and spaces specially there.
pub fn escape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for ch in path.chars() {
        match ch {
            '$' => out.push_str("$$"),
            ':' => out.push_str("$:"),
            ' ' => out.push_str("$ "),
            other => out.push(other),
        }
    }
    out
}

fn join_escaped(paths: &[String]) -> String {
    paths
        .iter()
        .map(|p| escape_path(p))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Accumulates a Ninja manifest as text. Every method appends to an
/// internal buffer; call [`Writer::into_string`] (or [`Writer::finish`])
/// to get the result out.
#[derive(Default)]
pub struct Writer {
    buf: String,
}

impl Writer {
    pub fn new() -> Self {
        Writer { buf: String::new() }
    }

    pub fn newline(&mut self) {
        self.buf.push('\n');
    }

    /// `name = value`
    pub fn variable(&mut self, name: &str, value: &str) {
        let _ = writeln!(self.buf, "{name} = {value}");
    }

    /// `name = value`, indented two spaces (used inside a `rule` block).
    pub fn indented_variable(&mut self, name: &str, value: &str) {
        let _ = writeln!(self.buf, "  {name} = {value}");
    }

    /// ```text
    /// pool name
    ///   depth = depth
    /// ```
    pub fn pool(&mut self, name: &str, depth: u32) {
        let _ = writeln!(self.buf, "pool {name}");
        let _ = writeln!(self.buf, "  depth = {depth}");
    }

    /// ```text
    /// rule name
    ///   command = command
    ///   depfile = depfile   (optional)
    ///   pool = pool         (optional)
    /// ```
    pub fn rule(&mut self, name: &str, command: &str, depfile: Option<&str>, pool: Option<&str>) {
        let _ = writeln!(self.buf, "rule {name}");
        self.indented_variable("command", command);
        if let Some(depfile) = depfile {
            self.indented_variable("depfile", depfile);
        }
        if let Some(pool) = pool {
            self.indented_variable("pool", pool);
        }
    }

    /// ```text
    /// build out1 out2: rule in1 in2 | implicit1 || orderonly1
    ///   var = value
    /// ```
    pub fn build(
        &mut self,
        outputs: &[String],
        rule: &str,
        inputs: &[String],
        implicit_deps: &[String],
        order_only: &[String],
        vars: &[(String, String)],
    ) {
        let _ = write!(
            self.buf,
            "build {}: {} {}",
            join_escaped(outputs),
            rule,
            join_escaped(inputs)
        );
        if !implicit_deps.is_empty() {
            let _ = write!(self.buf, " | {}", join_escaped(implicit_deps));
        }
        if !order_only.is_empty() {
            let _ = write!(self.buf, " || {}", join_escaped(order_only));
        }
        self.buf.push('\n');
        for (name, value) in vars {
            self.indented_variable(name, value);
        }
    }

    /// `default target1 target2`
    pub fn default(&mut self, targets: &[String]) {
        let _ = writeln!(self.buf, "default {}", join_escaped(targets));
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_dollar_colon_and_space() {
        assert_eq!(escape_path("a b"), "a$ b");
        assert_eq!(escape_path("a:b"), "a$:b");
        assert_eq!(escape_path("a$b"), "a$$b");
    }

    #[test]
    fn rule_with_depfile_and_pool() {
        let mut w = Writer::new();
        w.rule("gcc", "gcc -c $in -o $out", Some(".hb/x.d"), Some("gcc_pool"));
        assert_eq!(
            w.finish(),
            "rule gcc\n  command = gcc -c $in -o $out\n  depfile = .hb/x.d\n  pool = gcc_pool\n"
        );
    }

    #[test]
    fn build_statement_includes_implicit_and_order_only() {
        let mut w = Writer::new();
        w.build(
            &["out/a.o".to_string()],
            "gcc",
            &["a.c".to_string()],
            &["a.h".to_string()],
            &["gen".to_string()],
            &[],
        );
        assert_eq!(w.finish(), "build out/a.o: gcc a.c | a.h || gen\n");
    }

    #[test]
    fn default_target_line() {
        let mut w = Writer::new();
        w.default(&["a.o".to_string(), "b.o".to_string()]);
        assert_eq!(w.finish(), "default a.o b.o\n");
    }
}
