//! End-to-end test of the `hb` binary: writes a tiny project tree, runs
//! the compiled binary against it, and asserts on the resulting
//! `build.ninja` file.

use std::fs;
use std::process::Command;

use tempfile::tempdir;

fn hb_bin() -> &'static str {
    env!("CARGO_BIN_EXE_hb")
}

#[test]
fn writes_a_manifest_for_a_single_rule_project() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".hbroot"), "").unwrap();
    fs::write(
        dir.path().join("hb.rhai"),
        r#"
        fn build(ctx) {
            let cc = ctx.rule("cc", "cc -c $in -o $out", #{});
            ctx.build(cc, "a.o", "a.c", [], [], #{});
        }
        "#,
    )
    .unwrap();
    fs::write(dir.path().join("a.c"), "").unwrap();

    let status = Command::new(hb_bin())
        .arg("-C")
        .arg(dir.path())
        .status()
        .unwrap();
    assert!(status.success());

    let manifest = fs::read_to_string(dir.path().join("build.ninja")).unwrap();
    assert!(manifest.contains("builddir = .hb"));
    assert!(manifest.contains("rule cc"));
    assert!(manifest.contains("build a.o: cc a.c"));
    assert!(manifest.contains("default a.o"));
}

#[test]
fn targets_subtool_lists_declared_outputs() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".hbroot"), "").unwrap();
    fs::write(
        dir.path().join("hb.rhai"),
        r#"
        fn build(ctx) {
            let touch = ctx.rule("touch", "touch $out", #{});
            ctx.build(touch, "one", "", [], [], #{});
            ctx.build(touch, "two", "", [], [], #{});
        }
        "#,
    )
    .unwrap();

    let output = Command::new(hb_bin())
        .arg("-C")
        .arg(dir.path())
        .arg("-t")
        .arg("targets")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("one"));
    assert!(stdout.contains("two"));
}

#[test]
fn missing_entry_script_is_a_clean_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".hbroot"), "").unwrap();

    let status = Command::new(hb_bin())
        .arg("-C")
        .arg(dir.path())
        .status()
        .unwrap();
    assert!(!status.success());
}
