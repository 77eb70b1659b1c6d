use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context as _, Result};
use clap::Parser;

use hb_build::Context;

#[derive(Parser)]
#[command(
    author,
    about = "hb: discovers hb.rhai build scripts and emits a Ninja manifest"
)]
pub struct Cli {
    /// Change to DIR before doing anything else
    #[arg(short = 'C')]
    pub dir: Option<PathBuf>,

    /// Name of the entry script to look for [default=hb.rhai]
    #[arg(short = 'f', long = "file", default_value = "hb.rhai")]
    pub script_filename: String,

    /// Write the manifest to FILE instead of build.ninja
    #[arg(short = 'o', long = "output", default_value = "build.ninja")]
    pub output: PathBuf,

    /// Run a subtool (use '-t list' to list subtools)
    #[arg(short = 't')]
    pub tool: Option<String>,

    /// Show debug-level logging
    #[arg(short = 'v', long = "verbose", default_value = "false")]
    pub verbose: bool,

    /// Targets named here are only used to report which edges would
    /// produce them; running the build itself is out of scope (hb only
    /// emits a manifest, it never invokes ninja).
    #[arg(trailing_var_arg = true)]
    pub targets: Vec<String>,
}

pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(dir) = &cli.dir {
        std::env::set_current_dir(dir).with_context(|| format!("chdir to {}", dir.display()))?;
    }

    if let Some(tool) = cli.tool.clone() {
        return subtool(&cli, &tool);
    }

    let ctx = evaluate(&cli)?;
    let manifest = ctx.emit()?;
    fs::write(&cli.output, manifest)
        .with_context(|| format!("writing manifest to {}", cli.output.display()))?;

    println!(
        "hb: wrote {} ({} targets)",
        cli.output.display(),
        ctx.targets().len()
    );
    Ok(0)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Construct a [`Context`] rooted at the current directory, load the
/// entry script, and return the evaluated context ready for `emit`.
fn evaluate(cli: &Cli) -> Result<Context> {
    let cwd = std::env::current_dir()?;
    let ctx = Context::new(&cwd, cli.script_filename.clone())?;

    let entry = cwd.join(&cli.script_filename);
    if !entry.exists() {
        return Err(anyhow!(
            "no entry script {:?} found in {}",
            cli.script_filename,
            cwd.display()
        ));
    }
    ctx.run_entry_script(&entry)?;
    Ok(ctx)
}

fn subtool(cli: &Cli, tool: &str) -> Result<i32> {
    match tool {
        "list" => {
            println!("hb subtools:");
            println!("  list      show this list");
            println!("  targets   evaluate the project and list every declared target");
            println!("  rules     evaluate the project and list every declared rule name");
        }
        "targets" => {
            let ctx = evaluate(cli)?;
            let mut targets: Vec<String> = ctx.targets().iter().map(|p| p.to_string()).collect();
            targets.sort();
            for target in targets {
                println!("{target}");
            }
        }
        "rules" => {
            let ctx = evaluate(cli)?;
            for name in ctx.rule_names() {
                println!("{name}");
            }
        }
        other => {
            println!("hb: unknown subtool {other:?}. Use '-t list' to see available subtools.");
            return Ok(1);
        }
    }
    Ok(0)
}
