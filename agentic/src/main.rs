//! Resumable LLM workflow harness.
//!
//! Each phase command resolves a run (by id, from a record piped on stdin, or
//! fresh from a plan file), executes one phase, saves, and prints the updated
//! record so invocations can be chained in a shell pipeline.

use std::path::{Path, PathBuf};

use agentic::core::phase::Phase;
use agentic::core::run::Run;
use agentic::error::{MissingInputs, UsageError};
use agentic::exit_codes;
use agentic::io::config::{DEFAULT_CONFIG_PATH, HarnessConfig, load_config, write_config};
use agentic::io::prompt::PromptEngine;
use agentic::io::provider::CommandProvider;
use agentic::io::shipper::CommandShipper;
use agentic::io::store;
use agentic::io::tester::CommandTestRunner;
use agentic::logging;
use agentic::phases::{PhaseContext, run_phase};
use agentic::resolve::{StderrReporter, StdinSource, resolve_state};
use agentic::workflow::{WorkflowStop, run_workflow};
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "agentic",
    version,
    about = "Resumable classify → plan → generate → test → ship harness"
)]
struct Cli {
    /// Harness config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Run store directory (overrides `store_dir` from the config).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Existing run to resume. Without it, a record on stdin or `--plan-file` is used.
    run_id: Option<String>,

    /// Start a fresh run from a written specification.
    #[arg(long)]
    plan_file: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default `agentic.toml`.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Create and save a fresh run.
    New {
        prompt: String,
        #[arg(long)]
        plan_file: Option<String>,
    },
    /// Decide whether the request is a feature, bug or chore.
    Classify(RunArgs),
    /// Produce an implementation plan.
    Plan(RunArgs),
    /// Generate code from the plan.
    Generate(RunArgs),
    /// Execute the generated code.
    Test(RunArgs),
    /// Write a commit message and publish.
    Ship(RunArgs),
    /// Run every remaining phase through `ship`.
    Run {
        #[command(flatten)]
        args: RunArgs,
        /// Phase to start at instead of the one after the last completed phase.
        #[arg(long)]
        from: Option<Phase>,
    },
    /// Print a saved run.
    Show { run_id: String },
    /// List saved run ids.
    List,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => exit_code_for(&err),
    };
    std::process::exit(code);
}

/// Usage errors were already reported by the resolver.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<UsageError>().is_some() {
        return exit_codes::INVALID;
    }
    eprintln!("error: {err:#}");
    if err.downcast_ref::<MissingInputs>().is_some() {
        exit_codes::INVALID
    } else {
        exit_codes::FAILED
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let settings = || -> Result<(HarnessConfig, PathBuf)> {
        let cfg = load_config(&cli.config)?;
        let store_dir = cli.store.clone().unwrap_or_else(|| cfg.store_dir.clone());
        Ok((cfg, store_dir))
    };
    let single = |phase: Phase, args: &RunArgs| -> Result<()> {
        let (cfg, store_dir) = settings()?;
        cmd_phase(phase, args, &cfg, &store_dir)
    };

    match &cli.command {
        Command::Init { force } => cmd_init(&cli.config, *force)?,
        Command::New { prompt, plan_file } => {
            let (_, store_dir) = settings()?;
            let mut run = store::create(prompt, plan_file.as_deref());
            store::save(&mut run, &store_dir, None)?;
            print_run(&run)?;
        }
        Command::Classify(args) => single(Phase::Classify, args)?,
        Command::Plan(args) => single(Phase::Plan, args)?,
        Command::Generate(args) => single(Phase::Generate, args)?,
        Command::Test(args) => single(Phase::Test, args)?,
        Command::Ship(args) => single(Phase::Ship, args)?,
        Command::Run { args, from } => {
            let (cfg, store_dir) = settings()?;
            return cmd_run(args, *from, &cfg, &store_dir);
        }
        Command::Show { run_id } => {
            let (_, store_dir) = settings()?;
            let run = resolve(
                Some(run_id.as_str()),
                &store_dir,
                None,
                "usage: agentic show <RUN_ID>",
            )?;
            print_run(&run)?;
        }
        Command::List => {
            let (_, store_dir) = settings()?;
            for run_id in store::list_runs(&store_dir)? {
                println!("{run_id}");
            }
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    write_config(config_path, &HarnessConfig::default())
        .with_context(|| format!("write {}", config_path.display()))?;
    println!("{}", config_path.display());
    Ok(())
}

fn cmd_phase(phase: Phase, args: &RunArgs, cfg: &HarnessConfig, store_dir: &Path) -> Result<()> {
    let hint = format!("usage: agentic {phase} [RUN_ID] [--plan-file PATH]");
    let mut run = resolve(
        args.run_id.as_deref(),
        store_dir,
        args.plan_file.as_deref(),
        &hint,
    )?;
    with_context(cfg, store_dir, |ctx| run_phase(phase, &mut run, ctx))?;
    print_run(&run)
}

fn cmd_run(
    args: &RunArgs,
    from: Option<Phase>,
    cfg: &HarnessConfig,
    store_dir: &Path,
) -> Result<i32> {
    let hint = "usage: agentic run [RUN_ID] [--plan-file PATH] [--from PHASE]";
    let mut run = resolve(
        args.run_id.as_deref(),
        store_dir,
        args.plan_file.as_deref(),
        hint,
    )?;
    let outcome = with_context(cfg, store_dir, |ctx| {
        run_workflow(&mut run, ctx, from, |phase, run| {
            eprintln!("{phase}: done ({})", run.run_id());
        })
    })?;
    print_run(&run)?;
    match outcome.stop {
        WorkflowStop::Shipped => Ok(exit_codes::OK),
        WorkflowStop::TestsFailed => {
            eprintln!(
                "error: tests did not pass for run {}; fix and rerun from generate",
                outcome.run_id
            );
            Ok(exit_codes::FAILED)
        }
    }
}

fn resolve(
    run_id: Option<&str>,
    store_dir: &Path,
    plan_file: Option<&str>,
    hint: &str,
) -> Result<Run> {
    resolve_state(
        run_id,
        store_dir,
        &StderrReporter,
        &mut StdinSource,
        plan_file,
        Some(hint),
    )
}

fn with_context<T>(
    cfg: &HarnessConfig,
    store_dir: &Path,
    f: impl FnOnce(&PhaseContext<'_>) -> Result<T>,
) -> Result<T> {
    let provider = CommandProvider::new(&cfg.llm);
    let tester = CommandTestRunner::new(&cfg.test);
    let shipper = CommandShipper::new(&cfg.ship);
    let prompts = PromptEngine::new()?;
    let ctx = PhaseContext {
        store_dir,
        provider: &provider,
        tester: &tester,
        shipper: &shipper,
        prompts: &prompts,
        script_name: &cfg.test.file_name,
    };
    f(&ctx)
}

fn print_run(run: &Run) -> Result<()> {
    let json = serde_json::to_string_pretty(run).context("serialize run")?;
    println!("{json}");
    Ok(())
}
