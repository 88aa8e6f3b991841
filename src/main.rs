use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod cleanup;
mod cli;
mod config;
mod report;
mod script;
mod sim;
mod splice;

use cli::{Command, PayloadArgs, RootArgs, RunArgs, TargetArgs};
use config::HarnessConfig;
use script::Namespace;
use sim::MockEnvironment;
use splice::Splicer;

fn main() -> Result<()> {
    init_tracing();
    let args = RootArgs::parse();

    match args.command {
        Command::Run(args) => cmd_run(args),
        Command::Payload(args) => cmd_payload(args),
        Command::Config => {
            println!("{}", config::config_stub());
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &TargetArgs) -> Result<HarnessConfig> {
    let cwd = std::env::current_dir().context("resolve working directory")?;
    let mut config = config::resolve_config(args.config.as_deref(), &cwd)?;
    if let Some(target) = &args.target {
        config.target = target.clone();
    }
    Ok(config)
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let mut config = load_config(&args.target)?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.max_steps.is_some() {
        config.max_steps = args.max_steps;
    }
    config::validate_config(&config)?;

    if args.skip_cleanup {
        tracing::info!("process cleanup skipped");
    } else {
        clean_up_engine(&config)?;
    }

    let mut env = match config.seed {
        Some(seed) => MockEnvironment::with_seed(seed),
        None => MockEnvironment::new(fastrand::Rng::new()),
    };
    let splicer = Splicer::new(&config)?;
    let payload = splicer.load(&config.target)?;

    let mut ns = Namespace::default();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let outcome = splicer.execute(&payload, &mut env, &mut ns, &mut out);
    out.flush().context("flush payload output")?;

    if let Some(path) = &args.report {
        let report = report::RunReport::new(&config.target, &payload, &env, &ns, &outcome);
        match report::write_report(path, &report) {
            Ok(()) => tracing::info!(path = %path.display(), "run report written"),
            // the payload error is the one worth exiting with
            Err(err) if outcome.is_err() => {
                let detail = format!("{err:#}");
                tracing::error!(error = detail.as_str(), "run report not written");
            }
            Err(err) => return Err(err),
        }
    }
    outcome
}

/// Make sure no leftover reasoning engine competes with this run.
fn clean_up_engine(config: &HarnessConfig) -> Result<()> {
    let Some(name) = config.engine_process.as_deref() else {
        return Ok(());
    };
    let timeout = Duration::from_millis(config.cleanup_timeout_ms);
    let outcome = cleanup::terminate_named(name, timeout)
        .with_context(|| format!("clean up process {name}"))?;
    if !outcome.is_clean() {
        return Err(anyhow!(
            "process {name} still running after cleanup (pids {:?})",
            outcome.survivors
        ));
    }
    if !outcome.matched.is_empty() {
        tracing::info!(
            name,
            terminated = outcome.matched.len(),
            killed = outcome.killed.len(),
            "leftover process cleaned up"
        );
    }
    Ok(())
}

fn cmd_payload(args: PayloadArgs) -> Result<()> {
    let config = load_config(&args.target)?;
    config::validate_config(&config)?;
    let splicer = Splicer::new(&config)?;
    let payload = splicer.load(&config.target)?;
    print_payload(&config.target, &payload)
}

fn print_payload(target: &Path, payload: &splice::Payload) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match payload.cut_index {
        Some(idx) => eprintln!(
            "{}: payload starts at line {} (last import on line {})",
            target.display(),
            payload.first_line,
            idx + 1
        ),
        None => eprintln!("{}: no import marker; whole file is payload", target.display()),
    }
    out.write_all(payload.text.as_bytes())
        .context("write payload")?;
    out.flush().context("flush payload")?;
    Ok(())
}
