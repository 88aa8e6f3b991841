//! CLI argument parsing for the harness.
//!
//! Flags only override the resolved [`crate::config::HarnessConfig`]; with no
//! flags and no config file a run behaves exactly like the fixed harness.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mockbot",
    version,
    about = "Run a robot control script against a simulated robot",
    after_help = "Examples:\n  mockbot run\n  mockbot run --target transbot.ctl --seed 7 --report run.json\n  mockbot payload --target transbot.ctl\n  mockbot config > mockbot.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Clean up, build the mock robot and hand control to the payload
    Run(RunArgs),
    /// Print the payload that would be spliced, without running it
    Payload(PayloadArgs),
    /// Print a config file holding every default
    Config,
}

/// Options shared by every command that loads a target program.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Control program to splice (default: transbot.ctl)
    #[arg(long, value_name = "PATH")]
    pub target: Option<PathBuf>,

    /// Config file (default: ./mockbot.json when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Seed for the simulated sensors
    #[arg(long)]
    pub seed: Option<u64>,

    /// Do not terminate a leftover reasoning-engine process first
    #[arg(long)]
    pub skip_cleanup: bool,

    /// Abort the payload after this many statements
    #[arg(long, value_name = "N")]
    pub max_steps: Option<u64>,

    /// Write a JSON run report here, also when the payload fails
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct PayloadArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}
