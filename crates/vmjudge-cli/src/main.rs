use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "vmjudge",
    about = "vmjudge — interactive judge for VM placement solvers",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Judge a contestant against one problem file.
    ///
    /// The contestant command follows `--` and is spawned with piped
    /// stdin/stdout; its stderr passes through unchanged.
    Run {
        /// Problem description file
        problem: PathBuf,
        /// Baseline score file (`placements soft_constraints`)
        baseline: Option<PathBuf>,
        /// Path to vmjudge.toml
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Per-response timeout, overriding the config file (e.g. 15s, 500ms)
        #[arg(short, long)]
        timeout: Option<String>,
        /// Print the report as JSON instead of summary lines
        #[arg(long)]
        json: bool,
        /// Contestant program and its arguments
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
    /// Write a vmjudge.toml spelling out every default
    Init {
        #[arg(short, long, default_value = ".")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            problem,
            baseline,
            config,
            timeout,
            json,
            command,
        } => {
            let config = commands::run::load_config(config.as_deref())?;
            init_tracing(config.log_filter())?;
            let args = commands::run::RunArgs {
                problem,
                baseline,
                timeout,
                json,
                command,
            };
            commands::run::run(args, &config).await
        }
        Commands::Init { path } => {
            init_tracing(vmjudge_core::config::DEFAULT_LOG_FILTER)?;
            commands::init::init(&path)
        }
    }
}

/// Log to stderr; stdout carries the run summary.
fn init_tracing(fallback: &str) -> anyhow::Result<()> {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => tracing_subscriber::EnvFilter::try_new(fallback)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
