use std::path::{Path, PathBuf};

use vmjudge_core::JudgeConfig;
use vmjudge_core::config::parse_duration;
use vmjudge_session::{JudgeOptions, RunReport, run_judge};

pub struct RunArgs {
    pub problem: PathBuf,
    pub baseline: Option<PathBuf>,
    pub timeout: Option<String>,
    pub json: bool,
    pub command: Vec<String>,
}

/// Load `--config`, or the built-in defaults when none is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<JudgeConfig> {
    match path {
        Some(path) => JudgeConfig::from_file(path)
            .map_err(|e| anyhow::anyhow!("failed to load {}: {e}", path.display())),
        None => Ok(JudgeConfig::default()),
    }
}

pub fn options(args: &RunArgs, config: &JudgeConfig) -> anyhow::Result<JudgeOptions> {
    let mut options = JudgeOptions::new(&args.problem, args.command.clone()).with_config(config)?;
    if let Some(baseline) = &args.baseline {
        options = options.with_baseline(baseline);
    }
    if let Some(timeout) = &args.timeout {
        options.response_timeout = parse_duration(timeout)
            .ok_or_else(|| anyhow::anyhow!("invalid --timeout: {timeout:?}"))?;
    }
    Ok(options)
}

pub async fn run(args: RunArgs, config: &JudgeConfig) -> anyhow::Result<()> {
    let options = options(&args, config)?;

    match run_judge(&options).await {
        Ok(report) => print_report(&report, args.json),
        Err(failure) => {
            if let Some(report) = &failure.report {
                print_report(report, args.json)?;
            }
            Err(failure.into())
        }
    }
}

fn print_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}
