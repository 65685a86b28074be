//! Command line front end for the jobpilot engine.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::Colorize;
use jobpilot::{
    AutomationError, Config, ContinuationGate, Orchestrator, RunResult, Session, TriggerStatus,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jobpilot", about = "Trigger jobs on a web management console")]
struct Cli {
    /// Job name to trigger (repeat for several jobs)
    #[arg(long = "job", value_name = "NAME")]
    jobs: Vec<String>,

    /// List the jobs visible on the console and exit
    #[arg(long, conflicts_with_all = ["jobs", "all"])]
    list_jobs: bool,

    /// Trigger every job found on the console
    #[arg(long, conflicts_with = "jobs")]
    all: bool,

    /// Path to the JSON configuration file
    #[arg(long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,

    /// Run the browser without a visible window
    #[arg(long)]
    headless: bool,
}

/// Hands the open browser to whoever is at the terminal. The engine resumes
/// once they confirm with Enter.
struct ConsoleGate;

#[async_trait::async_trait]
impl ContinuationGate for ConsoleGate {
    async fn wait_for_operator(&self) -> Result<(), AutomationError> {
        println!(
            "\n{}",
            "Automated login was not possible. Complete the login in the browser window, then press Enter to continue."
                .yellow()
        );
        tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| ())
        })
        .await
        .map_err(|e| AutomationError::Internal(format!("operator prompt task failed: {e}")))?
        .map_err(|e| AutomationError::Internal(format!("could not read operator input: {e}")))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    if !cli.list_jobs && !cli.all && cli.jobs.is_empty() {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    let mut config = Config::load(Some(&cli.config)).context("resolving configuration")?;
    if cli.headless {
        config.headless = true;
    }

    if !config.known_jobs.is_empty() {
        for name in &cli.jobs {
            if !config.known_jobs.contains(name) {
                warn!("job {name:?} is not in the configured known_jobs list");
            }
        }
    }

    let session = Session::launch(config).await.context("launching browser")?;
    let orchestrator = Orchestrator::new(session).with_continuation(Arc::new(ConsoleGate));

    if cli.list_jobs {
        let names = orchestrator.list_jobs().await.context("listing jobs")?;
        print_listing(&names);
        return Ok(());
    }

    let result = if cli.all {
        orchestrator.run_all().await.context("running all jobs")?
    } else {
        orchestrator.run(&cli.jobs).await.context("running jobs")?
    };

    print_result(&result);
    if !result.all_triggered() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_listing(names: &[String]) {
    if names.is_empty() {
        println!("{}", "No jobs found on the console.".yellow());
        return;
    }
    println!("\n{}", "Available jobs:".bold());
    for (i, name) in names.iter().enumerate() {
        let shown = if name.is_empty() { "(unnamed)" } else { name };
        println!("  {:>3}. {shown}", i + 1);
    }
    println!("\n{} job(s) total", names.len());
}

fn print_result(result: &RunResult) {
    println!("\n{}", "Job execution results".bold());
    println!("{}", "-".repeat(50));
    for outcome in result.iter() {
        let status = match outcome.status {
            TriggerStatus::Triggered => "triggered".green(),
            TriggerStatus::NotFound => "not found".red(),
            TriggerStatus::TriggerFailed => "trigger failed".red(),
        };
        let shown = if outcome.name.is_empty() {
            "(unnamed)"
        } else {
            outcome.name.as_str()
        };
        match &outcome.diagnostic {
            Some(artifact) => println!("  {shown}: {status} (diagnostic: {artifact})"),
            None => println!("  {shown}: {status}"),
        }
    }
    let triggered = result
        .iter()
        .filter(|o| o.status == TriggerStatus::Triggered)
        .count();
    println!("{}", "-".repeat(50));
    println!("{triggered}/{} triggered", result.len());
}
