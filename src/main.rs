//! platform-doctor command line entry point.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use platform_doctor::advisor::Advisor;
use platform_doctor::catalog::{Catalog, ConfigError};
use platform_doctor::checks::{check_dependencies, validate_environment, ProcessEnv};
use platform_doctor::config::DoctorConfig;
use platform_doctor::diagnosis::{run_diagnosis, HealthLevel};
use platform_doctor::probe::Prober;
use platform_doctor::report;
use platform_doctor::suite::{run_full, run_suites};

#[derive(Parser, Debug)]
#[command(name = "platform-doctor", version, about = "Diagnose a running property platform service")]
struct Cli {
    /// Base URL of the target service
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Catalog JSON file replacing the built-in checks
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Overall time budget for the run, in seconds
    #[arg(long, global = true)]
    budget_secs: Option<u64>,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the probes of one feature, or all of them
    Test {
        #[arg(default_value = "all")]
        feature: String,
    },
    /// Check external APIs, storage and command dependencies
    Deps,
    /// Advise on an issue category without changing anything
    Fix {
        #[arg(default_value = "all")]
        category: String,
    },
    /// Validate environment variables
    Env,
    /// Full diagnosis with health score and recommendations
    Diagnose,
    /// Environment, dependencies and every feature suite
    Full,
}

fn verdict(healthy: bool) -> ExitCode {
    if healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn emit<T: serde::Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", report::to_json(value)?);
    } else {
        println!("{}", text(value));
    }
    Ok(())
}

async fn run(cli: Cli, mut cfg: DoctorConfig) -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(base_url) = cli.base_url {
        cfg.base_url = base_url;
    }
    if let Some(path) = cli.catalog {
        cfg.catalog_path = Some(path);
    }
    if let Some(secs) = cli.budget_secs.filter(|s| *s > 0) {
        cfg.budget = Some(std::time::Duration::from_secs(secs));
    }

    let catalog = match &cfg.catalog_path {
        Some(path) => Catalog::load(path)?,
        None => Catalog::default(),
    };
    let prober = Prober::new(&cfg.base_url, cfg.run_budget())?;
    let env = ProcessEnv;
    tracing::info!("Target {}", prober.base_url());

    let code = match cli.command.unwrap_or(Command::Diagnose) {
        Command::Test { feature } => {
            let reports = run_suites(&prober, &catalog, &feature).await?;
            emit(cli.json, &reports, |r| report::render_suites(r))?;
            verdict(reports.iter().all(|r| r.all_passed()))
        }
        Command::Deps => {
            let deps = check_dependencies(&prober, &catalog, &env).await;
            emit(cli.json, &deps, report::render_dependencies)?;
            verdict(deps.all_healthy())
        }
        Command::Fix { category } => {
            let advisory = Advisor::new(&prober, &catalog, &env).advise(&category).await?;
            emit(cli.json, &advisory, report::render_advisory)?;
            verdict(advisory.healthy)
        }
        Command::Env => {
            let environment = validate_environment(&catalog.environment, &env);
            emit(cli.json, &environment, report::render_environment)?;
            verdict(environment.ready)
        }
        Command::Diagnose => {
            let diagnosis = run_diagnosis(&prober, &catalog, &env).await;
            emit(cli.json, &diagnosis, report::render_diagnosis)?;
            verdict(diagnosis.health_level > HealthLevel::Poor)
        }
        Command::Full => {
            let full = run_full(&prober, &catalog, &env).await;
            emit(cli.json, &full, report::render_full)?;
            verdict(full.healthy())
        }
    };

    Ok(code)
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("platform_doctor=info".parse()?))
        .init();

    let cli = Cli::parse();
    let cfg = DoctorConfig::load();

    match run(cli, cfg).await {
        Ok(code) => Ok(code),
        Err(e) if e.downcast_ref::<ConfigError>().is_some() => {
            tracing::error!("Configuration error: {}", e);
            eprintln!("error: {}", e);
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e),
    }
}
