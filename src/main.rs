//! reportpoll CLI - Wait for a remote test report and write it as JUnit XML.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use reportpoll::config::{self, KEY_VERBOSE, Options, RunConfig};
use reportpoll::orchestrator::{Orchestrator, RunOutcome};
use reportpoll::report::{JUnitWriter, print_summary};
use reportpoll::transport::http::HttpTransport;

/// Per-request limit for backend calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "reportpoll")]
#[command(about = "Wait for a remote test report and write it as JUnit XML", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML with an [options] table)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output, including raw response bodies
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll for the report of a build and write it
    Run {
        /// Options as key=value (titleId=..., buildIdentifier=..., timeout=...)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        options: Vec<String>,
    },

    /// Resolve options and print them without contacting the backend
    Validate {
        /// Options as key=value
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        options: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directives(cli.verbose)));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run { ref options } => {
            let config = resolve_config(cli.config.as_deref(), options, cli.verbose)?;
            let outcome = run(config).await?;
            std::process::exit(outcome.exit_code());
        }
        Commands::Validate { ref options } => {
            let config = resolve_config(cli.config.as_deref(), options, cli.verbose)?;
            print_config(&config);
            Ok(())
        }
    }
}

/// Default filter directives. Only this crate logs at debug when verbose;
/// HTTP client internals stay at info.
fn log_directives(verbose: bool) -> &'static str {
    if verbose { "reportpoll=debug,info" } else { "info" }
}

/// Merges file, environment and command line options and validates them.
fn resolve_config(config_path: Option<&Path>, args: &[String], verbose: bool) -> Result<RunConfig> {
    let mut options = Options::new();

    if let Some(path) = config_path {
        let file = config::load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        options.merge(Options::from_file_config(&file));
        info!("Loaded configuration from {}", path.display());
    }

    options.merge(Options::from_env());
    options.merge(Options::from_args(args)?);
    if verbose {
        options.insert(KEY_VERBOSE, "true");
    }

    let config = RunConfig::from_options(&options)?;
    Ok(config)
}

async fn run(config: RunConfig) -> Result<RunOutcome> {
    info!(
        "Waiting for test results of {} on {}",
        config.build_identifier, config.base_url
    );

    let transport = HttpTransport::with_timeout(config.base_url.clone(), REQUEST_TIMEOUT)
        .context("Failed to create HTTP client")?;
    let orchestrator = Orchestrator::new(config, Arc::new(transport), JUnitWriter::new());

    let outcome = orchestrator.run().await;
    if let RunOutcome::Completed { path, suites } = &outcome {
        print_summary(suites, path);
    }

    Ok(outcome)
}

fn print_config(config: &RunConfig) {
    println!("Configuration is valid!");
    println!();
    println!("Settings:");
    println!("  Title id:         {}", config.title_id);
    println!("  Build identifier: {}", config.build_identifier);
    println!("  Base URL:         {}", config.base_url);
    println!("  Timeout:          {}s", config.timeout.as_secs());
    println!("  Poll interval:    {}ms", config.poll_interval.as_millis());
    println!("  Verbose:          {}", config.verbose);
    println!("  Report path:      {}", config.report_path().display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directives_scope_debug_to_crate() {
        assert_eq!(log_directives(true), "reportpoll=debug,info");
        assert_eq!(log_directives(false), "info");
        assert!(EnvFilter::try_new(log_directives(true)).is_ok());
    }
}
