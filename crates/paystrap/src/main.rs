mod setup;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use paystrap_config::{BootstrapConfig, FileSettingsStore};
use paystrap_core::{BootstrapError, Pipeline, SystemGateway};
use setup::StageLogger;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code for configuration and usage errors (clap uses the same)
const EXIT_CONFIG: u8 = 2;

#[derive(Parser)]
#[command(name = "paystrap", version)]
#[command(
    about = "Log in to Stripe, write API keys to .env and start a local webhook relay.",
    long_about = None
)]
struct Cli {
    /// Configuration file [default: PAYSTRAP_CONFIG_PATH, then ./paystrap.yaml, ...]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Debug logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (config, store) = match prepare(&cli) {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let gateway = SystemGateway::new();
    let pipeline = Pipeline::new(&gateway, &store, config);

    println!("{}", "paystrap: bootstrapping Stripe credentials".bold());
    println!();

    let mut logger = StageLogger::new();
    let outcome = pipeline.run(&mut logger).await;
    logger.print_summary(&outcome.report);

    if let Some(failure) = outcome.failure() {
        eprintln!();
        eprintln!("{} {}", "✗".red().bold(), failure.to_string().red());
        if matches!(failure.error, BootstrapError::EnvironmentMissing { .. }) {
            eprintln!(
                "  Install it with: {}",
                pipeline.config().install_hint.cyan()
            );
        }
        if let Some(account_id) = &outcome.report.account_id {
            eprintln!("  Account:  {}", account_id);
        }
        if let Some(env_file) = &outcome.report.env_file {
            eprintln!("  Env file: {}", env_file.display());
        }
    } else {
        println!();
        println!(
            "{} Credentials written to {}",
            "✓".green().bold(),
            pipeline.config().env_file.display().to_string().cyan()
        );
    }

    ExitCode::from(outcome.exit_code() as u8)
}

/// Load and validate configuration, then open the settings store
fn prepare(cli: &Cli) -> anyhow::Result<(BootstrapConfig, FileSettingsStore)> {
    let (config, _source) = paystrap_config::load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;

    let settings_path = config
        .settings_path()
        .context("Failed to locate the settings store")?;
    tracing::debug!(path = %settings_path.display(), "Settings store");

    Ok((config, FileSettingsStore::new(settings_path)))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
