use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repowarden::enumerate::list_all_repositories;
use repowarden::{Config, DryRunApi, GitHubClient, Reconciler, RepoApi, RepoSelector, RunSummary};

#[derive(Parser)]
#[command(name = "repowarden")]
#[command(about = "Organization-wide GitHub repository policy enforcer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the policy to every repository of the organization
    Run {
        /// Report corrections without making changes
        #[arg(long)]
        dry_run: bool,

        /// Override the configured organization
        #[arg(long)]
        org: Option<String>,

        /// Only process the repository with this name
        #[arg(long)]
        repo: Option<String>,
    },

    /// List repositories and whether they would be processed
    List {
        /// Override the configured organization
        #[arg(long)]
        org: Option<String>,
    },

    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            init_logging(cli.verbose, "info", LogTarget::Stdout)?;
            cmd_init(cli.config, force)
        }
        Commands::Run { dry_run, org, repo } => {
            let config = setup(cli.config, cli.verbose, LogTarget::Stdout)?;
            cmd_run(&config, dry_run, org, repo).await
        }
        Commands::List { org } => {
            let config = setup(cli.config, cli.verbose, LogTarget::Stdout)?;
            cmd_list(&config, org).await
        }
        Commands::Config => {
            // stdout carries the YAML document
            let config = setup(cli.config, cli.verbose, LogTarget::Stderr)?;
            cmd_config(&config)
        }
    }
}

/// Where log lines are written
#[derive(Clone, Copy)]
enum LogTarget {
    Stdout,
    Stderr,
}

/// Load configuration, then start logging at the configured level
fn setup(config_path: Option<PathBuf>, verbose: bool, target: LogTarget) -> Result<Config> {
    let config = load_config(config_path)?;
    init_logging(verbose, &config.logging.level, target)?;
    info!("Starting repowarden v{}", env!("CARGO_PKG_VERSION"));
    Ok(config)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool, level: &str, target: LogTarget) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let writer = match target {
        LogTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(&path),
        None => Config::load_or_default(),
    }
}

/// Write a default configuration file
fn cmd_init(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_config_path()?,
    };

    if path.exists() && !force {
        bail!(
            "Configuration already exists at {:?} (use --force to overwrite)",
            path
        );
    }

    Config::default().save(&path)?;

    println!("✅ repowarden configuration written");
    println!("   Config: {:?}", path);
    println!("   Next: set GITHUB_TOKEN and run 'repowarden run --dry-run'");

    Ok(())
}

/// Print the effective configuration as YAML
fn cmd_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    print!("{}", yaml);
    Ok(())
}

/// Apply the policy to the organization
async fn cmd_run(
    config: &Config,
    dry_run: bool,
    org: Option<String>,
    repo: Option<String>,
) -> Result<()> {
    let org = org.unwrap_or_else(|| config.organization.clone());

    if config.webhook_url().is_none() {
        warn!("No webhook url configured, the hooks check will be skipped");
    }

    // Missing credentials abort here, before any repository is touched
    let client = GitHubClient::new(config)?;
    let dry_run_client;
    let api: &dyn RepoApi = if dry_run {
        println!("🔍 Dry run mode - no changes will be made");
        dry_run_client = DryRunApi::new(&client);
        &dry_run_client
    } else {
        &client
    };

    let selector = RepoSelector::new(&config.skip.repositories).only(repo);
    let reconciler = Reconciler::new(api, &config.policy);
    let summary = reconciler.run_organization(&org, &selector).await;

    print_summary(&org, &summary, dry_run);
    Ok(())
}

/// List repositories and their selection status
async fn cmd_list(config: &Config, org: Option<String>) -> Result<()> {
    let org = org.unwrap_or_else(|| config.organization.clone());
    let client = GitHubClient::new(config)?;

    let repositories = list_all_repositories(&client, &org).await;
    let selector = RepoSelector::new(&config.skip.repositories);

    println!("Repositories in {} ({}):", org, repositories.len());
    for repo in &repositories {
        match selector.skip_reason(repo) {
            None => println!("  📁 {}", repo.full_name),
            Some(reason) => println!("  ⏭️  {} (skipped: {})", repo.full_name, reason),
        }
    }

    Ok(())
}

fn print_summary(org: &str, summary: &RunSummary, dry_run: bool) {
    let label = if dry_run { "Dry Run" } else { "Enforcement" };

    println!("\n🎉 {} Complete for {}!", label, org);
    println!("   📊 Total repositories: {}", summary.total_repositories);
    println!("   ✅ Processed: {}", summary.processed_repositories);
    println!("   ⏭️  Skipped: {}", summary.skipped.len());
    println!("   🔧 Corrections: {}", summary.corrections);
    println!("   ❌ Failed checks: {}", summary.failures.len());
    println!("   ⏱️  Duration: {:.2}s", summary.duration.as_secs_f64());

    if !summary.failures.is_empty() {
        println!("\n🔍 Failed Checks:");
        for failure in &summary.failures {
            println!(
                "   ❌ {} [{}]: {}",
                failure.repository, failure.check, failure.message
            );
        }
    }
}
