//! settings-sync command-line tool.
//!
//! Mirrors dotfiles and other settings between the home directory and a
//! config repo, as declared in `$SETTINGS_DIR/settings-sync.yaml`.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use settings_sync_core::config::{SyncConfig, CONFIG_FILE_NAME};
use settings_sync_core::env::SETTINGS_DIR_VAR;
use settings_sync_core::errors::SyncError;
use settings_sync_core::{
    Action, CopyExecutor, DryRunExecutor, EntryOutcome, Environment, RsyncExecutor,
    SyncDirector,
};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// settings-sync command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "settings-sync",
    version,
    about = "Mirror dotfiles between your home directory and a config repo"
)]
struct Cli {
    /// Directory holding settings-sync.yaml.
    #[arg(long, global = true, env = "SETTINGS_DIR")]
    settings_dir: Option<PathBuf>,

    /// Print the copies that would run without running them.
    #[arg(short = 'n', long, global = true)]
    dry_run: bool,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List configured entries with their resolved paths.
    List {
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Reconcile entries according to their configured direction.
    Sync {
        #[command(flatten)]
        target: Target,
    },

    /// Copy entries from the local side to the repo.
    Push {
        #[command(flatten)]
        target: Target,

        /// Ignore a repo_to_local restriction.
        #[arg(short, long)]
        force: bool,
    },

    /// Copy entries from the repo to the local side.
    Pull {
        #[command(flatten)]
        target: Target,

        /// Ignore a local_to_repo restriction.
        #[arg(short, long)]
        force: bool,
    },

    /// Write a starter settings-sync.yaml into the settings directory.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Load and validate the configuration.
    Validate,
}

/// Which entries an action applies to.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Target {
    /// Entry name.
    name: Option<String>,

    /// Every configured entry, in file order.
    #[arg(long)]
    all: bool,
}

impl Target {
    fn selector(&self) -> Option<&str> {
        if self.all {
            None
        } else {
            self.name.as_deref()
        }
    }

    fn describe(&self) -> &str {
        self.name.as_deref().unwrap_or("--all")
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let env = Environment::from_process();
    let settings_dir = SyncConfig::settings_dir(cli.settings_dir.as_deref(), &env)?;
    let env = env.with_var(SETTINGS_DIR_VAR, settings_dir.to_string_lossy());
    debug!(settings_dir = %settings_dir.display(), dry_run = cli.dry_run, "starting");

    match cli.command {
        Commands::Init { force } => cmd_init(&settings_dir, force),
        Commands::Validate => cmd_validate(&settings_dir, &env),
        Commands::List { json } => {
            let config = load_config(&settings_dir, &env)?;
            cmd_list(&config, json)
        }
        Commands::Sync { target } => {
            let config = load_config(&settings_dir, &env)?;
            cmd_action(&config, Action::Sync, &target, false, cli.dry_run).await
        }
        Commands::Push { target, force } => {
            let config = load_config(&settings_dir, &env)?;
            cmd_action(&config, Action::Push, &target, force, cli.dry_run).await
        }
        Commands::Pull { target, force } => {
            let config = load_config(&settings_dir, &env)?;
            cmd_action(&config, Action::Pull, &target, force, cli.dry_run).await
        }
    }
}

fn load_config(settings_dir: &Path, env: &Environment) -> Result<SyncConfig> {
    SyncConfig::load(settings_dir, env).context("failed to load sync configuration")
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(settings_dir: &Path, force: bool) -> Result<()> {
    let output = settings_dir.join(CONFIG_FILE_NAME);
    if output.exists() && !force {
        anyhow::bail!(
            "file already exists: {}. Pass --force to overwrite it.",
            output.display()
        );
    }

    std::fs::create_dir_all(settings_dir)
        .with_context(|| format!("failed to create {}", settings_dir.display()))?;
    std::fs::write(&output, SyncConfig::default_template())
        .context("failed to write config file")?;

    println!("{}", style::success(&format!("wrote {}", output.display())));
    println!();
    println!("Next steps:");
    println!("  1. Edit the entries to match the files you want to track");
    println!("  2. Check the resolved paths with: settings-sync list");
    println!("  3. Copy everything into the repo: settings-sync push --all");

    Ok(())
}

fn cmd_validate(settings_dir: &Path, env: &Environment) -> Result<()> {
    println!(
        "Validating configuration: {}",
        settings_dir.join(CONFIG_FILE_NAME).display()
    );

    let config = load_config(settings_dir, env)?;
    let defaults = config.defaults();

    println!();
    println!("  Local root     : {}", defaults.local_root.display());
    println!("  Repo root      : {}", defaults.repo_root.display());
    println!("  Sync direction : {}", defaults.sync_direction);
    println!("  Default source : {}", defaults.default_source);
    println!("  Entries        : {}", config.entries().len());
    println!();
    println!("{}", style::success("configuration is valid"));

    Ok(())
}

fn cmd_list(config: &SyncConfig, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(config.entries())
            .context("failed to serialize entries")?;
        println!("{}", out);
        return Ok(());
    }

    for entry in config.entries() {
        println!("{}", style::header(&entry.name));
        println!("  description: {}", entry.description.as_deref().unwrap_or(""));
        println!("  local: {}", entry.local_path.display());
        println!("  repo:  {}", entry.repo_path.display());
    }
    Ok(())
}

async fn cmd_action(
    config: &SyncConfig,
    action: Action,
    target: &Target,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let entries = config.select(target.selector());
    if entries.is_empty() {
        return Err(SyncError::NoMatchingEntry(target.describe().to_string()).into());
    }

    if dry_run {
        let director = SyncDirector::new(DryRunExecutor::new());
        execute(config, &director, action, entries, force, true).await
    } else {
        let director = SyncDirector::new(RsyncExecutor::default());
        execute(config, &director, action, entries, force, false).await
    }
}

async fn execute<E: CopyExecutor>(
    config: &SyncConfig,
    director: &SyncDirector<E>,
    action: Action,
    entries: Vec<&settings_sync_core::SyncEntry>,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    director
        .run_with(action, entries, force, |outcome| {
            print_outcome(config, outcome, dry_run)
        })
        .await
        .with_context(|| format!("{} failed", action))?;
    Ok(())
}

fn print_outcome(config: &SyncConfig, outcome: &EntryOutcome, dry_run: bool) {
    if outcome.copies.is_empty() {
        println!(
            "{} {}",
            style::success(&outcome.name),
            style::dim("up to date")
        );
        return;
    }

    let entry = config.entries().iter().find(|e| e.name == outcome.name);
    for copy in &outcome.copies {
        let label = match entry {
            Some(e) if copy.source == e.local_path => style::arrow("local", "repo"),
            Some(_) => style::arrow("repo", "local"),
            None => String::new(),
        };
        let mode = if copy.update_only { " (update only)" } else { "" };
        let line = format!("{} {} [{}{}]", outcome.name, label, copy.kind, mode);
        if dry_run {
            println!("{}", style::warn(&format!("would copy: {}", line)));
            println!(
                "    {} → {}",
                copy.source.display(),
                copy.destination.display()
            );
        } else {
            println!("{}", style::success(&line));
        }
    }
}
