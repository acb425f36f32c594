use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Text};
use meteo_core::{
    Config, RefreshJob, locations, provider_from_config,
    store::{firestore::FirestoreStore, memory::MemoryStore},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteo", version, about = "Refresh New Caledonia weather into Firestore")]
pub struct Cli {
    /// Path to the config file; defaults to the platform config directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch current conditions and forecasts and store them.
    Refresh {
        /// Write to an in-memory store and print the documents instead.
        #[arg(long)]
        dry_run: bool,

        /// Only refresh these locations (repeatable).
        #[arg(long = "only", value_name = "NAME")]
        only: Vec<String>,
    },

    /// List the locations refreshed by the job.
    Locations,

    /// Inspect or create the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the config file path.
    Path,
    /// Print the effective configuration.
    Show,
    /// Interactively write a config file.
    Init,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let Cli { config, command } = self;

        match command {
            Command::Refresh { dry_run, only } => {
                let cfg = Config::load_from(&config_path(config)?)?;
                refresh(&cfg, dry_run, &only).await
            }
            Command::Locations => {
                for loc in locations::communes() {
                    println!("{:<14} {:>7.2} {:>7.2}", loc.name, loc.latitude, loc.longitude);
                }
                Ok(())
            }
            Command::Config { action } => configure(action, &config_path(config)?),
        }
    }
}

fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Config::config_file_path(),
    }
}

async fn refresh(config: &Config, dry_run: bool, only: &[String]) -> Result<()> {
    let targets = if only.is_empty() {
        locations::communes()
    } else {
        locations::select(only)?
    };

    let provider = provider_from_config(&config.forecast)?;
    let layout = config.store.layout();

    if dry_run {
        tracing::info!("Dry run: documents are kept in memory");
        let store = Arc::new(MemoryStore::new());
        RefreshJob::new(provider, store.clone(), layout)
            .run(&targets)
            .await;
        println!("{}", serde_json::to_string_pretty(&store.to_json())?);
        return Ok(());
    }

    let store = FirestoreStore::shared(&config.store)
        .await
        .context("Failed to connect to Firestore")?;

    // Per-location failures never change the exit status.
    RefreshJob::new(provider, store, layout).run(&targets).await;
    Ok(())
}

fn configure(action: ConfigAction, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Show => print!("{}", Config::load_from(path)?.to_toml()?),
        ConfigAction::Init => {
            if path.exists() {
                let overwrite = Confirm::new(&format!("{} exists. Overwrite?", path.display()))
                    .with_default(false)
                    .prompt()?;
                if !overwrite {
                    println!("Keeping existing configuration.");
                    return Ok(());
                }
            }

            let mut cfg = Config::default();
            let default_credentials = cfg.store.credentials_path.display().to_string();
            let credentials = Text::new("Service account key file:")
                .with_default(&default_credentials)
                .prompt()?;
            cfg.store.credentials_path = PathBuf::from(credentials);

            let project = Text::new("Firestore project id (empty = from key file):").prompt()?;
            if !project.trim().is_empty() {
                cfg.store.project_id = Some(project.trim().to_string());
            }

            cfg.save_to(path)?;
            println!("Configuration written to {}", path.display());
        }
    }

    Ok(())
}
