//! modloader CLI
//!
//! `resolve` prints the canonical locator of an identifier. `run` loads the
//! entry module of a manifest, printing modules as they execute and the entry
//! module's export at the end.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use modloader::module::api::events::MODULE_EXECUTED;
use modloader::module::registry::ModuleManifest;
use modloader::module::{Loader, ManifestLoader, Namespace, ENTRY_POINT};
use modloader::utils::init_logging_from_config;
use modloader::{LoaderConfig, LoggingConfig};

#[derive(Parser)]
#[command(name = "modloader", about = "Asynchronous module-dependency loader", version)]
struct Cli {
    /// Loader configuration file (TOML or JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, global = true, value_name = "FILTER")]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve an identifier to its canonical locator
    Resolve {
        id: String,
        /// Locator relative identifiers resolve against
        #[arg(long = "from", value_name = "LOCATOR")]
        reference: Option<String>,
    },
    /// Load a manifest's entry module and print its export
    Run {
        manifest: PathBuf,
        /// Identifier to load instead of the manifest's `entry`
        #[arg(long)]
        entry: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => LoaderConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LoaderConfig::default(),
    };

    let mut logging = config.logging.clone().unwrap_or_default();
    if cli.log_filter.is_some() {
        logging = LoggingConfig {
            filter: cli.log_filter.clone(),
            ..logging
        };
    }
    init_logging_from_config(Some(&logging));

    match cli.command {
        Command::Resolve { id, reference } => {
            let loader = Loader::new(&config, Arc::new(ManifestLoader::new(ModuleManifest::default())));
            println!("{}", loader.resolve(&id, reference.as_deref()));
        }
        Command::Run { manifest, entry } => {
            let manifest = ModuleManifest::from_file(&manifest)
                .with_context(|| format!("loading manifest {}", manifest.display()))?;
            let entry = entry
                .or_else(|| manifest.entry.clone())
                .ok_or_else(|| anyhow!("manifest has no entry; pass --entry"))?;

            let mut namespace = Namespace::new();
            let loader = namespace.install(
                ENTRY_POINT,
                Loader::new(&config, Arc::new(ManifestLoader::new(manifest))),
            )?;
            loader.events().on(MODULE_EXECUTED, |_, payload| {
                if let Some(module) = payload.module() {
                    println!("executed {}", module.dedup_locator);
                }
            });

            let export = loader.load(&entry).await?;
            match export.as_json() {
                Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
                None => println!("{:?}", export),
            }
        }
    }

    Ok(())
}
