use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use bitstore::cli::{Cli, Command, ShapeArgs};
use bitstore::config::{Config, DEFAULT_CONFIG_FILE};
use bitstore::options::config_key;
use bitstore::{BitStore, Codec, FileStore, KeyValueStore, StoreOptions};

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install tracing subscriber: {}", e))?;

    Ok(())
}

/// Open `id`, taking unset shape fields from its persisted config before the config file
fn open_store(store_path: &Path, id: &str, shape: &ShapeArgs, config: &Config) -> Result<BitStore<FileStore>> {
    let backend = FileStore::open(store_path).context(format!("Failed to open store {}", store_path.display()))?;

    let persisted: StoreOptions = backend
        .get(&config_key(id))?
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default();
    debug!(id, ?persisted, "Persisted shape");

    let options = StoreOptions::new()
        .with_id(id)
        .with_chunk_size(shape.chunk_size.or(persisted.chunk_size).unwrap_or(config.chunk_size))
        .with_length(shape.length.or(persisted.length).unwrap_or(config.length))
        .with_item_size(shape.item_size.or(persisted.item_size).unwrap_or(config.item_size));

    let store = BitStore::open(backend, options).context(format!("Failed to open array {}", id))?;
    if store.outcome().discarded_data() {
        eprintln!(
            "{} array {} was {}: previous contents discarded",
            "warning:".yellow().bold(),
            id.cyan(),
            store.outcome()
        );
    }
    Ok(store)
}

/// Write a config file, refusing to replace one unless `force` is set
fn init_config(path: &Path, force: bool, store: Option<&Path>, shape: &ShapeArgs) -> Result<()> {
    if path.exists() && !force {
        return Err(eyre::eyre!(
            "Config file {} already exists (use --force to overwrite)",
            path.display()
        ));
    }

    let defaults = Config::default();
    let config = Config {
        store_path: store.map(Path::to_path_buf).unwrap_or(defaults.store_path),
        chunk_size: shape.chunk_size.unwrap_or(defaults.chunk_size),
        length: shape.length.unwrap_or(defaults.length),
        item_size: shape.item_size.unwrap_or(defaults.item_size),
    };
    Codec::new(config.chunk_size)?;

    config
        .save(path)
        .context(format!("Failed to write config to {}", path.display()))?;
    println!("{} Wrote config to {}", "✓".green(), path.display().to_string().cyan());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose).context("Failed to setup logging")?;

    if let Command::Init { force } = cli.command {
        let path = cli.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        return init_config(&path, force, cli.store.as_deref(), &cli.shape);
    }

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let store_path = cli.store.clone().unwrap_or_else(|| config.store_path.clone());
    debug!(store_path = %store_path.display(), "bs starting");

    match cli.command {
        Command::Init { .. } => unreachable!("handled before config load"),
        Command::Get { id, index } => {
            let store = open_store(&store_path, &id, &cli.shape, &config)?;
            println!("{}", store.get_item(index)?);
        }
        Command::Set { id, index, value } => {
            let mut store = open_store(&store_path, &id, &cli.shape, &config)?;
            store.set_item(index, &value)?;
            println!("{} {}[{}] = {}", "✓".green(), id.cyan(), index, value);
        }
        Command::All { id } => {
            let store = open_store(&store_path, &id, &cli.shape, &config)?;
            for item in store.items() {
                println!("{}", item);
            }
        }
        Command::Count { id, value } => {
            let store = open_store(&store_path, &id, &cli.shape, &config)?;
            println!("{}", store.count_occurrences_of(&value));
        }
        Command::Randomize { id } => {
            let mut store = open_store(&store_path, &id, &cli.shape, &config)?;
            store.randomize()?;
            println!(
                "{} Randomized {} ({} of {} bits set)",
                "✓".green(),
                id.cyan(),
                store.bits().count_ones(),
                store.bits().len()
            );
        }
        Command::Reset { id } => {
            let mut store = open_store(&store_path, &id, &cli.shape, &config)?;
            store.reset()?;
            println!("{} Reset {}", "✓".green(), id.cyan());
        }
        Command::Inspect { id } => {
            let store = open_store(&store_path, &id, &cli.shape, &config)?;
            let store_config = store.config();
            println!("Array: {}", id.cyan());
            println!("  Outcome: {}", store.outcome());
            println!("  Items: {}", store_config.length);
            println!("  Item size: {}", store_config.item_size);
            println!("  Chunk size: {}", store_config.chunk_size);
            println!("  Bits set: {} / {}", store.bits().count_ones(), store.bits().len());
            println!("  Encoded: {:?}", store.encoded()?);
        }
        Command::Encode { binary } => {
            let codec = Codec::new(cli.shape.chunk_size.unwrap_or(config.chunk_size))?;
            println!("{}", codec.binary_to_text(&binary)?);
        }
        Command::Decode { text } => {
            let codec = Codec::new(cli.shape.chunk_size.unwrap_or(config.chunk_size))?;
            println!("{}", codec.text_to_binary(&text)?);
        }
    }

    Ok(())
}
