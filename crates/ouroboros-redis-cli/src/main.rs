//! ob-redis - administrative CLI for ouroboros-redis
//!
//! Usage:
//!   ob-redis keys                          List every key
//!   ob-redis stats                         Stats for every key, smallest first
//!   ob-redis stats <key> [--json]          Stats for one key
//!   ob-redis delete <key>...               Delete keys, report missing ones
//!   ob-redis get <key> [--json]            Read a plain-text or JSON value
//!   ob-redis set <key> <value> [--json] [--broadcast]
//!   ob-redis table <key>                   Retrieved rows as JSON lines
//!
//! Connection flags default to REDIS_HOST / REDIS_PORT / REDIS_DB / REDIS_PASSWORD.

mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ouroboros_redis::{KeyStatsLookup, RedisConfig, RedisStoreAdapter, StoreAdapter};

#[derive(Parser)]
#[command(name = "ob-redis")]
#[command(about = "Inspect and manage ouroboros-redis data", long_about = None)]
#[command(version)]
struct Cli {
    /// Redis host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Redis port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Logical database index
    #[arg(long, global = true)]
    db: Option<i64>,

    /// Redis password
    #[arg(long, global = true)]
    password: Option<String>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every key in the database
    Keys,

    /// Key statistics (all keys, ascending by size, when no key is given)
    Stats {
        key: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete one or more keys
    #[command(alias = "del")]
    Delete {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Read a value
    Get {
        key: String,

        /// Decode the value as JSON and pretty-print it
        #[arg(long)]
        json: bool,
    },

    /// Store a value, replacing what is there
    Set {
        key: String,
        value: String,

        /// Parse VALUE as JSON and store its canonical encoding
        #[arg(long)]
        json: bool,

        /// Also publish the stored payload on the key's channel
        #[arg(long)]
        broadcast: bool,
    },

    /// Print the rows of a published table as JSON lines
    Table { key: String },
}

impl Cli {
    fn redis_config(&self) -> Result<RedisConfig> {
        let mut config = RedisConfig::from_env().context("Invalid Redis environment")?;
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(db) = self.db {
            config.db = db;
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let config = cli.redis_config()?;
    let rt = tokio::runtime::Runtime::new().context("Failed to start runtime")?;

    rt.block_on(async {
        let adapter = StoreAdapter::connect(&config)
            .await
            .with_context(|| format!("Failed to connect to Redis at {}", config.endpoint()))?;

        run(&adapter, cli.command).await
    })
}

async fn run(adapter: &RedisStoreAdapter, command: Commands) -> Result<()> {
    match command {
        Commands::Keys => {
            let mut keys = adapter.list_keys().await?;
            keys.sort();
            for key in keys {
                println!("{}", key);
            }
        }

        Commands::Stats { key: Some(key), json } => match adapter.key_stats(&key).await? {
            KeyStatsLookup::Found(stats) if json => {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
            KeyStatsLookup::Found(stats) => {
                print!("{}", render::stats_table(std::slice::from_ref(&stats)));
            }
            lookup @ KeyStatsLookup::NotFound { .. } => {
                println!("{}", lookup);
            }
        },

        Commands::Stats { key: None, json } => {
            let all = adapter.all_key_stats().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else {
                print!("{}", render::stats_table(&all));
            }
        }

        Commands::Delete { keys } => {
            let report = adapter.delete_keys(&keys).await?;
            print!("{}", render::delete_report(&report));
        }

        Commands::Get { key, json: true } => match adapter.retrieve_json(&key).await? {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => println!("Key '{}' does not exist.", key),
        },

        Commands::Get { key, json: false } => match adapter.retrieve_text(&key).await? {
            Some(text) => println!("{}", text),
            None => println!("Key '{}' does not exist.", key),
        },

        Commands::Set {
            key,
            value,
            json,
            broadcast,
        } => {
            if json {
                let parsed: serde_json::Value = serde_json::from_str(&value)
                    .with_context(|| format!("VALUE is not valid JSON: {}", value))?;
                adapter.publish_json(&parsed, &key, broadcast).await?;
            } else {
                adapter.publish_text(&value, &key, broadcast).await?;
            }
            println!("✅ Stored {}{}", key, if broadcast { " (published)" } else { "" });
        }

        Commands::Table { key } => {
            let table = adapter
                .retrieve_table(&key)
                .await
                .with_context(|| format!("Failed to read table '{}'", key))?;
            for row in &table {
                println!("{}", row.to_json()?);
            }
            tracing::info!(key = %key, rows = table.len(), "Table retrieved");
        }
    }

    Ok(())
}

/// Initialize logging based on log level
fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok(); // Ignore error if already initialized

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "ob-redis", "--host", "cache", "--port", "6380", "--db", "4", "keys",
        ]);
        let config = cli.redis_config().unwrap();
        assert_eq!(config.host, "cache");
        assert_eq!(config.port, 6380);
        assert_eq!(config.db, 4);
    }

    #[test]
    fn test_parse_set_json_broadcast() {
        let cli = Cli::parse_from(["ob-redis", "set", "cfg", "{\"a\":1}", "--json", "--broadcast"]);
        match cli.command {
            Commands::Set {
                key,
                value,
                json,
                broadcast,
            } => {
                assert_eq!(key, "cfg");
                assert_eq!(value, "{\"a\":1}");
                assert!(json && broadcast);
            }
            _ => panic!("expected set"),
        }
    }

    #[test]
    fn test_delete_requires_keys() {
        assert!(Cli::try_parse_from(["ob-redis", "delete"]).is_err());
        let cli = Cli::try_parse_from(["ob-redis", "del", "a", "b"]).unwrap();
        assert!(matches!(cli.command, Commands::Delete { keys } if keys == vec!["a", "b"]));
    }
}
