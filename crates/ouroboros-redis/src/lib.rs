//! ouroboros-redis: data-access layer over Redis
//!
//! Persists and broadcasts timestamped tables, JSON values and plain text,
//! and reports per-key storage statistics.
//!
//! ```rust,ignore
//! use ouroboros_redis::{RedisConfig, Row, StoreAdapter, Table};
//!
//! let adapter = StoreAdapter::connect(&RedisConfig::from_env()?).await?;
//!
//! let mut table = Table::new();
//! table.push(Row::new(chrono::Utc::now()).with_field("price", 101.5));
//! let cursor = adapter.publish_rows(&table, "quotes:SPY", -1, true).await?;
//!
//! let history = adapter.retrieve_table("quotes:SPY").await?;
//! ```

pub mod adapter;
pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod stats;
pub mod table;
pub mod timestamp;

// Re-exports
pub use adapter::{DeleteReport, StoreAdapter};
pub use backend::{InMemoryBackend, KeyKind, StoreBackend, WriteOp};
pub use config::RedisConfig;
pub use diagnostics::{Diagnostic, DiagnosticSink, NoopSink, TracingSink};
pub use error::StoreError;
pub use stats::{KeyStats, KeyStatsLookup, BYTES_PER_MIB};
pub use table::{Row, Table};
pub use timestamp::TIMESTAMP_FIELD;

#[cfg(feature = "redis")]
pub use backend::RedisBackend;

/// Adapter over a live Redis connection
#[cfg(feature = "redis")]
pub type RedisStoreAdapter = StoreAdapter<RedisBackend>;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
