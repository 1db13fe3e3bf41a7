//! Store adapter
//!
//! Translates tables, JSON values and plain text to and from store
//! primitives. Every method awaits its store round-trips one after another and
//! returns once all of them have completed or one has failed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::sync::Arc;

use crate::backend::StoreBackend;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::StoreError;
use crate::stats::{self, KeyStats, KeyStatsLookup};
use crate::table::{Row, Table};

#[cfg(feature = "redis")]
use crate::backend::RedisBackend;
#[cfg(feature = "redis")]
use crate::config::RedisConfig;

/// Outcome of [`StoreAdapter::delete_keys`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    /// Keys that existed and were deleted
    pub deleted_count: usize,
    /// Keys that did not exist, in input order
    pub missing_keys: Vec<String>,
}

/// Data-access layer over a [`StoreBackend`]
pub struct StoreAdapter<B> {
    backend: B,
    sink: Arc<dyn DiagnosticSink>,
}

#[cfg(feature = "redis")]
impl StoreAdapter<RedisBackend> {
    /// Connect to Redis, reporting diagnostics through `tracing`
    pub async fn connect(config: &RedisConfig) -> Result<Self, StoreError> {
        Self::connect_with_sink(config, Arc::new(TracingSink)).await
    }

    /// Connect to Redis with an explicit diagnostic sink
    pub async fn connect_with_sink(
        config: &RedisConfig,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, StoreError> {
        let backend = RedisBackend::connect(config).await?;
        sink.emit(Diagnostic::Connected {
            endpoint: backend.endpoint(),
        });
        Ok(Self::new(backend, sink))
    }
}

impl<B: StoreBackend> StoreAdapter<B> {
    pub fn new(backend: B, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { backend, sink }
    }

    /// Wrap a backend, reporting diagnostics through `tracing`
    pub fn with_backend(backend: B) -> Self {
        Self::new(backend, Arc::new(TracingSink))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Append every row after `last_published_index` to the list at `key`.
    ///
    /// One append per row, in table order. With `broadcast`, each row is
    /// published on channel `key` right after its own append. Returns the new
    /// cursor, `table.len() - 1`, whether or not anything was appended.
    ///
    /// A failed append or publish stops the loop: rows already appended stay,
    /// later rows are not attempted.
    pub async fn publish_rows(
        &self,
        table: &Table,
        key: &str,
        last_published_index: i64,
        broadcast: bool,
    ) -> Result<i64, StoreError> {
        if last_published_index < -1 {
            return Err(StoreError::InvalidCursor(last_published_index));
        }

        for row in table.rows_after(last_published_index) {
            let payload = row.to_json()?;

            self.backend.append(key, &payload).await?;
            self.sink.emit(Diagnostic::RowStored {
                key,
                payload: &payload,
            });

            if broadcast {
                self.broadcast(key, &payload).await?;
            }
        }

        Ok(table.last_index())
    }

    /// Store `value` as JSON text under `key`, replacing what was there
    pub async fn publish_json(
        &self,
        value: &Value,
        key: &str,
        broadcast: bool,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(value)
            .map_err(|e| StoreError::Encode(format!("Failed to serialize value: {}", e)))?;
        self.store_value(key, &payload, broadcast).await
    }

    /// Store the `Display` text of `value` under `key` verbatim
    pub async fn publish_text(
        &self,
        value: impl Display,
        key: &str,
        broadcast: bool,
    ) -> Result<(), StoreError> {
        let payload = value.to_string();
        self.store_value(key, &payload, broadcast).await
    }

    async fn store_value(&self, key: &str, payload: &str, broadcast: bool) -> Result<(), StoreError> {
        self.backend.set(key, payload).await?;
        self.sink.emit(Diagnostic::ValueStored { key, payload });

        if broadcast {
            self.broadcast(key, payload).await?;
        }
        Ok(())
    }

    async fn broadcast(&self, channel: &str, payload: &str) -> Result<(), StoreError> {
        self.backend.publish(channel, payload).await?;
        self.sink.emit(Diagnostic::Broadcast { channel, payload });
        Ok(())
    }

    /// Read the list at `key` back as a table.
    ///
    /// Rows sharing a timestamp collapse to the one appended last; the result
    /// is sorted ascending by timestamp. A missing key reads as an empty table.
    pub async fn retrieve_table(&self, key: &str) -> Result<Table, StoreError> {
        let entries = self.backend.list_range(key).await?;

        let table = entries
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                Row::from_json_slice(raw).map_err(|e| match e {
                    StoreError::Decode(msg) => {
                        StoreError::Decode(format!("{}[{}]: {}", key, index, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<Table, StoreError>>()?;

        Ok(table.into_timeline())
    }

    /// Decode the JSON value at `key`; `None` if the key does not exist
    pub async fn retrieve_json(&self, key: &str) -> Result<Option<Value>, StoreError> {
        match self.backend.get(key).await? {
            Some(raw) => serde_json::from_slice(&raw).map(Some).map_err(|e| {
                StoreError::Decode(format!("Value at '{}' is not valid JSON: {}", key, e))
            }),
            None => Ok(None),
        }
    }

    /// The text at `key` as stored; `None` if the key does not exist
    pub async fn retrieve_text(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.backend.get(key).await? {
            Some(raw) => String::from_utf8(raw).map(Some).map_err(|e| {
                StoreError::Decode(format!("Value at '{}' is not valid UTF-8: {}", key, e))
            }),
            None => Ok(None),
        }
    }

    /// Delete one key; see [`StoreAdapter::delete_keys`]
    pub async fn delete_key(&self, key: &str) -> Result<DeleteReport, StoreError> {
        self.delete_keys([key]).await
    }

    /// Delete each key that exists and report the ones that did not.
    ///
    /// Each key is checked with `EXISTS` and then deleted with `DEL` as two
    /// separate commands.
    pub async fn delete_keys<I, K>(&self, keys: I) -> Result<DeleteReport, StoreError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut report = DeleteReport::default();

        for key in keys {
            let key = key.as_ref();
            if self.backend.exists(key).await? {
                self.backend.delete(key).await?;
                report.deleted_count += 1;
                self.sink.emit(Diagnostic::KeyDeleted { key });
            } else {
                report.missing_keys.push(key.to_string());
                self.sink.emit(Diagnostic::KeyMissing { key });
            }
        }

        Ok(report)
    }

    /// Every key in the logical database
    pub async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        self.backend.keys().await
    }

    /// Kind, item count and size of `key`, scanning the full value
    pub async fn key_stats(&self, key: &str) -> Result<KeyStatsLookup, StoreError> {
        let lookup = stats::compute(&self.backend, key).await?;
        if let KeyStatsLookup::Found(stats) = &lookup {
            self.sink.emit(Diagnostic::StatsComputed { stats });
        }
        Ok(lookup)
    }

    /// [`key_stats`](Self::key_stats) for every key, ascending by size.
    ///
    /// Scans every collection in the database; meant for diagnostics, not polling.
    /// Keys deleted between listing and sizing are left out.
    pub async fn all_key_stats(&self) -> Result<Vec<KeyStats>, StoreError> {
        let keys = self.list_keys().await?;
        let mut all = Vec::with_capacity(keys.len());

        for key in &keys {
            match self.key_stats(key).await? {
                KeyStatsLookup::Found(stats) => all.push(stats),
                KeyStatsLookup::NotFound { key } => {
                    self.sink.emit(Diagnostic::KeyMissing { key: &key });
                }
            }
        }

        stats::sort_by_size(&mut all);
        Ok(all)
    }
}
