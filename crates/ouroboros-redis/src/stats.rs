//! Per-key storage statistics
//!
//! Sizes are computed by reading the whole value: every element of a list,
//! every member of a set or sorted set, every field and value of a hash.
//! Nothing is cached; the store is the source of truth on every call.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::backend::{KeyKind, StoreBackend};
use crate::error::StoreError;

pub const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Kind, item count and byte size of one key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyStats {
    pub key: String,
    pub kind: KeyKind,
    pub item_count: u64,
    pub size_bytes: u64,
    pub size_mib: f64,
}

impl KeyStats {
    fn new(key: &str, kind: KeyKind, item_count: u64, size_bytes: u64) -> Self {
        Self {
            key: key.to_string(),
            kind,
            item_count,
            size_bytes,
            size_mib: size_bytes as f64 / BYTES_PER_MIB,
        }
    }
}

/// Outcome of a stats lookup. A missing key is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyStatsLookup {
    Found(KeyStats),
    NotFound { key: String },
}

impl KeyStatsLookup {
    pub fn found(self) -> Option<KeyStats> {
        match self {
            KeyStatsLookup::Found(stats) => Some(stats),
            KeyStatsLookup::NotFound { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, KeyStatsLookup::Found(_))
    }
}

impl fmt::Display for KeyStatsLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStatsLookup::Found(stats) => write!(
                f,
                "{} ({}): {} items, {} bytes ({:.6} MiB)",
                stats.key, stats.kind, stats.item_count, stats.size_bytes, stats.size_mib
            ),
            KeyStatsLookup::NotFound { key } => {
                write!(f, "Key '{}' does not exist in the store.", key)
            }
        }
    }
}

fn total_len<I, T>(items: I) -> u64
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    items.into_iter().map(|item| item.as_ref().len() as u64).sum()
}

/// Existence check, type query, then a kind-specific full scan
pub(crate) async fn compute<B: StoreBackend>(
    backend: &B,
    key: &str,
) -> Result<KeyStatsLookup, StoreError> {
    let not_found = || KeyStatsLookup::NotFound {
        key: key.to_string(),
    };

    if !backend.exists(key).await? {
        return Ok(not_found());
    }

    let kind = backend.kind(key).await?;
    let stats = match kind {
        // Removed between EXISTS and TYPE
        KeyKind::None => return Ok(not_found()),
        KeyKind::String => {
            let size = backend.string_len(key).await?;
            KeyStats::new(key, kind, 1, size)
        }
        KeyKind::List => {
            let count = backend.collection_len(key, &kind).await?;
            let size = total_len(backend.list_range(key).await?);
            KeyStats::new(key, kind, count, size)
        }
        KeyKind::Set => {
            let count = backend.collection_len(key, &kind).await?;
            let size = total_len(backend.set_members(key).await?);
            KeyStats::new(key, kind, count, size)
        }
        KeyKind::SortedSet => {
            let count = backend.collection_len(key, &kind).await?;
            let size = total_len(backend.sorted_set_members(key).await?);
            KeyStats::new(key, kind, count, size)
        }
        KeyKind::Hash => {
            let count = backend.collection_len(key, &kind).await?;
            let size = backend
                .hash_entries(key)
                .await?
                .iter()
                .map(|(field, value)| (field.len() + value.len()) as u64)
                .sum();
            KeyStats::new(key, kind, count, size)
        }
        KeyKind::Other(_) => KeyStats::new(key, kind, 0, 0),
    };

    Ok(KeyStatsLookup::Found(stats))
}

/// Stable ascending sort by mebibyte size
pub fn sort_by_size(stats: &mut [KeyStats]) {
    stats.sort_by(|a, b| a.size_mib.total_cmp(&b.size_mib));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    #[tokio::test]
    async fn test_string_stats() {
        let backend = InMemoryBackend::new();
        backend.set("x", "hello").await.unwrap();

        let stats = compute(&backend, "x").await.unwrap().found().unwrap();
        assert_eq!(stats.kind, KeyKind::String);
        assert_eq!(stats.item_count, 1);
        assert_eq!(stats.size_bytes, 5);
        assert_eq!(stats.size_mib, 5.0 / BYTES_PER_MIB);
    }

    #[tokio::test]
    async fn test_list_set_zset_hash_stats() {
        let backend = InMemoryBackend::new();
        backend.append("l", "abc").await.unwrap();
        backend.append("l", "de").await.unwrap();
        backend.sadd("s", "one").unwrap();
        backend.sadd("s", "three").unwrap();
        backend.zadd("z", "alice", 10.0).unwrap();
        backend.zadd("z", "bo", 12345.678).unwrap();
        backend.hset("h", "name", "bob").unwrap();
        backend.hset("h", "age", "42").unwrap();

        let list = compute(&backend, "l").await.unwrap().found().unwrap();
        assert_eq!((list.item_count, list.size_bytes), (2, 5));

        let set = compute(&backend, "s").await.unwrap().found().unwrap();
        assert_eq!((set.item_count, set.size_bytes), (2, 8));

        // Scores are not counted
        let zset = compute(&backend, "z").await.unwrap().found().unwrap();
        assert_eq!(zset.kind, KeyKind::SortedSet);
        assert_eq!((zset.item_count, zset.size_bytes), (2, 7));

        let hash = compute(&backend, "h").await.unwrap().found().unwrap();
        assert_eq!((hash.item_count, hash.size_bytes), (2, 12));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let backend = InMemoryBackend::new();
        let lookup = compute(&backend, "ghost").await.unwrap();

        assert!(!lookup.is_found());
        assert_eq!(lookup.to_string(), "Key 'ghost' does not exist in the store.");
    }

    #[test]
    fn test_sort_by_size_is_ascending() {
        let mut stats = vec![
            KeyStats::new("big", KeyKind::String, 1, 3_000_000),
            KeyStats::new("small", KeyKind::String, 1, 10),
            KeyStats::new("mid", KeyKind::List, 4, 2_000),
        ];
        sort_by_size(&mut stats);

        let keys: Vec<&str> = stats.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["small", "mid", "big"]);
    }
}
