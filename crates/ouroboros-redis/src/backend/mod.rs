//! Store backend implementations
//!
//! Provides the command-level trait the adapter is written against, plus a
//! Redis implementation and an in-process one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StoreError;

/// Container kind the store reports for a key (`TYPE`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum KeyKind {
    String,
    List,
    Set,
    SortedSet,
    Hash,
    /// Key does not exist
    None,
    /// A kind this layer does not size (e.g. `stream`)
    Other(String),
}

impl KeyKind {
    /// Parse the store's type name
    pub fn parse(name: &str) -> Self {
        match name {
            "string" => KeyKind::String,
            "list" => KeyKind::List,
            "set" => KeyKind::Set,
            "zset" => KeyKind::SortedSet,
            "hash" => KeyKind::Hash,
            "none" => KeyKind::None,
            other => KeyKind::Other(other.to_string()),
        }
    }

    /// The store's type name
    pub fn as_str(&self) -> &str {
        match self {
            KeyKind::String => "string",
            KeyKind::List => "list",
            KeyKind::Set => "set",
            KeyKind::SortedSet => "zset",
            KeyKind::Hash => "hash",
            KeyKind::None => "none",
            KeyKind::Other(name) => name,
        }
    }

    /// One of the collection kinds whose length is queried by kind
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            KeyKind::List | KeyKind::Set | KeyKind::SortedSet | KeyKind::Hash
        )
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<KeyKind> for String {
    fn from(kind: KeyKind) -> Self {
        kind.as_str().to_string()
    }
}

impl From<String> for KeyKind {
    fn from(name: String) -> Self {
        KeyKind::parse(&name)
    }
}

/// Command-level access to a key/value store with pub/sub.
///
/// Every method is a single request/response against the store (or, for
/// `sorted_set_members`, a full cursor scan). Implementations add no retries,
/// batching or locking.
#[async_trait]
pub trait StoreBackend: Send + Sync + 'static {
    /// Append to the tail of a list (`RPUSH`)
    async fn append(&self, key: &str, payload: &str) -> Result<(), StoreError>;

    /// Emit on a pub/sub channel (`PUBLISH`)
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError>;

    /// Overwrite a string value (`SET`)
    async fn set(&self, key: &str, payload: &str) -> Result<(), StoreError>;

    /// Read a string value (`GET`)
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Every element of a list (`LRANGE key 0 -1`)
    async fn list_range(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError>;

    /// `EXISTS`
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// `DEL`
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// `TYPE`
    async fn kind(&self, key: &str) -> Result<KeyKind, StoreError>;

    /// Byte length of a string value (`STRLEN`)
    async fn string_len(&self, key: &str) -> Result<u64, StoreError>;

    /// Item count of a collection: `LLEN`, `SCARD`, `ZCARD` or `HLEN` by kind
    async fn collection_len(&self, key: &str, kind: &KeyKind) -> Result<u64, StoreError>;

    /// Every member of a set (`SMEMBERS`)
    async fn set_members(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Every member name of a sorted set, scores dropped (`ZSCAN` until the cursor wraps)
    async fn sorted_set_members(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Every field/value pair of a hash (`HGETALL`)
    async fn hash_entries(&self, key: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    /// Every key in the logical database (`KEYS *`)
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

pub mod memory;

pub use memory::{InMemoryBackend, WriteOp};

// Redis backend implementation
#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "redis")]
pub use self::redis::RedisBackend;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_kind_parse_round_trip() {
        for name in ["string", "list", "set", "zset", "hash", "none", "stream"] {
            assert_eq!(KeyKind::parse(name).as_str(), name);
        }
        assert_eq!(KeyKind::parse("zset"), KeyKind::SortedSet);
        assert_eq!(KeyKind::parse("stream"), KeyKind::Other("stream".to_string()));
    }

    #[test]
    fn test_key_kind_serializes_as_type_name() {
        let json = serde_json::to_string(&KeyKind::SortedSet).unwrap();
        assert_eq!(json, "\"zset\"");
        let kind: KeyKind = serde_json::from_str("\"hash\"").unwrap();
        assert_eq!(kind, KeyKind::Hash);
    }

    #[test]
    fn test_collection_kinds() {
        assert!(KeyKind::List.is_collection());
        assert!(KeyKind::Hash.is_collection());
        assert!(!KeyKind::String.is_collection());
        assert!(!KeyKind::Other("stream".into()).is_collection());
    }
}
