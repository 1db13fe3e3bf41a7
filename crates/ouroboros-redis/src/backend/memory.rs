//! In-process backend
//!
//! Models the five Redis container kinds closely enough for the adapter's
//! semantics (type errors included), records every write in order, and can
//! be told to fail list appends after a number of successes.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};

use super::{KeyKind, StoreBackend};
use crate::error::StoreError;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Debug, Clone)]
enum Entry {
    Str(Vec<u8>),
    List(Vec<Vec<u8>>),
    Set(BTreeSet<Vec<u8>>),
    SortedSet(BTreeMap<Vec<u8>, f64>),
    Hash(BTreeMap<Vec<u8>, Vec<u8>>),
}

impl Entry {
    fn kind(&self) -> KeyKind {
        match self {
            Entry::Str(_) => KeyKind::String,
            Entry::List(_) => KeyKind::List,
            Entry::Set(_) => KeyKind::Set,
            Entry::SortedSet(_) => KeyKind::SortedSet,
            Entry::Hash(_) => KeyKind::Hash,
        }
    }
}

/// A write issued against the backend, in issue order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Append { key: String, payload: String },
    Publish { channel: String, payload: String },
    Set { key: String, payload: String },
    Delete { key: String },
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    log: Vec<WriteOp>,
    append_budget: Option<usize>,
}

/// In-memory [`StoreBackend`]
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `successes` more appends through, then fail every append after
    pub fn fail_appends_after(&self, successes: usize) {
        self.state.lock().append_budget = Some(successes);
    }

    /// Every write so far, in order
    pub fn writes(&self) -> Vec<WriteOp> {
        self.state.lock().log.clone()
    }

    /// Payloads published on `channel`, in order
    pub fn published(&self, channel: &str) -> Vec<String> {
        self.state
            .lock()
            .log
            .iter()
            .filter_map(|op| match op {
                WriteOp::Publish { channel: c, payload } if c == channel => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    /// Store raw bytes as a string value
    pub fn set_raw(&self, key: &str, value: impl Into<Vec<u8>>) {
        self.state
            .lock()
            .entries
            .insert(key.to_string(), Entry::Str(value.into()));
    }

    /// Append raw bytes to a list, bypassing the write log
    pub fn push_raw(&self, key: &str, value: impl Into<Vec<u8>>) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        match state
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(Vec::new()))
        {
            Entry::List(items) => {
                items.push(value.into());
                Ok(())
            }
            _ => Err(StoreError::Backend(WRONGTYPE.to_string())),
        }
    }

    /// `SADD`
    pub fn sadd(&self, key: &str, member: impl Into<Vec<u8>>) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        match state
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(BTreeSet::new()))
        {
            Entry::Set(members) => {
                members.insert(member.into());
                Ok(())
            }
            _ => Err(StoreError::Backend(WRONGTYPE.to_string())),
        }
    }

    /// `ZADD`
    pub fn zadd(&self, key: &str, member: impl Into<Vec<u8>>, score: f64) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        match state
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::SortedSet(BTreeMap::new()))
        {
            Entry::SortedSet(members) => {
                members.insert(member.into(), score);
                Ok(())
            }
            _ => Err(StoreError::Backend(WRONGTYPE.to_string())),
        }
    }

    /// `HSET`
    pub fn hset(
        &self,
        key: &str,
        field: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        match state
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(BTreeMap::new()))
        {
            Entry::Hash(fields) => {
                fields.insert(field.into(), value.into());
                Ok(())
            }
            _ => Err(StoreError::Backend(WRONGTYPE.to_string())),
        }
    }
}

#[async_trait]
impl StoreBackend for InMemoryBackend {
    async fn append(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();

        if let Some(budget) = state.append_budget.as_mut() {
            if *budget == 0 {
                return Err(StoreError::Backend(
                    "Redis RPUSH failed: injected failure".to_string(),
                ));
            }
            *budget -= 1;
        }

        match state
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(Vec::new()))
        {
            Entry::List(items) => items.push(payload.as_bytes().to_vec()),
            _ => return Err(StoreError::Backend(WRONGTYPE.to_string())),
        }

        state.log.push(WriteOp::Append {
            key: key.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError> {
        self.state.lock().log.push(WriteOp::Publish {
            channel: channel.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }

    async fn set(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state
            .entries
            .insert(key.to_string(), Entry::Str(payload.as_bytes().to_vec()));
        state.log.push(WriteOp::Set {
            key: key.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self.state.lock().entries.get(key) {
            None => Ok(None),
            Some(Entry::Str(value)) => Ok(Some(value.clone())),
            Some(_) => Err(StoreError::Backend(WRONGTYPE.to_string())),
        }
    }

    async fn list_range(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        match self.state.lock().entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::List(items)) => Ok(items.clone()),
            Some(_) => Err(StoreError::Backend(WRONGTYPE.to_string())),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.state.lock().entries.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.entries.remove(key);
        state.log.push(WriteOp::Delete {
            key: key.to_string(),
        });
        Ok(())
    }

    async fn kind(&self, key: &str) -> Result<KeyKind, StoreError> {
        Ok(self
            .state
            .lock()
            .entries
            .get(key)
            .map(Entry::kind)
            .unwrap_or(KeyKind::None))
    }

    async fn string_len(&self, key: &str) -> Result<u64, StoreError> {
        match self.state.lock().entries.get(key) {
            None => Ok(0),
            Some(Entry::Str(value)) => Ok(value.len() as u64),
            Some(_) => Err(StoreError::Backend(WRONGTYPE.to_string())),
        }
    }

    async fn collection_len(&self, key: &str, kind: &KeyKind) -> Result<u64, StoreError> {
        let state = self.state.lock();
        let len = match (state.entries.get(key), kind) {
            (None, _) => 0,
            (Some(Entry::List(items)), KeyKind::List) => items.len(),
            (Some(Entry::Set(members)), KeyKind::Set) => members.len(),
            (Some(Entry::SortedSet(members)), KeyKind::SortedSet) => members.len(),
            (Some(Entry::Hash(fields)), KeyKind::Hash) => fields.len(),
            (Some(_), kind) if !kind.is_collection() => {
                return Err(StoreError::Backend(format!(
                    "No length command for kind '{}'",
                    kind
                )))
            }
            (Some(_), _) => return Err(StoreError::Backend(WRONGTYPE.to_string())),
        };
        Ok(len as u64)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        match self.state.lock().entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(StoreError::Backend(WRONGTYPE.to_string())),
        }
    }

    async fn sorted_set_members(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        match self.state.lock().entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::SortedSet(members)) => Ok(members.keys().cloned().collect()),
            Some(_) => Err(StoreError::Backend(WRONGTYPE.to_string())),
        }
    }

    async fn hash_entries(&self, key: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        match self.state.lock().entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::Hash(fields)) => Ok(fields
                .iter()
                .map(|(f, v)| (f.clone(), v.clone()))
                .collect()),
            Some(_) => Err(StoreError::Backend(WRONGTYPE.to_string())),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.state.lock().entries.keys().cloned().collect())
    }
}
