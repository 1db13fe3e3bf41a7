//! Redis backend implementation
//!
//! One multiplexed connection per backend. Each command clones the
//! connection handle (cheap, same socket) and awaits its reply before
//! returning; nothing is pipelined or retried.

use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Client, RedisError};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

use super::{KeyKind, StoreBackend};
use crate::config::RedisConfig;
use crate::error::StoreError;

/// Redis-backed [`StoreBackend`]
#[derive(Clone)]
pub struct RedisBackend {
    conn: MultiplexedConnection,
    endpoint: String,
}

fn command_failed(command: &'static str) -> impl Fn(RedisError) -> StoreError {
    move |e| StoreError::Backend(format!("Redis {} failed: {}", command, e))
}

impl RedisBackend {
    /// Connect, authenticate and select the configured database.
    ///
    /// Issues a `PING` so an unreachable server or a rejected credential
    /// surfaces here as [`StoreError::Connection`].
    pub async fn connect(config: &RedisConfig) -> Result<Self, StoreError> {
        let endpoint = config.endpoint();
        debug!(endpoint = %endpoint, auth = config.password.is_some(), "Connecting to Redis");

        let client = Client::open(config.url())
            .map_err(|e| StoreError::Connection(format!("Invalid Redis address {}: {}", endpoint, e)))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect to {}: {}", endpoint, e)))?;

        let _: String = ::redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Connection(format!("PING to {} failed: {}", endpoint, e)))?;

        debug!(endpoint = %endpoint, "Redis connection established");

        Ok(Self { conn, endpoint })
    }

    /// `host:port/db` this backend is connected to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn conn(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

#[async_trait]
impl StoreBackend for RedisBackend {
    async fn append(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        self.conn()
            .rpush::<_, _, ()>(key, payload)
            .await
            .map_err(command_failed("RPUSH"))
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError> {
        self.conn()
            .publish::<_, _, ()>(channel, payload)
            .await
            .map_err(command_failed("PUBLISH"))
    }

    async fn set(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        self.conn()
            .set::<_, _, ()>(key, payload)
            .await
            .map_err(command_failed("SET"))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.conn().get(key).await.map_err(command_failed("GET"))
    }

    async fn list_range(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        self.conn()
            .lrange(key, 0, -1)
            .await
            .map_err(command_failed("LRANGE"))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.conn().exists(key).await.map_err(command_failed("EXISTS"))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.conn()
            .del::<_, ()>(key)
            .await
            .map_err(command_failed("DEL"))
    }

    async fn kind(&self, key: &str) -> Result<KeyKind, StoreError> {
        let name: String = ::redis::cmd("TYPE")
            .arg(key)
            .query_async(&mut self.conn())
            .await
            .map_err(command_failed("TYPE"))?;
        Ok(KeyKind::parse(&name))
    }

    async fn string_len(&self, key: &str) -> Result<u64, StoreError> {
        self.conn().strlen(key).await.map_err(command_failed("STRLEN"))
    }

    async fn collection_len(&self, key: &str, kind: &KeyKind) -> Result<u64, StoreError> {
        let mut conn = self.conn();
        match kind {
            KeyKind::List => conn.llen(key).await.map_err(command_failed("LLEN")),
            KeyKind::Set => conn.scard(key).await.map_err(command_failed("SCARD")),
            KeyKind::SortedSet => conn.zcard(key).await.map_err(command_failed("ZCARD")),
            KeyKind::Hash => conn.hlen(key).await.map_err(command_failed("HLEN")),
            other => Err(StoreError::Backend(format!(
                "No length command for kind '{}'",
                other
            ))),
        }
    }

    async fn set_members(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        self.conn()
            .smembers(key)
            .await
            .map_err(command_failed("SMEMBERS"))
    }

    async fn sorted_set_members(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut conn = self.conn();
        let mut members = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            // Reply is [next-cursor, [member, score, member, score, ...]]
            let (next, chunk): (u64, Vec<Vec<u8>>) = ::redis::cmd("ZSCAN")
                .arg(key)
                .arg(cursor)
                .query_async(&mut conn)
                .await
                .map_err(command_failed("ZSCAN"))?;

            members.extend(chunk.into_iter().step_by(2));

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(members)
    }

    async fn hash_entries(&self, key: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let fields: HashMap<Vec<u8>, Vec<u8>> = self
            .conn()
            .hgetall(key)
            .await
            .map_err(command_failed("HGETALL"))?;
        Ok(fields.into_iter().collect())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.conn().keys("*").await.map_err(command_failed("KEYS"))
    }
}
