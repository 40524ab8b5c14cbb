use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::info;

use super::{KvEntry, KvStore, StorageError};

/// SCAN page size hint.
const SCAN_COUNT: usize = 200;

/// String key-value store backed by Redis.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: MultiplexedConnection,
}

impl RedisKvStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(redis_url).map_err(kv_error)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(kv_error)?;
        info!("Redis connection established");
        Ok(Self { conn })
    }
}

fn kv_error(e: redis::RedisError) -> StorageError {
    StorageError::Kv(e.to_string())
}

/// Escapes glob metacharacters so a literal prefix can be used in `SCAN MATCH`.
fn match_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key).await.map_err(kv_error)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await.map_err(kv_error)
    }

    async fn list(&self, prefix: &str, with_values: bool) -> Result<Vec<KvEntry>, StorageError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut keys: Vec<String> = Vec::new();

        loop {
            let (next, page): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(match_pattern(prefix))
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(kv_error)?;
            keys.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may report a key more than once.
        keys.sort();
        keys.dedup();

        if !with_values || keys.is_empty() {
            return Ok(keys
                .into_iter()
                .map(|key| KvEntry { key, value: None })
                .collect());
        }

        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(kv_error)?;

        // A key deleted between SCAN and MGET comes back as nil; drop it.
        Ok(keys
            .into_iter()
            .zip(values)
            .filter_map(|(key, value)| value.map(|v| KvEntry { key, value: Some(v) }))
            .collect())
    }
}
