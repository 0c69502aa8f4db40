use async_trait::async_trait;
use redis::{AsyncCommands, RedisResult};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use boxoffice_core::{BoxError, Event, EventCache, LockToken, SeatLock};

const EVENT_CACHE_PREFIX: &str = "event:";
const SEAT_LOCK_PREFIX: &str = "seat:lock:";

/// Cache key for one event's snapshot.
pub fn event_key(event_id: Uuid) -> String {
    format!("{}{}", EVENT_CACHE_PREFIX, event_id)
}

/// Cache key for the available-events list snapshot.
pub fn available_events_key() -> String {
    format!("{}available", EVENT_CACHE_PREFIX)
}

fn seat_lock_key(event_id: Uuid) -> String {
    format!("{}{}", SEAT_LOCK_PREFIX, event_id)
}

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    async fn conn(&self) -> RedisResult<redis::aio::MultiplexedConnection> {
        self.client.get_multiplexed_async_connection().await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, BoxError> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set_json<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), BoxError> {
        let mut conn = self.conn().await?;
        let raw = serde_json::to_string(value)?;
        conn.set_ex::<_, _, ()>(key, raw, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BoxError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: i64,
        window_seconds: i64,
    ) -> RedisResult<bool> {
        let mut conn = self.conn().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

#[async_trait]
impl EventCache for RedisClient {
    async fn event(&self, event_id: Uuid) -> Result<Option<Event>, BoxError> {
        self.get_json(&event_key(event_id)).await
    }

    async fn put_event(&self, event: &Event, ttl: Duration) -> Result<(), BoxError> {
        self.set_json(&event_key(event.id), event, ttl).await
    }

    async fn evict_event(&self, event_id: Uuid) -> Result<(), BoxError> {
        self.delete(&event_key(event_id)).await
    }

    async fn available_events(&self) -> Result<Option<Vec<Event>>, BoxError> {
        self.get_json(&available_events_key()).await
    }

    async fn put_available_events(
        &self,
        events: &[Event],
        ttl: Duration,
    ) -> Result<(), BoxError> {
        self.set_json(&available_events_key(), &events, ttl).await
    }

    async fn evict_available_events(&self) -> Result<(), BoxError> {
        self.delete(&available_events_key()).await
    }
}

#[async_trait]
impl SeatLock for RedisClient {
    async fn try_acquire(
        &self,
        event_id: Uuid,
        ttl: Duration,
    ) -> Result<Option<LockToken>, BoxError> {
        let mut conn = self.conn().await?;
        let token = Uuid::new_v4().simple().to_string();

        // SET NX: only set if the key does not exist
        let result: Option<String> = redis::cmd("SET")
            .arg(seat_lock_key(event_id))
            .arg(&token)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;

        Ok(result.map(|_| LockToken::new(token)))
    }

    async fn release(&self, event_id: Uuid, token: &LockToken) -> Result<(), BoxError> {
        let mut conn = self.conn().await?;

        // Compare-and-delete: only the holder's token may delete the key,
        // so an expired holder cannot release a later acquisition.
        let script = redis::Script::new(
            r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                return redis.call("DEL", KEYS[1])
            else
                return 0
            end
        "#,
        );

        let released: i32 = script
            .key(seat_lock_key(event_id))
            .arg(token.value())
            .invoke_async(&mut conn)
            .await?;

        if released == 0 {
            warn!(%event_id, "seat lock was already gone at release");
        }
        Ok(())
    }
}
