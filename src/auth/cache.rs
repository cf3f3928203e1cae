use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::shared::AppError;
use crate::user::models::UserModel;

/// Key-value mirror of logged-in users. One entry per active user id, value
/// is the serialized user record. Presence of the entry is what keeps a
/// refresh token usable.
#[async_trait]
pub trait SessionCache {
    async fn put_user(&self, user: &UserModel) -> Result<(), AppError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<UserModel>, AppError>;
    /// Idempotent: deleting an absent entry is a no-op.
    async fn delete_user(&self, user_id: &str) -> Result<(), AppError>;
}

/// In-memory implementation of SessionCache for development and testing
///
/// Values are stored as serialized JSON so the round-trip matches what the
/// Redis implementation does. Data is lost when the application restarts.
pub struct InMemorySessionCache {
    entries: Mutex<HashMap<String, String>>,
}

impl Default for InMemorySessionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Checks if an entry exists by user id (useful for assertions in tests)
    pub fn has_entry(&self, user_id: &str) -> bool {
        self.entries.lock().unwrap().contains_key(user_id)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    #[instrument(skip(self, user))]
    async fn put_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, "Writing session entry to memory");

        let json = serde_json::to_string(user).map_err(|e| AppError::Cache(e.to_string()))?;
        self.entries.lock().unwrap().insert(user.id.clone(), json);

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<Option<UserModel>, AppError> {
        debug!(user_id = %user_id, "Fetching session entry from memory");

        let json = self.entries.lock().unwrap().get(user_id).cloned();
        match json {
            Some(json) => {
                let user =
                    serde_json::from_str(&json).map_err(|e| AppError::Cache(e.to_string()))?;
                Ok(Some(user))
            }
            None => {
                debug!(user_id = %user_id, "Session entry not found in memory");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        debug!(user_id = %user_id, "Deleting session entry from memory");

        self.entries.lock().unwrap().remove(user_id);
        Ok(())
    }
}

/// Redis implementation of the session cache
pub struct RedisSessionCache {
    connection: ConnectionManager,
}

impl RedisSessionCache {
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(url).map_err(|e| AppError::Cache(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    #[instrument(skip(self, user))]
    async fn put_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, "Writing session entry to redis");

        let json = serde_json::to_string(user).map_err(|e| AppError::Cache(e.to_string()))?;
        let mut connection = self.connection.clone();
        let _: () = connection.set(&user.id, json).await.map_err(|e| {
            warn!(error = %e, user_id = %user.id, "Failed to write session entry to redis");
            AppError::Cache(e.to_string())
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<Option<UserModel>, AppError> {
        debug!(user_id = %user_id, "Fetching session entry from redis");

        let mut connection = self.connection.clone();
        let json: Option<String> = connection.get(user_id).await.map_err(|e| {
            warn!(error = %e, user_id = %user_id, "Failed to fetch session entry from redis");
            AppError::Cache(e.to_string())
        })?;

        match json {
            Some(json) => {
                let user =
                    serde_json::from_str(&json).map_err(|e| AppError::Cache(e.to_string()))?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        debug!(user_id = %user_id, "Deleting session entry from redis");

        let mut connection = self.connection.clone();
        let _: i64 = connection.del(user_id).await.map_err(|e| {
            warn!(error = %e, user_id = %user_id, "Failed to delete session entry from redis");
            AppError::Cache(e.to_string())
        })?;

        Ok(())
    }
}
