use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{UserModel, UserRole};
use crate::media::StoredImage;
use crate::shared::AppError;

/// Trait for user persistence operations
#[async_trait]
pub trait UserRepository {
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError>;
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserModel>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError>;
    async fn update_user(&self, user: &UserModel) -> Result<(), AppError>;
}

/// In-memory implementation of UserRepository for development and testing
///
/// Enforces the unique-email rule the database index provides in production.
/// Data is lost when the application restarts.
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, UserModel>>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the current number of users in the repository
    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    /// Drops a user outright, simulating out-of-band deletion
    pub fn remove_user(&self, user_id: &str) {
        self.users.lock().unwrap().remove(user_id);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, email = %user.email, "Creating user in memory");

        let mut users = self.users.lock().unwrap();
        if users.values().any(|existing| existing.email == user.email) {
            warn!(email = %user.email, "Email already registered");
            return Err(AppError::Conflict(
                "User with this email already exists.".to_string(),
            ));
        }
        if users.contains_key(&user.id) {
            return Err(AppError::Database("User already exists".to_string()));
        }
        users.insert(user.id.clone(), user.clone());

        debug!(user_id = %user.id, "User created successfully in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserModel>, AppError> {
        debug!(user_id = %user_id, "Fetching user from memory");

        let users = self.users.lock().unwrap();
        Ok(users.get(user_id).cloned())
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        debug!(email = %email, "Fetching user by email from memory");

        let users = self.users.lock().unwrap();
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    #[instrument(skip(self, user))]
    async fn update_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, "Updating user in memory");

        let mut users = self.users.lock().unwrap();
        if !users.contains_key(&user.id) {
            warn!(user_id = %user.id, "User not found for update in memory");
            return Err(AppError::NotFound("User not found.".to_string()));
        }
        users.insert(user.id.clone(), user.clone());

        Ok(())
    }
}

/// PostgreSQL implementation of the user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &PgRow) -> UserModel {
    UserModel {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        avatar: row
            .get::<Option<Json<StoredImage>>, _>("avatar")
            .map(|Json(image)| image),
        role: row
            .get::<String, _>("role")
            .parse::<UserRole>()
            .unwrap_or_default(),
        is_active: row.get("is_active"),
        courses: row.get("courses"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn map_user_write_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        // 23505 = unique_violation, the users.email index
        if db.code().as_deref() == Some("23505") {
            return AppError::Conflict("User with this email already exists.".to_string());
        }
    }
    AppError::Database(e.to_string())
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, email = %user.email, "Creating user in database");

        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, avatar, role, is_active, courses, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.avatar.as_ref().map(Json))
        .bind(user.role.to_string())
        .bind(user.is_active)
        .bind(&user.courses)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create user in database");
            map_user_write_error(e)
        })?;

        debug!(user_id = %user.id, "User created successfully in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserModel>, AppError> {
        debug!(user_id = %user_id, "Fetching user from database");

        let row = sqlx::query(
            "SELECT id, name, email, password_hash, avatar, role, is_active, courses, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %user_id, "Failed to fetch user from database");
            AppError::Database(e.to_string())
        })?;

        Ok(row.map(|row| row_to_user(&row)))
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        debug!(email = %email, "Fetching user by email from database");

        let row = sqlx::query(
            "SELECT id, name, email, password_hash, avatar, role, is_active, courses, created_at, updated_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch user by email from database");
            AppError::Database(e.to_string())
        })?;

        Ok(row.map(|row| row_to_user(&row)))
    }

    #[instrument(skip(self, user))]
    async fn update_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, "Updating user in database");

        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, password_hash = $4, avatar = $5, role = $6, \
             is_active = $7, courses = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.avatar.as_ref().map(Json))
        .bind(user.role.to_string())
        .bind(user.is_active)
        .bind(&user.courses)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %user.id, "Failed to update user in database");
            map_user_write_error(e)
        })?;

        if result.rows_affected() == 0 {
            warn!(user_id = %user.id, "User not found for update");
            return Err(AppError::NotFound("User not found.".to_string()));
        }

        Ok(())
    }
}
