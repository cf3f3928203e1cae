use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::auth::cache::SessionCache;
use crate::auth::token::TokenConfig;
use crate::course::repository::CourseRepository;
use crate::email::Mailer;
use crate::media::ImageStore;
use crate::user::repository::UserRepository;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
    pub course_repository: Arc<dyn CourseRepository + Send + Sync>,
    pub session_cache: Arc<dyn SessionCache + Send + Sync>,
    pub mailer: Arc<dyn Mailer + Send + Sync>,
    pub image_store: Arc<dyn ImageStore + Send + Sync>,
    pub token_config: TokenConfig,
}

impl AppState {
    pub fn new(
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        course_repository: Arc<dyn CourseRepository + Send + Sync>,
        session_cache: Arc<dyn SessionCache + Send + Sync>,
        mailer: Arc<dyn Mailer + Send + Sync>,
        image_store: Arc<dyn ImageStore + Send + Sync>,
        token_config: TokenConfig,
    ) -> Self {
        Self {
            user_repository,
            course_repository,
            session_cache,
            mailer,
            image_store,
            token_config,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadCredentials(String),

    #[error("{0}")]
    InvalidToken(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("Session not found or has been revoked.")]
    SessionNotFound,

    #[error("{0}")]
    SessionExpired(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Image upload error: {0}")]
    Upload(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::BadCredentials(_)
            | AppError::InvalidToken(_)
            | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_)
            | AppError::SessionNotFound
            | AppError::SessionExpired(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Email(_)
            | AppError::Upload(_)
            | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Standard response envelope: `{success, message?, error?, item?/items?}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T = serde_json::Value> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<T>>,
}

impl<T> ApiResponse<T> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            item: None,
            items: None,
        }
    }

    /// A 200 response that still reports `success: false`, e.g. re-verifying
    /// an already verified account.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            error: None,
            item: None,
            items: None,
        }
    }

    pub fn item(item: T) -> Self {
        Self {
            success: true,
            message: None,
            error: None,
            item: Some(item),
            items: None,
        }
    }

    pub fn item_with_message(message: impl Into<String>, item: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            item: Some(item),
            items: None,
        }
    }

    pub fn items(items: Vec<T>) -> Self {
        Self {
            success: true,
            message: None,
            error: None,
            item: None,
            items: Some(items),
        }
    }
}

/// Schema-checks a request payload before it reaches business logic.
/// Pure function: the web framework never sees the validation rules.
pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload
        .validate()
        .map_err(|errors| AppError::Validation(first_validation_message(&errors)))
}

fn first_validation_message(errors: &ValidationErrors) -> String {
    for (field, field_errors) in errors.field_errors() {
        if let Some(error) = field_errors.first() {
            return match &error.message {
                Some(message) => message.to_string(),
                None => format!("Field '{}' is invalid.", field),
            };
        }
    }
    "Invalid request.".to_string()
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::auth::cache::InMemorySessionCache;
    use crate::auth::cookies::ACCESS_COOKIE_NAME;
    use crate::auth::token::TokenKind;
    use crate::course::repository::InMemoryCourseRepository;
    use crate::email::InMemoryMailer;
    use crate::media::InMemoryImageStore;
    use crate::user::models::UserModel;
    use crate::user::repository::InMemoryUserRepository;

    /// Builder for creating AppState with overrides for testing
    pub struct AppStateBuilder {
        user_repository: Option<Arc<dyn UserRepository + Send + Sync>>,
        course_repository: Option<Arc<dyn CourseRepository + Send + Sync>>,
        session_cache: Option<Arc<dyn SessionCache + Send + Sync>>,
        mailer: Option<Arc<dyn Mailer + Send + Sync>>,
        image_store: Option<Arc<dyn ImageStore + Send + Sync>>,
        token_config: Option<TokenConfig>,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                user_repository: None,
                course_repository: None,
                session_cache: None,
                mailer: None,
                image_store: None,
                token_config: None,
            }
        }

        pub fn with_user_repository(
            mut self,
            repository: Arc<dyn UserRepository + Send + Sync>,
        ) -> Self {
            self.user_repository = Some(repository);
            self
        }

        pub fn with_course_repository(
            mut self,
            repository: Arc<dyn CourseRepository + Send + Sync>,
        ) -> Self {
            self.course_repository = Some(repository);
            self
        }

        pub fn with_session_cache(mut self, cache: Arc<dyn SessionCache + Send + Sync>) -> Self {
            self.session_cache = Some(cache);
            self
        }

        pub fn with_mailer(mut self, mailer: Arc<dyn Mailer + Send + Sync>) -> Self {
            self.mailer = Some(mailer);
            self
        }

        pub fn with_image_store(mut self, store: Arc<dyn ImageStore + Send + Sync>) -> Self {
            self.image_store = Some(store);
            self
        }

        pub fn with_token_config(mut self, config: TokenConfig) -> Self {
            self.token_config = Some(config);
            self
        }

        pub fn build(self) -> AppState {
            AppState {
                user_repository: self
                    .user_repository
                    .unwrap_or_else(|| Arc::new(InMemoryUserRepository::new())),
                course_repository: self
                    .course_repository
                    .unwrap_or_else(|| Arc::new(InMemoryCourseRepository::new())),
                session_cache: self
                    .session_cache
                    .unwrap_or_else(|| Arc::new(InMemorySessionCache::new())),
                mailer: self.mailer.unwrap_or_else(|| Arc::new(InMemoryMailer::new())),
                image_store: self
                    .image_store
                    .unwrap_or_else(|| Arc::new(InMemoryImageStore::new())),
                token_config: self.token_config.unwrap_or_else(TokenConfig::from_env),
            }
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Establishes a session for `user` directly against the cache and
    /// returns a `Cookie` header value for authenticated test requests.
    pub async fn login_cookie(state: &AppState, user: &UserModel) -> String {
        let token = state
            .token_config
            .issue(&user.id, TokenKind::Access)
            .unwrap();
        state.session_cache.put_user(user).await.unwrap();
        format!("{ACCESS_COOKIE_NAME}={token}")
    }

    #[test]
    fn envelope_skips_absent_fields() {
        let response: ApiResponse = ApiResponse::message("done");
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "done");
        assert!(value.get("error").is_none());
        assert!(value.get("item").is_none());
        assert!(value.get("items").is_none());
    }

    #[test]
    fn error_statuses_follow_taxonomy() {
        assert_eq!(
            AppError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthenticated("login".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::SessionNotFound.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("role".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("gone".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("dup".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
