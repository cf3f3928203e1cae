use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::models::UserModel;
use super::repository::UserRepository;
use super::types::{ChangePasswordRequest, RegisterRequest, UpdateProfileRequest};
use crate::auth::cache::SessionCache;
use crate::auth::token::{TokenConfig, TokenKind};
use crate::email::{activation_email_html, Mailer};
use crate::media::ImageStore;
use crate::shared::AppError;

/// Service for registration and profile management
pub struct UserService {
    users: Arc<dyn UserRepository + Send + Sync>,
    cache: Arc<dyn SessionCache + Send + Sync>,
    mailer: Arc<dyn Mailer + Send + Sync>,
    images: Arc<dyn ImageStore + Send + Sync>,
    tokens: TokenConfig,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository + Send + Sync>,
        cache: Arc<dyn SessionCache + Send + Sync>,
        mailer: Arc<dyn Mailer + Send + Sync>,
        images: Arc<dyn ImageStore + Send + Sync>,
        tokens: TokenConfig,
    ) -> Self {
        Self {
            users,
            cache,
            mailer,
            images,
            tokens,
        }
    }

    /// Creates an inactive user and sends the activation email. A failed send
    /// does not roll the user back; the account can re-request activation by
    /// registering support flows outside this service.
    #[instrument(skip(self, payload))]
    pub async fn register(&self, payload: RegisterRequest) -> Result<UserModel, AppError> {
        if self.users.find_by_email(&payload.email).await?.is_some() {
            return Err(AppError::Conflict(
                "User with this email already exists.".to_string(),
            ));
        }

        let user = UserModel::create(payload.name, payload.email, payload.password)?;
        self.users.create_user(&user).await?;
        info!(user_id = %user.id, "User registered");

        let activation_token = self.tokens.issue(&user.id, TokenKind::Activation)?;
        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let activation_link = format!("{base_url}/verify-account/{activation_token}");
        let html = activation_email_html(&user.name, &activation_link);

        if let Err(error) = self
            .mailer
            .send(&user.email, "Activate your account", html)
            .await
        {
            warn!(error = %error, email = %user.email, "Failed to send activation email");
        }

        Ok(user)
    }

    /// Applies a partial profile update and refreshes the cache mirror
    #[instrument(skip(self, payload))]
    pub async fn update_profile(
        &self,
        user_id: &str,
        payload: UpdateProfileRequest,
    ) -> Result<UserModel, AppError> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        if let Some(name) = payload.name {
            user.name = name;
        }

        if let Some(image) = payload.avatar {
            if let Some(previous) = &user.avatar {
                if !previous.public_id.is_empty() {
                    if let Err(error) = self.images.destroy(&previous.public_id).await {
                        warn!(
                            error = %error,
                            public_id = %previous.public_id,
                            "Failed to remove previous avatar"
                        );
                    }
                }
            }
            user.avatar = Some(self.images.upload(&image, "avatars").await?);
        }

        user.updated_at = Utc::now();
        self.users.update_user(&user).await?;
        self.cache.put_user(&user).await?;

        info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }

    /// Verifies the current password against the canonical record, re-hashes
    /// the new one and refreshes the cache mirror
    #[instrument(skip(self, payload))]
    pub async fn change_password(
        &self,
        user_id: &str,
        payload: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        if !user.verify_password(&payload.current_password)? {
            return Err(AppError::BadCredentials(
                "Current password is incorrect.".to_string(),
            ));
        }

        user.set_password(&payload.new_password)?;
        self.users.update_user(&user).await?;
        self.cache.put_user(&user).await?;

        info!(user_id = %user.id, "Password changed");
        Ok(())
    }
}
