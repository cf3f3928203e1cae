use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::cache::SessionCache;
use super::token::{TokenConfig, TokenKind};
use super::types::{SessionTokens, SocialIdentity};
use crate::media::StoredImage;
use crate::shared::AppError;
use crate::user::models::UserModel;
use crate::user::repository::UserRepository;

/// Outcome of an account-verification attempt
#[derive(Debug, PartialEq, Eq)]
pub enum ActivationOutcome {
    Activated,
    AlreadyActive,
}

/// Service for session establishment, refresh, logout and account activation
pub struct AuthService {
    users: Arc<dyn UserRepository + Send + Sync>,
    cache: Arc<dyn SessionCache + Send + Sync>,
    tokens: TokenConfig,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository + Send + Sync>,
        cache: Arc<dyn SessionCache + Send + Sync>,
        tokens: TokenConfig,
    ) -> Self {
        Self {
            users,
            cache,
            tokens,
        }
    }

    /// Issues the access/refresh pair and mirrors the user into the cache.
    /// The cache write and the caller's cookie set are not transactional; a
    /// crash in between forces a re-login on the next refresh.
    #[instrument(skip(self, user))]
    pub async fn establish_session(&self, user: &UserModel) -> Result<SessionTokens, AppError> {
        let access_token = self.tokens.issue(&user.id, TokenKind::Access)?;
        let refresh_token = self.tokens.issue(&user.id, TokenKind::Refresh)?;

        self.cache.put_user(user).await?;
        info!(user_id = %user.id, "Session established");

        Ok(SessionTokens {
            access_token,
            refresh_token,
        })
    }

    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(UserModel, SessionTokens), AppError> {
        let user = self.users.find_by_email(email).await?.ok_or_else(|| {
            debug!("Login attempt for unknown email");
            AppError::BadCredentials("Invalid email or password.".to_string())
        })?;

        if !user.verify_password(password)? {
            debug!(user_id = %user.id, "Login attempt with wrong password");
            return Err(AppError::BadCredentials(
                "Invalid email or password.".to_string(),
            ));
        }

        let tokens = self.establish_session(&user).await?;
        Ok((user, tokens))
    }

    /// Locates or creates the user for a federated identity payload, then
    /// establishes a session. The identity claims are taken as-is; no
    /// provider assertion is verified here.
    #[instrument(skip(self, identity))]
    pub async fn social_login(
        &self,
        identity: SocialIdentity,
    ) -> Result<(UserModel, SessionTokens), AppError> {
        let user = match self.users.find_by_email(&identity.email).await? {
            Some(user) => user,
            None => {
                let mut user = UserModel::create(
                    identity.name,
                    identity.email,
                    Uuid::new_v4().to_string(),
                )?;
                user.is_active = true;
                if let Some(url) = identity.avatar {
                    // Provider-hosted image: nothing to destroy on replacement
                    user.avatar = Some(StoredImage {
                        public_id: String::new(),
                        url,
                    });
                }

                self.users.create_user(&user).await?;
                info!(user_id = %user.id, "Created user from social identity");
                user
            }
        };

        let tokens = self.establish_session(&user).await?;
        Ok((user, tokens))
    }

    /// Rotates the session off a refresh token. The cache entry is the proof
    /// the session is still alive; the canonical record is re-fetched in case
    /// the cache is stale or the user was deleted.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<(UserModel, SessionTokens), AppError> {
        let user_id = self.tokens.verify(refresh_token, TokenKind::Refresh)?;

        if self.cache.get_user(&user_id).await?.is_none() {
            warn!(user_id = %user_id, "Refresh token is valid but the session entry is gone");
            return Err(AppError::SessionExpired(
                "Session has expired, please login again.".to_string(),
            ));
        }

        let user = match self.users.find_by_id(&user_id).await? {
            Some(user) => user,
            None => {
                // The canonical record is gone; drop the stale mirror with it
                self.cache.delete_user(&user_id).await?;
                warn!(user_id = %user_id, "Evicted session entry for deleted user");
                return Err(AppError::Unauthenticated("User not found.".to_string()));
            }
        };

        let tokens = self.establish_session(&user).await?;
        Ok((user, tokens))
    }

    /// Best-effort logout: drops the cache entry when the access token still
    /// decodes, and always succeeds. An already-issued access token stays
    /// cryptographically valid until its natural expiry.
    #[instrument(skip(self, access_token))]
    pub async fn logout(&self, access_token: Option<&str>) -> Result<(), AppError> {
        let Some(token) = access_token else {
            debug!("Logout without an access token cookie");
            return Ok(());
        };

        match self.tokens.verify(token, TokenKind::Access) {
            Ok(user_id) => {
                self.cache.delete_user(&user_id).await?;
                info!(user_id = %user_id, "Session entry deleted");
            }
            Err(e) => {
                debug!(error = %e, "Logout with an undecodable access token");
            }
        }

        Ok(())
    }

    /// Activates the account the token was issued for
    #[instrument(skip(self, token))]
    pub async fn verify_account(&self, token: &str) -> Result<ActivationOutcome, AppError> {
        let user_id = self
            .tokens
            .verify(token, TokenKind::Activation)
            .map_err(|_| AppError::InvalidToken("Invalid activation token.".to_string()))?;

        let mut user = self
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        if user.is_active {
            debug!(user_id = %user.id, "Account is already verified");
            return Ok(ActivationOutcome::AlreadyActive);
        }

        user.is_active = true;
        user.updated_at = chrono::Utc::now();
        self.users.update_user(&user).await?;

        info!(user_id = %user.id, "Account verified");
        Ok(ActivationOutcome::Activated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::cache::InMemorySessionCache;
    use crate::user::repository::InMemoryUserRepository;

    fn service() -> (
        AuthService,
        Arc<InMemoryUserRepository>,
        Arc<InMemorySessionCache>,
    ) {
        let users = Arc::new(InMemoryUserRepository::new());
        let cache = Arc::new(InMemorySessionCache::new());
        let service = AuthService::new(users.clone(), cache.clone(), TokenConfig::from_env());
        (service, users, cache)
    }

    async fn seed_user(users: &InMemoryUserRepository) -> UserModel {
        let user = UserModel::create(
            "Test User".to_string(),
            "a@x.com".to_string(),
            "12345678".to_string(),
        )
        .unwrap();
        users.create_user(&user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn test_login_success_creates_cache_entry() {
        let (service, users, cache) = service();
        let user = seed_user(&users).await;

        let (logged_in, tokens) = service.login("a@x.com", "12345678").await.unwrap();

        assert_eq!(logged_in.id, user.id);
        assert!(tokens.access_token.contains('.'));
        assert!(tokens.refresh_token.contains('.'));
        assert!(cache.has_entry(&user.id));
    }

    #[tokio::test]
    async fn test_login_wrong_password_leaves_no_session() {
        let (service, users, cache) = service();
        seed_user(&users).await;

        let result = service.login("a@x.com", "wrong-password").await;

        assert!(matches!(result, Err(AppError::BadCredentials(_))));
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let (service, _, _) = service();

        let result = service.login("nobody@x.com", "12345678").await;
        assert!(matches!(result, Err(AppError::BadCredentials(_))));
    }

    #[tokio::test]
    async fn test_social_login_creates_active_user() {
        let (service, users, cache) = service();

        let identity = SocialIdentity {
            email: "social@x.com".to_string(),
            name: "Social User".to_string(),
            avatar: Some("https://idp.example/avatar.png".to_string()),
        };

        let (user, _tokens) = service.social_login(identity).await.unwrap();

        assert!(user.is_active);
        assert_eq!(user.avatar.as_ref().unwrap().url, "https://idp.example/avatar.png");
        assert!(users.find_by_email("social@x.com").await.unwrap().is_some());
        assert!(cache.has_entry(&user.id));
    }

    #[tokio::test]
    async fn test_social_login_reuses_existing_user() {
        let (service, users, _) = service();
        let existing = seed_user(&users).await;

        let identity = SocialIdentity {
            email: existing.email.clone(),
            name: "Different Name".to_string(),
            avatar: None,
        };

        let (user, _) = service.social_login(identity).await.unwrap();

        assert_eq!(user.id, existing.id);
        assert_eq!(users.user_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_without_cache_entry_fails() {
        let (service, users, cache) = service();
        let user = seed_user(&users).await;

        let (_, tokens) = service.login("a@x.com", "12345678").await.unwrap();
        cache.delete_user(&user.id).await.unwrap();

        let result = service.refresh(&tokens.refresh_token).await;
        assert!(matches!(result, Err(AppError::SessionExpired(_))));
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_user_evicts_cache_entry() {
        let (service, users, cache) = service();
        let user = seed_user(&users).await;

        let (_, tokens) = service.login("a@x.com", "12345678").await.unwrap();
        users.remove_user(&user.id);

        let result = service.refresh(&tokens.refresh_token).await;

        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
        assert!(!cache.has_entry(&user.id));
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let (service, users, _) = service();
        seed_user(&users).await;

        let (_, tokens) = service.login("a@x.com", "12345678").await.unwrap();
        let (user, new_tokens) = service.refresh(&tokens.refresh_token).await.unwrap();

        assert_eq!(user.email, "a@x.com");
        assert!(!new_tokens.access_token.is_empty());
        assert!(!new_tokens.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (service, users, cache) = service();
        let user = seed_user(&users).await;

        let (_, tokens) = service.login("a@x.com", "12345678").await.unwrap();
        assert!(cache.has_entry(&user.id));

        service.logout(Some(&tokens.access_token)).await.unwrap();
        assert!(!cache.has_entry(&user.id));

        // Second logout with the same token, and one with no token at all
        service.logout(Some(&tokens.access_token)).await.unwrap();
        service.logout(None).await.unwrap();
    }

    #[tokio::test]
    async fn test_verify_account_activates_once() {
        let (service, users, _) = service();
        let user = seed_user(&users).await;
        assert!(!user.is_active);

        let token = TokenConfig::from_env()
            .issue(&user.id, TokenKind::Activation)
            .unwrap();

        let outcome = service.verify_account(&token).await.unwrap();
        assert_eq!(outcome, ActivationOutcome::Activated);
        assert!(users.find_by_id(&user.id).await.unwrap().unwrap().is_active);

        // Same token again: no state change, distinct outcome
        let outcome = service.verify_account(&token).await.unwrap();
        assert_eq!(outcome, ActivationOutcome::AlreadyActive);
    }

    #[tokio::test]
    async fn test_verify_account_rejects_bad_token() {
        let (service, _, _) = service();

        let result = service.verify_account("not.a.token").await;
        assert!(matches!(result, Err(AppError::InvalidToken(_))));
    }
}
