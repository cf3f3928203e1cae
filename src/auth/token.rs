use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, instrument};

use super::types::TokenClaims;
use crate::shared::AppError;

/// Which credential a token represents. Access and refresh tokens are signed
/// with different secrets; activation tokens share the access secret but get
/// a much shorter lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
    Activation,
}

/// Configuration for JWT token operations
#[derive(Clone)]
pub struct TokenConfig {
    access_secret: String,
    refresh_secret: String,
    access_ttl_minutes: i64,
    refresh_ttl_days: i64,
    activation_ttl_minutes: i64,
}

impl TokenConfig {
    pub fn from_env() -> Self {
        let access_ttl_minutes = std::env::var("ACCESS_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(15);
        let refresh_ttl_days = std::env::var("REFRESH_TOKEN_TTL_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(7);
        let activation_ttl_minutes = std::env::var("ACTIVATION_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Self {
            access_secret: std::env::var("ACCESS_TOKEN_SECRET")
                .unwrap_or_else(|_| "access-secret-change-in-production".to_string()),
            refresh_secret: std::env::var("REFRESH_TOKEN_SECRET")
                .unwrap_or_else(|_| "refresh-secret-change-in-production".to_string()),
            access_ttl_minutes,
            refresh_ttl_days,
            activation_ttl_minutes,
        }
    }

    fn secret(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access | TokenKind::Activation => self.access_secret.as_ref(),
            TokenKind::Refresh => self.refresh_secret.as_ref(),
        }
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => Duration::minutes(self.access_ttl_minutes),
            TokenKind::Refresh => Duration::days(self.refresh_ttl_days),
            TokenKind::Activation => Duration::minutes(self.activation_ttl_minutes),
        }
    }

    /// Creates a new JWT carrying the user id, expiring per the token kind
    #[instrument(skip(self, user_id))]
    pub fn issue(&self, user_id: &str, kind: TokenKind) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = (now + self.ttl(kind)).timestamp() as usize;

        debug!(?kind, exp_timestamp = exp, "Issuing token");

        let claims = TokenClaims {
            id: user_id.to_string(),
            exp,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret(kind)),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode token");
            AppError::InvalidToken(e.to_string())
        })
    }

    /// Validates a token against the kind's secret and returns the embedded
    /// user id
    #[instrument(skip(self, token))]
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<String, AppError> {
        debug!(?kind, "Decoding and validating token");

        decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret(kind)),
            &Validation::default(),
        )
        .map(|data| {
            debug!(user_id = %data.claims.id, exp = data.claims.exp, "Token decoded successfully");
            data.claims.id
        })
        .map_err(|e| {
            debug!(error = %e, "Failed to decode token");
            AppError::InvalidToken(e.to_string())
        })
    }
}
