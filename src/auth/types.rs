use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::user::models::UserProfile;

/// JWT claims: the user id plus the standard timestamp claims. Nothing else
/// goes into tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    pub id: String,
    pub exp: usize, // Expiration timestamp (standard JWT claim)
    pub iat: usize, // Issued at timestamp (standard JWT claim)
}

/// The access/refresh pair produced when a session is established
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Identity claims forwarded from an external identity provider
#[derive(Debug, Clone)]
pub struct SocialIdentity {
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format."))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyAccountRequest {
    #[validate(length(min = 1, message = "Token is required."))]
    pub token: String,
}

/// Body returned by login, social auth and refresh: the access token plus the
/// profile view of the signed-in user
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionPayload {
    pub access_token: String,
    pub user: UserProfile,
}
