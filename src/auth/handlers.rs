use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{info, instrument};

use super::cookies::{add_session_cookies, clear_session_cookies, ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME};
use super::service::{ActivationOutcome, AuthService};
use super::types::{LoginRequest, SessionPayload, VerifyAccountRequest};
use crate::shared::{validate_payload, ApiResponse, AppError, AppState};
use crate::user::models::UserProfile;

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(
        Arc::clone(&state.user_repository),
        Arc::clone(&state.session_cache),
        state.token_config.clone(),
    )
}

/// POST /auth/verify-account
///
/// Activates the account the token was issued for. Re-verifying an already
/// active account reports `success: false` without touching any state.
#[instrument(name = "verify_account", skip(state, payload))]
pub async fn verify_account(
    State(state): State<AppState>,
    Json(payload): Json<VerifyAccountRequest>,
) -> Result<Json<ApiResponse>, AppError> {
    validate_payload(&payload)?;

    let outcome = auth_service(&state).verify_account(&payload.token).await?;

    let response = match outcome {
        ActivationOutcome::Activated => ApiResponse::message("Account verified successfully."),
        ActivationOutcome::AlreadyActive => ApiResponse::failure("Account is already verified."),
    };

    Ok(Json(response))
}

/// POST /auth/login
///
/// Verifies credentials, mirrors the user into the session cache and sets
/// the access/refresh cookie pair. The access token is also returned in the
/// body for non-cookie clients.
#[instrument(name = "login", skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<SessionPayload>>), AppError> {
    validate_payload(&payload)?;

    let (user, tokens) = auth_service(&state)
        .login(&payload.email, &payload.password)
        .await?;

    info!(user_id = %user.id, "User logged in");

    let payload = SessionPayload {
        access_token: tokens.access_token.clone(),
        user: UserProfile::from(&user),
    };
    let jar = add_session_cookies(jar, &tokens, &state.token_config);

    Ok((
        jar,
        Json(ApiResponse::item_with_message("Logged in successfully.", payload)),
    ))
}

/// GET /auth/logout
///
/// Always succeeds: the cache entry is deleted if the access cookie still
/// decodes, and both cookies are overwritten with an immediate expiry.
#[instrument(name = "logout", skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse>), AppError> {
    let access_token = jar
        .get(ACCESS_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string());

    auth_service(&state).logout(access_token.as_deref()).await?;

    let jar = clear_session_cookies(jar);
    Ok((jar, Json(ApiResponse::message("Logged out successfully."))))
}

/// GET /auth/refresh-token
///
/// Exchanges a refresh cookie for a fresh session: new token pair, refreshed
/// cache entry, new cookies.
#[instrument(name = "refresh_token", skip(state, jar))]
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<SessionPayload>>), AppError> {
    let refresh_token = jar
        .get(REFRESH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| AppError::Unauthenticated("Refresh token is missing.".to_string()))?;

    let (user, tokens) = auth_service(&state).refresh(&refresh_token).await?;

    info!(user_id = %user.id, "Session refreshed");

    let payload = SessionPayload {
        access_token: tokens.access_token.clone(),
        user: UserProfile::from(&user),
    };
    let jar = add_session_cookies(jar, &tokens, &state.token_config);

    Ok((jar, Json(ApiResponse::item(payload))))
}
