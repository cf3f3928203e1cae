use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{info, instrument};

use super::models::UserProfile;
use super::service::UserService;
use super::types::{ChangePasswordRequest, RegisterRequest, SocialAuthRequest, UpdateProfileRequest};
use crate::auth::cookies::add_session_cookies;
use crate::auth::service::AuthService;
use crate::auth::types::SessionPayload;
use crate::auth::CurrentUser;
use crate::shared::{validate_payload, ApiResponse, AppError, AppState};

fn user_service(state: &AppState) -> UserService {
    UserService::new(
        Arc::clone(&state.user_repository),
        Arc::clone(&state.session_cache),
        Arc::clone(&state.mailer),
        Arc::clone(&state.image_store),
        state.token_config.clone(),
    )
}

/// POST /user/register
///
/// Creates an inactive account and emails the activation link
#[instrument(name = "register", skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse>), AppError> {
    validate_payload(&payload)?;

    let user = user_service(&state).register(payload).await?;

    info!(user_id = %user.id, "Registration completed");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message(format!(
            "Please check your email ({}) to activate your account.",
            user.email
        ))),
    ))
}

/// POST /user/social
///
/// Locates or creates the user for a federated identity payload and starts a
/// session for it
#[instrument(name = "social_auth", skip(state, jar, payload))]
pub async fn social_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SocialAuthRequest>,
) -> Result<(CookieJar, Json<ApiResponse<SessionPayload>>), AppError> {
    validate_payload(&payload)?;

    let auth = AuthService::new(
        Arc::clone(&state.user_repository),
        Arc::clone(&state.session_cache),
        state.token_config.clone(),
    );
    let (user, tokens) = auth.social_login(payload.into()).await?;

    info!(user_id = %user.id, "Social login completed");

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

/// GET /user/profile
#[instrument(name = "profile", skip(user))]
pub async fn profile(user: CurrentUser) -> Json<ApiResponse<UserProfile>> {
    Json(ApiResponse::item(UserProfile::from(&user.0)))
}

/// PUT /user/update-profile
#[instrument(name = "update_profile", skip(state, user, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserProfile>>, AppError> {
    validate_payload(&payload)?;

    let updated = user_service(&state).update_profile(&user.0.id, payload).await?;

    Ok(Json(ApiResponse::item_with_message(
        "Profile updated successfully.",
        UserProfile::from(&updated),
    )))
}

/// PUT /user/change-password
#[instrument(name = "change_password", skip(state, user, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse>, AppError> {
    validate_payload(&payload)?;

    user_service(&state).change_password(&user.0.id, payload).await?;

    Ok(Json(ApiResponse::message("Password changed successfully.")))
}
