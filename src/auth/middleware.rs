use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, instrument, warn};

use super::cache::SessionCache;
use super::cookies::ACCESS_COOKIE_NAME;
use super::token::TokenKind;
use crate::shared::{AppError, AppState};
use crate::user::models::{UserModel, UserRole};

/// The cached user attached to a request once the auth gate has passed
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserModel);

/// The authenticated-request gate: access cookie -> token verification ->
/// cache lookup. The cache entry, not the token, decides whether the session
/// is still alive.
pub async fn resolve_current_user(
    state: &AppState,
    jar: &CookieJar,
) -> Result<UserModel, AppError> {
    let token = jar
        .get(ACCESS_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| {
            debug!("Missing access token cookie");
            AppError::Unauthenticated("Please login to access this resource.".to_string())
        })?;

    let user_id = state.token_config.verify(&token, TokenKind::Access)?;

    match state.session_cache.get_user(&user_id).await? {
        Some(user) => Ok(user),
        None => {
            warn!(user_id = %user_id, "Access token is valid but no session entry exists");
            Err(AppError::SessionNotFound)
        }
    }
}

/// Cookie authentication middleware for fully-protected route groups.
/// Usage: .route_layer(middleware::from_fn_with_state(state.clone(), auth::authenticate))
/// Handlers can then extract the attached `CurrentUser`.
#[instrument(skip(state, jar, req, next))]
pub async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    debug!(uri = %req.uri(), "Authentication middleware triggered");

    let user = match resolve_current_user(&state, &jar).await {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "Authentication failed");
            return Err(e);
        }
    };

    debug!(user_id = %user.id, "Authentication successful, attaching user to request");
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        // Reuse the user the middleware already resolved, if any
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let jar = CookieJar::from_headers(&parts.headers);
        resolve_current_user(state, &jar).await.map(CurrentUser)
    }
}

/// Role-based authorization, composable after the gate: the request fails
/// with `Forbidden` unless the attached user's role is in `allowed`.
pub fn assert_role(user: &UserModel, allowed: &[UserRole]) -> Result<(), AppError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        warn!(user_id = %user.id, role = %user.role, "Role not allowed for this action");
        Err(AppError::Forbidden(format!(
            "Role '{}' is not allowed to perform this action.",
            user.role
        )))
    }
}
