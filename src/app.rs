use axum::{
    http::{header, HeaderValue, Method, Uri},
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth;
use crate::course;
use crate::shared::{ApiResponse, AppError, AppState};
use crate::user;

/// Assembles the full application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .nest("/auth", auth_routes())
        .nest("/user", user_routes(state.clone()))
        .nest("/course", course_routes())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/verify-account", post(auth::handlers::verify_account))
        .route("/login", post(auth::handlers::login))
        .route("/logout", get(auth::handlers::logout))
        .route("/refresh-token", get(auth::handlers::refresh_token))
}

fn user_routes(state: AppState) -> Router<AppState> {
    // Profile routes sit behind the session gate as a group; registration
    // and social login stay public
    let protected = Router::new()
        .route("/profile", get(user::handlers::profile))
        .route("/update-profile", put(user::handlers::update_profile))
        .route("/change-password", put(user::handlers::change_password))
        .route_layer(middleware::from_fn_with_state(state, auth::authenticate));

    Router::new()
        .route("/register", post(user::handlers::register))
        .route("/social", post(user::handlers::social_auth))
        .merge(protected)
}

fn course_routes() -> Router<AppState> {
    // Reads are public; the mutating handlers authenticate via extractor and
    // check roles themselves
    Router::new()
        .route(
            "/",
            get(course::handlers::list_courses).post(course::handlers::create_course),
        )
        .route(
            "/:id",
            get(course::handlers::get_course).put(course::handlers::update_course),
        )
}

fn cors_layer() -> CorsLayer {
    let Ok(origin) = std::env::var("ORIGIN") else {
        return CorsLayer::permissive();
    };

    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
        Err(_) => {
            warn!(origin = %origin, "Invalid ORIGIN value, falling back to permissive CORS");
            CorsLayer::permissive()
        }
    }
}

async fn health() -> Json<ApiResponse> {
    Json(ApiResponse::message("API is working"))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Route {uri} not found!"))
}
