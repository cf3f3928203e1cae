use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use learnhub::app::app;
use learnhub::auth::cache::{InMemorySessionCache, RedisSessionCache, SessionCache};
use learnhub::auth::TokenConfig;
use learnhub::course::repository::{CourseRepository, InMemoryCourseRepository, PostgresCourseRepository};
use learnhub::email::{InMemoryMailer, Mailer, SmtpMailer};
use learnhub::media::{CloudinaryImageStore, ImageStore, InMemoryImageStore};
use learnhub::shared::AppState;
use learnhub::user::repository::{InMemoryUserRepository, PostgresUserRepository, UserRepository};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "learnhub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting learnhub server");

    // Backends are selected by environment: real services when configured,
    // in-memory implementations for local development
    let (user_repository, course_repository): (
        Arc<dyn UserRepository + Send + Sync>,
        Arc<dyn CourseRepository + Send + Sync>,
    ) = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = PgPool::connect(&database_url)
                .await
                .expect("Failed to connect to database");
            info!("Connected to PostgreSQL");
            (
                Arc::new(PostgresUserRepository::new(pool.clone())),
                Arc::new(PostgresCourseRepository::new(pool)),
            )
        }
        Err(_) => {
            info!("DATABASE_URL not set, using in-memory repositories");
            (
                Arc::new(InMemoryUserRepository::new()),
                Arc::new(InMemoryCourseRepository::new()),
            )
        }
    };

    let session_cache: Arc<dyn SessionCache + Send + Sync> = match std::env::var("REDIS_URL") {
        Ok(redis_url) => {
            let cache = RedisSessionCache::connect(&redis_url)
                .await
                .expect("Failed to connect to redis");
            info!("Connected to Redis");
            Arc::new(cache)
        }
        Err(_) => {
            info!("REDIS_URL not set, using in-memory session cache");
            Arc::new(InMemorySessionCache::new())
        }
    };

    let mailer: Arc<dyn Mailer + Send + Sync> = match SmtpMailer::from_env()
        .expect("Invalid SMTP configuration")
    {
        Some(mailer) => Arc::new(mailer),
        None => {
            info!("SMTP_HOST not set, outbound email will only be captured in memory");
            Arc::new(InMemoryMailer::new())
        }
    };

    let image_store: Arc<dyn ImageStore + Send + Sync> = match CloudinaryImageStore::from_env() {
        Some(store) => Arc::new(store),
        None => {
            info!("CLOUDINARY_* not set, image uploads will only be captured in memory");
            Arc::new(InMemoryImageStore::new())
        }
    };

    let app_state = AppState::new(
        user_repository,
        course_repository,
        session_cache,
        mailer,
        image_store,
        TokenConfig::from_env(),
    );

    let app = app(app_state);

    let addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    info!("Server running on http://{addr}");
    axum::serve(listener, app).await.unwrap();
}
