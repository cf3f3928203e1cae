use std::sync::Arc;

use axum::Router;

use learnhub::auth::cache::InMemorySessionCache;
use learnhub::auth::TokenConfig;
use learnhub::course::repository::InMemoryCourseRepository;
use learnhub::email::InMemoryMailer;
use learnhub::media::InMemoryImageStore;
use learnhub::shared::AppState;
use learnhub::user::models::{UserModel, UserRole};
use learnhub::user::repository::{InMemoryUserRepository, UserRepository};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

/// Full application wired against in-memory backends, with direct handles on
/// each backend for assertions.
pub struct TestSetup {
    pub app: Router,
    pub state: AppState,
    pub users: Arc<InMemoryUserRepository>,
    pub courses: Arc<InMemoryCourseRepository>,
    pub cache: Arc<InMemorySessionCache>,
    pub mailer: Arc<InMemoryMailer>,
    pub images: Arc<InMemoryImageStore>,
}

pub struct TestSetupBuilder;

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(self) -> TestSetup {
        let users = Arc::new(InMemoryUserRepository::new());
        let courses = Arc::new(InMemoryCourseRepository::new());
        let cache = Arc::new(InMemorySessionCache::new());
        let mailer = Arc::new(InMemoryMailer::new());
        let images = Arc::new(InMemoryImageStore::new());

        let state = AppState::new(
            users.clone(),
            courses.clone(),
            cache.clone(),
            mailer.clone(),
            images.clone(),
            TokenConfig::from_env(),
        );

        TestSetup {
            app: learnhub::app(state.clone()),
            state,
            users,
            courses,
            cache,
            mailer,
            images,
        }
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSetup {
    pub fn new() -> Self {
        TestSetupBuilder::new().build()
    }

    /// Inserts a user directly into the repository, bypassing registration
    pub async fn seed_user(&self, name: &str, email: &str, password: &str, role: UserRole) -> UserModel {
        let mut user =
            UserModel::create(name.to_string(), email.to_string(), password.to_string()).unwrap();
        user.role = role;
        user.is_active = true;
        self.users.create_user(&user).await.unwrap();
        user
    }
}
