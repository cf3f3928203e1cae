use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::warn;
use uuid::Uuid;

use crate::media::StoredImage;
use crate::shared::AppError;

/// Closed set of user roles
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    Student,
    Instructor,
    Admin,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Student
    }
}

/// Canonical user record. This is also what the session cache mirrors, so it
/// round-trips through serde including the password hash; HTTP responses use
/// `UserProfile` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserModel {
    pub id: String, // UUID v4 as string
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: Option<StoredImage>,
    pub role: UserRole,
    pub is_active: bool,
    pub courses: Vec<String>, // Enrolled course ids
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserModel {
    /// Creates a new inactive student, hashing the password here. There is no
    /// other write path for the password field: it never holds plaintext.
    pub fn create(name: String, email: String, password: String) -> Result<Self, AppError> {
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash: hash_password(&password)?,
            avatar: None,
            role: UserRole::Student,
            is_active: false,
            courses: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces the password, re-hashing at this single call site
    pub fn set_password(&mut self, password: &str) -> Result<(), AppError> {
        self.password_hash = hash_password(password)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn verify_password(&self, candidate: &str) -> Result<bool, AppError> {
        verify(candidate, &self.password_hash).map_err(|e| {
            warn!(error = %e, "Password verification failed to run");
            AppError::Internal
        })
    }
}

fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST).map_err(|e| {
        warn!(error = %e, "Password hashing failed");
        AppError::Internal
    })
}

/// Response view of a user: everything except the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<StoredImage>,
    pub role: UserRole,
    pub is_active: bool,
    pub courses: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserModel> for UserProfile {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            role: user.role,
            is_active: user.is_active,
            courses: user.courses.clone(),
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_create_hashes_password() {
        let user = UserModel::create(
            "A".to_string(),
            "a@x.com".to_string(),
            "12345678".to_string(),
        )
        .unwrap();

        assert!(!user.id.is_empty());
        assert_ne!(user.password_hash, "12345678");
        assert!(user.verify_password("12345678").unwrap());
        assert!(!user.verify_password("different").unwrap());

        assert_eq!(user.role, UserRole::Student);
        assert!(!user.is_active);
        assert!(user.courses.is_empty());
    }

    #[test]
    fn test_set_password_rotates_hash() {
        let mut user = UserModel::create(
            "A".to_string(),
            "a@x.com".to_string(),
            "12345678".to_string(),
        )
        .unwrap();
        let original_hash = user.password_hash.clone();

        user.set_password("new-password").unwrap();

        assert_ne!(user.password_hash, original_hash);
        assert!(user.verify_password("new-password").unwrap());
        assert!(!user.verify_password("12345678").unwrap());
    }

    #[rstest]
    #[case("student", UserRole::Student)]
    #[case("instructor", UserRole::Instructor)]
    #[case("admin", UserRole::Admin)]
    fn test_role_string_round_trip(#[case] text: &str, #[case] role: UserRole) {
        assert_eq!(text.parse::<UserRole>().unwrap(), role);
        assert_eq!(role.to_string(), text);
    }

    #[test]
    fn test_unknown_role_falls_back_to_student() {
        assert_eq!("owner".parse::<UserRole>().unwrap_or_default(), UserRole::Student);
    }

    #[test]
    fn test_profile_omits_password_hash() {
        let user = UserModel::create(
            "A".to_string(),
            "a@x.com".to_string(),
            "12345678".to_string(),
        )
        .unwrap();

        let value = serde_json::to_value(UserProfile::from(&user)).unwrap();

        assert_eq!(value["email"], "a@x.com");
        assert!(value.get("password_hash").is_none());
        assert!(!value.to_string().contains(&user.password_hash));
    }
}
