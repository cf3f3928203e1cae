use serde::Deserialize;
use validator::Validate;

use crate::auth::types::SocialIdentity;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,

    #[validate(email(message = "Invalid email format."))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SocialAuthRequest {
    #[validate(email(message = "Invalid email format."))]
    pub email: String,

    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,

    #[validate(url(message = "Avatar must be a valid url."))]
    pub avatar: Option<String>,
}

impl From<SocialAuthRequest> for SocialIdentity {
    fn from(request: SocialAuthRequest) -> Self {
        Self {
            email: request.email,
            name: request.name,
            avatar: request.avatar,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, max = 255, message = "Name must be between 3 and 255 characters."))]
    pub name: Option<String>,

    /// Image payload handed to the image store (base64 data or a fetchable url)
    #[validate(length(min = 1, message = "Avatar must not be empty."))]
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required."))]
    pub current_password: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub new_password: String,
}
