use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::shared::AppError;

/// Reference to an image held by the external image host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    pub public_id: String,
    pub url: String,
}

/// Third-party image hosting. `image` is whatever the host accepts as a file
/// parameter: base64 data or a fetchable url.
#[async_trait]
pub trait ImageStore {
    async fn upload(&self, image: &str, folder: &str) -> Result<StoredImage, AppError>;
    async fn destroy(&self, public_id: &str) -> Result<(), AppError>;
}

/// Cloudinary-backed image store using signed upload/destroy requests
pub struct CloudinaryImageStore {
    http: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryUploadResponse {
    public_id: String,
    secure_url: String,
}

impl CloudinaryImageStore {
    /// Returns `None` when the CLOUDINARY_* variables are not configured
    pub fn from_env() -> Option<Self> {
        let cloud_name = std::env::var("CLOUDINARY_CLOUD_NAME").ok()?;
        let api_key = std::env::var("CLOUDINARY_API_KEY").ok()?;
        let api_secret = std::env::var("CLOUDINARY_API_SECRET").ok()?;

        Some(Self {
            http: reqwest::Client::new(),
            cloud_name,
            api_key,
            api_secret,
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{action}",
            self.cloud_name
        )
    }

    /// Signature over the alphabetically sorted parameters, as the API requires
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
        sorted.sort_by_key(|(key, _)| *key);

        let to_sign: String = sorted
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha1::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn timestamp() -> String {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
            .to_string()
    }
}

#[async_trait]
impl ImageStore for CloudinaryImageStore {
    #[instrument(skip(self, image))]
    async fn upload(&self, image: &str, folder: &str) -> Result<StoredImage, AppError> {
        let timestamp = Self::timestamp();
        let signature = self.sign(&[("folder", folder), ("timestamp", &timestamp)]);

        let form = [
            ("file", image),
            ("folder", folder),
            ("timestamp", &timestamp),
            ("api_key", &self.api_key),
            ("signature", &signature),
        ];

        let response = self
            .http
            .post(self.endpoint("upload"))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Upload(e.to_string()))?
            .json::<CloudinaryUploadResponse>()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;

        info!(public_id = %response.public_id, "Image uploaded");

        Ok(StoredImage {
            public_id: response.public_id,
            url: response.secure_url,
        })
    }

    #[instrument(skip(self))]
    async fn destroy(&self, public_id: &str) -> Result<(), AppError> {
        let timestamp = Self::timestamp();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", &timestamp)]);

        let form = [
            ("public_id", public_id),
            ("timestamp", &timestamp),
            ("api_key", &self.api_key),
            ("signature", &signature),
        ];

        self.http
            .post(self.endpoint("destroy"))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Upload(e.to_string()))?;

        info!(public_id = %public_id, "Image destroyed");
        Ok(())
    }
}

/// In-memory image store for development and testing
pub struct InMemoryImageStore {
    images: Mutex<HashMap<String, String>>,
}

impl Default for InMemoryImageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self {
            images: Mutex::new(HashMap::new()),
        }
    }

    pub fn has_image(&self, public_id: &str) -> bool {
        self.images.lock().unwrap().contains_key(public_id)
    }

    pub fn image_count(&self) -> usize {
        self.images.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn upload(&self, image: &str, folder: &str) -> Result<StoredImage, AppError> {
        let id = Uuid::new_v4().to_string();
        let public_id = format!("{folder}/{id}");
        let url = format!("https://images.local/{public_id}");

        debug!(public_id = %public_id, "Captured image upload");

        self.images
            .lock()
            .unwrap()
            .insert(public_id.clone(), image.to_string());

        Ok(StoredImage { public_id, url })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), AppError> {
        debug!(public_id = %public_id, "Destroying captured image");

        self.images.lock().unwrap().remove(public_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_upload_and_destroy() {
        let store = InMemoryImageStore::new();

        let image = store.upload("data:image/png;base64,AA", "avatars").await.unwrap();

        assert!(image.public_id.starts_with("avatars/"));
        assert!(image.url.contains(&image.public_id));
        assert!(store.has_image(&image.public_id));

        store.destroy(&image.public_id).await.unwrap();
        assert!(!store.has_image(&image.public_id));
        assert_eq!(store.image_count(), 0);
    }

    #[test]
    fn test_signature_is_stable_over_parameter_order() {
        let store = CloudinaryImageStore {
            http: reqwest::Client::new(),
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        };

        let a = store.sign(&[("folder", "avatars"), ("timestamp", "100")]);
        let b = store.sign(&[("timestamp", "100"), ("folder", "avatars")]);

        assert_eq!(a, b);
        assert_eq!(a.len(), 40); // SHA-1 hex
    }
}
