use serde::Deserialize;
use validator::Validate;

use super::models::{CoursePoint, Lecture};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,

    #[validate(length(min = 1, message = "Description is required."))]
    pub description: String,

    #[validate(range(min = 0.0, message = "Price must not be negative."))]
    pub price: f64,

    pub estimated_price: Option<f64>,

    /// Image payload handed to the image store (base64 data or a fetchable url)
    pub thumbnail: Option<String>,

    #[validate(length(min = 1, message = "Tags are required."))]
    pub tags: String,

    #[validate(length(min = 1, message = "Level is required."))]
    pub level: String,

    #[validate(url(message = "Demo url must be a valid url."))]
    pub demo_url: String,

    #[serde(default)]
    pub benefits: Vec<CoursePoint>,

    #[serde(default)]
    pub prerequisites: Vec<CoursePoint>,

    #[serde(default)]
    pub lectures: Vec<Lecture>,
}

/// Every field optional: only what is supplied gets merged into the course
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, message = "Name must not be empty."))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "Description must not be empty."))]
    pub description: Option<String>,

    #[validate(range(min = 0.0, message = "Price must not be negative."))]
    pub price: Option<f64>,

    pub estimated_price: Option<f64>,

    pub thumbnail: Option<String>,

    pub tags: Option<String>,

    pub level: Option<String>,

    #[validate(url(message = "Demo url must be a valid url."))]
    pub demo_url: Option<String>,

    pub benefits: Option<Vec<CoursePoint>>,

    pub prerequisites: Option<Vec<CoursePoint>>,

    pub lectures: Option<Vec<Lecture>>,
}
