use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{CreateCourseRequest, UpdateCourseRequest};
use crate::media::StoredImage;

/// A comment under a review or a lecture question thread. Replies nest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub user_id: String,
    pub comment: String,
    #[serde(default)]
    pub replies: Vec<Comment>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub user_id: String,
    pub rating: f64,
    pub comment: String,
    #[serde(default)]
    pub replies: Vec<Comment>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceLink {
    pub title: Option<String>,
    pub url: Option<String>,
}

/// A single video entry within a course
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lecture {
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub video_section: String,
    pub video_duration: f64, // Minutes
    pub video_player: Option<String>,
    #[serde(default)]
    pub links: Vec<ResourceLink>,
    pub suggestion: Option<String>,
    #[serde(default)]
    pub questions: Vec<Comment>,
}

/// A bullet point in the "what you will learn" / "what you need" lists
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoursePoint {
    pub title: String,
}

/// Course document: metadata, ownership and the nested review/lecture
/// substructures, stored and returned as one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseModel {
    pub id: String, // UUID v4 as string
    pub name: String,
    pub description: String,
    pub price: f64,
    pub estimated_price: Option<f64>,
    pub thumbnail: Option<StoredImage>,
    pub tags: String,
    pub level: String,
    pub demo_url: String,
    pub benefits: Vec<CoursePoint>,
    pub prerequisites: Vec<CoursePoint>,
    pub reviews: Vec<Review>,
    pub lectures: Vec<Lecture>,
    pub ratings: f64,
    pub purchases: i64,
    pub owner_id: String, // Creator reference; only the owner may update
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseModel {
    /// Builds a new course owned by `owner_id`. The thumbnail has already
    /// been pushed to the image store by the caller.
    pub fn new(
        owner_id: String,
        payload: CreateCourseRequest,
        thumbnail: Option<StoredImage>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            name: payload.name,
            description: payload.description,
            price: payload.price,
            estimated_price: payload.estimated_price,
            thumbnail,
            tags: payload.tags,
            level: payload.level,
            demo_url: payload.demo_url,
            benefits: payload.benefits,
            prerequisites: payload.prerequisites,
            reviews: Vec::new(),
            lectures: payload.lectures,
            ratings: 0.0,
            purchases: 0,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Partial-field merge: only fields present in the payload change
    pub fn apply_update(&mut self, payload: UpdateCourseRequest, thumbnail: Option<StoredImage>) {
        if let Some(name) = payload.name {
            self.name = name;
        }
        if let Some(description) = payload.description {
            self.description = description;
        }
        if let Some(price) = payload.price {
            self.price = price;
        }
        if let Some(estimated_price) = payload.estimated_price {
            self.estimated_price = Some(estimated_price);
        }
        if let Some(thumbnail) = thumbnail {
            self.thumbnail = Some(thumbnail);
        }
        if let Some(tags) = payload.tags {
            self.tags = tags;
        }
        if let Some(level) = payload.level {
            self.level = level;
        }
        if let Some(demo_url) = payload.demo_url {
            self.demo_url = demo_url;
        }
        if let Some(benefits) = payload.benefits {
            self.benefits = benefits;
        }
        if let Some(prerequisites) = payload.prerequisites {
            self.prerequisites = prerequisites;
        }
        if let Some(lectures) = payload.lectures {
            self.lectures = lectures;
        }

        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateCourseRequest {
        CreateCourseRequest {
            name: "Rust for Backend Engineers".to_string(),
            description: "Build production services.".to_string(),
            price: 49.0,
            estimated_price: Some(99.0),
            thumbnail: None,
            tags: "rust,backend".to_string(),
            level: "intermediate".to_string(),
            demo_url: "https://videos.example/demo".to_string(),
            benefits: vec![CoursePoint {
                title: "Ship a real service".to_string(),
            }],
            prerequisites: Vec::new(),
            lectures: vec![Lecture {
                title: "Hello axum".to_string(),
                description: "First routes".to_string(),
                video_url: "https://videos.example/1".to_string(),
                video_section: "Basics".to_string(),
                video_duration: 12.5,
                video_player: None,
                links: Vec::new(),
                suggestion: None,
                questions: Vec::new(),
            }],
        }
    }

    #[test]
    fn test_new_course_defaults() {
        let course = CourseModel::new("owner-1".to_string(), create_request(), None);

        assert!(!course.id.is_empty());
        assert_eq!(course.owner_id, "owner-1");
        assert_eq!(course.ratings, 0.0);
        assert_eq!(course.purchases, 0);
        assert!(course.reviews.is_empty());
        assert_eq!(course.lectures.len(), 1);
    }

    #[test]
    fn test_apply_update_merges_only_supplied_fields() {
        let mut course = CourseModel::new("owner-1".to_string(), create_request(), None);
        let original_name = course.name.clone();
        let original_lectures = course.lectures.clone();

        course.apply_update(
            UpdateCourseRequest {
                name: None,
                description: None,
                price: Some(59.0),
                estimated_price: None,
                thumbnail: None,
                tags: Some("rust,web".to_string()),
                level: None,
                demo_url: None,
                benefits: None,
                prerequisites: None,
                lectures: None,
            },
            None,
        );

        assert_eq!(course.price, 59.0);
        assert_eq!(course.tags, "rust,web");

        // Everything not supplied is untouched
        assert_eq!(course.name, original_name);
        assert_eq!(course.lectures, original_lectures);
        assert_eq!(course.estimated_price, Some(99.0));
    }

    #[test]
    fn test_nested_document_round_trip() {
        let course = CourseModel::new("owner-1".to_string(), create_request(), None);

        let json = serde_json::to_string(&course).unwrap();
        let parsed: CourseModel = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.lectures, course.lectures);
        assert_eq!(parsed.benefits, course.benefits);
    }
}
