use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::models::CourseModel;
use super::repository::CourseRepository;
use super::types::{CreateCourseRequest, UpdateCourseRequest};
use crate::media::ImageStore;
use crate::shared::AppError;
use crate::user::models::UserModel;

/// Service for course creation, retrieval and owner-gated updates
pub struct CourseService {
    courses: Arc<dyn CourseRepository + Send + Sync>,
    images: Arc<dyn ImageStore + Send + Sync>,
}

impl CourseService {
    pub fn new(
        courses: Arc<dyn CourseRepository + Send + Sync>,
        images: Arc<dyn ImageStore + Send + Sync>,
    ) -> Self {
        Self { courses, images }
    }

    #[instrument(skip(self, owner, payload))]
    pub async fn create_course(
        &self,
        owner: &UserModel,
        payload: CreateCourseRequest,
    ) -> Result<CourseModel, AppError> {
        let thumbnail = match &payload.thumbnail {
            Some(image) => Some(self.images.upload(image, "courses").await?),
            None => None,
        };

        let course = CourseModel::new(owner.id.clone(), payload, thumbnail);
        self.courses.create_course(&course).await?;

        info!(course_id = %course.id, owner_id = %owner.id, "Course created");
        Ok(course)
    }

    /// Owner-gated partial update. Loads the stored course, rejects
    /// non-owners, merges only the supplied fields.
    #[instrument(skip(self, payload))]
    pub async fn update_course(
        &self,
        requester_id: &str,
        course_id: &str,
        payload: UpdateCourseRequest,
    ) -> Result<CourseModel, AppError> {
        let mut course = self
            .courses
            .get_course(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found.".to_string()))?;

        if course.owner_id != requester_id {
            warn!(
                course_id = %course_id,
                requester_id = %requester_id,
                owner_id = %course.owner_id,
                "Course update rejected for non-owner"
            );
            return Err(AppError::Forbidden(
                "Only the course owner can modify this course.".to_string(),
            ));
        }

        let thumbnail = match &payload.thumbnail {
            Some(image) => {
                if let Some(previous) = &course.thumbnail {
                    if !previous.public_id.is_empty() {
                        if let Err(error) = self.images.destroy(&previous.public_id).await {
                            warn!(
                                error = %error,
                                public_id = %previous.public_id,
                                "Failed to remove previous thumbnail"
                            );
                        }
                    }
                }
                Some(self.images.upload(image, "courses").await?)
            }
            None => None,
        };

        course.apply_update(payload, thumbnail);
        self.courses.update_course(&course).await?;

        info!(course_id = %course.id, "Course updated");
        Ok(course)
    }

    #[instrument(skip(self))]
    pub async fn get_course(&self, course_id: &str) -> Result<CourseModel, AppError> {
        self.courses
            .get_course(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found.".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_courses(&self) -> Result<Vec<CourseModel>, AppError> {
        self.courses.list_courses().await
    }
}
