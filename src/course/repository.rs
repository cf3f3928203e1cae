use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{CourseModel, CoursePoint, Lecture, Review};
use crate::media::StoredImage;
use crate::shared::AppError;

/// Trait for course persistence operations
#[async_trait]
pub trait CourseRepository {
    async fn create_course(&self, course: &CourseModel) -> Result<(), AppError>;
    async fn get_course(&self, course_id: &str) -> Result<Option<CourseModel>, AppError>;
    async fn list_courses(&self) -> Result<Vec<CourseModel>, AppError>;
    async fn update_course(&self, course: &CourseModel) -> Result<(), AppError>;
}

/// In-memory implementation of CourseRepository for development and testing
pub struct InMemoryCourseRepository {
    courses: Mutex<HashMap<String, CourseModel>>,
}

impl Default for InMemoryCourseRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCourseRepository {
    pub fn new() -> Self {
        Self {
            courses: Mutex::new(HashMap::new()),
        }
    }

    pub fn course_count(&self) -> usize {
        self.courses.lock().unwrap().len()
    }
}

#[async_trait]
impl CourseRepository for InMemoryCourseRepository {
    #[instrument(skip(self, course))]
    async fn create_course(&self, course: &CourseModel) -> Result<(), AppError> {
        debug!(course_id = %course.id, name = %course.name, "Creating course in memory");

        let mut courses = self.courses.lock().unwrap();
        if courses.contains_key(&course.id) {
            warn!(course_id = %course.id, "Course already exists in memory");
            return Err(AppError::Database("Course already exists".to_string()));
        }
        courses.insert(course.id.clone(), course.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_course(&self, course_id: &str) -> Result<Option<CourseModel>, AppError> {
        debug!(course_id = %course_id, "Fetching course from memory");

        let courses = self.courses.lock().unwrap();
        Ok(courses.get(course_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_courses(&self) -> Result<Vec<CourseModel>, AppError> {
        debug!("Listing courses from memory");

        let courses = self.courses.lock().unwrap();
        let mut all: Vec<CourseModel> = courses.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    #[instrument(skip(self, course))]
    async fn update_course(&self, course: &CourseModel) -> Result<(), AppError> {
        debug!(course_id = %course.id, "Updating course in memory");

        let mut courses = self.courses.lock().unwrap();
        if !courses.contains_key(&course.id) {
            warn!(course_id = %course.id, "Course not found for update in memory");
            return Err(AppError::NotFound("Course not found.".to_string()));
        }
        courses.insert(course.id.clone(), course.clone());

        Ok(())
    }
}

/// PostgreSQL implementation of the course repository. The nested
/// review/lecture documents live in JSONB columns.
pub struct PostgresCourseRepository {
    pool: PgPool,
}

impl PostgresCourseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_course(row: &PgRow) -> CourseModel {
    CourseModel {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        price: row.get("price"),
        estimated_price: row.get("estimated_price"),
        thumbnail: row
            .get::<Option<Json<StoredImage>>, _>("thumbnail")
            .map(|Json(image)| image),
        tags: row.get("tags"),
        level: row.get("level"),
        demo_url: row.get("demo_url"),
        benefits: row.get::<Json<Vec<CoursePoint>>, _>("benefits").0,
        prerequisites: row.get::<Json<Vec<CoursePoint>>, _>("prerequisites").0,
        reviews: row.get::<Json<Vec<Review>>, _>("reviews").0,
        lectures: row.get::<Json<Vec<Lecture>>, _>("lectures").0,
        ratings: row.get("ratings"),
        purchases: row.get("purchases"),
        owner_id: row.get("owner_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const COURSE_COLUMNS: &str = "id, name, description, price, estimated_price, thumbnail, tags, \
    level, demo_url, benefits, prerequisites, reviews, lectures, ratings, purchases, owner_id, \
    created_at, updated_at";

#[async_trait]
impl CourseRepository for PostgresCourseRepository {
    #[instrument(skip(self, course))]
    async fn create_course(&self, course: &CourseModel) -> Result<(), AppError> {
        debug!(course_id = %course.id, name = %course.name, "Creating course in database");

        sqlx::query(
            "INSERT INTO courses (id, name, description, price, estimated_price, thumbnail, tags, \
             level, demo_url, benefits, prerequisites, reviews, lectures, ratings, purchases, \
             owner_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
        )
        .bind(&course.id)
        .bind(&course.name)
        .bind(&course.description)
        .bind(course.price)
        .bind(course.estimated_price)
        .bind(course.thumbnail.as_ref().map(Json))
        .bind(&course.tags)
        .bind(&course.level)
        .bind(&course.demo_url)
        .bind(Json(&course.benefits))
        .bind(Json(&course.prerequisites))
        .bind(Json(&course.reviews))
        .bind(Json(&course.lectures))
        .bind(course.ratings)
        .bind(course.purchases)
        .bind(&course.owner_id)
        .bind(course.created_at)
        .bind(course.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create course in database");
            AppError::Database(e.to_string())
        })?;

        debug!(course_id = %course.id, "Course created successfully in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_course(&self, course_id: &str) -> Result<Option<CourseModel>, AppError> {
        debug!(course_id = %course_id, "Fetching course from database");

        let row = sqlx::query(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, course_id = %course_id, "Failed to fetch course from database");
            AppError::Database(e.to_string())
        })?;

        Ok(row.map(|row| row_to_course(&row)))
    }

    #[instrument(skip(self))]
    async fn list_courses(&self) -> Result<Vec<CourseModel>, AppError> {
        debug!("Listing courses from database");

        let rows = sqlx::query(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to list courses from database");
            AppError::Database(e.to_string())
        })?;

        Ok(rows.iter().map(row_to_course).collect())
    }

    #[instrument(skip(self, course))]
    async fn update_course(&self, course: &CourseModel) -> Result<(), AppError> {
        debug!(course_id = %course.id, "Updating course in database");

        let result = sqlx::query(
            "UPDATE courses SET name = $2, description = $3, price = $4, estimated_price = $5, \
             thumbnail = $6, tags = $7, level = $8, demo_url = $9, benefits = $10, \
             prerequisites = $11, reviews = $12, lectures = $13, ratings = $14, purchases = $15, \
             updated_at = $16 WHERE id = $1",
        )
        .bind(&course.id)
        .bind(&course.name)
        .bind(&course.description)
        .bind(course.price)
        .bind(course.estimated_price)
        .bind(course.thumbnail.as_ref().map(Json))
        .bind(&course.tags)
        .bind(&course.level)
        .bind(&course.demo_url)
        .bind(Json(&course.benefits))
        .bind(Json(&course.prerequisites))
        .bind(Json(&course.reviews))
        .bind(Json(&course.lectures))
        .bind(course.ratings)
        .bind(course.purchases)
        .bind(course.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, course_id = %course.id, "Failed to update course in database");
            AppError::Database(e.to_string())
        })?;

        if result.rows_affected() == 0 {
            warn!(course_id = %course.id, "Course not found for update");
            return Err(AppError::NotFound("Course not found.".to_string()));
        }

        Ok(())
    }
}
