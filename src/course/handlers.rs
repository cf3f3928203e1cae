use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::models::CourseModel;
use super::service::CourseService;
use super::types::{CreateCourseRequest, UpdateCourseRequest};
use crate::auth::{assert_role, CurrentUser};
use crate::shared::{validate_payload, ApiResponse, AppError, AppState};
use crate::user::models::UserRole;

/// Roles allowed to create and update courses
const COURSE_MANAGERS: &[UserRole] = &[UserRole::Instructor, UserRole::Admin];

fn course_service(state: &AppState) -> CourseService {
    CourseService::new(
        Arc::clone(&state.course_repository),
        Arc::clone(&state.image_store),
    )
}

/// POST /course (instructor/admin only)
#[instrument(name = "create_course", skip(state, user, payload))]
pub async fn create_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CourseModel>>), AppError> {
    assert_role(&user.0, COURSE_MANAGERS)?;
    validate_payload(&payload)?;

    let course = course_service(&state).create_course(&user.0, payload).await?;

    info!(course_id = %course.id, "Course created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::item_with_message(
            "New course created successfully.",
            course,
        )),
    ))
}

/// PUT /course/:id (instructor/admin, owner only)
#[instrument(name = "update_course", skip(state, user, payload))]
pub async fn update_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(course_id): Path<String>,
    Json(payload): Json<UpdateCourseRequest>,
) -> Result<Json<ApiResponse<CourseModel>>, AppError> {
    assert_role(&user.0, COURSE_MANAGERS)?;
    validate_payload(&payload)?;

    let course = course_service(&state)
        .update_course(&user.0.id, &course_id, payload)
        .await?;

    Ok(Json(ApiResponse::item_with_message(
        "Course updated successfully.",
        course,
    )))
}

/// GET /course/:id (public)
#[instrument(name = "get_course", skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<ApiResponse<CourseModel>>, AppError> {
    let course = course_service(&state).get_course(&course_id).await?;
    Ok(Json(ApiResponse::item(course)))
}

/// GET /course (public)
#[instrument(name = "list_courses", skip(state))]
pub async fn list_courses(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CourseModel>>, AppError> {
    let courses = course_service(&state).list_courses().await?;

    info!(course_count = courses.len(), "Courses listed");

    Ok(Json(ApiResponse::items(courses)))
}
