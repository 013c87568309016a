//! Enrollment administration handlers (hr_admin).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::auth::UserContext;
use crate::db::models::{
    AssignEnrollmentsRequest, AssignEnrollmentsResponse, Enrollment, EnrollmentFilter,
    EnrollmentView, ListResponse, UpdateEnrollmentRequest,
};
use crate::error::AppResult;
use crate::state::Services;

/// `GET /api/admin/enrollments?plant_id=&course_id=&user_id=&status=&limit=&offset=`
pub async fn list(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Query(filter): Query<EnrollmentFilter>,
) -> AppResult<Json<ListResponse<EnrollmentView>>> {
    Ok(Json(services.enrollments.list(&user, filter).await?))
}

/// Assign a course to a set of users.
///
/// `POST /api/admin/enrollments`
///
/// # Request Body
///
/// ```json
/// {
///   "course_id": "5f0c...",
///   "user_ids": ["0b7e...", "4a91..."],
///   "due_at": "2026-12-01T00:00:00Z"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {"created": [{...}], "skipped": ["4a91..."]}
/// ```
pub async fn assign(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Json(request): Json<AssignEnrollmentsRequest>,
) -> AppResult<(StatusCode, Json<AssignEnrollmentsResponse>)> {
    let response = services.enrollments.assign(&user, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Change status or due date.
///
/// `PATCH /api/admin/enrollments/{enrollment_id}`
pub async fn update(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(enrollment_id): Path<Uuid>,
    Json(request): Json<UpdateEnrollmentRequest>,
) -> AppResult<Json<Enrollment>> {
    Ok(Json(services.enrollments.update(&user, enrollment_id, request).await?))
}

/// `DELETE /api/admin/enrollments/{enrollment_id}`
pub async fn delete(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(enrollment_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services.enrollments.delete(&user, enrollment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
