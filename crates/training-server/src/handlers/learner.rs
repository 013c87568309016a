//! Learner API handlers.
//!
//! Every route here acts on the authenticated caller's own data.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::UserContext;
use crate::db::models::{
    ActivityEvent, AnswerResult, CourseDetail, CourseQuery, CourseSummary, CreateActivityRequest,
    Enrollment, EnrollmentView, ListResponse, Progress, SelfEnrollRequest, SubmitAnswerRequest,
    UpdateProgressRequest, UserResponse,
};
use crate::error::AppResult;
use crate::state::Services;

/// Query parameters for course delivery.
#[derive(Debug, Deserialize, Default)]
pub struct LocaleQuery {
    /// Locale to translate into; defaults to the caller's preference
    pub locale: Option<String>,
}

/// The caller's profile and roles.
///
/// `GET /api/me`
pub async fn me(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(services.users.me(&user).await?))
}

/// Published courses with the caller's enrollment and progress.
///
/// `GET /api/courses?locale=es&q=forklift`
pub async fn list_courses(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<CourseQuery>,
) -> AppResult<Json<ListResponse<CourseSummary>>> {
    Ok(Json(services.courses.catalog(&user, query).await?))
}

/// A course with sections, blocks and questions (without answers).
///
/// `GET /api/courses/{course_id}?locale=es`
pub async fn get_course(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(course_id): Path<Uuid>,
    Query(query): Query<LocaleQuery>,
) -> AppResult<Json<CourseDetail>> {
    let detail = services
        .courses
        .detail(&user, course_id, query.locale.as_deref())
        .await?;
    Ok(Json(detail))
}

/// Enroll in a published course.
///
/// `POST /api/enrollments`
///
/// # Request Body
///
/// ```json
/// {"course_id": "5f0c..."}
/// ```
///
/// `409 Conflict` when already enrolled.
pub async fn enroll(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Json(request): Json<SelfEnrollRequest>,
) -> AppResult<(StatusCode, Json<Enrollment>)> {
    let enrollment = services.enrollments.enroll_self(&user, request).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// The caller's enrollments.
///
/// `GET /api/enrollments`
pub async fn my_enrollments(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
) -> AppResult<Json<ListResponse<EnrollmentView>>> {
    Ok(Json(services.enrollments.mine(&user).await?))
}

/// `GET /api/progress`
pub async fn list_progress(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
) -> AppResult<Json<ListResponse<Progress>>> {
    Ok(Json(services.progress.list(&user).await?))
}

/// `GET /api/progress/{course_id}`
pub async fn get_progress(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Progress>> {
    Ok(Json(services.progress.get(&user, course_id).await?))
}

/// Report progress in an enrolled course.
///
/// `PUT /api/progress/{course_id}`
///
/// # Request Body
///
/// ```json
/// {
///   "progress_percent": 45,
///   "current_section_id": "9a1e...",
///   "completed_section_id": "77b2..."
/// }
/// ```
///
/// Lower percentages than the stored one are ignored. `403` when not
/// enrolled.
pub async fn update_progress(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(course_id): Path<Uuid>,
    Json(request): Json<UpdateProgressRequest>,
) -> AppResult<Json<Progress>> {
    Ok(Json(services.progress.update(&user, course_id, request).await?))
}

/// Record a learner activity event.
///
/// `POST /api/activity`
///
/// # Request Body
///
/// ```json
/// {
///   "event_type": "video_played",
///   "course_id": "5f0c...",
///   "section_id": "9a1e...",
///   "metadata": {"seconds": 42}
/// }
/// ```
pub async fn record_activity(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Json(request): Json<CreateActivityRequest>,
) -> AppResult<(StatusCode, Json<ActivityEvent>)> {
    let event = services.events.record_activity(&user, request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Submit a quiz answer for grading.
///
/// `POST /api/question-events`
///
/// # Request Body
///
/// ```json
/// {"question_id": "c3d4...", "selected_answers": [1], "time_spent_ms": 5300}
/// ```
///
/// # Response
///
/// ```json
/// {
///   "event_id": "e5f6...",
///   "question_id": "c3d4...",
///   "is_correct": true,
///   "attempt_number": 2,
///   "correct_answers": [1],
///   "explanation": "Goggles protect against splashes."
/// }
/// ```
pub async fn submit_answer(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Json(request): Json<SubmitAnswerRequest>,
) -> AppResult<(StatusCode, Json<AnswerResult>)> {
    let result = services.events.submit_answer(&user, request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}
