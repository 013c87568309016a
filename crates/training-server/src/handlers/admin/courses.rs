//! Course and content administration handlers.
//!
//! hr_admins may read courses; all writes require dev_admin.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::auth::UserContext;
use crate::db::models::{
    AdminCourseDetail, ContentBlock, ContentTranslation, Course, CourseQuery, CourseSection,
    CreateBlockRequest, CreateCourseRequest, CreateQuestionRequest, CreateSectionRequest,
    ListResponse, QuizQuestion, TranslationQuery, UpdateBlockRequest, UpdateCourseRequest,
    UpdateQuestionRequest, UpdateSectionRequest, UpsertTranslationRequest,
};
use crate::error::AppResult;
use crate::state::Services;

// --- courses ---

/// `GET /api/admin/courses?q=&include_unpublished=true`
pub async fn list(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<CourseQuery>,
) -> AppResult<Json<ListResponse<Course>>> {
    Ok(Json(services.courses.admin_list(&user, query).await?))
}

/// Create a course (unpublished).
///
/// `POST /api/admin/courses`
///
/// # Request Body
///
/// ```json
/// {
///   "slug": "forklift-safety",
///   "title": "Forklift Safety",
///   "description": "Pre-use inspection and safe operation",
///   "estimated_minutes": 25,
///   "passing_score": 80
/// }
/// ```
pub async fn create(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Json(request): Json<CreateCourseRequest>,
) -> AppResult<(StatusCode, Json<Course>)> {
    let course = services.courses.create(&user, request).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// Course with all content, answer keys included.
///
/// `GET /api/admin/courses/{course_id}`
pub async fn get(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<AdminCourseDetail>> {
    Ok(Json(services.courses.admin_get(&user, course_id).await?))
}

/// `PATCH /api/admin/courses/{course_id}`
pub async fn update(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(course_id): Path<Uuid>,
    Json(request): Json<UpdateCourseRequest>,
) -> AppResult<Json<Course>> {
    Ok(Json(services.courses.update(&user, course_id, request).await?))
}

/// `DELETE /api/admin/courses/{course_id}`
pub async fn delete(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(course_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services.courses.delete(&user, course_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/admin/courses/{course_id}/publish`
pub async fn publish(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Course>> {
    Ok(Json(services.courses.set_published(&user, course_id, true).await?))
}

/// `POST /api/admin/courses/{course_id}/unpublish`
pub async fn unpublish(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Course>> {
    Ok(Json(services.courses.set_published(&user, course_id, false).await?))
}

// --- sections ---

/// `POST /api/admin/courses/{course_id}/sections`
pub async fn create_section(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(course_id): Path<Uuid>,
    Json(request): Json<CreateSectionRequest>,
) -> AppResult<(StatusCode, Json<CourseSection>)> {
    let section = services.content.create_section(&user, course_id, request).await?;
    Ok((StatusCode::CREATED, Json(section)))
}

/// `PATCH /api/admin/sections/{section_id}`
pub async fn update_section(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(section_id): Path<Uuid>,
    Json(request): Json<UpdateSectionRequest>,
) -> AppResult<Json<CourseSection>> {
    Ok(Json(services.content.update_section(&user, section_id, request).await?))
}

/// `DELETE /api/admin/sections/{section_id}`
pub async fn delete_section(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(section_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services.content.delete_section(&user, section_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- blocks ---

/// Add a content block.
///
/// `POST /api/admin/sections/{section_id}/blocks`
///
/// # Request Body
///
/// ```json
/// {"block_type": "callout", "position": 2, "content": {"body": "Never bypass a guard."}}
/// ```
pub async fn create_block(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(section_id): Path<Uuid>,
    Json(request): Json<CreateBlockRequest>,
) -> AppResult<(StatusCode, Json<ContentBlock>)> {
    let block = services.content.create_block(&user, section_id, request).await?;
    Ok((StatusCode::CREATED, Json(block)))
}

/// `PATCH /api/admin/blocks/{block_id}`
pub async fn update_block(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(block_id): Path<Uuid>,
    Json(request): Json<UpdateBlockRequest>,
) -> AppResult<Json<ContentBlock>> {
    Ok(Json(services.content.update_block(&user, block_id, request).await?))
}

/// `DELETE /api/admin/blocks/{block_id}`
pub async fn delete_block(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(block_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services.content.delete_block(&user, block_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- questions ---

/// Add a quiz question.
///
/// `POST /api/admin/sections/{section_id}/questions`
///
/// # Request Body
///
/// ```json
/// {
///   "prompt": "Which PPE is required when handling caustics?",
///   "question_type": "multiple_choice",
///   "options": ["Goggles", "Face shield", "Ear plugs"],
///   "correct_answers": [0, 1],
///   "explanation": "Splash protection for eyes and face.",
///   "position": 0
/// }
/// ```
pub async fn create_question(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(section_id): Path<Uuid>,
    Json(request): Json<CreateQuestionRequest>,
) -> AppResult<(StatusCode, Json<QuizQuestion>)> {
    let question = services.content.create_question(&user, section_id, request).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// `PATCH /api/admin/questions/{question_id}`
pub async fn update_question(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(question_id): Path<Uuid>,
    Json(request): Json<UpdateQuestionRequest>,
) -> AppResult<Json<QuizQuestion>> {
    Ok(Json(services.content.update_question(&user, question_id, request).await?))
}

/// `DELETE /api/admin/questions/{question_id}`
pub async fn delete_question(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(question_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services.content.delete_question(&user, question_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- translations ---

/// `GET /api/admin/translations?entity_type=&entity_id=&locale=`
pub async fn list_translations(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<TranslationQuery>,
) -> AppResult<Json<ListResponse<ContentTranslation>>> {
    Ok(Json(services.content.list_translations(&user, query).await?))
}

/// Insert or replace one translated field.
///
/// `PUT /api/admin/translations`
///
/// # Request Body
///
/// ```json
/// {
///   "entity_type": "question",
///   "entity_id": "c3d4...",
///   "locale": "es",
///   "field": "options",
///   "value": "[\"Gafas\", \"Careta\", \"Tapones\"]"
/// }
/// ```
pub async fn upsert_translation(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Json(request): Json<UpsertTranslationRequest>,
) -> AppResult<Json<ContentTranslation>> {
    Ok(Json(services.content.upsert_translation(&user, request).await?))
}

/// `DELETE /api/admin/translations/{translation_id}`
pub async fn delete_translation(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(translation_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services.content.delete_translation(&user, translation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
