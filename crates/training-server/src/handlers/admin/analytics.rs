//! Analytics handlers.
//!
//! hr_admins see their own plant; dev_admins see every plant or filter
//! with `plant_id`.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::auth::UserContext;
use crate::db::models::{AnalyticsOverview, AnalyticsQuery, CourseAnalytics, DailyActivity, ListResponse};
use crate::error::AppResult;
use crate::state::Services;

/// `GET /api/admin/analytics/overview?plant_id=`
pub async fn overview(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<AnalyticsOverview>> {
    Ok(Json(services.analytics.overview(&user, query).await?))
}

/// Completion and per-question accuracy for one course.
///
/// `GET /api/admin/analytics/courses/{course_id}?plant_id=`
pub async fn course(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(course_id): Path<Uuid>,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<CourseAnalytics>> {
    Ok(Json(services.analytics.course(&user, course_id, query).await?))
}

/// `GET /api/admin/analytics/activity?days=30&plant_id=`
pub async fn activity(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<ListResponse<DailyActivity>>> {
    Ok(Json(services.analytics.activity(&user, query).await?))
}
