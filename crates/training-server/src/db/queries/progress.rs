//! Progress queries (tenant table, run on a plant-scoped connection).

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::models::Progress;
use crate::error::AppResult;

const PROGRESS_COLUMNS: &str = "id, plant_id, user_id, course_id, progress_percent, \
    current_section_id, completed_sections, last_accessed_at, completed_at";

/// Progress rows of one user.
pub async fn list_for_user(
    conn: &mut PgConnection,
    plant_id: Uuid,
    user_id: Uuid,
) -> AppResult<Vec<Progress>> {
    let rows = sqlx::query_as::<_, Progress>(&format!(
        "SELECT {PROGRESS_COLUMNS} FROM progress WHERE plant_id = $1 AND user_id = $2 \
         ORDER BY last_accessed_at DESC"
    ))
    .bind(plant_id)
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// One user's progress in one course, locked for update.
pub async fn get_for_update(
    conn: &mut PgConnection,
    plant_id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
) -> AppResult<Option<Progress>> {
    let row = sqlx::query_as::<_, Progress>(&format!(
        "SELECT {PROGRESS_COLUMNS} FROM progress \
         WHERE plant_id = $1 AND user_id = $2 AND course_id = $3 FOR UPDATE"
    ))
    .bind(plant_id)
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// One user's progress in one course.
pub async fn get_progress(
    conn: &mut PgConnection,
    plant_id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
) -> AppResult<Option<Progress>> {
    let row = sqlx::query_as::<_, Progress>(&format!(
        "SELECT {PROGRESS_COLUMNS} FROM progress \
         WHERE plant_id = $1 AND user_id = $2 AND course_id = $3"
    ))
    .bind(plant_id)
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Write the full progress state, inserting the row if needed.
///
/// Percent and completion time never move backwards, even if the caller
/// computed from a stale row.
#[allow(clippy::too_many_arguments)]
pub async fn upsert_progress(
    conn: &mut PgConnection,
    plant_id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    progress_percent: i32,
    current_section_id: Option<Uuid>,
    completed_sections: &[Uuid],
    completed_at: Option<DateTime<Utc>>,
) -> AppResult<Progress> {
    let row = sqlx::query_as::<_, Progress>(&format!(
        r#"
        INSERT INTO progress
            (plant_id, user_id, course_id, progress_percent, current_section_id,
             completed_sections, last_accessed_at, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW(), $7)
        ON CONFLICT (user_id, course_id) DO UPDATE SET
            progress_percent = GREATEST(progress.progress_percent, EXCLUDED.progress_percent),
            current_section_id = EXCLUDED.current_section_id,
            completed_sections = EXCLUDED.completed_sections,
            last_accessed_at = NOW(),
            completed_at = COALESCE(progress.completed_at, EXCLUDED.completed_at)
        RETURNING {PROGRESS_COLUMNS}
        "#
    ))
    .bind(plant_id)
    .bind(user_id)
    .bind(course_id)
    .bind(progress_percent)
    .bind(current_section_id)
    .bind(Json(completed_sections))
    .bind(completed_at)
    .fetch_one(conn)
    .await?;

    Ok(row)
}
