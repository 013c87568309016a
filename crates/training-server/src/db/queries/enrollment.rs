//! Enrollment queries (tenant table, run on a plant-scoped connection).

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::models::{Enrollment, EnrollmentStatus, EnrollmentView};
use crate::error::AppResult;

const ENROLLMENT_COLUMNS: &str = "id, plant_id, user_id, course_id, status, assigned_by, due_at, \
    enrolled_at, started_at, completed_at";

const VIEW_SELECT: &str = r#"
    SELECT e.id, e.plant_id, e.user_id, p.full_name AS user_name, p.email AS user_email,
           e.course_id, c.title AS course_title, e.status, e.assigned_by, e.due_at,
           e.enrolled_at, e.started_at, e.completed_at, pr.progress_percent
    FROM enrollments e
    JOIN profiles p ON p.id = e.user_id
    JOIN courses c ON c.id = e.course_id
    LEFT JOIN progress pr ON pr.user_id = e.user_id AND pr.course_id = e.course_id
"#;

/// Get an enrollment by ID.
pub async fn get_enrollment(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Enrollment>> {
    let row = sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Get a user's enrollment in a course.
pub async fn find_enrollment(
    conn: &mut PgConnection,
    plant_id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
) -> AppResult<Option<Enrollment>> {
    let row = sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments \
         WHERE plant_id = $1 AND user_id = $2 AND course_id = $3"
    ))
    .bind(plant_id)
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Like [`find_enrollment`], but holds a row lock until the transaction
/// ends so concurrent progress reports for the course run one at a time.
pub async fn lock_enrollment(
    conn: &mut PgConnection,
    plant_id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
) -> AppResult<Option<Enrollment>> {
    let row = sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments \
         WHERE plant_id = $1 AND user_id = $2 AND course_id = $3 FOR UPDATE"
    ))
    .bind(plant_id)
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Insert an enrollment unless the user already has one for the course.
///
/// Returns `None` when the enrollment already existed.
pub async fn insert_enrollment(
    conn: &mut PgConnection,
    plant_id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    assigned_by: Option<Uuid>,
    due_at: Option<DateTime<Utc>>,
) -> AppResult<Option<Enrollment>> {
    let row = sqlx::query_as::<_, Enrollment>(&format!(
        r#"
        INSERT INTO enrollments (plant_id, user_id, course_id, assigned_by, due_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, course_id) DO NOTHING
        RETURNING {ENROLLMENT_COLUMNS}
        "#
    ))
    .bind(plant_id)
    .bind(user_id)
    .bind(course_id)
    .bind(assigned_by)
    .bind(due_at)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Enrollments of one user, with course titles.
pub async fn list_for_user(
    conn: &mut PgConnection,
    plant_id: Uuid,
    user_id: Uuid,
) -> AppResult<Vec<EnrollmentView>> {
    let rows = sqlx::query_as::<_, EnrollmentView>(&format!(
        "{VIEW_SELECT} WHERE e.plant_id = $1 AND e.user_id = $2 ORDER BY e.enrolled_at DESC"
    ))
    .bind(plant_id)
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Filtered, paged enrollment list for admins.
#[allow(clippy::too_many_arguments)]
pub async fn list_enrollments(
    conn: &mut PgConnection,
    plant_id: Option<Uuid>,
    course_id: Option<Uuid>,
    user_id: Option<Uuid>,
    status: Option<&str>,
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<EnrollmentView>, i64)> {
    let filter = r#"
        WHERE ($1::UUID IS NULL OR e.plant_id = $1)
          AND ($2::UUID IS NULL OR e.course_id = $2)
          AND ($3::UUID IS NULL OR e.user_id = $3)
          AND ($4::TEXT IS NULL OR e.status = $4)
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM enrollments e {filter}"))
        .bind(plant_id)
        .bind(course_id)
        .bind(user_id)
        .bind(status)
        .fetch_one(&mut *conn)
        .await?;

    let rows = sqlx::query_as::<_, EnrollmentView>(&format!(
        "{VIEW_SELECT} {filter} ORDER BY e.enrolled_at DESC LIMIT $5 OFFSET $6"
    ))
    .bind(plant_id)
    .bind(course_id)
    .bind(user_id)
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await?;

    Ok((rows, total))
}

/// Move an enrollment to `status`, stamping start/completion times.
pub async fn set_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: EnrollmentStatus,
) -> AppResult<Option<Enrollment>> {
    let row = sqlx::query_as::<_, Enrollment>(&format!(
        r#"
        UPDATE enrollments
        SET status = $2,
            started_at = CASE
                WHEN $2 IN ('in_progress', 'completed') THEN COALESCE(started_at, NOW())
                ELSE NULL END,
            completed_at = CASE
                WHEN $2 = 'completed' THEN COALESCE(completed_at, NOW())
                ELSE NULL END
        WHERE id = $1
        RETURNING {ENROLLMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Set or clear the due date.
pub async fn set_due_at(
    conn: &mut PgConnection,
    id: Uuid,
    due_at: Option<DateTime<Utc>>,
) -> AppResult<Option<Enrollment>> {
    let row = sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments SET due_at = $2 WHERE id = $1 RETURNING {ENROLLMENT_COLUMNS}"
    ))
    .bind(id)
    .bind(due_at)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Delete an enrollment and the learner's progress for that course.
pub async fn delete_enrollment(conn: &mut PgConnection, id: Uuid) -> AppResult<bool> {
    let removed: Option<(Uuid, Uuid)> = sqlx::query_as(
        "DELETE FROM enrollments WHERE id = $1 RETURNING user_id, course_id",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some((user_id, course_id)) = removed else {
        return Ok(false);
    };

    sqlx::query("DELETE FROM progress WHERE user_id = $1 AND course_id = $2")
        .bind(user_id)
        .bind(course_id)
        .execute(&mut *conn)
        .await?;

    Ok(true)
}
