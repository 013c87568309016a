//! Aggregate queries for admin analytics.
//!
//! All run on a plant-scoped connection; `plant_id = NULL` aggregates
//! over every plant visible to the scope.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::models::{DailyActivity, QuestionAccuracy};
use crate::error::AppResult;

/// Enrollment counts grouped by status.
pub async fn enrollment_status_counts(
    conn: &mut PgConnection,
    plant_id: Option<Uuid>,
    course_id: Option<Uuid>,
) -> AppResult<Vec<(String, i64)>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT status, COUNT(*)
        FROM enrollments
        WHERE ($1::UUID IS NULL OR plant_id = $1)
          AND ($2::UUID IS NULL OR course_id = $2)
        GROUP BY status
        "#,
    )
    .bind(plant_id)
    .bind(course_id)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Mean progress percent over enrolled learners (0 if none).
pub async fn average_progress(
    conn: &mut PgConnection,
    plant_id: Option<Uuid>,
    course_id: Option<Uuid>,
) -> AppResult<f64> {
    let avg: Option<f64> = sqlx::query_scalar(
        r#"
        SELECT AVG(COALESCE(pr.progress_percent, 0))::FLOAT8
        FROM enrollments e
        LEFT JOIN progress pr ON pr.user_id = e.user_id AND pr.course_id = e.course_id
        WHERE ($1::UUID IS NULL OR e.plant_id = $1)
          AND ($2::UUID IS NULL OR e.course_id = $2)
        "#,
    )
    .bind(plant_id)
    .bind(course_id)
    .fetch_one(conn)
    .await?;

    Ok(avg.map(|a| (a * 10.0).round() / 10.0).unwrap_or(0.0))
}

/// Active profiles.
pub async fn active_learners(conn: &mut PgConnection, plant_id: Option<Uuid>) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM profiles WHERE is_active AND ($1::UUID IS NULL OR plant_id = $1)",
    )
    .bind(plant_id)
    .fetch_one(conn)
    .await?;

    Ok(count)
}

/// Distinct learners with activity in the last `days` days.
pub async fn recently_active_learners(
    conn: &mut PgConnection,
    plant_id: Option<Uuid>,
    days: i32,
) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(DISTINCT user_id)
        FROM activity_events
        WHERE ($1::UUID IS NULL OR plant_id = $1)
          AND occurred_at >= NOW() - make_interval(days => $2)
        "#,
    )
    .bind(plant_id)
    .bind(days)
    .fetch_one(conn)
    .await?;

    Ok(count)
}

/// Incomplete enrollments past their due date.
pub async fn overdue_enrollments(conn: &mut PgConnection, plant_id: Option<Uuid>) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM enrollments
        WHERE ($1::UUID IS NULL OR plant_id = $1)
          AND status <> 'completed'
          AND due_at IS NOT NULL AND due_at < NOW()
        "#,
    )
    .bind(plant_id)
    .fetch_one(conn)
    .await?;

    Ok(count)
}

/// Answer accuracy for every question of a course.
pub async fn question_accuracy(
    conn: &mut PgConnection,
    plant_id: Option<Uuid>,
    course_id: Uuid,
) -> AppResult<Vec<QuestionAccuracy>> {
    let rows = sqlx::query_as::<_, QuestionAccuracy>(
        r#"
        SELECT q.id AS question_id,
               q.prompt,
               COUNT(qe.id) AS attempts,
               COUNT(qe.id) FILTER (WHERE qe.is_correct) AS correct,
               COUNT(qe.id) FILTER (WHERE qe.is_correct AND qe.attempt_number = 1) AS first_attempt_correct
        FROM quiz_questions q
        JOIN course_sections s ON s.id = q.section_id
        LEFT JOIN question_events qe
               ON qe.question_id = q.id
              AND ($1::UUID IS NULL OR qe.plant_id = $1)
        WHERE s.course_id = $2
        GROUP BY q.id, q.prompt, s.position, q.position
        ORDER BY s.position, q.position
        "#,
    )
    .bind(plant_id)
    .bind(course_id)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Daily activity counts for the last `days` days.
pub async fn daily_activity(
    conn: &mut PgConnection,
    plant_id: Option<Uuid>,
    days: i32,
) -> AppResult<Vec<DailyActivity>> {
    let rows = sqlx::query_as::<_, DailyActivity>(
        r#"
        SELECT (occurred_at AT TIME ZONE 'UTC')::DATE AS day,
               event_type,
               COUNT(*) AS events,
               COUNT(DISTINCT user_id) AS learners
        FROM activity_events
        WHERE ($1::UUID IS NULL OR plant_id = $1)
          AND occurred_at >= NOW() - make_interval(days => $2)
        GROUP BY day, event_type
        ORDER BY day, event_type
        "#,
    )
    .bind(plant_id)
    .bind(days)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}
