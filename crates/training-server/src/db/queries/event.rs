//! Activity and question event queries (tenant tables).

use sqlx::types::Json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::models::{ActivityEvent, QuestionEvent};
use crate::error::AppResult;

/// Record an activity event.
pub async fn insert_activity(
    conn: &mut PgConnection,
    plant_id: Uuid,
    user_id: Uuid,
    course_id: Option<Uuid>,
    section_id: Option<Uuid>,
    event_type: &str,
    metadata: &serde_json::Value,
) -> AppResult<ActivityEvent> {
    let row = sqlx::query_as::<_, ActivityEvent>(
        r#"
        INSERT INTO activity_events (plant_id, user_id, course_id, section_id, event_type, metadata)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, plant_id, user_id, course_id, section_id, event_type, metadata, occurred_at
        "#,
    )
    .bind(plant_id)
    .bind(user_id)
    .bind(course_id)
    .bind(section_id)
    .bind(event_type)
    .bind(metadata)
    .fetch_one(conn)
    .await?;

    Ok(row)
}

/// Previous attempts by a user on a question.
pub async fn count_attempts(
    conn: &mut PgConnection,
    plant_id: Uuid,
    user_id: Uuid,
    question_id: Uuid,
) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM question_events WHERE plant_id = $1 AND user_id = $2 AND question_id = $3",
    )
    .bind(plant_id)
    .bind(user_id)
    .bind(question_id)
    .fetch_one(conn)
    .await?;

    Ok(count)
}

/// Record a graded answer.
#[allow(clippy::too_many_arguments)]
pub async fn insert_question_event(
    conn: &mut PgConnection,
    plant_id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    question_id: Uuid,
    selected_answers: &[i32],
    is_correct: bool,
    attempt_number: i32,
    time_spent_ms: Option<i64>,
) -> AppResult<QuestionEvent> {
    let row = sqlx::query_as::<_, QuestionEvent>(
        r#"
        INSERT INTO question_events
            (plant_id, user_id, course_id, question_id, selected_answers, is_correct,
             attempt_number, time_spent_ms)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, plant_id, user_id, course_id, question_id, selected_answers, is_correct,
                  attempt_number, time_spent_ms, occurred_at
        "#,
    )
    .bind(plant_id)
    .bind(user_id)
    .bind(course_id)
    .bind(question_id)
    .bind(Json(selected_answers))
    .bind(is_correct)
    .bind(attempt_number)
    .bind(time_spent_ms)
    .fetch_one(conn)
    .await?;

    Ok(row)
}

/// Serialize attempt numbering for one user/question pair.
pub async fn lock_attempts(conn: &mut PgConnection, user_id: Uuid, question_id: Uuid) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text || ':' || $2::text, 0))")
        .bind(user_id)
        .bind(question_id)
        .execute(conn)
        .await?;

    Ok(())
}
