//! Course queries. Courses are shared across plants.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::models::Course;
use crate::db::DbPool;
use crate::error::AppResult;

const COURSE_COLUMNS: &str = "id, slug, title, description, version, estimated_minutes, \
    passing_score, is_published, created_at, updated_at";

/// List courses, optionally only published ones, with text search.
pub async fn list_courses(
    pool: &DbPool,
    published_only: bool,
    search: Option<&str>,
) -> AppResult<Vec<Course>> {
    let pattern = search.map(|q| format!("%{}%", q));

    let courses = sqlx::query_as::<_, Course>(&format!(
        r#"
        SELECT {COURSE_COLUMNS} FROM courses
        WHERE (NOT $1 OR is_published)
          AND ($2::TEXT IS NULL OR title ILIKE $2 OR description ILIKE $2)
        ORDER BY title
        "#
    ))
    .bind(published_only)
    .bind(pattern.as_deref())
    .fetch_all(pool)
    .await?;

    Ok(courses)
}

/// Get a course by ID.
pub async fn get_course(pool: &DbPool, id: Uuid) -> AppResult<Option<Course>> {
    let course = sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(course)
}

/// Insert a new course (unpublished).
pub async fn insert_course(
    pool: &DbPool,
    slug: &str,
    title: &str,
    description: Option<&str>,
    estimated_minutes: i32,
    passing_score: i32,
) -> AppResult<Course> {
    let course = sqlx::query_as::<_, Course>(&format!(
        r#"
        INSERT INTO courses (slug, title, description, estimated_minutes, passing_score)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {COURSE_COLUMNS}
        "#
    ))
    .bind(slug)
    .bind(title.trim())
    .bind(description)
    .bind(estimated_minutes)
    .bind(passing_score)
    .fetch_one(pool)
    .await?;

    Ok(course)
}

/// Update course fields; `None` fields are left unchanged.
pub async fn update_course(
    conn: &mut PgConnection,
    id: Uuid,
    slug: Option<&str>,
    title: Option<&str>,
    description: Option<&str>,
    estimated_minutes: Option<i32>,
    passing_score: Option<i32>,
) -> AppResult<Option<Course>> {
    let course = sqlx::query_as::<_, Course>(&format!(
        r#"
        UPDATE courses
        SET slug = COALESCE($2, slug),
            title = COALESCE($3, title),
            description = COALESCE($4, description),
            estimated_minutes = COALESCE($5, estimated_minutes),
            passing_score = COALESCE($6, passing_score),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {COURSE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(slug)
    .bind(title.map(str::trim))
    .bind(description)
    .bind(estimated_minutes)
    .bind(passing_score)
    .fetch_optional(conn)
    .await?;

    Ok(course)
}

/// Set the published flag.
pub async fn set_published(pool: &DbPool, id: Uuid, published: bool) -> AppResult<Option<Course>> {
    let course = sqlx::query_as::<_, Course>(&format!(
        r#"
        UPDATE courses SET is_published = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {COURSE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(published)
    .fetch_optional(pool)
    .await?;

    Ok(course)
}

/// Increment the content version after a content edit.
pub async fn bump_version(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Course>> {
    let course = sqlx::query_as::<_, Course>(&format!(
        "UPDATE courses SET version = version + 1, updated_at = NOW() WHERE id = $1 \
         RETURNING {COURSE_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(course)
}

/// Delete a course and its content.
pub async fn delete_course(conn: &mut PgConnection, id: Uuid) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}
