//! Course content queries: sections, blocks, questions, translations.

use sqlx::types::Json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::models::{ContentBlock, ContentTranslation, CourseSection, QuizQuestion};
use crate::db::DbPool;
use crate::error::AppResult;

const SECTION_COLUMNS: &str =
    "id, course_id, title, position, estimated_minutes, created_at, updated_at";
const BLOCK_COLUMNS: &str =
    "id, section_id, block_type, position, content, created_at, updated_at";
const QUESTION_COLUMNS: &str = "id, section_id, prompt, question_type, options, correct_answers, \
    explanation, position, created_at, updated_at";
const TRANSLATION_COLUMNS: &str =
    "id, entity_type, entity_id, locale, field, value, created_at, updated_at";

// --- sections ---

/// Sections of a course in delivery order.
pub async fn list_sections(pool: &DbPool, course_id: Uuid) -> AppResult<Vec<CourseSection>> {
    let sections = sqlx::query_as::<_, CourseSection>(&format!(
        "SELECT {SECTION_COLUMNS} FROM course_sections WHERE course_id = $1 ORDER BY position"
    ))
    .bind(course_id)
    .fetch_all(pool)
    .await?;

    Ok(sections)
}

pub async fn insert_section(
    conn: &mut PgConnection,
    course_id: Uuid,
    title: &str,
    position: i32,
    estimated_minutes: Option<i32>,
) -> AppResult<CourseSection> {
    let section = sqlx::query_as::<_, CourseSection>(&format!(
        r#"
        INSERT INTO course_sections (course_id, title, position, estimated_minutes)
        VALUES ($1, $2, $3, $4)
        RETURNING {SECTION_COLUMNS}
        "#
    ))
    .bind(course_id)
    .bind(title.trim())
    .bind(position)
    .bind(estimated_minutes)
    .fetch_one(conn)
    .await?;

    Ok(section)
}

pub async fn update_section(
    conn: &mut PgConnection,
    id: Uuid,
    title: Option<&str>,
    position: Option<i32>,
    estimated_minutes: Option<i32>,
) -> AppResult<Option<CourseSection>> {
    let section = sqlx::query_as::<_, CourseSection>(&format!(
        r#"
        UPDATE course_sections
        SET title = COALESCE($2, title),
            position = COALESCE($3, position),
            estimated_minutes = COALESCE($4, estimated_minutes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {SECTION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(title.map(str::trim))
    .bind(position)
    .bind(estimated_minutes)
    .fetch_optional(conn)
    .await?;

    Ok(section)
}

/// Delete a section, returning its course id.
pub async fn delete_section(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Uuid>> {
    let course_id: Option<Uuid> =
        sqlx::query_scalar("DELETE FROM course_sections WHERE id = $1 RETURNING course_id")
            .bind(id)
            .fetch_optional(conn)
            .await?;

    Ok(course_id)
}

// --- blocks ---

/// Blocks of every section of a course.
pub async fn list_blocks_for_course(pool: &DbPool, course_id: Uuid) -> AppResult<Vec<ContentBlock>> {
    let blocks = sqlx::query_as::<_, ContentBlock>(
        r#"
        SELECT b.id, b.section_id, b.block_type, b.position, b.content, b.created_at, b.updated_at
        FROM content_blocks b
        JOIN course_sections s ON s.id = b.section_id
        WHERE s.course_id = $1
        ORDER BY s.position, b.position
        "#,
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;

    Ok(blocks)
}

pub async fn get_block(pool: &DbPool, id: Uuid) -> AppResult<Option<ContentBlock>> {
    let block = sqlx::query_as::<_, ContentBlock>(&format!(
        "SELECT {BLOCK_COLUMNS} FROM content_blocks WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(block)
}

pub async fn insert_block(
    conn: &mut PgConnection,
    section_id: Uuid,
    block_type: &str,
    position: i32,
    content: &serde_json::Value,
) -> AppResult<ContentBlock> {
    let block = sqlx::query_as::<_, ContentBlock>(&format!(
        r#"
        INSERT INTO content_blocks (section_id, block_type, position, content)
        VALUES ($1, $2, $3, $4)
        RETURNING {BLOCK_COLUMNS}
        "#
    ))
    .bind(section_id)
    .bind(block_type)
    .bind(position)
    .bind(content)
    .fetch_one(conn)
    .await?;

    Ok(block)
}

pub async fn update_block(
    conn: &mut PgConnection,
    id: Uuid,
    position: Option<i32>,
    content: Option<&serde_json::Value>,
) -> AppResult<Option<ContentBlock>> {
    let block = sqlx::query_as::<_, ContentBlock>(&format!(
        r#"
        UPDATE content_blocks
        SET position = COALESCE($2, position),
            content = COALESCE($3, content),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {BLOCK_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(position)
    .bind(content)
    .fetch_optional(conn)
    .await?;

    Ok(block)
}

/// Delete a block, returning its course id.
pub async fn delete_block(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Uuid>> {
    let course_id: Option<Uuid> = sqlx::query_scalar(
        r#"
        DELETE FROM content_blocks b
        USING course_sections s
        WHERE b.id = $1 AND s.id = b.section_id
        RETURNING s.course_id
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(course_id)
}

// --- questions ---

/// Questions of every section of a course.
pub async fn list_questions_for_course(
    pool: &DbPool,
    course_id: Uuid,
) -> AppResult<Vec<QuizQuestion>> {
    let questions = sqlx::query_as::<_, QuizQuestion>(
        r#"
        SELECT q.id, q.section_id, q.prompt, q.question_type, q.options, q.correct_answers,
               q.explanation, q.position, q.created_at, q.updated_at
        FROM quiz_questions q
        JOIN course_sections s ON s.id = q.section_id
        WHERE s.course_id = $1
        ORDER BY s.position, q.position
        "#,
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

pub async fn get_question(pool: &DbPool, id: Uuid) -> AppResult<Option<QuizQuestion>> {
    let question = sqlx::query_as::<_, QuizQuestion>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM quiz_questions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(question)
}

/// Question together with the course it belongs to and whether that
/// course is published.
pub async fn get_question_course(pool: &DbPool, id: Uuid) -> AppResult<Option<(Uuid, bool)>> {
    let row: Option<(Uuid, bool)> = sqlx::query_as(
        r#"
        SELECT c.id, c.is_published
        FROM quiz_questions q
        JOIN course_sections s ON s.id = q.section_id
        JOIN courses c ON c.id = s.course_id
        WHERE q.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_question(
    conn: &mut PgConnection,
    section_id: Uuid,
    prompt: &str,
    question_type: &str,
    options: &[String],
    correct_answers: &[i32],
    explanation: Option<&str>,
    position: i32,
) -> AppResult<QuizQuestion> {
    let question = sqlx::query_as::<_, QuizQuestion>(&format!(
        r#"
        INSERT INTO quiz_questions
            (section_id, prompt, question_type, options, correct_answers, explanation, position)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {QUESTION_COLUMNS}
        "#
    ))
    .bind(section_id)
    .bind(prompt.trim())
    .bind(question_type)
    .bind(Json(options))
    .bind(Json(correct_answers))
    .bind(explanation)
    .bind(position)
    .fetch_one(conn)
    .await?;

    Ok(question)
}

#[allow(clippy::too_many_arguments)]
pub async fn update_question(
    conn: &mut PgConnection,
    id: Uuid,
    prompt: Option<&str>,
    question_type: Option<&str>,
    options: Option<&[String]>,
    correct_answers: Option<&[i32]>,
    explanation: Option<&str>,
    position: Option<i32>,
) -> AppResult<Option<QuizQuestion>> {
    let question = sqlx::query_as::<_, QuizQuestion>(&format!(
        r#"
        UPDATE quiz_questions
        SET prompt = COALESCE($2, prompt),
            question_type = COALESCE($3, question_type),
            options = COALESCE($4, options),
            correct_answers = COALESCE($5, correct_answers),
            explanation = COALESCE($6, explanation),
            position = COALESCE($7, position),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {QUESTION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(prompt.map(str::trim))
    .bind(question_type)
    .bind(options.map(Json))
    .bind(correct_answers.map(Json))
    .bind(explanation)
    .bind(position)
    .fetch_optional(conn)
    .await?;

    Ok(question)
}

/// Delete a question, returning its course id.
pub async fn delete_question(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Uuid>> {
    let course_id: Option<Uuid> = sqlx::query_scalar(
        r#"
        DELETE FROM quiz_questions q
        USING course_sections s
        WHERE q.id = $1 AND s.id = q.section_id
        RETURNING s.course_id
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(course_id)
}

// --- translations ---

/// Translations for a set of entities in one locale.
pub async fn list_translations_for(
    pool: &DbPool,
    locale: &str,
    entity_ids: &[Uuid],
) -> AppResult<Vec<ContentTranslation>> {
    let rows = sqlx::query_as::<_, ContentTranslation>(&format!(
        "SELECT {TRANSLATION_COLUMNS} FROM content_translations WHERE locale = $1 AND entity_id = ANY($2)"
    ))
    .bind(locale)
    .bind(entity_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Translations matching optional filters.
pub async fn list_translations(
    pool: &DbPool,
    entity_type: Option<&str>,
    entity_id: Option<Uuid>,
    locale: Option<&str>,
) -> AppResult<Vec<ContentTranslation>> {
    let rows = sqlx::query_as::<_, ContentTranslation>(&format!(
        r#"
        SELECT {TRANSLATION_COLUMNS} FROM content_translations
        WHERE ($1::TEXT IS NULL OR entity_type = $1)
          AND ($2::UUID IS NULL OR entity_id = $2)
          AND ($3::TEXT IS NULL OR locale = $3)
        ORDER BY entity_type, entity_id, locale, field
        "#
    ))
    .bind(entity_type)
    .bind(entity_id)
    .bind(locale)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn upsert_translation(
    pool: &DbPool,
    entity_type: &str,
    entity_id: Uuid,
    locale: &str,
    field: &str,
    value: &str,
) -> AppResult<ContentTranslation> {
    let row = sqlx::query_as::<_, ContentTranslation>(&format!(
        r#"
        INSERT INTO content_translations (entity_type, entity_id, locale, field, value)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (entity_type, entity_id, locale, field)
        DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
        RETURNING {TRANSLATION_COLUMNS}
        "#
    ))
    .bind(entity_type)
    .bind(entity_id)
    .bind(locale)
    .bind(field)
    .bind(value)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn delete_translation(pool: &DbPool, id: Uuid) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM content_translations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Drop the translations of one entity.
pub async fn delete_translations_of(
    conn: &mut PgConnection,
    entity_type: &str,
    entity_id: Uuid,
) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM content_translations WHERE entity_type = $1 AND entity_id = $2")
        .bind(entity_type)
        .bind(entity_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

/// Drop the translations of a section and of its blocks and questions.
///
/// Translations have no foreign key, so this must run before the section
/// delete cascades to its content.
pub async fn delete_section_translations(conn: &mut PgConnection, section_id: Uuid) -> AppResult<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM content_translations t
        WHERE (t.entity_type = 'section' AND t.entity_id = $1)
           OR (t.entity_type = 'block'
               AND t.entity_id IN (SELECT id FROM content_blocks WHERE section_id = $1))
           OR (t.entity_type = 'question'
               AND t.entity_id IN (SELECT id FROM quiz_questions WHERE section_id = $1))
        "#,
    )
    .bind(section_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Drop the translations of a course and of all its content.
pub async fn delete_course_translations(conn: &mut PgConnection, course_id: Uuid) -> AppResult<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM content_translations t
        WHERE (t.entity_type = 'course' AND t.entity_id = $1)
           OR (t.entity_type = 'section'
               AND t.entity_id IN (SELECT id FROM course_sections WHERE course_id = $1))
           OR (t.entity_type = 'block'
               AND t.entity_id IN (
                   SELECT b.id FROM content_blocks b
                   JOIN course_sections s ON s.id = b.section_id
                   WHERE s.course_id = $1))
           OR (t.entity_type = 'question'
               AND t.entity_id IN (
                   SELECT q.id FROM quiz_questions q
                   JOIN course_sections s ON s.id = q.section_id
                   WHERE s.course_id = $1))
        "#,
    )
    .bind(course_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Whether the entity a translation targets exists.
pub async fn entity_exists(pool: &DbPool, entity_type: &str, entity_id: Uuid) -> AppResult<bool> {
    let table = match entity_type {
        "course" => "courses",
        "section" => "course_sections",
        "block" => "content_blocks",
        "question" => "quiz_questions",
        _ => return Ok(false),
    };

    let exists: bool = sqlx::query_scalar(&format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)"
    ))
    .bind(entity_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Course that owns a section.
pub async fn course_of_section(pool: &DbPool, section_id: Uuid) -> AppResult<Option<Uuid>> {
    let course_id: Option<Uuid> =
        sqlx::query_scalar("SELECT course_id FROM course_sections WHERE id = $1")
            .bind(section_id)
            .fetch_optional(pool)
            .await?;

    Ok(course_id)
}
