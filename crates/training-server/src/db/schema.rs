//! Embedded schema DDL and validation.

use serde::Serialize;

use crate::db::DbPool;
use crate::error::{AppError, AppResult};

const SCHEMA_DDL: &str = include_str!("schema.sql");

/// Tables the service expects to find in its schema.
pub const REQUIRED_TABLES: [&str; 12] = [
    "plants",
    "profiles",
    "admin_roles",
    "courses",
    "course_sections",
    "content_blocks",
    "quiz_questions",
    "content_translations",
    "enrollments",
    "progress",
    "activity_events",
    "question_events",
];

/// Result of comparing the live schema against [`REQUIRED_TABLES`].
#[derive(Debug, Clone, Serialize)]
pub struct SchemaReport {
    pub schema: String,
    pub valid: bool,
    pub tables: Vec<String>,
    pub missing: Vec<String>,
}

/// Schema names are interpolated into DDL, so only plain identifiers pass.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// DDL with the schema placeholder filled in.
pub fn render_ddl(schema: &str) -> AppResult<String> {
    if !is_valid_identifier(schema) {
        return Err(AppError::Config(format!(
            "Invalid schema name '{}'",
            schema
        )));
    }
    Ok(SCHEMA_DDL.replace("{schema}", schema))
}

/// Create tables, indexes and row-level policies if they don't exist.
pub async fn init(pool: &DbPool, schema: &str) -> AppResult<()> {
    let ddl = render_ddl(schema)?;
    sqlx::raw_sql(&ddl).execute(pool).await?;
    tracing::info!(schema = %schema, "Database schema initialized");
    Ok(())
}

/// Compare existing tables against the required set.
pub async fn validate(pool: &DbPool, schema: &str) -> AppResult<SchemaReport> {
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::text FROM information_schema.tables WHERE table_schema = $1 ORDER BY table_name",
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    let missing: Vec<String> = REQUIRED_TABLES
        .iter()
        .filter(|t| !tables.iter().any(|existing| existing == *t))
        .map(|t| t.to_string())
        .collect();

    Ok(SchemaReport {
        schema: schema.to_string(),
        valid: missing.is_empty(),
        tables,
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_rules() {
        assert!(is_valid_identifier("training"));
        assert!(is_valid_identifier("_training_v2"));
        assert!(!is_valid_identifier("Training"));
        assert!(!is_valid_identifier("2training"));
        assert!(!is_valid_identifier("training; DROP TABLE plants"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_render_ddl() {
        let ddl = render_ddl("safety").unwrap();
        assert!(ddl.contains("CREATE SCHEMA IF NOT EXISTS safety;"));
        assert!(ddl.contains("SET search_path TO safety;"));
        assert!(!ddl.contains("{schema}"));
        assert!(ddl.contains("'{}'::jsonb"));
        assert!(render_ddl("bad-name").is_err());
    }

    #[test]
    fn test_ddl_covers_required_tables() {
        for table in REQUIRED_TABLES {
            assert!(
                SCHEMA_DDL.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", table)),
                "missing DDL for {}",
                table
            );
        }
    }
}
