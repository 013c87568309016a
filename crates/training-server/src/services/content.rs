//! Course content editing: sections, blocks, questions and translations.
//!
//! Every change to a course's content bumps the course version so
//! learners and caches can tell their copy is stale. The edit and the bump
//! commit together.

use uuid::Uuid;

use crate::auth::UserContext;
use crate::db::models::{
    BlockType, ContentBlock, ContentTranslation, CourseSection, CreateBlockRequest,
    CreateQuestionRequest, CreateSectionRequest, ListResponse, QuizQuestion, TranslationQuery,
    UpdateBlockRequest, UpdateQuestionRequest, UpdateSectionRequest, UpsertTranslationRequest,
    TRANSLATABLE_ENTITIES,
};
use crate::db::queries::{content as queries, course};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::result_ext::ResultExt;
use crate::validation::{self, Validate, ValidationErrors};

/// Service for content operations. All methods require dev_admin.
#[derive(Clone)]
pub struct ContentService {
    pool: DbPool,
}

impl ContentService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    // --- sections ---

    pub async fn create_section(
        &self,
        user: &UserContext,
        course_id: Uuid,
        request: CreateSectionRequest,
    ) -> AppResult<CourseSection> {
        user.require_dev_admin()?;
        request.validate()?;
        if course::get_course(&self.pool, course_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Course not found: {}", course_id)));
        }

        let mut tx = self.pool.begin().await?;
        let section = queries::insert_section(
            &mut tx,
            course_id,
            request.title.trim(),
            request.position,
            request.estimated_minutes,
        )
        .await?;
        course::bump_version(&mut tx, course_id).await?;
        tx.commit().await?;
        Ok(section)
    }

    pub async fn update_section(
        &self,
        user: &UserContext,
        id: Uuid,
        request: UpdateSectionRequest,
    ) -> AppResult<CourseSection> {
        user.require_dev_admin()?;
        request.validate()?;

        let mut tx = self.pool.begin().await?;
        let section = queries::update_section(
            &mut tx,
            id,
            request.title.as_deref().map(str::trim),
            request.position,
            request.estimated_minutes,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Section not found: {}", id)))?;
        course::bump_version(&mut tx, section.course_id).await?;
        tx.commit().await?;
        Ok(section)
    }

    /// Delete a section with its blocks, questions and their translations.
    pub async fn delete_section(&self, user: &UserContext, id: Uuid) -> AppResult<()> {
        user.require_dev_admin()?;

        let mut tx = self.pool.begin().await?;
        let translations = queries::delete_section_translations(&mut tx, id).await?;
        let course_id = queries::delete_section(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Section not found: {}", id)))?;
        course::bump_version(&mut tx, course_id).await?;
        tx.commit().await?;

        tracing::info!(section_id = %id, course_id = %course_id, translations, "Section deleted");
        Ok(())
    }

    // --- blocks ---

    pub async fn create_block(
        &self,
        user: &UserContext,
        section_id: Uuid,
        request: CreateBlockRequest,
    ) -> AppResult<ContentBlock> {
        user.require_dev_admin()?;
        request.validate()?;
        let course_id = self.course_of_section(section_id).await?;

        let mut tx = self.pool.begin().await?;
        let block = queries::insert_block(
            &mut tx,
            section_id,
            &request.block_type,
            request.position,
            &request.content,
        )
        .await?;
        course::bump_version(&mut tx, course_id).await?;
        tx.commit().await?;
        Ok(block)
    }

    pub async fn update_block(
        &self,
        user: &UserContext,
        id: Uuid,
        request: UpdateBlockRequest,
    ) -> AppResult<ContentBlock> {
        user.require_dev_admin()?;
        let current = queries::get_block(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Block not found: {}", id)))?;
        let block_type: BlockType = current
            .block_type
            .parse()
            .map_err(AppError::Internal)
            .log("reading stored block type")?;
        request.validate_for(block_type)?;
        let course_id = self.course_of_section(current.section_id).await?;

        let mut tx = self.pool.begin().await?;
        let block = queries::update_block(&mut tx, id, request.position, request.content.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Block not found: {}", id)))?;
        course::bump_version(&mut tx, course_id).await?;
        tx.commit().await?;
        Ok(block)
    }

    pub async fn delete_block(&self, user: &UserContext, id: Uuid) -> AppResult<()> {
        user.require_dev_admin()?;

        let mut tx = self.pool.begin().await?;
        queries::delete_translations_of(&mut tx, "block", id).await?;
        let course_id = queries::delete_block(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Block not found: {}", id)))?;
        course::bump_version(&mut tx, course_id).await?;
        tx.commit().await?;
        Ok(())
    }

    // --- questions ---

    pub async fn create_question(
        &self,
        user: &UserContext,
        section_id: Uuid,
        request: CreateQuestionRequest,
    ) -> AppResult<QuizQuestion> {
        user.require_dev_admin()?;
        request.validate()?;
        let course_id = self.course_of_section(section_id).await?;

        let mut tx = self.pool.begin().await?;
        let question = queries::insert_question(
            &mut tx,
            section_id,
            request.prompt.trim(),
            &request.question_type,
            &request.options,
            &request.correct_answers,
            request.explanation.as_deref(),
            request.position,
        )
        .await?;
        course::bump_version(&mut tx, course_id).await?;
        tx.commit().await?;
        Ok(question)
    }

    pub async fn update_question(
        &self,
        user: &UserContext,
        id: Uuid,
        request: UpdateQuestionRequest,
    ) -> AppResult<QuizQuestion> {
        user.require_dev_admin()?;
        let current = queries::get_question(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question not found: {}", id)))?;
        request.validate_against(&current)?;
        let course_id = self.course_of_section(current.section_id).await?;

        let mut tx = self.pool.begin().await?;
        let question = queries::update_question(
            &mut tx,
            id,
            request.prompt.as_deref().map(str::trim),
            request.question_type.as_deref(),
            request.options.as_deref(),
            request.correct_answers.as_deref(),
            request.explanation.as_deref(),
            request.position,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Question not found: {}", id)))?;
        course::bump_version(&mut tx, course_id).await?;
        tx.commit().await?;
        Ok(question)
    }

    pub async fn delete_question(&self, user: &UserContext, id: Uuid) -> AppResult<()> {
        user.require_dev_admin()?;

        let mut tx = self.pool.begin().await?;
        queries::delete_translations_of(&mut tx, "question", id).await?;
        let course_id = queries::delete_question(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question not found: {}", id)))?;
        course::bump_version(&mut tx, course_id).await?;
        tx.commit().await?;
        Ok(())
    }

    // --- translations ---

    pub async fn list_translations(
        &self,
        user: &UserContext,
        query: TranslationQuery,
    ) -> AppResult<ListResponse<ContentTranslation>> {
        user.require_dev_admin()?;
        check_translation_query(&query)?;

        let rows = queries::list_translations(
            &self.pool,
            query.entity_type.as_deref(),
            query.entity_id,
            query.locale.as_deref(),
        )
        .await?;
        Ok(ListResponse::unpaged(rows))
    }

    pub async fn upsert_translation(
        &self,
        user: &UserContext,
        request: UpsertTranslationRequest,
    ) -> AppResult<ContentTranslation> {
        user.require_dev_admin()?;
        request.validate()?;
        if !queries::entity_exists(&self.pool, &request.entity_type, request.entity_id).await? {
            return Err(AppError::NotFound(format!(
                "{} not found: {}",
                request.entity_type, request.entity_id
            )));
        }
        if request.field == "items" || request.field == "options" {
            check_string_list(&request.field, &request.value)?;
        }

        let row = queries::upsert_translation(
            &self.pool,
            &request.entity_type,
            request.entity_id,
            &request.locale,
            &request.field,
            &request.value,
        )
        .await?;

        tracing::debug!(
            entity_type = %row.entity_type,
            entity_id = %row.entity_id,
            locale = %row.locale,
            field = %row.field,
            "Translation saved"
        );
        Ok(row)
    }

    pub async fn delete_translation(&self, user: &UserContext, id: Uuid) -> AppResult<()> {
        user.require_dev_admin()?;
        if !queries::delete_translation(&self.pool, id).await? {
            return Err(AppError::NotFound(format!("Translation not found: {}", id)));
        }
        Ok(())
    }

    async fn course_of_section(&self, section_id: Uuid) -> AppResult<Uuid> {
        queries::course_of_section(&self.pool, section_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Section not found: {}", section_id)))
    }
}

fn check_translation_query(query: &TranslationQuery) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if let Some(entity_type) = &query.entity_type {
        validation::one_of(&mut errors, "entity_type", entity_type, &TRANSLATABLE_ENTITIES);
    }
    if let Some(locale) = &query.locale {
        validation::locale(&mut errors, "locale", locale);
    }
    errors.into_result()
}

/// List-valued fields are stored as a JSON array of strings.
fn check_string_list(field: &str, value: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if serde_json::from_str::<Vec<String>>(value).is_err() {
        errors.add("value", format!("{} translations must be a JSON array of strings", field));
    }
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::db::testing::{Seed, TestDb};
    use crate::services::CourseService;

    async fn translate(service: &ContentService, seed: &Seed, entity_type: &str, entity_id: Uuid, field: &str) {
        service
            .upsert_translation(
                &seed.admin,
                UpsertTranslationRequest {
                    entity_type: entity_type.to_string(),
                    entity_id,
                    locale: "es".to_string(),
                    field: field.to_string(),
                    value: "texto".to_string(),
                },
            )
            .await
            .unwrap();
    }

    async fn course_version(courses: &CourseService, seed: &Seed, id: Uuid) -> i32 {
        courses.admin_get(&seed.admin, id).await.unwrap().course.version
    }

    async fn translation_count(service: &ContentService, seed: &Seed) -> i64 {
        service
            .list_translations(&seed.admin, TranslationQuery::default())
            .await
            .unwrap()
            .total
    }

    #[test]
    fn test_check_string_list() {
        assert!(check_string_list("options", r#"["Sí", "No"]"#).is_ok());
        let err = check_string_list("items", "Gafas, Guantes").unwrap_err();
        assert!(err.get("value").is_some());
    }

    #[test]
    fn test_translation_query_validation() {
        let ok = TranslationQuery {
            entity_type: Some("block".to_string()),
            entity_id: None,
            locale: Some("es-MX".to_string()),
        };
        assert!(check_translation_query(&ok).is_ok());

        let bad = TranslationQuery {
            entity_type: Some("plant".to_string()),
            entity_id: None,
            locale: Some("spanish".to_string()),
        };
        let err = check_translation_query(&bad).unwrap_err();
        assert!(err.get("entity_type").is_some());
        assert!(err.get("locale").is_some());
    }

    #[tokio::test]
    async fn test_deletes_take_translations_with_them() {
        let Some(db) = TestDb::connect().await else {
            return;
        };
        let (seed, _) = Seed::new(&db).await;
        let (course, section, question) = seed.course("respirator-fit").await;
        let service = ContentService::new(db.pool.clone());
        let block = service
            .create_block(
                &seed.admin,
                section.id,
                CreateBlockRequest {
                    block_type: "text".to_string(),
                    position: 0,
                    content: json!({"body": "Check the seal before entry."}),
                },
            )
            .await
            .unwrap();

        translate(&service, &seed, "course", course.id, "title").await;
        translate(&service, &seed, "section", section.id, "title").await;
        translate(&service, &seed, "block", block.id, "body").await;
        translate(&service, &seed, "question", question.id, "prompt").await;
        assert_eq!(translation_count(&service, &seed).await, 4);

        service.delete_block(&seed.admin, block.id).await.unwrap();
        assert_eq!(translation_count(&service, &seed).await, 3);

        // Cascaded questions lose their translations too.
        service.delete_section(&seed.admin, section.id).await.unwrap();
        assert_eq!(translation_count(&service, &seed).await, 1);

        CourseService::new(db.pool.clone())
            .delete(&seed.admin, course.id)
            .await
            .unwrap();
        assert_eq!(translation_count(&service, &seed).await, 0);

        db.close().await;
    }

    #[tokio::test]
    async fn test_content_edits_bump_course_version() {
        let Some(db) = TestDb::connect().await else {
            return;
        };
        let (seed, _) = Seed::new(&db).await;
        let (course, section, question) = seed.course("eyewash-stations").await;
        let courses = CourseService::new(db.pool.clone());
        let service = ContentService::new(db.pool.clone());
        let before = course_version(&courses, &seed, course.id).await;
        service
            .update_question(
                &seed.admin,
                question.id,
                UpdateQuestionRequest {
                    prompt: Some("Who removes a lock?".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        service
            .update_section(
                &seed.admin,
                section.id,
                UpdateSectionRequest {
                    title: Some("Hazardous energy".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let after = course_version(&courses, &seed, course.id).await;
        assert_eq!(after, before + 2);

        // A missing section rolls back without touching the course.
        let missing = service.delete_section(&seed.admin, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
        let unchanged = course_version(&courses, &seed, course.id).await;
        assert_eq!(unchanged, after);

        db.close().await;
    }
}
