//! Course catalog and delivery, plus course administration.

use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::UserContext;
use crate::db::models::{
    AdminCourseDetail, AdminSectionDetail, ContentBlock, ContentTranslation, Course, CourseDetail,
    CourseQuery, CourseSection, CourseSummary, CreateCourseRequest, EnrollmentView, ListResponse,
    Progress, QuizQuestion, SectionDetail, UpdateCourseRequest, BASE_LOCALE,
};
use crate::db::queries::{content, course as queries, enrollment, progress};
use crate::db::{begin_scoped, DbPool};
use crate::error::{AppError, AppResult};
use crate::result_ext::ResultExt;
use crate::validation::{self, Validate};

/// Default estimate for a new course, in minutes.
const DEFAULT_ESTIMATED_MINUTES: i32 = 15;

/// Default passing score, in percent.
const DEFAULT_PASSING_SCORE: i32 = 80;

/// Service for course operations.
#[derive(Clone)]
pub struct CourseService {
    pool: DbPool,
}

impl CourseService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Published courses with the caller's enrollment and progress.
    pub async fn catalog(&self, user: &UserContext, query: CourseQuery) -> AppResult<ListResponse<CourseSummary>> {
        let locale = resolve_locale(user, query.locale.as_deref())?;
        let search = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
        let mut courses = queries::list_courses(&self.pool, true, search).await?;

        if locale != BASE_LOCALE {
            let ids: Vec<Uuid> = courses.iter().map(|c| c.id).collect();
            let translations = content::list_translations_for(&self.pool, &locale, &ids).await?;
            let map = TranslationMap::from_rows(translations);
            for course in &mut courses {
                map.apply_course(course);
            }
        }

        let mut tx = begin_scoped(&self.pool, user.own_scope()).await?;
        let enrollments = enrollment::list_for_user(&mut tx, user.plant_id, user.user_id).await?;
        let progress_rows = progress::list_for_user(&mut tx, user.plant_id, user.user_id).await?;
        tx.commit().await?;

        let items = summarize(courses, enrollments, progress_rows);
        Ok(ListResponse::unpaged(items))
    }

    /// A course with its content, for delivery.
    ///
    /// Unpublished courses are hidden from everyone but dev_admins.
    pub async fn detail(&self, user: &UserContext, id: Uuid, locale: Option<&str>) -> AppResult<CourseDetail> {
        let locale = resolve_locale(user, locale)?;
        let mut course = match queries::get_course(&self.pool, id).await? {
            Some(c) if c.is_published || user.is_dev_admin() => c,
            _ => return Err(AppError::NotFound(format!("Course not found: {}", id))),
        };

        let mut sections = content::list_sections(&self.pool, id).await?;
        let mut blocks = content::list_blocks_for_course(&self.pool, id).await?;
        let mut questions = content::list_questions_for_course(&self.pool, id)
            .await
            .log("loading course questions")?;

        if locale != BASE_LOCALE {
            let mut ids = vec![course.id];
            ids.extend(sections.iter().map(|s| s.id));
            ids.extend(blocks.iter().map(|b| b.id));
            ids.extend(questions.iter().map(|q| q.id));

            let translations = content::list_translations_for(&self.pool, &locale, &ids).await?;
            let map = TranslationMap::from_rows(translations);
            map.apply_course(&mut course);
            sections.iter_mut().for_each(|s| map.apply_section(s));
            blocks.iter_mut().for_each(|b| map.apply_block(b));
            questions.iter_mut().for_each(|q| map.apply_question(q));
        }

        let mut blocks_by_section = group_by(blocks, |b| b.section_id);
        let mut questions_by_section = group_by(questions, |q| q.section_id);

        let sections = sections
            .into_iter()
            .map(|s| SectionDetail {
                blocks: blocks_by_section.remove(&s.id).unwrap_or_default(),
                questions: questions_by_section
                    .remove(&s.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(Into::into)
                    .collect(),
                id: s.id,
                title: s.title,
                position: s.position,
                estimated_minutes: s.estimated_minutes,
            })
            .collect();

        Ok(CourseDetail {
            course,
            locale,
            sections,
        })
    }

    // --- administration ---

    pub async fn admin_list(&self, user: &UserContext, query: CourseQuery) -> AppResult<ListResponse<Course>> {
        user.require_hr_admin()?;
        let search = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
        let courses = queries::list_courses(&self.pool, !query.include_unpublished, search).await?;
        Ok(ListResponse::unpaged(courses))
    }

    /// Course with full content including answer keys.
    pub async fn admin_get(&self, user: &UserContext, id: Uuid) -> AppResult<AdminCourseDetail> {
        user.require_hr_admin()?;
        let course = self.find(id).await?;

        let sections = content::list_sections(&self.pool, id).await?;
        let mut blocks = group_by(content::list_blocks_for_course(&self.pool, id).await?, |b| {
            b.section_id
        });
        let mut questions = group_by(
            content::list_questions_for_course(&self.pool, id).await?,
            |q| q.section_id,
        );

        let sections = sections
            .into_iter()
            .map(|section| AdminSectionDetail {
                blocks: blocks.remove(&section.id).unwrap_or_default(),
                questions: questions.remove(&section.id).unwrap_or_default(),
                section,
            })
            .collect();

        Ok(AdminCourseDetail { course, sections })
    }

    pub async fn create(&self, user: &UserContext, request: CreateCourseRequest) -> AppResult<Course> {
        user.require_dev_admin()?;
        request.validate()?;

        let course = queries::insert_course(
            &self.pool,
            &request.slug,
            request.title.trim(),
            request.description.as_deref(),
            request.estimated_minutes.unwrap_or(DEFAULT_ESTIMATED_MINUTES),
            request.passing_score.unwrap_or(DEFAULT_PASSING_SCORE),
        )
        .await?;

        tracing::info!(course_id = %course.id, slug = %course.slug, "Course created");
        Ok(course)
    }

    pub async fn update(&self, user: &UserContext, id: Uuid, request: UpdateCourseRequest) -> AppResult<Course> {
        user.require_dev_admin()?;
        request.validate()?;

        let content_changed = request.title.is_some() || request.description.is_some();
        let mut tx = self.pool.begin().await?;
        let mut course = queries::update_course(
            &mut tx,
            id,
            request.slug.as_deref(),
            request.title.as_deref(),
            request.description.as_deref(),
            request.estimated_minutes,
            request.passing_score,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Course not found: {}", id)))?;

        if content_changed {
            course = queries::bump_version(&mut tx, id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Course not found: {}", id)))?;
        }
        tx.commit().await?;
        Ok(course)
    }

    /// Delete a course, its content and every translation of that content.
    pub async fn delete(&self, user: &UserContext, id: Uuid) -> AppResult<()> {
        user.require_dev_admin()?;

        let mut tx = self.pool.begin().await?;
        let translations = content::delete_course_translations(&mut tx, id).await?;
        if !queries::delete_course(&mut tx, id).await? {
            return Err(AppError::NotFound(format!("Course not found: {}", id)));
        }
        tx.commit().await?;

        tracing::info!(course_id = %id, deleted_by = %user.user_id, translations, "Course deleted");
        Ok(())
    }

    /// Publish or unpublish. A course needs at least one section to publish.
    pub async fn set_published(&self, user: &UserContext, id: Uuid, published: bool) -> AppResult<Course> {
        user.require_dev_admin()?;
        self.find(id).await?;

        if published && content::list_sections(&self.pool, id).await?.is_empty() {
            return Err(AppError::invalid_field(
                "sections",
                "a course needs at least one section to be published",
            ));
        }

        let course = queries::set_published(&self.pool, id, published)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course not found: {}", id)))?;
        tracing::info!(course_id = %id, published, "Course publication changed");
        Ok(course)
    }

    async fn find(&self, id: Uuid) -> AppResult<Course> {
        queries::get_course(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course not found: {}", id)))
    }
}

/// Requested locale, else the caller's preferred one.
fn resolve_locale(user: &UserContext, requested: Option<&str>) -> AppResult<String> {
    match requested.map(str::trim).filter(|l| !l.is_empty()) {
        Some(locale) if validation::is_locale(locale) => Ok(locale.to_string()),
        Some(_) => Err(AppError::invalid_field("locale", "must look like 'en' or 'es-MX'")),
        None => Ok(user.locale.clone()),
    }
}

fn group_by<T>(items: Vec<T>, key: impl Fn(&T) -> Uuid) -> HashMap<Uuid, Vec<T>> {
    let mut map: HashMap<Uuid, Vec<T>> = HashMap::new();
    for item in items {
        map.entry(key(&item)).or_default().push(item);
    }
    map
}

fn summarize(
    courses: Vec<Course>,
    enrollments: Vec<EnrollmentView>,
    progress_rows: Vec<Progress>,
) -> Vec<CourseSummary> {
    let enrollments: HashMap<Uuid, EnrollmentView> =
        enrollments.into_iter().map(|e| (e.course_id, e)).collect();
    let percents: HashMap<Uuid, i32> = progress_rows
        .into_iter()
        .map(|p| (p.course_id, p.progress_percent))
        .collect();

    courses
        .into_iter()
        .map(|c| {
            let enrollment = enrollments.get(&c.id);
            CourseSummary {
                enrollment_status: enrollment.map(|e| e.status.clone()),
                due_at: enrollment.and_then(|e| e.due_at),
                progress_percent: percents.get(&c.id).copied(),
                id: c.id,
                slug: c.slug,
                title: c.title,
                description: c.description,
                estimated_minutes: c.estimated_minutes,
                version: c.version,
            }
        })
        .collect()
}

/// Translated field values for one locale, keyed by entity and field.
///
/// Fields without a translation keep their base text.
struct TranslationMap {
    values: HashMap<(Uuid, String), String>,
}

impl TranslationMap {
    fn from_rows(rows: Vec<ContentTranslation>) -> Self {
        let values = rows
            .into_iter()
            .map(|t| ((t.entity_id, t.field), t.value))
            .collect();
        Self { values }
    }

    fn get(&self, id: Uuid, field: &str) -> Option<&String> {
        self.values.get(&(id, field.to_string()))
    }

    fn apply_course(&self, course: &mut Course) {
        if let Some(title) = self.get(course.id, "title") {
            course.title = title.clone();
        }
        if let Some(description) = self.get(course.id, "description") {
            course.description = Some(description.clone());
        }
    }

    fn apply_section(&self, section: &mut CourseSection) {
        if let Some(title) = self.get(section.id, "title") {
            section.title = title.clone();
        }
    }

    fn apply_block(&self, block: &mut ContentBlock) {
        let Some(content) = block.content.as_object_mut() else {
            return;
        };
        for field in ["body", "caption"] {
            if let Some(value) = self.get(block.id, field) {
                content.insert(field.to_string(), serde_json::Value::String(value.clone()));
            }
        }
        if let Some(items) = self.get(block.id, "items") {
            match serde_json::from_str::<Vec<String>>(items) {
                Ok(items) => {
                    content.insert("items".to_string(), serde_json::json!(items));
                }
                Err(e) => {
                    tracing::warn!(block_id = %block.id, error = %e, "Ignoring malformed list translation")
                }
            }
        }
    }

    fn apply_question(&self, question: &mut QuizQuestion) {
        if let Some(prompt) = self.get(question.id, "prompt") {
            question.prompt = prompt.clone();
        }
        if let Some(explanation) = self.get(question.id, "explanation") {
            question.explanation = Some(explanation.clone());
        }
        if let Some(options) = self.get(question.id, "options") {
            // Option order carries the answer key, so only a same-length list applies.
            match serde_json::from_str::<Vec<String>>(options) {
                Ok(options) if options.len() == question.options.0.len() => {
                    question.options.0 = options;
                }
                _ => tracing::warn!(question_id = %question.id, "Ignoring mismatched options translation"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use sqlx::types::Json;

    fn translation(entity_id: Uuid, field: &str, value: &str) -> ContentTranslation {
        let now = Utc::now();
        ContentTranslation {
            id: Uuid::new_v4(),
            entity_type: "course".to_string(),
            entity_id,
            locale: "es".to_string(),
            field: field.to_string(),
            value: value.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn course() -> Course {
        let now = Utc::now();
        Course {
            id: Uuid::new_v4(),
            slug: "hazcom".to_string(),
            title: "Hazard Communication".to_string(),
            description: Some("GHS labels and SDS".to_string()),
            version: 1,
            estimated_minutes: 20,
            passing_score: 80,
            is_published: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(locale: &str) -> UserContext {
        UserContext {
            user_id: Uuid::new_v4(),
            email: "op@specchem.com".to_string(),
            full_name: "Operator".to_string(),
            plant_id: Uuid::new_v4(),
            locale: locale.to_string(),
            roles: vec![],
        }
    }

    #[test]
    fn test_translation_falls_back_to_base_text() {
        let mut c = course();
        let map = TranslationMap::from_rows(vec![translation(c.id, "title", "Comunicación de Peligros")]);
        map.apply_course(&mut c);
        assert_eq!(c.title, "Comunicación de Peligros");
        assert_eq!(c.description.as_deref(), Some("GHS labels and SDS"));
    }

    #[test]
    fn test_block_translation() {
        let now = Utc::now();
        let mut block = ContentBlock {
            id: Uuid::new_v4(),
            section_id: Uuid::new_v4(),
            block_type: "list".to_string(),
            position: 0,
            content: json!({"items": ["Goggles", "Gloves"], "caption": "PPE"}),
            created_at: now,
            updated_at: now,
        };
        let map = TranslationMap::from_rows(vec![
            translation(block.id, "items", r#"["Gafas", "Guantes"]"#),
            translation(block.id, "caption", "EPP"),
        ]);
        map.apply_block(&mut block);
        assert_eq!(block.content["items"], json!(["Gafas", "Guantes"]));
        assert_eq!(block.content["caption"], "EPP");
    }

    #[test]
    fn test_options_translation_must_match_length() {
        let now = Utc::now();
        let mut question = QuizQuestion {
            id: Uuid::new_v4(),
            section_id: Uuid::new_v4(),
            prompt: "Is an SDS required?".to_string(),
            question_type: "true_false".to_string(),
            options: Json(vec!["True".to_string(), "False".to_string()]),
            correct_answers: Json(vec![0]),
            explanation: None,
            position: 0,
            created_at: now,
            updated_at: now,
        };

        let map = TranslationMap::from_rows(vec![translation(question.id, "options", r#"["Sí"]"#)]);
        map.apply_question(&mut question);
        assert_eq!(question.options.0, vec!["True", "False"]);

        let map = TranslationMap::from_rows(vec![
            translation(question.id, "options", r#"["Verdadero", "Falso"]"#),
            translation(question.id, "prompt", "¿Se requiere una SDS?"),
        ]);
        map.apply_question(&mut question);
        assert_eq!(question.options.0, vec!["Verdadero", "Falso"]);
        assert_eq!(question.prompt, "¿Se requiere una SDS?");
    }

    #[test]
    fn test_resolve_locale() {
        let u = user("es");
        assert_eq!(resolve_locale(&u, None).unwrap(), "es");
        assert_eq!(resolve_locale(&u, Some(" ")).unwrap(), "es");
        assert_eq!(resolve_locale(&u, Some("fr-CA")).unwrap(), "fr-CA");
        assert!(resolve_locale(&u, Some("french")).is_err());
    }

    #[test]
    fn test_summarize_merges_learner_state() {
        let enrolled = course();
        let other = course();
        let now = Utc::now();
        let view = EnrollmentView {
            id: Uuid::new_v4(),
            plant_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_name: "Operator".to_string(),
            user_email: "op@specchem.com".to_string(),
            course_id: enrolled.id,
            course_title: enrolled.title.clone(),
            status: "in_progress".to_string(),
            assigned_by: None,
            due_at: Some(now),
            enrolled_at: now,
            started_at: Some(now),
            completed_at: None,
            progress_percent: Some(40),
        };
        let progress = Progress {
            id: Uuid::new_v4(),
            plant_id: view.plant_id,
            user_id: view.user_id,
            course_id: enrolled.id,
            progress_percent: 40,
            current_section_id: None,
            completed_sections: Json(vec![]),
            last_accessed_at: now,
            completed_at: None,
        };

        let summaries = summarize(vec![enrolled.clone(), other.clone()], vec![view], vec![progress]);
        let first = summaries.iter().find(|s| s.id == enrolled.id).unwrap();
        assert_eq!(first.enrollment_status.as_deref(), Some("in_progress"));
        assert_eq!(first.progress_percent, Some(40));
        assert!(first.due_at.is_some());

        let second = summaries.iter().find(|s| s.id == other.id).unwrap();
        assert!(second.enrollment_status.is_none());
        assert!(second.progress_percent.is_none());
    }
}
