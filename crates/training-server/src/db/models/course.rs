//! Course models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::content::{ContentBlock, CourseSection, LearnerQuestion, QuizQuestion};
use crate::validation::{self, Validate, ValidationErrors, MAX_TEXT_LEN, MAX_TITLE_LEN};

/// Course row. Courses are shared by every plant.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub version: i32,
    pub estimated_minutes: i32,
    pub passing_score: i32,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a course.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCourseRequest {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub estimated_minutes: Option<i32>,
    #[serde(default)]
    pub passing_score: Option<i32>,
}

/// Partial course update. Content changes bump `version`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCourseRequest {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub estimated_minutes: Option<i32>,
    pub passing_score: Option<i32>,
}

/// Query parameters for course lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseQuery {
    /// Translate titles into this locale
    pub locale: Option<String>,
    /// Search on title and description
    pub q: Option<String>,
    /// Admin lists only: include unpublished courses
    #[serde(default)]
    pub include_unpublished: bool,
}

/// Course as listed to a learner, with the learner's own state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub estimated_minutes: i32,
    pub version: i32,
    /// Enrollment status, if enrolled
    pub enrollment_status: Option<String>,
    /// Progress percent, if started
    pub progress_percent: Option<i32>,
    pub due_at: Option<DateTime<Utc>>,
}

/// Section with its blocks and questions, for course delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDetail {
    pub id: Uuid,
    pub title: String,
    pub position: i32,
    pub estimated_minutes: Option<i32>,
    pub blocks: Vec<ContentBlock>,
    pub questions: Vec<LearnerQuestion>,
}

/// Full course for delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    /// Locale the text was resolved for
    pub locale: String,
    pub sections: Vec<SectionDetail>,
}

/// Section with full content, answer keys included, for editors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSectionDetail {
    #[serde(flatten)]
    pub section: CourseSection,
    pub blocks: Vec<ContentBlock>,
    pub questions: Vec<QuizQuestion>,
}

/// Course with full content for editors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminCourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub sections: Vec<AdminSectionDetail>,
}

fn check_minutes(errors: &mut ValidationErrors, value: Option<i32>) {
    if let Some(m) = value {
        validation::non_negative(errors, "estimated_minutes", m as i64);
    }
}

fn check_passing_score(errors: &mut ValidationErrors, value: Option<i32>) {
    if let Some(s) = value {
        validation::percent(errors, "passing_score", s);
    }
}

impl Validate for CreateCourseRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::slug(&mut errors, "slug", &self.slug);
        validation::required_text(&mut errors, "title", &self.title, MAX_TITLE_LEN);
        validation::optional_text(&mut errors, "description", self.description.as_deref(), MAX_TEXT_LEN);
        check_minutes(&mut errors, self.estimated_minutes);
        check_passing_score(&mut errors, self.passing_score);
        errors.into_result()
    }
}

impl Validate for UpdateCourseRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::at_least_one(
            &mut errors,
            &[
                self.slug.is_some(),
                self.title.is_some(),
                self.description.is_some(),
                self.estimated_minutes.is_some(),
                self.passing_score.is_some(),
            ],
        );
        if let Some(slug) = &self.slug {
            validation::slug(&mut errors, "slug", slug);
        }
        validation::optional_text(&mut errors, "title", self.title.as_deref(), MAX_TITLE_LEN);
        validation::optional_text(&mut errors, "description", self.description.as_deref(), MAX_TEXT_LEN);
        check_minutes(&mut errors, self.estimated_minutes);
        check_passing_score(&mut errors, self.passing_score);
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_course_validation() {
        let request = CreateCourseRequest {
            slug: "hazcom-2024".to_string(),
            title: "Hazard Communication".to_string(),
            description: None,
            estimated_minutes: Some(45),
            passing_score: Some(80),
        };
        assert!(request.validate().is_ok());

        let bad = CreateCourseRequest {
            slug: "HazCom".to_string(),
            title: String::new(),
            description: None,
            estimated_minutes: Some(-5),
            passing_score: Some(101),
        };
        let errors = bad.validate().unwrap_err();
        for field in ["slug", "title", "estimated_minutes", "passing_score"] {
            assert!(errors.get(field).is_some(), "expected error on {}", field);
        }
    }

    #[test]
    fn test_course_query_defaults() {
        let query: CourseQuery = serde_json::from_str("{}").unwrap();
        assert!(query.locale.is_none());
        assert!(!query.include_unpublished);
    }
}
