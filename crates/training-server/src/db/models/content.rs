//! Course content models: sections, blocks, quiz questions and translations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::validation::{self, Validate, ValidationErrors, MAX_TEXT_LEN, MAX_TITLE_LEN};

/// Course section row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CourseSection {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
    pub estimated_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Text,
    Image,
    Video,
    Callout,
    List,
}

impl BlockType {
    pub const ALL: [&'static str; 5] = ["text", "image", "video", "callout", "list"];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Text => "text",
            BlockType::Image => "image",
            BlockType::Video => "video",
            BlockType::Callout => "callout",
            BlockType::List => "list",
        }
    }

    /// Key that must be present in the block's `content` object.
    pub fn required_key(&self) -> &'static str {
        match self {
            BlockType::Text | BlockType::Callout => "body",
            BlockType::Image | BlockType::Video => "url",
            BlockType::List => "items",
        }
    }
}

impl FromStr for BlockType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(BlockType::Text),
            "image" => Ok(BlockType::Image),
            "video" => Ok(BlockType::Video),
            "callout" => Ok(BlockType::Callout),
            "list" => Ok(BlockType::List),
            _ => Err(format!("Unknown block type: {}", s)),
        }
    }
}

/// Content block row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: Uuid,
    pub section_id: Uuid,
    pub block_type: String,
    pub position: i32,
    pub content: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of quiz question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
}

impl QuestionType {
    pub const ALL: [&'static str; 3] = ["single_choice", "multiple_choice", "true_false"];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_choice" => Ok(QuestionType::SingleChoice),
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "true_false" => Ok(QuestionType::TrueFalse),
            _ => Err(format!("Unknown question type: {}", s)),
        }
    }
}

/// Quiz question row, including the answer key.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub section_id: Uuid,
    pub prompt: String,
    pub question_type: String,
    pub options: Json<Vec<String>>,
    pub correct_answers: Json<Vec<i32>>,
    pub explanation: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Question as delivered to a learner: no answer key, no explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerQuestion {
    pub id: Uuid,
    pub prompt: String,
    pub question_type: String,
    pub options: Vec<String>,
    pub position: i32,
}

impl From<QuizQuestion> for LearnerQuestion {
    fn from(q: QuizQuestion) -> Self {
        Self {
            id: q.id,
            prompt: q.prompt,
            question_type: q.question_type,
            options: q.options.0,
            position: q.position,
        }
    }
}

/// Request to create a section.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSectionRequest {
    pub title: String,
    pub position: i32,
    #[serde(default)]
    pub estimated_minutes: Option<i32>,
}

/// Partial section update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSectionRequest {
    pub title: Option<String>,
    pub position: Option<i32>,
    pub estimated_minutes: Option<i32>,
}

/// Request to create a content block.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBlockRequest {
    pub block_type: String,
    pub position: i32,
    pub content: serde_json::Value,
}

/// Partial block update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBlockRequest {
    pub position: Option<i32>,
    pub content: Option<serde_json::Value>,
}

/// Request to create a quiz question.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuestionRequest {
    pub prompt: String,
    pub question_type: String,
    pub options: Vec<String>,
    pub correct_answers: Vec<i32>,
    #[serde(default)]
    pub explanation: Option<String>,
    pub position: i32,
}

/// Partial question update. Options and answers are replaced together.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQuestionRequest {
    pub prompt: Option<String>,
    pub question_type: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answers: Option<Vec<i32>>,
    pub explanation: Option<String>,
    pub position: Option<i32>,
}

/// Locale the base content is authored in.
pub const BASE_LOCALE: &str = "en";

/// Translatable entity kinds.
pub const TRANSLATABLE_ENTITIES: [&str; 4] = ["course", "section", "block", "question"];

/// Content translation row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentTranslation {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub locale: String,
    pub field: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert-or-replace a translation.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertTranslationRequest {
    pub entity_type: String,
    pub entity_id: Uuid,
    pub locale: String,
    pub field: String,
    pub value: String,
}

/// Query parameters for listing translations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslationQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub locale: Option<String>,
}

/// Fields a translation may target for each entity kind.
pub fn translatable_fields(entity_type: &str) -> &'static [&'static str] {
    match entity_type {
        "course" => &["title", "description"],
        "section" => &["title"],
        "block" => &["body", "caption", "items"],
        "question" => &["prompt", "explanation", "options"],
        _ => &[],
    }
}

fn check_position(errors: &mut ValidationErrors, value: Option<i32>) {
    if let Some(p) = value {
        validation::non_negative(errors, "position", p as i64);
    }
}

fn check_block_content(errors: &mut ValidationErrors, block_type: BlockType, content: &serde_json::Value) {
    match content.as_object() {
        Some(obj) if obj.contains_key(block_type.required_key()) => {}
        Some(_) => errors.add(
            "content",
            format!("must contain '{}' for {} blocks", block_type.required_key(), block_type.as_str()),
        ),
        None => errors.add("content", "must be an object"),
    }
}

/// Options/answers consistency for a question type.
pub fn check_answer_key(
    errors: &mut ValidationErrors,
    question_type: QuestionType,
    options: &[String],
    correct_answers: &[i32],
) {
    if options.iter().any(|o| o.trim().is_empty()) {
        errors.add("options", "must not contain blank options");
    }
    match question_type {
        QuestionType::TrueFalse if options.len() != 2 => {
            errors.add("options", "true_false questions have exactly 2 options")
        }
        _ if options.len() < 2 => errors.add("options", "must have at least 2 options"),
        _ => {}
    }

    if correct_answers.is_empty() {
        errors.add("correct_answers", "must not be empty");
    }
    if correct_answers
        .iter()
        .any(|&i| i < 0 || i as usize >= options.len())
    {
        errors.add("correct_answers", "must reference existing options");
    }
    let mut unique = correct_answers.to_vec();
    unique.sort_unstable();
    unique.dedup();
    if unique.len() != correct_answers.len() {
        errors.add("correct_answers", "must not repeat an option");
    }
    if question_type != QuestionType::MultipleChoice && correct_answers.len() > 1 {
        errors.add(
            "correct_answers",
            format!("{} questions have exactly one answer", question_type.as_str()),
        );
    }
}

impl Validate for CreateSectionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::required_text(&mut errors, "title", &self.title, MAX_TITLE_LEN);
        check_position(&mut errors, Some(self.position));
        if let Some(m) = self.estimated_minutes {
            validation::non_negative(&mut errors, "estimated_minutes", m as i64);
        }
        errors.into_result()
    }
}

impl Validate for UpdateSectionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::at_least_one(
            &mut errors,
            &[
                self.title.is_some(),
                self.position.is_some(),
                self.estimated_minutes.is_some(),
            ],
        );
        validation::optional_text(&mut errors, "title", self.title.as_deref(), MAX_TITLE_LEN);
        check_position(&mut errors, self.position);
        if let Some(m) = self.estimated_minutes {
            validation::non_negative(&mut errors, "estimated_minutes", m as i64);
        }
        errors.into_result()
    }
}

impl Validate for CreateBlockRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_position(&mut errors, Some(self.position));
        match self.block_type.parse::<BlockType>() {
            Ok(block_type) => check_block_content(&mut errors, block_type, &self.content),
            Err(_) => validation::one_of(&mut errors, "block_type", &self.block_type, &BlockType::ALL),
        }
        errors.into_result()
    }
}

impl UpdateBlockRequest {
    /// Content rules depend on the stored block type.
    pub fn validate_for(&self, block_type: BlockType) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::at_least_one(&mut errors, &[self.position.is_some(), self.content.is_some()]);
        check_position(&mut errors, self.position);
        if let Some(content) = &self.content {
            check_block_content(&mut errors, block_type, content);
        }
        errors.into_result()
    }
}

impl Validate for CreateQuestionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::required_text(&mut errors, "prompt", &self.prompt, MAX_TEXT_LEN);
        validation::optional_text(&mut errors, "explanation", self.explanation.as_deref(), MAX_TEXT_LEN);
        check_position(&mut errors, Some(self.position));
        match self.question_type.parse::<QuestionType>() {
            Ok(qt) => check_answer_key(&mut errors, qt, &self.options, &self.correct_answers),
            Err(_) => validation::one_of(
                &mut errors,
                "question_type",
                &self.question_type,
                &QuestionType::ALL,
            ),
        }
        errors.into_result()
    }
}

impl UpdateQuestionRequest {
    /// Validate against the stored question, since the answer key must stay
    /// consistent with whichever of type/options/answers is not replaced.
    pub fn validate_against(&self, current: &QuizQuestion) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::at_least_one(
            &mut errors,
            &[
                self.prompt.is_some(),
                self.question_type.is_some(),
                self.options.is_some(),
                self.correct_answers.is_some(),
                self.explanation.is_some(),
                self.position.is_some(),
            ],
        );
        validation::optional_text(&mut errors, "prompt", self.prompt.as_deref(), MAX_TEXT_LEN);
        validation::optional_text(&mut errors, "explanation", self.explanation.as_deref(), MAX_TEXT_LEN);
        check_position(&mut errors, self.position);

        let type_str = self.question_type.as_deref().unwrap_or(&current.question_type);
        match type_str.parse::<QuestionType>() {
            Ok(qt) => {
                let options = self.options.as_deref().unwrap_or(&current.options.0);
                let answers = self
                    .correct_answers
                    .as_deref()
                    .unwrap_or(&current.correct_answers.0);
                check_answer_key(&mut errors, qt, options, answers);
            }
            Err(_) => validation::one_of(&mut errors, "question_type", type_str, &QuestionType::ALL),
        }
        errors.into_result()
    }
}

impl Validate for UpsertTranslationRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::one_of(&mut errors, "entity_type", &self.entity_type, &TRANSLATABLE_ENTITIES);
        validation::locale(&mut errors, "locale", &self.locale);
        let fields = translatable_fields(&self.entity_type);
        if !fields.is_empty() {
            validation::one_of(&mut errors, "field", &self.field, fields);
        }
        validation::required_text(&mut errors, "value", &self.value, MAX_TEXT_LEN);
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(question_type: &str, options: &[&str], answers: &[i32]) -> QuizQuestion {
        let now = Utc::now();
        QuizQuestion {
            id: Uuid::new_v4(),
            section_id: Uuid::new_v4(),
            prompt: "Which PPE is required?".to_string(),
            question_type: question_type.to_string(),
            options: Json(options.iter().map(|s| s.to_string()).collect()),
            correct_answers: Json(answers.to_vec()),
            explanation: Some("Always wear goggles.".to_string()),
            position: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_block_content_rules() {
        let ok = CreateBlockRequest {
            block_type: "video".to_string(),
            position: 1,
            content: json!({"url": "https://cdn.example.com/loto.mp4"}),
        };
        assert!(ok.validate().is_ok());

        let missing_key = CreateBlockRequest {
            block_type: "text".to_string(),
            position: 0,
            content: json!({"url": "x"}),
        };
        assert!(missing_key.validate().unwrap_err().get("content").is_some());

        let bad_type = CreateBlockRequest {
            block_type: "slideshow".to_string(),
            position: 0,
            content: json!({}),
        };
        assert!(bad_type.validate().unwrap_err().get("block_type").is_some());
    }

    #[test]
    fn test_answer_key_rules() {
        let mut errors = ValidationErrors::new();
        check_answer_key(
            &mut errors,
            QuestionType::SingleChoice,
            &["Goggles".into(), "Sandals".into()],
            &[0, 1],
        );
        assert!(errors.get("correct_answers").is_some());

        let mut errors = ValidationErrors::new();
        check_answer_key(
            &mut errors,
            QuestionType::TrueFalse,
            &["True".into(), "False".into(), "Maybe".into()],
            &[0],
        );
        assert!(errors.get("options").is_some());

        let mut errors = ValidationErrors::new();
        check_answer_key(
            &mut errors,
            QuestionType::MultipleChoice,
            &["Gloves".into(), "Goggles".into(), "Shorts".into()],
            &[0, 1],
        );
        assert!(errors.is_empty());

        let mut errors = ValidationErrors::new();
        check_answer_key(
            &mut errors,
            QuestionType::MultipleChoice,
            &["Gloves".into(), "Goggles".into()],
            &[1, 1, 5],
        );
        assert_eq!(errors.get("correct_answers").unwrap().len(), 2);
    }

    #[test]
    fn test_update_question_checks_merged_key() {
        let current = question("multiple_choice", &["A", "B", "C"], &[0, 2]);

        // Switching to single choice while keeping two answers is rejected.
        let update = UpdateQuestionRequest {
            question_type: Some("single_choice".to_string()),
            ..Default::default()
        };
        assert!(update.validate_against(&current).is_err());

        // Shrinking options below a referenced answer is rejected.
        let update = UpdateQuestionRequest {
            options: Some(vec!["A".into(), "B".into()]),
            ..Default::default()
        };
        assert!(update.validate_against(&current).is_err());

        let update = UpdateQuestionRequest {
            prompt: Some("Pick all PPE".to_string()),
            ..Default::default()
        };
        assert!(update.validate_against(&current).is_ok());
    }

    #[test]
    fn test_learner_question_hides_answers() {
        let q = question("single_choice", &["Yes", "No"], &[0]);
        let learner: LearnerQuestion = q.into();
        let json = serde_json::to_value(&learner).unwrap();
        assert!(json.get("correct_answers").is_none());
        assert!(json.get("explanation").is_none());
        assert_eq!(json["options"], json!(["Yes", "No"]));
    }

    #[test]
    fn test_translation_validation() {
        let ok = UpsertTranslationRequest {
            entity_type: "course".to_string(),
            entity_id: Uuid::new_v4(),
            locale: "es-MX".to_string(),
            field: "title".to_string(),
            value: "Seguridad Química".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = UpsertTranslationRequest {
            field: "slug".to_string(),
            ..ok
        };
        assert!(bad.validate().unwrap_err().get("field").is_some());
    }
}
