//! Activity and question event models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::validation::{self, Validate, ValidationErrors};

/// Activity event types accepted from learners.
pub const ACTIVITY_EVENT_TYPES: [&str; 6] = [
    "course_viewed",
    "section_started",
    "section_completed",
    "video_played",
    "quiz_started",
    "course_completed",
];

/// Largest accepted metadata document, in bytes of JSON.
pub const MAX_METADATA_BYTES: usize = 4096;

/// Activity event row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub user_id: Uuid,
    pub course_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub event_type: String,
    pub metadata: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

/// Learner activity report.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateActivityRequest {
    pub event_type: String,
    #[serde(default)]
    pub course_id: Option<Uuid>,
    #[serde(default)]
    pub section_id: Option<Uuid>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Question event row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionEvent {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub question_id: Uuid,
    pub selected_answers: Json<Vec<i32>>,
    pub is_correct: bool,
    pub attempt_number: i32,
    pub time_spent_ms: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

/// Learner answer submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: Uuid,
    pub selected_answers: Vec<i32>,
    #[serde(default)]
    pub time_spent_ms: Option<i64>,
}

/// Graded answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub event_id: Uuid,
    pub question_id: Uuid,
    pub is_correct: bool,
    pub attempt_number: i32,
    pub correct_answers: Vec<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Validate for CreateActivityRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::one_of(&mut errors, "event_type", &self.event_type, &ACTIVITY_EVENT_TYPES);
        if self.event_type != "course_viewed" && self.course_id.is_none() {
            errors.add("course_id", "is required for this event type");
        }
        if self.event_type.starts_with("section_") && self.section_id.is_none() {
            errors.add("section_id", "is required for section events");
        }
        if let Some(metadata) = &self.metadata {
            if !metadata.is_object() {
                errors.add("metadata", "must be an object");
            } else if metadata.to_string().len() > MAX_METADATA_BYTES {
                errors.add(
                    "metadata",
                    format!("must be at most {} bytes", MAX_METADATA_BYTES),
                );
            }
        }
        errors.into_result()
    }
}

impl Validate for SubmitAnswerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.selected_answers.is_empty() {
            errors.add("selected_answers", "must not be empty");
        }
        if self.selected_answers.iter().any(|&i| i < 0) {
            errors.add("selected_answers", "must not contain negative indices");
        }
        if let Some(ms) = self.time_spent_ms {
            validation::non_negative(&mut errors, "time_spent_ms", ms);
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_activity_validation() {
        let ok: CreateActivityRequest = serde_json::from_value(json!({
            "event_type": "section_started",
            "course_id": Uuid::new_v4(),
            "section_id": Uuid::new_v4(),
            "metadata": {"source": "sidebar"}
        }))
        .unwrap();
        assert!(ok.validate().is_ok());

        let missing: CreateActivityRequest = serde_json::from_value(json!({
            "event_type": "section_completed"
        }))
        .unwrap();
        let errors = missing.validate().unwrap_err();
        assert!(errors.get("course_id").is_some());
        assert!(errors.get("section_id").is_some());

        let bad_meta: CreateActivityRequest = serde_json::from_value(json!({
            "event_type": "course_viewed",
            "metadata": [1, 2, 3]
        }))
        .unwrap();
        assert!(bad_meta.validate().unwrap_err().get("metadata").is_some());
    }

    #[test]
    fn test_submit_answer_validation() {
        let request = SubmitAnswerRequest {
            question_id: Uuid::new_v4(),
            selected_answers: vec![],
            time_spent_ms: Some(-1),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.get("selected_answers").is_some());
        assert!(errors.get("time_spent_ms").is_some());
    }
}
