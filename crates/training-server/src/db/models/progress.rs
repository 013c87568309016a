//! Progress model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::validation::{self, Validate, ValidationErrors};

/// Per-user, per-course progress row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Progress {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub progress_percent: i32,
    pub current_section_id: Option<Uuid>,
    pub completed_sections: Json<Vec<Uuid>>,
    pub last_accessed_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Learner progress report.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProgressRequest {
    pub progress_percent: i32,
    #[serde(default)]
    pub current_section_id: Option<Uuid>,
    /// Section finished with this update
    #[serde(default)]
    pub completed_section_id: Option<Uuid>,
}

impl Validate for UpdateProgressRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::percent(&mut errors, "progress_percent", self.progress_percent);
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_request_bounds() {
        let request: UpdateProgressRequest =
            serde_json::from_str(r#"{"progress_percent": 140}"#).unwrap();
        assert!(request.validate().is_err());

        let request: UpdateProgressRequest =
            serde_json::from_str(r#"{"progress_percent": 40}"#).unwrap();
        assert!(request.validate().is_ok());
        assert!(request.current_section_id.is_none());
    }
}
