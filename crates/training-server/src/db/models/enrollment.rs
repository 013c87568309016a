//! Enrollment models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::validation::{self, Validate, ValidationErrors};

/// Most user ids accepted by one bulk assignment.
pub const MAX_BULK_ASSIGN: usize = 500;

/// Enrollment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Enrolled,
    InProgress,
    Completed,
}

impl EnrollmentStatus {
    pub const ALL: [&'static str; 3] = ["enrolled", "in_progress", "completed"];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Enrolled => "enrolled",
            EnrollmentStatus::InProgress => "in_progress",
            EnrollmentStatus::Completed => "completed",
        }
    }

    /// Status implied by a progress percent.
    pub fn for_progress(percent: i32) -> Self {
        match percent {
            p if p >= 100 => EnrollmentStatus::Completed,
            _ => EnrollmentStatus::InProgress,
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enrolled" => Ok(EnrollmentStatus::Enrolled),
            "in_progress" => Ok(EnrollmentStatus::InProgress),
            "completed" => Ok(EnrollmentStatus::Completed),
            _ => Err(format!("Unknown enrollment status: {}", s)),
        }
    }
}

/// Enrollment row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub status: String,
    pub assigned_by: Option<Uuid>,
    pub due_at: Option<DateTime<Utc>>,
    pub enrolled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Enrollment joined with course and learner names for list views.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EnrollmentView {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub course_id: Uuid,
    pub course_title: String,
    pub status: String,
    pub assigned_by: Option<Uuid>,
    pub due_at: Option<DateTime<Utc>>,
    pub enrolled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress_percent: Option<i32>,
}

/// Learner self-enrollment.
#[derive(Debug, Clone, Deserialize)]
pub struct SelfEnrollRequest {
    pub course_id: Uuid,
}

/// Admin assignment of a course to many users.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignEnrollmentsRequest {
    pub user_ids: Vec<Uuid>,
    pub course_id: Uuid,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

/// Outcome of a bulk assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignEnrollmentsResponse {
    pub created_count: usize,
    pub skipped_count: usize,
    pub created: Vec<Enrollment>,
    /// Users that were already enrolled
    pub skipped: Vec<Uuid>,
}

impl AssignEnrollmentsResponse {
    pub fn new(created: Vec<Enrollment>, skipped: Vec<Uuid>) -> Self {
        Self {
            created_count: created.len(),
            skipped_count: skipped.len(),
            created,
            skipped,
        }
    }
}

/// Admin enrollment update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEnrollmentRequest {
    pub status: Option<String>,
    /// `Some(None)` clears the due date
    #[serde(default, deserialize_with = "double_option")]
    pub due_at: Option<Option<DateTime<Utc>>>,
}

/// Query parameters for admin enrollment lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrollmentFilter {
    pub plant_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Distinguish an absent field from an explicit `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl Validate for AssignEnrollmentsRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.user_ids.is_empty() {
            errors.add("user_ids", "must not be empty");
        } else if self.user_ids.len() > MAX_BULK_ASSIGN {
            errors.add(
                "user_ids",
                format!("must contain at most {} users", MAX_BULK_ASSIGN),
            );
        }
        if let Some(due) = self.due_at {
            if due <= Utc::now() {
                errors.add("due_at", "must be in the future");
            }
        }
        errors.into_result()
    }
}

impl Validate for UpdateEnrollmentRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::at_least_one(&mut errors, &[self.status.is_some(), self.due_at.is_some()]);
        if let Some(status) = &self.status {
            validation::one_of(&mut errors, "status", status, &EnrollmentStatus::ALL);
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_for_progress() {
        assert_eq!(EnrollmentStatus::for_progress(0), EnrollmentStatus::InProgress);
        assert_eq!(EnrollmentStatus::for_progress(99), EnrollmentStatus::InProgress);
        assert_eq!(EnrollmentStatus::for_progress(100), EnrollmentStatus::Completed);
    }

    #[test]
    fn test_update_due_at_null_vs_absent() {
        let absent: UpdateEnrollmentRequest =
            serde_json::from_str(r#"{"status": "completed"}"#).unwrap();
        assert!(absent.due_at.is_none());

        let cleared: UpdateEnrollmentRequest = serde_json::from_str(r#"{"due_at": null}"#).unwrap();
        assert_eq!(cleared.due_at, Some(None));
        assert!(cleared.validate().is_ok());

        let empty: UpdateEnrollmentRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_assign_response_reports_counts() {
        let skipped = vec![Uuid::new_v4(), Uuid::new_v4()];
        let response = AssignEnrollmentsResponse::new(vec![], skipped.clone());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["created_count"], 0);
        assert_eq!(json["skipped_count"], 2);
        assert_eq!(json["skipped"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_assign_validation() {
        let request = AssignEnrollmentsRequest {
            user_ids: vec![],
            course_id: Uuid::new_v4(),
            due_at: Some(Utc::now() - Duration::days(1)),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.get("user_ids").is_some());
        assert!(errors.get("due_at").is_some());

        let request = AssignEnrollmentsRequest {
            user_ids: vec![Uuid::new_v4()],
            course_id: Uuid::new_v4(),
            due_at: Some(Utc::now() + Duration::days(30)),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_invalid_status_rejected() {
        let request = UpdateEnrollmentRequest {
            status: Some("dropped".to_string()),
            due_at: None,
        };
        assert!(request.validate().unwrap_err().get("status").is_some());
    }
}
