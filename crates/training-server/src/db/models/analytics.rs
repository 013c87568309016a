//! Admin analytics response models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Enrollment counts by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub enrolled: i64,
    pub in_progress: i64,
    pub completed: i64,
}

impl StatusCounts {
    pub fn total(&self) -> i64 {
        self.enrolled + self.in_progress + self.completed
    }

    /// Completed share of all enrollments, in percent with one decimal.
    pub fn completion_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.completed as f64 * 1000.0 / total as f64).round() / 10.0
    }

    /// Fold `(status, count)` rows into counts.
    pub fn from_rows(rows: &[(String, i64)]) -> Self {
        let mut counts = Self::default();
        for (status, count) in rows {
            match status.as_str() {
                "enrolled" => counts.enrolled += count,
                "in_progress" => counts.in_progress += count,
                "completed" => counts.completed += count,
                other => tracing::warn!(status = %other, "Unknown enrollment status in analytics"),
            }
        }
        counts
    }
}

/// Plant-level overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    /// `None` when aggregated across every plant
    pub plant_id: Option<Uuid>,
    pub active_learners: i64,
    pub enrollments: StatusCounts,
    pub completion_rate: f64,
    pub average_progress: f64,
    /// Learners with any activity in the last 30 days
    pub recently_active_learners: i64,
    pub overdue_enrollments: i64,
}

/// Per-question accuracy.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionAccuracy {
    pub question_id: Uuid,
    pub prompt: String,
    pub attempts: i64,
    pub correct: i64,
    /// Learners that got it right on their first attempt
    pub first_attempt_correct: i64,
}

/// Per-course funnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseAnalytics {
    pub course_id: Uuid,
    pub title: String,
    pub plant_id: Option<Uuid>,
    pub enrollments: StatusCounts,
    pub completion_rate: f64,
    pub average_progress: f64,
    pub questions: Vec<QuestionAccuracy>,
}

/// Events on one day.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DailyActivity {
    pub day: NaiveDate,
    pub event_type: String,
    pub events: i64,
    pub learners: i64,
}

/// Query parameters shared by analytics endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub plant_id: Option<Uuid>,
    /// Window for activity series (default 30, max 365)
    pub days: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts() {
        let counts = StatusCounts::from_rows(&[
            ("enrolled".to_string(), 3),
            ("in_progress".to_string(), 4),
            ("completed".to_string(), 5),
            ("archived".to_string(), 9),
        ]);
        assert_eq!(counts.total(), 12);
        assert_eq!(counts.completion_rate(), 41.7);
        assert_eq!(StatusCounts::default().completion_rate(), 0.0);
    }
}
