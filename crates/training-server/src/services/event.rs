//! Learner activity events and graded quiz answers.

use std::collections::BTreeSet;

use crate::auth::UserContext;
use crate::db::models::{
    ActivityEvent, AnswerResult, CreateActivityRequest, QuizQuestion, SubmitAnswerRequest,
};
use crate::db::queries::{content, course, enrollment, event as queries};
use crate::db::{begin_scoped, DbPool};
use crate::error::{AppError, AppResult};
use crate::result_ext::ResultExt;
use crate::validation::Validate;

/// Whether the selection is exactly the answer key, ignoring order.
pub fn grade(question: &QuizQuestion, selected: &[i32]) -> bool {
    let selected: BTreeSet<i32> = selected.iter().copied().collect();
    let expected: BTreeSet<i32> = question.correct_answers.0.iter().copied().collect();
    selected == expected
}

/// Service for event operations.
#[derive(Clone)]
pub struct EventService {
    pool: DbPool,
}

impl EventService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn record_activity(
        &self,
        user: &UserContext,
        request: CreateActivityRequest,
    ) -> AppResult<ActivityEvent> {
        request.validate()?;

        if let Some(course_id) = request.course_id {
            match course::get_course(&self.pool, course_id).await? {
                Some(c) if c.is_published || user.is_dev_admin() => {}
                _ => return Err(AppError::NotFound(format!("Course not found: {}", course_id))),
            }
        }
        if let Some(section_id) = request.section_id {
            let owner = content::course_of_section(&self.pool, section_id).await?;
            if owner.is_none() || owner != request.course_id {
                return Err(AppError::invalid_field(
                    "section_id",
                    "section does not belong to this course",
                ));
            }
        }

        let metadata = request
            .metadata
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

        let mut tx = begin_scoped(&self.pool, user.own_scope()).await?;
        let row = queries::insert_activity(
            &mut tx,
            user.plant_id,
            user.user_id,
            request.course_id,
            request.section_id,
            &request.event_type,
            &metadata,
        )
        .await
        .log("recording activity")?;
        tx.commit().await?;

        tracing::debug!(
            user_id = %user.user_id,
            event_type = %row.event_type,
            course_id = ?row.course_id,
            "Activity recorded"
        );
        Ok(row)
    }

    /// Grade an answer and record it with its attempt number.
    pub async fn submit_answer(&self, user: &UserContext, request: SubmitAnswerRequest) -> AppResult<AnswerResult> {
        request.validate()?;

        let question = content::get_question(&self.pool, request.question_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question not found: {}", request.question_id)))?;
        let course_id = match content::get_question_course(&self.pool, question.id).await? {
            Some((course_id, published)) if published || user.is_dev_admin() => course_id,
            _ => {
                return Err(AppError::NotFound(format!(
                    "Question not found: {}",
                    request.question_id
                )))
            }
        };

        let option_count = question.options.0.len() as i32;
        if request.selected_answers.iter().any(|&i| i >= option_count) {
            return Err(AppError::invalid_field(
                "selected_answers",
                format!("option indices must be below {}", option_count),
            ));
        }

        let is_correct = grade(&question, &request.selected_answers);

        let mut tx = begin_scoped(&self.pool, user.own_scope()).await?;
        if enrollment::find_enrollment(&mut tx, user.plant_id, user.user_id, course_id)
            .await?
            .is_none()
        {
            return Err(AppError::Forbidden("Not enrolled in this course".to_string()));
        }

        queries::lock_attempts(&mut tx, user.user_id, question.id).await?;
        let previous = queries::count_attempts(&mut tx, user.plant_id, user.user_id, question.id).await?;
        let attempt_number = attempt_number(previous)?;

        let row = queries::insert_question_event(
            &mut tx,
            user.plant_id,
            user.user_id,
            course_id,
            question.id,
            &request.selected_answers,
            is_correct,
            attempt_number,
            request.time_spent_ms,
        )
        .await?;
        tx.commit().await?;

        tracing::debug!(
            user_id = %user.user_id,
            question_id = %question.id,
            attempt_number,
            is_correct,
            "Answer graded"
        );

        Ok(AnswerResult {
            event_id: row.id,
            question_id: question.id,
            is_correct,
            attempt_number,
            correct_answers: question.correct_answers.0,
            explanation: question.explanation,
        })
    }
}

fn attempt_number(previous: i64) -> AppResult<i32> {
    i32::try_from(previous + 1)
        .map_err(|_| AppError::Internal("Attempt counter overflow".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::SelfEnrollRequest;
    use crate::db::testing::{Seed, TestDb};
    use crate::services::EnrollmentService;
    use uuid::Uuid;

    fn question_with(kind: &str, options: usize, answers: &[i32]) -> QuizQuestion {
        use chrono::Utc;
        use sqlx::types::Json;

        let now = Utc::now();
        QuizQuestion {
            id: Uuid::new_v4(),
            section_id: Uuid::new_v4(),
            prompt: "Select the required PPE".to_string(),
            question_type: kind.to_string(),
            options: Json((0..options).map(|i| format!("Option {}", i)).collect()),
            correct_answers: Json(answers.to_vec()),
            explanation: None,
            position: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_single_choice_grading() {
        let q = question_with("single_choice", 4, &[2]);
        assert!(grade(&q, &[2]));
        assert!(!grade(&q, &[1]));
        assert!(!grade(&q, &[1, 2]));
    }

    #[test]
    fn test_multiple_choice_requires_exact_set() {
        let q = question_with("multiple_choice", 5, &[0, 3]);
        assert!(grade(&q, &[3, 0]));
        assert!(grade(&q, &[0, 3, 3]));
        assert!(!grade(&q, &[0]));
        assert!(!grade(&q, &[0, 3, 4]));
    }

    #[test]
    fn test_attempt_number() {
        assert_eq!(attempt_number(0).unwrap(), 1);
        assert_eq!(attempt_number(4).unwrap(), 5);
        assert!(attempt_number(i64::from(i32::MAX)).is_err());
    }

    #[tokio::test]
    async fn test_attempts_are_numbered_per_question() {
        let Some(db) = TestDb::connect().await else {
            return;
        };
        let (seed, home) = Seed::new(&db).await;
        let learner = seed.learner(home.id).await;
        let (course, _, question) = seed.course("lockout-tagout").await;
        let service = EventService::new(db.pool.clone());
        let answer = |selected: Vec<i32>| SubmitAnswerRequest {
            question_id: question.id,
            selected_answers: selected,
            time_spent_ms: Some(4_000),
        };

        let denied = service.submit_answer(&learner, answer(vec![1])).await.unwrap_err();
        assert!(matches!(denied, AppError::Forbidden(_)));

        EnrollmentService::new(db.pool.clone())
            .enroll_self(&learner, SelfEnrollRequest { course_id: course.id })
            .await
            .unwrap();
        let first = service.submit_answer(&learner, answer(vec![0])).await.unwrap();
        assert_eq!(first.attempt_number, 1);
        assert!(!first.is_correct);
        let second = service.submit_answer(&learner, answer(vec![1])).await.unwrap();
        assert_eq!(second.attempt_number, 2);
        assert!(second.is_correct);
        assert_eq!(second.correct_answers, vec![1]);

        db.close().await;
    }
}
