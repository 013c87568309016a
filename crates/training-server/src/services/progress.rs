//! Learner progress tracking.
//!
//! Progress only moves forward. The first report starts the enrollment,
//! reaching 100% completes both the progress row and the enrollment.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::UserContext;
use crate::db::models::{EnrollmentStatus, ListResponse, Progress, UpdateProgressRequest};
use crate::db::queries::{content, enrollment, event, progress as queries};
use crate::db::{begin_scoped, DbPool};
use crate::error::{AppError, AppResult};
use crate::result_ext::OptionResultExt;
use crate::validation::{Validate, ValidationErrors};

/// Row values and enrollment transition produced by one progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressChange {
    pub progress_percent: i32,
    pub current_section_id: Option<Uuid>,
    pub completed_sections: Vec<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    /// New enrollment status, if it changes
    pub enrollment_status: Option<EnrollmentStatus>,
}

/// Merge a report into the stored progress.
pub fn apply_report(
    existing: Option<&Progress>,
    request: &UpdateProgressRequest,
    status: EnrollmentStatus,
    now: DateTime<Utc>,
) -> ProgressChange {
    let previous = existing.map(|p| p.progress_percent).unwrap_or(0);
    let progress_percent = previous.max(request.progress_percent).min(100);

    let mut completed_sections = existing
        .map(|p| p.completed_sections.0.clone())
        .unwrap_or_default();
    if let Some(section) = request.completed_section_id {
        if !completed_sections.contains(&section) {
            completed_sections.push(section);
        }
    }

    let current_section_id = request
        .current_section_id
        .or_else(|| existing.and_then(|p| p.current_section_id));

    let completed_at = existing
        .and_then(|p| p.completed_at)
        .or_else(|| (progress_percent >= 100).then_some(now));

    let target = EnrollmentStatus::for_progress(progress_percent);
    let enrollment_status = match status {
        EnrollmentStatus::Completed => None,
        current if current == target => None,
        _ => Some(target),
    };

    ProgressChange {
        progress_percent,
        current_section_id,
        completed_sections,
        completed_at,
        enrollment_status,
    }
}

/// Service for progress operations. Learners only see their own rows.
#[derive(Clone)]
pub struct ProgressService {
    pool: DbPool,
}

impl ProgressService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user: &UserContext) -> AppResult<ListResponse<Progress>> {
        let mut tx = begin_scoped(&self.pool, user.own_scope()).await?;
        let rows = queries::list_for_user(&mut tx, user.plant_id, user.user_id).await?;
        tx.commit().await?;
        Ok(ListResponse::unpaged(rows))
    }

    pub async fn get(&self, user: &UserContext, course_id: Uuid) -> AppResult<Progress> {
        let mut tx = begin_scoped(&self.pool, user.own_scope()).await?;
        let row = queries::get_progress(&mut tx, user.plant_id, user.user_id, course_id).await?;
        tx.commit().await?;
        row.ok_or_else(|| AppError::NotFound(format!("No progress for course {}", course_id)))
    }

    /// Record a progress report for an enrolled course.
    pub async fn update(
        &self,
        user: &UserContext,
        course_id: Uuid,
        request: UpdateProgressRequest,
    ) -> AppResult<Progress> {
        request.validate()?;
        self.check_sections(course_id, &request).await?;

        let mut tx = begin_scoped(&self.pool, user.own_scope()).await?;
        let current = enrollment::lock_enrollment(&mut tx, user.plant_id, user.user_id, course_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("Not enrolled in this course".to_string()))?;
        let status: EnrollmentStatus = current.status.parse().map_err(AppError::Internal)?;

        let existing = queries::get_for_update(&mut tx, user.plant_id, user.user_id, course_id).await?;
        let change = apply_report(existing.as_ref(), &request, status, Utc::now());

        let row = queries::upsert_progress(
            &mut tx,
            user.plant_id,
            user.user_id,
            course_id,
            change.progress_percent,
            change.current_section_id,
            &change.completed_sections,
            change.completed_at,
        )
        .await?;

        if let Some(next) = change.enrollment_status {
            enrollment::set_status(&mut tx, current.id, next)
                .await?
                .log_none("enrollment status transition");
            if next == EnrollmentStatus::Completed {
                event::insert_activity(
                    &mut tx,
                    user.plant_id,
                    user.user_id,
                    Some(course_id),
                    None,
                    "course_completed",
                    &serde_json::json!({ "source": "progress" }),
                )
                .await?;
                tracing::info!(user_id = %user.user_id, course_id = %course_id, "Course completed");
            }
        }
        tx.commit().await?;

        Ok(row)
    }

    /// Referenced sections must belong to the course.
    async fn check_sections(&self, course_id: Uuid, request: &UpdateProgressRequest) -> AppResult<()> {
        let mut errors = ValidationErrors::new();
        for (field, section) in [
            ("current_section_id", request.current_section_id),
            ("completed_section_id", request.completed_section_id),
        ] {
            if let Some(section) = section {
                if content::course_of_section(&self.pool, section).await? != Some(course_id) {
                    errors.add(field, "section does not belong to this course");
                }
            }
        }
        errors.into_result()?;
        Ok(())
    }
}
