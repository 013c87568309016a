//! Admin analytics over enrollments, progress and events.

use uuid::Uuid;

use crate::auth::UserContext;
use crate::db::models::{
    AnalyticsOverview, AnalyticsQuery, CourseAnalytics, DailyActivity, ListResponse, StatusCounts,
};
use crate::db::queries::{analytics as queries, course};
use crate::db::{begin_scoped, DbPool};
use crate::error::{AppError, AppResult};
use crate::result_ext::ResultExt;

/// Window for "recently active" learners, in days.
const RECENT_ACTIVITY_DAYS: i32 = 30;

/// Default and maximum window for activity series, in days.
const DEFAULT_ACTIVITY_DAYS: i32 = 30;
const MAX_ACTIVITY_DAYS: i32 = 365;

/// Service for analytics queries.
#[derive(Clone)]
pub struct AnalyticsService {
    pool: DbPool,
}

impl AnalyticsService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn overview(&self, user: &UserContext, query: AnalyticsQuery) -> AppResult<AnalyticsOverview> {
        let (scope, plant_id) = user.admin_scope(query.plant_id)?;

        let mut tx = begin_scoped(&self.pool, scope).await?;
        let rows = queries::enrollment_status_counts(&mut tx, plant_id, None)
            .await
            .log("counting enrollments")?;
        let average_progress = queries::average_progress(&mut tx, plant_id, None).await?;
        let active_learners = queries::active_learners(&mut tx, plant_id).await?;
        let recently_active_learners =
            queries::recently_active_learners(&mut tx, plant_id, RECENT_ACTIVITY_DAYS).await?;
        let overdue_enrollments = queries::overdue_enrollments(&mut tx, plant_id).await?;
        tx.commit().await?;

        let enrollments = StatusCounts::from_rows(&rows);
        Ok(AnalyticsOverview {
            plant_id,
            active_learners,
            completion_rate: enrollments.completion_rate(),
            enrollments,
            average_progress,
            recently_active_learners,
            overdue_enrollments,
        })
    }

    pub async fn course(
        &self,
        user: &UserContext,
        course_id: Uuid,
        query: AnalyticsQuery,
    ) -> AppResult<CourseAnalytics> {
        let (scope, plant_id) = user.admin_scope(query.plant_id)?;
        let found = course::get_course(&self.pool, course_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course not found: {}", course_id)))?;

        let mut tx = begin_scoped(&self.pool, scope).await?;
        let rows = queries::enrollment_status_counts(&mut tx, plant_id, Some(course_id)).await?;
        let average_progress = queries::average_progress(&mut tx, plant_id, Some(course_id)).await?;
        let questions = queries::question_accuracy(&mut tx, plant_id, course_id).await?;
        tx.commit().await?;

        let enrollments = StatusCounts::from_rows(&rows);
        Ok(CourseAnalytics {
            course_id,
            title: found.title,
            plant_id,
            completion_rate: enrollments.completion_rate(),
            enrollments,
            average_progress,
            questions,
        })
    }

    /// Daily event counts over the requested window.
    pub async fn activity(&self, user: &UserContext, query: AnalyticsQuery) -> AppResult<ListResponse<DailyActivity>> {
        let (scope, plant_id) = user.admin_scope(query.plant_id)?;
        let days = activity_window(query.days);

        let mut tx = begin_scoped(&self.pool, scope).await?;
        let rows = queries::daily_activity(&mut tx, plant_id, days).await?;
        tx.commit().await?;

        Ok(ListResponse::unpaged(rows))
    }
}

fn activity_window(days: Option<i32>) -> i32 {
    days.unwrap_or(DEFAULT_ACTIVITY_DAYS).clamp(1, MAX_ACTIVITY_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_window() {
        assert_eq!(activity_window(None), 30);
        assert_eq!(activity_window(Some(7)), 7);
        assert_eq!(activity_window(Some(0)), 1);
        assert_eq!(activity_window(Some(10_000)), 365);
    }
}
