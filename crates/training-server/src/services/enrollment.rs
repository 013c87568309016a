//! Enrollment operations for learners and admins.

use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::auth::UserContext;
use crate::db::models::{
    AssignEnrollmentsRequest, AssignEnrollmentsResponse, Enrollment, EnrollmentFilter,
    EnrollmentStatus, EnrollmentView, ListResponse, Page, Profile, SelfEnrollRequest,
    UpdateEnrollmentRequest,
};
use crate::db::queries::{course, enrollment as queries, profile};
use crate::db::{begin_scoped, DbPool};
use crate::error::{AppError, AppResult};
use crate::result_ext::ResultExt;
use crate::validation::{self, Validate, ValidationErrors};

/// Service for enrollment operations.
#[derive(Clone)]
pub struct EnrollmentService {
    pool: DbPool,
}

impl EnrollmentService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Enroll the caller in a published course.
    pub async fn enroll_self(&self, user: &UserContext, request: SelfEnrollRequest) -> AppResult<Enrollment> {
        match course::get_course(&self.pool, request.course_id).await? {
            Some(c) if c.is_published => {}
            _ => {
                return Err(AppError::NotFound(format!(
                    "Course not found: {}",
                    request.course_id
                )))
            }
        }

        let mut tx = begin_scoped(&self.pool, user.own_scope()).await?;
        let enrollment = queries::insert_enrollment(
            &mut tx,
            user.plant_id,
            user.user_id,
            request.course_id,
            None,
            None,
        )
        .await?
        .ok_or_else(|| AppError::Conflict("Already enrolled in this course".to_string()))?;
        tx.commit().await?;

        tracing::info!(
            user_id = %user.user_id,
            course_id = %request.course_id,
            "Self-enrolled"
        );
        Ok(enrollment)
    }

    /// The caller's enrollments.
    pub async fn mine(&self, user: &UserContext) -> AppResult<ListResponse<EnrollmentView>> {
        let mut tx = begin_scoped(&self.pool, user.own_scope()).await?;
        let rows = queries::list_for_user(&mut tx, user.plant_id, user.user_id).await?;
        tx.commit().await?;
        Ok(ListResponse::unpaged(rows))
    }

    pub async fn list(&self, user: &UserContext, filter: EnrollmentFilter) -> AppResult<ListResponse<EnrollmentView>> {
        let (scope, plant_id) = user.admin_scope(filter.plant_id)?;
        if let Some(status) = &filter.status {
            let mut errors = ValidationErrors::new();
            validation::one_of(&mut errors, "status", status, &EnrollmentStatus::ALL);
            errors.into_result()?;
        }
        let page = Page::new(filter.limit, filter.offset);

        let mut tx = begin_scoped(&self.pool, scope).await?;
        let (rows, total) = queries::list_enrollments(
            &mut tx,
            plant_id,
            filter.course_id,
            filter.user_id,
            filter.status.as_deref(),
            page.limit,
            page.offset,
        )
        .await
        .log("listing enrollments")?;
        tx.commit().await?;

        Ok(ListResponse::new(rows, total, page))
    }

    /// Assign a course to many users. Existing enrollments are skipped.
    ///
    /// Either every user is known and active, or nothing is written.
    pub async fn assign(
        &self,
        user: &UserContext,
        request: AssignEnrollmentsRequest,
    ) -> AppResult<AssignEnrollmentsResponse> {
        let (scope, _) = user.admin_scope(None)?;
        request.validate()?;
        if course::get_course(&self.pool, request.course_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Course not found: {}",
                request.course_id
            )));
        }

        let user_ids: Vec<Uuid> = request
            .user_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut tx = begin_scoped(&self.pool, scope).await?;
        let profiles = profile::get_profiles(&mut tx, &user_ids).await?;
        let targets = resolve_targets(user, &user_ids, profiles)?;

        let mut created = Vec::new();
        let mut skipped = Vec::new();
        for target in &targets {
            match queries::insert_enrollment(
                &mut tx,
                target.plant_id,
                target.id,
                request.course_id,
                Some(user.user_id),
                request.due_at,
            )
            .await?
            {
                Some(enrollment) => created.push(enrollment),
                None => skipped.push(target.id),
            }
        }
        tx.commit().await?;

        tracing::info!(
            course_id = %request.course_id,
            assigned_by = %user.user_id,
            created = created.len(),
            skipped = skipped.len(),
            "Course assigned"
        );
        Ok(AssignEnrollmentsResponse::new(created, skipped))
    }

    pub async fn update(
        &self,
        user: &UserContext,
        id: Uuid,
        request: UpdateEnrollmentRequest,
    ) -> AppResult<Enrollment> {
        let (scope, _) = user.admin_scope(None)?;
        request.validate()?;

        let mut tx = begin_scoped(&self.pool, scope).await?;
        let mut enrollment = find_visible(&mut tx, user, id).await?;

        if let Some(status) = &request.status {
            let status: EnrollmentStatus = status.parse().map_err(AppError::BadRequest)?;
            enrollment = queries::set_status(&mut tx, id, status)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Enrollment not found: {}", id)))?;
        }
        if let Some(due_at) = request.due_at {
            enrollment = queries::set_due_at(&mut tx, id, due_at)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Enrollment not found: {}", id)))?;
        }
        tx.commit().await?;

        tracing::info!(enrollment_id = %id, status = %enrollment.status, updated_by = %user.user_id, "Enrollment updated");
        Ok(enrollment)
    }

    /// Remove an enrollment and the learner's progress in that course.
    pub async fn delete(&self, user: &UserContext, id: Uuid) -> AppResult<()> {
        let (scope, _) = user.admin_scope(None)?;

        let mut tx = begin_scoped(&self.pool, scope).await?;
        find_visible(&mut tx, user, id).await?;
        queries::delete_enrollment(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(enrollment_id = %id, deleted_by = %user.user_id, "Enrollment deleted");
        Ok(())
    }
}

async fn find_visible(conn: &mut sqlx::PgConnection, user: &UserContext, id: Uuid) -> AppResult<Enrollment> {
    match queries::get_enrollment(conn, id).await? {
        Some(e) if user.can_access_plant(e.plant_id) => Ok(e),
        _ => Err(AppError::NotFound(format!("Enrollment not found: {}", id))),
    }
}

/// Match requested ids to active profiles the caller administers.
fn resolve_targets(user: &UserContext, ids: &[Uuid], profiles: Vec<Profile>) -> AppResult<Vec<Profile>> {
    let mut by_id: HashMap<Uuid, Profile> = profiles
        .into_iter()
        .filter(|p| p.is_active && user.can_access_plant(p.plant_id))
        .map(|p| (p.id, p))
        .collect();

    let mut missing = Vec::new();
    let mut targets = Vec::with_capacity(ids.len());
    for id in ids {
        match by_id.remove(id) {
            Some(p) => targets.push(p),
            None => missing.push(id.to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(AppError::invalid_field(
            "user_ids",
            format!("unknown or inactive users: {}", missing.join(", ")),
        ));
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{Seed, TestDb};
    use crate::db::models::{AdminRole, RoleGrant};
    use chrono::Utc;

    fn admin(plant_id: Uuid) -> UserContext {
        UserContext {
            user_id: Uuid::new_v4(),
            email: "hr@specchem.com".to_string(),
            full_name: "HR".to_string(),
            plant_id,
            locale: "en".to_string(),
            roles: vec![RoleGrant {
                role: AdminRole::HrAdmin,
                plant_id: None,
            }],
        }
    }

    fn profile(plant_id: Uuid, active: bool) -> Profile {
        let now = Utc::now();
        Profile {
            id: Uuid::new_v4(),
            plant_id,
            email: format!("{}@specchem.com", Uuid::new_v4()),
            full_name: "Operator".to_string(),
            job_title: None,
            preferred_locale: "en".to_string(),
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_resolve_targets_all_known() {
        let plant = Uuid::new_v4();
        let a = profile(plant, true);
        let b = profile(plant, true);
        let ids = vec![a.id, b.id];

        let targets = resolve_targets(&admin(plant), &ids, vec![b.clone(), a.clone()]).unwrap();
        assert_eq!(targets.iter().map(|p| p.id).collect::<Vec<_>>(), ids);
    }

    #[test]
    fn test_resolve_targets_rejects_inactive_and_foreign() {
        let plant = Uuid::new_v4();
        let inactive = profile(plant, false);
        let foreign = profile(Uuid::new_v4(), true);
        let unknown = Uuid::new_v4();

        let err = resolve_targets(
            &admin(plant),
            &[inactive.id, foreign.id, unknown],
            vec![inactive.clone(), foreign.clone()],
        )
        .unwrap_err();

        match err {
            AppError::Validation(errors) => {
                let message = &errors.get("user_ids").unwrap()[0];
                assert!(message.contains(&inactive.id.to_string()));
                assert!(message.contains(&foreign.id.to_string()));
                assert!(message.contains(&unknown.to_string()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_self_enroll_conflicts() {
        let Some(db) = TestDb::connect().await else {
            return;
        };
        let (seed, home) = Seed::new(&db).await;
        let learner = seed.learner(home.id).await;
        let (course, _, _) = seed.course("hearing-conservation").await;
        let service = EnrollmentService::new(db.pool.clone());

        let first = service
            .enroll_self(&learner, SelfEnrollRequest { course_id: course.id })
            .await
            .unwrap();
        assert_eq!(first.status, "enrolled");
        let second = service
            .enroll_self(&learner, SelfEnrollRequest { course_id: course.id })
            .await
            .unwrap_err();
        assert!(matches!(second, AppError::Conflict(_)));
        assert_eq!(service.mine(&learner).await.unwrap().total, 1);

        db.close().await;
    }

    #[tokio::test]
    async fn test_bulk_assign_is_all_or_nothing() {
        let Some(db) = TestDb::connect().await else {
            return;
        };
        let (seed, home) = Seed::new(&db).await;
        let a = seed.learner(home.id).await;
        let b = seed.learner(home.id).await;
        let (course, _, _) = seed.course("fire-extinguishers").await;
        let service = EnrollmentService::new(db.pool.clone());

        let err = service
            .assign(
                &seed.admin,
                AssignEnrollmentsRequest {
                    user_ids: vec![a.user_id, Uuid::new_v4()],
                    course_id: course.id,
                    due_at: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(service.mine(&a).await.unwrap().total, 0);

        service
            .enroll_self(&b, SelfEnrollRequest { course_id: course.id })
            .await
            .unwrap();
        let response = service
            .assign(
                &seed.admin,
                AssignEnrollmentsRequest {
                    user_ids: vec![a.user_id, b.user_id, a.user_id],
                    course_id: course.id,
                    due_at: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(response.created_count, 1);
        assert_eq!(response.skipped, vec![b.user_id]);
        assert_eq!(response.created[0].assigned_by, Some(seed.admin.user_id));

        db.close().await;
    }
}
