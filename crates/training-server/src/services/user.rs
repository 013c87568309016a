//! Profile and admin role management.

use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::{SessionCache, UserContext};
use crate::db::models::{
    AdminRole, AdminRoleRow, CreateUserRequest, GrantRoleRequest, ListResponse, Page, Profile,
    RoleGrant, UpdateUserRequest, UserFilter, UserResponse,
};
use crate::db::queries::profile as queries;
use crate::db::{begin_scoped, DbPool, PlantScope};
use crate::error::{AppError, AppResult};
use crate::result_ext::ResultExt;
use crate::services::PlantService;
use crate::validation::Validate;

/// Service for user administration.
#[derive(Clone)]
pub struct UserService {
    pool: DbPool,
    sessions: SessionCache,
}

impl UserService {
    pub fn new(pool: DbPool, sessions: SessionCache) -> Self {
        Self { pool, sessions }
    }

    /// The caller's own profile.
    pub async fn me(&self, user: &UserContext) -> AppResult<UserResponse> {
        let mut tx = begin_scoped(&self.pool, user.own_scope()).await?;
        let profile = queries::get_profile(&mut tx, user.user_id, Some(user.plant_id))
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
        let roles = queries::list_roles(&mut tx, user.user_id).await?;
        tx.commit().await?;

        Ok(to_response(profile, &roles))
    }

    /// List profiles in the plants the caller administers.
    pub async fn list(&self, user: &UserContext, filter: UserFilter) -> AppResult<ListResponse<UserResponse>> {
        let (scope, plant_id) = user.admin_scope(filter.plant_id)?;
        let page = Page::new(filter.limit, filter.offset);
        let search = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty());

        let mut tx = begin_scoped(&self.pool, scope).await?;
        let (profiles, total) = queries::list_profiles(
            &mut tx,
            plant_id,
            search,
            filter.include_inactive,
            page.limit,
            page.offset,
        )
        .await
        .log("listing profiles")?;

        let ids: Vec<Uuid> = profiles.iter().map(|p| p.id).collect();
        let role_rows = queries::list_roles_for(&mut tx, &ids).await?;
        tx.commit().await?;

        let mut by_profile: HashMap<Uuid, Vec<AdminRoleRow>> = HashMap::new();
        for row in role_rows {
            by_profile.entry(row.profile_id).or_default().push(row);
        }

        let items = profiles
            .into_iter()
            .map(|p| {
                let roles = by_profile.remove(&p.id).unwrap_or_default();
                to_response(p, &roles)
            })
            .collect();

        Ok(ListResponse::new(items, total, page))
    }

    pub async fn get(&self, user: &UserContext, id: Uuid) -> AppResult<UserResponse> {
        let (scope, _) = user.admin_scope(None)?;
        let mut tx = begin_scoped(&self.pool, scope).await?;
        let profile = find_visible(&mut tx, user, id).await?;
        let roles = queries::list_roles(&mut tx, id).await?;
        tx.commit().await?;

        Ok(to_response(profile, &roles))
    }

    /// Create the training profile for an auth-provider user.
    pub async fn create(&self, user: &UserContext, request: CreateUserRequest) -> AppResult<UserResponse> {
        user.require_hr_admin()?;
        request.validate()?;
        if !user.can_access_plant(request.plant_id) {
            return Err(AppError::Forbidden(
                "Not permitted to add users to this plant".to_string(),
            ));
        }
        PlantService::ensure_active(&self.pool, request.plant_id).await?;

        let mut tx = begin_scoped(&self.pool, PlantScope::plant(request.plant_id)).await?;
        let profile = queries::insert_profile(
            &mut tx,
            request.id,
            request.plant_id,
            request.email.trim(),
            request.full_name.trim(),
            request.job_title.as_deref().map(str::trim),
            request.preferred_locale.as_deref().unwrap_or("en"),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            user_id = %profile.id,
            plant_id = %profile.plant_id,
            created_by = %user.user_id,
            "Profile created"
        );
        Ok(to_response(profile, &[]))
    }

    pub async fn update(
        &self,
        user: &UserContext,
        id: Uuid,
        request: UpdateUserRequest,
    ) -> AppResult<UserResponse> {
        request.validate()?;
        let (scope, _) = user.admin_scope(None)?;

        if let Some(plant_id) = request.plant_id {
            if !user.can_access_plant(plant_id) {
                return Err(AppError::Forbidden(
                    "Not permitted to move users to this plant".to_string(),
                ));
            }
            PlantService::ensure_active(&self.pool, plant_id).await?;
        }
        if request.is_active == Some(false) && id == user.user_id {
            return Err(AppError::BadRequest(
                "Cannot deactivate your own account".to_string(),
            ));
        }

        // A move touches rows of two plants. Access to the target was
        // checked above and access to the source is checked by find_visible.
        let scope = if request.plant_id.is_some() {
            PlantScope::all_plants()
        } else {
            scope
        };

        let mut tx = begin_scoped(&self.pool, scope).await?;
        let previous = find_visible(&mut tx, user, id).await?;
        let profile = queries::update_profile(
            &mut tx,
            id,
            request.full_name.as_deref().map(str::trim),
            request.job_title.as_deref().map(str::trim),
            request.plant_id,
            request.preferred_locale.as_deref(),
            request.is_active,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User not found: {}", id)))?;

        if profile.plant_id != previous.plant_id {
            let moved = queries::rehome_user(&mut tx, id, profile.plant_id)
                .await
                .log("moving user rows")?;
            tracing::info!(
                user_id = %id,
                from_plant = %previous.plant_id,
                to_plant = %profile.plant_id,
                enrollments = moved.enrollments,
                progress = moved.progress,
                events = moved.activity_events + moved.question_events,
                moved_by = %user.user_id,
                "User moved to another plant"
            );
        }
        let roles = queries::list_roles(&mut tx, id).await?;
        tx.commit().await?;

        self.drop_sessions(id).await;
        Ok(to_response(profile, &roles))
    }

    /// Deactivate a user. Profiles are never hard-deleted so their
    /// training history is kept.
    pub async fn deactivate(&self, user: &UserContext, id: Uuid) -> AppResult<UserResponse> {
        self.update(
            user,
            id,
            UpdateUserRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn grant_role(
        &self,
        user: &UserContext,
        id: Uuid,
        role: &str,
        request: GrantRoleRequest,
    ) -> AppResult<UserResponse> {
        let role = parse_role(role)?;
        let (scope, _) = user.admin_scope(None)?;
        if role == AdminRole::DevAdmin {
            user.require_dev_admin()?;
        }

        let mut tx = begin_scoped(&self.pool, scope).await?;
        let profile = find_visible(&mut tx, user, id).await?;

        let role_plant = match role {
            AdminRole::DevAdmin => None,
            AdminRole::HrAdmin => Some(request.plant_id.unwrap_or(profile.plant_id)),
        };
        if let Some(plant_id) = role_plant {
            if !user.can_access_plant(plant_id) {
                return Err(AppError::Forbidden(
                    "Not permitted to grant roles for this plant".to_string(),
                ));
            }
        }

        queries::upsert_role(&mut tx, id, role, role_plant).await?;
        let roles = queries::list_roles(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %id, role = %role, granted_by = %user.user_id, "Role granted");
        self.drop_sessions(id).await;
        Ok(to_response(profile, &roles))
    }

    pub async fn revoke_role(&self, user: &UserContext, id: Uuid, role: &str) -> AppResult<UserResponse> {
        let role = parse_role(role)?;
        let (scope, _) = user.admin_scope(None)?;
        if role == AdminRole::DevAdmin {
            user.require_dev_admin()?;
        }
        if id == user.user_id {
            return Err(AppError::BadRequest("Cannot revoke your own role".to_string()));
        }

        let mut tx = begin_scoped(&self.pool, scope).await?;
        let profile = find_visible(&mut tx, user, id).await?;
        if !queries::delete_role(&mut tx, id, role).await? {
            return Err(AppError::NotFound(format!("User {} has no {} role", id, role)));
        }
        let roles = queries::list_roles(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %id, role = %role, revoked_by = %user.user_id, "Role revoked");
        self.drop_sessions(id).await;
        Ok(to_response(profile, &roles))
    }

    /// Force the user's cached sessions to be re-resolved.
    async fn drop_sessions(&self, id: Uuid) {
        let dropped = self
            .sessions
            .invalidate_where(|_, session| session.user_id == id)
            .await;
        if dropped > 0 {
            tracing::debug!(user_id = %id, dropped, "Invalidated cached sessions");
        }
    }
}

async fn find_visible(
    conn: &mut sqlx::PgConnection,
    user: &UserContext,
    id: Uuid,
) -> AppResult<Profile> {
    match queries::get_profile(conn, id, None).await? {
        Some(profile) if user.can_access_plant(profile.plant_id) => Ok(profile),
        _ => Err(AppError::NotFound(format!("User not found: {}", id))),
    }
}

fn parse_role(role: &str) -> AppResult<AdminRole> {
    role.parse()
        .map_err(|e: String| AppError::invalid_field("role", e))
}

fn to_response(profile: Profile, roles: &[AdminRoleRow]) -> UserResponse {
    UserResponse {
        profile,
        roles: roles.iter().filter_map(RoleGrant::from_row).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::db::models::{SelfEnrollRequest, UpdateProgressRequest};
    use crate::db::testing::{self, Seed, TestDb};
    use crate::services::{EnrollmentService, ProgressService};
    use chrono::Utc;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("hr_admin").unwrap(), AdminRole::HrAdmin);
        let err = parse_role("superuser").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_to_response_skips_unknown_roles() {
        let now = Utc::now();
        let profile = Profile {
            id: Uuid::new_v4(),
            plant_id: Uuid::new_v4(),
            email: "op@specchem.com".to_string(),
            full_name: "Plant Operator".to_string(),
            job_title: None,
            preferred_locale: "en".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let row = |role: &str| AdminRoleRow {
            id: Uuid::new_v4(),
            profile_id: profile.id,
            role: role.to_string(),
            plant_id: None,
            created_at: now,
        };

        let response = to_response(profile.clone(), &[row("hr_admin"), row("legacy_role")]);
        assert_eq!(response.roles.len(), 1);
        assert_eq!(response.roles[0].role, AdminRole::HrAdmin);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["email"], "op@specchem.com");
        assert_eq!(json["roles"][0]["role"], "hr_admin");
    }

    fn progress_report(percent: i32) -> UpdateProgressRequest {
        UpdateProgressRequest {
            progress_percent: percent,
            current_section_id: None,
            completed_section_id: None,
        }
    }

    #[tokio::test]
    async fn test_moved_user_keeps_training_history() {
        let Some(db) = TestDb::connect().await else {
            return;
        };
        let (seed, home) = Seed::new(&db).await;
        let target = seed.plant("MKE-01").await;
        let learner = seed.learner(home.id).await;
        let (course, _, _) = seed.course("lockout-tagout").await;

        let enrollments = EnrollmentService::new(db.pool.clone());
        let progress = ProgressService::new(db.pool.clone());
        enrollments
            .enroll_self(&learner, SelfEnrollRequest { course_id: course.id })
            .await
            .unwrap();
        progress
            .update(&learner, course.id, progress_report(40))
            .await
            .unwrap();

        let users = UserService::new(db.pool.clone(), SessionCache::new(Duration::from_secs(60)));
        let moved = users
            .update(
                &seed.admin,
                learner.user_id,
                UpdateUserRequest {
                    plant_id: Some(target.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.profile.plant_id, target.id);

        // The next session resolves the new plant.
        let learner = testing::learner(learner.user_id, target.id);
        let mine = enrollments.mine(&learner).await.unwrap();
        assert_eq!(mine.total, 1);
        assert_eq!(mine.items[0].plant_id, target.id);

        let again = enrollments
            .enroll_self(&learner, SelfEnrollRequest { course_id: course.id })
            .await
            .unwrap_err();
        assert!(matches!(again, AppError::Conflict(_)));

        let row = progress
            .update(&learner, course.id, progress_report(60))
            .await
            .unwrap();
        assert_eq!(row.progress_percent, 60);
        assert_eq!(row.plant_id, target.id);

        db.close().await;
    }

    #[tokio::test]
    async fn test_hr_admin_moves_user_into_own_plant() {
        let Some(db) = TestDb::connect().await else {
            return;
        };
        let (seed, home) = Seed::new(&db).await;
        let managed = seed.plant("MKE-01").await;
        let learner = seed.learner(managed.id).await;
        let (course, _, _) = seed.course("hazcom").await;
        EnrollmentService::new(db.pool.clone())
            .enroll_self(&learner, SelfEnrollRequest { course_id: course.id })
            .await
            .unwrap();

        // Works at `home`, manages `managed`.
        let hr = UserContext {
            roles: vec![RoleGrant {
                role: AdminRole::HrAdmin,
                plant_id: Some(managed.id),
            }],
            ..seed.learner(home.id).await
        };
        let users = UserService::new(db.pool.clone(), SessionCache::new(Duration::from_secs(60)));
        let moved = users
            .update(
                &hr,
                learner.user_id,
                UpdateUserRequest {
                    plant_id: Some(home.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.profile.plant_id, home.id);

        let mine = EnrollmentService::new(db.pool.clone())
            .mine(&testing::learner(learner.user_id, home.id))
            .await
            .unwrap();
        assert_eq!(mine.total, 1);

        db.close().await;
    }
}
