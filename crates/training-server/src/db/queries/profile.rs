//! Profile and admin role queries.
//!
//! `profiles` is a tenant table: these functions run on a plant-scoped
//! connection (see [`crate::db::tenant`]).

use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::models::{AdminRole, AdminRoleRow, Profile};
use crate::error::AppResult;

const PROFILE_COLUMNS: &str =
    "id, plant_id, email, full_name, job_title, preferred_locale, is_active, created_at, updated_at";

/// Get a profile by ID, optionally restricted to one plant.
pub async fn get_profile(
    conn: &mut PgConnection,
    id: Uuid,
    plant_id: Option<Uuid>,
) -> AppResult<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1 AND ($2::UUID IS NULL OR plant_id = $2)"
    ))
    .bind(id)
    .bind(plant_id)
    .fetch_optional(conn)
    .await?;

    Ok(profile)
}

/// Profiles with the given IDs that are visible to the scope.
pub async fn get_profiles(conn: &mut PgConnection, ids: &[Uuid]) -> AppResult<Vec<Profile>> {
    let profiles = sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(conn)
    .await?;

    Ok(profiles)
}

/// List profiles with optional plant and text filters.
pub async fn list_profiles(
    conn: &mut PgConnection,
    plant_id: Option<Uuid>,
    search: Option<&str>,
    include_inactive: bool,
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<Profile>, i64)> {
    let pattern = search.map(|q| format!("%{}%", q));

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM profiles
        WHERE ($1::UUID IS NULL OR plant_id = $1)
          AND ($2::TEXT IS NULL OR full_name ILIKE $2 OR email ILIKE $2)
          AND ($3 OR is_active)
        "#,
    )
    .bind(plant_id)
    .bind(pattern.as_deref())
    .bind(include_inactive)
    .fetch_one(&mut *conn)
    .await?;

    let profiles = sqlx::query_as::<_, Profile>(&format!(
        r#"
        SELECT {PROFILE_COLUMNS} FROM profiles
        WHERE ($1::UUID IS NULL OR plant_id = $1)
          AND ($2::TEXT IS NULL OR full_name ILIKE $2 OR email ILIKE $2)
          AND ($3 OR is_active)
        ORDER BY full_name, email
        LIMIT $4 OFFSET $5
        "#
    ))
    .bind(plant_id)
    .bind(pattern.as_deref())
    .bind(include_inactive)
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await?;

    Ok((profiles, total))
}

/// Insert a new profile.
#[allow(clippy::too_many_arguments)]
pub async fn insert_profile(
    conn: &mut PgConnection,
    id: Uuid,
    plant_id: Uuid,
    email: &str,
    full_name: &str,
    job_title: Option<&str>,
    preferred_locale: &str,
) -> AppResult<Profile> {
    let profile = sqlx::query_as::<_, Profile>(&format!(
        r#"
        INSERT INTO profiles (id, plant_id, email, full_name, job_title, preferred_locale)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {PROFILE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(plant_id)
    .bind(email.trim().to_lowercase())
    .bind(full_name.trim())
    .bind(job_title)
    .bind(preferred_locale)
    .fetch_one(conn)
    .await?;

    Ok(profile)
}

/// Update a profile; `None` fields are left unchanged.
#[allow(clippy::too_many_arguments)]
pub async fn update_profile(
    conn: &mut PgConnection,
    id: Uuid,
    full_name: Option<&str>,
    job_title: Option<&str>,
    plant_id: Option<Uuid>,
    preferred_locale: Option<&str>,
    is_active: Option<bool>,
) -> AppResult<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(&format!(
        r#"
        UPDATE profiles
        SET full_name = COALESCE($2, full_name),
            job_title = COALESCE($3, job_title),
            plant_id = COALESCE($4, plant_id),
            preferred_locale = COALESCE($5, preferred_locale),
            is_active = COALESCE($6, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {PROFILE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(full_name.map(str::trim))
    .bind(job_title)
    .bind(plant_id)
    .bind(preferred_locale)
    .bind(is_active)
    .fetch_optional(conn)
    .await?;

    Ok(profile)
}

/// Rows moved by [`rehome_user`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RehomedRows {
    pub enrollments: u64,
    pub progress: u64,
    pub activity_events: u64,
    pub question_events: u64,
}

/// Move every tenant row of a user to `plant_id`.
///
/// Needs a connection whose scope sees both the old and the new plant.
pub async fn rehome_user(conn: &mut PgConnection, user_id: Uuid, plant_id: Uuid) -> AppResult<RehomedRows> {
    let mut moved = [0u64; 4];
    for (i, table) in ["enrollments", "progress", "activity_events", "question_events"]
        .iter()
        .enumerate()
    {
        moved[i] = sqlx::query(&format!(
            "UPDATE {table} SET plant_id = $2 WHERE user_id = $1 AND plant_id <> $2"
        ))
        .bind(user_id)
        .bind(plant_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    }

    Ok(RehomedRows {
        enrollments: moved[0],
        progress: moved[1],
        activity_events: moved[2],
        question_events: moved[3],
    })
}

/// Roles held by a profile.
pub async fn list_roles(conn: &mut PgConnection, profile_id: Uuid) -> AppResult<Vec<AdminRoleRow>> {
    let roles = sqlx::query_as::<_, AdminRoleRow>(
        r#"
        SELECT id, profile_id, role, plant_id, created_at
        FROM admin_roles
        WHERE profile_id = $1
        ORDER BY role
        "#,
    )
    .bind(profile_id)
    .fetch_all(conn)
    .await?;

    Ok(roles)
}

/// Roles for many profiles at once.
pub async fn list_roles_for(
    conn: &mut PgConnection,
    profile_ids: &[Uuid],
) -> AppResult<Vec<AdminRoleRow>> {
    let roles = sqlx::query_as::<_, AdminRoleRow>(
        r#"
        SELECT id, profile_id, role, plant_id, created_at
        FROM admin_roles
        WHERE profile_id = ANY($1)
        ORDER BY profile_id, role
        "#,
    )
    .bind(profile_ids)
    .fetch_all(conn)
    .await?;

    Ok(roles)
}

/// Grant a role, replacing the plant scope if already held.
pub async fn upsert_role(
    conn: &mut PgConnection,
    profile_id: Uuid,
    role: AdminRole,
    plant_id: Option<Uuid>,
) -> AppResult<AdminRoleRow> {
    let row = sqlx::query_as::<_, AdminRoleRow>(
        r#"
        INSERT INTO admin_roles (profile_id, role, plant_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (profile_id, role) DO UPDATE SET plant_id = EXCLUDED.plant_id
        RETURNING id, profile_id, role, plant_id, created_at
        "#,
    )
    .bind(profile_id)
    .bind(role.as_str())
    .bind(plant_id)
    .fetch_one(conn)
    .await?;

    Ok(row)
}

/// Revoke a role.
pub async fn delete_role(conn: &mut PgConnection, profile_id: Uuid, role: AdminRole) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM admin_roles WHERE profile_id = $1 AND role = $2")
        .bind(profile_id)
        .bind(role.as_str())
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}
