//! User administration handlers (hr_admin).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::auth::UserContext;
use crate::db::models::{
    CreateUserRequest, GrantRoleRequest, ListResponse, UpdateUserRequest, UserFilter, UserResponse,
};
use crate::error::AppResult;
use crate::state::Services;

/// List users.
///
/// `GET /api/admin/users?plant_id=&q=&include_inactive=&limit=&offset=`
///
/// hr_admins default to, and are limited to, their own plant.
pub async fn list(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Query(filter): Query<UserFilter>,
) -> AppResult<Json<ListResponse<UserResponse>>> {
    Ok(Json(services.users.list(&user, filter).await?))
}

/// Create the profile of an auth-provider user.
///
/// `POST /api/admin/users`
///
/// # Request Body
///
/// ```json
/// {
///   "id": "0b7e...",
///   "email": "jdoe@specchem.com",
///   "full_name": "Jane Doe",
///   "plant_id": "1c2d...",
///   "job_title": "Operator",
///   "preferred_locale": "es"
/// }
/// ```
pub async fn create(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Json(request): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let created = services.users.create(&user, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/admin/users/{user_id}`
pub async fn get(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(services.users.get(&user, user_id).await?))
}

/// `PATCH /api/admin/users/{user_id}`
pub async fn update(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(services.users.update(&user, user_id, request).await?))
}

/// Deactivate a user. Training history is kept.
///
/// `DELETE /api/admin/users/{user_id}`
pub async fn deactivate(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(services.users.deactivate(&user, user_id).await?))
}

/// Grant a role.
///
/// `PUT /api/admin/users/{user_id}/roles/{role}`
///
/// Body is optional; `{"plant_id": "..."}` scopes an hr_admin grant to a
/// plant other than the user's own. Granting dev_admin requires dev_admin.
pub async fn grant_role(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path((user_id, role)): Path<(Uuid, String)>,
    request: Option<Json<GrantRoleRequest>>,
) -> AppResult<Json<UserResponse>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(services.users.grant_role(&user, user_id, &role, request).await?))
}

/// `DELETE /api/admin/users/{user_id}/roles/{role}`
pub async fn revoke_role(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path((user_id, role)): Path<(Uuid, String)>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(services.users.revoke_role(&user, user_id, &role).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_filter_deserialization() {
        let filter: UserFilter =
            serde_json::from_str(r#"{"q": "doe", "limit": 10, "include_inactive": true}"#).unwrap();
        assert_eq!(filter.q.as_deref(), Some("doe"));
        assert_eq!(filter.limit, Some(10));
        assert!(filter.include_inactive);
        assert!(filter.plant_id.is_none());
    }
}
