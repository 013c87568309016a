//! Plant administration handlers (dev_admin).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::UserContext;
use crate::db::models::{CreatePlantRequest, ListResponse, Plant, UpdatePlantRequest};
use crate::error::AppResult;
use crate::state::Services;

#[derive(Debug, Deserialize, Default)]
pub struct PlantQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// `GET /api/admin/plants?include_inactive=true`
pub async fn list(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<PlantQuery>,
) -> AppResult<Json<ListResponse<Plant>>> {
    Ok(Json(services.plants.list(&user, query.include_inactive).await?))
}

/// Register a plant.
///
/// `POST /api/admin/plants`
///
/// # Request Body
///
/// ```json
/// {"code": "MKE", "name": "Milwaukee"}
/// ```
pub async fn create(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Json(request): Json<CreatePlantRequest>,
) -> AppResult<(StatusCode, Json<Plant>)> {
    let plant = services.plants.create(&user, request).await?;
    Ok((StatusCode::CREATED, Json(plant)))
}

/// Rename or (de)activate a plant.
///
/// `PATCH /api/admin/plants/{plant_id}`
pub async fn update(
    State(services): State<Services>,
    Extension(user): Extension<UserContext>,
    Path(plant_id): Path<Uuid>,
    Json(request): Json<UpdatePlantRequest>,
) -> AppResult<Json<Plant>> {
    Ok(Json(services.plants.update(&user, plant_id, request).await?))
}
