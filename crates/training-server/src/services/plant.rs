//! Plant (tenant) management. dev_admin only.

use uuid::Uuid;

use crate::auth::UserContext;
use crate::db::models::{CreatePlantRequest, ListResponse, Plant, UpdatePlantRequest};
use crate::db::queries::plant as queries;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::validation::Validate;

/// Service for plant operations.
#[derive(Clone)]
pub struct PlantService {
    pool: DbPool,
}

impl PlantService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user: &UserContext, include_inactive: bool) -> AppResult<ListResponse<Plant>> {
        user.require_dev_admin()?;
        let plants = queries::list_plants(&self.pool, include_inactive).await?;
        Ok(ListResponse::unpaged(plants))
    }

    pub async fn create(&self, user: &UserContext, request: CreatePlantRequest) -> AppResult<Plant> {
        user.require_dev_admin()?;
        request.validate()?;

        let plant = queries::insert_plant(&self.pool, &request.code, request.name.trim()).await?;
        tracing::info!(plant_id = %plant.id, code = %plant.code, "Plant created");
        Ok(plant)
    }

    pub async fn update(
        &self,
        user: &UserContext,
        id: Uuid,
        request: UpdatePlantRequest,
    ) -> AppResult<Plant> {
        user.require_dev_admin()?;
        request.validate()?;

        queries::update_plant(
            &self.pool,
            id,
            request.name.as_deref().map(str::trim),
            request.is_active,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Plant not found: {}", id)))
    }

    /// Fail with 400 unless the plant exists and is active.
    pub async fn ensure_active(pool: &DbPool, id: Uuid) -> AppResult<Plant> {
        match queries::get_plant(pool, id).await? {
            Some(plant) if plant.is_active => Ok(plant),
            Some(_) => Err(AppError::invalid_field("plant_id", "plant is inactive")),
            None => Err(AppError::invalid_field("plant_id", "plant does not exist")),
        }
    }
}
