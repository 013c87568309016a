//! Plant queries.

use uuid::Uuid;

use crate::db::models::Plant;
use crate::db::DbPool;
use crate::error::AppResult;

const PLANT_COLUMNS: &str = "id, code, name, is_active, created_at, updated_at";

/// List plants.
pub async fn list_plants(pool: &DbPool, include_inactive: bool) -> AppResult<Vec<Plant>> {
    let plants = sqlx::query_as::<_, Plant>(&format!(
        "SELECT {PLANT_COLUMNS} FROM plants WHERE ($1 OR is_active) ORDER BY code"
    ))
    .bind(include_inactive)
    .fetch_all(pool)
    .await?;

    Ok(plants)
}

/// Get a plant by ID.
pub async fn get_plant(pool: &DbPool, id: Uuid) -> AppResult<Option<Plant>> {
    let plant = sqlx::query_as::<_, Plant>(&format!(
        "SELECT {PLANT_COLUMNS} FROM plants WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(plant)
}

/// Insert a new plant.
pub async fn insert_plant(pool: &DbPool, code: &str, name: &str) -> AppResult<Plant> {
    let plant = sqlx::query_as::<_, Plant>(&format!(
        "INSERT INTO plants (code, name) VALUES ($1, $2) RETURNING {PLANT_COLUMNS}"
    ))
    .bind(code)
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(plant)
}

/// Update a plant; `None` fields are left unchanged.
pub async fn update_plant(
    pool: &DbPool,
    id: Uuid,
    name: Option<&str>,
    is_active: Option<bool>,
) -> AppResult<Option<Plant>> {
    let plant = sqlx::query_as::<_, Plant>(&format!(
        r#"
        UPDATE plants
        SET name = COALESCE($2, name),
            is_active = COALESCE($3, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {PLANT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(name)
    .bind(is_active)
    .fetch_optional(pool)
    .await?;

    Ok(plant)
}
