//! Plant-scoped transactions.
//!
//! Tenant tables have row-level security keyed on the
//! `app.current_plant_id` setting. [`begin_scoped`] opens a transaction
//! and sets that value (transaction-local), so every statement run on the
//! returned transaction only sees rows of the scoped plant. Queries still
//! filter on `plant_id` explicitly; the policy is the backstop.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppResult;

/// Which plant rows a transaction may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlantScope {
    /// Plant whose rows are visible
    pub plant_id: Option<Uuid>,

    /// See rows of every plant
    pub bypass: bool,
}

impl PlantScope {
    /// Only rows of `plant_id`.
    pub fn plant(plant_id: Uuid) -> Self {
        Self {
            plant_id: Some(plant_id),
            bypass: false,
        }
    }

    /// Rows of every plant. Used for auth lookups and dev_admin access.
    pub fn all_plants() -> Self {
        Self {
            plant_id: None,
            bypass: true,
        }
    }

    fn plant_setting(&self) -> String {
        self.plant_id.map(|p| p.to_string()).unwrap_or_default()
    }

    fn bypass_setting(&self) -> &'static str {
        if self.bypass {
            "on"
        } else {
            "off"
        }
    }
}

/// A transaction with the plant scope applied.
pub type ScopedTx = Transaction<'static, Postgres>;

/// Begin a transaction with the row-level plant scope set.
pub async fn begin_scoped(pool: &DbPool, scope: PlantScope) -> AppResult<ScopedTx> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "SELECT set_config('app.current_plant_id', $1, true), set_config('app.bypass_plant', $2, true)",
    )
    .bind(scope.plant_setting())
    .bind(scope.bypass_setting())
    .execute(&mut *tx)
    .await?;

    tracing::trace!(
        plant_id = ?scope.plant_id,
        bypass = scope.bypass,
        "Plant scope applied"
    );

    Ok(tx)
}
