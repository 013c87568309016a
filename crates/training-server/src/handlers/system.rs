//! Database administration endpoints.

use axum::{extract::State, Extension, Json};

use crate::auth::UserContext;
use crate::db::schema::{self, SchemaReport};
use crate::error::AppResult;
use crate::state::AppState;

/// Validate the training schema.
///
/// `GET /api/db/validate` (dev_admin)
///
/// # Response
///
/// ```json
/// {
///   "schema": "training",
///   "valid": false,
///   "tables": ["plants", "profiles", ...],
///   "missing": ["question_events"]
/// }
/// ```
pub async fn validate_database(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> AppResult<Json<SchemaReport>> {
    user.require_dev_admin()?;
    let report = schema::validate(&state.db, &state.config.schema).await?;
    if !report.valid {
        tracing::warn!(schema = %report.schema, missing = ?report.missing, "Schema is incomplete");
    }
    Ok(Json(report))
}
