//! Plant (tenant site) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::validation::{self, Validate, ValidationErrors, MAX_TITLE_LEN};

/// Plant row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Plant {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a plant.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlantRequest {
    /// Short unique code, e.g. "KC-01"
    pub code: String,
    pub name: String,
}

/// Partial plant update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlantRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

fn check_code(errors: &mut ValidationErrors, code: &str) {
    let valid = !code.is_empty()
        && code.len() <= 20
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        errors.add("code", "must be 1-20 uppercase letters, digits or hyphens");
    }
}

impl Validate for CreatePlantRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_code(&mut errors, &self.code);
        validation::required_text(&mut errors, "name", &self.name, MAX_TITLE_LEN);
        errors.into_result()
    }
}

impl Validate for UpdatePlantRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::at_least_one(&mut errors, &[self.name.is_some(), self.is_active.is_some()]);
        validation::optional_text(&mut errors, "name", self.name.as_deref(), MAX_TITLE_LEN);
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_plant_validation() {
        let ok = CreatePlantRequest {
            code: "KC-01".to_string(),
            name: "Kansas City".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = CreatePlantRequest {
            code: "kc 01".to_string(),
            name: "".to_string(),
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.get("code").is_some());
        assert!(errors.get("name").is_some());
    }

    #[test]
    fn test_empty_update_rejected() {
        let errors = UpdatePlantRequest::default().validate().unwrap_err();
        assert!(errors.get("body").is_some());
    }
}
