//! Profile and admin role models.
//!
//! A profile's `id` is the user id issued by the auth provider; the
//! profile adds the plant assignment and display data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::validation::{self, Validate, ValidationErrors, MAX_TITLE_LEN};

/// Profile row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub job_title: Option<String>,
    pub preferred_locale: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scoped admin permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Manages users, enrollments and analytics of a plant
    HrAdmin,
    /// Manages course content and every plant
    DevAdmin,
}

impl AdminRole {
    pub const ALL: [&'static str; 2] = ["hr_admin", "dev_admin"];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::HrAdmin => "hr_admin",
            AdminRole::DevAdmin => "dev_admin",
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hr_admin" => Ok(AdminRole::HrAdmin),
            "dev_admin" => Ok(AdminRole::DevAdmin),
            _ => Err(format!("Unknown admin role: {}", s)),
        }
    }
}

/// Admin role row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AdminRoleRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub role: String,
    pub plant_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A role as exposed in API responses and the user context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: AdminRole,

    /// Plant the role is limited to; `None` means the holder's own plant
    /// for hr_admin and every plant for dev_admin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plant_id: Option<Uuid>,
}

impl RoleGrant {
    /// Convert a row, skipping roles this build does not know.
    pub fn from_row(row: &AdminRoleRow) -> Option<Self> {
        match row.role.parse() {
            Ok(role) => Some(Self {
                role,
                plant_id: row.plant_id,
            }),
            Err(e) => {
                tracing::warn!(profile_id = %row.profile_id, error = %e, "Ignoring role");
                None
            }
        }
    }
}

/// Request to create a profile for a provider user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    /// User id issued by the auth provider
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub plant_id: Uuid,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub preferred_locale: Option<String>,
}

/// Partial profile update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub job_title: Option<String>,
    pub plant_id: Option<Uuid>,
    pub preferred_locale: Option<String>,
    pub is_active: Option<bool>,
}

/// Body of a role grant. `plant_id` scopes an hr_admin grant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrantRoleRequest {
    #[serde(default)]
    pub plant_id: Option<Uuid>,
}

/// Query parameters for listing users.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub plant_id: Option<Uuid>,
    /// Search on name and email
    pub q: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Profile with its roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub roles: Vec<RoleGrant>,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::email(&mut errors, "email", &self.email);
        validation::required_text(&mut errors, "full_name", &self.full_name, MAX_TITLE_LEN);
        validation::optional_text(&mut errors, "job_title", self.job_title.as_deref(), MAX_TITLE_LEN);
        if let Some(locale) = &self.preferred_locale {
            validation::locale(&mut errors, "preferred_locale", locale);
        }
        if self.id.is_nil() {
            errors.add("id", "must not be nil");
        }
        errors.into_result()
    }
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::at_least_one(
            &mut errors,
            &[
                self.full_name.is_some(),
                self.job_title.is_some(),
                self.plant_id.is_some(),
                self.preferred_locale.is_some(),
                self.is_active.is_some(),
            ],
        );
        validation::optional_text(&mut errors, "full_name", self.full_name.as_deref(), MAX_TITLE_LEN);
        validation::optional_text(&mut errors, "job_title", self.job_title.as_deref(), MAX_TITLE_LEN);
        if let Some(locale) = &self.preferred_locale {
            validation::locale(&mut errors, "preferred_locale", locale);
        }
        errors.into_result()
    }
}
