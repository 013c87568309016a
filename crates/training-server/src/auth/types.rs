use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{AdminRole, RoleGrant};
use crate::db::PlantScope;
use crate::error::{AppError, AppResult};

/// Authenticated caller, resolved from the session token and profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub plant_id: Uuid,
    pub locale: String,
    pub roles: Vec<RoleGrant>,
}

impl UserContext {
    pub fn has_role(&self, role: AdminRole) -> bool {
        self.roles.iter().any(|g| g.role == role)
    }

    pub fn is_dev_admin(&self) -> bool {
        self.has_role(AdminRole::DevAdmin)
    }

    /// hr_admin, or dev_admin which implies it.
    pub fn is_hr_admin(&self) -> bool {
        self.is_dev_admin() || self.has_role(AdminRole::HrAdmin)
    }

    /// Plant an hr_admin manages: the role's plant, else the holder's own.
    pub fn hr_plant(&self) -> Option<Uuid> {
        self.roles
            .iter()
            .find(|g| g.role == AdminRole::HrAdmin)
            .map(|g| g.plant_id.unwrap_or(self.plant_id))
    }

    /// Whether the caller may read or manage rows of `plant_id`.
    pub fn can_access_plant(&self, plant_id: Uuid) -> bool {
        if self.is_dev_admin() {
            return true;
        }
        plant_id == self.plant_id || self.hr_plant() == Some(plant_id)
    }

    pub fn require_hr_admin(&self) -> AppResult<()> {
        if self.is_hr_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("hr_admin role required".to_string()))
        }
    }

    pub fn require_dev_admin(&self) -> AppResult<()> {
        if self.is_dev_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("dev_admin role required".to_string()))
        }
    }

    /// Scope for the caller's own learner data.
    pub fn own_scope(&self) -> PlantScope {
        PlantScope::plant(self.plant_id)
    }

    /// Resolve the plant an admin request targets.
    ///
    /// dev_admin may target any plant or, with `None`, all of them.
    /// hr_admin defaults to the plant it manages and may not leave it.
    pub fn admin_scope(&self, requested: Option<Uuid>) -> AppResult<(PlantScope, Option<Uuid>)> {
        self.require_hr_admin()?;

        if self.is_dev_admin() {
            return Ok(match requested {
                Some(plant) => (PlantScope::plant(plant), Some(plant)),
                None => (PlantScope::all_plants(), None),
            });
        }

        let home = self.hr_plant().unwrap_or(self.plant_id);
        let target = requested.unwrap_or(home);
        if target != home {
            return Err(AppError::Forbidden(
                "Not permitted to access another plant".to_string(),
            ));
        }
        Ok((PlantScope::plant(target), Some(target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(roles: Vec<RoleGrant>) -> UserContext {
        UserContext {
            user_id: Uuid::new_v4(),
            email: "sup@specchem.com".to_string(),
            full_name: "Shift Supervisor".to_string(),
            plant_id: Uuid::new_v4(),
            locale: "en".to_string(),
            roles,
        }
    }

    #[test]
    fn test_learner_access() {
        let learner = ctx(vec![]);
        assert!(!learner.is_hr_admin());
        assert!(learner.can_access_plant(learner.plant_id));
        assert!(!learner.can_access_plant(Uuid::new_v4()));
        assert!(matches!(
            learner.admin_scope(None),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_hr_admin_limited_to_plant() {
        let admin = ctx(vec![RoleGrant {
            role: AdminRole::HrAdmin,
            plant_id: None,
        }]);
        let (scope, plant) = admin.admin_scope(None).unwrap();
        assert_eq!(plant, Some(admin.plant_id));
        assert_eq!(scope, PlantScope::plant(admin.plant_id));
        assert!(admin.admin_scope(Some(Uuid::new_v4())).is_err());
        assert!(admin.require_dev_admin().is_err());
    }

    #[test]
    fn test_hr_admin_scoped_to_other_plant() {
        let managed = Uuid::new_v4();
        let admin = ctx(vec![RoleGrant {
            role: AdminRole::HrAdmin,
            plant_id: Some(managed),
        }]);
        assert!(admin.can_access_plant(managed));
        assert_eq!(admin.admin_scope(None).unwrap().1, Some(managed));
        assert!(admin.admin_scope(Some(admin.plant_id)).is_err());
    }

    #[test]
    fn test_dev_admin_sees_all_plants() {
        let dev = ctx(vec![RoleGrant {
            role: AdminRole::DevAdmin,
            plant_id: None,
        }]);
        assert!(dev.is_hr_admin());
        assert!(dev.can_access_plant(Uuid::new_v4()));

        let (scope, plant) = dev.admin_scope(None).unwrap();
        assert!(scope.bypass);
        assert!(plant.is_none());

        let other = Uuid::new_v4();
        assert_eq!(dev.admin_scope(Some(other)).unwrap().1, Some(other));
    }
}
