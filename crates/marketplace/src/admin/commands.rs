//! Admin user commands.

use chrono::Utc;
use record_store::RecordId;

use super::{AdminRole, AdminUser};
use crate::auth::validate_password;
use crate::error::{ValidationError, require};
use crate::value_objects::{Email, Metadata};

/// Command to create an admin user with an email and password login.
#[derive(Clone)]
pub struct CreateAdminUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: AdminRole,
    pub password: String,
    pub metadata: Metadata,
}

impl std::fmt::Debug for CreateAdminUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateAdminUser")
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl CreateAdminUser {
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            role: AdminRole::default(),
            password: password.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_role(mut self, role: AdminRole) -> Self {
        self.role = role;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        Email::parse(&self.email)?;
        require("first_name", &self.first_name)?;
        validate_password(&self.password)
    }

    pub(crate) fn to_admin_user(&self) -> Result<AdminUser, ValidationError> {
        Ok(AdminUser {
            id: RecordId::new(),
            email: Email::parse(&self.email)?,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            role: self.role,
            is_active: true,
            metadata: self.metadata.clone(),
            created_at: Utc::now(),
        })
    }
}

/// Command to change an admin user. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateAdminUser {
    pub admin_user_id: RecordId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<AdminRole>,
    pub is_active: Option<bool>,

    /// Keys merged into the existing metadata.
    pub metadata: Option<Metadata>,
}

impl UpdateAdminUser {
    pub fn new(admin_user_id: RecordId) -> Self {
        Self {
            admin_user_id,
            ..Default::default()
        }
    }

    pub fn first_name(mut self, name: impl Into<String>) -> Self {
        self.first_name = Some(name.into());
        self
    }

    pub fn last_name(mut self, name: impl Into<String>) -> Self {
        self.last_name = Some(name.into());
        self
    }

    pub fn role(mut self, role: AdminRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.first_name {
            require("first_name", name)?;
        }
        Ok(())
    }

    pub(crate) fn apply(&self, user: &AdminUser) -> AdminUser {
        let mut next = user.clone();
        if let Some(name) = &self.first_name {
            next.first_name = name.trim().to_string();
        }
        if let Some(name) = &self.last_name {
            next.last_name = name.trim().to_string();
        }
        if let Some(role) = self.role {
            next.role = role;
        }
        if let Some(is_active) = self.is_active {
            next.is_active = is_active;
        }
        if let Some(metadata) = &self.metadata {
            next.metadata.extend(metadata.clone());
        }
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteAdminUser {
    pub admin_user_id: RecordId,
}

impl DeleteAdminUser {
    pub fn new(admin_user_id: RecordId) -> Self {
        Self { admin_user_id }
    }
}

#[derive(Clone)]
pub struct ResetAdminPassword {
    pub admin_user_id: RecordId,
    pub password: String,
}

impl std::fmt::Debug for ResetAdminPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetAdminPassword")
            .field("admin_user_id", &self.admin_user_id)
            .finish_non_exhaustive()
    }
}

impl ResetAdminPassword {
    pub fn new(admin_user_id: RecordId, password: impl Into<String>) -> Self {
        Self {
            admin_user_id,
            password: password.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate_password(&self.password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_validation() {
        let ok = CreateAdminUser::new("ops@farm.test", "Wanjiru", "Kamau", "long-password");
        assert!(ok.validate().is_ok());

        let mut no_name = ok.clone();
        no_name.first_name = "  ".to_string();
        assert_eq!(
            no_name.validate(),
            Err(ValidationError::Required {
                field: "first_name"
            })
        );

        let mut weak = ok.clone();
        weak.password = "pw".to_string();
        assert!(weak.validate().is_err());
    }

    #[test]
    fn create_defaults_to_the_admin_role() {
        let user = CreateAdminUser::new("OPS@farm.test", "Wanjiru", "Kamau", "long-password")
            .to_admin_user()
            .unwrap();
        assert_eq!(user.role, AdminRole::Admin);
        assert_eq!(user.email.as_str(), "ops@farm.test");
        assert!(user.is_active);
    }

    #[test]
    fn update_applies_only_set_fields() {
        let user = CreateAdminUser::new("ops@farm.test", "Wanjiru", "Kamau", "long-password")
            .to_admin_user()
            .unwrap();
        let next = UpdateAdminUser::new(user.id)
            .role(AdminRole::Moderator)
            .active(false)
            .apply(&user);

        assert_eq!(next.role, AdminRole::Moderator);
        assert!(!next.is_active);
        assert_eq!(next.first_name, "Wanjiru");
    }

    #[test]
    fn debug_output_hides_passwords() {
        let create = CreateAdminUser::new("ops@farm.test", "W", "K", "sekrit-password");
        let reset = ResetAdminPassword::new(RecordId::new(), "sekrit-password");
        assert!(!format!("{create:?}").contains("sekrit"));
        assert!(!format!("{reset:?}").contains("sekrit"));
    }
}
