//! Marketplace administrators.

mod commands;
mod steps;
mod workflows;

pub use commands::{CreateAdminUser, DeleteAdminUser, ResetAdminPassword, UpdateAdminUser};
pub use steps::{AdminUserSnapshot, RemoveAdminUser};
pub use workflows::{
    CreateAdminUserWorkflow, CreatedAdminUser, DeleteAdminUserWorkflow,
    ResetAdminPasswordWorkflow, UpdateAdminUserWorkflow,
};

use chrono::{DateTime, Utc};
use record_store::{Entity, RecordId, UniqueKey};
use serde::{Deserialize, Serialize};

use crate::labels::labelled_enum;
use crate::value_objects::{Email, Metadata};

labelled_enum! {
    pub enum AdminRole ("admin role") {
        Admin = "admin",
        SuperAdmin = "super_admin",
        Moderator = "moderator",
    }
}

impl Default for AdminRole {
    fn default() -> Self {
        AdminRole::Admin
    }
}

/// A user of the admin console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: RecordId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub role: AdminRole,
    pub is_active: bool,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl AdminUser {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl Entity for AdminUser {
    const ENTITY_TYPE: &'static str = "admin_user";

    fn id(&self) -> RecordId {
        self.id
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new("email", self.email.as_str())]
    }
}
