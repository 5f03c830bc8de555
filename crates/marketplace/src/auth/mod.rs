//! Login identities and what they authenticate.

mod credentials;
mod steps;

pub use credentials::{
    BCRYPT, Credential, CredentialError, CredentialHasher, MAX_PASSWORD_BYTES, MIN_COST,
    MIN_PASSWORD_LENGTH, validate_password,
};
pub use steps::{CredentialReset, ResetCredential};

use chrono::{DateTime, Utc};
use record_store::{
    Entity, EntityStoreExt, RecordId, RecordQuery, RecordRef, RecordStore, UniqueKey,
};
use serde::{Deserialize, Serialize};

use crate::labels::labelled_enum;
use crate::value_objects::{Email, Metadata};

/// Provider name for email and password logins.
pub const EMAILPASS: &str = "emailpass";

/// A login credential with one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub id: RecordId,
    pub provider: String,

    /// The login name at the provider; the email for `emailpass`.
    pub provider_entity_id: String,

    pub credential: Credential,

    #[serde(default)]
    pub app_metadata: Metadata,

    pub created_at: DateTime<Utc>,
}

impl AuthIdentity {
    /// An `emailpass` identity for `email`.
    pub fn email_password(email: &Email, credential: Credential) -> Self {
        Self {
            id: RecordId::new(),
            provider: EMAILPASS.to_string(),
            provider_entity_id: email.to_string(),
            credential,
            app_metadata: Metadata::new(),
            created_at: Utc::now(),
        }
    }

    /// Query for the identity a provider knows under `entity_id`.
    pub fn by_login(provider: &str, entity_id: &str) -> RecordQuery {
        Self::query()
            .field_eq("provider", provider)
            .field_eq("provider_entity_id", entity_id)
    }
}

impl Entity for AuthIdentity {
    const ENTITY_TYPE: &'static str = "auth_identity";

    fn id(&self) -> RecordId {
        self.id
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new(
            "provider_entity_id",
            format!("{}:{}", self.provider, self.provider_entity_id),
        )]
    }
}

labelled_enum! {
    /// Kind of record an identity can authenticate.
    pub enum ActorKind ("actor kind") {
        Vendor = "vendor",
        AdminUser = "admin_user",
    }
}

impl ActorKind {
    /// Record type of the actor.
    pub fn entity_type(&self) -> &'static str {
        match self {
            ActorKind::Vendor => crate::vendor::Vendor::ENTITY_TYPE,
            ActorKind::AdminUser => crate::admin::AdminUser::ENTITY_TYPE,
        }
    }
}

/// Ties an auth identity to the vendor or admin user it logs in as.
///
/// An identity links to at most one actor and an actor to at most one
/// identity. Both sides are references, so neither can be deleted while the
/// link exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityLink {
    pub id: RecordId,
    pub auth_identity_id: RecordId,
    pub actor: ActorKind,
    pub actor_id: RecordId,
    pub created_at: DateTime<Utc>,
}

impl IdentityLink {
    pub fn new(auth_identity_id: RecordId, actor: ActorKind, actor_id: RecordId) -> Self {
        Self {
            id: RecordId::new(),
            auth_identity_id,
            actor,
            actor_id,
            created_at: Utc::now(),
        }
    }

    /// Query for the links of one actor.
    pub fn for_actor(actor: ActorKind, actor_id: RecordId) -> RecordQuery {
        Self::query()
            .field_eq("actor", actor.as_str())
            .field_eq("actor_id", actor_id.to_string())
    }
}

impl Entity for IdentityLink {
    const ENTITY_TYPE: &'static str = "identity_link";

    fn id(&self) -> RecordId {
        self.id
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![
            UniqueKey::new("auth_identity_id", self.auth_identity_id.to_string()),
            UniqueKey::new("actor", format!("{}:{}", self.actor, self.actor_id)),
        ]
    }

    fn references(&self) -> Vec<RecordRef> {
        vec![
            RecordRef::new(AuthIdentity::ENTITY_TYPE, self.auth_identity_id),
            RecordRef::new(self.actor.entity_type(), self.actor_id),
        ]
    }
}

/// Finds the identity an actor logs in with.
pub async fn identity_for<S: RecordStore + ?Sized>(
    store: &S,
    actor: ActorKind,
    actor_id: RecordId,
) -> record_store::Result<Option<(IdentityLink, AuthIdentity)>> {
    let links = store
        .find::<IdentityLink>(IdentityLink::for_actor(actor, actor_id))
        .await?;
    for link in links {
        if let Some(identity) = store.fetch::<AuthIdentity>(link.auth_identity_id).await? {
            return Ok(Some((link, identity)));
        }
    }
    Ok(None)
}
