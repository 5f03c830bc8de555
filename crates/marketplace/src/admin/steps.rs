//! Admin user steps.

use async_trait::async_trait;
use record_store::{EntityStoreExt, RecordId, RecordStore};
use workflow::{Result, Step, StepResponse};

use super::AdminUser;
use crate::auth::{ActorKind, AuthIdentity, IdentityLink};
use crate::context::MarketplaceContext;
use crate::steps::remove_if_present;

/// An admin user together with its logins, as captured before removal.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminUserSnapshot {
    pub user: AdminUser,
    pub identities: Vec<AuthIdentity>,
    pub links: Vec<IdentityLink>,
}

impl AdminUserSnapshot {
    /// Reads the user and everything linked to it.
    pub async fn capture<S: RecordStore + ?Sized>(store: &S, user_id: RecordId) -> Result<Self> {
        let user: AdminUser = store.fetch_required(user_id).await?;
        let links = store
            .find::<IdentityLink>(IdentityLink::for_actor(ActorKind::AdminUser, user_id))
            .await?;

        let mut identities = Vec::with_capacity(links.len());
        for link in &links {
            if let Some(identity) = store.fetch::<AuthIdentity>(link.auth_identity_id).await? {
                identities.push(identity);
            }
        }
        Ok(Self {
            user,
            identities,
            links,
        })
    }

    /// Deletes links, then identities, then the user.
    async fn remove<S: RecordStore + ?Sized>(&self, store: &S) -> Result<()> {
        for link in &self.links {
            remove_if_present::<S, IdentityLink>(store, link.id).await?;
        }
        for identity in &self.identities {
            remove_if_present::<S, AuthIdentity>(store, identity.id).await?;
        }
        remove_if_present::<S, AdminUser>(store, self.user.id).await
    }

    /// Recreates the user, then identities, then links, with their original
    /// ids. Records that are still present are left as they are.
    pub async fn restore<S: RecordStore + ?Sized>(&self, store: &S) -> Result<()> {
        store.restore(&self.user).await?;
        for identity in &self.identities {
            store.restore(identity).await?;
        }
        for link in &self.links {
            store.restore(link).await?;
        }
        Ok(())
    }
}

/// Deletes an admin user with its identities and links.
/// Undo recreates all of them under their original ids.
pub struct RemoveAdminUser;

#[async_trait]
impl<S: RecordStore + 'static> Step<MarketplaceContext<S>> for RemoveAdminUser {
    type Input = RecordId;
    type Output = AdminUser;
    type Undo = AdminUserSnapshot;

    fn name(&self) -> &'static str {
        "delete_admin_user"
    }

    async fn run(
        &self,
        user_id: RecordId,
        ctx: &MarketplaceContext<S>,
    ) -> Result<StepResponse<AdminUser, AdminUserSnapshot>> {
        let store = ctx.store();
        let snapshot = AdminUserSnapshot::capture(store, user_id).await?;

        if let Err(err) = snapshot.remove(store).await {
            // Leave the user as it was found
            if let Err(restore_err) = snapshot.restore(store).await {
                tracing::error!(%user_id, error = %restore_err, "failed to restore partially deleted admin user");
            }
            return Err(err);
        }

        tracing::info!(
            %user_id,
            identities = snapshot.identities.len(),
            "admin user deleted"
        );
        Ok(StepResponse::with_undo(snapshot.user.clone(), snapshot))
    }

    async fn compensate(
        &self,
        snapshot: AdminUserSnapshot,
        ctx: &MarketplaceContext<S>,
    ) -> Result<()> {
        snapshot.restore(ctx.store()).await
    }
}
