//! Credential steps.

use async_trait::async_trait;
use record_store::{EntityStoreExt, RecordId, RecordStore};
use workflow::{Result, Step, StepResponse, WorkflowError};

use super::{ActorKind, AuthIdentity, Credential, identity_for};
use crate::context::MarketplaceContext;

/// Input of [`ResetCredential`].
pub struct CredentialReset {
    pub actor: ActorKind,
    pub actor_id: RecordId,
    pub password: String,
}

/// Replaces the password of the identity linked to an actor.
/// Undo puts the previous digest back.
pub struct ResetCredential;

#[async_trait]
impl<S: RecordStore + 'static> Step<MarketplaceContext<S>> for ResetCredential {
    type Input = CredentialReset;
    type Output = AuthIdentity;
    type Undo = (RecordId, Credential);

    fn name(&self) -> &'static str {
        "reset_credential"
    }

    async fn run(
        &self,
        reset: CredentialReset,
        ctx: &MarketplaceContext<S>,
    ) -> Result<StepResponse<AuthIdentity, (RecordId, Credential)>> {
        let (_, identity) = identity_for(ctx.store(), reset.actor, reset.actor_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("auth_identity", reset.actor_id))?;

        let previous = identity.credential.clone();
        let mut updated = identity;
        updated.credential = ctx.hasher().spawn_hash(&reset.password).await?;
        let stored = ctx.store().replace(&updated).await?;

        tracing::info!(actor = %reset.actor, actor_id = %reset.actor_id, "credential reset");
        Ok(StepResponse::with_undo(stored, (updated.id, previous)))
    }

    async fn compensate(
        &self,
        (identity_id, previous): (RecordId, Credential),
        ctx: &MarketplaceContext<S>,
    ) -> Result<()> {
        let Some(mut identity) = ctx.store().fetch::<AuthIdentity>(identity_id).await? else {
            return Ok(());
        };
        identity.credential = previous;
        ctx.store().replace(&identity).await?;
        Ok(())
    }
}
