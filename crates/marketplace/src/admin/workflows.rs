//! Admin user workflows.

use async_trait::async_trait;
use record_store::{RecordId, RecordStore};
use workflow::{Result, Workflow, WorkflowRun};

use super::{
    AdminUser, CreateAdminUser, DeleteAdminUser, RemoveAdminUser, ResetAdminPassword,
    UpdateAdminUser,
};
use crate::auth::{ActorKind, AuthIdentity, CredentialReset, IdentityLink, ResetCredential};
use crate::context::MarketplaceContext;
use crate::steps::{FetchEntity, InsertEntity, ReplaceEntity, Replacement};

/// A new admin user and its login.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedAdminUser {
    pub user: AdminUser,
    pub auth_identity: AuthIdentity,
}

/// `create-admin-user`: create the user, its login and the link between them.
///
/// The email is claimed by the user record, so a taken address fails the
/// first step with a duplicate error.
pub struct CreateAdminUserWorkflow;

#[async_trait]
impl<S: RecordStore + 'static> Workflow<MarketplaceContext<S>> for CreateAdminUserWorkflow {
    type Input = CreateAdminUser;
    type Output = CreatedAdminUser;

    fn name(&self) -> &'static str {
        "create-admin-user"
    }

    fn validate(&self, cmd: &CreateAdminUser) -> Result<()> {
        Ok(cmd.validate()?)
    }

    async fn execute(
        &self,
        cmd: CreateAdminUser,
        run: &mut WorkflowRun<'_, MarketplaceContext<S>>,
    ) -> Result<CreatedAdminUser> {
        let user = cmd.to_admin_user()?;
        let credential = run.context().hasher().spawn_hash(&cmd.password).await?;

        let user = run
            .step(InsertEntity::<AdminUser>::new("create_admin_user"), user)
            .await?;

        let identity = AuthIdentity::email_password(&user.email, credential);
        let auth_identity = run
            .step(
                InsertEntity::<AuthIdentity>::new("create_auth_identity"),
                identity,
            )
            .await?;

        let link = IdentityLink::new(auth_identity.id, ActorKind::AdminUser, user.id);
        run.step(InsertEntity::<IdentityLink>::new("link_identity"), link)
            .await?;

        Ok(CreatedAdminUser {
            user,
            auth_identity,
        })
    }
}

/// `update-admin-user`: capture the user, then write the change.
pub struct UpdateAdminUserWorkflow;

#[async_trait]
impl<S: RecordStore + 'static> Workflow<MarketplaceContext<S>> for UpdateAdminUserWorkflow {
    type Input = UpdateAdminUser;
    type Output = AdminUser;

    fn name(&self) -> &'static str {
        "update-admin-user"
    }

    fn validate(&self, cmd: &UpdateAdminUser) -> Result<()> {
        Ok(cmd.validate()?)
    }

    async fn execute(
        &self,
        cmd: UpdateAdminUser,
        run: &mut WorkflowRun<'_, MarketplaceContext<S>>,
    ) -> Result<AdminUser> {
        let snapshot = run
            .step(
                FetchEntity::<AdminUser>::new("capture_admin_snapshot"),
                cmd.admin_user_id,
            )
            .await?;
        let next = cmd.apply(&snapshot.entity);
        run.step(
            ReplaceEntity::<AdminUser>::new("update_admin_user"),
            Replacement::new(snapshot, next),
        )
        .await
    }
}

/// `delete-admin-user`: remove the user and its logins.
pub struct DeleteAdminUserWorkflow;

#[async_trait]
impl<S: RecordStore + 'static> Workflow<MarketplaceContext<S>> for DeleteAdminUserWorkflow {
    type Input = DeleteAdminUser;
    type Output = AdminUser;

    fn name(&self) -> &'static str {
        "delete-admin-user"
    }

    async fn execute(
        &self,
        cmd: DeleteAdminUser,
        run: &mut WorkflowRun<'_, MarketplaceContext<S>>,
    ) -> Result<AdminUser> {
        run.step(RemoveAdminUser, cmd.admin_user_id).await
    }
}

/// `reset-admin-password`: replace the password of an admin user's login.
pub struct ResetAdminPasswordWorkflow;

#[async_trait]
impl<S: RecordStore + 'static> Workflow<MarketplaceContext<S>> for ResetAdminPasswordWorkflow {
    type Input = ResetAdminPassword;
    type Output = RecordId;

    fn name(&self) -> &'static str {
        "reset-admin-password"
    }

    fn validate(&self, cmd: &ResetAdminPassword) -> Result<()> {
        Ok(cmd.validate()?)
    }

    async fn execute(
        &self,
        cmd: ResetAdminPassword,
        run: &mut WorkflowRun<'_, MarketplaceContext<S>>,
    ) -> Result<RecordId> {
        let user = run
            .step(FetchEntity::<AdminUser>::new("load_admin_user"), cmd.admin_user_id)
            .await?
            .entity;
        let reset = CredentialReset {
            actor: ActorKind::AdminUser,
            actor_id: user.id,
            password: cmd.password,
        };
        let identity = run.step(ResetCredential, reset).await?;
        Ok(identity.id)
    }
}
