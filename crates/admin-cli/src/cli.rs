//! Command line definition.

use clap::{Args, Parser, Subcommand};
use marketplace::VerificationStatus;
use record_store::RecordId;

#[derive(Debug, Parser)]
#[command(
    name = "marketplace-admin",
    version,
    about = "Operator commands for the agricultural marketplace"
)]
pub struct Cli {
    /// PostgreSQL connection string.
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply pending database migrations.
    Migrate,

    /// Create an admin user with the super_admin role.
    CreateSuperAdmin(CreateSuperAdminArgs),

    /// List admin users.
    ListAdminUsers,

    /// Set a new password for an admin user.
    ResetAdminPassword(ResetAdminPasswordArgs),

    /// Delete an admin user together with its login.
    DeleteAdminUser {
        #[arg(long)]
        email: String,
    },

    /// List vendors, optionally by verification status.
    ListVendors {
        #[arg(long)]
        status: Option<VerificationStatus>,
    },

    /// Approve a vendor.
    ApproveVendor { id: RecordId },

    /// Reject a vendor and take its listings down.
    RejectVendor { id: RecordId },

    /// Suspend a vendor and take its listings down.
    SuspendVendor { id: RecordId },
}

#[derive(Debug, Args)]
pub struct CreateSuperAdminArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct ResetAdminPasswordArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub password: String,
}
