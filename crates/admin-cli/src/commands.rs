//! Command handlers. Every change goes through a marketplace workflow.

use std::io::Write;

use marketplace::{
    AdminRole, AdminUser, CreateAdminUser, Marketplace, ResetAdminPassword, Vendor, VendorFilter,
};
use record_store::RecordStore;

use crate::cli::Command;
use crate::error::{CliError, Result};

/// Runs a store-level command, writing one plain text line per result to `out`.
///
/// `migrate` needs the database itself and is handled by [`crate::run`].
pub async fn execute<S, W>(market: &Marketplace<S>, command: Command, out: &mut W) -> Result<()>
where
    S: RecordStore + 'static,
    W: Write,
{
    match command {
        Command::Migrate => Err(CliError::Config(
            "migrate runs against the database directly".to_string(),
        )),
        Command::CreateSuperAdmin(args) => {
            let cmd = CreateAdminUser::new(args.email, args.first_name, args.last_name, args.password)
                .with_role(AdminRole::SuperAdmin);
            let created = market.create_admin_user(cmd).await?;
            tracing::info!(admin_user_id = %created.user.id, "super admin created");
            writeln!(out, "created admin user {}", admin_line(&created.user))?;
            Ok(())
        }
        Command::ListAdminUsers => {
            for user in market.admin_users().await? {
                writeln!(out, "{}", admin_line(&user))?;
            }
            Ok(())
        }
        Command::ResetAdminPassword(args) => {
            let user = admin_by_email(market, &args.email).await?;
            market
                .reset_admin_password(ResetAdminPassword::new(user.id, args.password))
                .await?;
            writeln!(out, "password reset for {}", user.email)?;
            Ok(())
        }
        Command::DeleteAdminUser { email } => {
            let user = admin_by_email(market, &email).await?;
            let deleted = market.delete_admin_user(user.id).await?;
            writeln!(out, "deleted admin user {}", admin_line(&deleted))?;
            Ok(())
        }
        Command::ListVendors { status } => {
            let mut filter = VendorFilter::default();
            if let Some(status) = status {
                filter = filter.with_status(status);
            }
            for vendor in market.vendors(&filter).await? {
                writeln!(out, "{}", vendor_line(&vendor))?;
            }
            Ok(())
        }
        Command::ApproveVendor { id } => {
            let vendor = market.approve_vendor(id).await?;
            writeln!(out, "{}", vendor_line(&vendor))?;
            Ok(())
        }
        Command::RejectVendor { id } => {
            let vendor = market.reject_vendor(id).await?;
            writeln!(out, "{}", vendor_line(&vendor))?;
            Ok(())
        }
        Command::SuspendVendor { id } => {
            let vendor = market.suspend_vendor(id).await?;
            writeln!(out, "{}", vendor_line(&vendor))?;
            Ok(())
        }
    }
}

async fn admin_by_email<S: RecordStore + 'static>(
    market: &Marketplace<S>,
    email: &str,
) -> Result<AdminUser> {
    market
        .admin_user_by_email(email)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("no admin user with email {email}")))
}

fn admin_line(user: &AdminUser) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        user.id,
        user.email,
        user.full_name(),
        user.role,
        if user.is_active { "active" } else { "inactive" }
    )
}

fn vendor_line(vendor: &Vendor) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        vendor.id,
        vendor.business_name,
        vendor.email,
        vendor.verification_status,
        if vendor.is_active { "active" } else { "inactive" }
    )
}
