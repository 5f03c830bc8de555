//! Integration tests: CLI commands against the in-memory record store.

use admin_cli::{CliError, Command, execute};
use admin_cli::cli::{CreateSuperAdminArgs, ResetAdminPasswordArgs};
use marketplace::{
    ActorType, AdminRole, CredentialHasher, MIN_COST, Marketplace, MarketplaceContext, RegisterVendor,
    VerificationStatus,
};
use record_store::{InMemoryRecordStore, RecordId, StoreOperation};
use workflow::ErrorKind;

fn create_marketplace() -> (Marketplace<InMemoryRecordStore>, InMemoryRecordStore) {
    let store = InMemoryRecordStore::new();
    let context =
        MarketplaceContext::new(store.clone()).with_hasher(CredentialHasher::with_cost(MIN_COST));
    (Marketplace::with_context(context), store)
}

async fn run(market: &Marketplace<InMemoryRecordStore>, command: Command) -> Result<String, CliError> {
    let mut out = Vec::new();
    execute(market, command, &mut out).await?;
    Ok(String::from_utf8(out).unwrap())
}

fn super_admin(email: &str) -> Command {
    Command::CreateSuperAdmin(CreateSuperAdminArgs {
        email: email.to_string(),
        first_name: "Amina".to_string(),
        last_name: "Otieno".to_string(),
        password: "correct-horse".to_string(),
    })
}

#[tokio::test]
async fn create_super_admin_prints_the_new_user() {
    let (market, _store) = create_marketplace();

    let output = run(&market, super_admin("Root@Market.test")).await.unwrap();

    assert!(output.starts_with("created admin user "));
    assert!(output.contains("root@market.test\tAmina Otieno\tsuper_admin\tactive"));

    let user = market
        .admin_user_by_email("root@market.test")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.role, AdminRole::SuperAdmin);
    assert!(market
        .verify_login("root@market.test", "correct-horse")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn list_admin_users_prints_one_line_each() {
    let (market, _store) = create_marketplace();
    run(&market, super_admin("a@market.test")).await.unwrap();
    run(&market, super_admin("b@market.test")).await.unwrap();

    let output = run(&market, Command::ListAdminUsers).await.unwrap();

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("a@market.test"));
    assert!(lines[1].contains("b@market.test"));
}

#[tokio::test]
async fn duplicate_super_admin_is_rejected() {
    let (market, _store) = create_marketplace();
    run(&market, super_admin("root@market.test")).await.unwrap();

    let err = run(&market, super_admin("root@market.test"))
        .await
        .unwrap_err();

    assert!(matches!(&err, CliError::Workflow(e) if e.kind() == ErrorKind::DuplicateEntity));
    assert_eq!(err.exit_code(), 4);
    assert_eq!(market.admin_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn reset_admin_password_changes_the_login() {
    let (market, _store) = create_marketplace();
    run(&market, super_admin("root@market.test")).await.unwrap();

    let output = run(
        &market,
        Command::ResetAdminPassword(ResetAdminPasswordArgs {
            email: "root@market.test".to_string(),
            password: "battery-staple".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(output, "password reset for root@market.test\n");
    assert!(market
        .verify_login("root@market.test", "battery-staple")
        .await
        .unwrap()
        .is_some());
    assert!(market
        .verify_login("root@market.test", "correct-horse")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn commands_for_unknown_admins_report_not_found() {
    let (market, store) = create_marketplace();

    let err = run(
        &market,
        Command::DeleteAdminUser {
            email: "ghost@market.test".to_string(),
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CliError::NotFound(_)));
    assert_eq!(err.exit_code(), 3);
    assert!(store
        .operation_log()
        .await
        .iter()
        .all(|call| !call.operation.is_mutation()));
}

#[tokio::test]
async fn delete_admin_user_removes_the_login() {
    let (market, _store) = create_marketplace();
    run(&market, super_admin("root@market.test")).await.unwrap();

    let output = run(
        &market,
        Command::DeleteAdminUser {
            email: "root@market.test".to_string(),
        },
    )
    .await
    .unwrap();

    assert!(output.starts_with("deleted admin user "));
    assert!(market.admin_users().await.unwrap().is_empty());
    assert!(market
        .verify_login("root@market.test", "correct-horse")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn vendor_review_commands_update_status() {
    let (market, _store) = create_marketplace();
    let pending = market
        .register_vendor(RegisterVendor::new("Green Acres", "green@farm.test", ActorType::Farmer))
        .await
        .unwrap()
        .vendor;
    let other = market
        .register_vendor(RegisterVendor::new("Dry Store", "dry@farm.test", ActorType::StorageOperator))
        .await
        .unwrap()
        .vendor;

    let output = run(&market, Command::ApproveVendor { id: pending.id })
        .await
        .unwrap();
    assert!(output.contains("Green Acres\tgreen@farm.test\tapproved\tactive"));

    let output = run(&market, Command::SuspendVendor { id: other.id })
        .await
        .unwrap();
    assert!(output.contains("suspended\tinactive"));

    let approved = run(
        &market,
        Command::ListVendors {
            status: Some(VerificationStatus::Approved),
        },
    )
    .await
    .unwrap();
    assert_eq!(approved.lines().count(), 1);
    assert!(approved.contains("Green Acres"));

    let all = run(&market, Command::ListVendors { status: None })
        .await
        .unwrap();
    assert_eq!(all.lines().count(), 2);
}

#[tokio::test]
async fn reject_unknown_vendor_fails_without_writes() {
    let (market, store) = create_marketplace();

    let err = run(&market, Command::RejectVendor { id: RecordId::new() })
        .await
        .unwrap_err();

    assert!(matches!(&err, CliError::Workflow(e) if e.kind() == ErrorKind::NotFound));
    let log = store.operation_log().await;
    assert!(log.iter().all(|call| call.operation == StoreOperation::Get));
}

#[tokio::test]
async fn migrate_is_not_run_through_the_store() {
    let (market, store) = create_marketplace();

    let err = run(&market, Command::Migrate).await.unwrap_err();

    assert!(matches!(err, CliError::Config(_)));
    assert!(store.operation_log().await.is_empty());
}
