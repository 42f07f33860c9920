//! Ledger Integration Tests
//!
//! Longer scenarios through the public component API over the in-memory store.

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use coop_savings::aggregate::WorkDomain;
use coop_savings::handlers::{BulkDepositCommand, RegisterMemberCommand};
use coop_savings::{AppError, DomainError};

mod common;

#[tokio::test]
async fn test_formal_saver_over_a_year() {
    let (services, clock) = common::in_memory_services();
    let member = services
        .members
        .register(RegisterMemberCommand::new("EMP-9", "Abel", "Girma", WorkDomain::Academic))
        .await
        .unwrap();
    let account = services
        .accounts
        .open_formal(member.id, dec!(400))
        .await
        .unwrap();

    for _ in 0..12 {
        services.ledger.monthly_deposit(account.id, None).await.unwrap();
        let again = services.ledger.monthly_deposit(account.id, None).await;
        assert!(matches!(again, Err(AppError::Domain(DomainError::InvalidState(_)))));
        clock.advance(Duration::days(31));
    }

    let account = services.accounts.get(account.id).await.unwrap();
    assert_eq!(account.balance(), dec!(4800));
    assert_eq!(services.ledger.transactions(account.id).await.unwrap().len(), 12);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_accounts_are_independent_under_load() {
    let (services, _clock) = common::in_memory_services();

    let mut account_ids = Vec::new();
    for i in 0..4 {
        let member = services
            .members
            .register(RegisterMemberCommand::new(
                format!("EMP-{i}"),
                "Sara",
                "Tesfaye",
                WorkDomain::Contract,
            ))
            .await
            .unwrap();
        let account = services.accounts.open_informal(member.id, None).await.unwrap();
        account_ids.push(account.id);
    }

    let mut tasks = Vec::new();
    for &account_id in &account_ids {
        for _ in 0..10 {
            let services = services.clone();
            tasks.push(tokio::spawn(async move {
                services.ledger.deposit(account_id, dec!(25.50), None).await
            }));
        }
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    for account_id in account_ids {
        let account = services.accounts.get(account_id).await.unwrap();
        assert_eq!(account.balance(), dec!(255.00));
    }
}

#[tokio::test]
async fn test_monthly_payroll_run() {
    let (services, clock) = common::in_memory_services();

    let mut formal_ids = Vec::new();
    for i in 0..3 {
        let member = services
            .members
            .register(RegisterMemberCommand::new(
                format!("ADM-{i}"),
                "Meron",
                "Haile",
                WorkDomain::Administration,
            ))
            .await
            .unwrap();
        formal_ids.push(
            services
                .accounts
                .open_formal(member.id, dec!(1000))
                .await
                .unwrap()
                .id,
        );
    }

    let command = BulkDepositCommand::new("ADMINISTRATION", dec!(1000)).with_description("Payroll");
    let first = services.bulk.bulk_deposit_by_domain(command.clone()).await.unwrap();
    assert_eq!(first.success_count, 3);

    // same month again: every formal account already has its deposit
    let repeat = services.bulk.bulk_deposit_by_domain(command.clone()).await.unwrap();
    assert_eq!(repeat.success_count, 0);
    assert_eq!(repeat.failure_count, 3);
    assert_eq!(repeat.total_amount, Decimal::ZERO);

    clock.advance(Duration::days(30));
    let next = services.bulk.bulk_deposit_by_domain(command).await.unwrap();
    assert_eq!(next.total_amount, dec!(3000));

    for id in formal_ids {
        assert_eq!(services.accounts.get(id).await.unwrap().balance(), dec!(2000));
    }
}
