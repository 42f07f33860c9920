//! Handler tests
//!
//! Run every component against the in-memory store with a pinned clock and
//! a seeded number generator.

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;
    use std::sync::Arc;

    use crate::aggregate::{AccountKind, Member, MemberChanges, SavingAccount, WorkDomain};
    use crate::domain::{
        DomainError, FixedClock, NumberGenerator, SharedClock, TransactionType,
    };
    use crate::error::AppError;
    use crate::handlers::{BulkDepositCommand, RegisterMemberCommand, Services};
    use crate::store::{InMemoryStore, SharedStore};

    struct Fixture {
        services: Services,
        clock: Arc<FixedClock>,
    }

    fn start_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(FixedClock::at_date(start_date()));
        let shared: SharedClock = clock.clone();
        let store: SharedStore = Arc::new(InMemoryStore::new());
        let numbers = Arc::new(NumberGenerator::seeded(shared.clone(), 42));
        Fixture {
            services: Services::new(store, shared, numbers),
            clock,
        }
    }

    fn domain_err<T: std::fmt::Debug>(result: Result<T, AppError>) -> DomainError {
        match result {
            Err(AppError::Domain(err)) => err,
            other => panic!("expected a domain error, got {:?}", other),
        }
    }

    async fn register(services: &Services, employee_id: &str, domain: WorkDomain) -> Member {
        services
            .members
            .register(RegisterMemberCommand::new(employee_id, "Tigist", "Alemu", domain))
            .await
            .unwrap()
    }

    async fn informal_with(services: &Services, member_id: i64, balance: Decimal) -> SavingAccount {
        let account = services
            .accounts
            .open_informal(member_id, None)
            .await
            .unwrap();
        if balance > Decimal::ZERO {
            services
                .ledger
                .deposit(account.id, balance, None)
                .await
                .unwrap();
        }
        services.accounts.get(account.id).await.unwrap()
    }

    // =========================================================================
    // Member Registry
    // =========================================================================

    #[tokio::test]
    async fn test_register_issues_three_numbered_shares() {
        let f = fixture();
        let member = register(&f.services, "EMP-100", WorkDomain::Academic).await;

        let certificates: Vec<_> = member
            .shares
            .iter()
            .map(|s| s.certificate_number.as_str())
            .collect();
        assert_eq!(certificates, vec!["SH-EMP-100-001", "SH-EMP-100-002", "SH-EMP-100-003"]);
        assert_eq!(member.registration_fee, dec!(500));
        assert!(f.services.members.check_eligibility(member.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_employee_id() {
        let f = fixture();
        register(&f.services, "EMP-100", WorkDomain::Academic).await;

        let again = f
            .services
            .members
            .register(RegisterMemberCommand::new("EMP-100", "Other", "Person", WorkDomain::Other))
            .await;
        assert!(matches!(domain_err(again), DomainError::DuplicateKey { field: "employeeId", .. }));
    }

    #[tokio::test]
    async fn test_register_blank_name_rejected() {
        let f = fixture();
        let result = f
            .services
            .members
            .register(RegisterMemberCommand::new("EMP-1", " ", "Alemu", WorkDomain::Other))
            .await;
        assert!(matches!(domain_err(result), DomainError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_purchase_shares_rules() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Contract).await;

        let updated = f.services.members.purchase_shares(member.id, 10).await.unwrap();
        assert_eq!(updated.share_count(), 13);
        assert_eq!(updated.shares[12].certificate_number, "SH-EMP-1-013");

        assert!(matches!(
            domain_err(f.services.members.purchase_shares(member.id, 0).await),
            DomainError::InvalidArgument(_)
        ));
        assert!(matches!(
            domain_err(f.services.members.purchase_shares(member.id, 11).await),
            DomainError::InvalidArgument(_)
        ));

        // 13 + 8 * 10 = 93, then 93 + 8 > 100
        for _ in 0..8 {
            f.services.members.purchase_shares(member.id, 10).await.unwrap();
        }
        assert!(matches!(
            domain_err(f.services.members.purchase_shares(member.id, 8).await),
            DomainError::InvalidArgument(_)
        ));
        let full = f.services.members.purchase_shares(member.id, 7).await.unwrap();
        assert_eq!(full.share_count(), 100);
        assert_eq!(full.shares[99].certificate_number, "SH-EMP-1-100");
    }

    #[tokio::test]
    async fn test_purchase_shares_inactive_member() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Contract).await;
        f.services.members.deactivate(member.id, None).await.unwrap();

        assert!(matches!(
            domain_err(f.services.members.purchase_shares(member.id, 1).await),
            DomainError::InvalidState(_)
        ));
    }

    #[tokio::test]
    async fn test_deactivate_then_reactivate() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;

        let inactive = f
            .services
            .members
            .deactivate(member.id, Some("Transferred".into()))
            .await
            .unwrap();
        assert!(!inactive.is_active);
        assert_eq!(inactive.deactivation_date, Some(start_date()));
        assert_eq!(inactive.deactivation_reason.as_deref(), Some("Transferred"));
        assert!(!f.services.members.check_eligibility(member.id).await.unwrap());

        // deactivating twice is fine
        f.services.members.deactivate(member.id, None).await.unwrap();

        let active = f.services.members.reactivate(member.id).await.unwrap();
        assert!(active.is_active);
        assert!(active.deactivation_date.is_none());
        assert!(active.deactivation_reason.is_none());
    }

    #[tokio::test]
    async fn test_total_share_value_and_counts() {
        let f = fixture();
        let a = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        let b = register(&f.services, "EMP-2", WorkDomain::Academic).await;
        f.services.members.purchase_shares(a.id, 2).await.unwrap();
        f.services.members.deactivate(b.id, None).await.unwrap();

        assert_eq!(f.services.members.total_share_value(a.id).await.unwrap(), dec!(750));
        let counts = f.services.members.counts().await.unwrap();
        assert_eq!((counts.active, counts.inactive, counts.total), (1, 1, 2));
    }

    #[tokio::test]
    async fn test_search_list_and_domain() {
        let f = fixture();
        let a = register(&f.services, "ACD-1", WorkDomain::Academic).await;
        let b = register(&f.services, "ADM-1", WorkDomain::Administration).await;
        f.services
            .members
            .update_profile(
                b.id,
                MemberChanges {
                    first_name: Some("Yonas".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        f.services.members.deactivate(a.id, None).await.unwrap();

        let found = f.services.members.search(Some("yon")).await.unwrap();
        assert_eq!(found.iter().map(|m| m.id).collect::<Vec<_>>(), vec![b.id]);

        // inactive members still match a keyword
        assert_eq!(f.services.members.search(Some("acd")).await.unwrap().len(), 1);
        // blank keyword lists active members only
        assert_eq!(f.services.members.search(Some("  ")).await.unwrap().len(), 1);

        assert_eq!(f.services.members.list(false).await.unwrap().len(), 2);
        assert_eq!(f.services.members.list(true).await.unwrap().len(), 1);
        let inactive = f.services.members.by_status(false).await.unwrap();
        assert_eq!(inactive.iter().map(|m| m.id).collect::<Vec<_>>(), vec![a.id]);
        assert_eq!(
            f.services.members.by_domain(WorkDomain::Academic).await.unwrap()[0].id,
            a.id
        );
        assert_eq!(
            f.services.members.find_by_employee_id("ADM-1").await.unwrap().first_name,
            "Yonas"
        );
    }

    #[tokio::test]
    async fn test_register_rejects_text_wider_than_its_column() {
        let f = fixture();
        let long_id = "E".repeat(200);
        let result = f
            .services
            .members
            .register(RegisterMemberCommand::new(long_id, "Tigist", "Alemu", WorkDomain::Other))
            .await;
        assert!(matches!(domain_err(result), DomainError::InvalidArgument(_)));
        assert_eq!(f.services.members.counts().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_unknown_member() {
        let f = fixture();
        assert!(matches!(
            domain_err(f.services.members.get(404).await),
            DomainError::NotFound { entity: "Member", .. }
        ));
        assert!(matches!(
            domain_err(f.services.members.reactivate(404).await),
            DomainError::NotFound { .. }
        ));
    }

    // =========================================================================
    // Account Registry
    // =========================================================================

    #[tokio::test]
    async fn test_open_formal_account() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;

        let account = f
            .services
            .accounts
            .open_formal(member.id, dec!(200))
            .await
            .unwrap();
        assert!(account.account_number.starts_with("FORMAL-"));
        assert_eq!(account.kind(), AccountKind::Formal);
        assert_eq!(account.balance(), Decimal::ZERO);
        assert_eq!(account.opening_date, start_date());
        assert!(account.is_active);
    }

    #[tokio::test]
    async fn test_open_formal_rules() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;

        assert!(matches!(
            domain_err(f.services.accounts.open_formal(member.id, dec!(99)).await),
            DomainError::InvalidArgument(_)
        ));
        assert!(matches!(
            domain_err(f.services.accounts.open_formal(999, dec!(200)).await),
            DomainError::NotFound { .. }
        ));

        // sub-cent monthly amounts could never be matched by a deposit
        assert!(matches!(
            domain_err(f.services.accounts.open_formal(member.id, dec!(100.005)).await),
            DomainError::InvalidArgument(_)
        ));
        assert!(matches!(
            domain_err(f.services.accounts.open_informal(member.id, Some(dec!(0.001))).await),
            DomainError::InvalidArgument(_)
        ));

        let account = f.services.accounts.open_formal(member.id, dec!(200)).await.unwrap();
        f.services.accounts.close(account.id).await.unwrap();

        // a closed formal account still blocks a new one
        assert!(matches!(
            domain_err(f.services.accounts.open_formal(member.id, dec!(300)).await),
            DomainError::AlreadyExists(_)
        ));
    }

    #[tokio::test]
    async fn test_ineligible_member_cannot_open() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        f.services.members.deactivate(member.id, None).await.unwrap();

        assert!(matches!(
            domain_err(f.services.accounts.open_informal(member.id, None).await),
            DomainError::Ineligible { .. }
        ));
        assert!(matches!(
            domain_err(f.services.accounts.open_formal(member.id, dec!(100)).await),
            DomainError::Ineligible { .. }
        ));
    }

    #[tokio::test]
    async fn test_informal_account_limit() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;

        let first = f.services.accounts.open_informal(member.id, Some(dec!(5000))).await.unwrap();
        let second = f.services.accounts.open_informal(member.id, None).await.unwrap();
        assert_ne!(first.account_number, second.account_number);
        assert!(second.account_number.starts_with("INFORMAL-"));

        assert!(matches!(
            domain_err(f.services.accounts.open_informal(member.id, None).await),
            DomainError::LimitExceeded(_)
        ));

        // only active informal accounts count
        f.services.accounts.close(first.id).await.unwrap();
        f.services.accounts.open_informal(member.id, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_requires_exact_zero() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        let account = informal_with(&f.services, member.id, dec!(60.01)).await;
        f.services.ledger.withdraw(account.id, dec!(60), None).await.unwrap();

        assert_eq!(f.services.accounts.get(account.id).await.unwrap().balance(), dec!(0.01));
        assert!(matches!(
            domain_err(f.services.accounts.close(account.id).await),
            DomainError::InvalidState(_)
        ));

        let empty = informal_with(&f.services, member.id, Decimal::ZERO).await;
        let closed = f.services.accounts.close(empty.id).await.unwrap();
        assert!(!closed.is_active);
        assert!(!f.services.accounts.get(empty.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_deactivate_and_reactivate_account() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        let account = informal_with(&f.services, member.id, dec!(100)).await;

        f.services.accounts.deactivate(account.id).await.unwrap();
        assert!(matches!(
            domain_err(f.services.ledger.deposit(account.id, dec!(100), None).await),
            DomainError::InvalidState(_)
        ));

        let active = f.services.accounts.reactivate(account.id).await.unwrap();
        assert!(active.is_active);
        assert_eq!(active.balance(), dec!(100));
    }

    #[tokio::test]
    async fn test_member_accounts_and_total_balance() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        let a = informal_with(&f.services, member.id, dec!(100)).await;
        let b = informal_with(&f.services, member.id, dec!(250.50)).await;
        f.services.accounts.deactivate(a.id).await.unwrap();

        assert_eq!(f.services.accounts.member_accounts(member.id).await.unwrap().len(), 2);
        let active = f.services.accounts.active_member_accounts(member.id).await.unwrap();
        assert_eq!(active.iter().map(|a| a.id).collect::<Vec<_>>(), vec![b.id]);
        assert_eq!(
            f.services.accounts.member_total_balance(member.id).await.unwrap(),
            dec!(250.50)
        );
        assert_eq!(
            f.services.accounts.get_by_number(&b.account_number).await.unwrap().id,
            b.id
        );
    }

    #[tokio::test]
    async fn test_list_and_search_accounts() {
        let f = fixture();
        let abebe = f
            .services
            .members
            .register(RegisterMemberCommand::new("EMP-1", "Abebe", "Kebede", WorkDomain::Academic))
            .await
            .unwrap();
        let hana = f
            .services
            .members
            .register(RegisterMemberCommand::new("EMP-2", "Hana", "Girma", WorkDomain::Contract))
            .await
            .unwrap();
        let formal = f.services.accounts.open_formal(abebe.id, dec!(150)).await.unwrap();
        let informal = informal_with(&f.services, hana.id, Decimal::ZERO).await;
        f.services.accounts.deactivate(informal.id).await.unwrap();

        let all = f.services.accounts.list(None).await.unwrap();
        assert_eq!(all.iter().map(|a| a.id).collect::<Vec<_>>(), vec![formal.id, informal.id]);
        assert_eq!(f.services.accounts.list(Some("  ")).await.unwrap().len(), 2);

        // holder full name, any case; inactive accounts included
        let by_name = f.services.accounts.list(Some("HANA gir")).await.unwrap();
        assert_eq!(by_name.iter().map(|a| a.id).collect::<Vec<_>>(), vec![informal.id]);

        let by_number = f.services.accounts.list(Some("formal-")).await.unwrap();
        assert_eq!(by_number.len(), 2);
        let needle = formal.account_number.to_lowercase();
        let exact = f.services.accounts.list(Some(&needle)).await.unwrap();
        assert!(exact.iter().any(|a| a.id == formal.id));
        assert!(exact
            .iter()
            .all(|a| a.account_number.to_lowercase().contains(&needle)));

        assert!(f.services.accounts.list(Some("nobody")).await.unwrap().is_empty());
    }

    // =========================================================================
    // Ledger Engine
    // =========================================================================

    #[tokio::test]
    async fn test_deposit_bounds() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        let account = informal_with(&f.services, member.id, Decimal::ZERO).await;

        assert!(matches!(
            domain_err(f.services.ledger.deposit(account.id, dec!(5), None).await),
            DomainError::InvalidArgument(_)
        ));
        assert!(matches!(
            domain_err(f.services.ledger.deposit(account.id, dec!(50001), None).await),
            DomainError::InvalidArgument(_)
        ));

        let receipt = f.services.ledger.deposit(account.id, dec!(10), None).await.unwrap();
        assert_eq!(receipt.new_balance, dec!(10));
        assert_eq!(receipt.transaction.transaction_type, TransactionType::Deposit);
        assert_eq!(receipt.transaction.description.as_deref(), Some("Deposit"));
    }

    #[tokio::test]
    async fn test_deposit_unknown_account() {
        let f = fixture();
        assert!(matches!(
            domain_err(f.services.ledger.deposit(77, dec!(100), None).await),
            DomainError::NotFound { entity: "Account", .. }
        ));
    }

    #[tokio::test]
    async fn test_formal_deposit_once_per_month() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        let account = f.services.accounts.open_formal(member.id, dec!(200)).await.unwrap();

        f.services.ledger.deposit(account.id, dec!(200.0), None).await.unwrap();
        assert!(matches!(
            domain_err(f.services.ledger.deposit(account.id, dec!(200.0), None).await),
            DomainError::InvalidState(_)
        ));

        f.clock.advance(Duration::days(20));
        let receipt = f.services.ledger.deposit(account.id, dec!(200), None).await.unwrap();
        assert_eq!(receipt.new_balance, dec!(400));
    }

    #[tokio::test]
    async fn test_formal_deposit_must_match_monthly_amount() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        let account = f.services.accounts.open_formal(member.id, dec!(200)).await.unwrap();

        assert!(matches!(
            domain_err(f.services.ledger.deposit(account.id, dec!(250), None).await),
            DomainError::InvalidArgument(_)
        ));
        // the rejected attempt does not use up the month
        f.services.ledger.deposit(account.id, dec!(199.99), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_monthly_deposit() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        let formal = f.services.accounts.open_formal(member.id, dec!(350)).await.unwrap();
        let informal = informal_with(&f.services, member.id, Decimal::ZERO).await;

        let receipt = f.services.ledger.monthly_deposit(formal.id, None).await.unwrap();
        assert_eq!(receipt.transaction.amount.value(), dec!(350));
        assert_eq!(receipt.transaction.description.as_deref(), Some("Monthly deposit"));

        assert!(matches!(
            domain_err(f.services.ledger.monthly_deposit(informal.id, None).await),
            DomainError::InvalidState(_)
        ));
    }

    #[tokio::test]
    async fn test_formal_withdrawal_always_fails() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        let account = f.services.accounts.open_formal(member.id, dec!(5000)).await.unwrap();
        f.services.ledger.deposit(account.id, dec!(5000), None).await.unwrap();

        assert!(matches!(
            domain_err(f.services.ledger.withdraw(account.id, dec!(100), None).await),
            DomainError::InvalidState(_)
        ));
    }

    #[tokio::test]
    async fn test_withdrawal_minimum_and_funds() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        let account = informal_with(&f.services, member.id, dec!(100)).await;

        assert!(matches!(
            domain_err(f.services.ledger.withdraw(account.id, dec!(49.99), None).await),
            DomainError::InvalidArgument(_)
        ));
        assert!(matches!(
            domain_err(f.services.ledger.withdraw(account.id, dec!(150), None).await),
            DomainError::InsufficientFunds { .. }
        ));

        let receipt = f
            .services
            .ledger
            .withdraw(account.id, dec!(100), Some("Cash"))
            .await
            .unwrap();
        assert_eq!(receipt.new_balance, Decimal::ZERO);
        assert_eq!(receipt.transaction.transaction_type, TransactionType::Withdrawal);
        assert_eq!(receipt.transaction.description.as_deref(), Some("Cash"));
    }

    #[tokio::test]
    async fn test_daily_withdrawal_limit() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        let account = informal_with(&f.services, member.id, dec!(30000)).await;

        f.services.ledger.withdraw(account.id, dec!(6000), None).await.unwrap();
        assert!(matches!(
            domain_err(f.services.ledger.withdraw(account.id, dec!(5000), None).await),
            DomainError::LimitExceeded(_)
        ));
        assert_eq!(f.services.ledger.withdrawn_today(account.id).await.unwrap(), dec!(6000));

        // the cap resets with the calendar day
        f.clock.advance(Duration::days(1));
        f.services.ledger.withdraw(account.id, dec!(5000), None).await.unwrap();
        assert_eq!(f.services.accounts.get(account.id).await.unwrap().balance(), dec!(19000));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_withdrawals_respect_daily_limit() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        let account_id = informal_with(&f.services, member.id, dec!(40000)).await.id;

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let services = f.services.clone();
                tokio::spawn(
                    async move { services.ledger.withdraw(account_id, dec!(4000), None).await },
                )
            })
            .collect();

        let mut succeeded = 0;
        let mut limited = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(AppError::Domain(DomainError::LimitExceeded(_))) => limited += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!((succeeded, limited), (2, 2));
        assert_eq!(f.services.accounts.get(account_id).await.unwrap().balance(), dec!(32000));
    }

    #[tokio::test]
    async fn test_every_posting_has_unique_reference_and_exact_balance() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        let account = informal_with(&f.services, member.id, Decimal::ZERO).await;

        let mut expected = Decimal::ZERO;
        let mut references = HashSet::new();
        for i in 0..20 {
            let before = f.services.accounts.get(account.id).await.unwrap().balance();
            let receipt = if i % 3 == 2 {
                expected -= dec!(50.10);
                f.services.ledger.withdraw(account.id, dec!(50.10), None).await.unwrap()
            } else {
                expected += dec!(33.33);
                f.services.ledger.deposit(account.id, dec!(33.33), None).await.unwrap()
            };

            let delta = receipt.transaction.amount.value();
            let signed = if receipt.transaction.transaction_type.is_credit() {
                delta
            } else {
                -delta
            };
            assert_eq!(receipt.new_balance, before + signed);
            assert!(references.insert(receipt.transaction.reference_number.clone()));
        }

        assert_eq!(f.services.accounts.get(account.id).await.unwrap().balance(), expected);
        let ledger = f.services.ledger.transactions(account.id).await.unwrap();
        assert_eq!(ledger.len(), 20);
        // newest first
        assert!(ledger.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[tokio::test]
    async fn test_ledger_queries() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        let account = informal_with(&f.services, member.id, dec!(1000)).await;
        f.clock.advance(Duration::days(1));
        f.services.ledger.deposit(account.id, dec!(500), None).await.unwrap();
        let receipt = f.services.ledger.withdraw(account.id, dec!(300), None).await.unwrap();

        assert_eq!(f.services.ledger.deposited_this_month(account.id).await.unwrap(), dec!(1500));
        assert_eq!(f.services.ledger.withdrawn_today(account.id).await.unwrap(), dec!(300));

        let found = f
            .services
            .ledger
            .find_by_reference(&receipt.transaction.reference_number)
            .await
            .unwrap();
        assert_eq!(found, receipt.transaction);
        assert!(matches!(
            domain_err(f.services.ledger.find_by_reference("TXN00000000").await),
            DomainError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_description_too_long() {
        let f = fixture();
        let member = register(&f.services, "EMP-1", WorkDomain::Academic).await;
        let account = informal_with(&f.services, member.id, Decimal::ZERO).await;

        let long = "x".repeat(256);
        assert!(matches!(
            domain_err(f.services.ledger.deposit(account.id, dec!(100), Some(&long)).await),
            DomainError::InvalidArgument(_)
        ));
        assert!(f.services.ledger.transactions(account.id).await.unwrap().is_empty());
    }

    // =========================================================================
    // Bulk Deposit Coordinator
    // =========================================================================

    #[tokio::test]
    async fn test_bulk_deposit_partial_failure() {
        let f = fixture();
        let s = &f.services;
        let a = register(s, "ACD-1", WorkDomain::Academic).await;
        register(s, "ACD-2", WorkDomain::Academic).await;
        let c = register(s, "ACD-3", WorkDomain::Academic).await;
        let gone = register(s, "ACD-4", WorkDomain::Academic).await;
        let other = register(s, "ADM-1", WorkDomain::Administration).await;

        informal_with(s, a.id, Decimal::ZERO).await;
        informal_with(s, c.id, Decimal::ZERO).await;
        informal_with(s, gone.id, Decimal::ZERO).await;
        informal_with(s, other.id, Decimal::ZERO).await;
        s.members.deactivate(gone.id, None).await.unwrap();

        let result = s
            .bulk
            .bulk_deposit_by_domain(BulkDepositCommand::new("academic", dec!(500)))
            .await
            .unwrap();

        assert_eq!(result.total_members, 3);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.total_amount, dec!(1000));
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("ACD-2: "));
        assert_eq!(
            result.details.iter().map(|d| d.employee_id.as_str()).collect::<Vec<_>>(),
            vec!["ACD-1", "ACD-3"]
        );
        assert!(result
            .details
            .iter()
            .all(|d| d.amount == dec!(500) && d.new_balance == dec!(500)));

        let untouched = s.accounts.active_member_accounts(other.id).await.unwrap();
        assert_eq!(untouched[0].balance(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_bulk_deposit_uses_oldest_active_account() {
        let f = fixture();
        let s = &f.services;
        let member = register(s, "CON-1", WorkDomain::Contract).await;
        let first = informal_with(s, member.id, Decimal::ZERO).await;
        f.clock.advance(Duration::days(2));
        let second = informal_with(s, member.id, Decimal::ZERO).await;

        let command = BulkDepositCommand::new("CONTRACT", dec!(100)).with_description("Bonus");
        s.bulk.bulk_deposit_by_domain(command.clone()).await.unwrap();
        assert_eq!(s.accounts.get(first.id).await.unwrap().balance(), dec!(100));

        s.accounts.deactivate(first.id).await.unwrap();
        s.bulk.bulk_deposit_by_domain(command).await.unwrap();
        let second = s.accounts.get(second.id).await.unwrap();
        assert_eq!(second.balance(), dec!(100));

        let tx = &s.ledger.transactions(second.id).await.unwrap()[0];
        assert_eq!(tx.description.as_deref(), Some("Bonus"));
    }

    #[tokio::test]
    async fn test_bulk_deposit_rule_failures_are_collected() {
        let f = fixture();
        let s = &f.services;
        let member = register(s, "OTH-1", WorkDomain::Other).await;
        s.accounts.open_formal(member.id, dec!(200)).await.unwrap();

        // amount differs from the monthly amount
        let result = s
            .bulk
            .bulk_deposit_by_domain(BulkDepositCommand::new("OTHER", dec!(300)))
            .await
            .unwrap();
        assert_eq!(result.success_count, 0);
        assert_eq!(result.failure_count, 1);
        assert!(result.errors[0].starts_with("OTH-1: "));
        assert_eq!(result.total_amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_bulk_deposit_invalid_input() {
        let f = fixture();
        assert!(matches!(
            domain_err(
                f.services
                    .bulk
                    .bulk_deposit_by_domain(BulkDepositCommand::new("FARMING", dec!(100)))
                    .await
            ),
            DomainError::InvalidArgument(_)
        ));
        assert!(matches!(
            domain_err(
                f.services
                    .bulk
                    .bulk_deposit_by_domain(BulkDepositCommand::new("ACADEMIC", Decimal::ZERO))
                    .await
            ),
            DomainError::InvalidArgument(_)
        ));
    }

    #[tokio::test]
    async fn test_bulk_deposit_empty_domain() {
        let f = fixture();
        let result = f
            .services
            .bulk
            .bulk_deposit_by_domain(BulkDepositCommand::new("ADMINISTRATION", dec!(100)))
            .await
            .unwrap();
        assert_eq!(result.total_members, 0);
        assert!(result.details.is_empty() && result.errors.is_empty());
    }
}
