mod common;

use anyhow::Result;
use common::{Fixture, ScriptedIds, test_service};
use ledgerbank::application::{AppError, ErrorKind, MAX_ACCOUNT_ID_ATTEMPTS};
use ledgerbank::domain::{ACCOUNT_ID_SPACE, AccountStatus, parse_cents};

#[tokio::test]
async fn test_full_account_lifecycle() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let alice = service.customers().create_customer("Alice").await?;
    let account = service.create_account("Savings", alice.id).await?;
    assert_eq!(account.customer_id, alice.id);

    let account = service.deposit(account.id, parse_cents("100")?).await?;
    assert_eq!(account.balance_cents, 10000);

    let account = service.withdraw(account.id, parse_cents("30")?).await?;
    assert_eq!(account.balance_cents, 7000);

    let err = service
        .withdraw(account.id, parse_cents("1000")?)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientFunds { .. }));
    assert_eq!(service.get_account_by_id(account.id).await?.balance_cents, 7000);

    let closed = service.close_account(account.id).await?;
    assert_eq!(closed.status.as_str(), "Closed");
    assert_eq!(closed.balance_cents, 7000);

    Ok(())
}

#[tokio::test]
async fn test_new_account_is_active_and_empty() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (alice, account) = Fixture::alice_savings(&service).await?;

    assert_eq!(account.status, AccountStatus::Active);
    assert_eq!(account.balance_cents, 0);
    assert_eq!(account.account_type, "Savings");
    assert!((0..ACCOUNT_ID_SPACE).contains(&account.id));

    let stored = service.get_account_by_id(account.id).await?;
    assert_eq!(stored.customer_id, alice.id);
    assert_eq!(stored.status, AccountStatus::Active);
    Ok(())
}

#[tokio::test]
async fn test_get_account_is_stable_across_reads() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_, account) = Fixture::funded(&service, 2500).await?;

    let first = service.get_account_by_id(account.id).await?;
    let second = service.get_account_by_id(account.id).await?;
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn test_unknown_account_is_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.get_account_by_id(424242).await.unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(424242)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("424242"));

    for result in [
        service.deposit(424242, 100).await,
        service.withdraw(424242, 100).await,
        service.close_account(424242).await,
    ] {
        assert!(matches!(result, Err(AppError::AccountNotFound(424242))));
    }
    Ok(())
}

#[tokio::test]
async fn test_account_for_unknown_customer_is_not_persisted() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.create_account("Savings", 99).await.unwrap_err();
    assert!(matches!(err, AppError::CustomerNotFound(99)));
    assert_eq!(err.kind().status_code(), 404);
    assert_eq!(service.repository().count_accounts().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_blank_account_type_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let alice = service.customers().create_customer("Alice").await?;

    let err = service.create_account("   ", alice.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidAccountType(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(service.repository().count_accounts().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_overdraw_never_mutates_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_, account) = Fixture::funded(&service, 5000).await?;

    for amount in [5001, 10000, i64::MAX] {
        let err = service.withdraw(account.id, amount).await.unwrap_err();
        match err {
            AppError::InsufficientFunds {
                account_id,
                balance,
                required,
            } => {
                assert_eq!(account_id, account.id);
                assert_eq!(balance, 5000);
                assert_eq!(required, amount);
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
        assert_eq!(service.get_account_by_id(account.id).await?.balance_cents, 5000);
    }

    // Draining to exactly zero is allowed
    let account = service.withdraw(account.id, 5000).await?;
    assert_eq!(account.balance_cents, 0);
    Ok(())
}

#[tokio::test]
async fn test_balance_stays_non_negative_over_mixed_operations() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_, account) = Fixture::alice_savings(&service).await?;

    let operations: [(bool, i64); 10] = [
        (true, 1000),
        (false, 400),
        (false, 700),
        (true, 50),
        (false, 650),
        (false, 1),
        (true, 999),
        (false, 999),
        (false, 1),
        (true, 1),
    ];

    let mut expected = 0i64;
    for (is_deposit, amount) in operations {
        let result = if is_deposit {
            service.deposit(account.id, amount).await
        } else {
            service.withdraw(account.id, amount).await
        };

        match result {
            Ok(updated) => {
                expected = if is_deposit { expected + amount } else { expected - amount };
                assert_eq!(updated.balance_cents, expected);
            }
            Err(AppError::InsufficientFunds { .. }) => assert!(!is_deposit && amount > expected),
            Err(other) => return Err(other.into()),
        }

        let stored = service.get_account_by_id(account.id).await?;
        assert!(stored.balance_cents >= 0);
        assert_eq!(stored.balance_cents, expected);
    }

    assert_eq!(expected, 1);
    Ok(())
}

#[tokio::test]
async fn test_non_positive_amounts_are_invalid_input() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_, account) = Fixture::funded(&service, 1000).await?;

    for amount in [0, -1, -5000] {
        let err = service.deposit(account.id, amount).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidAmount(_)));
        assert_eq!(err.kind().status_code(), 400);

        let err = service.withdraw(account.id, amount).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidAmount(_)));
    }

    assert_eq!(service.get_account_by_id(account.id).await?.balance_cents, 1000);
    Ok(())
}

#[tokio::test]
async fn test_deposit_overflow_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_, account) = Fixture::funded(&service, i64::MAX).await?;

    let err = service.deposit(account.id, 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(
        service.get_account_by_id(account.id).await?.balance_cents,
        i64::MAX
    );
    Ok(())
}

#[tokio::test]
async fn test_repeated_deposits_are_not_deduplicated() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_, account) = Fixture::alice_savings(&service).await?;

    service.deposit(account.id, 2500).await?;
    let account = service.deposit(account.id, 2500).await?;
    assert_eq!(account.balance_cents, 5000);
    Ok(())
}

#[tokio::test]
async fn test_close_twice_is_idempotent() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_, account) = Fixture::funded(&service, 1200).await?;

    let first = service.close_account(account.id).await?;
    assert_eq!(first.status, AccountStatus::Closed);
    assert!(first.closed_at.is_some());

    let second = service.close_account(account.id).await?;
    assert_eq!(second.status, AccountStatus::Closed);
    assert_eq!(second.closed_at, first.closed_at);
    assert_eq!(second.balance_cents, 1200);
    Ok(())
}

#[tokio::test]
async fn test_closed_account_rejects_mutations() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_, account) = Fixture::funded(&service, 1200).await?;
    service.close_account(account.id).await?;

    let err = service.deposit(account.id, 100).await.unwrap_err();
    assert!(matches!(err, AppError::AccountClosed(id) if id == account.id));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = service.withdraw(account.id, 100).await.unwrap_err();
    assert!(matches!(err, AppError::AccountClosed(_)));

    let stored = service.get_account_by_id(account.id).await?;
    assert_eq!(stored.balance_cents, 1200);
    assert_eq!(stored.status, AccountStatus::Closed);
    Ok(())
}

#[tokio::test]
async fn test_account_id_collision_draws_again() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = service.with_id_source(ScriptedIds::new([1111, 1111, 1111, 2222]));
    let alice = service.customers().create_customer("Alice").await?;

    let first = service.create_account("Savings", alice.id).await?;
    assert_eq!(first.id, 1111);
    let first = service.deposit(first.id, 300).await?;

    let second = service.create_account("Checking", alice.id).await?;
    assert_eq!(second.id, 2222);

    // The original account was not overwritten
    let stored = service.get_account_by_id(1111).await?;
    assert_eq!(stored.account_type, "Savings");
    assert_eq!(stored.balance_cents, first.balance_cents);
    Ok(())
}

#[tokio::test]
async fn test_account_id_exhaustion_is_internal_error() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = service.with_id_source(ScriptedIds::new([5]));
    let alice = service.customers().create_customer("Alice").await?;

    service.create_account("Savings", alice.id).await?;
    let err = service.create_account("Savings", alice.id).await.unwrap_err();
    assert!(matches!(err, AppError::AccountIdExhausted(n) if n == MAX_ACCOUNT_ID_ATTEMPTS));
    assert_eq!(err.kind().status_code(), 500);
    assert_eq!(service.repository().count_accounts().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_list_customer_accounts() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = service.with_id_source(ScriptedIds::new([10, 20, 30]));

    let alice = service.customers().create_customer("Alice").await?;
    let bob = service.customers().create_customer("Bob").await?;
    service.create_account("Savings", alice.id).await?;
    service.create_account("Checking", bob.id).await?;
    service.create_account("Checking", alice.id).await?;

    let accounts = service.list_customer_accounts(alice.id).await?;
    let ids: Vec<_> = accounts.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![10, 30]);
    assert!(accounts.iter().all(|a| a.customer_id == alice.id));

    let err = service.list_customer_accounts(999).await.unwrap_err();
    assert!(matches!(err, AppError::CustomerNotFound(999)));
    Ok(())
}

#[tokio::test]
async fn test_state_survives_reconnect() -> Result<()> {
    let temp_dir = tempfile::TempDir::new()?;
    let db_path = temp_dir.path().join("bank.db");
    let db_path = db_path.to_str().unwrap();

    let account_id = {
        let service = ledgerbank::application::LedgerService::init(db_path).await?;
        let (_, account) = Fixture::funded(&service, 4200).await?;
        service.close_account(account.id).await?;
        account.id
    };

    let service = ledgerbank::application::LedgerService::connect(db_path).await?;
    let account = service.get_account_by_id(account_id).await?;
    assert_eq!(account.balance_cents, 4200);
    assert_eq!(account.status, AccountStatus::Closed);
    Ok(())
}
