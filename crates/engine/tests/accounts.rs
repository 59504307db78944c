mod common;

use engine::EngineError;
use uuid::Uuid;

use common::{engine_with_db, user};

#[tokio::test]
async fn accounts_are_per_user_and_ordered() {
    let (engine, _db) = engine_with_db().await;
    let a = user(&engine, "Ann").await;
    let b = user(&engine, "Bob").await;

    engine.new_account(a.id, "Savings", 0).await.unwrap();
    let checking = engine.new_account(a.id, " Checking ", 1_234).await.unwrap();
    assert_eq!(checking.name, "Checking");
    assert_eq!(checking.balance_minor, 1234);
    // same name for another user is fine
    engine.new_account(b.id, "Checking", 0).await.unwrap();

    let names: Vec<_> = engine
        .accounts_for_user(a.id)
        .await
        .unwrap()
        .into_iter()
        .map(|acc| acc.name)
        .collect();
    assert_eq!(names, ["Checking", "Savings"]);

    let loaded = engine.account(checking.id, a.id).await.unwrap();
    assert_eq!(loaded.id, checking.id);
    assert_eq!(loaded.balance_minor, 1234);
    let err = engine.account(checking.id, b.id).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("account not exists".to_string()));
}

#[tokio::test]
async fn new_account_checks() {
    let (engine, _db) = engine_with_db().await;
    let a = user(&engine, "Ann").await;
    engine.new_account(a.id, "Cash", 100).await.unwrap();

    let err = engine.new_account(a.id, "CASH", 0).await.unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("account already exists".to_string()));

    let err = engine.new_account(a.id, " ", 0).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let err = engine.new_account(a.id, "Debt", -1).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let err = engine.new_account(Uuid::new_v4(), "Cash", 0).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}
