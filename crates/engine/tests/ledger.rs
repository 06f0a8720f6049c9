use std::sync::Arc;

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement, TransactionTrait};

use engine::{
    Account, Counterparty, Engine, EngineError, NewLedgerEntry, ReceivedCoins, SentCoins,
    accounts, inventory, items, ledger,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn migrated(url: &str) -> DatabaseConnection {
    let db = Database::connect(url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO items (name, price) VALUES (?, ?)",
        vec!["sword".into(), 100i64.into()],
    ))
    .await
    .unwrap();
    db
}

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = migrated("sqlite::memory:").await;
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn engine_with_file_db() -> (Engine, DatabaseConnection, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = migrated(&url).await;
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();

    (engine, db, path)
}

async fn account_with(db: &DatabaseConnection, username: &str, balance: i64) -> Account {
    accounts::insert(db, username, balance).await.unwrap()
}

async fn balance(db: &DatabaseConnection, user_id: i64) -> i64 {
    accounts::get_by_id(db, user_id)
        .await
        .unwrap()
        .unwrap()
        .balance
}

async fn sword_id(db: &DatabaseConnection) -> i64 {
    items::find_by_name(db, "sword").await.unwrap().unwrap().id
}

#[tokio::test]
async fn transfer_moves_coins_and_appends_ledger() {
    let (engine, db) = engine_with_db().await;
    let alice = account_with(&db, "alice", 100).await;
    let bob = account_with(&db, "bob", 50).await;

    let entry = engine.transfer(alice.user_id, bob.user_id, 30).await.unwrap();

    assert_eq!(entry.sender_id, alice.user_id);
    assert_eq!(
        entry.receiver,
        Counterparty::Account {
            user_id: bob.user_id
        }
    );
    assert_eq!(entry.amount, 30);

    let alice_after = balance(&db, alice.user_id).await;
    let bob_after = balance(&db, bob.user_id).await;
    assert_eq!(alice_after, 70);
    assert_eq!(bob_after, 80);
    assert_eq!(alice_after + bob_after, alice.balance + bob.balance);

    let entries = ledger::list_by_user(&db, alice.user_id).await.unwrap();
    assert_eq!(entries, vec![entry]);
}

#[tokio::test]
async fn transfer_with_insufficient_balance_changes_nothing() {
    let (engine, db) = engine_with_db().await;
    let alice = account_with(&db, "alice", 10).await;
    let bob = account_with(&db, "bob", 50).await;

    let err = engine
        .transfer(alice.user_id, bob.user_id, 30)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        EngineError::InsufficientBalance {
            needed: 30,
            available: 10
        }
    );
    assert!(!err.is_transient());
    assert_eq!(
        accounts::get_by_id(&db, alice.user_id).await.unwrap(),
        Some(alice.clone())
    );
    assert_eq!(
        accounts::get_by_id(&db, bob.user_id).await.unwrap(),
        Some(bob)
    );
    assert!(ledger::list_by_user(&db, alice.user_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn transfer_whole_balance_leaves_zero() {
    let (engine, db) = engine_with_db().await;
    let alice = account_with(&db, "alice", 30).await;
    let bob = account_with(&db, "bob", 0).await;

    engine.transfer(alice.user_id, bob.user_id, 30).await.unwrap();

    assert_eq!(balance(&db, alice.user_id).await, 0);
    assert_eq!(balance(&db, bob.user_id).await, 30);
}

#[tokio::test]
async fn transfer_to_or_from_unknown_account() {
    let (engine, db) = engine_with_db().await;
    let alice = account_with(&db, "alice", 100).await;

    assert_eq!(
        engine.transfer(alice.user_id, 999, 10).await.unwrap_err(),
        EngineError::AccountNotFound("999".to_string())
    );
    assert_eq!(
        engine.transfer(999, alice.user_id, 10).await.unwrap_err(),
        EngineError::AccountNotFound("999".to_string())
    );
    assert_eq!(balance(&db, alice.user_id).await, 100);
    assert!(ledger::list_by_user(&db, alice.user_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn transfer_validation_happens_before_store_access() {
    let (engine, db) = engine_with_db().await;
    let alice = account_with(&db, "alice", 100).await;

    // Unknown receiver would be AccountNotFound; validation wins.
    assert_eq!(
        engine.transfer(alice.user_id, 999, 0).await.unwrap_err(),
        EngineError::InvalidAmount("amount must be > 0".to_string())
    );
    assert_eq!(
        engine.transfer(alice.user_id, 999, -5).await.unwrap_err(),
        EngineError::InvalidAmount("amount must be > 0".to_string())
    );
    assert_eq!(
        engine
            .transfer(alice.user_id, alice.user_id, 10)
            .await
            .unwrap_err(),
        EngineError::InvalidTransfer("sender and receiver must differ".to_string())
    );
    assert_eq!(balance(&db, alice.user_id).await, 100);
}

#[tokio::test]
async fn transfer_to_username_resolves_receiver() {
    let (engine, db) = engine_with_db().await;
    let alice = account_with(&db, "alice", 100).await;
    let bob = account_with(&db, "bob", 0).await;

    engine
        .transfer_to_username(alice.user_id, " bob ", 40)
        .await
        .unwrap();
    assert_eq!(balance(&db, bob.user_id).await, 40);

    assert_eq!(
        engine
            .transfer_to_username(alice.user_id, "nobody", 1)
            .await
            .unwrap_err(),
        EngineError::AccountNotFound("nobody".to_string())
    );
    assert!(matches!(
        engine
            .transfer_to_username(alice.user_id, "alice", 1)
            .await
            .unwrap_err(),
        EngineError::InvalidTransfer(_)
    ));
    assert_eq!(balance(&db, alice.user_id).await, 60);
}

#[tokio::test]
async fn purchase_debits_balance_and_adds_inventory() {
    let (engine, db) = engine_with_db().await;
    let buyer = account_with(&db, "alice", 150).await;
    let sword = sword_id(&db).await;

    let entry = engine.purchase(buyer.user_id, "sword").await.unwrap();

    assert_eq!(entry.sender_id, buyer.user_id);
    assert_eq!(entry.receiver, Counterparty::Store);
    assert_eq!(entry.amount, 100);
    assert_eq!(balance(&db, buyer.user_id).await, 50);
    assert_eq!(
        inventory::get_quantity(&db, buyer.user_id, sword)
            .await
            .unwrap(),
        Some(1)
    );
    assert_eq!(
        ledger::list_by_user(&db, buyer.user_id).await.unwrap(),
        vec![entry]
    );
}

#[tokio::test]
async fn purchase_of_unknown_item_changes_nothing() {
    let (engine, db) = engine_with_db().await;
    let buyer = account_with(&db, "alice", 150).await;

    let err = engine
        .purchase(buyer.user_id, "unknown_item")
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::ItemNotFound("unknown_item".to_string()));
    assert_eq!(
        accounts::get_by_id(&db, buyer.user_id).await.unwrap(),
        Some(buyer.clone())
    );
    assert!(inventory::list_by_user(&db, buyer.user_id)
        .await
        .unwrap()
        .is_empty());
    assert!(ledger::list_by_user(&db, buyer.user_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn purchase_same_item_twice_increments_one_row() {
    let (engine, db) = engine_with_db().await;
    let buyer = account_with(&db, "alice", 250).await;
    let sword = sword_id(&db).await;

    engine.purchase(buyer.user_id, "sword").await.unwrap();
    engine.purchase(buyer.user_id, "sword").await.unwrap();

    assert_eq!(balance(&db, buyer.user_id).await, 50);
    assert_eq!(
        inventory::get_quantity(&db, buyer.user_id, sword)
            .await
            .unwrap(),
        Some(2)
    );
    let owned = inventory::list_by_user(&db, buyer.user_id).await.unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].0.name, "sword");
    assert_eq!(owned[0].1, 2);

    let entries = ledger::list_by_user(&db, buyer.user_id).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].id < entries[1].id);
    assert!(entries
        .iter()
        .all(|e| e.receiver == Counterparty::Store && e.amount == 100));
}

#[tokio::test]
async fn purchase_with_insufficient_balance_changes_nothing() {
    let (engine, db) = engine_with_db().await;
    let buyer = account_with(&db, "alice", 99).await;
    let sword = sword_id(&db).await;

    assert_eq!(
        engine.purchase(buyer.user_id, "sword").await.unwrap_err(),
        EngineError::InsufficientBalance {
            needed: 100,
            available: 99
        }
    );
    assert_eq!(balance(&db, buyer.user_id).await, 99);
    assert_eq!(
        inventory::get_quantity(&db, buyer.user_id, sword)
            .await
            .unwrap(),
        None
    );
    assert!(ledger::list_by_user(&db, buyer.user_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn purchase_input_validation() {
    let (engine, db) = engine_with_db().await;
    let buyer = account_with(&db, "alice", 500).await;

    assert_eq!(
        engine.purchase(buyer.user_id, "   ").await.unwrap_err(),
        EngineError::InvalidItemName("item name must not be empty".to_string())
    );
    assert_eq!(
        engine.purchase(999, "sword").await.unwrap_err(),
        EngineError::AccountNotFound("999".to_string())
    );
    assert_eq!(balance(&db, buyer.user_id).await, 500);
}

#[tokio::test]
async fn history_lists_transfers_but_not_purchases() {
    let (engine, db) = engine_with_db().await;
    let alice = account_with(&db, "alice", 300).await;
    let bob = account_with(&db, "bob", 100).await;
    let carol = account_with(&db, "carol", 100).await;

    engine.transfer(alice.user_id, bob.user_id, 30).await.unwrap();
    engine.transfer(carol.user_id, alice.user_id, 5).await.unwrap();
    engine.purchase(alice.user_id, "sword").await.unwrap();
    engine.transfer(alice.user_id, carol.user_id, 12).await.unwrap();
    engine.transfer(bob.user_id, carol.user_id, 1).await.unwrap();

    let history = engine.history(alice.user_id).await.unwrap();
    assert_eq!(
        history.sent,
        vec![
            SentCoins {
                to_user: "bob".to_string(),
                amount: 30
            },
            SentCoins {
                to_user: "carol".to_string(),
                amount: 12
            },
        ]
    );
    assert_eq!(
        history.received,
        vec![ReceivedCoins {
            from_user: "carol".to_string(),
            amount: 5
        }]
    );

    // Same answer with no writes in between.
    assert_eq!(engine.history(alice.user_id).await.unwrap(), history);

    let bob_history = engine.history(bob.user_id).await.unwrap();
    assert_eq!(bob_history.received.len(), 1);
    assert_eq!(bob_history.sent.len(), 1);

    assert_eq!(
        engine.history(999).await.unwrap_err(),
        EngineError::AccountNotFound("999".to_string())
    );
}

#[tokio::test]
async fn user_info_reports_balance_inventory_and_history() {
    let (engine, _db) = engine_with_db().await;
    let alice = engine.open_account("alice").await.unwrap();
    let bob = engine.open_account("bob").await.unwrap();

    engine.purchase(alice.user_id, "cup").await.unwrap();
    engine.purchase(alice.user_id, "cup").await.unwrap();
    engine.purchase(alice.user_id, "pen").await.unwrap();
    engine.transfer(bob.user_id, alice.user_id, 25).await.unwrap();

    let info = engine.user_info(alice.user_id).await.unwrap();
    assert_eq!(info.coins, 1000 - 20 - 20 - 10 + 25);
    let inventory: Vec<(&str, i64)> = info
        .inventory
        .iter()
        .map(|item| (item.item_type.as_str(), item.quantity))
        .collect();
    assert_eq!(inventory, vec![("cup", 2), ("pen", 1)]);
    assert!(info.history.sent.is_empty());
    assert_eq!(
        info.history.received,
        vec![ReceivedCoins {
            from_user: "bob".to_string(),
            amount: 25
        }]
    );
}

#[tokio::test]
async fn open_account_grants_starting_coins() {
    let (engine, _db) = engine_with_db().await;

    let alice = engine.open_account("  alice ").await.unwrap();
    assert_eq!(alice.username, "alice");
    assert_eq!(alice.balance, engine.starting_grant());
    assert_eq!(engine.account(alice.user_id).await.unwrap(), alice);
    assert_eq!(engine.account_by_username("alice").await.unwrap(), alice);

    assert_eq!(
        engine.open_account("alice").await.unwrap_err(),
        EngineError::ExistingAccount("alice".to_string())
    );
    assert_eq!(
        engine.open_account(" ").await.unwrap_err(),
        EngineError::InvalidUsername("username must not be empty".to_string())
    );
}

#[tokio::test]
async fn custom_starting_grant() {
    let db = migrated("sqlite::memory:").await;
    let engine = Engine::builder()
        .database(db)
        .starting_grant(250)
        .build()
        .await
        .unwrap();

    let alice = engine.open_account("alice").await.unwrap();
    assert_eq!(alice.balance, 250);
}

#[tokio::test]
async fn catalog_is_seeded_and_sorted() {
    let (engine, _db) = engine_with_db().await;

    let catalog = engine.catalog().await.unwrap();
    assert_eq!(catalog.len(), migration::CATALOG.len() + 1);
    assert!(catalog.windows(2).all(|w| w[0].name < w[1].name));
    assert!(catalog.iter().all(|item| item.price > 0));
    let cup = catalog.iter().find(|item| item.name == "cup").unwrap();
    assert_eq!(cup.price, 20);
}

#[tokio::test]
async fn stale_version_is_a_conflict() {
    let (_engine, db) = engine_with_db().await;
    let alice = account_with(&db, "alice", 100).await;

    let updated = accounts::apply_delta(&db, &alice, -10).await.unwrap();
    assert_eq!(updated.balance, 90);
    assert_eq!(updated.version, alice.version + 1);

    // `alice` still carries the old version.
    let err = accounts::apply_delta(&db, &alice, -10).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
    assert!(err.is_transient());
    assert_eq!(
        accounts::get_by_id(&db, alice.user_id).await.unwrap(),
        Some(updated)
    );
}

#[tokio::test]
async fn dropped_unit_of_work_leaves_no_trace() {
    let (_engine, db) = engine_with_db().await;
    let alice = account_with(&db, "alice", 100).await;
    let bob = account_with(&db, "bob", 50).await;

    {
        let db_tx = db.begin().await.unwrap();
        accounts::apply_delta(&db_tx, &alice, -30).await.unwrap();
        accounts::apply_delta(&db_tx, &bob, 30).await.unwrap();
        ledger::append(
            &db_tx,
            NewLedgerEntry::new(
                alice.user_id,
                Counterparty::Account {
                    user_id: bob.user_id,
                },
                30,
            )
            .unwrap(),
        )
        .await
        .unwrap();
        // Dropped without commit, as when the caller times out.
    }

    assert_eq!(
        accounts::get_by_id(&db, alice.user_id).await.unwrap(),
        Some(alice.clone())
    );
    assert_eq!(
        accounts::get_by_id(&db, bob.user_id).await.unwrap(),
        Some(bob)
    );
    assert!(ledger::list_by_user(&db, alice.user_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfers_never_overdraw() {
    let (engine, db, path) = engine_with_file_db().await;
    let alice = account_with(&db, "alice", 100).await;
    let bob = account_with(&db, "bob", 50).await;
    let engine = Arc::new(engine);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..6 {
        let engine = Arc::clone(&engine);
        let (from, to) = (alice.user_id, bob.user_id);
        tasks.spawn(async move { engine.transfer(from, to, 30).await });
    }

    let mut committed = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(_) => committed += 1,
            Err(err) => assert!(
                err.is_transient() || matches!(err, EngineError::InsufficientBalance { .. }),
                "unexpected error: {err}"
            ),
        }
    }

    assert!(committed <= 3);
    let alice_after = balance(&db, alice.user_id).await;
    let bob_after = balance(&db, bob.user_id).await;
    assert!(alice_after >= 0);
    assert_eq!(alice_after, 100 - 30 * committed);
    assert_eq!(bob_after, 50 + 30 * committed);
    assert_eq!(
        ledger::list_by_user(&db, alice.user_id)
            .await
            .unwrap()
            .len() as i64,
        committed
    );

    drop(engine);
    drop(db);
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn state_survives_reconnect() {
    let (engine, db, path) = engine_with_file_db().await;
    let alice = engine.open_account("alice").await.unwrap();
    let bob = engine.open_account("bob").await.unwrap();
    engine.transfer(alice.user_id, bob.user_id, 100).await.unwrap();
    engine.purchase(bob.user_id, "hoody").await.unwrap();

    drop(engine);
    drop(db);

    let url = format!("sqlite:{}?mode=rwc", path.display());
    let db2 = Database::connect(&url).await.unwrap();
    let engine2 = Engine::builder().database(db2.clone()).build().await.unwrap();

    let info = engine2.user_info(bob.user_id).await.unwrap();
    assert_eq!(info.coins, 1000 + 100 - 300);
    assert_eq!(info.inventory.len(), 1);
    assert_eq!(info.inventory[0].item_type, "hoody");
    assert_eq!(info.history.received.len(), 1);

    drop(engine2);
    drop(db2);
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn failure_after_staged_writes_rolls_everything_back() {
    let (engine, db) = engine_with_db().await;
    let alice = account_with(&db, "alice", 500).await;
    let bob = account_with(&db, "bob", 50).await;
    let sword = sword_id(&db).await;

    // Balances and inventory are written before the ledger append fails.
    db.execute_unprepared(
        "CREATE TRIGGER ledger_unavailable BEFORE INSERT ON ledger \
         BEGIN SELECT RAISE(ABORT, 'ledger unavailable'); END;",
    )
    .await
    .unwrap();

    let err = engine
        .transfer(alice.user_id, bob.user_id, 30)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Database(_)));
    assert!(err.is_transient());

    let err = engine.purchase(alice.user_id, "sword").await.unwrap_err();
    assert!(matches!(err, EngineError::Database(_)));
    assert!(err.is_transient());

    assert_eq!(
        accounts::get_by_id(&db, alice.user_id).await.unwrap(),
        Some(alice.clone())
    );
    assert_eq!(
        accounts::get_by_id(&db, bob.user_id).await.unwrap(),
        Some(bob)
    );
    assert_eq!(
        inventory::get_quantity(&db, alice.user_id, sword)
            .await
            .unwrap(),
        None
    );
    assert!(ledger::list_by_user(&db, alice.user_id)
        .await
        .unwrap()
        .is_empty());

    db.execute_unprepared("DROP TRIGGER ledger_unavailable;")
        .await
        .unwrap();
    engine.purchase(alice.user_id, "sword").await.unwrap();
    assert_eq!(balance(&db, alice.user_id).await, 400);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_purchases_of_one_item_count_every_commit() {
    let (engine, db, path) = engine_with_file_db().await;
    let buyer = account_with(&db, "alice", 1000).await;
    let cup = items::find_by_name(&db, "cup").await.unwrap().unwrap();
    let engine = Arc::new(engine);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        let user_id = buyer.user_id;
        tasks.spawn(async move { engine.purchase(user_id, "cup").await });
    }

    let mut committed = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(_) => committed += 1,
            Err(err) => assert!(err.is_transient(), "unexpected error: {err}"),
        }
    }

    let quantity = inventory::get_quantity(&db, buyer.user_id, cup.id)
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(quantity, committed);
    assert_eq!(
        balance(&db, buyer.user_id).await,
        1000 - cup.price * committed
    );
    assert_eq!(
        ledger::list_by_user(&db, buyer.user_id)
            .await
            .unwrap()
            .len() as i64,
        committed
    );

    drop(engine);
    drop(db);
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn duplicate_username_on_insert_is_existing_account() {
    let (_engine, db) = engine_with_db().await;
    account_with(&db, "alice", 100).await;

    // Bypasses the lookup in `open_account`, as a racing registration would.
    let err = accounts::insert(&db, "alice", 100).await.unwrap_err();
    assert_eq!(err, EngineError::ExistingAccount("alice".to_string()));
    assert!(!err.is_transient());
}
