use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::Database;

use engine::{
    Card, Engine, EngineError, EntryOutcome, FailurePolicy, IntervalType, NewCardCmd, NewUserCmd,
    RecurringTransaction, RecurringTransactionCmd, SchedulerOptions, TransferCmd, User,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db(options: SchedulerOptions) -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder()
        .database(db)
        .scheduler(options)
        .build()
        .await
        .unwrap()
}

async fn funded_user(engine: &Engine, email: &str, balance_minor: i64) -> (User, Card) {
    let user = engine.new_user(NewUserCmd::new(email, email)).await.unwrap();
    engine.open_wallet(user.id, balance_minor).await.unwrap();
    let card = engine
        .new_card(NewCardCmd::new(
            user.id,
            "5500000000000004",
            email,
            NaiveDate::from_ymd_opt(2031, 6, 30).unwrap(),
        ))
        .await
        .unwrap();
    (user, card)
}

async fn balance(engine: &Engine, user: &User) -> i64 {
    engine.wallet_of(user.id).await.unwrap().balance
}

fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

async fn schedule(
    engine: &Engine,
    sender: &(User, Card),
    recipient: &User,
    amount_minor: i64,
    interval_type: IntervalType,
    first: DateTime<Utc>,
) -> RecurringTransaction {
    engine
        .create_recurring_transaction(RecurringTransactionCmd::new(
            sender.0.id,
            sender.1.id,
            recipient.id,
            amount_minor,
            interval_type,
            first,
        ))
        .await
        .unwrap()
}

async fn next_date(engine: &Engine, id: Uuid) -> DateTime<Utc> {
    engine
        .recurring_transaction(id)
        .await
        .unwrap()
        .next_execution_date
}

#[tokio::test]
async fn daily_entry_executes_and_advances_across_month_end() {
    let engine = engine_with_db(SchedulerOptions::default()).await;
    let alice = funded_user(&engine, "alice@example.com", 10_000).await;
    let (bob, _) = funded_user(&engine, "bob@example.com", 0).await;
    let entry = schedule(&engine, &alice, &bob, 1_250, IntervalType::Daily, at(2024, 1, 31, 9)).await;

    let now = at(2024, 1, 31, 10);
    let report = engine.process_due_at(now).await.unwrap();

    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.executed(), 1);
    assert!(!report.aborted);
    let EntryOutcome::Executed {
        transaction,
        next_execution_date,
    } = &report.entries[0].outcome
    else {
        panic!("expected executed outcome, got {:?}", report.entries[0].outcome);
    };
    assert_eq!(*next_execution_date, at(2024, 2, 1, 9));
    assert_eq!(transaction.recurring_transaction_id, Some(entry.id));
    assert_eq!(transaction.occurred_at, now);
    assert_eq!(transaction.amount_minor, 1_250);
    assert_eq!(transaction.card_id, alice.1.id);

    assert_eq!(next_date(&engine, entry.id).await, at(2024, 2, 1, 9));
    assert_eq!(balance(&engine, &alice.0).await, 8_750);
    assert_eq!(balance(&engine, &bob).await, 1_250);
}

#[tokio::test]
async fn monthly_entries_keep_day_and_wrap_year() {
    let engine = engine_with_db(SchedulerOptions::default()).await;
    let alice = funded_user(&engine, "alice@example.com", 10_000).await;
    let (bob, _) = funded_user(&engine, "bob@example.com", 0).await;
    let mid_january = schedule(&engine, &alice, &bob, 100, IntervalType::Monthly, at(2024, 1, 15, 6)).await;
    let december = schedule(&engine, &alice, &bob, 100, IntervalType::Monthly, at(2024, 12, 10, 6)).await;
    let end_of_january =
        schedule(&engine, &alice, &bob, 100, IntervalType::Monthly, at(2024, 1, 31, 6)).await;

    let report = engine.process_due_at(at(2024, 12, 31, 0)).await.unwrap();
    assert_eq!(report.executed(), 3);

    assert_eq!(next_date(&engine, mid_january.id).await, at(2024, 2, 15, 6));
    assert_eq!(next_date(&engine, december.id).await, at(2025, 1, 10, 6));
    assert_eq!(next_date(&engine, end_of_january.id).await, at(2024, 2, 29, 6));
}

#[tokio::test]
async fn weekly_interval_multiplies_the_unit() {
    let engine = engine_with_db(SchedulerOptions::default()).await;
    let (alice, card) = funded_user(&engine, "alice@example.com", 10_000).await;
    let (bob, _) = funded_user(&engine, "bob@example.com", 0).await;
    let entry = engine
        .create_recurring_transaction(
            RecurringTransactionCmd::new(
                alice.id,
                card.id,
                bob.id,
                100,
                IntervalType::Weekly,
                at(2024, 2, 20, 9),
            )
            .interval(2),
        )
        .await
        .unwrap();
    assert_eq!(entry.interval, 2);

    engine.process_due_at(at(2024, 2, 20, 9)).await.unwrap();

    assert_eq!(next_date(&engine, entry.id).await, at(2024, 3, 5, 9));
}

#[tokio::test]
async fn entries_not_yet_due_are_untouched() {
    let engine = engine_with_db(SchedulerOptions::default()).await;
    let alice = funded_user(&engine, "alice@example.com", 1_000).await;
    let (bob, _) = funded_user(&engine, "bob@example.com", 0).await;
    let entry = schedule(&engine, &alice, &bob, 100, IntervalType::Daily, at(2024, 5, 2, 0)).await;

    let report = engine.process_due_at(at(2024, 5, 1, 23)).await.unwrap();

    assert!(report.entries.is_empty());
    assert_eq!(next_date(&engine, entry.id).await, at(2024, 5, 2, 0));
    assert_eq!(balance(&engine, &alice.0).await, 1_000);
}

#[tokio::test]
async fn overdue_entry_runs_once_per_pass() {
    let engine = engine_with_db(SchedulerOptions::default()).await;
    let alice = funded_user(&engine, "alice@example.com", 1_000).await;
    let (bob, _) = funded_user(&engine, "bob@example.com", 0).await;
    let entry = schedule(&engine, &alice, &bob, 100, IntervalType::Daily, at(2024, 1, 1, 8)).await;
    let now = at(2024, 1, 5, 8);

    engine.process_due_at(now).await.unwrap();
    assert_eq!(next_date(&engine, entry.id).await, at(2024, 1, 2, 8));
    assert_eq!(balance(&engine, &alice.0).await, 900);

    engine.process_due_at(now).await.unwrap();
    assert_eq!(next_date(&engine, entry.id).await, at(2024, 1, 3, 8));
    assert_eq!(balance(&engine, &bob).await, 200);
}

/// Three due entries where the second sender can no longer pay.
async fn batch_with_failing_middle(
    engine: &Engine,
) -> (Vec<RecurringTransaction>, Vec<User>, User) {
    let (carol, _) = funded_user(engine, "carol@example.com", 0).await;
    let first = funded_user(engine, "first@example.com", 1_000).await;
    let second = funded_user(engine, "second@example.com", 1_000).await;
    let third = funded_user(engine, "third@example.com", 1_000).await;

    let entries = vec![
        schedule(engine, &first, &carol, 500, IntervalType::Daily, at(2024, 4, 1, 1)).await,
        schedule(engine, &second, &carol, 500, IntervalType::Daily, at(2024, 4, 1, 2)).await,
        schedule(engine, &third, &carol, 500, IntervalType::Daily, at(2024, 4, 1, 3)).await,
    ];

    // Drain the second wallet after the template was accepted.
    engine
        .execute_transfer(TransferCmd::new(second.0.id, second.1.id, first.0.id, 900, at(2024, 3, 31, 0)))
        .await
        .unwrap();

    (entries, vec![first.0, second.0, third.0], carol)
}

#[tokio::test]
async fn failing_entry_does_not_stop_the_batch() {
    let engine = engine_with_db(SchedulerOptions::default()).await;
    let (entries, senders, carol) = batch_with_failing_middle(&engine).await;

    let report = engine.process_due_at(at(2024, 4, 1, 12)).await.unwrap();

    let ids: Vec<Uuid> = report
        .entries
        .iter()
        .map(|entry| entry.recurring_transaction_id)
        .collect();
    assert_eq!(ids, entries.iter().map(|entry| entry.id).collect::<Vec<_>>());
    assert!(matches!(report.entries[0].outcome, EntryOutcome::Executed { .. }));
    assert!(matches!(
        report.entries[1].outcome,
        EntryOutcome::Failed(EngineError::InsufficientFunds(_))
    ));
    assert!(matches!(report.entries[2].outcome, EntryOutcome::Executed { .. }));
    assert_eq!(report.failures().next().map(|(id, _)| id), Some(entries[1].id));
    assert!(!report.aborted);

    assert_eq!(next_date(&engine, entries[0].id).await, at(2024, 4, 2, 1));
    assert_eq!(next_date(&engine, entries[1].id).await, at(2024, 4, 1, 2));
    assert_eq!(next_date(&engine, entries[2].id).await, at(2024, 4, 2, 3));
    assert_eq!(balance(&engine, &senders[0]).await, 1_400);
    assert_eq!(balance(&engine, &senders[1]).await, 100);
    assert_eq!(balance(&engine, &senders[2]).await, 500);
    assert_eq!(balance(&engine, &carol).await, 1_000);
}

#[tokio::test]
async fn abort_policy_stops_at_first_failure() {
    let engine = engine_with_db(SchedulerOptions {
        failure_policy: FailurePolicy::Abort,
        max_concurrency: 1,
    })
    .await;
    let (entries, senders, carol) = batch_with_failing_middle(&engine).await;

    let report = engine.process_due_at(at(2024, 4, 1, 12)).await.unwrap();

    assert!(report.aborted);
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.executed(), 1);
    assert_eq!(report.failed(), 1);

    // The first entry stays committed, the third was never attempted.
    assert_eq!(next_date(&engine, entries[0].id).await, at(2024, 4, 2, 1));
    assert_eq!(next_date(&engine, entries[2].id).await, at(2024, 4, 1, 3));
    assert_eq!(balance(&engine, &senders[2]).await, 1_000);
    assert_eq!(balance(&engine, &carol).await, 500);
}

#[tokio::test]
async fn concurrent_batch_reports_in_due_order() {
    let engine = engine_with_db(SchedulerOptions {
        failure_policy: FailurePolicy::Continue,
        max_concurrency: 4,
    })
    .await;
    let (entries, _, carol) = batch_with_failing_middle(&engine).await;

    let report = engine.process_due_at(at(2024, 4, 1, 12)).await.unwrap();

    let ids: Vec<Uuid> = report
        .entries
        .iter()
        .map(|entry| entry.recurring_transaction_id)
        .collect();
    assert_eq!(ids, entries.iter().map(|entry| entry.id).collect::<Vec<_>>());
    assert_eq!(report.executed(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(balance(&engine, &carol).await, 1_000);
}

#[tokio::test]
async fn entry_advanced_elsewhere_is_skipped() {
    let engine = engine_with_db(SchedulerOptions::default()).await;
    let alice = funded_user(&engine, "alice@example.com", 1_000).await;
    let (bob, _) = funded_user(&engine, "bob@example.com", 0).await;
    let entry = schedule(&engine, &alice, &bob, 100, IntervalType::Daily, at(2024, 6, 1, 0)).await;

    // Another worker already ran the occurrence.
    engine.process_due_at(at(2024, 6, 1, 0)).await.unwrap();

    let report = engine
        .process_recurring_transaction(entry.id, at(2024, 6, 1, 0))
        .await;
    assert!(matches!(report.outcome, EntryOutcome::Skipped));

    let report = engine
        .process_recurring_transaction(Uuid::new_v4(), at(2024, 6, 1, 0))
        .await;
    assert!(matches!(report.outcome, EntryOutcome::Skipped));

    assert_eq!(balance(&engine, &alice.0).await, 900);
}

#[tokio::test]
async fn occurrence_already_recorded_is_not_charged_twice() {
    let engine = engine_with_db(SchedulerOptions::default()).await;
    let alice = funded_user(&engine, "alice@example.com", 1_000).await;
    let (bob, _) = funded_user(&engine, "bob@example.com", 0).await;
    let entry = schedule(&engine, &alice, &bob, 100, IntervalType::Daily, at(2024, 6, 1, 0)).await;

    let recorded = engine
        .execute_transfer(
            TransferCmd::new(alice.0.id, alice.1.id, bob.id, 100, at(2024, 6, 1, 0))
                .idempotency_key(entry.occurrence_key()),
        )
        .await
        .unwrap();

    let report = engine.process_due_at(at(2024, 6, 1, 0)).await.unwrap();

    let EntryOutcome::Executed { transaction, .. } = &report.entries[0].outcome else {
        panic!("expected executed outcome, got {:?}", report.entries[0].outcome);
    };
    assert_eq!(transaction.id, recorded.id);
    assert_eq!(balance(&engine, &alice.0).await, 900);
    assert_eq!(next_date(&engine, entry.id).await, at(2024, 6, 2, 0));
}

#[tokio::test]
async fn blocked_sender_fails_without_advancing() {
    let engine = engine_with_db(SchedulerOptions::default()).await;
    let root = engine
        .new_user(NewUserCmd::new("root@example.com", "Root").admin())
        .await
        .unwrap();
    let alice = funded_user(&engine, "alice@example.com", 1_000).await;
    let (bob, _) = funded_user(&engine, "bob@example.com", 0).await;
    let entry = schedule(&engine, &alice, &bob, 100, IntervalType::Daily, at(2024, 6, 1, 0)).await;
    engine.set_user_blocked(root.id, alice.0.id, true).await.unwrap();

    let report = engine.process_due_at(at(2024, 6, 1, 0)).await.unwrap();

    assert!(matches!(
        report.entries[0].outcome,
        EntryOutcome::Failed(EngineError::Forbidden(_))
    ));
    assert_eq!(next_date(&engine, entry.id).await, at(2024, 6, 1, 0));
    assert_eq!(balance(&engine, &alice.0).await, 1_000);
}

#[tokio::test]
async fn create_validates_like_a_transfer() {
    let engine = engine_with_db(SchedulerOptions::default()).await;
    let (alice, alice_card) = funded_user(&engine, "alice@example.com", 1_000).await;
    let (bob, bob_card) = funded_user(&engine, "bob@example.com", 0).await;
    let first = at(2024, 7, 1, 0);
    let cmd = |card: Uuid, amount: i64| {
        RecurringTransactionCmd::new(alice.id, card, bob.id, amount, IntervalType::Monthly, first)
    };

    let err = engine
        .create_recurring_transaction(cmd(alice_card.id, 100).interval(0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSchedule(_)));

    let err = engine
        .create_recurring_transaction(cmd(alice_card.id, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .create_recurring_transaction(cmd(bob_card.id, 100))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("card not exists".to_string()));

    let err = engine
        .create_recurring_transaction(cmd(alice_card.id, 1_001))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    let err = engine
        .create_recurring_transaction(RecurringTransactionCmd::new(
            alice.id,
            alice_card.id,
            Uuid::new_v4(),
            100,
            IntervalType::Daily,
            first,
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("recipient wallet not exists".to_string())
    );

    assert!(
        engine
            .list_recurring_transactions(alice.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn delete_requires_owner_or_admin() {
    let engine = engine_with_db(SchedulerOptions::default()).await;
    let root = engine
        .new_user(NewUserCmd::new("root@example.com", "Root").admin())
        .await
        .unwrap();
    let alice = funded_user(&engine, "alice@example.com", 1_000).await;
    let (bob, _) = funded_user(&engine, "bob@example.com", 0).await;
    let by_owner = schedule(&engine, &alice, &bob, 100, IntervalType::Daily, at(2024, 8, 1, 0)).await;
    let by_admin = schedule(&engine, &alice, &bob, 100, IntervalType::Weekly, at(2024, 8, 2, 0)).await;
    engine.process_due_at(at(2024, 8, 1, 0)).await.unwrap();

    let err = engine
        .delete_recurring_transaction(bob.id, by_owner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine
        .delete_recurring_transaction(alice.0.id, by_owner.id)
        .await
        .unwrap();
    engine
        .delete_recurring_transaction(root.id, by_admin.id)
        .await
        .unwrap();

    let err = engine
        .delete_recurring_transaction(alice.0.id, by_owner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    assert!(
        engine
            .list_recurring_transactions(alice.0.id)
            .await
            .unwrap()
            .is_empty()
    );

    // Generated transactions outlive their template.
    let history = engine.list_transactions_for_user(alice.0.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].recurring_transaction_id, Some(by_owner.id));
}
