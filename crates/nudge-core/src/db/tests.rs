//! Database tests

use super::*;
use crate::models::*;

fn sample_tx(date: &str, category: &str, amount: f64) -> NewTransaction {
    NewTransaction {
        date: date.parse().unwrap(),
        category: category.to_string(),
        amount,
        source: TransactionSource::ManualEntry,
        description: String::new(),
    }
}

#[test]
fn test_schema_initializes() {
    let db = Database::in_memory().unwrap();
    let conn = db.conn().unwrap();

    for table in ["transactions", "metrics", "nudges"] {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1, "{} table should exist", table);
    }
}

#[test]
fn test_insert_and_list_transactions_ordered() {
    let db = Database::in_memory().unwrap();

    let result = db
        .insert_transaction(1, &sample_tx("2026-03-05", "Groceries", 450.0))
        .unwrap();
    assert!(result.is_inserted());

    db.insert_transaction(1, &sample_tx("2026-03-01", "Shopping", 1200.0))
        .unwrap();

    let transactions = db.list_transactions(1).unwrap();
    assert_eq!(transactions.len(), 2);
    // Date ascending, regardless of insertion order
    assert_eq!(transactions[0].date.to_string(), "2026-03-01");
    assert_eq!(transactions[1].date.to_string(), "2026-03-05");
    assert_eq!(transactions[1].category, "Groceries");
    assert_eq!(transactions[1].amount, 450.0);
}

#[test]
fn test_duplicate_tuple_is_rejected_not_overwritten() {
    let db = Database::in_memory().unwrap();

    let first = db
        .insert_transaction(1, &sample_tx("2026-03-05", "Groceries", 450.0))
        .unwrap();
    let TransactionInsertResult::Inserted(first_id) = first else {
        panic!("first insert should succeed");
    };

    // Same (user, date, amount, category), different description
    let mut dup = sample_tx("2026-03-05", "Groceries", 450.0);
    dup.description = "a second genuine shop".to_string();
    let second = db.insert_transaction(1, &dup).unwrap();

    match second {
        TransactionInsertResult::Duplicate(existing_id) => assert_eq!(existing_id, first_id),
        TransactionInsertResult::Inserted(_) => panic!("duplicate should be rejected"),
    }

    // Exactly one stored record, original description intact
    let transactions = db.list_transactions(1).unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].description, "");
}

#[test]
fn test_duplicate_check_is_scoped_to_user() {
    let db = Database::in_memory().unwrap();

    db.insert_transaction(1, &sample_tx("2026-03-05", "Groceries", 450.0))
        .unwrap();
    let other_user = db
        .insert_transaction(2, &sample_tx("2026-03-05", "Groceries", 450.0))
        .unwrap();
    assert!(other_user.is_inserted());
}

#[test]
fn test_negative_amount_rejected_at_boundary() {
    let db = Database::in_memory().unwrap();
    let err = db
        .insert_transaction(1, &sample_tx("2026-03-05", "Groceries", -450.0))
        .unwrap_err();
    assert!(matches!(err, crate::error::Error::InvalidData(_)));
    assert_eq!(db.count_transactions(1).unwrap(), 0);
}

#[test]
fn test_delete_transaction_checks_ownership() {
    let db = Database::in_memory().unwrap();
    let TransactionInsertResult::Inserted(id) = db
        .insert_transaction(1, &sample_tx("2026-03-05", "Groceries", 450.0))
        .unwrap()
    else {
        panic!("insert failed");
    };

    // Another user cannot delete it
    assert!(db.delete_transaction(2, id).is_err());
    assert_eq!(db.count_transactions(1).unwrap(), 1);

    db.delete_transaction(1, id).unwrap();
    assert_eq!(db.count_transactions(1).unwrap(), 0);
}

#[test]
fn test_health_snapshots_newest_first_with_limit() {
    let db = Database::in_memory().unwrap();

    for score in [55.0, 62.0, 70.0] {
        db.insert_health_snapshot(1, score, 0.3, 100.0, 0.2, 1).unwrap();
    }

    let all = db.recent_health_snapshots(1, 10).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].health_score, 70.0);
    assert_eq!(all[2].health_score, 55.0);

    let two = db.recent_health_snapshots(1, 2).unwrap();
    assert_eq!(two.len(), 2);
    assert_eq!(two[0].health_score, 70.0);
    assert_eq!(two[1].health_score, 62.0);
}

#[test]
fn test_nudges_round_trip() {
    let db = Database::in_memory().unwrap();

    db.insert_nudge(1, "Review your budget this week.", NudgeTone::Warning)
        .unwrap();
    db.insert_nudge(1, "Keep up the good spending habits!", NudgeTone::Encouraging)
        .unwrap();
    db.insert_nudge(2, "Someone else's nudge", NudgeTone::Informative)
        .unwrap();

    assert_eq!(db.count_nudges(1).unwrap(), 2);

    let recent = db.recent_nudges(1, 5).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].text, "Keep up the good spending habits!");
    assert_eq!(recent[0].tone, NudgeTone::Encouraging);
    assert_eq!(recent[1].tone, NudgeTone::Warning);
}
