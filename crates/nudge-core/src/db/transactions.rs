//! Transaction operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction, TransactionSource};

/// Result of inserting a transaction
#[derive(Debug, Clone)]
pub enum TransactionInsertResult {
    /// Transaction was inserted successfully, contains new transaction ID
    Inserted(i64),
    /// Transaction was a duplicate, contains existing transaction ID
    Duplicate(i64),
}

impl TransactionInsertResult {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

impl Database {
    /// Insert a transaction, rejecting duplicates
    ///
    /// A record matching an existing `(user_id, date, amount, category)`
    /// tuple is reported as a duplicate rather than stored again. Negative
    /// amounts are rejected at this boundary; downstream analytics assume
    /// validated, non-negative values.
    pub fn insert_transaction(
        &self,
        user_id: i64,
        tx: &NewTransaction,
    ) -> Result<TransactionInsertResult> {
        if !tx.amount.is_finite() || tx.amount < 0.0 {
            return Err(Error::InvalidData(format!(
                "Transaction amount must be a non-negative number, got {}",
                tx.amount
            )));
        }

        let conn = self.conn()?;

        // Check for duplicate
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE user_id = ? AND date = ? AND amount = ? AND category = ?",
                params![user_id, tx.date.to_string(), tx.amount, tx.category],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(existing_id) = existing {
            debug!(
                user_id,
                date = %tx.date,
                amount = tx.amount,
                category = %tx.category,
                "Skipping duplicate transaction"
            );
            return Ok(TransactionInsertResult::Duplicate(existing_id));
        }

        conn.execute(
            r#"
            INSERT INTO transactions (user_id, date, category, amount, source, description)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                tx.date.to_string(),
                tx.category,
                tx.amount,
                tx.source.as_str(),
                tx.description,
            ],
        )?;

        Ok(TransactionInsertResult::Inserted(conn.last_insert_rowid()))
    }

    /// All transactions for a user, date ascending (the analysis ordering)
    pub fn list_transactions(&self, user_id: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, date, category, amount, source, description, created_at
            FROM transactions
            WHERE user_id = ?
            ORDER BY date ASC, id ASC
            "#,
        )?;

        let transactions = stmt
            .query_map(params![user_id], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Delete a transaction owned by the user
    pub fn delete_transaction(&self, user_id: i64, transaction_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM transactions WHERE id = ? AND user_id = ?",
            params![transaction_id, user_id],
        )?;

        if deleted == 0 {
            return Err(Error::NotFound(format!(
                "Transaction {} for user {}",
                transaction_id, user_id
            )));
        }
        Ok(())
    }

    /// Number of transactions recorded for a user
    pub fn count_transactions(&self, user_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(2)?;
        let source_str: String = row.get(5)?;
        let created_str: String = row.get(7)?;

        Ok(Transaction {
            id: row.get(0)?,
            user_id: row.get(1)?,
            date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            category: row.get(3)?,
            amount: row.get(4)?,
            source: source_str
                .parse::<TransactionSource>()
                .unwrap_or_default(),
            description: row.get(6)?,
            created_at: parse_datetime(&created_str),
        })
    }
}
