//! CSV import and export for transaction history
//!
//! Expected import columns: `date,category,amount[,description]`. Rows are
//! tolerated individually: a bad date or amount counts as an error, a
//! `(date, amount, category)` tuple already on file counts as a duplicate,
//! and the rest import normally.

use std::io::Read;

use chrono::NaiveDate;
use csv::ReaderBuilder;
use tracing::{info, warn};

use crate::db::{Database, TransactionInsertResult};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, TransactionSource};

const REQUIRED_COLUMNS: [&str; 3] = ["date", "category", "amount"];

/// Outcome of a CSV import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub imported: usize,
    pub duplicates: usize,
    pub errors: usize,
}

/// Import transactions for a user from CSV data
///
/// The header must contain `date`, `category`, and `amount`; a
/// `description` column is optional. Amounts must be non-negative numbers
/// and dates `YYYY-MM-DD`.
pub fn import_csv<R: Read>(db: &Database, user_id: i64, reader: R) -> Result<ImportStats> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let (date_col, category_col, amount_col) =
        match (column("date"), column("category"), column("amount")) {
            (Some(date), Some(category), Some(amount)) => (date, category, amount),
            _ => {
                let missing: Vec<&str> = REQUIRED_COLUMNS
                    .iter()
                    .filter(|name| column(name).is_none())
                    .copied()
                    .collect();
                return Err(Error::InvalidData(format!(
                    "CSV must contain columns: {}",
                    missing.join(", ")
                )));
            }
        };
    let description_col = column("description");

    let mut stats = ImportStats::default();

    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Skipping malformed CSV row");
                stats.errors += 1;
                continue;
            }
        };

        let parsed = parse_row(&record, date_col, category_col, amount_col, description_col);
        let tx = match parsed {
            Ok(tx) => tx,
            Err(e) => {
                warn!(error = %e, "Skipping invalid CSV row");
                stats.errors += 1;
                continue;
            }
        };

        match db.insert_transaction(user_id, &tx) {
            Ok(TransactionInsertResult::Inserted(_)) => stats.imported += 1,
            Ok(TransactionInsertResult::Duplicate(_)) => stats.duplicates += 1,
            Err(Error::InvalidData(msg)) => {
                warn!(error = %msg, "Skipping rejected CSV row");
                stats.errors += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        user_id,
        imported = stats.imported,
        duplicates = stats.duplicates,
        errors = stats.errors,
        "CSV import complete"
    );

    Ok(stats)
}

fn parse_row(
    record: &csv::StringRecord,
    date_col: usize,
    category_col: usize,
    amount_col: usize,
    description_col: Option<usize>,
) -> Result<NewTransaction> {
    let date_str = record
        .get(date_col)
        .ok_or_else(|| Error::InvalidData("Missing date".into()))?;
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|e| Error::InvalidData(format!("Bad date '{}': {}", date_str, e)))?;

    let category = record
        .get(category_col)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::InvalidData("Missing category".into()))?
        .to_string();

    let amount_str = record
        .get(amount_col)
        .ok_or_else(|| Error::InvalidData("Missing amount".into()))?;
    let amount: f64 = amount_str
        .parse()
        .map_err(|_| Error::InvalidData(format!("Bad amount '{}'", amount_str)))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidData(format!(
            "Amount must be non-negative, got {}",
            amount_str
        )));
    }

    let description = description_col
        .and_then(|i| record.get(i))
        .unwrap_or_default()
        .to_string();

    Ok(NewTransaction {
        date,
        category,
        amount,
        source: TransactionSource::CsvUpload,
        description,
    })
}

/// Export a user's transactions as CSV, newest-loaded order (date ascending)
pub fn export_csv(db: &Database, user_id: i64) -> Result<String> {
    let transactions = db.list_transactions(user_id)?;

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["date", "category", "amount", "source", "description"])?;

    for tx in &transactions {
        wtr.write_record([
            tx.date.to_string().as_str(),
            tx.category.as_str(),
            format!("{:.2}", tx.amount).as_str(),
            tx.source.as_str(),
            tx.description.as_str(),
        ])?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| Error::InvalidData(format!("CSV write failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidData(format!("CSV not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_counts_rows_duplicates_and_errors() {
        let db = Database::in_memory().unwrap();
        let csv_data = "\
date,category,amount,description
2026-03-01,Groceries,450.00,Weekly shop
2026-03-02,Food Delivery,350.00,Dinner order
2026-03-01,Groceries,450.00,Same tuple again
2026-03-03,Shopping,-20.00,Negative amount
not-a-date,Groceries,100.00,Bad date
";

        let stats = import_csv(&db, 1, csv_data.as_bytes()).unwrap();
        assert_eq!(stats.imported, 2);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.errors, 2);

        let transactions = db.list_transactions(1).unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].source, TransactionSource::CsvUpload);
        assert_eq!(transactions[0].description, "Weekly shop");
    }

    #[test]
    fn test_import_requires_columns() {
        let db = Database::in_memory().unwrap();
        let err = import_csv(&db, 1, "date,amount\n2026-03-01,100\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidData(msg) if msg.contains("category")));
    }

    #[test]
    fn test_import_without_description_column() {
        let db = Database::in_memory().unwrap();
        let stats = import_csv(
            &db,
            1,
            "date,category,amount\n2026-03-01,Groceries,120.50\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(stats.imported, 1);

        let transactions = db.list_transactions(1).unwrap();
        assert_eq!(transactions[0].description, "");
        assert_eq!(transactions[0].amount, 120.5);
    }

    #[test]
    fn test_export_round_trips_through_import() {
        let db = Database::in_memory().unwrap();
        import_csv(
            &db,
            1,
            "date,category,amount,description\n2026-03-01,Groceries,450.00,Weekly shop\n"
                .as_bytes(),
        )
        .unwrap();

        let exported = export_csv(&db, 1).unwrap();
        assert!(exported.starts_with("date,category,amount,source,description"));
        assert!(exported.contains("2026-03-01,Groceries,450.00,csv_upload,Weekly shop"));
    }
}
