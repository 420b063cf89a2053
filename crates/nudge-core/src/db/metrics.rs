//! Append-only health score snapshot log

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::HealthSnapshot;

impl Database {
    /// Append a health score snapshot for a user
    ///
    /// Snapshots are never updated or deleted; trend queries read the tail
    /// of the log.
    pub fn insert_health_snapshot(
        &self,
        user_id: i64,
        health_score: f64,
        overspend_risk: f64,
        volatility: f64,
        delivery_ratio: f64,
        anomaly_count: i64,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO metrics (user_id, health_score, overspend_risk, volatility,
                                 delivery_ratio, anomaly_count)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                health_score,
                overspend_risk,
                volatility,
                delivery_ratio,
                anomaly_count,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent snapshots for a user, newest first
    ///
    /// Bounded reverse-order read over `(user_id, calculated_at DESC)`;
    /// insertion order breaks timestamp ties.
    pub fn recent_health_snapshots(&self, user_id: i64, limit: i64) -> Result<Vec<HealthSnapshot>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, health_score, overspend_risk, volatility,
                   delivery_ratio, anomaly_count, calculated_at
            FROM metrics
            WHERE user_id = ?
            ORDER BY calculated_at DESC, id DESC
            LIMIT ?
            "#,
        )?;

        let snapshots = stmt
            .query_map(params![user_id, limit], |row| {
                let calculated_str: String = row.get(7)?;
                Ok(HealthSnapshot {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    health_score: row.get(2)?,
                    overspend_risk: row.get(3)?,
                    volatility: row.get(4)?,
                    delivery_ratio: row.get(5)?,
                    anomaly_count: row.get(6)?,
                    calculated_at: parse_datetime(&calculated_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(snapshots)
    }
}
