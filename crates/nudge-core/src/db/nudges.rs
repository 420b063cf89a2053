//! Persisted behavioral nudges

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{NudgeRecord, NudgeTone};

impl Database {
    /// Store a generated nudge
    pub fn insert_nudge(&self, user_id: i64, text: &str, tone: NudgeTone) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO nudges (user_id, nudge_text, tone) VALUES (?, ?, ?)",
            params![user_id, text, tone.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent nudges for a user, newest first
    pub fn recent_nudges(&self, user_id: i64, limit: i64) -> Result<Vec<NudgeRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT nudge_text, tone, created_at
            FROM nudges
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )?;

        let nudges = stmt
            .query_map(params![user_id, limit], |row| {
                let tone_str: String = row.get(1)?;
                let created_str: String = row.get(2)?;
                Ok(NudgeRecord {
                    text: row.get(0)?,
                    tone: tone_str.parse().unwrap_or(NudgeTone::Informative),
                    created_at: parse_datetime(&created_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(nudges)
    }

    /// Total nudges generated for a user
    pub fn count_nudges(&self, user_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM nudges WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
