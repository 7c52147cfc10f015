/*!
 * 命令历史Repository
 */

use super::limit_to_sql;
use crate::storage::database::DatabaseManager;
use crate::storage::error::StoreResult;
use crate::storage::store::HistoryEntry;
use chrono::DateTime;

pub struct HistoryRepo<'a> {
    db: &'a DatabaseManager,
}

impl<'a> HistoryRepo<'a> {
    pub fn new(db: &'a DatabaseManager) -> Self {
        Self { db }
    }

    fn pool(&self) -> &sqlx::SqlitePool {
        self.db.pool()
    }

    pub async fn upsert(&self, entry: &HistoryEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO history (command, count, last_used_ts)
            VALUES (?, ?, ?)
            ON CONFLICT(command) DO UPDATE SET
                count = count + excluded.count,
                last_used_ts = CASE
                    WHEN last_used_ts IS NULL THEN excluded.last_used_ts
                    WHEN excluded.last_used_ts > last_used_ts THEN excluded.last_used_ts
                    ELSE last_used_ts
                END
            "#,
        )
        .bind(&entry.command)
        .bind(entry.count.max(0))
        .bind(entry.timestamp.map(|ts| ts.timestamp()))
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn find_by_prefix(
        &self,
        prefix: &str,
        limit: Option<usize>,
    ) -> StoreResult<Vec<HistoryEntry>> {
        // substr 比较区分大小写，也不受 LIKE 通配符影响
        let rows = sqlx::query_as::<_, (String, i64, Option<i64>)>(
            r#"
            SELECT command, count, last_used_ts
            FROM history
            WHERE substr(command, 1, length(?)) = ?
            ORDER BY count DESC, last_used_ts DESC, command ASC
            LIMIT ?
            "#,
        )
        .bind(prefix)
        .bind(prefix)
        .bind(limit_to_sql(limit))
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(command, count, last_used_ts)| HistoryEntry {
                command,
                timestamp: last_used_ts.and_then(|ts| DateTime::from_timestamp(ts, 0)),
                count,
            })
            .collect())
    }
}
