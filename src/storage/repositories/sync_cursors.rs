/*!
 * 同步游标Repository
 */

use crate::storage::database::DatabaseManager;
use crate::storage::error::StoreResult;
use crate::storage::store::SyncCursor;
use chrono::Utc;

pub struct SyncCursorRepo<'a> {
    db: &'a DatabaseManager,
}

impl<'a> SyncCursorRepo<'a> {
    pub fn new(db: &'a DatabaseManager) -> Self {
        Self { db }
    }

    pub async fn get(&self, source: &str) -> StoreResult<SyncCursor> {
        let row = sqlx::query_as::<_, (i64, String)>(
            "SELECT position, anchor FROM sync_cursors WHERE source = ? LIMIT 1",
        )
        .bind(source)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row
            .map(|(position, anchor)| SyncCursor {
                position: position.max(0) as u64,
                anchor,
            })
            .unwrap_or_default())
    }

    pub async fn set(&self, source: &str, cursor: &SyncCursor) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_cursors (source, position, anchor, updated_ts)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(source) DO UPDATE SET
                position = excluded.position,
                anchor = excluded.anchor,
                updated_ts = excluded.updated_ts
            "#,
        )
        .bind(source)
        .bind(i64::try_from(cursor.position).unwrap_or(i64::MAX))
        .bind(&cursor.anchor)
        .bind(Utc::now().timestamp())
        .execute(self.db.pool())
        .await?;

        Ok(())
    }
}
