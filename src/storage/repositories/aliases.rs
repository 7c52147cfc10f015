/*!
 * 别名Repository
 */

use crate::storage::database::DatabaseManager;
use crate::storage::error::StoreResult;
use crate::storage::store::AliasEntry;
use chrono::Utc;

pub struct AliasRepo<'a> {
    db: &'a DatabaseManager,
}

impl<'a> AliasRepo<'a> {
    pub fn new(db: &'a DatabaseManager) -> Self {
        Self { db }
    }

    fn pool(&self) -> &sqlx::SqlitePool {
        self.db.pool()
    }

    pub async fn upsert(&self, entry: &AliasEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO aliases (name, expansion, updated_ts)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                expansion = excluded.expansion,
                updated_ts = excluded.updated_ts
            "#,
        )
        .bind(&entry.name)
        .bind(&entry.expansion)
        .bind(Utc::now().timestamp())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn find_all(&self) -> StoreResult<Vec<AliasEntry>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT name, expansion FROM aliases ORDER BY name ASC",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, expansion)| AliasEntry { name, expansion })
            .collect())
    }
}
