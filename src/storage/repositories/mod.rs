/*!
 * 数据访问模块 - 每个表一个简单的结构体，直接使用 sqlx
 *
 * 设计原则：
 * - 单一职责：每个结构体对应一张表
 * - 借用优先：使用 &DatabaseManager 而非 Arc
 * - 每次写入是一条 `INSERT ... ON CONFLICT` 语句，单条记录原子生效
 */

pub mod aliases;
pub mod history;
pub mod sync_cursors;

pub use aliases::AliasRepo;
pub use history::HistoryRepo;
pub use sync_cursors::SyncCursorRepo;

/// SQLite 的 LIMIT 只接受 i64，None 表示不限制
pub(crate) fn limit_to_sql(limit: Option<usize>) -> i64 {
    match limit {
        Some(limit) => i64::try_from(limit).unwrap_or(i64::MAX),
        None => -1,
    }
}
