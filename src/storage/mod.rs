/*!
 * 统一存储系统模块
 *
 * 历史命令和别名两份数据集的持久化存储。
 * 同步任务写入，预测模型读取，二者只通过 `DataStore` 接口交互。
 */

pub mod database;
pub mod error;
pub mod memory_store;
pub mod paths;
pub mod repositories;
pub mod sql_scripts;
pub mod sqlite_store;
pub mod store;

// 重新导出核心类型和函数
pub use database::{DatabaseManager, DatabaseOptions};
pub use error::{StoreError, StoreResult};
pub use memory_store::MemoryStore;
pub use paths::StoragePaths;
pub use sqlite_store::SqliteStore;
pub use store::{
    aliases_or_empty, history_or_empty, AliasEntry, DataStore, HistoryEntry, SyncCursor,
};

/// 应用目录名称
pub const APP_DIR_NAME: &str = "ghostline";

/// 存储目录名称
pub const CONFIG_DIR_NAME: &str = "config";
pub const DATA_DIR_NAME: &str = "data";

/// 文件名称
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DATABASE_FILE_NAME: &str = "ghostline.db";
