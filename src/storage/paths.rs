/*!
 * 存储路径管理模块
 *
 * 统一管理配置目录、数据目录以及数据库文件路径
 */

use crate::storage::error::{StoreError, StoreResult};
use std::fs;
use std::path::PathBuf;

/// 存储路径管理器
#[derive(Debug, Clone)]
pub struct StoragePaths {
    /// 配置目录
    pub config_dir: PathBuf,
    /// 数据目录
    pub data_dir: PathBuf,
}

impl StoragePaths {
    /// 创建新的路径管理器，所有目录都位于 `app_dir` 之下
    pub fn new(app_dir: PathBuf) -> Self {
        Self {
            config_dir: app_dir.join(super::CONFIG_DIR_NAME),
            data_dir: app_dir.join(super::DATA_DIR_NAME),
        }
    }

    /// 按平台约定解析默认路径
    ///
    /// 配置放在 `~/.config/ghostline`，数据放在 `~/.local/share/ghostline`（Linux）。
    /// 无法解析用户目录时退回到当前目录下的 `.ghostline`。
    pub fn platform_default() -> Self {
        let fallback = PathBuf::from(".").join(format!(".{}", super::APP_DIR_NAME));
        let config_dir = dirs::config_dir()
            .map(|d| d.join(super::APP_DIR_NAME))
            .unwrap_or_else(|| fallback.join(super::CONFIG_DIR_NAME));
        let data_dir = dirs::data_dir()
            .map(|d| d.join(super::APP_DIR_NAME))
            .unwrap_or_else(|| fallback.join(super::DATA_DIR_NAME));

        Self {
            config_dir,
            data_dir,
        }
    }

    /// 获取配置文件路径
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(super::CONFIG_FILE_NAME)
    }

    /// 获取数据库文件路径
    pub fn database_file(&self) -> PathBuf {
        self.data_dir.join(super::DATABASE_FILE_NAME)
    }

    /// 确保所有目录存在
    pub fn ensure_directories(&self) -> StoreResult<()> {
        for dir in [&self.config_dir, &self.data_dir] {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| {
                    StoreError::io(format!("creating directory {}", dir.display()), e)
                })?;
            }
        }
        Ok(())
    }
}
