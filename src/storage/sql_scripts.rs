/*!
 * SQL脚本模块
 *
 * 建表脚本在编译期嵌入二进制，按文件名前缀的序号依次执行。
 */

use crate::storage::error::{StoreError, StoreResult};
use tracing::debug;

/// 内嵌的脚本文件：(文件名, 内容)
const EMBEDDED_SCRIPTS: &[(&str, &str)] = &[
    ("01_tables", include_str!("../../sql/01_tables.sql")),
    ("02_indexes", include_str!("../../sql/02_indexes.sql")),
];

#[derive(Debug, Clone)]
pub struct SqlScript {
    pub name: String,
    pub order: u32,
    pub statements: Vec<String>,
}

pub struct SqlScriptCatalog;

impl SqlScriptCatalog {
    /// 解析全部内嵌脚本，按执行顺序排序
    pub fn embedded() -> StoreResult<Vec<SqlScript>> {
        let mut scripts = EMBEDDED_SCRIPTS
            .iter()
            .map(|(name, content)| {
                Ok(SqlScript {
                    name: (*name).to_string(),
                    order: parse_order_from_name(name)?,
                    statements: parse_sql_statements(content),
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        scripts.sort_by_key(|s| s.order);
        debug!("成功加载 {} 个SQL脚本", scripts.len());
        Ok(scripts)
    }
}

fn parse_order_from_name(name: &str) -> StoreResult<u32> {
    // 文件名格式为 "01_tables" 或 "01-tables"
    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<u32>().map_err(|_| StoreError::SqlScript {
        script: name.to_string(),
        reason: "执行顺序解析失败".to_string(),
    })
}

/// 去掉 `--` 行注释和 `/* */` 块注释，再按分号切分语句
///
/// 脚本由本仓库维护，不处理字符串字面量中的分号。
fn parse_sql_statements(content: &str) -> Vec<String> {
    let mut code = String::with_capacity(content.len());
    let mut rest = content;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("/*") {
            rest = after.find("*/").map_or("", |end| &after[end + 2..]);
        } else if rest.starts_with("--") {
            rest = rest.find('\n').map_or("", |end| &rest[end..]);
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                code.push(c);
            }
            rest = chars.as_str();
        }
    }

    code.split(';')
        .map(|statement| statement.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|statement| !statement.is_empty())
        .collect()
}
