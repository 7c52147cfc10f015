//! 模型筛选

use crate::completion::types::KNOWN_MODELS;
use std::collections::BTreeSet;

/// 参与本次查询的模型
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModelSelection {
    /// 全部已注册的模型
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl ModelSelection {
    /// 解析逗号分隔的模型名，忽略空白和大小写；空列表表示全部
    pub fn parse(list: &str) -> Self {
        Self::from_names(list.split(','))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: BTreeSet<String> = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_ascii_lowercase())
            .filter(|name| !name.is_empty())
            .collect();

        if names.is_empty() {
            ModelSelection::All
        } else {
            ModelSelection::Only(names)
        }
    }

    pub fn includes(&self, model: &str) -> bool {
        match self {
            ModelSelection::All => true,
            ModelSelection::Only(names) => names.contains(model),
        }
    }

    /// 不是内置模型的名称，调用方可以据此给出提示
    pub fn unknown_names(&self) -> Vec<&str> {
        match self {
            ModelSelection::All => Vec::new(),
            ModelSelection::Only(names) => names
                .iter()
                .map(String::as_str)
                .filter(|name| !KNOWN_MODELS.contains(name))
                .collect(),
        }
    }
}

impl From<&str> for ModelSelection {
    fn from(list: &str) -> Self {
        Self::parse(list)
    }
}
