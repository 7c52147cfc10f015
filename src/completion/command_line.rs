//! 命令行切分与关键字提取
//!
//! - 把正在输入的内容拆成“已完成的词”和“正在输入的词”
//! - 生成稳定的小 key，供上下文模型匹配后续命令

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandKey {
    pub key: String,
    pub root: String,
    pub sub: Option<String>,
}

/// 正在输入的命令行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedLine<'a> {
    /// 已经输入完整的词
    pub words: Vec<&'a str>,
    /// 光标所在的未完成词，末尾是空白时为空
    pub partial: &'a str,
    /// 去掉 partial 后的原始文本，补全结果以它为前缀
    pub stem: &'a str,
}

impl<'a> TypedLine<'a> {
    pub fn parse(input: &'a str) -> Self {
        let ends_with_space = input.is_empty() || input.ends_with(char::is_whitespace);
        let mut words: Vec<&str> = input.split_whitespace().collect();
        let partial = if ends_with_space {
            ""
        } else {
            words.pop().unwrap_or("")
        };
        let stem = &input[..input.len() - partial.len()];
        Self {
            words,
            partial,
            stem,
        }
    }
}

pub fn extract_command_key(command_line: &str) -> Option<CommandKey> {
    let cleaned = strip_leading_noise(command_line);
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    let root = (*tokens.first()?).to_string();
    let sub = extract_subcommand(&root, &tokens);
    let key = match &sub {
        Some(sub) => format!("{root} {sub}"),
        None => root.clone(),
    };

    Some(CommandKey { key, root, sub })
}

/// 去掉 `sudo` 和 `NAME=value` 形式的环境变量前缀
pub fn strip_leading_noise(command_line: &str) -> &str {
    let mut line = command_line.trim();

    if let Some(rest) = line.strip_prefix("sudo ") {
        line = rest.trim_start();
    }

    // 只处理最保守的情况：连续的 `NAME=...` 且 NAME 不含 '/'
    while let Some(first) = line.split_whitespace().next() {
        let Some((name, _)) = first.split_once('=') else {
            break;
        };
        if name.is_empty() || name.contains('/') {
            break;
        }
        line = line[first.len()..].trim_start();
    }

    line
}

fn extract_subcommand(root: &str, tokens: &[&str]) -> Option<String> {
    // 只对明确存在子命令语义的命令取第二个词，跳过 option
    let takes_sub = matches!(
        root,
        "git"
            | "docker"
            | "kubectl"
            | "cargo"
            | "npm"
            | "pnpm"
            | "yarn"
            | "go"
            | "brew"
            | "systemctl"
            | "pip"
    );
    if !takes_sub {
        return None;
    }

    let candidate = tokens.get(1)?;
    if candidate.starts_with('-') {
        return None;
    }

    Some(candidate.to_string())
}
