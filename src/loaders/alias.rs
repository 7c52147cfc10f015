//! 别名加载器
//!
//! 两个来源：交互式 shell 的 `alias` 输出，以及 rc 文件中的 `alias` 行。
//! 记录按出现顺序输出，同名别名后出现的覆盖先出现的。

use super::{LoadError, LoadResult, Loader};
use crate::storage::AliasEntry;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// 默认的 shell 命令超时
pub const DEFAULT_ALIAS_COMMAND_TIMEOUT: Duration = Duration::from_secs(3);

/// 解析单行别名定义
///
/// 支持的格式：
/// - bash `alias ll='ls -la'`
/// - zsh  `ll='ls -la'` 或 `ll=ls`
/// - fish `alias ll 'ls -la'`
pub fn parse_alias_line(line: &str) -> Option<AliasEntry> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (rest, has_keyword) = match line.strip_prefix("alias ") {
        Some(rest) => (rest.trim_start(), true),
        None => (line, false),
    };

    // 跳过 `alias -g` 之类的选项
    let mut rest = rest;
    while rest.starts_with('-') {
        rest = rest.split_once(char::is_whitespace)?.1.trim_start();
    }

    let (name, raw_value) = match rest.split_once('=') {
        Some((name, value)) if !name.is_empty() && !name.contains(char::is_whitespace) => {
            (name, value)
        }
        // fish 的 `alias name value` 形式只在带 alias 关键字时接受
        _ if has_keyword => rest.split_once(char::is_whitespace)?,
        _ => return None,
    };

    let name = name.trim();
    if name.is_empty() || name.contains(['\'', '"', '$', '`']) {
        return None;
    }

    let expansion = unquote(raw_value.trim());
    if expansion.is_empty() {
        return None;
    }

    Some(AliasEntry::new(name, expansion))
}

/// 整个值是一个带引号的词时去掉外层引号，否则保留原文
fn unquote(value: &str) -> String {
    match shell_words::split(value) {
        Ok(mut words) if words.len() == 1 => words.remove(0),
        Ok(_) => value.to_string(),
        Err(_) => value.trim_matches(|c| c == '\'' || c == '"').to_string(),
    }
    .trim()
    .to_string()
}

/// 通过 `<shell> -i -c alias` 读取当前 shell 的别名
#[derive(Debug, Clone)]
pub struct ShellAliasLoader {
    shell: String,
    timeout: Duration,
}

impl ShellAliasLoader {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            timeout: DEFAULT_ALIAS_COMMAND_TIMEOUT,
        }
    }

    /// 使用 `$SHELL`，未设置时退回 `/bin/sh`
    pub fn from_env() -> Self {
        Self::new(std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Loader for ShellAliasLoader {
    type Record = AliasEntry;

    fn name(&self) -> &str {
        "alias-shell"
    }

    async fn load(&self) -> LoadResult<Vec<AliasEntry>> {
        let mut command = Command::new(&self.shell);
        command
            .args(["-i", "-c", "alias"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| LoadError::Timeout {
                program: self.shell.clone(),
                timeout: self.timeout,
            })?
            .map_err(|e| LoadError::io(format!("spawning {}", self.shell), e))?;

        if !output.status.success() {
            return Err(LoadError::Command {
                program: self.shell.clone(),
                message: format!("exited with {}", output.status),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let aliases: Vec<AliasEntry> = stdout.lines().filter_map(parse_alias_line).collect();
        debug!(shell = %self.shell, aliases = aliases.len(), "loader.alias.shell_loaded");
        Ok(aliases)
    }
}

/// 从 rc 文件中读取 `alias` 行
#[derive(Debug, Clone)]
pub struct RcFileAliasLoader {
    files: Vec<PathBuf>,
}

impl RcFileAliasLoader {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    /// 常见 rc 文件：~/.bash_aliases、~/.bashrc、~/.zshrc、fish config
    pub fn default_files() -> Self {
        let files = dirs::home_dir()
            .map(|home| {
                vec![
                    home.join(".bash_aliases"),
                    home.join(".bashrc"),
                    home.join(".zshrc"),
                    home.join(".config/fish/config.fish"),
                ]
            })
            .unwrap_or_default();
        Self::new(files)
    }
}

#[async_trait]
impl Loader for RcFileAliasLoader {
    type Record = AliasEntry;

    fn name(&self) -> &str {
        "alias-rc"
    }

    async fn load(&self) -> LoadResult<Vec<AliasEntry>> {
        let mut aliases = Vec::new();
        let mut found_any = false;

        for path in &self.files {
            if !path.exists() {
                continue;
            }
            found_any = true;

            let content = fs::read_to_string(path)
                .await
                .map_err(|e| LoadError::io(format!("reading {}", path.display()), e))?;
            aliases.extend(
                content
                    .lines()
                    .filter(|line| line.trim_start().starts_with("alias "))
                    .filter_map(parse_alias_line),
            );
        }

        if !found_any {
            return Err(LoadError::NotFound {
                path: self.files.first().cloned().unwrap_or_default(),
            });
        }

        Ok(aliases)
    }
}
