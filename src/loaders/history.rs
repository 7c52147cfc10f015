//! 历史命令加载器
//!
//! 读取 bash / zsh / fish 的历史文件，按文件顺序输出记录，每条记录次数为 1，
//! 重复命令的合并交给数据存储。

use super::{LoadError, LoadResult, Loader};
use crate::storage::HistoryEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Shell类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
    Unknown,
}

impl ShellType {
    /// 从文件路径推断Shell类型
    pub fn from_path(path: &Path) -> Self {
        match path.file_name().and_then(|n| n.to_str()) {
            Some(".bash_history") => Self::Bash,
            Some(".zsh_history") | Some(".histfile") => Self::Zsh,
            Some("fish_history") | Some(".fish_history") => Self::Fish,
            _ => Self::Unknown,
        }
    }

    /// 从 shell 程序名推断（如 `/usr/bin/zsh`）
    pub fn from_program(program: &str) -> Self {
        let name = Path::new(program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(program);
        match name {
            "bash" => Self::Bash,
            "zsh" => Self::Zsh,
            "fish" => Self::Fish,
            _ => Self::Unknown,
        }
    }

    /// 该 shell 默认的历史文件位置
    pub fn default_history_file(&self, home: &Path) -> Option<PathBuf> {
        match self {
            Self::Bash => Some(home.join(".bash_history")),
            Self::Zsh => Some(home.join(".zsh_history")),
            Self::Fish => Some(home.join(".local/share/fish/fish_history")),
            Self::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::Zsh => "zsh",
            Self::Fish => "fish",
            Self::Unknown => "shell",
        }
    }
}

#[derive(Debug, Clone)]
enum HistorySource {
    Fixed { path: PathBuf, shell: ShellType },
    Auto,
}

/// 历史命令加载器
#[derive(Debug, Clone)]
pub struct ShellHistoryLoader {
    source: HistorySource,
}

impl ShellHistoryLoader {
    /// 使用指定的历史文件
    pub fn new(path: PathBuf) -> Self {
        let shell = ShellType::from_path(&path);
        Self {
            source: HistorySource::Fixed { path, shell },
        }
    }

    /// 每次加载时重新探测历史文件（`$HISTFILE` → `$SHELL` → 默认文件）
    pub fn auto() -> Self {
        Self {
            source: HistorySource::Auto,
        }
    }

    /// 覆盖推断出的 shell 类型
    pub fn with_shell(self, shell: ShellType) -> Self {
        match self.source {
            HistorySource::Fixed { path, .. } => Self {
                source: HistorySource::Fixed { path, shell },
            },
            HistorySource::Auto => self,
        }
    }

    fn resolve(&self) -> LoadResult<(PathBuf, ShellType)> {
        match &self.source {
            HistorySource::Fixed { path, shell } => Ok((path.clone(), *shell)),
            HistorySource::Auto => detect_history_file(
                std::env::var("HISTFILE").ok().as_deref(),
                std::env::var("SHELL").ok().as_deref(),
                dirs::home_dir().as_deref(),
            )
            .ok_or(LoadError::Undetected { kind: "history" }),
        }
    }
}

/// 探测历史文件位置
fn detect_history_file(
    histfile: Option<&str>,
    shell: Option<&str>,
    home: Option<&Path>,
) -> Option<(PathBuf, ShellType)> {
    let shell_type = shell
        .map(ShellType::from_program)
        .unwrap_or(ShellType::Unknown);

    if let Some(histfile) = histfile.filter(|h| !h.trim().is_empty()) {
        let path = PathBuf::from(histfile);
        if path.exists() {
            let by_path = ShellType::from_path(&path);
            let shell = if by_path == ShellType::Unknown {
                shell_type
            } else {
                by_path
            };
            return Some((path, shell));
        }
    }

    let home = home?;
    if let Some(path) = shell_type.default_history_file(home) {
        if path.exists() {
            return Some((path, shell_type));
        }
    }

    [ShellType::Bash, ShellType::Zsh, ShellType::Fish]
        .into_iter()
        .filter_map(|shell| shell.default_history_file(home).map(|p| (p, shell)))
        .find(|(path, _)| path.exists())
}

#[async_trait]
impl Loader for ShellHistoryLoader {
    type Record = HistoryEntry;

    fn name(&self) -> &str {
        "history"
    }

    fn source_key(&self) -> String {
        match self.resolve() {
            Ok((path, _)) => format!("history:{}", path.display()),
            Err(_) => self.name().to_string(),
        }
    }

    async fn load(&self) -> LoadResult<Vec<HistoryEntry>> {
        let (path, shell) = self.resolve()?;
        if !path.exists() {
            return Err(LoadError::NotFound { path });
        }

        let bytes = fs::read(&path)
            .await
            .map_err(|e| LoadError::io(format!("reading history file {}", path.display()), e))?;
        let bytes = if shell == ShellType::Zsh {
            unmetafy(&bytes)
        } else {
            bytes
        };
        let content = String::from_utf8_lossy(&bytes);
        let entries = parse_history_content(&content, shell);

        debug!(
            path = %path.display(),
            shell = shell.as_str(),
            entries = entries.len(),
            "loader.history.loaded"
        );
        Ok(entries)
    }
}

/// zsh 会把高位字节写成 0x83 + (byte ^ 0x20)
fn unmetafy(bytes: &[u8]) -> Vec<u8> {
    const META: u8 = 0x83;
    let mut out = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter();
    while let Some(&b) = iter.next() {
        if b == META {
            if let Some(&next) = iter.next() {
                out.push(next ^ 0x20);
            }
        } else {
            out.push(b);
        }
    }
    out
}

/// 解析历史文件内容，支持不同的shell格式
pub fn parse_history_content(content: &str, shell: ShellType) -> Vec<HistoryEntry> {
    match shell {
        ShellType::Fish => parse_fish(content),
        ShellType::Zsh => parse_zsh(content),
        ShellType::Bash | ShellType::Unknown => parse_bash(content),
    }
}

fn timestamp_from_secs(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

fn push_command(entries: &mut Vec<HistoryEntry>, command: &str, ts: Option<DateTime<Utc>>) {
    let command = command.trim();
    if command.is_empty() {
        return;
    }
    let mut entry = HistoryEntry::new(command);
    entry.timestamp = ts;
    entries.push(entry);
}

fn parse_bash(content: &str) -> Vec<HistoryEntry> {
    let mut entries = Vec::new();
    let mut pending_ts = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // HISTTIMEFORMAT 打开时，命令前一行是 `#<epoch>`
        if let Some(rest) = trimmed.strip_prefix('#') {
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                pending_ts = rest.parse::<i64>().ok().and_then(timestamp_from_secs);
            }
            continue;
        }

        // 未知格式下兼容 zsh 扩展历史
        if let Some((ts, command)) = split_zsh_extended(trimmed) {
            push_command(&mut entries, command, ts);
            continue;
        }

        push_command(&mut entries, trimmed, pending_ts.take());
    }

    entries
}

/// `: 1640995200:0;git status` → (时间, 命令)
fn split_zsh_extended(line: &str) -> Option<(Option<DateTime<Utc>>, &str)> {
    let rest = line.strip_prefix(": ")?;
    let (meta, command) = rest.split_once(';')?;
    let (ts, duration) = meta.split_once(':')?;
    if ts.is_empty()
        || !ts.bytes().all(|b| b.is_ascii_digit())
        || !duration.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    Some((ts.parse::<i64>().ok().and_then(timestamp_from_secs), command))
}

fn parse_zsh(content: &str) -> Vec<HistoryEntry> {
    let mut entries = Vec::new();
    let mut current: Option<(Option<DateTime<Utc>>, String)> = None;

    for line in content.lines() {
        // 上一行以反斜杠结尾：多行命令的续行
        if let Some((ts, mut command)) = current.take() {
            command.push('\n');
            command.push_str(line);
            if line.ends_with('\\') {
                command.pop();
                current = Some((ts, command));
            } else {
                push_command(&mut entries, &command, ts);
            }
            continue;
        }

        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (ts, command) = match split_zsh_extended(trimmed) {
            Some((ts, command)) => (ts, command),
            None => (None, trimmed),
        };

        if let Some(stripped) = command.strip_suffix('\\') {
            current = Some((ts, stripped.to_string()));
        } else {
            push_command(&mut entries, command, ts);
        }
    }

    if let Some((ts, command)) = current {
        push_command(&mut entries, &command, ts);
    }

    entries
}

fn parse_fish(content: &str) -> Vec<HistoryEntry> {
    let mut entries: Vec<HistoryEntry> = Vec::new();

    for line in content.lines() {
        if let Some(command) = line.strip_prefix("- cmd: ") {
            let command = command.replace("\\n", "\n").replace("\\\\", "\\");
            push_command(&mut entries, &command, None);
        } else if let Some(when) = line.trim_start().strip_prefix("when: ") {
            if let Some(last) = entries.last_mut() {
                if last.timestamp.is_none() {
                    last.timestamp = when.trim().parse::<i64>().ok().and_then(timestamp_from_secs);
                }
            }
        }
    }

    entries
}
