//! 上下文模型
//!
//! 两类信号：上一条确认执行的命令（查后续关联表），以及当前工作目录中的
//! 项目标记文件。只做文件存在性判断，不解析项目内容。
//! 检测结果按工作目录缓存一小段时间，连续输入时不重复访问文件系统。

use super::command_pairs::follow_ups;
use super::PredictionModel;
use crate::completion::error::ModelResult;
use crate::completion::types::{Candidate, MODEL_CONTEXT};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

const FOLLOW_UP_SCORE: f64 = 0.9;
const PROJECT_SCORE: f64 = 0.6;
/// 同一组内每往后一位的衰减
const POSITION_DECAY: f64 = 0.08;
const MIN_SCORE: f64 = 0.05;
/// 项目类型检测结果的缓存时长
const PROJECT_CACHE_TTL: Duration = Duration::from_secs(5);

/// 会话级上下文：工作目录和最近一次确认的命令
#[derive(Debug)]
pub struct ContextState {
    cwd: RwLock<PathBuf>,
    last_command: RwLock<Option<String>>,
}

impl ContextState {
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd: RwLock::new(cwd),
            last_command: RwLock::new(None),
        }
    }

    /// 以进程当前目录初始化
    pub fn from_env() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn cwd(&self) -> PathBuf {
        self.cwd.read().clone()
    }

    pub fn set_cwd(&self, cwd: PathBuf) {
        *self.cwd.write() = cwd;
    }

    pub fn last_command(&self) -> Option<String> {
        self.last_command.read().clone()
    }

    pub fn set_last_command(&self, command: impl Into<String>) {
        let command = command.into();
        if !command.trim().is_empty() {
            *self.last_command.write() = Some(command);
        }
    }
}

/// 项目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProjectKind {
    Git,
    Rust,
    Node,
    Python,
    Docker,
    Go,
    Make,
}

impl ProjectKind {
    const ALL: [ProjectKind; 7] = [
        ProjectKind::Git,
        ProjectKind::Rust,
        ProjectKind::Node,
        ProjectKind::Python,
        ProjectKind::Docker,
        ProjectKind::Go,
        ProjectKind::Make,
    ];

    fn markers(self) -> &'static [&'static str] {
        match self {
            ProjectKind::Git => &[".git"],
            ProjectKind::Rust => &["Cargo.toml"],
            ProjectKind::Node => &["package.json"],
            ProjectKind::Python => &["pyproject.toml", "requirements.txt", "setup.py"],
            ProjectKind::Docker => &["Dockerfile", "docker-compose.yml", "docker-compose.yaml", "compose.yaml"],
            ProjectKind::Go => &["go.mod"],
            ProjectKind::Make => &["Makefile"],
        }
    }

    /// 该类项目里的常用命令，按常见程度排列
    pub fn commands(self) -> &'static [&'static str] {
        match self {
            ProjectKind::Git => &["git status", "git pull", "git log --oneline", "git diff"],
            ProjectKind::Rust => &["cargo build", "cargo test", "cargo run", "cargo clippy"],
            ProjectKind::Node => &["npm install", "npm run dev", "npm test", "npm run build"],
            ProjectKind::Python => &["python -m pytest", "pip install -r requirements.txt", "python main.py"],
            ProjectKind::Docker => &["docker compose up", "docker build .", "docker compose down"],
            ProjectKind::Go => &["go build ./...", "go test ./...", "go run ."],
            ProjectKind::Make => &["make", "make test", "make clean"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectKind::Git => "git",
            ProjectKind::Rust => "rust",
            ProjectKind::Node => "node",
            ProjectKind::Python => "python",
            ProjectKind::Docker => "docker",
            ProjectKind::Go => "go",
            ProjectKind::Make => "make",
        }
    }
}

/// 检测目录中的项目类型，无法访问的路径视为不存在
pub async fn detect_project_kinds(dir: &Path) -> Vec<ProjectKind> {
    let mut kinds = Vec::new();
    for kind in ProjectKind::ALL {
        for marker in kind.markers() {
            if tokio::fs::try_exists(dir.join(marker)).await.unwrap_or(false) {
                kinds.push(kind);
                break;
            }
        }
    }
    kinds
}

#[derive(Debug)]
struct DetectedProject {
    dir: PathBuf,
    detected_at: Instant,
    kinds: Vec<ProjectKind>,
}

pub struct ContextModel {
    state: Arc<ContextState>,
    project_ttl: Duration,
    detected: Mutex<Option<DetectedProject>>,
}

impl ContextModel {
    pub fn new(state: Arc<ContextState>) -> Self {
        Self {
            state,
            project_ttl: PROJECT_CACHE_TTL,
            detected: Mutex::new(None),
        }
    }

    pub fn with_project_ttl(mut self, ttl: Duration) -> Self {
        self.project_ttl = ttl;
        self
    }

    /// 当前目录的项目类型，目录未变且未过期时直接用缓存
    async fn project_kinds(&self, dir: &Path) -> Vec<ProjectKind> {
        let cached = self
            .detected
            .lock()
            .as_ref()
            .filter(|cached| cached.dir == dir && cached.detected_at.elapsed() < self.project_ttl)
            .map(|cached| cached.kinds.clone());
        if let Some(kinds) = cached {
            return kinds;
        }

        let kinds = detect_project_kinds(dir).await;
        *self.detected.lock() = Some(DetectedProject {
            dir: dir.to_path_buf(),
            detected_at: Instant::now(),
            kinds: kinds.clone(),
        });
        kinds
    }
}

fn positional_score(base: f64, position: usize) -> f64 {
    (base - POSITION_DECAY * position as f64).max(MIN_SCORE)
}

fn extends(command: &str, prefix: &str) -> bool {
    command.starts_with(prefix) && command != prefix
}

#[async_trait]
impl PredictionModel for ContextModel {
    fn name(&self) -> &str {
        MODEL_CONTEXT
    }

    async fn suggest(&self, prefix: &str, max_results: usize) -> ModelResult<Vec<Candidate>> {
        let mut candidates = Vec::new();

        if let Some(last) = self.state.last_command() {
            candidates.extend(
                follow_ups(&last)
                    .iter()
                    .filter(|command| extends(command, prefix))
                    .enumerate()
                    .map(|(position, command)| {
                        Candidate::new(*command, positional_score(FOLLOW_UP_SCORE, position), MODEL_CONTEXT)
                    }),
            );
        }

        let cwd = self.state.cwd();
        for kind in self.project_kinds(&cwd).await {
            candidates.extend(
                kind.commands()
                    .iter()
                    .filter(|command| extends(command, prefix))
                    .enumerate()
                    .map(|(position, command)| {
                        Candidate::new(*command, positional_score(PROJECT_SCORE, position), MODEL_CONTEXT)
                    }),
            );
        }

        candidates.truncate(max_results);
        Ok(candidates)
    }
}
