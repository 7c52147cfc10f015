use crate::completion::command_line::strip_leading_noise;

/// 命令后续关联表
///
/// 静态配置：上一条命令的模式 → 常见的下一条命令，按常见程度排列。
pub static FOLLOW_UPS: &[(&str, &[&str])] = &[
    // Git
    ("git status", &["git add .", "git diff", "git commit", "git restore"]),
    ("git add", &["git commit", "git status", "git diff --staged"]),
    ("git commit", &["git push", "git log --oneline", "git show"]),
    ("git pull", &["git log --oneline", "git status"]),
    ("git fetch", &["git pull", "git rebase", "git status"]),
    ("git diff", &["git add .", "git restore", "git commit"]),
    ("git checkout", &["git pull", "git status", "git log --oneline"]),
    ("git clone", &["cd", "ls"]),
    // Docker
    ("docker ps", &["docker logs", "docker exec -it", "docker stop", "docker rm"]),
    ("docker images", &["docker run", "docker rmi", "docker pull"]),
    ("docker build", &["docker run", "docker images", "docker push"]),
    ("docker logs", &["docker restart", "docker stop"]),
    // 进程与网络
    ("lsof", &["kill", "kill -9"]),
    ("ps aux", &["kill", "kill -9", "pkill"]),
    ("netstat", &["kill", "lsof -i"]),
    ("top", &["kill", "pkill"]),
    // 文件
    ("mkdir", &["cd"]),
    ("ls", &["cd", "cat", "less", "vim"]),
    ("find", &["xargs", "rm", "cat"]),
    ("grep", &["vim", "less", "cat"]),
    // Node
    ("npm install", &["npm run dev", "npm start", "npm test"]),
    ("npm test", &["git add .", "npm run build"]),
    // Python
    ("pip install", &["python", "pytest"]),
    ("pytest", &["git add .", "python"]),
    // Rust
    ("cargo build", &["cargo run", "cargo test", "cargo clippy"]),
    ("cargo test", &["cargo build", "git add ."]),
    ("cargo run", &["cargo build", "cargo test"]),
    ("cargo fmt", &["cargo clippy", "git add ."]),
    // 系统服务
    ("systemctl status", &["systemctl restart", "journalctl -u"]),
    ("journalctl", &["systemctl restart", "systemctl status"]),
];

/// 命令是否匹配模式
///
/// 按词边界比较：N 个词的模式匹配命令的前 N 个词，`ls` 不会匹配 `lsblk`。
/// 命令可以带 `sudo` 或环境变量前缀。
pub fn matches_command_pattern(executed: &str, pattern: &str) -> bool {
    let mut executed_words = strip_leading_noise(executed).split_whitespace();
    let mut matched_any = false;
    for expected in pattern.split_whitespace() {
        if executed_words.next() != Some(expected) {
            return false;
        }
        matched_any = true;
    }
    matched_any
}

/// 上一条命令的后续建议，没有匹配时为空
pub fn follow_ups(last_command: &str) -> &'static [&'static str] {
    FOLLOW_UPS
        .iter()
        .find(|(pattern, _)| matches_command_pattern(last_command, pattern))
        .map(|(_, next)| *next)
        .unwrap_or(&[])
}
