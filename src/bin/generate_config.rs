//! 配置文件生成工具
//!
//! 输出默认配置；带 `--write` 时同时写入默认配置文件位置（已存在则不覆盖）。

use ghostline_lib::config::AppConfig;
use ghostline_lib::storage::StoragePaths;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let toml_content = toml::to_string_pretty(&AppConfig::default())?;
    println!("{}", toml_content);

    if std::env::args().any(|arg| arg == "--write") {
        let paths = StoragePaths::platform_default();
        let config_path = paths.config_file();
        if config_path.exists() {
            eprintln!("配置文件已存在: {:?}", config_path);
            return Ok(());
        }

        paths.ensure_directories()?;
        tokio::fs::write(&config_path, toml_content).await?;
        eprintln!("配置文件已保存到: {:?}", config_path);
    }

    Ok(())
}
