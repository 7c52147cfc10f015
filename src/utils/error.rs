//! 应用层错误
//!
//! 命令行入口、配置加载和组件装配使用 anyhow；
//! 存储、加载器、同步和模型各自定义 thiserror 枚举，在这里汇合。

pub type AppError = anyhow::Error;
pub type AppResult<T> = anyhow::Result<T>;

/// 直接构造一条错误信息
pub fn app_error(msg: impl Into<String>) -> AppError {
    AppError::msg(msg.into())
}

/// 给下层错误补一句说明，配合 `map_err` 使用，原错误保留在错误链中
pub fn app_error_with_context<E>(context: &str) -> impl FnOnce(E) -> AppError + '_
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |source| AppError::new(source).context(context.to_string())
}
