// 日志初始化
//
// 控制台输出 + 可选的日志文件（无颜色）。
// 过滤级别优先取 RUST_LOG，其次取配置中的级别。

use anyhow::Context;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 构造过滤器
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 安装全局日志订阅者
///
/// # 参数
/// - `level`: 默认过滤级别，例如 `info` 或 `book_image_backend=debug`
/// - `log_file`: 额外写入的日志文件
pub fn init(level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("无法创建日志目录: {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("无法打开日志文件: {}", path.display()))?;

            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("初始化日志失败: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_falls_back() {
        // 无论 RUST_LOG 是否设置，都不应该 panic
        let _filter = build_filter("not a [valid directive");
        let _filter = build_filter("book_image_backend=debug,tower_http=info");
    }
}
