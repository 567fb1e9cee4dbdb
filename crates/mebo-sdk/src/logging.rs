//! 日志初始化
//!
//! 使用 `tracing-subscriber` 输出到 stderr，过滤规则取自 `RUST_LOG`，
//! 未设置时使用调用方给出的默认级别。`log` 宏产生的记录经 `tracing-log`
//! 转发。

use tracing_subscriber::EnvFilter;

/// 初始化全局日志
///
/// 重复调用时忽略（返回 `false`）。
///
/// ```rust
/// mebo_sdk::init_logging("info");
/// assert!(!mebo_sdk::init_logging("debug"));
/// ```
pub fn init_logging(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }

    // 已有 log 记录器时保留原记录器
    let _ = tracing_log::LogTracer::init();
    true
}
