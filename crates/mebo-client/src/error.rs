//! 错误类型体系
//!
//! 分层错误处理，区分致命错误、可重试错误和配置错误。
//!
//! # 示例
//!
//! ```rust
//! use mebo_client::RobotError;
//!
//! fn handle_error(err: RobotError) {
//!     if err.is_fatal() {
//!         eprintln!("致命错误: {}", err);
//!     } else if err.is_retryable() {
//!         eprintln!("可重试错误: {}", err);
//!     } else {
//!         eprintln!("错误: {}", err);
//!     }
//! }
//! ```

use mebo_driver::DriverError;
use mebo_protocol::ProtocolError;
use thiserror::Error;

use crate::safety::SafetyRejection;

/// 机器人错误类型
#[derive(Debug, Error)]
pub enum RobotError {
    // ==================== Device ====================
    /// 驱动层错误（传输失败、会话冲突等）
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 协议错误（未知命令、缺少参数等）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 从未获得过关节快照
    #[error("Joint state unavailable")]
    StateUnavailable,

    // ==================== Control ====================
    /// 目标姿态无效
    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    /// 驱动命令被安全限位拒绝
    #[error("Safety limit: {0}")]
    SafetyLimit(#[from] SafetyRejection),

    /// 已有位置控制器在运行
    #[error("A position controller is already running")]
    ControllerBusy,

    // ==================== Configuration ====================
    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 配置文件读写错误
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件解析错误
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RobotError {
    /// 是否为致命错误
    ///
    /// 致命错误表示会话不可用，继续发送命令没有意义。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Driver(DriverError::SessionActive { .. } | DriverError::Http(_))
        )
    }

    /// 是否可重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Driver(DriverError::Transport { .. }) | Self::StateUnavailable | Self::ControllerBusy
        )
    }

    /// 是否为配置错误（调用方的问题，重试无效）
    pub fn is_config_error(&self) -> bool {
        match self {
            Self::ConfigError(_) | Self::InvalidGoal(_) | Self::Toml(_) => true,
            Self::Driver(DriverError::Config(_)) => true,
            Self::Protocol(e) | Self::Driver(DriverError::Protocol(e)) => e.is_configuration_error(),
            _ => false,
        }
    }

    /// 创建目标无效错误
    pub fn invalid_goal(msg: impl Into<String>) -> Self {
        Self::InvalidGoal(msg.into())
    }
}
