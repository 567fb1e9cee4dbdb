//! 驱动层错误类型定义

use mebo_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 重试耗尽仍未得到有效响应
    #[error("Transport failed after {attempts} attempts: {last}")]
    Transport {
        /// 实际尝试次数
        attempts: u32,
        /// 最后一次失败原因
        last: String,
    },

    /// 协议编解码错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 同一主机已有活动会话
    #[error("Session already active for host {host}")]
    SessionActive { host: String },

    /// HTTP 客户端初始化失败
    #[error("HTTP client error: {0}")]
    Http(String),

    /// 设备配置无效
    #[error("Invalid device config: {0}")]
    Config(String),
}

impl DriverError {
    /// 是否为传输层失败（设备不可达、超时、响应损坏）
    pub fn is_transport(&self) -> bool {
        matches!(self, DriverError::Transport { .. })
    }
}
