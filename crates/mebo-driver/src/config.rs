//! 设备连接配置
//!
//! 所有字段都有默认值，可以只在配置文件里写需要覆盖的部分。

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::DriverError;

/// 默认设备地址（机器人自带热点的网关）
pub const DEFAULT_HOST: &str = "192.168.99.1";
/// 默认 RTSP 端口（同时用作存活探测端口）
pub const DEFAULT_RTSP_PORT: u16 = 554;
/// 音频输出 UDP 端口
pub const AUDIO_PORT: u16 = 8828;

/// 重试配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// 总尝试次数（含第一次）
    pub max_attempts: u32,
    /// 两次尝试之间的固定间隔（毫秒）
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 500,
        }
    }
}

/// 设备配置
///
/// # Example
///
/// ```
/// use mebo_driver::DeviceConfig;
///
/// let config = DeviceConfig::default();
/// assert_eq!(config.command_endpoint(), "http://192.168.99.1/ajax/command.json");
/// assert_eq!(config.probe_url(), "http://192.168.99.1:554/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// 设备主机名或 IP
    pub host: String,
    /// RTSP 端口
    pub rtsp_port: u16,
    /// 单次请求超时（毫秒）
    pub request_timeout_ms: u64,
    /// 重试策略
    pub retry: RetryConfig,
    /// 多命令驱动请求发送前的等待（毫秒）
    pub joined_send_delay_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            rtsp_port: DEFAULT_RTSP_PORT,
            request_timeout_ms: 1000,
            retry: RetryConfig::default(),
            joined_send_delay_ms: 10,
        }
    }
}

impl DeviceConfig {
    /// 指定主机，其余使用默认值
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.host.trim().is_empty() {
            return Err(DriverError::Config("host must not be empty".to_string()));
        }
        if self.host.contains('/') || self.host.contains('?') {
            return Err(DriverError::Config(format!(
                "host must be a bare host name, got {:?}",
                self.host
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(DriverError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(DriverError::Config(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// 单次请求超时
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 多命令发送前等待
    pub fn joined_send_delay(&self) -> Duration {
        Duration::from_millis(self.joined_send_delay_ms)
    }

    /// 命令端点（不含查询串）
    pub fn command_endpoint(&self) -> String {
        format!("http://{}/ajax/command.json", self.host)
    }

    /// 存活探测地址
    pub fn probe_url(&self) -> String {
        format!("http://{}:{}/", self.host, self.rtsp_port)
    }

    /// 摄像头快照地址
    pub fn snapshot_url(&self) -> String {
        format!("http://{}/ajax/snapshot.jpg", self.host)
    }

    /// 视频流地址
    pub fn stream_url(&self) -> String {
        format!("rtsp://{}/media/stream2", self.host)
    }

    /// 音频输出 UDP 地址
    pub fn audio_addr(&self) -> String {
        format!("{}:{}", self.host, AUDIO_PORT)
    }
}
