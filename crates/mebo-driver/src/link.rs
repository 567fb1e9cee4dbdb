//! 设备链路抽象
//!
//! [`DeviceLink`] 是一次阻塞 HTTP GET 的最小接口：真实实现是基于
//! `reqwest::blocking` 的 [`HttpLink`]，测试使用 `mock::MockLink`。
//!
//! [`LivenessProbe`] 是每次请求失败后调用的钩子。设备固件在某些状态下
//! 需要先被 RTSP 端口上的一次裸 GET "唤醒"，命令端点才会恢复响应，
//! [`RtspProbe`] 就是这个行为，响应内容被忽略。

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

use crate::error::DriverError;

/// 单次请求的链路错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// 请求超时
    #[error("request timed out")]
    Timeout,

    /// 无法建立连接
    #[error("connection failed: {0}")]
    Connect(String),

    /// 非 2xx 状态码
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// 其它请求错误（读取响应体失败等）
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for LinkError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LinkError::Timeout
        } else if e.is_connect() {
            LinkError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            LinkError::Status(status.as_u16())
        } else {
            LinkError::Request(e.to_string())
        }
    }
}

/// 设备链路
pub trait DeviceLink: Send + Sync {
    /// 发送 GET 请求并返回响应体文本
    fn get(&self, url: &str, timeout: Duration) -> Result<String, LinkError>;
}

/// 基于 `reqwest::blocking` 的 HTTP 链路
#[derive(Clone)]
pub struct HttpLink {
    client: reqwest::blocking::Client,
}

impl HttpLink {
    /// 创建 HTTP 链路
    pub fn new() -> Result<Self, DriverError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| DriverError::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

impl DeviceLink for HttpLink {
    fn get(&self, url: &str, timeout: Duration) -> Result<String, LinkError> {
        let response = self.client.get(url).timeout(timeout).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(LinkError::Status(status.as_u16()));
        }
        Ok(response.text()?)
    }
}

/// 存活探测钩子
pub trait LivenessProbe: Send + Sync {
    /// 执行一次探测（结果被忽略）
    fn probe(&self);
}

/// RTSP 端口探测
///
/// 对 `http://<host>:<rtsp_port>/` 发一次裸 GET。
pub struct RtspProbe {
    link: Arc<dyn DeviceLink>,
    url: String,
    timeout: Duration,
}

impl RtspProbe {
    /// 创建探测器
    pub fn new(link: Arc<dyn DeviceLink>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            link,
            url: url.into(),
            timeout,
        }
    }

    /// 探测地址
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl LivenessProbe for RtspProbe {
    fn probe(&self) {
        // RTSP 端口通常不会返回合法 HTTP 响应
        let result = self.link.get(&self.url, self.timeout);
        trace!(url = %self.url, ok = result.is_ok(), "liveness probe sent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLink;

    #[test]
    fn test_link_error_display() {
        assert_eq!(LinkError::Timeout.to_string(), "request timed out");
        assert_eq!(LinkError::Status(503).to_string(), "unexpected HTTP status 503");
    }

    #[test]
    fn test_rtsp_probe_ignores_failure() {
        let link = Arc::new(MockLink::new());
        link.set_failing(true);
        let probe = RtspProbe::new(
            link.clone(),
            "http://192.168.99.1:554/",
            Duration::from_millis(100),
        );

        probe.probe();
        probe.probe();

        let urls = link.requests();
        assert_eq!(urls.len(), 2);
        assert!(urls.iter().all(|u| u == "http://192.168.99.1:554/"));
    }
}
