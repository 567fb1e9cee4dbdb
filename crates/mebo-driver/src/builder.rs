//! Builder 模式实现
//!
//! 提供链式构造 [`Mebo`] 会话的便捷方式。链路、探测器和时钟都可以替换，
//! 测试中注入 `mock` 模块里的实现即可脱离硬件运行。

use std::sync::Arc;

use crate::config::DeviceConfig;
use crate::error::DriverError;
use crate::link::{DeviceLink, HttpLink, LivenessProbe, RtspProbe};
use crate::mebo::Mebo;
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::session::SessionGuard;
use crate::transport::Transport;

/// Mebo Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use mebo_driver::MeboBuilder;
///
/// // 使用默认配置（192.168.99.1，5 次尝试，间隔 500ms）
/// let mebo = MeboBuilder::new().build().unwrap();
///
/// // 指定主机
/// let mebo = MeboBuilder::new().host("10.0.0.7").build().unwrap();
/// ```
#[derive(Default)]
pub struct MeboBuilder {
    config: DeviceConfig,
    link: Option<Arc<dyn DeviceLink>>,
    probe: Option<Arc<dyn LivenessProbe>>,
    sleeper: Option<Arc<dyn Sleeper>>,
}

impl MeboBuilder {
    /// 创建新的 Builder
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用完整设备配置
    pub fn config(mut self, config: DeviceConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置设备主机
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// 替换设备链路（默认 [`HttpLink`]）
    pub fn link(mut self, link: Arc<dyn DeviceLink>) -> Self {
        self.link = Some(link);
        self
    }

    /// 替换存活探测（默认对 RTSP 端口的 [`RtspProbe`]）
    pub fn probe(mut self, probe: Arc<dyn LivenessProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// 替换时钟（默认 [`ThreadSleeper`]）
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// 构建会话
    ///
    /// 不发送任何命令；初始化序列由上层负责。
    ///
    /// # Errors
    /// - `DriverError::Config`: 配置无效
    /// - `DriverError::SessionActive`: 主机已有活动会话
    /// - `DriverError::Http`: HTTP 客户端创建失败
    pub fn build(self) -> Result<Mebo, DriverError> {
        self.config.validate()?;
        let session = SessionGuard::acquire(&self.config.host)?;

        let link: Arc<dyn DeviceLink> = match self.link {
            Some(link) => link,
            None => Arc::new(HttpLink::new()?),
        };
        let probe: Arc<dyn LivenessProbe> = match self.probe {
            Some(probe) => probe,
            None => Arc::new(RtspProbe::new(
                link.clone(),
                self.config.probe_url(),
                self.config.request_timeout(),
            )),
        };
        let sleeper = self.sleeper.unwrap_or_else(|| Arc::new(ThreadSleeper));

        let retry = RetryPolicy::from_config(&self.config.retry, sleeper);
        let transport = Transport::new(
            link,
            probe,
            retry,
            self.config.command_endpoint(),
            self.config.request_timeout(),
        );

        tracing::info!(host = %self.config.host, "Mebo session opened");
        Ok(Mebo::new(self.config, transport, session))
    }
}
