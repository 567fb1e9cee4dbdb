//! Client 层 Mebo Builder
//!
//! 在驱动层 Builder 之上加入初始化序列和安全/控制配置。

use std::sync::Arc;
use tracing::{debug, info, warn};

use mebo_driver::{DeviceLink, LivenessProbe, MeboBuilder as DriverBuilder, Sleeper};
use mebo_protocol::CommandKind;

use crate::config::MeboConfig;
use crate::error::RobotError;
use crate::robot::Mebo;

/// Client 层 Mebo Builder
///
/// # 示例
///
/// ```rust,no_run
/// use mebo_client::{MeboBuilder, MeboConfig};
///
/// # fn main() -> Result<(), mebo_client::RobotError> {
/// // 默认配置
/// let robot = MeboBuilder::new().build()?;
/// # drop(robot);
///
/// // 从配置文件
/// let config = MeboConfig::load_from_file("mebo.toml")?;
/// let robot = MeboBuilder::new().config(config).build()?;
/// # drop(robot);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MeboBuilder {
    config: MeboConfig,
    link: Option<Arc<dyn DeviceLink>>,
    probe: Option<Arc<dyn LivenessProbe>>,
    sleeper: Option<Arc<dyn Sleeper>>,
    skip_init: bool,
}

impl MeboBuilder {
    /// 创建新的 Builder
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用完整配置
    pub fn config(mut self, config: MeboConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置设备主机
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.device.host = host.into();
        self
    }

    /// 替换设备链路
    pub fn link(mut self, link: Arc<dyn DeviceLink>) -> Self {
        self.link = Some(link);
        self
    }

    /// 替换存活探测
    pub fn probe(mut self, probe: Arc<dyn LivenessProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// 替换时钟
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// 跳过初始化序列和首次姿态读取
    pub fn skip_init(mut self, skip: bool) -> Self {
        self.skip_init = skip;
        self
    }

    /// 构建机器人实例
    ///
    /// 依次发送初始化序列（单条失败只记录日志），然后读取一次姿态。
    ///
    /// # Errors
    /// - `RobotError::ConfigError` / `RobotError::Driver(Config)`: 配置无效
    /// - `RobotError::Driver(SessionActive)`: 主机已有活动会话
    pub fn build(self) -> Result<Mebo, RobotError> {
        self.config.validate()?;

        let mut driver = DriverBuilder::new().config(self.config.device.clone());
        if let Some(link) = self.link {
            driver = driver.link(link);
        }
        if let Some(probe) = self.probe {
            driver = driver.probe(probe);
        }
        if let Some(sleeper) = self.sleeper {
            driver = driver.sleeper(sleeper);
        }
        let driver = driver.build()?;

        if !self.skip_init {
            for kind in CommandKind::INIT_SEQUENCE {
                if !driver.send(kind)? {
                    warn!(command = %kind, "init command failed");
                }
            }
            let snapshot = driver.refresh();
            debug!(?snapshot, "initial joint state");
        }

        info!(host = %driver.host(), "Initialized robot");
        Ok(Mebo::new(driver, self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mebo_driver::mock::{MockLink, MockProbe, RecordingSleeper};
    use mebo_driver::{DriverError, JointSnapshot};
    use mebo_protocol::JointPosition;
    use serial_test::serial;

    fn mock_builder(host: &str, link: Arc<MockLink>) -> MeboBuilder {
        MeboBuilder::new()
            .host(host)
            .link(link)
            .probe(Arc::new(MockProbe::new()))
            .sleeper(Arc::new(RecordingSleeper::new()))
    }

    #[test]
    #[serial]
    fn test_build_sends_init_sequence_then_reads_pose() {
        let link = Arc::new(MockLink::with_pose(JointPosition::new([40, 50, 60, 70])));
        let robot = mock_builder("builder-init", link.clone()).build().unwrap();

        let fragments = link.fragments();
        assert_eq!(fragments.len(), CommandKind::INIT_SEQUENCE.len() + 4);
        assert_eq!(fragments[0], "mebolink_message_send(BAT=?)");
        assert_eq!(fragments[1], "get_ssid()");
        assert!(fragments[7].starts_with("mebolink_message_send(!"));
        assert!(fragments[8].ends_with("ARM=?)"));

        assert_eq!(
            robot.driver().last_known(),
            Some(JointPosition::new([40, 50, 60, 70]))
        );
    }

    #[test]
    #[serial]
    fn test_init_failures_do_not_abort() {
        let link = Arc::new(MockLink::new());
        link.set_failing(true);
        let robot = mock_builder("builder-failing", link.clone())
            .build()
            .unwrap();
        assert!(matches!(robot.joint_state(), JointSnapshot::Unavailable));
    }

    #[test]
    #[serial]
    fn test_skip_init_sends_nothing() {
        let link = Arc::new(MockLink::new());
        let _robot = mock_builder("builder-skip", link.clone())
            .skip_init(true)
            .build()
            .unwrap();
        assert!(link.requests().is_empty());
    }

    #[test]
    #[serial]
    fn test_second_session_rejected() {
        let link = Arc::new(MockLink::new());
        let _first = mock_builder("builder-dup", link.clone()).skip_init(true).build().unwrap();
        let second = mock_builder("builder-dup", link).skip_init(true).build();
        assert!(matches!(
            second,
            Err(RobotError::Driver(DriverError::SessionActive { .. }))
        ));
    }
}
