//! 设备会话
//!
//! [`Mebo`] 持有一个设备主机的全部会话状态：序列号计数器、传输层、
//! 关节状态读取器以及主机占用凭证。
//!
//! 序列号计数器和发送路径共用一把锁：编码和发送在同一临界区内完成，
//! 设备收到的序列号顺序与实际发送顺序一致。

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

use mebo_protocol::{
    CommandKind, CommandRequest, CommandSet, DeviceResponse, Joint, JointPosition,
    SequenceCounter,
};

use crate::config::DeviceConfig;
use crate::error::DriverError;
use crate::retry::Sleeper;
use crate::session::SessionGuard;
use crate::state::{JointSnapshot, JointStateReader, Reading};
use crate::transport::Transport;

/// Mebo 设备会话（驱动层 API）
///
/// 通过 [`MeboBuilder`](crate::MeboBuilder) 创建。同一主机同时只能
/// 存在一个会话，会话析构时释放主机。
pub struct Mebo {
    config: DeviceConfig,
    transport: Transport,
    sequence: Mutex<SequenceCounter>,
    state: JointStateReader,
    _session: SessionGuard,
}

impl Mebo {
    pub(crate) fn new(config: DeviceConfig, transport: Transport, session: SessionGuard) -> Self {
        Self {
            config,
            transport,
            sequence: Mutex::new(SequenceCounter::new()),
            state: JointStateReader::new(),
            _session: session,
        }
    }

    /// 设备主机
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// 设备配置
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// 会话共享时钟（重试等待与上层步进等待使用同一个）
    pub fn sleeper(&self) -> Arc<dyn Sleeper> {
        self.transport.retry_policy().sleeper().clone()
    }

    /// 已分配的序列号数量
    pub fn sequence_issued(&self) -> u32 {
        self.sequence.lock().issued()
    }

    /// 发送并等待响应
    ///
    /// # Errors
    /// - `DriverError::Protocol`: 命令集合无效（空集合、缺少参数），不会发送
    /// - `DriverError::Transport`: 重试耗尽
    pub fn send_query(&self, commands: impl Into<CommandSet>) -> Result<DeviceResponse, DriverError> {
        let commands = commands.into();
        let mut seq = self.sequence.lock();
        let query = commands.encode_query(&mut seq)?;
        trace!(%query, "sending query");
        self.transport.send_query(&query)
    }

    /// 发送不关心响应的命令
    ///
    /// 返回 `Ok(false)` 表示重试耗尽（已记录日志）；
    /// 命令集合本身无效时返回 `Err`。
    pub fn send(&self, commands: impl Into<CommandSet>) -> Result<bool, DriverError> {
        let commands = commands.into();
        let mut seq = self.sequence.lock();
        let query = commands.encode_query(&mut seq)?;
        trace!(%query, "sending command");
        Ok(self.transport.send_fire_and_forget(&query))
    }

    /// 发送一次驱动请求（多命令合并为一个 HTTP 请求）
    ///
    /// 发送前等待 `joined_send_delay_ms`。空请求直接返回 `Ok(true)`。
    pub fn send_request(&self, request: &CommandRequest) -> Result<bool, DriverError> {
        if request.is_empty() {
            return Ok(true);
        }
        self.sleeper().sleep(self.config.joined_send_delay());
        debug!(?request, "sending drive request");
        self.send(request)
    }

    /// 所有驱动轴归零
    pub fn stop(&self) -> Result<bool, DriverError> {
        self.send_request(&CommandRequest::stop())
    }

    /// 读取单个关节（不更新保存的快照）
    pub fn query_joint(&self, joint: Joint) -> Reading {
        self.state
            .query_with(joint, |j| self.send_query(CommandKind::joint_query(j)))
    }

    /// 刷新整体快照
    pub fn refresh(&self) -> JointSnapshot {
        self.state
            .refresh_with(|j| self.send_query(CommandKind::joint_query(j)))
    }

    /// 上一次完整快照
    pub fn last_known(&self) -> Option<JointPosition> {
        self.state.last_known()
    }
}

impl std::fmt::Debug for Mebo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mebo")
            .field("host", &self.config.host)
            .field("sequence_issued", &self.sequence_issued())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MeboBuilder;
    use crate::mock::{MockLink, MockProbe, RecordingSleeper};
    use mebo_protocol::{Command, DriveAxis, ProtocolError};
    use serial_test::serial;
    use std::time::Duration;

    struct Fixture {
        link: Arc<MockLink>,
        probe: Arc<MockProbe>,
        sleeper: Arc<RecordingSleeper>,
        mebo: Mebo,
    }

    fn fixture(host: &str, link: MockLink) -> Fixture {
        let link = Arc::new(link);
        let probe = Arc::new(MockProbe::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        let mebo = MeboBuilder::new()
            .host(host)
            .link(link.clone())
            .probe(probe.clone())
            .sleeper(sleeper.clone())
            .build()
            .unwrap();
        Fixture {
            link,
            probe,
            sleeper,
            mebo,
        }
    }

    #[test]
    #[serial]
    fn test_sequence_shared_across_paths() {
        let f = fixture("mebo-driver-seq", MockLink::new());

        f.mebo
            .send(Command::with_value(CommandKind::ArmUp, 5))
            .unwrap();
        f.mebo.send(CommandKind::CalAll).unwrap();
        f.mebo
            .send_request(&CommandRequest::new().with(DriveAxis::WheelLeft, 0))
            .unwrap();
        // 静态查询不取号
        f.mebo.send_query(CommandKind::Battery).unwrap();

        assert_eq!(f.mebo.sequence_issued(), 3);
        assert_eq!(
            f.link.fragments(),
            vec![
                "mebolink_message_send(!AGFA)",
                "mebolink_message_send(!BD_)",
                "mebolink_message_send(!CFAA)",
                "mebolink_message_send(BAT=?)",
            ]
        );
    }

    #[test]
    #[serial]
    fn test_invalid_set_not_sent() {
        let f = fixture("mebo-driver-invalid", MockLink::new());

        let result = f.mebo.send(CommandKind::ClawPosition);
        assert!(matches!(
            result,
            Err(DriverError::Protocol(ProtocolError::MissingValue(CommandKind::ClawPosition)))
        ));
        assert!(f.link.requests().is_empty());
        assert_eq!(f.mebo.sequence_issued(), 0);
    }

    #[test]
    #[serial]
    fn test_fire_and_forget_reports_failure() {
        let f = fixture("mebo-driver-faf", MockLink::new());
        f.link.set_failing(true);

        assert!(!f.mebo.send(CommandKind::LightOn).unwrap());
        assert_eq!(f.probe.count(), 5);
        // 重试复用同一个序列号
        assert_eq!(f.mebo.sequence_issued(), 1);
    }

    #[test]
    #[serial]
    fn test_joined_send_waits_before_sending() {
        let f = fixture("mebo-driver-joined", MockLink::new());

        f.mebo.stop().unwrap();

        assert_eq!(f.sleeper.sleeps(), vec![Duration::from_millis(10)]);
        assert_eq!(f.link.requests().len(), 1);
        assert_eq!(f.link.fragments().len(), 5);
    }

    #[test]
    #[serial]
    fn test_refresh_and_stale_fallback() {
        let f = fixture(
            "mebo-driver-refresh",
            MockLink::with_pose(JointPosition::new([40, 57, 48, 1])),
        );

        assert_eq!(
            f.mebo.refresh(),
            JointSnapshot::Fresh(JointPosition::new([40, 57, 48, 1]))
        );

        f.link.set_position(Joint::Arm, 70);
        f.link
            .set_joint_reply(Joint::WristRotate, Some("WRIST_UD=11".to_string()));

        assert_eq!(
            f.mebo.refresh(),
            JointSnapshot::Stale(JointPosition::new([40, 57, 48, 1]))
        );
        assert_eq!(f.mebo.query_joint(Joint::Arm), Reading::Position(70));
        assert_eq!(f.mebo.query_joint(Joint::WristRotate), Reading::Stale(Some(48)));
    }

    #[test]
    #[serial]
    fn test_session_released_on_drop() {
        let f = fixture("mebo-driver-drop", MockLink::new());
        let second = MeboBuilder::new()
            .host("mebo-driver-drop")
            .link(Arc::new(MockLink::new()))
            .build();
        assert!(matches!(second, Err(DriverError::SessionActive { .. })));

        drop(f);
        assert!(
            MeboBuilder::new()
                .host("mebo-driver-drop")
                .link(Arc::new(MockLink::new()))
                .build()
                .is_ok()
        );
    }
}
