//! 关节状态读取
//!
//! 设备只有逐关节的查询命令，一次完整快照需要 4 次请求。任何一次
//! 失败都不会产生部分更新：快照要么整体替换，要么保持上一次的值。
//!
//! 上一次完整快照保存在读取器内部（`ArcSwapOption`，无锁读取）。
//! 读取失败时返回旧值，绝不返回 0。

use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tracing::{debug, warn};

use mebo_protocol::{DeviceResponse, Joint, JointPosition, parse_joint_reading};

use crate::error::DriverError;

/// 单关节读数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    /// 本次读取成功
    Position(i32),
    /// 本次读取失败，附带该关节上一次已知位置（如果有）
    Stale(Option<i32>),
}

impl Reading {
    /// 可用的位置（新值或旧值）
    pub fn value(&self) -> Option<i32> {
        match *self {
            Reading::Position(v) => Some(v),
            Reading::Stale(v) => v,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Reading::Position(_))
    }
}

/// 整体快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointSnapshot {
    /// 4 个关节全部读取成功
    Fresh(JointPosition),
    /// 读取失败，返回上一次完整快照
    Stale(JointPosition),
    /// 读取失败且从未获得过完整快照
    Unavailable,
}

impl JointSnapshot {
    /// 可用的位置（新值或旧值）
    pub fn position(&self) -> Option<JointPosition> {
        match *self {
            JointSnapshot::Fresh(p) | JointSnapshot::Stale(p) => Some(p),
            JointSnapshot::Unavailable => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, JointSnapshot::Fresh(_))
    }
}

/// 关节状态读取器
///
/// 查询本身由调用方提供（见 [`Mebo::refresh`](crate::Mebo::refresh)），
/// 读取器只负责解析和保存上一次完整快照。
#[derive(Debug, Default)]
pub struct JointStateReader {
    last_known: ArcSwapOption<JointPosition>,
}

impl JointStateReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 上一次完整快照
    pub fn last_known(&self) -> Option<JointPosition> {
        self.last_known.load_full().map(|p| *p)
    }

    /// 读取单个关节
    ///
    /// 不修改保存的快照。
    pub fn query_with<F>(&self, joint: Joint, send: F) -> Reading
    where
        F: FnOnce(Joint) -> Result<DeviceResponse, DriverError>,
    {
        match read_joint(joint, send) {
            Some(value) => Reading::Position(value),
            None => Reading::Stale(self.last_known().map(|p| p[joint])),
        }
    }

    /// 依次读取 4 个关节
    ///
    /// 第一次失败即停止，后续关节不再查询。
    pub fn refresh_with<F>(&self, mut send: F) -> JointSnapshot
    where
        F: FnMut(Joint) -> Result<DeviceResponse, DriverError>,
    {
        let mut position = JointPosition::default();
        for joint in Joint::ALL {
            match read_joint(joint, &mut send) {
                Some(value) => position[joint] = value,
                None => return self.fallback(),
            }
        }

        self.last_known.store(Some(Arc::new(position)));
        debug!(?position, "joint snapshot refreshed");
        JointSnapshot::Fresh(position)
    }

    fn fallback(&self) -> JointSnapshot {
        match self.last_known() {
            Some(p) => JointSnapshot::Stale(p),
            None => JointSnapshot::Unavailable,
        }
    }
}

fn read_joint<F>(joint: Joint, send: F) -> Option<i32>
where
    F: FnOnce(Joint) -> Result<DeviceResponse, DriverError>,
{
    let response = match send(joint) {
        Ok(r) => r,
        Err(e) => {
            warn!(%joint, error = %e, "joint query failed");
            return None;
        },
    };
    match parse_joint_reading(joint, response.text()) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(%joint, error = %e, "error parsing joint state");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(text: &str) -> Result<DeviceResponse, DriverError> {
        Ok(DeviceResponse {
            response: text.to_string(),
        })
    }

    fn timeout() -> Result<DeviceResponse, DriverError> {
        Err(DriverError::Transport {
            attempts: 5,
            last: "request timed out".to_string(),
        })
    }

    fn healthy(joint: Joint) -> Result<DeviceResponse, DriverError> {
        match joint {
            Joint::Arm => reply("ARM=40"),
            Joint::WristUd => reply("WRIST_UD=57"),
            Joint::WristRotate => reply("WRIST_ROTATE=48"),
            Joint::Claw => reply("CLAW=1"),
        }
    }

    #[test]
    fn test_unavailable_before_first_snapshot() {
        let reader = JointStateReader::new();
        assert_eq!(reader.refresh_with(|_| timeout()), JointSnapshot::Unavailable);
        assert_eq!(reader.query_with(Joint::Arm, |_| timeout()), Reading::Stale(None));
    }

    #[test]
    fn test_fresh_snapshot_replaces_last_known() {
        let reader = JointStateReader::new();
        let snapshot = reader.refresh_with(healthy);

        let expected = JointPosition::new([40, 57, 48, 1]);
        assert_eq!(snapshot, JointSnapshot::Fresh(expected));
        assert_eq!(reader.last_known(), Some(expected));
    }

    #[test]
    fn test_partial_failure_keeps_previous_snapshot() {
        let reader = JointStateReader::new();
        reader.refresh_with(healthy);

        let mut calls = 0;
        let snapshot = reader.refresh_with(|joint| {
            calls += 1;
            match joint {
                Joint::Arm => reply("ARM=70"),
                Joint::WristUd => timeout(),
                _ => healthy(joint),
            }
        });

        let previous = JointPosition::new([40, 57, 48, 1]);
        assert_eq!(snapshot, JointSnapshot::Stale(previous));
        assert_eq!(reader.last_known(), Some(previous));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_prefix_mismatch_is_stale_not_zero() {
        let reader = JointStateReader::new();
        reader.refresh_with(healthy);

        let reading = reader.query_with(Joint::WristUd, |_| reply("WRIST_ROTATE=12"));
        assert_eq!(reading, Reading::Stale(Some(57)));

        let reading = reader.query_with(Joint::Arm, |_| reply("ARM=-4"));
        assert_eq!(reading, Reading::Stale(Some(40)));
        assert_eq!(reading.value(), Some(40));
    }

    #[test]
    fn test_single_query_does_not_update_snapshot() {
        let reader = JointStateReader::new();
        reader.refresh_with(healthy);

        let reading = reader.query_with(Joint::Claw, |_| reply("CLAW=80"));
        assert_eq!(reading, Reading::Position(80));
        assert!(reading.is_fresh());
        assert_eq!(reader.last_known().unwrap()[Joint::Claw], 1);
    }
}
