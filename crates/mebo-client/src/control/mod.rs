//! 闭环关节定位
//!
//! 关节只能通过有符号驱动值（速度语义）移动，没有绝对位置命令。
//! [`PositionController`] 周期性读取姿态、按比例计算驱动值，直到
//! 误差足够小或迭代次数耗尽。
//!
//! # 组成
//!
//! - [`PoseSource`] / [`DriveSink`]：姿态读取与命令发送的接口，
//!   驱动层会话同时实现两者，测试中可以替换为脚本化实现
//! - [`CancellationToken`]：每周期开始时检查
//! - [`ControllerConfig`]：周期、增益、阈值

mod cancel;
mod controller;

pub use cancel::CancellationToken;
pub use controller::{
    ControlOutcome, ControllerConfig, ControllerState, Gain, JointGains, PositionController,
};

use mebo_driver::{DriverError, JointSnapshot};
use mebo_protocol::{CommandRequest, Joint, JointArray, position_in_range};

use crate::error::RobotError;

/// 目标姿态：`None` 表示保持当前位置
pub type Goal = JointArray<Option<i32>>;

/// 从切片构建目标姿态
///
/// 长度必须为 4，每个值必须在 `[0, 100]` 内。
///
/// # Example
///
/// ```
/// use mebo_client::control::goal_from_slice;
///
/// let goal = goal_from_slice(&[Some(60), None, None, Some(100)]).unwrap();
/// assert!(goal_from_slice(&[Some(60), None, None]).is_err());
/// assert!(goal_from_slice(&[Some(160), None, None, None]).is_err());
/// ```
pub fn goal_from_slice(values: &[Option<i32>]) -> Result<Goal, RobotError> {
    let data: [Option<i32>; 4] = values.try_into().map_err(|_| {
        RobotError::invalid_goal(format!(
            "goal must have 4 elements (use None to hold a joint), got {}",
            values.len()
        ))
    })?;
    let goal = Goal::new(data);
    validate_goal(&goal)?;
    Ok(goal)
}

/// 校验目标姿态范围
pub fn validate_goal(goal: &Goal) -> Result<(), RobotError> {
    for (joint, value) in goal.enumerate() {
        match *value {
            Some(v) if !position_in_range(v) => {
                return Err(RobotError::invalid_goal(format!(
                    "{} target {} outside [0, 100]",
                    joint, v
                )));
            },
            _ => {},
        }
    }
    Ok(())
}

/// 目标是否只涉及夹爪
pub(crate) fn goal_is_claw_only(goal: &Goal) -> bool {
    Joint::DRIVEN.iter().all(|j| goal[*j].is_none())
}

/// 姿态来源
pub trait PoseSource {
    /// 读取一次整体快照
    fn sample(&self) -> JointSnapshot;
}

/// 驱动命令去向
pub trait DriveSink {
    /// 发送一次驱动请求，`Ok(false)` 表示传输失败
    fn drive(&self, request: &CommandRequest) -> Result<bool, DriverError>;
}

impl PoseSource for mebo_driver::Mebo {
    fn sample(&self) -> JointSnapshot {
        self.refresh()
    }
}

impl DriveSink for mebo_driver::Mebo {
    fn drive(&self, request: &CommandRequest) -> Result<bool, DriverError> {
        self.send_request(request)
    }
}
