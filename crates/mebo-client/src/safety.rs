//! 安全限位
//!
//! 在编码和发送之前检查每一个驱动请求：关节已经在限位附近时，
//! 不允许继续朝限位方向驱动。
//!
//! - 轮子和驱动关节的数值钳位到 `±max_drive`（两字符编码只有 12 位）
//! - 数值为 0 的项直接放行
//! - 大臂/腕部：方向取数值符号（反向关节取反），当前位置 ≥ 上限且方向
//!   为增大，或当前位置 ≤ 下限且方向为减小时，整个请求被拒绝
//! - 夹爪：目标开度钳位到 `[claw_min, claw_max]`
//! - 轮子：钳位后放行

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mebo_protocol::{CommandRequest, Joint, JointArray, JointPosition, POSITION_MAX, POSITION_MIN};

/// 安全限位配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// 驱动关节下限
    pub lower_bound: i32,
    /// 驱动关节上限
    pub upper_bound: i32,
    /// 夹爪最小开度
    pub claw_min: i32,
    /// 夹爪最大开度
    pub claw_max: i32,
    /// 轮子和驱动关节的最大驱动值（绝对值）
    pub max_drive: i32,
    /// 驱动值符号与位置变化方向相反的关节
    pub inverted: JointArray<bool>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            lower_bound: 10,
            upper_bound: 90,
            claw_min: 0,
            claw_max: 100,
            max_drive: 100,
            inverted: JointArray::new([true, false, false, false]),
        }
    }
}

impl SafetyConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<(), String> {
        let in_range = |v: i32| (POSITION_MIN..=POSITION_MAX).contains(&v);
        if !in_range(self.lower_bound) || !in_range(self.upper_bound) {
            return Err(format!(
                "joint bounds must be within [{}, {}]",
                POSITION_MIN, POSITION_MAX
            ));
        }
        if self.lower_bound >= self.upper_bound {
            return Err(format!(
                "lower_bound ({}) must be below upper_bound ({})",
                self.lower_bound, self.upper_bound
            ));
        }
        if !in_range(self.claw_min) || !in_range(self.claw_max) || self.claw_min > self.claw_max {
            return Err(format!(
                "invalid claw range [{}, {}]",
                self.claw_min, self.claw_max
            ));
        }
        if !(1..=MAX_ENCODABLE_DRIVE).contains(&self.max_drive) {
            return Err(format!(
                "max_drive ({}) must be within [1, {}]",
                self.max_drive, MAX_ENCODABLE_DRIVE
            ));
        }
        Ok(())
    }
}

/// 两字符字段可表示的最大有符号驱动值
pub const MAX_ENCODABLE_DRIVE: i32 = 2047;

/// 被拒绝的驱动请求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{joint} at {position} would move past limit {bound}")]
pub struct SafetyRejection {
    /// 触发限位的关节
    pub joint: Joint,
    /// 当前位置
    pub position: i32,
    /// 触及的限位
    pub bound: i32,
}

/// 安全限位器
#[derive(Debug, Clone, Default)]
pub struct SafetyLimiter {
    config: SafetyConfig,
}

impl SafetyLimiter {
    pub fn new(config: SafetyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    /// 夹爪开度钳位到 `[claw_min, claw_max]`
    pub fn clamp_claw(&self, aperture: i32) -> i32 {
        aperture.clamp(self.config.claw_min, self.config.claw_max)
    }

    /// 驱动值钳位到 `±max_drive`
    pub fn clamp_drive(&self, value: i32) -> i32 {
        value.clamp(-self.config.max_drive, self.config.max_drive)
    }

    /// 关节的驱动方向是否与位置方向相反
    pub fn is_inverted(&self, joint: Joint) -> bool {
        self.config.inverted[joint]
    }

    /// 检查并修正驱动请求
    pub fn limit(
        &self,
        request: &CommandRequest,
        current: &JointPosition,
    ) -> Result<CommandRequest, SafetyRejection> {
        let mut limited = *request;

        for (axis, value) in request.iter() {
            let Some(joint) = axis.joint() else {
                limited.set(axis, self.clamp_drive(value));
                continue;
            };

            if joint.is_claw() {
                limited.set(axis, self.clamp_claw(value));
                continue;
            }
            let value = self.clamp_drive(value);
            limited.set(axis, value);
            if value == 0 {
                continue;
            }

            let direction = if self.is_inverted(joint) {
                -value.signum()
            } else {
                value.signum()
            };
            let position = current[joint];

            if direction > 0 && position >= self.config.upper_bound {
                return Err(SafetyRejection {
                    joint,
                    position,
                    bound: self.config.upper_bound,
                });
            }
            if direction < 0 && position <= self.config.lower_bound {
                return Err(SafetyRejection {
                    joint,
                    position,
                    bound: self.config.lower_bound,
                });
            }
        }

        Ok(limited)
    }
}
