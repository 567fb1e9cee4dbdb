//! 高层机器人 API
//!
//! [`Mebo`] 在驱动层会话之上提供开环动作（底盘行驶、关节点动、夹爪开合）、
//! 闭环定位、状态查询和抓取/放置宏。
//!
//! 开环动作按步执行：每步读取姿态、经安全限位、发送、等待；遇到限位立即
//! 停止，结束时总是发送一次停止命令。

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use tracing::{info, warn};

use mebo_driver::{JointSnapshot, Reading, Sleeper};
use mebo_protocol::{
    Command, CommandKind, CommandRequest, DeviceResponse, DriveAxis, Joint, JointPosition,
    ProtocolError, parse_led_state,
};

use crate::config::{MeboConfig, MotionConfig};
use crate::control::{CancellationToken, ControlOutcome, Goal, PositionController};
use crate::error::RobotError;
use crate::safety::SafetyLimiter;

/// 抓取前的姿态（夹爪张开）
pub const PICK_APPROACH: [i32; 4] = [100, 67, 48, 1];
/// 抓取后抬起的姿态（夹爪闭合）
pub const PICK_LIFT: [i32; 4] = [90, 67, 48, 100];
/// 放置时放低的姿态
pub const PLACE_LOWER: [i32; 4] = [65, 67, 48, 100];

/// 底盘行驶方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    /// 对应的轮速请求
    pub fn request(self, power: i32) -> CommandRequest {
        let (left, right) = match self {
            Direction::Forward => (power, power),
            Direction::Backward => (-power, -power),
            Direction::Left => (-power, power),
            Direction::Right => (power, -power),
        };
        CommandRequest::new()
            .with(DriveAxis::WheelLeft, left)
            .with(DriveAxis::WheelRight, right)
    }
}

/// 关节点动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jog {
    ArmUp,
    ArmDown,
    WristUp,
    WristDown,
    WristLeft,
    WristRight,
}

impl Jog {
    /// 对应的驱动请求（轮子为 0）
    pub fn request(self, power: i32) -> CommandRequest {
        let (axis, value) = match self {
            Jog::ArmUp => (DriveAxis::Arm, power),
            Jog::ArmDown => (DriveAxis::Arm, -power),
            Jog::WristUp => (DriveAxis::WristUd, power),
            Jog::WristDown => (DriveAxis::WristUd, -power),
            Jog::WristLeft => (DriveAxis::WristRotate, power),
            Jog::WristRight => (DriveAxis::WristRotate, -power),
        };
        CommandRequest::new()
            .with(DriveAxis::WheelLeft, 0)
            .with(DriveAxis::WheelRight, 0)
            .with(axis, value)
    }
}

/// Mebo 机器人（高层 API）
///
/// 通过 [`MeboBuilder`](crate::MeboBuilder) 创建，创建时发送初始化序列并读取一次姿态。
pub struct Mebo {
    driver: mebo_driver::Mebo,
    limiter: SafetyLimiter,
    controller: Mutex<PositionController>,
    motion: MotionConfig,
    default_speed: AtomicI32,
    cancel: CancellationToken,
    sleeper: Arc<dyn Sleeper>,
}

impl Mebo {
    pub(crate) fn new(driver: mebo_driver::Mebo, config: MeboConfig) -> Self {
        let sleeper = driver.sleeper();
        let limiter = SafetyLimiter::new(config.safety);
        let controller = PositionController::new(config.controller, limiter.clone(), sleeper.clone());
        Self {
            driver,
            limiter,
            controller: Mutex::new(controller),
            default_speed: AtomicI32::new(config.motion.default_speed),
            motion: config.motion,
            cancel: CancellationToken::new(),
            sleeper,
        }
    }

    /// 驱动层会话
    pub fn driver(&self) -> &mebo_driver::Mebo {
        &self.driver
    }

    /// 安全限位器
    pub fn limiter(&self) -> &SafetyLimiter {
        &self.limiter
    }

    /// 取消令牌（克隆后可交给其它线程，用于中断 [`set_joint_positions`](Self::set_joint_positions)）
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    // ==================== 状态查询 ====================

    /// 读取 4 个关节
    pub fn joint_state(&self) -> JointSnapshot {
        self.driver.refresh()
    }

    /// 读取单个关节
    pub fn query_joint(&self, joint: Joint) -> Reading {
        self.driver.query_joint(joint)
    }

    /// 电池查询（原始响应文本）
    pub fn battery(&self) -> Result<String, RobotError> {
        self.query_text(CommandKind::Battery)
    }

    /// 固件版本
    pub fn version(&self) -> Result<String, RobotError> {
        self.query_text(CommandKind::VersionQuery)
    }

    /// 热点名称
    pub fn ssid(&self) -> Result<String, RobotError> {
        self.query_text(CommandKind::GetSsid)
    }

    /// 读取寄存器
    pub fn query_reg(&self, register: u16) -> Result<String, RobotError> {
        let command = Command::with_value(CommandKind::QueryReg, i32::from(register));
        Ok(self.driver.send_query(command)?.response)
    }

    /// 寄存器写入闪存
    pub fn save_reg(&self) -> Result<String, RobotError> {
        self.query_text(CommandKind::SaveReg)
    }

    /// 事件查询
    pub fn query_event(&self) -> Result<String, RobotError> {
        self.query_text(CommandKind::QueryEvent)
    }

    /// 按命令名发送任意命令（未知命令名立即失败，不发送）
    ///
    /// 驱动类命令与开环动作一样先经过安全限位。
    ///
    /// # Errors
    /// - `RobotError::Protocol`: 未知命令名，或驱动命令缺少参数
    /// - `RobotError::SafetyLimit`: 驱动命令被限位拒绝
    pub fn raw(&self, name: &str, value: Option<i32>) -> Result<DeviceResponse, RobotError> {
        let command = Command::parse(name, value)?;
        let Some(axis) = DriveAxis::from_command(command.kind) else {
            return Ok(self.driver.send_query(command)?);
        };

        let value = command.value.ok_or(ProtocolError::MissingValue(command.kind))?;
        let request = CommandRequest::new().with(axis, value);
        let current = if request.touches_joints() {
            self.current_pose()?
        } else {
            JointPosition::default()
        };
        let limited = self.limiter.limit(&request, &current).map_err(|rejection| {
            warn!(command = %command.kind, %rejection, "raw drive command rejected");
            rejection
        })?;
        Ok(self.driver.send_query(&limited)?)
    }

    fn query_text(&self, kind: CommandKind) -> Result<String, RobotError> {
        Ok(self.driver.send_query(kind)?.response)
    }

    // ==================== 设备命令 ====================

    /// 切换夹爪灯，返回切换后的状态（`true` 为亮）
    pub fn toggle_claw_led(&self) -> Result<bool, RobotError> {
        let state = self.driver.send_query(CommandKind::ClawLedState)?;
        let on = parse_led_state(state.text());
        let next = if on {
            CommandKind::LightOff
        } else {
            CommandKind::LightOn
        };
        self.driver.send_query(next)?;
        Ok(!on)
    }

    /// 校准单个关节
    pub fn calibrate(&self, joint: Joint) -> Result<bool, RobotError> {
        info!(%joint, "calibrating joint");
        Ok(self.driver.send(CommandKind::calibration(joint))?)
    }

    /// 校准全部关节
    pub fn calibrate_all(&self) -> Result<bool, RobotError> {
        info!("calibrating all joints");
        Ok(self.driver.send(CommandKind::CalAll)?)
    }

    /// 重启设备
    pub fn reboot(&self) -> Result<bool, RobotError> {
        warn!(host = %self.driver.host(), "rebooting device");
        Ok(self.driver.send(CommandKind::RebootCmd)?)
    }

    /// 等待 `delay` 后停止所有驱动轴
    pub fn stop(&self, delay: Duration) -> Result<bool, RobotError> {
        self.sleeper.sleep(delay);
        Ok(self.driver.stop()?)
    }

    /// 设置默认驱动值
    pub fn set_default_speed(&self, speed: i32) -> Result<(), RobotError> {
        let max_drive = self.limiter.config().max_drive;
        if speed <= 0 || speed > max_drive {
            return Err(RobotError::ConfigError(format!(
                "Invalid default speed: {} (must be within [1, {}])",
                speed, max_drive
            )));
        }
        self.default_speed.store(speed, Ordering::Relaxed);
        Ok(())
    }

    /// 默认驱动值
    pub fn default_speed(&self) -> i32 {
        self.default_speed.load(Ordering::Relaxed)
    }

    // ==================== 开环动作 ====================

    /// 底盘行驶 `steps` 步（`power` 为 `None` 时使用默认驱动值）
    pub fn drive(&self, direction: Direction, power: Option<i32>, steps: u32) -> Result<(), RobotError> {
        let power = power.unwrap_or_else(|| self.default_speed());
        self.do_steps(direction.request(power), steps, self.drive_step())
    }

    pub fn forward(&self, power: i32, steps: u32) -> Result<(), RobotError> {
        self.drive(Direction::Forward, Some(power), steps)
    }

    pub fn backward(&self, power: i32, steps: u32) -> Result<(), RobotError> {
        self.drive(Direction::Backward, Some(power), steps)
    }

    pub fn left(&self, power: i32, steps: u32) -> Result<(), RobotError> {
        self.drive(Direction::Left, Some(power), steps)
    }

    pub fn right(&self, power: i32, steps: u32) -> Result<(), RobotError> {
        self.drive(Direction::Right, Some(power), steps)
    }

    /// 关节点动 `steps` 步
    pub fn jog(&self, jog: Jog, power: Option<i32>, steps: u32) -> Result<(), RobotError> {
        let power = power.unwrap_or_else(|| self.default_speed());
        self.do_steps(jog.request(power), steps, self.joint_step())
    }

    pub fn arm_up(&self, power: i32, steps: u32) -> Result<(), RobotError> {
        self.jog(Jog::ArmUp, Some(power), steps)
    }

    pub fn arm_down(&self, power: i32, steps: u32) -> Result<(), RobotError> {
        self.jog(Jog::ArmDown, Some(power), steps)
    }

    pub fn wrist_up(&self, power: i32, steps: u32) -> Result<(), RobotError> {
        self.jog(Jog::WristUp, Some(power), steps)
    }

    pub fn wrist_down(&self, power: i32, steps: u32) -> Result<(), RobotError> {
        self.jog(Jog::WristDown, Some(power), steps)
    }

    pub fn wrist_left(&self, power: i32, steps: u32) -> Result<(), RobotError> {
        self.jog(Jog::WristLeft, Some(power), steps)
    }

    pub fn wrist_right(&self, power: i32, steps: u32) -> Result<(), RobotError> {
        self.jog(Jog::WristRight, Some(power), steps)
    }

    /// 张开夹爪 `steps`（开度减小）
    pub fn claw_open(&self, steps: i32) -> Result<bool, RobotError> {
        self.move_claw(-steps)
    }

    /// 闭合夹爪 `steps`（开度增大）
    pub fn claw_close(&self, steps: i32) -> Result<bool, RobotError> {
        self.move_claw(steps)
    }

    /// 夹爪开合默认步长
    pub fn claw_step(&self) -> i32 {
        self.motion.claw_step
    }

    /// 设置夹爪绝对开度（钳位到配置范围）
    pub fn set_claw(&self, aperture: i32) -> Result<bool, RobotError> {
        let request = CommandRequest::new().with(DriveAxis::Claw, aperture);
        let current = self.driver.last_known().unwrap_or_default();
        // 只含夹爪的请求不会被拒绝
        match self.limiter.limit(&request, &current) {
            Ok(limited) => Ok(self.driver.send_request(&limited)?),
            Err(rejection) => {
                warn!(%rejection, "claw request rejected");
                Ok(false)
            },
        }
    }

    fn move_claw(&self, offset: i32) -> Result<bool, RobotError> {
        let current = self.current_pose()?;
        self.set_claw(current[Joint::Claw].saturating_add(offset))
    }

    fn current_pose(&self) -> Result<JointPosition, RobotError> {
        self.driver
            .refresh()
            .position()
            .ok_or(RobotError::StateUnavailable)
    }

    fn drive_step(&self) -> Duration {
        Duration::from_millis(self.motion.drive_step_ms)
    }

    fn joint_step(&self) -> Duration {
        Duration::from_millis(self.motion.joint_step_ms)
    }

    fn do_steps(&self, request: CommandRequest, steps: u32, step: Duration) -> Result<(), RobotError> {
        let result = self.run_steps(&request, steps, step);
        let stopped = self.driver.stop()?;
        if !stopped {
            warn!("stop command was not acknowledged");
        }
        result
    }

    fn run_steps(&self, request: &CommandRequest, steps: u32, step: Duration) -> Result<(), RobotError> {
        for i in 0..steps {
            // 只含轮子的请求不需要姿态
            let current = if request.touches_joints() {
                self.current_pose()?
            } else {
                JointPosition::default()
            };

            let limited = match self.limiter.limit(request, &current) {
                Ok(limited) => limited,
                Err(rejection) => {
                    warn!(step = i, %rejection, "safety limit reached, stopping");
                    return Ok(());
                },
            };
            self.driver.send_request(&limited)?;
            self.sleeper.sleep(step);
        }
        Ok(())
    }

    // ==================== 闭环定位 ====================

    /// 把关节驱动到目标姿态
    ///
    /// 同一会话同时只能运行一个控制器；运行前清除取消标志。
    ///
    /// # Errors
    /// - `RobotError::ControllerBusy`: 已有控制器在运行
    /// - `RobotError::InvalidGoal`: 目标超出范围
    /// - `RobotError::StateUnavailable`: 起始时无法获得姿态
    pub fn set_joint_positions(&self, goal: &Goal) -> Result<ControlOutcome, RobotError> {
        let mut controller = self.controller.try_lock().ok_or(RobotError::ControllerBusy)?;
        self.cancel.reset();
        controller.run(goal, &self.driver, &self.driver, &self.cancel)
    }

    /// 抓取：下探张开 → 闭合 → 抬起
    pub fn pick(&self) -> Result<(), RobotError> {
        self.set_joint_positions(&Goal::new(PICK_APPROACH.map(Some)))?;
        self.claw_close(100)?;
        self.set_joint_positions(&Goal::new(PICK_LIFT.map(Some)))?;
        Ok(())
    }

    /// 放置：放低 → 前进 → 张开 → 后退 → 回到抓取前姿态
    pub fn place(&self) -> Result<(), RobotError> {
        self.set_joint_positions(&Goal::new(PLACE_LOWER.map(Some)))?;
        self.forward(25, 2)?;
        self.claw_open(100)?;
        self.backward(25, 2)?;
        self.set_joint_positions(&Goal::new(PICK_APPROACH.map(Some)))?;
        Ok(())
    }
}

impl std::fmt::Debug for Mebo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mebo")
            .field("driver", &self.driver)
            .field("default_speed", &self.default_speed())
            .finish_non_exhaustive()
    }
}
