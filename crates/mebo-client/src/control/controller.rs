//! 比例位置控制器
//!
//! 每个周期：
//!
//! 1. 检查取消令牌
//! 2. 等待一个周期后读取姿态（读取不可用时本周期跳过，但计入迭代次数）
//! 3. 对每个参与驱动的关节：`delta = (goal - current) * multiplier / divisor`
//! 4. 钳位到 `±max_speed`，反向关节取反
//! 5. 非夹爪关节的最大 `|delta|` 小于 `stop_threshold` 时发送保持命令并收敛；
//!    否则迭代次数超过 `max_loops` 时发送保持命令并结束
//! 6. 否则经安全限位后发送（轮子为 0，夹爪为目标值）
//!
//! 保持命令：所有驱动轴归零，夹爪设为目标值（目标未指定夹爪时为起始开度）。

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use mebo_driver::Sleeper;
use mebo_protocol::{CommandRequest, DriveAxis, Joint, JointArray, JointPosition};

use super::cancel::CancellationToken;
use super::{DriveSink, Goal, PoseSource, validate_goal};
use crate::error::RobotError;
use crate::safety::SafetyLimiter;

/// 同一周期内因限位而重新检查的最大次数（每次清零一个关节）
const MAX_RELIMIT: usize = 3;

/// 比例增益 `multiplier / divisor`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gain {
    pub multiplier: f64,
    pub divisor: f64,
}

impl Gain {
    pub const fn new(multiplier: f64, divisor: f64) -> Self {
        Self {
            multiplier,
            divisor,
        }
    }

    #[inline]
    pub fn apply(&self, error: f64) -> f64 {
        error * self.multiplier / self.divisor
    }
}

/// 各驱动关节的增益
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointGains {
    pub arm: Gain,
    pub wrist_ud: Gain,
    pub wrist_rotate: Gain,
}

impl Default for JointGains {
    fn default() -> Self {
        Self {
            arm: Gain::new(6.0, 3.0),
            wrist_ud: Gain::new(6.0, 1.0),
            wrist_rotate: Gain::new(6.0, 1.0),
        }
    }
}

impl JointGains {
    /// 关节增益（夹爪不参与比例控制）
    pub fn for_joint(&self, joint: Joint) -> Option<Gain> {
        match joint {
            Joint::Arm => Some(self.arm),
            Joint::WristUd => Some(self.wrist_ud),
            Joint::WristRotate => Some(self.wrist_rotate),
            Joint::Claw => None,
        }
    }
}

/// 控制器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// 控制周期（毫秒）
    pub tick_ms: u64,
    /// 最大驱动迭代次数（超过后保持）
    pub max_loops: u32,
    /// 单周期驱动值上限
    pub max_speed: f64,
    /// 收敛阈值
    pub stop_threshold: f64,
    /// 与起始姿态差距小于该值的目标关节不参与驱动
    pub min_change: i32,
    /// 比例增益
    pub gains: JointGains,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            max_loops: 15,
            max_speed: 20.0,
            stop_threshold: 3.0,
            min_change: 5,
            gains: JointGains::default(),
        }
    }
}

impl ControllerConfig {
    /// 控制周期
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), RobotError> {
        if self.max_speed <= 0.0 || !self.max_speed.is_finite() {
            return Err(RobotError::ConfigError(format!(
                "Invalid max_speed: {} (must be > 0)",
                self.max_speed
            )));
        }
        if self.stop_threshold < 0.0 || !self.stop_threshold.is_finite() {
            return Err(RobotError::ConfigError(format!(
                "Invalid stop_threshold: {} (must be >= 0)",
                self.stop_threshold
            )));
        }
        if self.min_change < 0 {
            return Err(RobotError::ConfigError(format!(
                "Invalid min_change: {} (must be >= 0)",
                self.min_change
            )));
        }
        for joint in Joint::DRIVEN {
            let gain = self.gains.for_joint(joint);
            if gain.is_none_or(|g| g.divisor == 0.0 || !g.multiplier.is_finite()) {
                return Err(RobotError::ConfigError(format!(
                    "Invalid gain for {}: {:?}",
                    joint, gain
                )));
            }
        }
        Ok(())
    }
}

/// 控制器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// 未运行
    Idle,
    /// 正在采样/驱动
    Sampling,
    /// 误差低于阈值
    Converged,
    /// 迭代次数耗尽
    IterationLimitReached,
    /// 被取消
    Cancelled,
}

impl ControllerState {
    /// 是否为终止状态
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ControllerState::Converged
                | ControllerState::IterationLimitReached
                | ControllerState::Cancelled
        )
    }
}

/// 一次运行的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutcome {
    /// 终止状态
    pub state: ControllerState,
    /// 驱动迭代计数（含跳过的周期）
    pub iterations: u32,
    /// 周期数（姿态读取次数）
    pub samples: u32,
    /// 最后一次可用姿态
    pub last_pose: JointPosition,
}

impl ControlOutcome {
    /// 是否到达目标
    pub fn converged(&self) -> bool {
        self.state == ControllerState::Converged
    }
}

/// 比例位置控制器
pub struct PositionController {
    config: ControllerConfig,
    limiter: SafetyLimiter,
    sleeper: Arc<dyn Sleeper>,
    state: ControllerState,
}

impl PositionController {
    pub fn new(config: ControllerConfig, limiter: SafetyLimiter, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            config,
            limiter,
            sleeper,
            state: ControllerState::Idle,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// 当前状态
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// 计算一个周期的驱动值（未取整）
    ///
    /// 只计算 `active` 为真的驱动关节，其余为 0；夹爪恒为 0。
    pub fn compute_deltas(
        &self,
        target: &JointPosition,
        current: &JointPosition,
        active: &JointArray<bool>,
    ) -> JointArray<f64> {
        let mut deltas = JointArray::splat(0.0);
        for joint in Joint::DRIVEN {
            let Some(gain) = self.config.gains.for_joint(joint) else {
                continue;
            };
            if !active[joint] {
                continue;
            }
            let error = f64::from(target[joint] - current[joint]);
            let delta = gain
                .apply(error)
                .clamp(-self.config.max_speed, self.config.max_speed);
            deltas[joint] = if self.limiter.is_inverted(joint) {
                -delta
            } else {
                delta
            };
        }
        deltas
    }

    /// 运行到终止状态
    ///
    /// 收敛、迭代耗尽、取消都返回 `Ok`；终止时发送保持命令。
    ///
    /// # Errors
    /// - `RobotError::InvalidGoal`: 目标超出范围
    /// - `RobotError::StateUnavailable`: 起始时无法获得姿态
    /// - `RobotError::Driver`: 驱动请求无法编码
    pub fn run<S, D>(
        &mut self,
        goal: &Goal,
        source: &S,
        sink: &D,
        cancel: &CancellationToken,
    ) -> Result<ControlOutcome, RobotError>
    where
        S: PoseSource + ?Sized,
        D: DriveSink + ?Sized,
    {
        validate_goal(goal)?;
        self.state = ControllerState::Sampling;

        let result = self.run_loop(goal, source, sink, cancel);
        self.state = match &result {
            Ok(outcome) => outcome.state,
            Err(_) => ControllerState::Idle,
        };
        result
    }

    fn run_loop<S, D>(
        &self,
        goal: &Goal,
        source: &S,
        sink: &D,
        cancel: &CancellationToken,
    ) -> Result<ControlOutcome, RobotError>
    where
        S: PoseSource + ?Sized,
        D: DriveSink + ?Sized,
    {
        let start = source.sample().position().ok_or(RobotError::StateUnavailable)?;
        let target = JointArray::new(std::array::from_fn(|i| {
            let joint = Joint::ALL[i];
            goal[joint].unwrap_or(start[joint])
        }));
        let claw_goal = self.limiter.clamp_claw(target[Joint::Claw]);

        let mut active = JointArray::splat(false);
        for joint in Joint::DRIVEN {
            active[joint] = goal[joint]
                .is_some_and(|g| (g - start[joint]).abs() >= self.config.min_change);
        }
        info!(?target, ?active, "position controller started");

        let hold = CommandRequest::hold(Some(claw_goal));
        let mut last_pose = start;
        let mut loop_counter: u32 = 0;
        let mut samples: u32 = 0;

        let finish = |state: ControllerState,
                      iterations: u32,
                      samples: u32,
                      last_pose: JointPosition|
         -> Result<ControlOutcome, RobotError> {
            sink.drive(&hold)?;
            info!(?state, iterations, samples, "position controller finished");
            Ok(ControlOutcome {
                state,
                iterations,
                samples,
                last_pose,
            })
        };

        loop {
            if cancel.is_cancelled() {
                return finish(ControllerState::Cancelled, loop_counter, samples, last_pose);
            }

            self.sleeper.sleep(self.config.tick());
            samples += 1;

            let Some(current) = source.sample().position() else {
                warn!(tick = samples, "joint state unavailable, skipping tick");
                if loop_counter > self.config.max_loops {
                    return finish(
                        ControllerState::IterationLimitReached,
                        loop_counter,
                        samples,
                        last_pose,
                    );
                }
                loop_counter += 1;
                continue;
            };
            last_pose = current;

            let deltas = self.compute_deltas(&target, &current, &active);
            let max_abs = Joint::DRIVEN
                .iter()
                .map(|j| deltas[*j].abs())
                .fold(0.0, f64::max);
            debug!(?current, ?deltas, max_abs, "controller tick");

            if max_abs < self.config.stop_threshold {
                return finish(ControllerState::Converged, loop_counter, samples, last_pose);
            }
            if loop_counter > self.config.max_loops {
                return finish(
                    ControllerState::IterationLimitReached,
                    loop_counter,
                    samples,
                    last_pose,
                );
            }

            let mut request = CommandRequest::new()
                .with(DriveAxis::WheelLeft, 0)
                .with(DriveAxis::WheelRight, 0)
                .with(DriveAxis::Claw, claw_goal);
            for joint in Joint::DRIVEN {
                request.set(DriveAxis::for_joint(joint), deltas[joint] as i32);
            }

            if let Some(request) = self.limit_with_fallback(request, &current) {
                sink.drive(&request)?;
            }
            loop_counter += 1;
        }
    }

    /// 限位被拒绝时清零触发的关节后重新检查
    fn limit_with_fallback(
        &self,
        mut request: CommandRequest,
        current: &JointPosition,
    ) -> Option<CommandRequest> {
        for _ in 0..=MAX_RELIMIT {
            match self.limiter.limit(&request, current) {
                Ok(limited) => return Some(limited),
                Err(rejection) => {
                    warn!(%rejection, "safety limit reached, stopping joint for this tick");
                    request.set(DriveAxis::for_joint(rejection.joint), 0);
                },
            }
        }
        None
    }
}

impl std::fmt::Debug for PositionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionController")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::SafetyConfig;
    use mebo_driver::mock::RecordingSleeper;
    use mebo_driver::{DriverError, JointSnapshot};
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// 按脚本返回姿态；脚本耗尽后重复最后一个
    struct ScriptedSource {
        script: Mutex<VecDeque<JointSnapshot>>,
        last: Mutex<JointSnapshot>,
    }

    impl ScriptedSource {
        fn new(script: Vec<JointSnapshot>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(JointSnapshot::Unavailable),
            }
        }

        fn poses(poses: &[[i32; 4]]) -> Self {
            Self::new(
                poses
                    .iter()
                    .map(|p| JointSnapshot::Fresh(JointPosition::new(*p)))
                    .collect(),
            )
        }
    }

    impl PoseSource for ScriptedSource {
        fn sample(&self) -> JointSnapshot {
            let mut last = self.last.lock();
            if let Some(next) = self.script.lock().pop_front() {
                *last = next;
            }
            *last
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<CommandRequest>>,
    }

    impl RecordingSink {
        fn sent(&self) -> Vec<CommandRequest> {
            self.sent.lock().clone()
        }
    }

    impl DriveSink for RecordingSink {
        fn drive(&self, request: &CommandRequest) -> Result<bool, DriverError> {
            self.sent.lock().push(*request);
            Ok(true)
        }
    }

    fn controller() -> (PositionController, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::new());
        let controller = PositionController::new(
            ControllerConfig::default(),
            SafetyLimiter::default(),
            sleeper.clone(),
        );
        (controller, sleeper)
    }

    fn arm_goal(arm: i32) -> Goal {
        Goal::new([Some(arm), None, None, None])
    }

    #[test]
    fn test_first_arm_delta() {
        let (controller, _) = controller();
        let deltas = controller.compute_deltas(
            &JointPosition::new([60, 50, 50, 0]),
            &JointPosition::new([40, 50, 50, 0]),
            &JointArray::new([true, false, false, false]),
        );
        // (60 - 40) * 6 / 3 = 40，钳位到 20，大臂取反
        assert_eq!(deltas[Joint::Arm], -20.0);
        assert_eq!(deltas[Joint::WristUd], 0.0);
    }

    #[test]
    fn test_wrist_gain_and_clamp() {
        let (controller, _) = controller();
        let deltas = controller.compute_deltas(
            &JointPosition::new([0, 52, 30, 0]),
            &JointPosition::new([0, 50, 50, 0]),
            &JointArray::new([false, true, true, false]),
        );
        assert_eq!(deltas[Joint::WristUd], 12.0);
        assert_eq!(deltas[Joint::WristRotate], -20.0);
        assert_eq!(deltas[Joint::Arm], 0.0);
    }

    #[test]
    fn test_converges_at_tick_four() {
        let (mut controller, sleeper) = controller();
        // 起始 40，之后各周期读数 40 → 50 → 58 → 60
        let source = ScriptedSource::poses(&[
            [40, 50, 50, 1],
            [40, 50, 50, 1],
            [50, 50, 50, 1],
            [58, 50, 50, 1],
            [60, 50, 50, 1],
        ]);
        let sink = RecordingSink::default();

        let outcome = controller
            .run(&arm_goal(60), &source, &sink, &CancellationToken::new())
            .unwrap();

        assert_eq!(outcome.state, ControllerState::Converged);
        assert_eq!(outcome.samples, 4);
        assert_eq!(outcome.iterations, 3);
        assert_eq!(controller.state(), ControllerState::Converged);
        assert_eq!(sleeper.sleeps(), vec![Duration::from_millis(100); 4]);

        let sent = sink.sent();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].get(DriveAxis::Arm), Some(-20));
        assert_eq!(sent[1].get(DriveAxis::Arm), Some(-20));
        assert_eq!(sent[2].get(DriveAxis::Arm), Some(-4));
        // 驱动周期：轮子为 0，夹爪保持起始开度
        assert_eq!(sent[0].get(DriveAxis::WheelLeft), Some(0));
        assert_eq!(sent[0].get(DriveAxis::Claw), Some(1));
        // 最后一条为保持命令
        assert_eq!(sent[3], CommandRequest::hold(Some(1)));
    }

    #[test]
    fn test_hold_uses_clamped_claw() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let limiter = SafetyLimiter::new(SafetyConfig {
            claw_min: 1,
            ..SafetyConfig::default()
        });
        let mut controller = PositionController::new(ControllerConfig::default(), limiter, sleeper);
        let source = ScriptedSource::poses(&[[50, 50, 50, 5], [50, 50, 50, 5]]);
        let sink = RecordingSink::default();

        let goal = Goal::new([None, None, None, Some(0)]);
        let outcome = controller
            .run(&goal, &source, &sink, &CancellationToken::new())
            .unwrap();

        assert_eq!(outcome.state, ControllerState::Converged);
        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], CommandRequest::hold(Some(1)));
    }

    #[test]
    fn test_iteration_limit_then_hold() {
        let (mut controller, _) = controller();
        // 姿态永远不变
        let source = ScriptedSource::poses(&[[40, 50, 50, 1]]);
        let sink = RecordingSink::default();

        let outcome = controller
            .run(&arm_goal(60), &source, &sink, &CancellationToken::new())
            .unwrap();

        assert_eq!(outcome.state, ControllerState::IterationLimitReached);
        assert_eq!(outcome.iterations, 16);

        let sent = sink.sent();
        // max_loops + 1 次驱动，然后保持
        assert_eq!(sent.len(), 17);
        assert!(sent[..16].iter().all(|r| r.get(DriveAxis::Arm) == Some(-20)));
        assert_eq!(sent[16], CommandRequest::hold(Some(1)));
    }

    #[test]
    fn test_small_change_dropped() {
        let (mut controller, sleeper) = controller();
        let source = ScriptedSource::poses(&[[40, 50, 50, 1]]);
        let sink = RecordingSink::default();

        let goal = Goal::new([Some(43), None, None, Some(80)]);
        let outcome = controller
            .run(&goal, &source, &sink, &CancellationToken::new())
            .unwrap();

        assert!(outcome.converged());
        assert_eq!(outcome.iterations, 0);
        assert_eq!(sleeper.sleeps().len(), 1);
        assert_eq!(sink.sent(), vec![CommandRequest::hold(Some(80))]);
    }

    #[test]
    fn test_cancelled_before_first_tick() {
        let (mut controller, sleeper) = controller();
        let source = ScriptedSource::poses(&[[40, 50, 50, 1]]);
        let sink = RecordingSink::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = controller.run(&arm_goal(80), &source, &sink, &cancel).unwrap();

        assert_eq!(outcome.state, ControllerState::Cancelled);
        assert!(sleeper.sleeps().is_empty());
        assert_eq!(sink.sent(), vec![CommandRequest::hold(Some(1))]);
    }

    #[test]
    fn test_unavailable_at_start() {
        let (mut controller, _) = controller();
        let source = ScriptedSource::new(vec![JointSnapshot::Unavailable]);
        let sink = RecordingSink::default();

        let result = controller.run(&arm_goal(60), &source, &sink, &CancellationToken::new());
        assert!(matches!(result, Err(RobotError::StateUnavailable)));
        assert!(sink.sent().is_empty());
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn test_unavailable_ticks_count_towards_budget() {
        let (mut controller, _) = controller();
        let mut script = vec![JointSnapshot::Fresh(JointPosition::new([40, 50, 50, 1]))];
        script.push(JointSnapshot::Unavailable);
        let source = ScriptedSource::new(script);
        let sink = RecordingSink::default();

        let outcome = controller
            .run(&arm_goal(60), &source, &sink, &CancellationToken::new())
            .unwrap();

        assert_eq!(outcome.state, ControllerState::IterationLimitReached);
        assert_eq!(outcome.samples, 17);
        // 只有保持命令
        assert_eq!(sink.sent(), vec![CommandRequest::hold(Some(1))]);
    }

    #[test]
    fn test_limit_rejection_stops_only_offending_joint() {
        let (mut controller, _) = controller();
        // 腕部俯仰在上限，腕部旋转远离限位
        let source = ScriptedSource::poses(&[[50, 91, 40, 1]]);
        let sink = RecordingSink::default();

        let goal = Goal::new([None, Some(100), Some(80), None]);
        let cancel = CancellationToken::new();
        let mut config = ControllerConfig::default();
        config.max_loops = 0;
        controller.config = config;

        controller.run(&goal, &source, &sink, &cancel).unwrap();

        let sent = sink.sent();
        assert_eq!(sent[0].get(DriveAxis::WristUd), Some(0));
        assert_eq!(sent[0].get(DriveAxis::WristRotate), Some(20));
    }

    #[test]
    fn test_invalid_goal_rejected() {
        let (mut controller, _) = controller();
        let source = ScriptedSource::poses(&[[40, 50, 50, 1]]);
        let sink = RecordingSink::default();

        let goal = Goal::new([Some(101), None, None, None]);
        let result = controller.run(&goal, &source, &sink, &CancellationToken::new());
        assert!(matches!(result, Err(RobotError::InvalidGoal(_))));
    }

    #[test]
    fn test_config_validation() {
        assert!(ControllerConfig::default().validate().is_ok());
        let mut config = ControllerConfig::default();
        config.gains.arm.divisor = 0.0;
        assert!(config.validate().is_err());
        let mut config = ControllerConfig::default();
        config.max_speed = -1.0;
        assert!(config.validate().is_err());
    }
}
