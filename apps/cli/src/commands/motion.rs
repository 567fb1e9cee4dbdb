//! 运动命令：闭环定位、底盘行驶、关节点动、夹爪

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use mebo_sdk::client::{Direction, Jog};
use mebo_sdk::prelude::*;

/// 闭环定位参数（未指定的关节保持不动）
#[derive(Args, Debug)]
pub struct GotoCommand {
    /// 大臂目标 [0, 100]
    #[arg(long)]
    pub arm: Option<i32>,

    /// 腕部俯仰目标
    #[arg(long)]
    pub wrist_ud: Option<i32>,

    /// 腕部旋转目标
    #[arg(long)]
    pub wrist_rotate: Option<i32>,

    /// 夹爪目标开度
    #[arg(long)]
    pub claw: Option<i32>,
}

impl GotoCommand {
    pub fn goal(&self) -> Result<Goal> {
        let goal = mebo_sdk::client::goal_from_slice(&[
            self.arm,
            self.wrist_ud,
            self.wrist_rotate,
            self.claw,
        ])?;
        if goal.iter().all(Option::is_none) {
            anyhow::bail!("至少指定一个关节目标（--arm / --wrist-ud / --wrist-rotate / --claw）");
        }
        Ok(goal)
    }

    pub fn execute(&self, robot: &Mebo) -> Result<()> {
        let goal = self.goal()?;
        println!("⏳ 移动到 {:?} ...", goal.as_array());

        let outcome = robot.set_joint_positions(&goal)?;
        match outcome.state {
            ControllerState::Converged => println!("✅ 已到达（{} 次迭代）", outcome.iterations),
            ControllerState::Cancelled => println!("🛑 已取消"),
            state => println!("⚠️ 未收敛: {:?}", state),
        }
        println!("📍 姿态: {:?}", outcome.last_pose.as_array());
        Ok(())
    }
}

/// 行驶方向
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DriveDirection {
    Forward,
    Backward,
    Left,
    Right,
}

impl From<DriveDirection> for Direction {
    fn from(d: DriveDirection) -> Self {
        match d {
            DriveDirection::Forward => Direction::Forward,
            DriveDirection::Backward => Direction::Backward,
            DriveDirection::Left => Direction::Left,
            DriveDirection::Right => Direction::Right,
        }
    }
}

/// 底盘行驶参数
#[derive(Args, Debug)]
pub struct DriveCommand {
    /// 方向
    #[arg(value_enum)]
    pub direction: DriveDirection,

    /// 驱动值（默认使用配置中的 default_speed）
    #[arg(short, long)]
    pub power: Option<i32>,

    /// 步数
    #[arg(short, long, default_value_t = 1)]
    pub steps: u32,
}

impl DriveCommand {
    pub fn execute(&self, robot: &Mebo) -> Result<()> {
        robot.drive(self.direction.into(), self.power, self.steps)?;
        println!("✅ 行驶完成");
        Ok(())
    }
}

/// 点动方向
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum JogDirection {
    ArmUp,
    ArmDown,
    WristUp,
    WristDown,
    WristLeft,
    WristRight,
}

impl From<JogDirection> for Jog {
    fn from(j: JogDirection) -> Self {
        match j {
            JogDirection::ArmUp => Jog::ArmUp,
            JogDirection::ArmDown => Jog::ArmDown,
            JogDirection::WristUp => Jog::WristUp,
            JogDirection::WristDown => Jog::WristDown,
            JogDirection::WristLeft => Jog::WristLeft,
            JogDirection::WristRight => Jog::WristRight,
        }
    }
}

/// 关节点动参数
#[derive(Args, Debug)]
pub struct JogCommand {
    #[arg(value_enum)]
    pub direction: JogDirection,

    #[arg(short, long)]
    pub power: Option<i32>,

    #[arg(short, long, default_value_t = 1)]
    pub steps: u32,
}

impl JogCommand {
    pub fn execute(&self, robot: &Mebo) -> Result<()> {
        robot.jog(self.direction.into(), self.power, self.steps)?;
        println!("✅ 点动完成");
        Ok(())
    }
}

/// 夹爪命令
#[derive(Subcommand, Debug)]
pub enum ClawCommand {
    /// 张开（默认步长取自配置）
    Open { steps: Option<i32> },
    /// 闭合
    Close { steps: Option<i32> },
    /// 设置绝对开度
    Set { aperture: i32 },
}

impl ClawCommand {
    pub fn execute(&self, robot: &Mebo) -> Result<()> {
        let sent = match *self {
            ClawCommand::Open { steps } => robot.claw_open(steps.unwrap_or(robot.claw_step()))?,
            ClawCommand::Close { steps } => robot.claw_close(steps.unwrap_or(robot.claw_step()))?,
            ClawCommand::Set { aperture } => robot.set_claw(aperture)?,
        };
        if sent {
            println!("✅ 夹爪命令已发送");
        } else {
            println!("⚠️ 夹爪命令发送失败");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goto(arm: Option<i32>, claw: Option<i32>) -> GotoCommand {
        GotoCommand {
            arm,
            wrist_ud: None,
            wrist_rotate: None,
            claw,
        }
    }

    #[test]
    fn test_goto_goal() {
        let goal = goto(Some(60), Some(100)).goal().unwrap();
        assert_eq!(goal.as_array(), &[Some(60), None, None, Some(100)]);
    }

    #[test]
    fn test_goto_requires_a_target() {
        assert!(goto(None, None).goal().is_err());
    }

    #[test]
    fn test_goto_rejects_out_of_range() {
        assert!(goto(Some(120), None).goal().is_err());
    }
}
