//! 客户端接口模块
//!
//! 本模块提供 Mebo 机器人的用户友好接口，包括：
//! - 开环动作（底盘行驶、关节点动、夹爪开合），每步经过安全限位
//! - 闭环关节定位（比例控制，可取消）
//! - 抓取/放置宏
//! - TOML 配置文件
//!
//! # 使用场景
//!
//! 这是大多数用户应该使用的模块。需要直接发送命令集合或自定义重试时，
//! 可以使用 `mebo_driver`。
//!
//! # 示例
//!
//! ```rust,no_run
//! use mebo_client::{Goal, MeboBuilder};
//!
//! # fn main() -> Result<(), mebo_client::RobotError> {
//! let robot = MeboBuilder::new().host("192.168.99.1").build()?;
//!
//! robot.forward(30, 2)?;
//! let outcome = robot.set_joint_positions(&Goal::new([Some(60), None, None, None]))?;
//! println!("converged: {}", outcome.converged());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod control;
pub mod error;
pub mod robot;
pub mod safety;

// 重新导出常用类型
pub use builder::MeboBuilder;
pub use config::{MeboConfig, MotionConfig};
pub use control::{
    CancellationToken, ControlOutcome, ControllerConfig, ControllerState, DriveSink, Gain, Goal,
    JointGains, PoseSource, PositionController, goal_from_slice, validate_goal,
};
pub use error::RobotError;
pub use robot::{Direction, Jog, Mebo};
pub use safety::{SafetyConfig, SafetyLimiter, SafetyRejection};
