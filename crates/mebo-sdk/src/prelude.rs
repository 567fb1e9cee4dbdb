//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use mebo_sdk::prelude::*;
//! ```

// 客户端层（推荐使用）
pub use crate::client::{
    CancellationToken, ControlOutcome, ControllerState, Direction, Goal, Jog, Mebo, MeboBuilder,
    MeboConfig, RobotError, SafetyConfig,
};

// 驱动层（高级用户使用）
pub use crate::driver::Mebo as Driver;
pub use crate::driver::{DriverError, JointSnapshot, Reading};

// 协议层
pub use crate::protocol::{Joint, JointPosition, ProtocolError};
