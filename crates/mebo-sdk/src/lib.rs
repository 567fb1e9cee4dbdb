//! Mebo SDK - Mebo 机器人 Rust SDK
//!
//! 通过设备 Wi-Fi 热点上的 HTTP 命令端点控制 Mebo：底盘、三个机械臂关节和夹爪。
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 自定义字母表编码、命令表、序列号、响应解析
//! - **驱动层** (`driver`): HTTP 传输与重试、RTSP 存活探测、会话、关节状态
//! - **客户端层** (`client`): 安全限位、闭环定位、开环动作、配置文件
//!
//! # 快速开始
//!
//! 大多数用户应该使用高层 API（客户端接口）：
//!
//! ```rust
//! use mebo_sdk::prelude::*;
//! // 或
//! use mebo_sdk::{Mebo, MeboBuilder};
//! ```
//!
//! 需要直接发送命令集合的用户可以使用驱动层：
//!
//! ```rust
//! use mebo_sdk::driver::{Mebo as Driver, MeboBuilder};
//! ```

pub use mebo_client as client;
pub use mebo_driver as driver;
pub use mebo_protocol as protocol;

pub mod logging;
pub mod prelude;

// 协议层
pub use protocol::{CommandKind, Joint, JointPosition, ProtocolError};

// 驱动层（不直接导出 driver::Mebo / driver::MeboBuilder，与客户端层同名）
pub use driver::{DriverError, JointSnapshot, Reading};

// 客户端层（推荐入口）
pub use client::{Goal, Mebo, MeboBuilder, MeboConfig, RobotError};

/// 驱动层会话别名
pub type Driver = driver::Mebo;

pub use logging::init_logging;
