//! # Mebo Driver
//!
//! Mebo 机器人驱动层：HTTP 传输、会话所有权、关节状态读取
//!
//! ## 模块
//!
//! - `link`: 设备链路抽象（`reqwest` 阻塞客户端）与存活探测
//! - `retry`: 重试策略与可替换时钟
//! - `transport`: 带重试的命令发送
//! - `session`: 每主机单会话的进程级注册表
//! - `state`: 关节状态读取（上一次完整快照无锁保存）
//! - `mebo`: 会话对象
//! - `builder`: 会话构造
//! - `mock`: 模拟设备（`mock` feature 或测试）
//!
//! ## 使用示例
//!
//! ```no_run
//! use mebo_driver::{JointSnapshot, MeboBuilder};
//! use mebo_protocol::CommandKind;
//!
//! let mebo = MeboBuilder::new().host("192.168.99.1").build()?;
//!
//! let battery = mebo.send_query(CommandKind::Battery)?;
//! println!("battery: {}", battery.text());
//!
//! if let JointSnapshot::Fresh(pose) = mebo.refresh() {
//!     println!("pose: {:?}", pose);
//! }
//! # Ok::<(), mebo_driver::DriverError>(())
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod link;
pub mod mebo;
pub mod retry;
pub mod session;
pub mod state;
pub mod transport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use builder::MeboBuilder;
pub use config::{DeviceConfig, RetryConfig};
pub use error::DriverError;
pub use link::{DeviceLink, HttpLink, LinkError, LivenessProbe, RtspProbe};
pub use mebo::Mebo;
pub use retry::{Backoff, RetryPolicy, Sleeper, ThreadSleeper};
pub use session::SessionGuard;
pub use state::{JointSnapshot, JointStateReader, Reading};
pub use transport::Transport;
