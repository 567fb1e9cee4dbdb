//! # Mebo Protocol
//!
//! Mebo 机器人 HTTP 命令协议定义（无网络依赖）
//!
//! ## 模块
//!
//! - `alphabet`: 6-bit 自定义字母表编解码
//! - `sequence`: 消息序列号计数器
//! - `command`: 命令表（四种封装方式）
//! - `request`: 驱动请求与多命令打包
//! - `response`: 响应体与关节读数解析
//! - `joint`: 关节标识与关节数组
//!
//! ## 线路格式
//!
//! ```text
//! GET /ajax/command.json?command1=<frag>&command2=<frag>...
//!                         └──────┬──────┘
//!                  command<N>=<literal>
//!                  command<N>=mebolink_message_send(<payload>)
//! ```
//!
//! 协议层只负责生成与解析字符串，不做取值范围校验。

pub mod alphabet;
pub mod command;
pub mod joint;
pub mod request;
pub mod response;
pub mod sequence;

// 重新导出常用类型
pub use alphabet::{decode_value, encode_char, encode_value, sign_extend};
pub use command::{Command, CommandKind, Framing};
pub use joint::{Joint, JointArray, JointPosition, POSITION_MAX, POSITION_MIN, position_in_range};
pub use request::{CommandBuffer, CommandRequest, CommandSet, DriveAxis};
pub use response::{DeviceResponse, parse_joint_reading, parse_led_state};
pub use sequence::SequenceCounter;

use thiserror::Error;

/// 协议错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 未知命令名（配置错误，立即失败）
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// 未知关节名
    #[error("Unknown joint: {0}")]
    UnknownJoint(String),

    /// 带值命令缺少参数
    #[error("Command {0} requires a value")]
    MissingValue(CommandKind),

    /// 空命令集合
    #[error("Command set is empty")]
    EmptyCommandSet,

    /// 响应体无法解析
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// 关节响应前缀不匹配
    #[error("Unexpected prefix: expected {expected}, got {found:?}")]
    UnexpectedPrefix {
        expected: &'static str,
        found: String,
    },

    /// 读数超出设备范围
    #[error("Reading for {joint} out of range: {value}")]
    OutOfRange { joint: Joint, value: i32 },
}

impl ProtocolError {
    /// 是否为编程/配置错误（与设备无关，不应重试）
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::UnknownCommand(_)
                | ProtocolError::UnknownJoint(_)
                | ProtocolError::MissingValue(_)
                | ProtocolError::EmptyCommandSet
        )
    }
}
