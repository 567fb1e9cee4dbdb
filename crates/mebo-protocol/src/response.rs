//! 设备响应解析
//!
//! 所有命令共用一个端点，响应体固定为 `{"response": "<text>"}`。
//! 关节查询的文本格式为 `<PREFIX>=<signed-int>`，例如 `WRIST_UD=57`。

use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::joint::{Joint, position_in_range};

/// 设备响应体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceResponse {
    /// 响应文本（内容取决于命令）
    pub response: String,
}

impl DeviceResponse {
    /// 解析 JSON 响应体
    pub fn from_json(body: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(body).map_err(|e| ProtocolError::InvalidResponse(e.to_string()))
    }

    /// 响应文本
    pub fn text(&self) -> &str {
        &self.response
    }
}

/// 解析关节查询响应
///
/// 前缀必须与被查询关节的前缀完全一致（区分大小写、长度），
/// 数值必须是 `[0, 100]` 内的整数。
///
/// # 示例
///
/// ```rust
/// use mebo_protocol::{Joint, parse_joint_reading};
///
/// assert_eq!(parse_joint_reading(Joint::Arm, "ARM=42").unwrap(), 42);
/// assert!(parse_joint_reading(Joint::Arm, "arm=42").is_err());
/// assert!(parse_joint_reading(Joint::WristUd, "WRIST_ROTATE=42").is_err());
/// ```
pub fn parse_joint_reading(joint: Joint, text: &str) -> Result<i32, ProtocolError> {
    let text = text.trim();
    let (prefix, raw) = text
        .split_once('=')
        .ok_or_else(|| ProtocolError::InvalidResponse(format!("missing '=' in {:?}", text)))?;

    if prefix != joint.prefix() {
        return Err(ProtocolError::UnexpectedPrefix {
            expected: joint.prefix(),
            found: prefix.to_string(),
        });
    }

    let value: i32 = raw
        .trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidResponse(format!("not an integer: {:?}", raw)))?;

    if !position_in_range(value) {
        return Err(ProtocolError::OutOfRange { joint, value });
    }

    Ok(value)
}

/// 解析 LED 状态响应（`ON` 为真，其余为假）
pub fn parse_led_state(text: &str) -> bool {
    text.trim() == "ON"
}
