//! 模拟设备（用于无硬件测试）
//!
//! - [`MockLink`]：模拟命令端点，回答关节/电池/版本等查询，记录所有请求 URL，
//!   支持故障注入；开启运动学后会根据驱动命令移动关节
//! - [`MockProbe`]：只计数的存活探测
//! - [`RecordingSleeper`]：只记录、不睡眠的假时钟

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use mebo_protocol::alphabet::{decode_value, sign_extend};
use mebo_protocol::command::MESSAGE_WRAPPER;
use mebo_protocol::{Joint, JointArray, JointPosition, POSITION_MAX, POSITION_MIN};

use crate::link::{DeviceLink, LinkError, LivenessProbe};
use crate::retry::Sleeper;

/// 电池查询的默认回答
pub const MOCK_BATTERY: &str = "BAT=87";
/// 版本查询的默认回答
pub const MOCK_VERSION: &str = "VER=1.0.7";
/// SSID 查询的默认回答
pub const MOCK_SSID: &str = "Mebo-Mock";

#[derive(Debug)]
struct MockDevice {
    pose: JointArray<f64>,
    requests: Vec<String>,
    failing: bool,
    fail_next: u32,
    raw_body: Option<String>,
    joint_replies: HashMap<Joint, String>,
    kinematics: Option<f64>,
    claw_led: bool,
}

impl MockDevice {
    fn answer(&mut self, url: &str) -> String {
        let query = url.split_once('?').map(|(_, q)| q).unwrap_or("");
        let mut text = String::new();
        for fragment in query.split('&').filter(|f| !f.is_empty()) {
            let body = fragment.split_once('=').map(|(_, b)| b).unwrap_or(fragment);
            text = self.answer_body(body);
        }
        text
    }

    fn answer_body(&mut self, body: &str) -> String {
        let payload = body
            .strip_prefix(MESSAGE_WRAPPER)
            .and_then(|rest| rest.strip_prefix('('))
            .and_then(|rest| rest.strip_suffix(')'));

        let Some(payload) = payload else {
            return match body {
                "claw_led_state()" => (if self.claw_led { "ON" } else { "OFF" }).to_string(),
                "eye_led_state()" => "OFF".to_string(),
                "get_ssid()" => MOCK_SSID.to_string(),
                _ => String::new(),
            };
        };

        if let Some(joint) = Joint::ALL
            .into_iter()
            .find(|j| payload == format!("{}=?", j.prefix()))
        {
            return self.joint_reply(joint);
        }

        match payload {
            "BAT=?" => MOCK_BATTERY.to_string(),
            "VER=?" => MOCK_VERSION.to_string(),
            _ if payload.starts_with('!') => {
                self.apply_sequenced(&payload[1..]);
                String::new()
            },
            _ => String::new(),
        }
    }

    fn joint_reply(&self, joint: Joint) -> String {
        self.joint_replies.get(&joint).cloned().unwrap_or_else(|| {
            format!("{}={}", joint.prefix(), self.pose[joint].round() as i32)
        })
    }

    /// `rest` 为去掉 `!` 的负载：`<id><opcode>[value]`
    fn apply_sequenced(&mut self, rest: &str) {
        let mut chars = rest.chars();
        let (Some(_id), Some(op)) = (chars.next(), chars.next()) else {
            return;
        };
        let tail: String = chars.collect();

        match (op, tail.as_str()) {
            ('R', "AAAAAAAad") => self.claw_led = true,
            ('R', "AAAAAAAac") => self.claw_led = false,
            _ => {},
        }

        let Some(rate) = self.kinematics else {
            return;
        };
        let Some(value) = decode_value(&tail).filter(|_| tail.len() == 2) else {
            return;
        };
        let value = f64::from(sign_extend(value, 12));

        let (joint, delta) = match op {
            // 大臂方向与位置相反
            'G' => (Joint::Arm, -value * rate),
            'H' => (Joint::WristUd, value * rate),
            'I' => (Joint::WristRotate, value * rate),
            'N' => {
                self.pose[Joint::Claw] = value;
                return;
            },
            _ => return,
        };
        let next = self.pose[joint] + delta;
        self.pose[joint] = next.clamp(f64::from(POSITION_MIN), f64::from(POSITION_MAX));
    }
}

/// 模拟设备链路
#[derive(Debug)]
pub struct MockLink {
    device: Mutex<MockDevice>,
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLink {
    /// 创建模拟设备（初始姿态全 0，运动学关闭）
    pub fn new() -> Self {
        Self::with_pose(JointPosition::default())
    }

    /// 指定初始姿态
    pub fn with_pose(pose: JointPosition) -> Self {
        Self {
            device: Mutex::new(MockDevice {
                pose: pose.map(f64::from),
                requests: Vec::new(),
                failing: false,
                fail_next: 0,
                raw_body: None,
                joint_replies: HashMap::new(),
                kinematics: None,
                claw_led: false,
            }),
        }
    }

    /// 开启运动学：驱动值 `v` 使关节移动 `v * rate`（大臂反向）
    pub fn with_kinematics(self, rate: f64) -> Self {
        self.device.lock().kinematics = Some(rate);
        self
    }

    /// 所有请求都超时
    pub fn set_failing(&self, failing: bool) {
        self.device.lock().failing = failing;
    }

    /// 接下来 `n` 次请求超时
    pub fn fail_next(&self, n: u32) {
        self.device.lock().fail_next = n;
    }

    /// 用固定原始响应体替换 JSON 回答（`None` 恢复正常）
    pub fn set_raw_body(&self, body: Option<String>) {
        self.device.lock().raw_body = body;
    }

    /// 固定某个关节查询的回答文本（`None` 恢复正常）
    pub fn set_joint_reply(&self, joint: Joint, reply: Option<String>) {
        let mut device = self.device.lock();
        match reply {
            Some(text) => device.joint_replies.insert(joint, text),
            None => device.joint_replies.remove(&joint),
        };
    }

    /// 设置关节位置
    pub fn set_position(&self, joint: Joint, value: i32) {
        self.device.lock().pose[joint] = f64::from(value);
    }

    /// 当前姿态（四舍五入）
    pub fn pose(&self) -> JointPosition {
        self.device.lock().pose.map(|v| v.round() as i32)
    }

    /// 夹爪灯状态
    pub fn claw_led(&self) -> bool {
        self.device.lock().claw_led
    }

    /// 收到的全部 URL
    pub fn requests(&self) -> Vec<String> {
        self.device.lock().requests.clone()
    }

    /// 清空请求记录
    pub fn clear_requests(&self) {
        self.device.lock().requests.clear();
    }

    /// 收到的全部命令片段值（`=` 右侧），按顺序展开
    pub fn fragments(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|url| url.split_once('?').map(|(_, q)| q.to_string()))
            .flat_map(|q| {
                q.split('&')
                    .filter_map(|f| f.split_once('=').map(|(_, b)| b.to_string()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl DeviceLink for MockLink {
    fn get(&self, url: &str, _timeout: Duration) -> Result<String, LinkError> {
        let mut device = self.device.lock();
        device.requests.push(url.to_string());

        if device.failing {
            return Err(LinkError::Timeout);
        }
        if device.fail_next > 0 {
            device.fail_next -= 1;
            return Err(LinkError::Timeout);
        }
        if let Some(body) = &device.raw_body {
            return Ok(body.clone());
        }

        let text = device.answer(url);
        Ok(serde_json::json!({ "response": text }).to_string())
    }
}

/// 计数型存活探测
#[derive(Debug, Default)]
pub struct MockProbe {
    count: AtomicUsize,
}

impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// 探测次数
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl LivenessProbe for MockProbe {
    fn probe(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// 记录型假时钟
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部等待记录
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// 等待总时长
    pub fn total(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}
