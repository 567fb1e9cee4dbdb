//! 命令表
//!
//! 把逻辑命令映射为设备接受的查询参数值。每个命令属于四种封装方式之一：
//!
//! | 封装                  | 输出形式                                          | 序列号 |
//! |-----------------------|---------------------------------------------------|--------|
//! | `StaticLiteral`       | `eye_led_state()`                                 | 否     |
//! | `StaticMessage`       | `mebolink_message_send(BAT=?)`                    | 否     |
//! | `Sequenced`           | `mebolink_message_send(!<id>DE)`                  | 是     |
//! | `EncodedValue`        | `mebolink_message_send(!<id>G<v0><v1>)`           | 是     |
//!
//! 命令集合是封闭的：未知命令名在解析阶段失败（fail closed），
//! 不会生成空载荷掩盖集成错误。
//!
//! 取值范围校验不在这里做。两字符编码只有 12 位，越界值会被设备
//! 静默误解，范围检查属于安全限位器。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;
use crate::alphabet::encode_value;
use crate::joint::Joint;
use crate::sequence::SequenceCounter;

/// 消息封装函数名
pub const MESSAGE_WRAPPER: &str = "mebolink_message_send";

/// 带值命令的编码宽度（字符数）
pub const VALUE_WIDTH: usize = 2;

/// 序列号前缀
const SEQUENCE_MARKER: char = '!';

/// 会话初始化完整载荷
const INIT_ALL_PAYLOAD: &str = "!CVVDSAAAAAAAAAAAAAAAAAAAAAAAAYtBQfA4uAAAAAAAAAAQfAoPAcXAAAA";

/// 封装方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// 直接作为参数值发送，无序列号，可安全重试
    StaticLiteral(&'static str),
    /// 固定载荷，包在 `mebolink_message_send(...)` 中
    StaticMessage(&'static str),
    /// 寄存器查询：`REG<三位十进制>=?`
    RegisterQuery,
    /// 新序列号 + 固定操作码
    Sequenced(&'static str),
    /// 新序列号 + 单字符操作码 + 两字符编码值
    EncodedValue(char),
}

impl Framing {
    /// 是否消耗序列号
    pub const fn uses_sequence(self) -> bool {
        matches!(self, Framing::Sequenced(_) | Framing::EncodedValue(_))
    }

    /// 是否需要数值参数
    pub const fn requires_value(self) -> bool {
        matches!(self, Framing::EncodedValue(_) | Framing::RegisterQuery)
    }
}

macro_rules! command_table {
    ($( $(#[$doc:meta])* $variant:ident => $name:literal, $framing:expr; )*) => {
        /// 逻辑命令（封闭集合）
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum CommandKind {
            $( $(#[$doc])* $variant, )*
        }

        impl CommandKind {
            /// 全部命令
            pub const ALL: &'static [CommandKind] = &[ $( CommandKind::$variant, )* ];

            /// 设备侧命令名
            pub const fn name(self) -> &'static str {
                match self {
                    $( CommandKind::$variant => $name, )*
                }
            }

            /// 封装方式
            pub const fn framing(self) -> Framing {
                match self {
                    $( CommandKind::$variant => $framing, )*
                }
            }
        }
    };
}

command_table! {
    /// 眼部 LED 状态
    EyeLedState => "EYE_LED_STATE", Framing::StaticLiteral("eye_led_state()");
    /// 夹爪 LED 状态（响应 `ON`/`OFF`）
    ClawLedState => "CLAW_LED_STATE", Framing::StaticLiteral("claw_led_state()");
    /// 查询 SSID
    GetSsid => "GET_SSID", Framing::StaticLiteral("get_ssid()");
    /// 视频翻转
    VideoFlip => "VIDEO_FLIP", Framing::StaticLiteral("video_flip(0)");
    /// 视频镜像
    VideoMirror => "VIDEO_MIRROR", Framing::StaticLiteral("video_mirror(0)");
    /// 握手 1
    Aceaa => "ACEAA", Framing::StaticMessage("!ACEAA");
    /// 握手 2
    Bcqaa => "BCQAA", Framing::StaticMessage("!BCQAA");
    /// 握手 3
    Cciaa => "CCIAA", Framing::StaticMessage("!CCIAA");
    /// 会话初始化
    InitAll => "INIT_ALL", Framing::StaticMessage(INIT_ALL_PAYLOAD);
    /// 电量查询
    Battery => "BAT", Framing::StaticMessage("BAT=?");
    /// 夹爪灯开
    LightOn => "LIGHT_ON", Framing::Sequenced("RAAAAAAAad");
    /// 夹爪灯关
    LightOff => "LIGHT_OFF", Framing::Sequenced("RAAAAAAAac");
    /// 左轮
    WheelLeftForward => "WHEEL_LEFT_FORWARD", Framing::EncodedValue('F');
    /// 右轮
    WheelRightForward => "WHEEL_RIGHT_FORWARD", Framing::EncodedValue('E');
    /// 大臂驱动
    ArmUp => "ARM_UP", Framing::EncodedValue('G');
    /// 大臂位置查询
    ArmQuery => "ARM_QUERY", Framing::StaticMessage("ARM=?");
    /// 腕部俯仰驱动
    WristUdUp => "WRIST_UD_UP", Framing::EncodedValue('H');
    /// 腕部俯仰查询
    WristUdQuery => "WRIST_UD_QUERY", Framing::StaticMessage("WRIST_UD=?");
    /// 腕部旋转驱动
    WristRotateLeft => "WRIST_ROTATE_LEFT", Framing::EncodedValue('I');
    /// 腕部旋转查询
    WristRotateQuery => "WRIST_ROTATE_QUERY", Framing::StaticMessage("WRIST_ROTATE=?");
    /// 夹爪绝对开度
    ClawPosition => "CLAW_POSITION", Framing::EncodedValue('N');
    /// 夹爪开度查询
    ClawQuery => "CLAW_QUERY", Framing::StaticMessage("CLAW=?");
    /// 大臂校准
    CalArm => "CAL_ARM", Framing::Sequenced("DE");
    /// 腕部俯仰校准
    CalWristUd => "CAL_WRIST_UD", Framing::Sequenced("DI");
    /// 腕部旋转校准
    CalWristRotate => "CAL_WRIST_ROTATE", Framing::Sequenced("DQ");
    /// 夹爪校准
    CalClaw => "CAL_CLAW", Framing::Sequenced("Dg");
    /// 全部校准
    CalAll => "CAL_ALL", Framing::Sequenced("D_");
    /// 固件版本
    VersionQuery => "VERSION_QUERY", Framing::StaticMessage("VER=?");
    /// 重启（操作码与 CAL_ARM 相同，设备实测如此）
    RebootCmd => "REBOOT_CMD", Framing::Sequenced("DE");
    /// 寄存器查询
    QueryReg => "QUERY_REG", Framing::RegisterQuery;
    /// 寄存器落盘
    SaveReg => "SAVE_REG", Framing::StaticMessage("REG=FLUSH");
    /// 左轮速度（与 WHEEL_LEFT_FORWARD 同码）
    WheelLeftSpeed => "WHEEL_LEFT_SPEED", Framing::EncodedValue('F');
    /// 右轮速度（与 WHEEL_RIGHT_FORWARD 同码）
    WheelRightSpeed => "WHEEL_RIGHT_SPEED", Framing::EncodedValue('E');
    /// 事件查询
    QueryEvent => "QUERY_EVENT", Framing::StaticMessage("*");
}

impl CommandKind {
    /// 关节对应的位置查询命令
    pub const fn joint_query(joint: Joint) -> Self {
        match joint {
            Joint::Arm => CommandKind::ArmQuery,
            Joint::WristUd => CommandKind::WristUdQuery,
            Joint::WristRotate => CommandKind::WristRotateQuery,
            Joint::Claw => CommandKind::ClawQuery,
        }
    }

    /// 关节对应的校准命令
    pub const fn calibration(joint: Joint) -> Self {
        match joint {
            Joint::Arm => CommandKind::CalArm,
            Joint::WristUd => CommandKind::CalWristUd,
            Joint::WristRotate => CommandKind::CalWristRotate,
            Joint::Claw => CommandKind::CalClaw,
        }
    }

    /// 会话开始时依次发送的初始化命令
    pub const INIT_SEQUENCE: [CommandKind; 8] = [
        CommandKind::Battery,
        CommandKind::GetSsid,
        CommandKind::VideoFlip,
        CommandKind::VideoMirror,
        CommandKind::Aceaa,
        CommandKind::Bcqaa,
        CommandKind::Cciaa,
        CommandKind::InitAll,
    ];
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommandKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ProtocolError::UnknownCommand(s.to_string()))
    }
}

/// 单条命令：命令种类 + 可选数值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub kind: CommandKind,
    pub value: Option<i32>,
}

impl Command {
    /// 无参数命令
    pub const fn new(kind: CommandKind) -> Self {
        Self { kind, value: None }
    }

    /// 带参数命令
    pub const fn with_value(kind: CommandKind, value: i32) -> Self {
        Self {
            kind,
            value: Some(value),
        }
    }

    /// 按命令名构建（未知命令名立即失败）
    pub fn parse(name: &str, value: Option<i32>) -> Result<Self, ProtocolError> {
        let kind = name.parse::<CommandKind>()?;
        Ok(Self { kind, value })
    }

    /// 生成参数值（`=` 右侧部分）
    ///
    /// 对 `Sequenced` / `EncodedValue` 命令会从 `seq` 取一个新序列号。
    /// 校验在取号之前完成，失败不会消耗序列号。
    pub fn encode(&self, seq: &mut SequenceCounter) -> Result<String, ProtocolError> {
        let framing = self.kind.framing();
        if framing.requires_value() && self.value.is_none() {
            return Err(ProtocolError::MissingValue(self.kind));
        }

        let body = match framing {
            Framing::StaticLiteral(literal) => return Ok(literal.to_string()),
            Framing::StaticMessage(payload) => payload.to_string(),
            Framing::RegisterQuery => {
                let reg = self.value.unwrap_or_default();
                format!(
                    "REG{}{}{}=?",
                    (reg / 100).rem_euclid(10),
                    (reg / 10).rem_euclid(10),
                    reg.rem_euclid(10)
                )
            },
            Framing::Sequenced(opcode) => format!("{}{}{}", SEQUENCE_MARKER, seq.next(), opcode),
            Framing::EncodedValue(opcode) => {
                let value = i64::from(self.value.unwrap_or_default());
                format!(
                    "{}{}{}{}",
                    SEQUENCE_MARKER,
                    seq.next(),
                    opcode,
                    encode_value(value, VALUE_WIDTH)
                )
            },
        };

        Ok(format!("{}({})", MESSAGE_WRAPPER, body))
    }

    /// 生成完整片段 `command<N>=<value>`（`ordinal` 从 1 开始）
    pub fn encode_fragment(
        &self,
        ordinal: usize,
        seq: &mut SequenceCounter,
    ) -> Result<String, ProtocolError> {
        Ok(format!("command{}={}", ordinal, self.encode(seq)?))
    }
}

impl From<CommandKind> for Command {
    fn from(kind: CommandKind) -> Self {
        Command::new(kind)
    }
}
