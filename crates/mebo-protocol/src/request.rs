//! 驱动请求与多命令打包
//!
//! - [`DriveAxis`] / [`CommandRequest`]：每个控制周期构建的驱动请求
//!   （轮子/关节为有符号增量，夹爪为绝对目标）
//! - [`CommandSet`]：一次 HTTP 请求携带的命令集合，片段用 `&` 连接，
//!   每个片段带有自己的 1 起始序号（与全局序列号无关）

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::ProtocolError;
use crate::command::{Command, CommandKind};
use crate::joint::Joint;
use crate::sequence::SequenceCounter;

/// 命令缓冲区
///
/// 栈上预留 6 个位置，正好覆盖一次完整驱动请求（2 轮 + 3 关节 + 夹爪）。
pub type CommandBuffer = SmallVec<[Command; 6]>;

/// 驱动轴（按设备接受的规范顺序排列）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DriveAxis {
    /// 左轮
    WheelLeft = 0,
    /// 右轮
    WheelRight = 1,
    /// 大臂
    Arm = 2,
    /// 腕部俯仰
    WristUd = 3,
    /// 腕部旋转
    WristRotate = 4,
    /// 夹爪（绝对开度）
    Claw = 5,
}

impl DriveAxis {
    /// 规范顺序
    pub const ALL: [DriveAxis; 6] = [
        DriveAxis::WheelLeft,
        DriveAxis::WheelRight,
        DriveAxis::Arm,
        DriveAxis::WristUd,
        DriveAxis::WristRotate,
        DriveAxis::Claw,
    ];

    /// 对应的编码命令
    pub const fn command(self) -> CommandKind {
        match self {
            DriveAxis::WheelLeft => CommandKind::WheelLeftForward,
            DriveAxis::WheelRight => CommandKind::WheelRightForward,
            DriveAxis::Arm => CommandKind::ArmUp,
            DriveAxis::WristUd => CommandKind::WristUdUp,
            DriveAxis::WristRotate => CommandKind::WristRotateLeft,
            DriveAxis::Claw => CommandKind::ClawPosition,
        }
    }

    /// 对应的关节（轮子没有关节）
    pub const fn joint(self) -> Option<Joint> {
        match self {
            DriveAxis::Arm => Some(Joint::Arm),
            DriveAxis::WristUd => Some(Joint::WristUd),
            DriveAxis::WristRotate => Some(Joint::WristRotate),
            DriveAxis::Claw => Some(Joint::Claw),
            DriveAxis::WheelLeft | DriveAxis::WheelRight => None,
        }
    }

    /// 编码命令对应的驱动轴（含轮速别名），非驱动命令返回 `None`
    pub const fn from_command(kind: CommandKind) -> Option<Self> {
        match kind {
            CommandKind::WheelLeftForward | CommandKind::WheelLeftSpeed => {
                Some(DriveAxis::WheelLeft)
            },
            CommandKind::WheelRightForward | CommandKind::WheelRightSpeed => {
                Some(DriveAxis::WheelRight)
            },
            CommandKind::ArmUp => Some(DriveAxis::Arm),
            CommandKind::WristUdUp => Some(DriveAxis::WristUd),
            CommandKind::WristRotateLeft => Some(DriveAxis::WristRotate),
            CommandKind::ClawPosition => Some(DriveAxis::Claw),
            _ => None,
        }
    }

    /// 关节对应的驱动轴
    pub const fn for_joint(joint: Joint) -> Self {
        match joint {
            Joint::Arm => DriveAxis::Arm,
            Joint::WristUd => DriveAxis::WristUd,
            Joint::WristRotate => DriveAxis::WristRotate,
            Joint::Claw => DriveAxis::Claw,
        }
    }

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for DriveAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command().name())
    }
}

/// 驱动请求
///
/// 稀疏映射 `DriveAxis -> i32`，未设置的轴不会出现在请求中。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandRequest {
    entries: [Option<i32>; 6],
}

impl CommandRequest {
    /// 空请求
    pub const fn new() -> Self {
        Self { entries: [None; 6] }
    }

    /// 链式设置
    pub fn with(mut self, axis: DriveAxis, value: i32) -> Self {
        self.set(axis, value);
        self
    }

    /// 设置一个轴
    pub fn set(&mut self, axis: DriveAxis, value: i32) {
        self.entries[axis.index()] = Some(value);
    }

    /// 移除一个轴
    pub fn clear(&mut self, axis: DriveAxis) {
        self.entries[axis.index()] = None;
    }

    /// 读取一个轴
    pub fn get(&self, axis: DriveAxis) -> Option<i32> {
        self.entries[axis.index()]
    }

    /// 按规范顺序遍历已设置的轴
    pub fn iter(&self) -> impl Iterator<Item = (DriveAxis, i32)> + '_ {
        DriveAxis::ALL
            .into_iter()
            .filter_map(|axis| self.get(axis).map(|value| (axis, value)))
    }

    /// 已设置的轴数
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 是否包含关节驱动（不含轮子）
    pub fn touches_joints(&self) -> bool {
        self.iter().any(|(axis, _)| axis.joint().is_some())
    }

    /// 全部驱动轴归零、不含夹爪的停止请求
    pub fn stop() -> Self {
        DriveAxis::ALL[..5]
            .iter()
            .fold(Self::new(), |req, axis| req.with(*axis, 0))
    }

    /// 全部驱动轴归零并把夹爪设为 `claw`（保持命令）
    pub fn hold(claw: Option<i32>) -> Self {
        let mut req = Self::stop();
        if let Some(claw) = claw {
            req.set(DriveAxis::Claw, claw);
        }
        req
    }

    /// 转换为命令集合
    pub fn to_command_set(&self) -> CommandSet {
        CommandSet::from_commands(
            self.iter()
                .map(|(axis, value)| Command::with_value(axis.command(), value)),
        )
    }
}

/// 一次 HTTP 请求携带的命令集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSet {
    commands: CommandBuffer,
}

impl CommandSet {
    /// 空集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 单个命令
    #[inline]
    pub fn single(command: impl Into<Command>) -> Self {
        let mut commands = CommandBuffer::new();
        commands.push(command.into());
        Self { commands }
    }

    /// 多个命令
    #[inline]
    pub fn from_commands(commands: impl IntoIterator<Item = Command>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
        }
    }

    /// 追加命令
    pub fn push(&mut self, command: impl Into<Command>) {
        self.commands.push(command.into());
    }

    /// 命令数量
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// 命令迭代器
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// 编码为查询字符串（不含 `?`）
    ///
    /// 先校验全部命令再取号：任意命令无效时整体失败，且不消耗序列号。
    pub fn encode_query(&self, seq: &mut SequenceCounter) -> Result<String, ProtocolError> {
        if self.commands.is_empty() {
            return Err(ProtocolError::EmptyCommandSet);
        }
        if let Some(cmd) = self
            .commands
            .iter()
            .find(|cmd| cmd.kind.framing().requires_value() && cmd.value.is_none())
        {
            return Err(ProtocolError::MissingValue(cmd.kind));
        }

        let fragments = self
            .commands
            .iter()
            .enumerate()
            .map(|(i, cmd)| cmd.encode_fragment(i + 1, seq))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(fragments.join("&"))
    }
}

impl From<Command> for CommandSet {
    fn from(command: Command) -> Self {
        CommandSet::single(command)
    }
}

impl From<CommandKind> for CommandSet {
    fn from(kind: CommandKind) -> Self {
        CommandSet::single(kind)
    }
}

impl From<&CommandRequest> for CommandSet {
    fn from(request: &CommandRequest) -> Self {
        request.to_command_set()
    }
}
