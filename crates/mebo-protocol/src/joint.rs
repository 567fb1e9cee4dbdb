//! 关节标识与关节数组
//!
//! Mebo 机械臂有 4 个可控自由度：大臂、腕部俯仰、腕部旋转、夹爪开合。
//! 使用枚举索引代替裸 `usize`，避免越界和索引错位。
//!
//! # 示例
//!
//! ```rust
//! use mebo_protocol::{Joint, JointArray};
//!
//! let pose = JointArray::new([40, 50, 50, 0]);
//! assert_eq!(pose[Joint::Arm], 40);
//! assert_eq!(pose[Joint::Claw], 0);
//!
//! for (joint, value) in pose.enumerate() {
//!     println!("{}: {}", joint, value);
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::ProtocolError;

/// 关节位置的合法范围（设备上报的绝对值）
pub const POSITION_MIN: i32 = 0;
/// 关节位置上限
pub const POSITION_MAX: i32 = 100;

/// 关节枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Joint {
    /// 大臂
    Arm = 0,
    /// 腕部俯仰
    WristUd = 1,
    /// 腕部旋转
    WristRotate = 2,
    /// 夹爪开合（绝对开度，不是角度）
    Claw = 3,
}

impl Joint {
    /// 所有关节，按设备查询顺序排列
    pub const ALL: [Joint; 4] = [Joint::Arm, Joint::WristUd, Joint::WristRotate, Joint::Claw];

    /// 由增量驱动的关节（不含夹爪）
    pub const DRIVEN: [Joint; 3] = [Joint::Arm, Joint::WristUd, Joint::WristRotate];

    /// 数组索引（0-3）
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// 从索引创建关节（范围检查）
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 设备响应中使用的前缀，例如 `ARM=42` 中的 `ARM`
    pub const fn prefix(self) -> &'static str {
        match self {
            Joint::Arm => "ARM",
            Joint::WristUd => "WRIST_UD",
            Joint::WristRotate => "WRIST_ROTATE",
            Joint::Claw => "CLAW",
        }
    }

    /// 是否为夹爪
    #[inline]
    pub const fn is_claw(self) -> bool {
        matches!(self, Joint::Claw)
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for Joint {
    type Err = ProtocolError;

    /// 接受设备前缀（`WRIST_UD`）或 kebab 写法（`wrist-ud`）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Joint::ALL
            .into_iter()
            .find(|joint| joint.prefix() == normalized)
            .ok_or_else(|| ProtocolError::UnknownJoint(s.to_string()))
    }
}

/// 关节数组
///
/// 4 关节定长容器，支持按 [`Joint`] 索引、迭代和映射。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointArray<T> {
    data: [T; 4],
}

impl<T: Copy> Copy for JointArray<T> {}

impl<T> JointArray<T> {
    /// 创建关节数组（顺序：Arm, WristUd, WristRotate, Claw）
    #[inline]
    pub const fn new(data: [T; 4]) -> Self {
        JointArray { data }
    }

    /// 所有元素相同
    pub fn splat(value: T) -> Self
    where
        T: Copy,
    {
        JointArray { data: [value; 4] }
    }

    /// 内部数组引用
    #[inline]
    pub fn as_array(&self) -> &[T; 4] {
        &self.data
    }

    /// 取出内部数组
    #[inline]
    pub fn into_array(self) -> [T; 4] {
        self.data
    }

    /// 迭代器
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// 带关节标识的迭代器
    pub fn enumerate(&self) -> impl Iterator<Item = (Joint, &T)> {
        Joint::ALL.into_iter().zip(self.data.iter())
    }

    /// 映射转换
    pub fn map<U, F>(self, f: F) -> JointArray<U>
    where
        F: FnMut(T) -> U,
    {
        JointArray {
            data: self.data.map(f),
        }
    }

    /// 与另一个数组逐元素组合
    pub fn zip_with<U, V, F>(self, other: JointArray<U>, mut f: F) -> JointArray<V>
    where
        T: Copy,
        U: Copy,
        F: FnMut(T, U) -> V,
    {
        JointArray {
            data: std::array::from_fn(|i| f(self.data[i], other.data[i])),
        }
    }
}

impl<T> Index<Joint> for JointArray<T> {
    type Output = T;

    #[inline]
    fn index(&self, joint: Joint) -> &T {
        &self.data[joint.index()]
    }
}

impl<T> IndexMut<Joint> for JointArray<T> {
    #[inline]
    fn index_mut(&mut self, joint: Joint) -> &mut T {
        &mut self.data[joint.index()]
    }
}

impl<T> From<[T; 4]> for JointArray<T> {
    fn from(data: [T; 4]) -> Self {
        JointArray { data }
    }
}

/// 关节绝对位置快照（每个值在 `[0, 100]`）
pub type JointPosition = JointArray<i32>;

/// 检查位置读数是否在设备范围内
#[inline]
pub const fn position_in_range(value: i32) -> bool {
    value >= POSITION_MIN && value <= POSITION_MAX
}
