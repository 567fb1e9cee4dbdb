//! 消息序列号
//!
//! 设备用 6-bit 滚动序列号做去重/排序。同一设备会话内的所有命令
//! 必须共用一个计数器，重复或过期的序列号会被设备静默忽略。
//!
//! 本类型本身不做同步：驱动层把它和发送路径放在同一把锁后面，
//! 保证序列号的分配顺序与实际发送顺序一致。

use crate::alphabet::encode_char;

/// 序列号计数器
///
/// 生命周期等于设备会话；没有带外重同步，只能通过新建会话重置。
#[derive(Debug, Default, Clone)]
pub struct SequenceCounter {
    count: u32,
}

impl SequenceCounter {
    /// 创建从 0 开始的计数器
    pub const fn new() -> Self {
        Self { count: 0 }
    }

    /// 从指定值开始（测试/回放用）
    pub const fn starting_at(count: u32) -> Self {
        Self { count }
    }

    /// 返回当前序列号字符并自增
    ///
    /// 计数器本身按 `u32` 回绕，输出只取低 6 位。
    pub fn next(&mut self) -> char {
        let id = encode_char(i64::from(self.count & 0x3F));
        self.count = self.count.wrapping_add(1);
        id
    }

    /// 查看下一个将要分配的序列号（不自增）
    pub fn peek(&self) -> char {
        encode_char(i64::from(self.count & 0x3F))
    }

    /// 已分配的序列号总数
    pub fn issued(&self) -> u32 {
        self.count
    }
}
