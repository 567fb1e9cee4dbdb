//! 重试策略与可替换时钟
//!
//! 所有阻塞等待都经过 [`Sleeper`]，测试中换成记录型假时钟即可
//! 验证等待次数和时长而不真正睡眠。

use std::sync::Arc;
use std::time::Duration;

use crate::config::RetryConfig;

/// 阻塞等待
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// 基于 `std::thread::sleep` 的真实时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// 退避方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// 固定间隔
    Fixed(Duration),
    /// 指数增长，封顶 `max`
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    /// 第 `attempt` 次（1 起始）失败后的等待时长
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { initial, max } => {
                let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(max)
            },
        }
    }
}

/// 重试策略
///
/// `max_attempts` 为总尝试次数（含第一次），至少为 1。
/// 最后一次失败后不再等待。
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    /// 创建重试策略
    pub fn new(max_attempts: u32, backoff: Backoff, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            sleeper,
        }
    }

    /// 从配置创建（固定间隔）
    pub fn from_config(config: &RetryConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self::new(
            config.max_attempts,
            Backoff::Fixed(Duration::from_millis(config.delay_ms)),
            sleeper,
        )
    }

    /// 只尝试一次
    pub fn no_retry() -> Self {
        Self::new(1, Backoff::Fixed(Duration::ZERO), Arc::new(ThreadSleeper))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// 共享时钟
    pub fn sleeper(&self) -> &Arc<dyn Sleeper> {
        &self.sleeper
    }

    /// 第 `attempt` 次失败后等待（最后一次不等待）
    pub(crate) fn wait_after(&self, attempt: u32) {
        if attempt < self.max_attempts {
            self.sleeper.sleep(self.backoff.delay_for(attempt));
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}
