//! 会话所有权
//!
//! 每个设备主机同一时刻只允许一个活动会话，消息序列号归会话所有。
//!
//! 注册表是进程级的，[`SessionGuard`] 析构时释放主机。

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::DriverError;

static ACTIVE_HOSTS: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashSet<String>> {
    ACTIVE_HOSTS.get_or_init(|| Mutex::new(HashSet::new()))
}

/// 主机占用凭证
#[derive(Debug)]
pub struct SessionGuard {
    host: String,
}

impl SessionGuard {
    /// 占用主机
    ///
    /// # Errors
    /// - `DriverError::SessionActive`: 该主机已有活动会话
    pub fn acquire(host: &str) -> Result<Self, DriverError> {
        let host = normalize(host);
        if !registry().lock().insert(host.clone()) {
            return Err(DriverError::SessionActive { host });
        }
        debug!(%host, "session acquired");
        Ok(Self { host })
    }

    /// 被占用的主机
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        registry().lock().remove(&self.host);
        debug!(host = %self.host, "session released");
    }
}

/// 主机是否已有活动会话
pub fn is_active(host: &str) -> bool {
    registry().lock().contains(&normalize(host))
}

fn normalize(host: &str) -> String {
    host.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_second_session_refused() {
        let first = SessionGuard::acquire("session-test-a").unwrap();
        assert!(is_active("session-test-a"));

        let second = SessionGuard::acquire("SESSION-TEST-A ");
        assert!(matches!(
            second,
            Err(DriverError::SessionActive { ref host }) if host == "session-test-a"
        ));

        drop(first);
        assert!(!is_active("session-test-a"));
        assert!(SessionGuard::acquire("session-test-a").is_ok());
    }

    #[test]
    #[serial]
    fn test_hosts_are_independent() {
        let a = SessionGuard::acquire("session-test-b").unwrap();
        let b = SessionGuard::acquire("session-test-c").unwrap();
        assert_eq!(a.host(), "session-test-b");
        assert_eq!(b.host(), "session-test-c");
    }
}
