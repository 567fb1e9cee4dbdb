//! HTTP 传输层
//!
//! 每次调用只构建一次 URL；重试时原样重发，消息序列号不会重新分配。
//!
//! 失败的判定包括：超时、连接失败、非 2xx 状态码、响应体不是
//! `{"response": "..."}`。每次失败后执行一次存活探测，按退避策略等待，
//! 最后一次失败后不等待。

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use mebo_protocol::DeviceResponse;

use crate::error::DriverError;
use crate::link::{DeviceLink, LivenessProbe};
use crate::retry::RetryPolicy;

/// HTTP 传输
pub struct Transport {
    link: Arc<dyn DeviceLink>,
    probe: Arc<dyn LivenessProbe>,
    retry: RetryPolicy,
    endpoint: String,
    timeout: Duration,
}

impl Transport {
    /// 创建传输
    ///
    /// `endpoint` 为不含查询串的命令端点，例如
    /// `http://192.168.99.1/ajax/command.json`。
    pub fn new(
        link: Arc<dyn DeviceLink>,
        probe: Arc<dyn LivenessProbe>,
        retry: RetryPolicy,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            link,
            probe,
            retry,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// 重试策略
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// 拼接完整 URL
    pub fn url_for(&self, query: &str) -> String {
        format!("{}?{}", self.endpoint, query)
    }

    /// 发送并返回解析后的响应
    ///
    /// 重试耗尽时返回 [`DriverError::Transport`]。
    pub fn send_query(&self, query: &str) -> Result<DeviceResponse, DriverError> {
        let url = self.url_for(query);
        let max_attempts = self.retry.max_attempts();
        let mut last = String::new();

        for attempt in 1..=max_attempts {
            match self.attempt(&url) {
                Ok(response) => {
                    debug!(attempt, response = %response.text(), "device responded");
                    return Ok(response);
                },
                Err(reason) => {
                    warn!(attempt, max_attempts, %reason, "device request failed");
                    self.probe.probe();
                    self.retry.wait_after(attempt);
                    last = reason;
                },
            }
        }

        error!(%url, attempts = max_attempts, %last, "giving up on device request");
        Err(DriverError::Transport {
            attempts: max_attempts,
            last,
        })
    }

    /// 发送但不关心响应
    ///
    /// 失败已在 [`send_query`](Self::send_query) 中记录，这里只返回是否成功。
    pub fn send_fire_and_forget(&self, query: &str) -> bool {
        self.send_query(query).is_ok()
    }

    fn attempt(&self, url: &str) -> Result<DeviceResponse, String> {
        let body = self.link.get(url, self.timeout).map_err(|e| e.to_string())?;
        DeviceResponse::from_json(&body).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockLink, MockProbe, RecordingSleeper};
    use crate::retry::Backoff;

    struct Fixture {
        link: Arc<MockLink>,
        probe: Arc<MockProbe>,
        sleeper: Arc<RecordingSleeper>,
        transport: Transport,
    }

    fn fixture(max_attempts: u32) -> Fixture {
        let link = Arc::new(MockLink::new());
        let probe = Arc::new(MockProbe::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        let retry = RetryPolicy::new(
            max_attempts,
            Backoff::Fixed(Duration::from_millis(500)),
            sleeper.clone(),
        );
        let transport = Transport::new(
            link.clone(),
            probe.clone(),
            retry,
            "http://192.168.99.1/ajax/command.json",
            Duration::from_secs(1),
        );
        Fixture {
            link,
            probe,
            sleeper,
            transport,
        }
    }

    #[test]
    fn test_success_first_attempt() {
        let f = fixture(5);
        let response = f
            .transport
            .send_query("command1=mebolink_message_send(ARM=?)")
            .unwrap();

        assert_eq!(response.text(), "ARM=0");
        assert_eq!(f.probe.count(), 0);
        assert!(f.sleeper.sleeps().is_empty());
        assert_eq!(
            f.link.requests(),
            vec!["http://192.168.99.1/ajax/command.json?command1=mebolink_message_send(ARM=?)"]
        );
    }

    #[test]
    fn test_five_timeouts_yield_one_failure() {
        let f = fixture(5);
        f.link.set_failing(true);

        let result = f.transport.send_query("command1=mebolink_message_send(BAT=?)");

        match result {
            Err(DriverError::Transport { attempts, last }) => {
                assert_eq!(attempts, 5);
                assert_eq!(last, "request timed out");
            },
            other => panic!("expected transport failure, got {:?}", other),
        }
        assert_eq!(f.link.requests().len(), 5);
        assert_eq!(f.probe.count(), 5);
        assert_eq!(f.sleeper.sleeps(), vec![Duration::from_millis(500); 4]);
    }

    #[test]
    fn test_retries_resend_identical_url() {
        let f = fixture(5);
        f.link.fail_next(2);

        let response = f.transport.send_query("command1=mebolink_message_send(!AGFA)");

        assert!(response.is_ok());
        let urls = f.link.requests();
        assert_eq!(urls.len(), 3);
        assert!(urls.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(f.probe.count(), 2);
        assert_eq!(f.sleeper.sleeps().len(), 2);
    }

    #[test]
    fn test_malformed_body_is_retried() {
        let f = fixture(2);
        f.link.set_raw_body(Some("<html>busy</html>".to_string()));

        assert!(!f.transport.send_fire_and_forget("command1=get_ssid()"));
        assert_eq!(f.link.requests().len(), 2);
        assert_eq!(f.probe.count(), 2);
        assert_eq!(f.sleeper.sleeps().len(), 1);
    }

    #[test]
    fn test_fire_and_forget_success() {
        let f = fixture(5);
        assert!(f.transport.send_fire_and_forget("command1=get_ssid()"));
    }
}
